//! Treasury 32nd-fraction price representation.
//!
//! US Treasuries quote in 32nds of a point, occasionally with a "plus" half-32nd
//! (e.g. `100-16+` means `100 + 16.5/32`). [`Price32nd`] carries the whole
//! part, the 32nds count, and the half-32nd bit separately so that decimal
//! rounding error never accumulates across a session.

use std::cmp::Ordering;
use std::fmt;

use thiserror::Error;

use crate::types::Px;

/// Error returned when constructing a [`Price32nd`] with an out-of-range
/// 32nds count.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Price32ndError {
    /// `thirty_seconds` must satisfy `0 <= thirty_seconds < 32`.
    #[error("thirty_seconds out of range: {0} (must be 0..32)")]
    ThirtySecondsOutOfRange(u8),
}

/// A treasury price: `whole + thirty_seconds/32 + half/64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Price32nd {
    whole: i32,
    thirty_seconds: u8,
    half: bool,
}

impl Price32nd {
    /// Constructs a `Price32nd`, validating `0 <= thirty_seconds < 32`.
    pub fn new(whole: i32, thirty_seconds: u8, half: bool) -> Result<Self, Price32ndError> {
        if thirty_seconds >= 32 {
            return Err(Price32ndError::ThirtySecondsOutOfRange(thirty_seconds));
        }
        Ok(Self {
            whole,
            thirty_seconds,
            half,
        })
    }

    #[must_use]
    pub const fn whole(self) -> i32 {
        self.whole
    }

    #[must_use]
    pub const fn thirty_seconds(self) -> u8 {
        self.thirty_seconds
    }

    #[must_use]
    pub const fn half(self) -> bool {
        self.half
    }

    /// `whole + thirty_seconds/32 + half/64`.
    #[must_use]
    pub fn to_decimal(self) -> f64 {
        f64::from(self.whole)
            + f64::from(self.thirty_seconds) / 32.0
            + if self.half { 1.0 / 64.0 } else { 0.0 }
    }

    /// Rounds a decimal price to the nearest half-32nd.
    #[must_use]
    pub fn from_decimal(value: f64) -> Self {
        let whole = value.floor();
        let frac = value - whole;
        // frac is in [0, 1); snap to the nearest 1/64.
        let sixty_fourths = (frac * 64.0).round() as i64;
        let (whole, sixty_fourths) = if sixty_fourths >= 64 {
            (whole + 1.0, 0)
        } else {
            (whole, sixty_fourths)
        };
        let thirty_seconds = (sixty_fourths / 2) as u8;
        let half = sixty_fourths % 2 == 1;
        Self {
            whole: whole as i32,
            thirty_seconds,
            half,
        }
    }

    /// Converts to the workspace's fixed-point `Px` for use in the order book
    /// and risk arithmetic.
    #[must_use]
    pub fn to_px(self) -> Px {
        Px::new(self.to_decimal())
    }

    /// Snaps an arbitrary `Px` to the nearest legal half-32nd and returns it
    /// as both forms.
    #[must_use]
    pub fn snap(px: Px) -> (Self, Px) {
        let snapped = Self::from_decimal(px.as_f64());
        let snapped_px = snapped.to_px();
        (snapped, snapped_px)
    }
}

impl fmt::Display for Price32nd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.half {
            write!(f, "{}-{:02}+", self.whole, self.thirty_seconds)
        } else {
            write!(f, "{}-{:02}", self.whole, self.thirty_seconds)
        }
    }
}

impl PartialOrd for Price32nd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Price32nd {
    fn cmp(&self, other: &Self) -> Ordering {
        self.whole
            .cmp(&other.whole)
            .then(self.thirty_seconds.cmp(&other.thirty_seconds))
            .then(self.half.cmp(&other.half))
    }
}
