//! Treasury instrument metadata: the six quoted kinds, their maturities,
//! face value, and a per-kind DV01 constant table.

use std::fmt;

use crate::types::Symbol;

/// One of the six treasury kinds this engine quotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Instrument {
    Bill3M = 1,
    Bill6M = 2,
    Note2Y = 3,
    Note5Y = 4,
    Note10Y = 5,
    Bond30Y = 6,
}

impl Instrument {
    pub const ALL: [Instrument; 6] = [
        Instrument::Bill3M,
        Instrument::Bill6M,
        Instrument::Note2Y,
        Instrument::Note5Y,
        Instrument::Note10Y,
        Instrument::Bond30Y,
    ];

    /// Maps the wire-contract instrument id (`1..6`, stable ) to an
    /// `Instrument`, or `None` for an unrecognized id.
    #[must_use]
    pub const fn from_wire_id(id: u32) -> Option<Self> {
        match id {
            1 => Some(Instrument::Bill3M),
            2 => Some(Instrument::Bill6M),
            3 => Some(Instrument::Note2Y),
            4 => Some(Instrument::Note5Y),
            5 => Some(Instrument::Note10Y),
            6 => Some(Instrument::Bond30Y),
            _ => None,
        }
    }

    #[must_use]
    pub const fn wire_id(self) -> u32 {
        self as u32
    }

    /// Stable `Symbol` used as the pool/map key; identical to the wire id.
    #[must_use]
    pub const fn symbol(self) -> Symbol {
        Symbol(self.wire_id())
    }

    #[must_use]
    pub const fn maturity_days(self) -> u32 {
        match self {
            Instrument::Bill3M => 91,
            Instrument::Bill6M => 182,
            Instrument::Note2Y => 730,
            Instrument::Note5Y => 1_826,
            Instrument::Note10Y => 3_653,
            Instrument::Bond30Y => 10_957,
        }
    }

    /// Face value of one standard clip, in whole units.
    #[must_use]
    pub const fn face_value(self) -> i64 {
        1_000_000
    }

    /// Dollar value of a one-basis-point yield change on a one-million-face
    /// position, fixed-point with four decimal places (matches
    /// [`crate::constants::SCALE_4`]).
    #[must_use]
    pub const fn dv01_per_million_ticks(self) -> i64 {
        // Approximate duration-weighted DV01s for a $1mm clip, in dollars,
        // scaled by SCALE_4. Longer maturities carry materially higher DV01.
        match self {
            Instrument::Bill3M => 25, // ~$0.0025
            Instrument::Bill6M => 50, // ~$0.0050
            Instrument::Note2Y => 1_900, // ~$0.19
            Instrument::Note5Y => 4_700, // ~$0.47
            Instrument::Note10Y => 8_600, // ~$0.86
            Instrument::Bond30Y => 18_200, // ~$1.82
        }
    }

    /// Instrument-dependent base half-spread, expressed in 32nds (fixed
    /// point, ×100 of a 32nd) — tighter for short-maturity, wider for 30Y,
    ///.
    #[must_use]
    pub const fn base_half_spread_32nds(self) -> i32 {
        match self {
            Instrument::Bill3M => 25,
            Instrument::Bill6M => 30,
            Instrument::Note2Y => 50,
            Instrument::Note5Y => 75,
            Instrument::Note10Y => 100,
            Instrument::Bond30Y => 150,
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Instrument::Bill3M => "Bill3M",
            Instrument::Bill6M => "Bill6M",
            Instrument::Note2Y => "Note2Y",
            Instrument::Note5Y => "Note5Y",
            Instrument::Note10Y => "Note10Y",
            Instrument::Bond30Y => "Bond30Y",
        };
        f.write_str(name)
    }
}
