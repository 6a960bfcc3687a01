//! Shared types for the treasury market-making engine.
//!
//! Every hot-path crate in the workspace depends on `common` for its
//! fixed-point price/quantity representation, the treasury `Price32nd`
//! quoting convention, instrument metadata, and the small set of POD types
//! (`Side`, `Ts`, `Symbol`) that flow across ring buffers between threads.
//! Nothing here allocates; every type is `Copy`.

pub mod constants;
pub mod instrument;
pub mod price32nd;
pub mod test_support;
pub mod types;

pub use constants::*;
pub use instrument::Instrument;
pub use price32nd::{Price32nd, Price32ndError};
pub use types::{Px, Qty, Side, Symbol, Ts};
