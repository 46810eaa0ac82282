//! Input/output helpers.
//!
//! - engine wire format read/write (`wire`)
//! - scratch directory ownership (`scratch`)
//! - result exports (CSV/JSON) (`export`)

pub mod export;
pub mod scratch;
pub mod wire;

pub use export::*;
pub use scratch::*;
pub use wire::*;
