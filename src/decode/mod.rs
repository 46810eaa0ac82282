//! Result Decoder: turning the engine's flat result matrix into named blocks.

pub mod layout;

pub use layout::*;
