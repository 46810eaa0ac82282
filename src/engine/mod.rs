//! Everything that talks to the engine executables.
//!
//! - locating the tools (`location`)
//! - assembling command lines (`command`)
//! - running them and streaming their output (`invoke`)
//! - probing the installed version (`version`)

pub mod command;
pub mod invoke;
pub mod location;
pub mod version;

pub use command::{CommandLine, DceInputs, InitParamsArg};
pub use invoke::{LogSink, TracingSink};
pub use location::{EngineLocation, Tool};
pub use version::engine_version;
