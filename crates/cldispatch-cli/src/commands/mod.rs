//! Subcommand implementations.

pub mod probe;
pub mod reflect;
pub mod search;

pub use probe::ProbeCommand;
pub use reflect::ReflectCommand;
pub use search::SearchCommand;
