//! CLI command implementations

pub mod handle;
pub mod parse;

pub use handle::HandleArgs;
pub use parse::ParseArgs;
