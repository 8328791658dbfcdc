//! Error types for the tabwatch protocol layer.

mod command;
mod host;
mod store;
mod sync;

pub use command::*;
pub use host::*;
pub use store::*;
pub use sync::*;
