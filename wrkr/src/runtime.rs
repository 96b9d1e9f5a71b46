mod archive;
mod error;
mod factory;
mod script_runtime;
mod types;

#[cfg(feature = "lua")]
mod lua;

pub use error::*;
pub use factory::*;
pub use script_runtime::*;
pub use types::*;
