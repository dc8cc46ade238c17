#![forbid(clippy::mod_module_files)]

pub mod compartment;
pub mod coverage;
pub mod error;
pub mod filter;
pub mod hit;

pub use error::{Error, Result};
pub use hit::{Hit, Strand};
