#![forbid(clippy::mod_module_files)]

pub mod accessor;
pub mod aligner;
pub mod config;
pub mod engine;
pub mod error;
pub mod pattern;
mod postprocess;
pub mod segment;
pub mod serialize;
mod util;

pub use config::EngineConfig;
pub use engine::{AlignedCompartment, Engine};
pub use error::{Error, Result};
