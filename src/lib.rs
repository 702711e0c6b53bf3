pub mod config;
pub mod error;
pub mod helper;
pub mod modules;
pub mod pipeline;
pub mod triton_client;
pub mod utils;

pub use error::{Result, SmartFitError};
pub use pipeline::pipeline::SmartFitPipeline;
