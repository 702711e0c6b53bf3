pub mod pipeline;
pub mod schemas;
