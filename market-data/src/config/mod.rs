//! Configuration module

pub mod pipeline;
pub mod source;

pub use pipeline::*;
pub use source::*;
