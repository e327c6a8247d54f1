//! Technical analysis: candles in, indicator values and signals out

pub mod analyzer;
pub mod signal;

pub use analyzer::*;
pub use signal::*;
