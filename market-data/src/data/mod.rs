//! Data management module
//!
//! Candle model, intervals/periods and the SQLite-backed candle store.

pub mod candle;
pub mod interval;
pub mod storage;
pub mod symbol;

pub use candle::*;
pub use interval::*;
pub use storage::*;
pub use symbol::*;
