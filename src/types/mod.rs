pub mod arbitrage;
pub mod common;
pub mod error;
pub mod pool;
pub mod rate;

pub use arbitrage::*;
pub use common::*;
pub use error::*;
pub use pool::*;
pub use rate::*;
