pub mod calculator;
pub mod detector;
pub mod rate_engine;
