pub mod config;
pub mod fixed_point;
pub mod logger;
pub mod math;
