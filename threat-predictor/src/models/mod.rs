//! Data models

pub mod threat;
pub mod series;

pub use threat::*;
pub use series::*;
