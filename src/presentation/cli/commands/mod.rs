pub mod daemon;
pub mod digest;
pub mod sample;
pub mod subscriptions;
pub mod thresholds;
