pub mod collectors;
pub mod live;
pub mod notifications;
pub mod persistence;
