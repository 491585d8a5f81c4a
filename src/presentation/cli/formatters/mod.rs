pub mod snapshot_fmt;
pub mod status_fmt;
