pub mod digest;
pub mod handle;
pub mod live_loop;
