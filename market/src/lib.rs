pub mod cache;
pub mod pulse;
pub mod rolling_window;
pub mod source;
pub mod types;
