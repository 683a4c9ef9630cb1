pub mod grid;
pub mod log_setup;
