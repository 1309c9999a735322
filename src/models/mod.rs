pub mod candidate;
pub mod ongoing;
pub mod panel;
pub mod round;
pub mod status;
