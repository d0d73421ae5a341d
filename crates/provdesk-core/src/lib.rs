// Library root: the two logic units (submission controller and estimate
// aggregator), the configuration they are built from, and the message types
// the terminal shell uses to drive them.

pub mod config;
pub mod estimate;
pub mod notice;
pub mod protocol;
pub mod submission;
pub mod validation;
