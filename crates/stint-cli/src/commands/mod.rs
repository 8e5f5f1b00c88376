pub mod alarm;
pub mod config;
pub mod records;
pub mod timer;
