pub mod config;
pub mod error;
pub mod procedures;
pub mod telemetry;
pub mod workflows;
