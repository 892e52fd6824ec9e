// Common library for shared code across the poller binary and tests

pub mod config;
pub mod db;
pub mod errors;
pub mod poller;
pub mod signals;
pub mod telemetry;
