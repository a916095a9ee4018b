pub mod config;
pub mod flash;
pub mod protocol;
pub mod runner;
pub mod samples;
pub mod simulator;
pub mod transport;
