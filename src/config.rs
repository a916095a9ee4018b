use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::flash::FlashConfiguration;
use crate::protocol::Timing;
use crate::simulator::SimulatorConfiguration;

/// Harness configuration, read from `config.toml` in the working directory.
///
/// Only `port` and `prefix` are mandatory; everything else defaults to the
/// reference setup (115200 baud 8N1, 10 ms element settle, 100 ms execute
/// settle, one inference iteration).
#[derive(Debug, Deserialize)]
pub struct Configuration {
    /// Serial port identifier, e.g. `/dev/ttyUSB0` or `COM9`
    pub port: String,
    #[serde(default = "default_baudrate")]
    pub baudrate: u32,
    /// Prefix for the `<prefix>_y_test.P` / `<prefix>_y_pred.P` artifacts
    pub prefix: String,
    #[serde(default = "default_input_path")]
    pub input_path: PathBuf,
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
    /// Extension of the sample files inside `input_path`
    #[serde(default = "default_sample_extension")]
    pub sample_extension: String,
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    #[serde(default = "default_element_settle_ms")]
    pub element_settle_ms: u64,
    #[serde(default = "default_execute_settle_ms")]
    pub execute_settle_ms: u64,
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    /// Require every loaded element to be echoed back by the device instead
    /// of trusting the settle delay
    #[serde(default)]
    pub verify_element_echo: bool,
    #[serde(default)]
    pub verbose: bool,
    #[serde(default = "default_log_path")]
    pub log_path: PathBuf,
    /// Optional device provisioning step, run before the serial test
    pub flash: Option<FlashConfiguration>,
    /// Optional FVP launch settings, used by the `run_simulator` binary
    pub simulator: Option<SimulatorConfiguration>,
}

impl Configuration {
    pub fn timing(&self) -> Timing {
        Timing {
            element_settle: Duration::from_millis(self.element_settle_ms),
            execute_settle: Duration::from_millis(self.execute_settle_ms),
        }
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

pub fn load(path: &Path) -> anyhow::Result<Configuration> {
    let raw = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&raw)?)
}

fn default_baudrate() -> u32 {
    115200
}

fn default_input_path() -> PathBuf {
    "INPUT".into()
}

fn default_output_path() -> PathBuf {
    "results".into()
}

fn default_sample_extension() -> String {
    "P".into()
}

fn default_iterations() -> u32 {
    1
}

fn default_element_settle_ms() -> u64 {
    10
}

fn default_execute_settle_ms() -> u64 {
    100
}

fn default_read_timeout_ms() -> u64 {
    2000
}

fn default_log_path() -> PathBuf {
    "log".into()
}
