use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use serde::Deserialize;
use subprocess::{Popen, PopenConfig, Redirection};

/// Tag the FVP prints when the firmware shuts down cleanly
const EXIT_TAG: &str = "Application exit code: 0.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, strum::Display, strum::EnumString)]
pub enum Target {
    #[serde(rename = "corstone-300")]
    #[strum(serialize = "corstone-300")]
    Corstone300,
    #[serde(rename = "corstone-310")]
    #[strum(serialize = "corstone-310")]
    Corstone310,
    #[serde(rename = "corstone-320")]
    #[strum(serialize = "corstone-320")]
    Corstone320,
}

impl Target {
    fn fvp_binary(self) -> &'static str {
        match self {
            Target::Corstone300 => "FVP_Corstone_SSE-300_Ethos-U55",
            Target::Corstone310 => "FVP_Corstone_SSE-310",
            Target::Corstone320 => "FVP_Corstone_SSE-320",
        }
    }

    /// The MPS4 based model nests its parameters one level deeper
    fn board(self) -> &'static str {
        match self {
            Target::Corstone300 | Target::Corstone310 => "mps3_board",
            Target::Corstone320 => "mps4_board",
        }
    }

    fn num_macs_param(self) -> &'static str {
        match self {
            Target::Corstone300 | Target::Corstone310 => "ethosu.num_macs",
            Target::Corstone320 => "mps4_board.subsystem.ethosu.num_macs",
        }
    }

    fn trace_plugin_dir(self) -> &'static str {
        match self {
            Target::Corstone300 | Target::Corstone310 => "plugins/Linux64_GCC-9.3",
            Target::Corstone320 => "plugins/Linux64_GCC-10.3",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SimulatorConfiguration {
    pub target: Target,
    #[serde(default = "default_macs")]
    pub macs: u32,
    /// Collect a tarmac instruction trace (requires `PVLIB_HOME`)
    #[serde(default)]
    pub tarmac_trace: bool,
    /// Passed through to the FVP unchanged; must contain the firmware image
    #[serde(default)]
    pub args: Vec<String>,
}

fn default_macs() -> u32 {
    128
}

/// Assembles the full FVP command line for the given configuration.
pub fn build_command(config: &SimulatorConfiguration) -> Result<Vec<String>, SimulatorError> {
    let board = config.target.board();

    let mut cmd = vec![config.target.fvp_binary().to_owned()];
    cmd.push("-C".into());
    cmd.push(format!("{}={}", config.target.num_macs_param(), config.macs));

    for param in [
        format!("{board}.visualisation.disable-visualisation=1"),
        format!("{board}.telnetterminal0.start_telnet=0"),
        format!("{board}.uart0.out_file=\"-\""),
        format!("{board}.uart0.unbuffered_output=1"),
        format!("{board}.uart0.shutdown_on_eot=1"),
    ] {
        cmd.push("-C".into());
        cmd.push(param);
    }

    if config.tarmac_trace {
        let (plugin, trace_file) = resolve_trace_plugin(config)?;
        cmd.push("--plugin".into());
        cmd.push(plugin.to_string_lossy().into_owned());
        cmd.push("-C".into());
        cmd.push(format!("TRACE.TarmacTrace.trace-file={trace_file}"));
    }

    cmd.extend(config.args.iter().cloned());
    Ok(cmd)
}

fn resolve_trace_plugin(
    config: &SimulatorConfiguration,
) -> Result<(PathBuf, String), SimulatorError> {
    // The trace goes next to the firmware image
    let image = config
        .args
        .iter()
        .find(|a| a.ends_with(".elf"))
        .ok_or(SimulatorError::MissingImage)?;
    let trace_file = format!("{}.trace", image.trim_end_matches(".elf"));

    let pvlib_home =
        std::env::var_os("PVLIB_HOME").ok_or(SimulatorError::TracePluginEnvMissing)?;

    let plugin = PathBuf::from(pvlib_home)
        .join(config.target.trace_plugin_dir())
        .join("TarmacTrace.so");
    if !plugin.is_file() {
        return Err(SimulatorError::TracePluginMissing(plugin));
    }

    Ok((plugin, trace_file))
}

/// Launches the FVP and relays its output, watching for the success tag.
pub fn run(config: &SimulatorConfiguration) -> Result<(), SimulatorError> {
    let cmd = build_command(config)?;
    log::info!("Launching simulator: {}", cmd.join(" "));

    let mut proc = Popen::create(
        &cmd,
        PopenConfig {
            stdout: Redirection::Pipe,
            stderr: Redirection::Merge,
            ..Default::default()
        },
    )?;

    let mut clean_exit = false;
    if let Some(stdout) = proc.stdout.take() {
        for line in BufReader::new(stdout).lines() {
            let line = line?;
            if line.contains(EXIT_TAG) {
                clean_exit = true;
            }
            println!("{line}");
        }
    }
    proc.wait()?;

    if clean_exit {
        Ok(())
    } else {
        Err(SimulatorError::SimulationFailed)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SimulatorError {
    #[error("PVLIB_HOME is not set, required to locate the tarmac trace plugin")]
    TracePluginEnvMissing,
    #[error("tarmac trace plugin not found at {0:?}")]
    TracePluginMissing(PathBuf),
    #[error("no .elf image among the simulator arguments")]
    MissingImage,
    #[error("simulator finished without reporting a clean application exit")]
    SimulationFailed,
    #[error("failed to spawn simulator: {0}")]
    Spawn(#[from] subprocess::PopenError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
