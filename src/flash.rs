use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use subprocess::{ExitStatus, Popen, PopenConfig};

/// Settings for programming the target device before a test run.
///
/// `exec_dir` is the vendor tool directory; the TOC description is expected at
/// `<exec_dir>/build/config/<prefix>.json`.
#[derive(Debug, Deserialize)]
pub struct FlashConfiguration {
    pub exec_dir: PathBuf,
    #[serde(default = "default_gen_toc_bin")]
    pub gen_toc_bin: String,
    #[serde(default = "default_write_mram_bin")]
    pub write_mram_bin: String,
}

fn default_gen_toc_bin() -> String {
    "app-gen-toc".into()
}

fn default_write_mram_bin() -> String {
    "app-write-mram".into()
}

/// Generates the TOC for `prefix` and writes the image to MRAM.
///
/// The tools need a moment before the device is usable again, hence the fixed
/// sleeps after each step.
pub fn program_device(config: &FlashConfiguration, prefix: &str) -> Result<(), FlashError> {
    let toc_json = config.exec_dir.join("build").join("config").join(format!("{prefix}.json"));
    if !toc_json.is_file() {
        return Err(FlashError::MissingTocConfig(toc_json));
    }

    log::info!("Programming device with {prefix}");
    run_tool(
        &config.exec_dir,
        &[
            config.gen_toc_bin.clone().into(),
            "-f".into(),
            toc_json.into_os_string(),
        ],
    )?;
    std::thread::sleep(Duration::from_secs(1));

    run_tool(&config.exec_dir, &[config.write_mram_bin.clone().into(), "-p".into()])?;
    std::thread::sleep(Duration::from_secs(2));

    Ok(())
}

fn run_tool(cwd: &Path, argv: &[OsString]) -> Result<(), FlashError> {
    let mut proc = Popen::create(
        argv,
        PopenConfig { cwd: Some(cwd.as_os_str().to_owned()), ..Default::default() },
    )?;

    let status = proc.wait()?;
    if !status.success() {
        return Err(FlashError::ToolFailed {
            tool: argv[0].to_string_lossy().into_owned(),
            status,
        });
    }

    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum FlashError {
    #[error("TOC config {0:?} does not exist")]
    MissingTocConfig(PathBuf),
    #[error("{tool} exited with {status:?}")]
    ToolFailed { tool: String, status: ExitStatus },
    #[error("failed to spawn provisioning tool: {0}")]
    Spawn(#[from] subprocess::PopenError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_toc_config_aborts_before_any_tool_runs() {
        let config = FlashConfiguration {
            exec_dir: "/nonexistent/app-release-exec".into(),
            gen_toc_bin: default_gen_toc_bin(),
            write_mram_bin: default_write_mram_bin(),
        };

        let err = program_device(&config, "model_orbw_19_Q_vela").unwrap_err();
        assert!(matches!(err, FlashError::MissingTocConfig(_)));
    }
}
