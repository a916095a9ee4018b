use std::path::Path;

use anyhow::Context;
use simplelog as sl;

use inference_harness::{config, flash, runner, transport, transport::Transport};

fn main() {
    let config = match config::load(Path::new("config.toml")) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Could not load config.toml: {e:#}");
            std::process::exit(1);
        }
    };

    init_logger(&config);

    if let Err(e) = run(&config) {
        log::error!("Test run failed: {e:#}");
        std::process::exit(1);
    }
}

fn init_logger(config: &config::Configuration) {
    let _ = sl::CombinedLogger::init(build_loggers(config));
}

fn build_loggers(config: &config::Configuration) -> Vec<Box<dyn sl::SharedLogger>> {
    let level = if config.verbose { sl::LevelFilter::Debug } else { sl::LevelFilter::Info };

    let mut loggers: Vec<Box<dyn sl::SharedLogger>> = Vec::new();
    match std::fs::File::create(&config.log_path) {
        Ok(file) => loggers.push(sl::WriteLogger::new(level, sl::Config::default(), file)),
        Err(e) => eprintln!(
            "Could not create log file {:?} ({e}), logging to terminal only",
            config.log_path
        ),
    }

    // Always keep at least one sink
    if config.verbose || loggers.is_empty() {
        loggers.push(sl::TermLogger::new(
            level,
            sl::Config::default(),
            sl::TerminalMode::Mixed,
            sl::ColorChoice::Auto,
        ));
    }

    loggers
}

fn run(config: &config::Configuration) -> anyhow::Result<()> {
    if let Some(flash) = &config.flash {
        flash::program_device(flash, &config.prefix)?;
    }

    let mut com = transport::open(&config.port, config.baudrate, config.read_timeout())?;

    // Give the link time to settle before the first command
    com.clear_buffers()?;
    std::thread::sleep(config.read_timeout() * 2);

    let predictions = runner::execute_test(&mut com, config).context("test run aborted")?;
    log::info!("Run complete, {} predictions in {:?}", predictions.len(), config.output_path);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(log_path: &str) -> config::Configuration {
        toml::from_str(&format!("port = \"unused\"\nprefix = \"t\"\nlog_path = \"{log_path}\""))
            .unwrap()
    }

    #[test]
    fn unwritable_log_path_falls_back_to_terminal() {
        let config = test_config("/nonexistent/dir/log");

        let loggers = build_loggers(&config);

        assert_eq!(loggers.len(), 1);
    }

    #[test]
    fn verbose_adds_a_terminal_logger() {
        let _ = std::fs::create_dir_all("tests/tmp");
        let mut config = test_config("tests/tmp/__main_log");
        config.verbose = true;

        let loggers = build_loggers(&config);

        assert_eq!(loggers.len(), 2);
        let _ = std::fs::remove_file("tests/tmp/__main_log");
    }
}
