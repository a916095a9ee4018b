//! CLI passthrough to the Arm FVP: reads the `[simulator]` table from
//! `config.toml`, assembles the model command line and relays its output.

use std::path::Path;

use inference_harness::{config, simulator};

fn main() {
    let config = match config::load(Path::new("config.toml")) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Could not load config.toml: {e:#}");
            std::process::exit(1);
        }
    };

    let Some(simulator_config) = &config.simulator else {
        eprintln!("config.toml has no [simulator] table");
        std::process::exit(1);
    };

    if let Err(e) = simulator::run(simulator_config) {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
