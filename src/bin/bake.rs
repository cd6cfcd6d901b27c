//! Offline sweep-and-bake CLI: loads an engine config, sweeps it across an
//! rpm range, and writes the three resulting bank blobs to disk.

use clap::{App, Arg};
use enginesound::recorder::{bake, SweepParams};
use enginesound::utils::load_engine_config;
use std::fs;
use std::path::PathBuf;

fn main() {
    env_logger::init();

    let matches = App::new("bake")
        .about("bakes a multi-rpm sample bank from an engine config")
        .arg(
            Arg::with_name("config")
                .help("path to a RON-serialized EngineConfig")
                .required(true),
        )
        .arg(
            Arg::with_name("out-prefix")
                .long("out-prefix")
                .takes_value(true)
                .default_value("engine")
                .help("output files are written as <prefix>_{crankshaft,ignition,exhaust}.bank"),
        )
        .arg(
            Arg::with_name("min-rpm")
                .long("min-rpm")
                .takes_value(true)
                .default_value("1000"),
        )
        .arg(
            Arg::with_name("top-rpm")
                .long("top-rpm")
                .takes_value(true)
                .default_value("7000"),
        )
        .arg(
            Arg::with_name("sample-count")
                .long("sample-count")
                .takes_value(true)
                .default_value("32"),
        )
        .get_matches();

    let config_path = matches.value_of("config").unwrap();
    let out_prefix = matches.value_of("out-prefix").unwrap();

    let mut config = match load_engine_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            log::error!("failed to load \"{}\": {}", config_path, e);
            std::process::exit(1);
        }
    };

    let params = SweepParams {
        min_rpm: matches.value_of("min-rpm").unwrap().parse().unwrap_or(1000.0),
        top_rpm: matches.value_of("top-rpm").unwrap().parse().unwrap_or(7000.0),
        sample_count: matches
            .value_of("sample-count")
            .unwrap()
            .parse()
            .unwrap_or(32),
        ..SweepParams::default()
    };

    let banks = match bake(&mut config, &params) {
        Ok(banks) => banks,
        Err(e) => {
            log::error!("engine config is invalid: {}", e);
            std::process::exit(1);
        }
    };

    for (suffix, bytes) in [
        ("crankshaft", banks.crankshaft),
        ("ignition", banks.ignition),
        ("exhaust", banks.exhaust),
    ] {
        let path = PathBuf::from(format!("{}_{}.bank", out_prefix, suffix));
        if let Err(e) = fs::write(&path, bytes) {
            log::error!("failed to write \"{}\": {}", path.display(), e);
            std::process::exit(1);
        }
        log::info!("wrote {}", path.display());
    }
}
