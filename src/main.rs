use std::process::ExitCode;

use macroreg::{pipeline, PipelineConfig};

const DEFAULT_CONFIG: &str = "macroreg.toml";

fn run(path: &str) -> macroreg::Result<()> {
    let config = PipelineConfig::from_path(path)?;
    let report = pipeline::run_config(&config)?;
    let json = serde_json::to_string_pretty(&report)?;
    println!("{}", json);
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    log::info!("macroreg {} using {}", macroreg::VERSION, path);

    match run(&path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
