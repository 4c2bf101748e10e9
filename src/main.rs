use clap::Parser;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use env_logger::Env;
use log::info;
use std::fs;
use std::path::PathBuf;

use tetheraddr::scenario::{load_scenario, run_scenario};

/// Replay a downstream address allocation scenario and report the outcome
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the scenario YAML file
    #[arg(short, long)]
    scenario: PathBuf,

    /// Output path for the JSON allocation report (stdout when omitted)
    #[arg(short, long)]
    report: Option<PathBuf>,
}

fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Parse command-line arguments
    let args = Args::parse();

    // Initialize logging with default filter level of "info"
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    info!("Replaying address scenario: {:?}", args.scenario);

    let scenario = load_scenario(&args.scenario)?;
    let report = run_scenario(&scenario)?;

    let rendered = serde_json::to_string_pretty(&report)
        .wrap_err("Failed to serialize scenario report")?;
    match &args.report {
        Some(path) => {
            fs::write(path, rendered)
                .wrap_err_with(|| format!("Failed to write report '{}'", path.display()))?;
            info!("Wrote allocation report: {:?}", path);
        }
        None => println!("{}", rendered),
    }

    info!("Scenario completed with {} report entries", report.entries.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let args = Args::parse_from(&["tetheraddr", "--scenario", "test.yaml"]);

        assert_eq!(args.scenario, PathBuf::from("test.yaml"));
        assert_eq!(args.report, None);
    }

    #[test]
    fn test_report_path_arg() {
        let args = Args::parse_from(&[
            "tetheraddr",
            "--scenario", "test.yaml",
            "--report", "report.json",
        ]);

        assert_eq!(args.report, Some(PathBuf::from("report.json")));
    }
}
