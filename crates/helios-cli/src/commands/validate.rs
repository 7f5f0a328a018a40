use crate::commands::common::print_config_summary;
use crate::config::load_config;
use crate::infra::build_market_data_repo;
use helios_domain::services::ohlcv::{data_quality_from_bars, validate_bars};
use helios_infrastructure::market_data::load_csv;
use std::path::{Path, PathBuf};

pub fn run(config_path: PathBuf) -> Result<(), String> {
    let config = load_config(&config_path)?;
    print_config_summary("validate", &config);

    let report = match config.data.source.as_str() {
        "csv" => {
            let path = config
                .data
                .csv_path
                .as_deref()
                .ok_or_else(|| "data.csv_path is required for the csv source".to_string())?;
            let (bars, report) = load_csv(Path::new(path), &config.run.symbol)?;
            validate_bars(&bars)?;
            report
        }
        _ => {
            let repo = build_market_data_repo(&config)?;
            let bars = repo.recent_bars(&config.run.symbol, config.selection.window.max(60))?;
            validate_bars(&bars)?;
            data_quality_from_bars(&bars)
        }
    };

    println!(
        "data quality: rows={} duplicates={} out_of_order={} invalid_close={}",
        report.rows, report.duplicates, report.out_of_order, report.invalid_close
    );
    if let (Some(first), Some(last)) = (report.first_timestamp, report.last_timestamp) {
        println!("span: {} .. {}", first, last);
    }
    println!("validation passed");
    Ok(())
}
