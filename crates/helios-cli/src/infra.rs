use crate::config::Config;
use helios_domain::repositories::artifacts::ArtifactWriter;
use helios_domain::repositories::market_data::MarketDataRepository;
use helios_infrastructure::artifacts::FilesystemArtifactWriter;
use helios_infrastructure::market_data::{CsvMarketDataRepository, SyntheticMarketDataRepository};
use std::path::PathBuf;

pub struct EngineDeps {
    pub market_data: Box<dyn MarketDataRepository>,
    pub artifacts: Box<dyn ArtifactWriter>,
}

pub fn build_engine_deps(config: &Config) -> Result<EngineDeps, String> {
    Ok(EngineDeps {
        market_data: build_market_data_repo(config)?,
        artifacts: Box::new(FilesystemArtifactWriter::new()),
    })
}

pub fn build_market_data_repo(config: &Config) -> Result<Box<dyn MarketDataRepository>, String> {
    match config.data.source.as_str() {
        "csv" => {
            let path = config
                .data
                .csv_path
                .as_deref()
                .ok_or_else(|| "data.csv_path is required for the csv source".to_string())?;
            Ok(Box::new(CsvMarketDataRepository::new(PathBuf::from(path))))
        }
        "synthetic" => Ok(Box::new(
            SyntheticMarketDataRepository::new(config.data.seed).with_params(
                config.data.start_price,
                config.data.daily_volatility,
                config.data.drift,
            ),
        )),
        other => Err(format!("unsupported data.source: {}", other)),
    }
}
