use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub run: RunConfig,
    pub data: DataConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default)]
    pub paper: PaperConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
pub struct RunConfig {
    pub symbol: String,
    pub initial_balance: f64,
    pub out_dir: String,
}

#[derive(Debug, Deserialize)]
pub struct DataConfig {
    /// "csv" or "synthetic".
    pub source: String,
    pub csv_path: Option<String>,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_start_price")]
    pub start_price: f64,
    #[serde(default = "default_volatility")]
    pub daily_volatility: f64,
    #[serde(default = "default_drift")]
    pub drift: f64,
}

#[derive(Debug, Deserialize)]
pub struct SelectionConfig {
    #[serde(default = "default_window")]
    pub window: usize,
}

#[derive(Debug, Deserialize)]
pub struct PaperConfig {
    #[serde(default = "default_days")]
    pub days: usize,
    #[serde(default = "default_trade_quantity")]
    pub trade_quantity: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    pub metrics_addr: Option<String>,
}

fn default_seed() -> u64 {
    42
}

fn default_start_price() -> f64 {
    50_000.0
}

fn default_volatility() -> f64 {
    0.02
}

fn default_drift() -> f64 {
    0.0005
}

fn default_window() -> usize {
    30
}

fn default_days() -> usize {
    30
}

fn default_trade_quantity() -> f64 {
    0.1
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            window: default_window(),
        }
    }
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            days: default_days(),
            trade_quantity: default_trade_quantity(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            metrics_addr: None,
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config, String> {
    let contents = fs::read_to_string(path)
        .map_err(|err| format!("failed to read config {}: {}", path.display(), err))?;
    let config: Config = toml::from_str(&contents)
        .map_err(|err| format!("failed to parse TOML {}: {}", path.display(), err))?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &Config) -> Result<(), String> {
    match config.data.source.as_str() {
        "csv" => {
            if config.data.csv_path.is_none() {
                return Err("data.source = \"csv\" requires data.csv_path".to_string());
            }
        }
        "synthetic" => {}
        other => return Err(format!("unsupported data.source: {}", other)),
    }
    if config.run.initial_balance <= 0.0 {
        return Err("run.initial_balance must be positive".to_string());
    }
    if config.selection.window < 2 {
        return Err("selection.window must be at least 2 bars".to_string());
    }
    if config.paper.days == 0 {
        return Err("paper.days must be at least 1".to_string());
    }
    if config.paper.trade_quantity <= 0.0 {
        return Err("paper.trade_quantity must be positive".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{load_config, validate_config, Config};
    use std::path::Path;

    fn parse_config(toml_str: &str) -> Config {
        toml::from_str(toml_str).expect("config should parse")
    }

    #[test]
    fn parse_full_config() {
        let toml_str = r#"
[run]
symbol = "BTC-USD"
initial_balance = 100000.0
out_dir = "runs/"

[data]
source = "synthetic"
seed = 7
start_price = 45000.0
daily_volatility = 0.03
drift = 0.001

[selection]
window = 45

[paper]
days = 14
trade_quantity = 0.25

[logging]
level = "debug"
format = "json"
"#;
        let config = parse_config(toml_str);
        assert_eq!(config.run.symbol, "BTC-USD");
        assert_eq!(config.data.seed, 7);
        assert_eq!(config.selection.window, 45);
        assert_eq!(config.paper.trade_quantity, 0.25);
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn optional_sections_fall_back_to_defaults() {
        let toml_str = r#"
[run]
symbol = "ETH-USD"
initial_balance = 10000.0
out_dir = "runs/"

[data]
source = "synthetic"
"#;
        let config = parse_config(toml_str);
        assert_eq!(config.selection.window, 30);
        assert_eq!(config.paper.days, 30);
        assert_eq!(config.paper.trade_quantity, 0.1);
        assert_eq!(config.logging.level, "info");
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn csv_source_requires_a_path() {
        let toml_str = r#"
[run]
symbol = "BTC-USD"
initial_balance = 10000.0
out_dir = "runs/"

[data]
source = "csv"
"#;
        let config = parse_config(toml_str);
        let err = validate_config(&config).expect_err("expected validation failure");
        assert!(err.contains("csv_path"));
    }

    #[test]
    fn load_config_missing_file_returns_error() {
        let path = Path::new("/tmp/helios-missing-config.toml");
        let err = load_config(path).expect_err("expected load to fail");
        assert!(err.contains("failed to read config"));
    }
}
