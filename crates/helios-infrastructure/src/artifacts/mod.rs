use std::fs;
use std::path::Path;

use helios_domain::repositories::artifacts::ArtifactWriter;
use helios_domain::value_objects::order::Order;

#[derive(Debug, Default, Clone, Copy)]
pub struct FilesystemArtifactWriter;

impl FilesystemArtifactWriter {
    pub fn new() -> Self {
        Self
    }
}

impl ArtifactWriter for FilesystemArtifactWriter {
    fn ensure_dir(&self, path: &Path) -> Result<(), String> {
        fs::create_dir_all(path)
            .map_err(|err| format!("failed to create dir {}: {}", path.display(), err))
    }

    fn write_json(&self, path: &Path, value: &serde_json::Value) -> Result<(), String> {
        let body = serde_json::to_string_pretty(value)
            .map_err(|err| format!("failed to serialize {}: {}", path.display(), err))?;
        fs::write(path, body)
            .map_err(|err| format!("failed to write {}: {}", path.display(), err))
    }

    fn write_orders_csv(&self, path: &Path, orders: &[Order]) -> Result<(), String> {
        let mut writer = csv::Writer::from_path(path)
            .map_err(|err| format!("failed to create {}: {}", path.display(), err))?;
        writer
            .write_record(["id", "timestamp", "symbol", "side", "quantity", "price", "status"])
            .map_err(|err| format!("failed to write header: {}", err))?;
        for order in orders {
            writer
                .write_record([
                    order.id.to_string(),
                    order.timestamp.to_string(),
                    order.symbol.clone(),
                    order.side.as_str().to_string(),
                    format!("{:.8}", order.quantity),
                    format!("{:.8}", order.price),
                    format!("{:?}", order.status).to_lowercase(),
                ])
                .map_err(|err| format!("failed to write order row: {}", err))?;
        }
        writer
            .flush()
            .map_err(|err| format!("failed to flush {}: {}", path.display(), err))
    }
}
