use crate::value_objects::order::Order;
use std::path::Path;

/// Port for run-output persistence (summary JSON, order log CSV). The
/// filesystem adapter lives in the infrastructure crate.
pub trait ArtifactWriter {
    fn ensure_dir(&self, path: &Path) -> Result<(), String>;
    fn write_json(&self, path: &Path, value: &serde_json::Value) -> Result<(), String>;
    fn write_orders_csv(&self, path: &Path, orders: &[Order]) -> Result<(), String>;
}
