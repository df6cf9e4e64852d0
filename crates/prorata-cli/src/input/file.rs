use prorata_core::facility::availability::Vehicle;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Read a JSON or YAML document (chosen by extension) into a typed struct.
pub fn read_document<T: DeserializeOwned>(path: &str) -> Result<T, Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    let contents = fs::read_to_string(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;
    let value: T = if is_yaml(&canonical) {
        serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?
    } else {
        serde_json::from_str(&contents)
            .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?
    };
    debug!(path = %canonical.display(), "loaded input document");
    Ok(value)
}

/// Read the vehicles table. `.csv` files are read row by row with a header
/// line; anything else must hold a JSON/YAML list of vehicles.
pub fn read_vehicles(path: &str) -> Result<Vec<Vehicle>, Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    if !has_extension(&canonical, &["csv"]) {
        return read_document(path);
    }

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;

    let mut vehicles = Vec::new();
    for (i, record) in reader.deserialize::<Vehicle>().enumerate() {
        let vehicle =
            record.map_err(|e| format!("{}: row {}: {}", canonical.display(), i + 1, e))?;
        vehicles.push(vehicle);
    }
    debug!(path = %canonical.display(), rows = vehicles.len(), "loaded vehicles csv");
    Ok(vehicles)
}

fn is_yaml(path: &Path) -> bool {
    has_extension(path, &["yaml", "yml"])
}

fn has_extension(path: &Path, exts: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| exts.iter().any(|x| e.eq_ignore_ascii_case(x)))
        .unwrap_or(false)
}

/// Resolve the path against the working directory and check it is a file.
fn resolve_path(path: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let p = Path::new(path);
    let canonical = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir()?.join(p)
    };

    if !canonical.exists() {
        return Err(format!("File not found: {}", canonical.display()).into());
    }
    if !canonical.is_file() {
        return Err(format!("Not a file: {}", canonical.display()).into());
    }

    Ok(canonical)
}
