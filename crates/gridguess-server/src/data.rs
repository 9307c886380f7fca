//! Loading the catalog from CSV files.
//!
//! Rows that fail to parse are logged and skipped; only a missing file or a
//! catalog with no playable countries stops startup.

use anyhow::{Context, Result};
use gridguess_core::{Catalog, CoordinateRow, EnergyRow};
use serde::de::DeserializeOwned;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

use crate::config::ServerConfig;

/// Deserialize every well-formed record, skipping the rest
pub fn read_rows<T: DeserializeOwned, R: Read>(reader: R, label: &str) -> Vec<T> {
    let mut csv = csv::Reader::from_reader(reader);
    let mut rows = Vec::new();
    let mut skipped = 0usize;

    for (line, record) in csv.deserialize::<T>().enumerate() {
        match record {
            Ok(row) => rows.push(row),
            Err(e) => {
                skipped += 1;
                warn!("Skipping {} row {}: {}", label, line + 2, e);
            }
        }
    }

    if skipped > 0 {
        warn!("Skipped {} malformed {} rows", skipped, label);
    }
    rows
}

pub fn load_energy_rows(path: &Path) -> Result<Vec<EnergyRow>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("opening energy data {}", path.display()))?;
    Ok(read_rows(file, "energy"))
}

pub fn load_coordinate_rows(path: &Path) -> Result<Vec<CoordinateRow>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("opening coordinates {}", path.display()))?;
    Ok(read_rows(file, "coordinate"))
}

/// Load both files and build the catalog
pub fn load_catalog(config: &ServerConfig) -> Result<Catalog> {
    let energy = load_energy_rows(&config.energy_csv)?;
    let coordinates = load_coordinate_rows(&config.coordinates_csv)?;
    info!(
        "Read {} energy rows and {} coordinate rows",
        energy.len(),
        coordinates.len()
    );

    let catalog = Catalog::build(&energy, &coordinates, config.reference_year)
        .context("building country catalog")?;
    info!(
        "Catalog ready: {} playable countries for {}",
        catalog.len(),
        config.reference_year
    );
    Ok(catalog)
}
