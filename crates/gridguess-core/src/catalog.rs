//! The catalog of playable countries.
//!
//! This module contains:
//! - Raw input rows (`EnergyRow`, `CoordinateRow`) as supplied by a data loader
//! - `EnergyMix` and `EnergySource` for a country's electricity generation
//! - `Catalog`, the validated, immutable set of countries a game can target
//!
//! A catalog is built once from raw rows. Aggregate regions, rows for other
//! years, rows without generation data and countries without coordinates are
//! dropped; corrupt coordinates abort the build.

use crate::geo::{CoordinateError, Coordinates};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use thiserror::Error;

/// Year the energy snapshot is taken from unless configured otherwise
pub const DEFAULT_REFERENCE_YEAR: i32 = 2020;

/// Names in the energy dataset that are regions or groupings, not countries
pub const EXCLUDED_REGIONS: &[&str] = &[
    "World",
    "Africa",
    "Asia",
    "Europe",
    "European Union (27)",
    "Oceania",
    "Antarctica",
    "Middle East",
    "North America",
    "South America",
    "Central America",
    "Latin America and Caribbean",
    "OECD",
    "Non-OECD",
    "OPEC",
    "G20",
    "G7",
    "USSR",
    "High-income countries",
    "Upper-middle-income countries",
    "Lower-middle-income countries",
    "Low-income countries",
    "Netherlands Antilles",
    "Palestine",
    "Niue",
];

/// Suffixes marking a data provider's regional aggregate, e.g. "Asia Pacific (EI)"
const PROVIDER_TAGS: &[&str] = &["(Ember)", "(EI)", "(EIA)", "(BP)", "(Shift)"];

/// Errors that prevent a catalog from being built
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CatalogError {
    #[error("{0} data is unavailable")]
    DataUnavailable(&'static str),

    #[error("invalid coordinates for {country}: {source}")]
    CoordinateOutOfRange {
        country: String,
        source: CoordinateError,
    },

    #[error("no playable countries for year {0}")]
    Empty(i32),
}

/// One row of the per-country, per-year energy dataset.
///
/// Field names follow the Our World in Data energy CSV. Values are TWh;
/// missing values are `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnergyRow {
    pub country: String,
    pub year: i32,
    #[serde(default)]
    pub electricity_generation: Option<f64>,
    #[serde(default)]
    pub coal_electricity: Option<f64>,
    #[serde(default)]
    pub gas_electricity: Option<f64>,
    #[serde(default)]
    pub oil_electricity: Option<f64>,
    #[serde(default)]
    pub hydro_electricity: Option<f64>,
    #[serde(default)]
    pub nuclear_electricity: Option<f64>,
    #[serde(default)]
    pub solar_electricity: Option<f64>,
    #[serde(default)]
    pub wind_electricity: Option<f64>,
    #[serde(default)]
    pub biofuel_electricity: Option<f64>,
    #[serde(default)]
    pub other_renewable_electricity: Option<f64>,
}

/// One geocoded country
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoordinateRow {
    pub country: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

/// Electricity sources tracked per country
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EnergySource {
    Coal,
    Gas,
    Oil,
    Hydro,
    Nuclear,
    Solar,
    Wind,
    Biofuel,
    OtherRenewables,
}

impl EnergySource {
    pub const ALL: [EnergySource; 9] = [
        EnergySource::Coal,
        EnergySource::Gas,
        EnergySource::Oil,
        EnergySource::Hydro,
        EnergySource::Nuclear,
        EnergySource::Solar,
        EnergySource::Wind,
        EnergySource::Biofuel,
        EnergySource::OtherRenewables,
    ];

    /// Human-readable name
    pub fn label(self) -> &'static str {
        match self {
            EnergySource::Coal => "coal",
            EnergySource::Gas => "gas",
            EnergySource::Oil => "oil",
            EnergySource::Hydro => "hydro",
            EnergySource::Nuclear => "nuclear",
            EnergySource::Solar => "solar",
            EnergySource::Wind => "wind",
            EnergySource::Biofuel => "biofuel",
            EnergySource::OtherRenewables => "other renewables",
        }
    }

    /// Whether the source counts as fossil fuel
    pub fn is_fossil(self) -> bool {
        matches!(self, EnergySource::Coal | EnergySource::Gas | EnergySource::Oil)
    }
}

/// A country's electricity generation for the reference year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyMix {
    /// Total generation in TWh, always positive
    pub total_generation: f64,
    /// Generation per source in TWh, every source present
    pub sources: BTreeMap<EnergySource, f64>,
}

impl EnergyMix {
    /// Build from a raw row. Returns `None` if the row has no usable total,
    /// or any source value is negative or non-finite.
    fn from_row(row: &EnergyRow) -> Option<Self> {
        let total = row.electricity_generation?;
        if !total.is_finite() || total <= 0.0 {
            return None;
        }

        let value = |v: Option<f64>| -> Option<f64> {
            match v {
                None => Some(0.0),
                Some(x) if x.is_finite() && x >= 0.0 => Some(x),
                Some(_) => None,
            }
        };

        let biofuel = value(row.biofuel_electricity)?;
        // The dataset's "other renewable" column already includes biofuel
        let other = (value(row.other_renewable_electricity)? - biofuel).max(0.0);

        let sources = BTreeMap::from([
            (EnergySource::Coal, value(row.coal_electricity)?),
            (EnergySource::Gas, value(row.gas_electricity)?),
            (EnergySource::Oil, value(row.oil_electricity)?),
            (EnergySource::Hydro, value(row.hydro_electricity)?),
            (EnergySource::Nuclear, value(row.nuclear_electricity)?),
            (EnergySource::Solar, value(row.solar_electricity)?),
            (EnergySource::Wind, value(row.wind_electricity)?),
            (EnergySource::Biofuel, biofuel),
            (EnergySource::OtherRenewables, other),
        ]);

        Some(Self {
            total_generation: total,
            sources,
        })
    }

    /// Generation for one source in TWh
    pub fn get(&self, source: EnergySource) -> f64 {
        self.sources.get(&source).copied().unwrap_or(0.0)
    }

    /// Fraction of total generation from one source
    pub fn share(&self, source: EnergySource) -> f64 {
        self.get(source) / self.total_generation
    }

    /// Combined fraction from coal, gas and oil
    pub fn fossil_share(&self) -> f64 {
        EnergySource::ALL
            .iter()
            .filter(|s| s.is_fossil())
            .map(|&s| self.share(s))
            .sum()
    }

    /// The largest source, if any source is non-zero
    pub fn dominant(&self) -> Option<EnergySource> {
        self.sources
            .iter()
            .filter(|&(_, &v)| v > 0.0)
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(&s, _)| s)
    }
}

/// A playable country
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Canonical name, unique within the catalog
    pub name: String,
    pub coordinates: Coordinates,
    pub energy_mix: EnergyMix,
}

/// Whether a dataset name denotes an aggregate rather than a country
pub fn is_aggregate(name: &str) -> bool {
    if EXCLUDED_REGIONS.contains(&name) {
        return true;
    }
    let name = name.trim_end();
    PROVIDER_TAGS.iter().any(|tag| name.ends_with(tag))
}

/// The immutable set of playable countries, sorted by name
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Vec<Arc<CatalogEntry>>,
    by_name: HashMap<String, usize>,
    by_lowercase: HashMap<String, usize>,
}

impl Catalog {
    /// Build a catalog for `reference_year` from raw energy and coordinate rows
    pub fn build(
        energy_rows: &[EnergyRow],
        coordinate_rows: &[CoordinateRow],
        reference_year: i32,
    ) -> Result<Self, CatalogError> {
        if energy_rows.is_empty() {
            return Err(CatalogError::DataUnavailable("energy"));
        }
        if coordinate_rows.is_empty() {
            return Err(CatalogError::DataUnavailable("coordinate"));
        }

        let mut coordinates: HashMap<&str, Coordinates> = HashMap::new();
        for row in coordinate_rows {
            let (Some(lat), Some(lon)) = (row.latitude, row.longitude) else {
                continue;
            };
            let coords = Coordinates::new(lat, lon).map_err(|source| {
                CatalogError::CoordinateOutOfRange {
                    country: row.country.clone(),
                    source,
                }
            })?;
            coordinates.entry(row.country.as_str()).or_insert(coords);
        }

        let mut selected: BTreeMap<&str, CatalogEntry> = BTreeMap::new();
        for row in energy_rows {
            if row.year != reference_year || is_aggregate(&row.country) {
                continue;
            }
            if selected.contains_key(row.country.as_str()) {
                continue;
            }
            let Some(&coords) = coordinates.get(row.country.as_str()) else {
                continue;
            };
            let Some(energy_mix) = EnergyMix::from_row(row) else {
                continue;
            };
            selected.insert(
                row.country.as_str(),
                CatalogEntry {
                    name: row.country.clone(),
                    coordinates: coords,
                    energy_mix,
                },
            );
        }

        Self::from_entries(selected.into_values(), reference_year)
    }

    /// Build directly from already-validated entries
    pub fn from_entries(
        entries: impl IntoIterator<Item = CatalogEntry>,
        reference_year: i32,
    ) -> Result<Self, CatalogError> {
        let mut entries: Vec<CatalogEntry> = entries.into_iter().collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries.dedup_by(|a, b| a.name == b.name);

        if entries.is_empty() {
            return Err(CatalogError::Empty(reference_year));
        }

        let mut by_name = HashMap::with_capacity(entries.len());
        let mut by_lowercase = HashMap::with_capacity(entries.len());
        for (idx, entry) in entries.iter().enumerate() {
            by_name.insert(entry.name.clone(), idx);
            // Names differing only by case resolve to the first alphabetically
            if let Entry::Vacant(slot) = by_lowercase.entry(entry.name.to_lowercase()) {
                slot.insert(idx);
            }
        }

        Ok(Self {
            entries: entries.into_iter().map(Arc::new).collect(),
            by_name,
            by_lowercase,
        })
    }

    /// Number of playable countries (never zero)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false; a built catalog has at least one entry
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries, sorted by name
    pub fn entries(&self) -> &[Arc<CatalogEntry>] {
        &self.entries
    }

    /// All country names, sorted
    pub fn all_names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    /// Exact, case-sensitive lookup by canonical name
    pub fn lookup(&self, name: &str) -> Option<&Arc<CatalogEntry>> {
        self.by_name.get(name).map(|&idx| &self.entries[idx])
    }

    /// Whole-name lookup ignoring case
    pub fn lookup_ignore_case(&self, name: &str) -> Option<&Arc<CatalogEntry>> {
        self.by_lowercase
            .get(&name.to_lowercase())
            .map(|&idx| &self.entries[idx])
    }

    /// Pick an entry uniformly at random
    pub fn random_entry<R: Rng + ?Sized>(&self, rng: &mut R) -> &Arc<CatalogEntry> {
        &self.entries[rng.gen_range(0..self.entries.len())]
    }
}
