//! Hint generation.
//!
//! Hints come from a [`HintProvider`]. Providers may call out to remote
//! services and fail; [`hint_or_fallback`] turns any failure into a fixed
//! message so a hint request never disturbs the game.

use crate::catalog::{CatalogEntry, EnergySource};
use thiserror::Error;

/// Shown when a provider cannot produce a hint
pub const FALLBACK_HINT: &str = "Unable to generate hint at this time.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HintError {
    #[error("hint provider is not configured")]
    NotConfigured,

    #[error("hint provider failed: {0}")]
    Provider(String),
}

/// Input to a hint provider
#[derive(Debug, Clone, Copy)]
pub struct HintRequest<'a> {
    /// Free text from the player, possibly empty
    pub prompt: &'a str,
    pub target: &'a CatalogEntry,
}

/// Produces a natural-language hint about the target.
///
/// Implementations must not include the target's name; this is not
/// re-checked by the caller.
pub trait HintProvider: Send + Sync {
    fn generate(&self, request: &HintRequest<'_>) -> Result<String, HintError>;
}

/// Ask `provider` for a hint, substituting [`FALLBACK_HINT`] on failure
pub fn hint_or_fallback(provider: &dyn HintProvider, request: &HintRequest<'_>) -> String {
    match provider.generate(request) {
        Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
        _ => FALLBACK_HINT.to_string(),
    }
}

/// Offline hints built from the target's energy mix and hemisphere
#[derive(Debug, Clone, Copy, Default)]
pub struct EnergyMixHints;

impl HintProvider for EnergyMixHints {
    fn generate(&self, request: &HintRequest<'_>) -> Result<String, HintError> {
        let mix = &request.target.energy_mix;
        let dominant = mix
            .dominant()
            .ok_or_else(|| HintError::Provider("no generation by source".into()))?;

        let hemisphere = if request.target.coordinates.is_northern() {
            "northern"
        } else {
            "southern"
        };
        let share = (mix.share(dominant) * 100.0).round();
        let fossil = (mix.fossil_share() * 100.0).round();

        let mut hint = format!(
            "This {hemisphere}-hemisphere country gets about {share:.0}% of its electricity from {}",
            dominant.label()
        );
        if dominant.is_fossil() {
            hint.push_str(&format!(", and {fossil:.0}% from fossil fuels overall."));
        } else if mix.get(EnergySource::Nuclear) > 0.0 && dominant != EnergySource::Nuclear {
            hint.push_str(", and it also runs nuclear plants.");
        } else {
            hint.push('.');
        }
        Ok(hint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::EnergyMix;
    use crate::geo::Coordinates;
    use std::collections::BTreeMap;

    struct Failing;

    impl HintProvider for Failing {
        fn generate(&self, _request: &HintRequest<'_>) -> Result<String, HintError> {
            Err(HintError::NotConfigured)
        }
    }

    fn norway() -> CatalogEntry {
        let mut sources: BTreeMap<EnergySource, f64> =
            EnergySource::ALL.iter().map(|&s| (s, 0.0)).collect();
        sources.insert(EnergySource::Hydro, 141.7);
        sources.insert(EnergySource::Wind, 9.9);
        sources.insert(EnergySource::Gas, 2.6);
        CatalogEntry {
            name: "Norway".into(),
            coordinates: Coordinates::new(60.5, 8.5).unwrap(),
            energy_mix: EnergyMix {
                total_generation: 154.2,
                sources,
            },
        }
    }

    #[test]
    fn test_energy_mix_hint_hides_name() {
        let target = norway();
        let request = HintRequest {
            prompt: "",
            target: &target,
        };
        let hint = EnergyMixHints.generate(&request).unwrap();
        assert_eq!(
            hint,
            "This northern-hemisphere country gets about 92% of its electricity from hydro."
        );
        assert!(!hint.contains("Norway"));
    }

    #[test]
    fn test_failure_falls_back() {
        let target = norway();
        let request = HintRequest {
            prompt: "help",
            target: &target,
        };
        assert_eq!(hint_or_fallback(&Failing, &request), FALLBACK_HINT);
    }

    #[test]
    fn test_empty_mix_falls_back() {
        let mut target = norway();
        for value in target.energy_mix.sources.values_mut() {
            *value = 0.0;
        }
        let request = HintRequest {
            prompt: "",
            target: &target,
        };
        assert_eq!(hint_or_fallback(&EnergyMixHints, &request), FALLBACK_HINT);
    }
}
