//! Effective-filter resolution: built-in default, then named preset, then
//! the job's explicit overrides, merged field by field.

use hirescreen_core::{EducationLevel, FilterOverrides, JobRequirement, PresetsFile};
use serde::{Deserialize, Serialize};

/// Fully resolved thresholds for one scoring run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveFilters {
    pub min_experience_years: Option<u32>,
    pub max_experience_years: Option<u32>,
    pub min_education: Option<EducationLevel>,
    pub target_locations: Vec<String>,
    pub min_score: Option<u32>,
}

/// Merges layers lowest precedence first; each `Some` field overwrites.
#[must_use]
pub fn resolve_effective_filters(layers: &[&FilterOverrides]) -> EffectiveFilters {
    let mut out = EffectiveFilters::default();
    for layer in layers {
        if let Some(v) = layer.min_experience_years {
            out.min_experience_years = Some(v);
        }
        if let Some(v) = layer.max_experience_years {
            out.max_experience_years = Some(v);
        }
        if let Some(v) = layer.min_education {
            out.min_education = Some(v);
        }
        if let Some(v) = &layer.target_locations {
            out.target_locations.clone_from(v);
        }
        if let Some(v) = layer.min_score {
            out.min_score = Some(v);
        }
    }
    out
}

/// Resolves the filters for `job`.
///
/// An unknown preset name is logged and ignored. Non-empty auto-match target
/// locations count as an explicit override.
#[must_use]
pub fn resolve_for_job(
    job: &JobRequirement,
    presets: &PresetsFile,
    defaults: &FilterOverrides,
) -> EffectiveFilters {
    let explicit_locations = job
        .auto_match
        .as_ref()
        .filter(|auto| !auto.target_locations.is_empty())
        .map(|auto| FilterOverrides {
            target_locations: Some(auto.target_locations.clone()),
            ..FilterOverrides::default()
        });

    let mut layers: Vec<&FilterOverrides> = vec![defaults];
    if let Some(auto) = &job.auto_match {
        if let Some(name) = auto.preset.as_deref() {
            match presets.get(name) {
                Some(preset) => layers.push(preset),
                None => tracing::warn!(job_id = %job.id, preset = name, "unknown filter preset"),
            }
        }
        if let Some(filters) = &auto.filters {
            layers.push(filters);
        }
    }
    if let Some(locations) = &explicit_locations {
        layers.push(locations);
    }

    resolve_effective_filters(&layers)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use hirescreen_core::AutoMatchConfig;
    use uuid::Uuid;

    use super::*;

    fn presets() -> PresetsFile {
        PresetsFile {
            presets: BTreeMap::from([(
                "senior".to_string(),
                FilterOverrides {
                    min_experience_years: Some(5),
                    max_experience_years: Some(15),
                    min_education: Some(EducationLevel::Bachelor),
                    target_locations: Some(vec!["上海".into()]),
                    min_score: None,
                },
            )]),
        }
    }

    fn job(auto: Option<AutoMatchConfig>) -> JobRequirement {
        JobRequirement {
            id: Uuid::new_v4(),
            title: "Engineer".into(),
            requirement_text: String::new(),
            auto_match: auto,
        }
    }

    #[test]
    fn later_layers_win_field_by_field() {
        let base = FilterOverrides {
            min_experience_years: Some(1),
            max_experience_years: Some(10),
            ..FilterOverrides::default()
        };
        let top = FilterOverrides {
            min_experience_years: Some(3),
            ..FilterOverrides::default()
        };
        let eff = resolve_effective_filters(&[&base, &top]);
        assert_eq!(eff.min_experience_years, Some(3));
        assert_eq!(eff.max_experience_years, Some(10));
    }

    #[test]
    fn job_without_auto_match_uses_defaults() {
        let defaults = FilterOverrides {
            min_score: Some(40),
            ..FilterOverrides::default()
        };
        let eff = resolve_for_job(&job(None), &presets(), &defaults);
        assert_eq!(eff.min_score, Some(40));
        assert!(eff.target_locations.is_empty());
    }

    #[test]
    fn explicit_override_beats_preset_beats_default() {
        let defaults = FilterOverrides {
            min_experience_years: Some(0),
            min_score: Some(30),
            ..FilterOverrides::default()
        };
        let auto = AutoMatchConfig {
            keywords: vec![],
            target_locations: vec!["杭州".into()],
            filters: Some(FilterOverrides {
                max_experience_years: Some(8),
                ..FilterOverrides::default()
            }),
            preset: Some("senior".into()),
        };
        let eff = resolve_for_job(&job(Some(auto)), &presets(), &defaults);
        assert_eq!(eff.min_experience_years, Some(5));
        assert_eq!(eff.max_experience_years, Some(8));
        assert_eq!(eff.min_education, Some(EducationLevel::Bachelor));
        assert_eq!(eff.target_locations, vec!["杭州".to_string()]);
        assert_eq!(eff.min_score, Some(30));
    }

    #[test]
    fn unknown_preset_is_ignored() {
        let auto = AutoMatchConfig {
            preset: Some("missing".into()),
            ..AutoMatchConfig::default()
        };
        let eff = resolve_for_job(&job(Some(auto)), &presets(), &FilterOverrides::default());
        assert_eq!(eff, EffectiveFilters::default());
    }
}
