use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::candidates::EducationLevel;
use crate::ConfigError;

/// Threshold fields that can be supplied by a built-in default, a named
/// preset, or an explicit per-job override. `None` means "not specified at
/// this layer".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOverrides {
    #[serde(default)]
    pub min_experience_years: Option<u32>,
    #[serde(default)]
    pub max_experience_years: Option<u32>,
    #[serde(default)]
    pub min_education: Option<EducationLevel>,
    #[serde(default)]
    pub target_locations: Option<Vec<String>>,
    #[serde(default)]
    pub min_score: Option<u32>,
}

/// Automatic matching configuration attached to a job requirement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoMatchConfig {
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub target_locations: Vec<String>,
    /// Suggested thresholds; the explicit override layer.
    #[serde(default)]
    pub filters: Option<FilterOverrides>,
    /// Name of a preset in the presets file.
    #[serde(default)]
    pub preset: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRequirement {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub requirement_text: String,
    #[serde(default)]
    pub auto_match: Option<AutoMatchConfig>,
}

impl JobRequirement {
    /// Job keywords from the auto-match config, or empty.
    #[must_use]
    pub fn keywords(&self) -> &[String] {
        self.auto_match
            .as_ref()
            .map_or(&[][..], |a| a.keywords.as_slice())
    }

    /// Target locations from the auto-match config, or empty.
    #[must_use]
    pub fn target_locations(&self) -> &[String] {
        self.auto_match
            .as_ref()
            .map_or(&[][..], |a| a.target_locations.as_slice())
    }

    /// Build an ad-hoc requirement for keyword-scoped work that has no stored job.
    #[must_use]
    pub fn from_keywords(title: &str, keywords: Vec<String>, target_locations: Vec<String>) -> Self {
        Self {
            id: Uuid::nil(),
            title: title.to_string(),
            requirement_text: String::new(),
            auto_match: Some(AutoMatchConfig {
                keywords,
                target_locations,
                filters: None,
                preset: None,
            }),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PresetsFile {
    #[serde(default)]
    pub presets: BTreeMap<String, FilterOverrides>,
}

impl PresetsFile {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FilterOverrides> {
        self.presets.get(name)
    }
}

/// Load and validate named filter presets from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or a preset has
/// `min_experience_years > max_experience_years`.
pub fn load_filter_presets(path: &Path) -> Result<PresetsFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let file: PresetsFile = serde_yaml::from_str(&content)?;

    for (name, preset) in &file.presets {
        if let (Some(min), Some(max)) = (preset.min_experience_years, preset.max_experience_years) {
            if min > max {
                return Err(ConfigError::Validation(format!(
                    "preset '{name}' has min_experience_years {min} > max_experience_years {max}"
                )));
            }
        }
    }

    Ok(file)
}

/// Like [`load_filter_presets`] but degrades to an empty preset set on any
/// failure, logging a warning.
#[must_use]
pub fn load_filter_presets_or_default(path: &Path) -> PresetsFile {
    match load_filter_presets(path) {
        Ok(file) => file,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "filter presets unavailable; using none");
            PresetsFile::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_parse_from_yaml() {
        let yaml = r"
presets:
  junior:
    min_experience_years: 0
    max_experience_years: 3
    min_education: associate
    target_locations: [上海, 杭州]
  senior:
    min_experience_years: 5
";
        let file: PresetsFile = serde_yaml::from_str(yaml).expect("parse");
        let junior = file.get("junior").expect("junior preset");
        assert_eq!(junior.max_experience_years, Some(3));
        assert_eq!(junior.min_education, Some(EducationLevel::Associate));
        assert_eq!(junior.target_locations.as_ref().map(Vec::len), Some(2));
        assert!(file.get("senior").unwrap().max_experience_years.is_none());
    }

    #[test]
    fn missing_presets_file_degrades_to_empty() {
        let file = load_filter_presets_or_default(Path::new("/nonexistent/presets.yaml"));
        assert!(file.presets.is_empty());
    }

    #[test]
    fn inverted_experience_bounds_are_rejected() {
        let dir = std::env::temp_dir().join(format!("hirescreen-presets-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("presets.yaml");
        std::fs::write(
            &path,
            "presets:\n  bad:\n    min_experience_years: 8\n    max_experience_years: 2\n",
        )
        .unwrap();
        let err = load_filter_presets(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref m) if m.contains("bad")));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn keyword_job_has_nil_id_and_keywords() {
        let job = JobRequirement::from_keywords("adhoc", vec!["rust".into()], vec![]);
        assert!(job.id.is_nil());
        assert_eq!(job.keywords(), &["rust".to_string()]);
        assert!(job.target_locations().is_empty());
    }
}
