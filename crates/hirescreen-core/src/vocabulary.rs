use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Known skills, locations and industry term sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabulary {
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub locations: Vec<String>,
    /// Industry tag -> terms. A term is a plain substring unless it starts
    /// with `re:` or contains `|`, in which case it is a pattern.
    #[serde(default)]
    pub industries: BTreeMap<String, Vec<String>>,
}

impl Vocabulary {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.skills.is_empty() && self.locations.is_empty() && self.industries.is_empty()
    }

    /// Parse a vocabulary from YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::FileParse`] on malformed YAML.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }
}

/// File-backed vocabulary, re-read on every [`VocabularySource::load`].
#[derive(Debug, Clone)]
pub struct VocabularySource {
    path: PathBuf,
}

impl VocabularySource {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file now. A missing or malformed file yields an empty
    /// vocabulary and a warning.
    #[must_use]
    pub fn load(&self) -> Vocabulary {
        match self.try_load() {
            Ok(vocab) => vocab,
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "vocabulary unavailable; continuing with empty vocabulary"
                );
                Vocabulary::default()
            }
        }
    }

    fn try_load(&self) -> Result<Vocabulary, ConfigError> {
        let text = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileIo {
            path: self.path.display().to_string(),
            source: e,
        })?;
        Vocabulary::from_yaml(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_sections() {
        let vocab = Vocabulary::from_yaml(
            r"
skills: [rust, sql]
locations: [北京, 上海]
industries:
  fintech: [银行, 're:pay(ment)?s?']
",
        )
        .unwrap();
        assert_eq!(vocab.skills.len(), 2);
        assert_eq!(vocab.locations[1], "上海");
        assert_eq!(vocab.industries["fintech"].len(), 2);
        assert!(!vocab.is_empty());
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let vocab = Vocabulary::from_yaml("skills: [go]\n").unwrap();
        assert!(vocab.locations.is_empty());
        assert!(vocab.industries.is_empty());
    }

    #[test]
    fn missing_file_degrades_to_empty() {
        let source = VocabularySource::new("/definitely/not/here.yaml");
        assert!(source.load().is_empty());
    }

    #[test]
    fn malformed_file_degrades_to_empty() {
        let path = std::env::temp_dir().join(format!("vocab-{}.yaml", uuid::Uuid::new_v4()));
        std::fs::write(&path, "skills: [unterminated").unwrap();
        let source = VocabularySource::new(&path);
        assert!(source.load().is_empty());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn reload_picks_up_changes() {
        let path = std::env::temp_dir().join(format!("vocab-{}.yaml", uuid::Uuid::new_v4()));
        std::fs::write(&path, "skills: [rust]\n").unwrap();
        let source = VocabularySource::new(&path);
        assert_eq!(source.load().skills, vec!["rust".to_string()]);
        std::fs::write(&path, "skills: [rust, go]\n").unwrap();
        assert_eq!(source.load().skills.len(), 2);
        let _ = std::fs::remove_file(&path);
    }
}
