use std::path::PathBuf;

use hirescreen_core::{load_filter_presets_or_default, PresetsFile, Vocabulary, VocabularySource};

/// Vocabulary and filter presets, fetched at the start of each run.
pub trait ReferenceData: Send + Sync {
    fn vocabulary(&self) -> Vocabulary;
    fn presets(&self) -> PresetsFile;
}

/// Re-reads both YAML files on every call. Missing or malformed files
/// degrade to empty with a warning.
#[derive(Debug, Clone)]
pub struct FileReferenceData {
    vocabulary: VocabularySource,
    presets_path: PathBuf,
}

impl FileReferenceData {
    #[must_use]
    pub fn new(vocabulary_path: impl Into<PathBuf>, presets_path: impl Into<PathBuf>) -> Self {
        Self {
            vocabulary: VocabularySource::new(vocabulary_path),
            presets_path: presets_path.into(),
        }
    }
}

impl ReferenceData for FileReferenceData {
    fn vocabulary(&self) -> Vocabulary {
        self.vocabulary.load()
    }

    fn presets(&self) -> PresetsFile {
        load_filter_presets_or_default(&self.presets_path)
    }
}

/// Fixed in-memory reference data.
#[derive(Debug, Clone, Default)]
pub struct StaticReferenceData {
    pub vocabulary: Vocabulary,
    pub presets: PresetsFile,
}

impl ReferenceData for StaticReferenceData {
    fn vocabulary(&self) -> Vocabulary {
        self.vocabulary.clone()
    }

    fn presets(&self) -> PresetsFile {
        self.presets.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_reference_data_degrades_when_files_are_missing() {
        let data = FileReferenceData::new("/nonexistent/vocab.yaml", "/nonexistent/presets.yaml");
        assert!(data.vocabulary().is_empty());
        assert!(data.presets().presets.is_empty());
    }

    #[test]
    fn file_reference_data_rereads_on_each_call() {
        let dir = std::env::temp_dir().join(format!("hirescreen-ref-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let vocab_path = dir.join("vocabulary.yaml");
        std::fs::write(&vocab_path, "skills: [rust]\n").unwrap();

        let data = FileReferenceData::new(&vocab_path, dir.join("missing.yaml"));
        assert_eq!(data.vocabulary().skills, vec!["rust".to_string()]);

        std::fs::write(&vocab_path, "skills: [rust, sql]\n").unwrap();
        assert_eq!(data.vocabulary().skills.len(), 2);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
