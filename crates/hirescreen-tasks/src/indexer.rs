use hirescreen_core::{CandidateContent, StructuredIndex, Vocabulary};
use hirescreen_signals::{build_structured_index_with, IndustryClassifier};

/// Vocabulary plus its compiled industry classifier, built once per batch.
#[derive(Debug, Default)]
pub struct CandidateIndexer {
    vocabulary: Vocabulary,
    classifier: IndustryClassifier,
}

impl CandidateIndexer {
    #[must_use]
    pub fn new(vocabulary: Vocabulary) -> Self {
        let classifier = IndustryClassifier::new(&vocabulary.industries);
        Self {
            vocabulary,
            classifier,
        }
    }

    #[must_use]
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    #[must_use]
    pub fn index(&self, content: &CandidateContent) -> StructuredIndex {
        build_structured_index_with(content, &self.vocabulary, &self.classifier)
    }
}
