//! Deterministic rule-based scoring of candidates against job requirements.

pub mod engine;
pub mod filters;
pub mod prefilter;
pub mod rank;
pub mod weights;

pub use engine::{MatchEngine, PreparedJob};
pub use filters::{resolve_effective_filters, resolve_for_job, EffectiveFilters};
pub use prefilter::{keyword_containment_ratio, prefilter_result, DEFAULT_SKIP_THRESHOLD};
pub use rank::{rank_candidates, RankOptions};
pub use weights::{PenaltyRates, ScoringConfig, ScoringWeights};
