//! Pure text-to-signal extraction, identity derivation and dedup planning.
//!
//! Nothing in this crate performs I/O or returns an error: malformed input
//! degrades to `None` or an empty collection.

pub mod dedup;
pub mod education;
pub mod experience;
pub mod identity;
pub mod index;
pub mod industry;
pub mod location;
pub mod salary;
pub(crate) mod scan;
pub mod text;
pub mod tokens;

pub use dedup::{plan_merge, MergeGroup, MergePlan};
pub use education::parse_education_level;
pub use experience::parse_experience_years;
pub use identity::{derive_identity_key, normalize_profile_url};
pub use index::{build_structured_index, build_structured_index_with, content_hash};
pub use industry::IndustryClassifier;
pub use location::parse_location_city;
pub use salary::parse_salary_range;
pub use text::build_search_text;
pub use tokens::{extract_companies, extract_skills, MAX_COMPANIES, MAX_SKILLS};
