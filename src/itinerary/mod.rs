//! The itinerary domain: typed model, untrusted-candidate parsing, field
//! normalization and schema/business-rule validation.

pub mod normalize;
pub mod parse;
pub mod types;
pub mod validate;

pub use normalize::normalize_fields;
pub use parse::extract_candidate;
pub use types::{Category, Course, Itinerary, Stop, TimeOfDay};
pub use validate::{ItineraryValidator, FORBIDDEN_SUFFIXES};
