use std::collections::HashSet;

use jsonschema::{Draft, JSONSchema};
use serde_json::Value;

use crate::error::{RecommendError, Result};
use crate::itinerary::types::Itinerary;

const MAX_SCHEMA_ERRORS: usize = 3;

/// Name endings that mark a generic area (neighborhood, street, plaza) rather
/// than a specific, mappable venue.
pub const FORBIDDEN_SUFFIXES: [&str; 8] =
    ["동", "읍", "면", "리", "거리", "타운", "스퀘어", "프라자"];

/// Validates untrusted candidate itineraries against the strict schema plus
/// the business rules JSON Schema cannot express.
///
/// `is_valid` is total: it returns `false` for any malformed input, including
/// inputs of entirely the wrong shape, and never panics.
pub struct ItineraryValidator {
    compiled: JSONSchema,
}

impl ItineraryValidator {
    pub fn new() -> Result<Self> {
        let root = schemars::schema_for!(Itinerary);
        let schema_json = serde_json::to_value(root)?;
        let compiled = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&schema_json)
            .map_err(|err| {
                RecommendError::Config(format!("failed to compile itinerary schema: {}", err))
            })?;
        Ok(Self { compiled })
    }

    /// Structural pass over the compiled schema, then the hand-checked rules:
    /// forbidden name suffixes, category diversity and the travel-slack window.
    pub fn is_valid(&self, candidate: &Value) -> bool {
        self.compiled.is_valid(candidate) && business_rules(candidate)
    }

    /// Up to [`MAX_SCHEMA_ERRORS`] structural violations for retry-loop logs,
    /// or `None` when the candidate passes the structural schema.
    pub fn explain(&self, candidate: &Value) -> Option<String> {
        let errors = match self.compiled.validate(candidate) {
            Ok(()) => return None,
            Err(errors) => errors,
        };

        let mut details = Vec::new();
        let mut truncated = false;
        for (idx, error) in errors.enumerate() {
            if idx < MAX_SCHEMA_ERRORS {
                let mut path = error.instance_path.to_string();
                if path.is_empty() {
                    path = "<root>".to_string();
                }
                details.push(format!("{}: {}", path, error));
            } else {
                truncated = true;
                break;
            }
        }

        let mut detail = if details.is_empty() {
            "candidate failed schema validation".to_string()
        } else {
            details.join("; ")
        };
        if truncated {
            detail.push_str("; additional errors truncated");
        }
        Some(detail)
    }
}

fn business_rules(candidate: &Value) -> bool {
    let courses = match candidate.get("courses").and_then(Value::as_array) {
        Some(courses) => courses,
        None => return false,
    };
    if courses.len() != 3 {
        return false;
    }
    courses.iter().all(course_rules)
}

fn course_rules(course: &Value) -> bool {
    let stops = match course.get("스톱").and_then(Value::as_array) {
        Some(stops) => stops,
        None => return false,
    };
    if !(3..=7).contains(&stops.len()) {
        return false;
    }

    let mut categories = HashSet::new();
    let mut stop_minutes: i64 = 0;
    for stop in stops {
        let name = match stop.get("장소명").and_then(Value::as_str) {
            Some(name) => name,
            None => return false,
        };
        if name.is_empty() || has_forbidden_suffix(name) {
            return false;
        }
        if stop
            .get("설명")
            .and_then(Value::as_str)
            .map_or(true, str::is_empty)
        {
            return false;
        }
        // as_i64 also enforces strict integers: 90.0 is rejected here even
        // though the structural pass tolerates it.
        let minutes = match stop.get("권장체류시간").and_then(Value::as_i64) {
            Some(minutes) => minutes,
            None => return false,
        };
        if !(15..=240).contains(&minutes) {
            return false;
        }
        if stop.get("권장시간대").and_then(Value::as_str).is_none() {
            return false;
        }
        let category = match stop.get("카테고리").and_then(Value::as_str) {
            Some(category) => category,
            None => return false,
        };
        categories.insert(category);
        stop_minutes += minutes;
    }

    if categories.len() < 2 {
        return false;
    }

    let total = match course.get("총예상소요시간").and_then(Value::as_i64) {
        Some(total) => total,
        None => return false,
    };
    if !(120..=900).contains(&total) {
        return false;
    }
    // The stated total must cover the stops plus 30-120 minutes of travel.
    if !(stop_minutes + 30..=stop_minutes + 120).contains(&total) {
        return false;
    }

    course
        .get("코스명")
        .and_then(Value::as_str)
        .map_or(false, |title| !title.is_empty())
}

fn has_forbidden_suffix(name: &str) -> bool {
    let trimmed = name.trim();
    FORBIDDEN_SUFFIXES
        .iter()
        .any(|suffix| trimmed.ends_with(suffix))
}
