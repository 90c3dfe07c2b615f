use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{RecommendError, Result};

/// Top-level recommendation result: exactly three alternative day courses.
///
/// The wire contract keeps the localized field names the model is instructed
/// to emit; `courses` is the only neutral key in the canonical shape.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Itinerary {
    #[schemars(length(min = 3, max = 3))]
    pub courses: Vec<Course>,
    /// Weather text the prompt was built with, echoed back on the response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(skip)]
    pub weather_text: Option<String>,
}

/// One complete day-plan variant: a title, a total time estimate and 3-7 stops.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Course {
    #[serde(rename = "코스명")]
    #[schemars(length(min = 1))]
    pub title: String,
    #[serde(rename = "총예상소요시간")]
    #[schemars(range(min = 120, max = 900))]
    pub total_estimated_minutes: u32,
    #[serde(rename = "스톱")]
    #[schemars(length(min = 3, max = 7))]
    pub stops: Vec<Stop>,
}

/// One concrete, individually visitable venue within a course.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Stop {
    #[serde(rename = "장소명")]
    #[schemars(length(min = 1))]
    pub name: String,
    #[serde(rename = "설명")]
    #[schemars(length(min = 1))]
    pub description: String,
    #[serde(rename = "권장체류시간")]
    #[schemars(range(min = 15, max = 240))]
    pub typical_duration_min: u32,
    #[serde(rename = "권장시간대")]
    pub suggested_time_of_day: TimeOfDay,
    #[serde(rename = "카테고리")]
    pub category: Category,
    /// Best-effort photo enrichment; empty when no photo could be found.
    #[serde(default)]
    pub photo_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum TimeOfDay {
    #[serde(rename = "아침")]
    Morning,
    #[serde(rename = "오후")]
    Afternoon,
    #[serde(rename = "저녁")]
    Evening,
    #[serde(rename = "밤")]
    Night,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum Category {
    #[serde(rename = "카페")]
    Cafe,
    #[serde(rename = "식당")]
    Restaurant,
    #[serde(rename = "박물관")]
    Museum,
    #[serde(rename = "공원")]
    Park,
    #[serde(rename = "야경")]
    NightView,
    #[serde(rename = "바")]
    Bar,
    #[serde(rename = "액티비티")]
    Activity,
    #[serde(rename = "기타")]
    Other,
}

impl Itinerary {
    /// Deserialize a validated candidate into the typed model, reporting the
    /// JSON path of the first offending field on failure.
    pub fn from_value(candidate: &Value) -> Result<Self> {
        let raw = candidate.to_string();
        let mut deserializer = serde_json::Deserializer::from_str(&raw);
        serde_path_to_error::deserialize(&mut deserializer).map_err(|err| {
            let path = err.path().to_string();
            let location = if path.is_empty() {
                "<root>".to_string()
            } else {
                path
            };
            RecommendError::Validation(format!(
                "failed to deserialize itinerary at {}: {}",
                location, err
            ))
        })
    }

    /// The deterministic placeholder returned once retries are exhausted.
    ///
    /// Shape-compatible with a successful result so consumers never need a
    /// separate error branch; the last recorded error rides in the single
    /// stop's description.
    pub fn generation_failure(last_error: &str) -> Self {
        Self {
            courses: vec![Course {
                title: "생성 실패".to_string(),
                total_estimated_minutes: 0,
                stops: vec![Stop {
                    name: "파싱 실패".to_string(),
                    description: last_error.to_string(),
                    typical_duration_min: 0,
                    suggested_time_of_day: TimeOfDay::Morning,
                    category: Category::Other,
                    photo_url: String::new(),
                }],
            }],
            weather_text: None,
        }
    }
}
