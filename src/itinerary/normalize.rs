use serde_json::{Map, Value};

/// Key mapping from the neutral field names the model sometimes falls back to
/// onto the canonical localized contract. A `None` target drops the key.
const FIELD_MAP: &[(&str, Option<&str>)] = &[
    ("title", Some("코스명")),
    ("total_estimated_minutes", Some("총예상소요시간")),
    ("stops", Some("스톱")),
    ("name", Some("장소명")),
    ("desc", Some("설명")),
    ("typical_duration_min", Some("권장체류시간")),
    ("suggested_time_of_day", Some("권장시간대")),
    ("category", Some("카테고리")),
];

/// Recursively rename object keys onto the canonical localized field names.
///
/// Unmapped keys and every non-key value pass through untouched, so the
/// validator only ever has to know one naming convention. Idempotent:
/// already-localized keys are not in the table.
pub fn normalize_fields(candidate: Value) -> Value {
    normalize_with(candidate, FIELD_MAP)
}

fn normalize_with(candidate: Value, table: &[(&str, Option<&str>)]) -> Value {
    match candidate {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, child) in map {
                match table.iter().find(|(from, _)| *from == key) {
                    Some((_, Some(target))) => {
                        out.insert(target.to_string(), normalize_with(child, table));
                    }
                    Some((_, None)) => {}
                    None => {
                        out.insert(key, normalize_with(child, table));
                    }
                }
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| normalize_with(item, table))
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renames_neutral_keys_recursively() {
        let candidate = json!({
            "courses": [{
                "title": "테스트 코스",
                "total_estimated_minutes": 360,
                "stops": [{
                    "name": "스타벅스 강남역점",
                    "desc": "브런치",
                    "typical_duration_min": 60,
                    "suggested_time_of_day": "아침",
                    "category": "카페"
                }]
            }]
        });

        let normalized = normalize_fields(candidate);
        let stop = &normalized["courses"][0]["스톱"][0];
        assert_eq!(normalized["courses"][0]["코스명"], "테스트 코스");
        assert_eq!(normalized["courses"][0]["총예상소요시간"], 360);
        assert_eq!(stop["장소명"], "스타벅스 강남역점");
        assert_eq!(stop["설명"], "브런치");
        assert_eq!(stop["권장체류시간"], 60);
        assert_eq!(stop["권장시간대"], "아침");
        assert_eq!(stop["카테고리"], "카페");
    }

    #[test]
    fn is_idempotent_on_localized_input() {
        let candidate = json!({
            "courses": [{
                "코스명": "테스트 코스",
                "총예상소요시간": 360,
                "스톱": [{ "장소명": "봉은사", "photo_url": "" }]
            }]
        });

        let once = normalize_fields(candidate.clone());
        assert_eq!(once, candidate);
        assert_eq!(normalize_fields(once.clone()), once);
    }

    #[test]
    fn both_conventions_normalize_to_same_object() {
        let neutral = json!({ "courses": [{ "title": "코스", "stops": [] }] });
        let localized = json!({ "courses": [{ "코스명": "코스", "스톱": [] }] });
        assert_eq!(normalize_fields(neutral), normalize_fields(localized));
    }

    #[test]
    fn leaves_scalars_and_unmapped_keys_alone() {
        let candidate = json!({ "weather_text": "맑음", "extra": [1, 2, 3] });
        assert_eq!(normalize_fields(candidate.clone()), candidate);
    }

    #[test]
    fn none_target_drops_the_key() {
        let table: &[(&str, Option<&str>)] = &[("discard", None), ("keep", Some("유지"))];
        let candidate = json!({ "discard": "x", "keep": "y", "other": "z" });
        let normalized = normalize_with(candidate, table);
        assert_eq!(normalized, json!({ "유지": "y", "other": "z" }));
    }
}
