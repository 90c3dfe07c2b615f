use serde_json::{json, Value};

/// Extract a candidate itinerary object from raw model output.
///
/// Model responses are not reliably pure JSON: they may wrap the payload in
/// prose, a markdown fence, or emit a bare array instead of an object. Each
/// strategy below runs only when the previous one failed; a `None` means no
/// strategy could recover a candidate. Never panics.
pub fn extract_candidate(raw: &str) -> Option<Value> {
    // 1. Direct decode of the full text (bare arrays are wrapped).
    if let Some(candidate) = decode_candidate(raw) {
        return Some(candidate);
    }

    // 2. Decode the inner text of a ``` / ```json fence.
    let text = fenced_inner(raw).unwrap_or(raw);
    if let Some(candidate) = decode_candidate(text) {
        return Some(candidate);
    }

    // 3. Greedy first-`{`-to-last-`}` span anywhere in the text.
    if let Some(span) = span_between(text, '{', '}') {
        if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(span) {
            return Some(value);
        }
    }

    // 4. Greedy first-`[`-to-last-`]` span, wrapped as a courses object.
    if let Some(span) = span_between(text, '[', ']') {
        if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(span) {
            return Some(json!({ "courses": items }));
        }
    }

    None
}

/// Decode trimmed text; objects pass through, bare arrays become
/// `{"courses": [...]}`. Scalars are not candidates.
fn decode_candidate(text: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(text.trim()) {
        Ok(value @ Value::Object(_)) => Some(value),
        Ok(Value::Array(items)) => Some(json!({ "courses": items })),
        _ => None,
    }
}

fn fenced_inner(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let mut rest = &text[start + 3..];
    if let Some(stripped) = rest.strip_prefix("json") {
        rest = stripped;
    }
    let end = rest.find("```")?;
    Some(rest[..end].trim())
}

fn span_between(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    if end <= start {
        return None;
    }
    Some(&text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Value {
        json!({
            "courses": [{
                "코스명": "강남 브런치 코스",
                "총예상소요시간": 360,
                "스톱": []
            }]
        })
    }

    #[test]
    fn decodes_clean_json_unchanged() {
        let text = sample().to_string();
        assert_eq!(extract_candidate(&text), Some(sample()));
    }

    #[test]
    fn decodes_fenced_json() {
        let text = format!("```json\n{}\n```", sample());
        assert_eq!(extract_candidate(&text), Some(sample()));

        let untagged = format!("```\n{}\n```", sample());
        assert_eq!(extract_candidate(&untagged), Some(sample()));
    }

    #[test]
    fn wraps_bare_array_as_courses() {
        let text = r#"[{"코스명": "테스트"}]"#;
        let parsed = extract_candidate(text).unwrap();
        assert_eq!(parsed["courses"][0]["코스명"], "테스트");

        let fenced = format!("```json\n{}\n```", text);
        let parsed = extract_candidate(&fenced).unwrap();
        assert_eq!(parsed["courses"][0]["코스명"], "테스트");
    }

    #[test]
    fn recovers_object_embedded_in_prose() {
        let text = format!("요청하신 코스입니다.\n\n{}\n\n즐거운 하루 되세요!", sample());
        assert_eq!(extract_candidate(&text), Some(sample()));
    }

    #[test]
    fn recovers_array_embedded_in_prose() {
        let text = r#"결과: [{"코스명": "테스트"}] 입니다."#;
        let parsed = extract_candidate(text).unwrap();
        assert_eq!(parsed["courses"][0]["코스명"], "테스트");
    }

    #[test]
    fn rejects_unrecoverable_text() {
        assert_eq!(extract_candidate("정확한 코스를 만들 수 없습니다."), None);
        assert_eq!(extract_candidate(""), None);
        assert_eq!(extract_candidate("{not json}"), None);
        assert_eq!(extract_candidate("42"), None);
    }
}
