use serde_json::Value;

/// Wrappers the executor puts around model output it could not parse.
pub const PARSE_FAILURE_MARKERS: [&str; 3] = [
    "Could not parse LLM output:",
    "OutputParserException:",
    "Invalid or incomplete response",
];

pub const DIAGNOSTIC_SUFFIX: &str = "For troubleshooting";

const PAYLOAD_FIELDS: [&str; 4] = ["content", "result", "action_input", "output"];

/// Recovers the user-facing text from raw agent output. Never fails; when
/// nothing applies the input comes back unchanged.
pub fn sanitize_response(raw: &str) -> String {
    let mut current = raw.to_string();
    // every peel strictly shortens the text, so this ends
    while let Some(next) = peel(&current) {
        if next.len() >= current.len() {
            break;
        }
        current = next;
    }
    current
}

fn peel(text: &str) -> Option<String> {
    strip_failure_marker(text).or_else(|| structured_payload(text))
}

fn strip_failure_marker(raw: &str) -> Option<String> {
    let marker = PARSE_FAILURE_MARKERS
        .iter()
        .find(|marker| raw.contains(*marker))?;
    let (_, after) = raw.split_once(marker)?;
    let body = match after.split_once(DIAGNOSTIC_SUFFIX) {
        Some((body, _)) => body,
        None => after,
    };
    Some(body.trim().to_string())
}

fn structured_payload(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if !trimmed.starts_with('{') {
        return None;
    }

    let parsed = serde_json::from_str::<Value>(trimmed).ok()?;
    let object = parsed.as_object()?;
    PAYLOAD_FIELDS
        .iter()
        .find_map(|field| object.get(*field))
        .map(|value| match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_text_from_parse_failure() {
        let raw = "Could not parse LLM output: ✅ 일정 등록 완료 For troubleshooting, visit: https://python.langchain.com/docs/troubleshooting";
        assert_eq!(sanitize_response(raw), "✅ 일정 등록 완료");
    }

    #[test]
    fn recovers_text_without_suffix() {
        assert_eq!(
            sanitize_response("OutputParserException:   부산 맛집 세 곳입니다.  "),
            "부산 맛집 세 곳입니다."
        );
    }

    #[test]
    fn extracts_content_field_from_json() {
        assert_eq!(
            sanitize_response(r#"  {"content": "해운대 일정입니다"}"#),
            "해운대 일정입니다"
        );
        assert_eq!(sanitize_response(r#"{"result": 3}"#), "3");
        assert_eq!(
            sanitize_response(r#"{"action": "Final Answer", "action_input": "완료"}"#),
            "완료"
        );
    }

    #[test]
    fn content_wins_over_result() {
        assert_eq!(
            sanitize_response(r#"{"result": "b", "content": "a"}"#),
            "a"
        );
    }

    #[test]
    fn invalid_json_is_returned_unchanged() {
        let raw = "{not json at all";
        assert_eq!(sanitize_response(raw), raw);
        let raw = r#"{"other": "field"}"#;
        assert_eq!(sanitize_response(raw), raw);
    }

    #[test]
    fn nested_envelopes_are_peeled_completely() {
        assert_eq!(sanitize_response(r#"{"content": "{\"content\": \"y\"}"}"#), "y");
        assert_eq!(sanitize_response(r#"{"result": {"output": "z"}}"#), "z");
        assert_eq!(
            sanitize_response(r#"{"content": "Could not parse LLM output: 완료 For troubleshooting"}"#),
            "완료"
        );
        assert_eq!(
            sanitize_response(r#"Could not parse LLM output: {"action_input": "부산 일정"}"#),
            "부산 일정"
        );
    }

    #[test]
    fn sanitizing_twice_changes_nothing() {
        let inputs = [
            "서울 2박 3일 일정입니다.",
            "  공백이 있는 문장  ",
            "",
            "{not json",
            r#"{"other": "field"}"#,
            r#"{"content": "x"}"#,
            r#"{"content": "{\"content\": \"y\"}"}"#,
            r#"{"content": "{\"result\": {\"output\": [1, 2]}}"}"#,
            r#"{"result": {"content": {"output": "deep"}}}"#,
            r#"{"result": 3}"#,
            r#"{"result": null}"#,
            r#"{"content": "  {\"content\": \"  padded  \"}  "}"#,
            r#"{"content": "OutputParserException: {\"output\": \"x\"}"}"#,
        ];
        for raw in inputs {
            let once = sanitize_response(raw);
            assert_eq!(sanitize_response(&once), once, "input: {raw}");
        }
    }
}
