use news_core::ExecutionError;
use serde_json::Value;

/// Pull the markdown report out of raw crew output.
///
/// A JSON object with a string `raw` field yields that field; anything else
/// is the report verbatim.
pub fn extract_report(body: &str) -> Result<String, ExecutionError> {
    if body.trim().is_empty() {
        return Err(ExecutionError::InvalidOutput(
            "crew returned an empty report".to_string(),
        ));
    }

    if let Ok(Value::Object(object)) = serde_json::from_str::<Value>(body) {
        if let Some(Value::String(raw)) = object.get("raw") {
            return Ok(raw.clone());
        }
    }

    Ok(body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_field_wins() {
        let body = r##"{"raw": "# Report\n\nBody", "token_usage": {"total_tokens": 12}}"##;
        assert_eq!(extract_report(body).unwrap(), "# Report\n\nBody");
    }

    #[test]
    fn plain_markdown_is_verbatim() {
        let body = "# Report\n\n- point\n";
        assert_eq!(extract_report(body).unwrap(), body);
    }

    #[test]
    fn json_without_raw_is_verbatim() {
        let body = r#"{"output": "x"}"#;
        assert_eq!(extract_report(body).unwrap(), body);
    }

    #[test]
    fn empty_is_invalid() {
        assert!(matches!(
            extract_report("  \n"),
            Err(ExecutionError::InvalidOutput(_))
        ));
    }
}
