use serde_json::Value;

/// Extract plain text from Jira's Atlassian Document Format (ADF).
pub fn extract_text_from_adf(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(arr) => {
            let parts: Vec<String> = arr.iter().filter_map(extract_text_from_adf).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(" "))
            }
        }
        Value::Object(obj) => {
            if obj.get("type").and_then(|v| v.as_str()) == Some("text") {
                return obj.get("text").and_then(|v| v.as_str()).map(String::from);
            }
            if let Some(content) = obj.get("content") {
                return extract_text_from_adf(content);
            }
            None
        }
        _ => None,
    }
}

/// Render an arbitrary issue field as a single cell of text.
///
/// Select-style custom fields arrive as objects carrying `value`, `name` or
/// `displayName`; rich text arrives as an ADF document. Returns `None` for
/// null so the caller can substitute its sentinel.
pub fn render_field_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(arr) => {
            let parts: Vec<String> = arr.iter().filter_map(render_field_value).collect();
            Some(parts.join(", "))
        }
        Value::Object(obj) => {
            for key in ["value", "name", "displayName", "key"] {
                if let Some(text) = obj.get(key).and_then(|v| v.as_str()) {
                    return Some(text.to_string());
                }
            }
            if obj.get("type").and_then(|v| v.as_str()) == Some("doc") {
                return extract_text_from_adf(value);
            }
            Some(value.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn adf_paragraphs_are_joined() {
        let doc = json!({
            "type": "doc",
            "content": [
                {"type": "paragraph", "content": [{"type": "text", "text": "Fixed login"}]},
                {"type": "paragraph", "content": [{"type": "text", "text": "on staging"}]}
            ]
        });
        assert_eq!(
            extract_text_from_adf(&doc).as_deref(),
            Some("Fixed login on staging")
        );
    }

    #[test]
    fn select_fields_render_their_value() {
        assert_eq!(
            render_field_value(&json!({"self": "x", "value": "Financeiro", "id": "1"})).as_deref(),
            Some("Financeiro")
        );
        assert_eq!(
            render_field_value(&json!([{"value": "A"}, {"value": "B"}])).as_deref(),
            Some("A, B")
        );
    }

    #[test]
    fn scalars_and_null() {
        assert_eq!(render_field_value(&json!(null)), None);
        assert_eq!(render_field_value(&json!(3.5)).as_deref(), Some("3.5"));
        assert_eq!(
            render_field_value(&json!("2024-03-05")).as_deref(),
            Some("2024-03-05")
        );
    }

    #[test]
    fn rich_text_custom_field_is_flattened() {
        let doc = json!({
            "type": "doc",
            "version": 1,
            "content": [{"type": "paragraph", "content": [{"type": "text", "text": "urgent"}]}]
        });
        assert_eq!(render_field_value(&doc).as_deref(), Some("urgent"));
    }
}
