//! Text replies for tool results

use cadbridge_rpc::{Applied, ClientError, CodeOutput};
use serde_json::Value;

/// Success line for a created or edited object, plus any skipped properties
pub fn applied(verb: &str, applied: &Applied) -> String {
    let mut text = format!("Object '{}' {verb} successfully.", applied.object_name);
    if !applied.skipped.is_empty() {
        text.push_str("\nSkipped properties:");
        for entry in &applied.skipped {
            let property = entry.get("property").and_then(Value::as_str).unwrap_or("?");
            let error = entry.get("error").and_then(Value::as_str).unwrap_or("unknown error");
            text.push_str(&format!("\n- {property}: {error}"));
        }
    }
    text
}

/// Failure text for an action, with script output when the bridge sent any
pub fn failure(action: &str, err: &ClientError) -> String {
    let mut text = format!("Failed to {action}: {err}");
    if let ClientError::Bridge {
        output: Some(output),
        ..
    } = err
    {
        if !output.is_empty() {
            text.push_str("\nOutput:\n");
            text.push_str(output);
        }
    }
    text
}

pub fn code_output(result: &CodeOutput) -> String {
    if result.output.is_empty() {
        result.message.clone()
    } else {
        format!("{}\nOutput:\n{}", result.message, result.output)
    }
}

/// Bulleted list, or `empty` when there is nothing to list
pub fn list(items: &[String], empty: &str) -> String {
    if items.is_empty() {
        return empty.to_string();
    }
    items
        .iter()
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadbridge_engine::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_applied_without_skips() {
        let result = Applied {
            object_name: "Box".to_string(),
            skipped: vec![],
        };
        assert_eq!(applied("created", &result), "Object 'Box' created successfully.");
    }

    #[test]
    fn test_applied_lists_skipped_properties() {
        let result = Applied {
            object_name: "Box".to_string(),
            skipped: vec![json!({"property": "Bogus", "error": "no such property", "kind": "PropertyError"})],
        };
        let text = applied("edited", &result);
        assert!(text.starts_with("Object 'Box' edited successfully."));
        assert!(text.contains("- Bogus: no such property"));
    }

    #[test]
    fn test_failure_includes_script_output() {
        let err = ClientError::Bridge {
            kind: ErrorKind::ScriptError,
            message: "boom".to_string(),
            output: Some("before\n".to_string()),
        };
        let text = failure("execute code", &err);
        assert!(text.starts_with("Failed to execute code: boom"));
        assert!(text.ends_with("Output:\nbefore\n"));
    }

    #[test]
    fn test_failure_without_output() {
        let err = ClientError::Connection("refused".to_string());
        assert_eq!(failure("list documents", &err), "Failed to list documents: Connection error: refused");
    }

    #[test]
    fn test_code_output() {
        let quiet = CodeOutput {
            message: "Code executed successfully".to_string(),
            output: String::new(),
        };
        assert_eq!(code_output(&quiet), "Code executed successfully");

        let chatty = CodeOutput {
            message: "Code executed successfully".to_string(),
            output: "hi\n".to_string(),
        };
        assert_eq!(code_output(&chatty), "Code executed successfully\nOutput:\nhi\n");
    }

    #[test]
    fn test_list() {
        assert_eq!(list(&[], "No documents open."), "No documents open.");
        let items = vec!["Doc1".to_string(), "Doc2".to_string()];
        assert_eq!(list(&items, ""), "- Doc1\n- Doc2");
    }
}
