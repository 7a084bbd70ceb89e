// mcpsh-client/src/query.rs
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub struct InvalidQueryError {
    message: String,
}

impl InvalidQueryError {
    fn new(message: String) -> Self {
        InvalidQueryError { message }
    }
}

impl fmt::Display for InvalidQueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for InvalidQueryError {}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedQuery {
    pub method: String,
    pub params: Option<Map<String, Value>>,
}

/// Parses one query line into a method and optional params.
///
/// The format is `[method] ([params])`: everything before the first
/// whitespace run is the method, everything after is parsed as a JSON
/// object. Params that are valid JSON but not an object are rejected,
/// never coerced. The method is not checked against the catalog here;
/// unknown methods are a dispatch-time concern.
pub fn parse_query(query: &str) -> Result<ParsedQuery, InvalidQueryError> {
    // Trimming first means a line like "ping " has no separator at all,
    // rather than an empty params string.
    let trimmed = query.trim();
    let divider = match trimmed.find(char::is_whitespace) {
        Some(index) => index,
        None => {
            return Ok(ParsedQuery {
                method: trimmed.to_string(),
                params: None,
            })
        }
    };

    let method = trimmed[..divider].trim().to_string();
    let params_text = trimmed[divider..].trim();

    let parsed: Value = serde_json::from_str(params_text)
        .map_err(|_| InvalidQueryError::new(format!("Invalid JSON format: {}", params_text)))?;

    match parsed {
        Value::Object(params) => Ok(ParsedQuery {
            method,
            params: Some(params),
        }),
        _ => Err(InvalidQueryError::new(format!(
            "Invalid params: {}",
            params_text
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_method_only() {
        let result = parse_query("ping").unwrap();
        assert_eq!(result.method, "ping");
        assert!(result.params.is_none());
    }

    #[test]
    fn test_parse_method_with_slashes() {
        // No false split on internal slashes.
        let result = parse_query("resources/templates/list").unwrap();
        assert_eq!(result.method, "resources/templates/list");
        assert!(result.params.is_none());
    }

    #[test]
    fn test_parse_method_with_params() {
        let result = parse_query(r#"prompts/get {"name": "simple_prompt", "arguments": {}}"#)
            .unwrap();
        assert_eq!(result.method, "prompts/get");
        let params = Value::Object(result.params.unwrap());
        assert_eq!(params, json!({"name": "simple_prompt", "arguments": {}}));
    }

    #[test]
    fn test_parse_method_with_nested_params() {
        let result =
            parse_query(r#"tools/call {"name": "echo", "arguments": {"message": "test"}}"#)
                .unwrap();
        assert_eq!(result.method, "tools/call");
        let params = Value::Object(result.params.unwrap());
        assert_eq!(
            params,
            json!({"name": "echo", "arguments": {"message": "test"}})
        );
    }

    #[test]
    fn test_parse_handles_whitespace() {
        let result = parse_query("  prompts/get   {\"name\":\"simple_prompt\"}  ").unwrap();
        assert_eq!(result.method, "prompts/get");
        let params = Value::Object(result.params.unwrap());
        assert_eq!(params, json!({"name": "simple_prompt"}));
    }

    #[test]
    fn test_parse_trailing_space_is_not_empty_params() {
        let result = parse_query("ping ").unwrap();
        assert_eq!(result.method, "ping");
        assert!(result.params.is_none());
    }

    #[test]
    fn test_parse_rejects_invalid_json() {
        let err = parse_query("invalid {not valid json}").unwrap_err();
        assert!(err.to_string().contains("Invalid JSON format"));
    }

    #[test]
    fn test_parse_rejects_non_object_params() {
        let err = parse_query("invalid [1, 2, 3]").unwrap_err();
        assert!(err.to_string().contains("Invalid params"));

        let err = parse_query("invalid 42").unwrap_err();
        assert!(err.to_string().contains("Invalid params"));

        let err = parse_query("invalid null").unwrap_err();
        assert!(err.to_string().contains("Invalid params"));
    }
}
