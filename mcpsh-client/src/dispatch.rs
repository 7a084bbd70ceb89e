// mcpsh-client/src/dispatch.rs
//
// The dispatch registry: one `Operation` variant per catalog method, each
// carrying its own validated parameter type. `validate` turns a parsed
// query into a variant (or a structural error worth reading), `dispatch`
// gates it on the server's capabilities, prints the outgoing request,
// invokes the remote operation and prints the response. Adding a method
// means adding a variant; the exhaustive matches refuse to compile until
// every arm exists.
use mcpsh_common::{
    CallToolParams, CancelledParams, Capability, CompleteRequestParams, GetPromptParams, Method,
    PaginatedParams, ProgressParams, ReadResourceParams, ServerCapabilities, SetLevelParams,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::error::Error;
use std::fmt;

use crate::client::{ClientError, McpClient};
use crate::io;
use crate::query::ParsedQuery;

// --- Errors ---

#[derive(Debug)]
pub enum DispatchError {
    /// The method is not in the catalog. Nothing is printed before this
    /// is raised.
    UnknownMethod(String),
    /// Params parsed as an object but failed the method's schema; the
    /// reason keeps serde's structural message (missing field, wrong type).
    Validation { method: Method, reason: String },
    /// The method's category is not in the server's advertised
    /// capability set.
    MissingCapability { method: Method, capability: Capability },
    Client(ClientError),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::UnknownMethod(method) => write!(f, "Unknown method: {}", method),
            DispatchError::Validation { method, reason } => {
                write!(f, "Invalid params for {}: {}", method, reason)
            }
            DispatchError::MissingCapability { method, capability } => write!(
                f,
                "{} requires the '{}' capability, which the server does not advertise",
                method, capability
            ),
            DispatchError::Client(err) => write!(f, "{}", err),
        }
    }
}

impl Error for DispatchError {}

impl From<ClientError> for DispatchError {
    fn from(err: ClientError) -> Self {
        DispatchError::Client(err)
    }
}

// --- Operations ---

#[derive(Debug, Clone)]
pub enum Operation {
    Ping,
    ListPrompts(PaginatedParams),
    GetPrompt(GetPromptParams),
    ListResources(PaginatedParams),
    ReadResource(ReadResourceParams),
    ListResourceTemplates(PaginatedParams),
    ListTools(PaginatedParams),
    CallTool(CallToolParams),
    Complete(CompleteRequestParams),
    SetLoggingLevel(SetLevelParams),
    Cancelled(CancelledParams),
    Progress(ProgressParams),
    Initialized,
    RootsListChanged,
}

impl Operation {
    /// Validate a parsed query against the catalog and the method's
    /// parameter schema.
    pub fn validate(query: ParsedQuery) -> Result<Operation, DispatchError> {
        let method = Method::from_identifier(&query.method)
            .ok_or_else(|| DispatchError::UnknownMethod(query.method.clone()))?;
        let params = query.params;

        let operation = match method {
            Method::Ping => {
                no_params(method, params)?;
                Operation::Ping
            }
            Method::ListPrompts => Operation::ListPrompts(optional_params(method, params)?),
            Method::GetPrompt => Operation::GetPrompt(required_params(method, params)?),
            Method::ListResources => Operation::ListResources(optional_params(method, params)?),
            Method::ReadResource => Operation::ReadResource(required_params(method, params)?),
            Method::ListResourceTemplates => {
                Operation::ListResourceTemplates(optional_params(method, params)?)
            }
            Method::ListTools => Operation::ListTools(optional_params(method, params)?),
            Method::CallTool => Operation::CallTool(required_params(method, params)?),
            Method::Complete => Operation::Complete(required_params(method, params)?),
            Method::SetLoggingLevel => Operation::SetLoggingLevel(required_params(method, params)?),
            Method::CancelledNotification => Operation::Cancelled(required_params(method, params)?),
            Method::ProgressNotification => Operation::Progress(required_params(method, params)?),
            Method::InitializedNotification => {
                no_params(method, params)?;
                Operation::Initialized
            }
            Method::RootsListChangedNotification => {
                no_params(method, params)?;
                Operation::RootsListChanged
            }
        };
        Ok(operation)
    }

    pub fn method(&self) -> Method {
        match self {
            Operation::Ping => Method::Ping,
            Operation::ListPrompts(_) => Method::ListPrompts,
            Operation::GetPrompt(_) => Method::GetPrompt,
            Operation::ListResources(_) => Method::ListResources,
            Operation::ReadResource(_) => Method::ReadResource,
            Operation::ListResourceTemplates(_) => Method::ListResourceTemplates,
            Operation::ListTools(_) => Method::ListTools,
            Operation::CallTool(_) => Method::CallTool,
            Operation::Complete(_) => Method::Complete,
            Operation::SetLoggingLevel(_) => Method::SetLoggingLevel,
            Operation::Cancelled(_) => Method::CancelledNotification,
            Operation::Progress(_) => Method::ProgressNotification,
            Operation::Initialized => Method::InitializedNotification,
            Operation::RootsListChanged => Method::RootsListChangedNotification,
        }
    }

    /// The validated params, serialized back for display and for the
    /// notification sends. `None` for methods that carry none (and for
    /// list operations called without a cursor).
    pub fn params_value(&self) -> Option<Value> {
        match self {
            Operation::Ping | Operation::Initialized | Operation::RootsListChanged => None,
            Operation::ListPrompts(params)
            | Operation::ListResources(params)
            | Operation::ListResourceTemplates(params)
            | Operation::ListTools(params) => {
                params.cursor.as_ref().map(|_| to_value(params))
            }
            Operation::GetPrompt(params) => Some(to_value(params)),
            Operation::ReadResource(params) => Some(to_value(params)),
            Operation::CallTool(params) => Some(to_value(params)),
            Operation::Complete(params) => Some(to_value(params)),
            Operation::SetLoggingLevel(params) => Some(to_value(params)),
            Operation::Cancelled(params) => Some(to_value(params)),
            Operation::Progress(params) => Some(to_value(params)),
        }
    }
}

/// Look up, validate, gate and invoke one query, printing the request and
/// (for request methods) the response. Every failure path is recoverable:
/// the caller prints it and redraws the prompt.
pub async fn dispatch(
    query: ParsedQuery,
    capabilities: &ServerCapabilities,
    client: &McpClient,
) -> Result<(), DispatchError> {
    let operation = Operation::validate(query)?;
    let method = operation.method();
    check_capability(method, capabilities)?;

    let mut request = json!({ "method": method.as_str() });
    if let Some(params) = operation.params_value() {
        request["params"] = params;
    }
    io::print_request(&request);

    match operation {
        Operation::Ping => {
            let result = client.ping().await?;
            io::print_response(&to_value(&result));
        }
        Operation::ListPrompts(params) => {
            let result = client.list_prompts(params).await?;
            io::print_response(&to_value(&result));
        }
        Operation::GetPrompt(params) => {
            let result = client.get_prompt(params).await?;
            io::print_response(&to_value(&result));
        }
        Operation::ListResources(params) => {
            let result = client.list_resources(params).await?;
            io::print_response(&to_value(&result));
        }
        Operation::ReadResource(params) => {
            let result = client.read_resource(params).await?;
            io::print_response(&to_value(&result));
        }
        Operation::ListResourceTemplates(params) => {
            let result = client.list_resource_templates(params).await?;
            io::print_response(&to_value(&result));
        }
        Operation::ListTools(params) => {
            let result = client.list_tools(params).await?;
            io::print_response(&to_value(&result));
        }
        Operation::CallTool(params) => {
            let result = client.call_tool(params).await?;
            io::print_response(&to_value(&result));
        }
        Operation::Complete(params) => {
            let result = client.complete(params).await?;
            io::print_response(&to_value(&result));
        }
        Operation::SetLoggingLevel(params) => {
            let result = client.set_logging_level(params).await?;
            io::print_response(&to_value(&result));
        }
        // Notification sends are fire-and-forget: no response event.
        Operation::Cancelled(_)
        | Operation::Progress(_)
        | Operation::Initialized
        | Operation::RootsListChanged => {
            let params = request.get("params").cloned();
            client.notify(method.as_str(), params).await?;
        }
    }
    Ok(())
}

// Dispatch-level capability gate; completion/complete succeeds or fails
// strictly on the presence of the `completions` entry, never on other
// categories.
fn check_capability(
    method: Method,
    capabilities: &ServerCapabilities,
) -> Result<(), DispatchError> {
    match method.required_capability() {
        Some(capability) if !capabilities.supports(capability) => {
            Err(DispatchError::MissingCapability { method, capability })
        }
        _ => Ok(()),
    }
}

// --- Param validation helpers ---

fn required_params<T: DeserializeOwned>(
    method: Method,
    params: Option<Map<String, Value>>,
) -> Result<T, DispatchError> {
    let params = params.ok_or_else(|| DispatchError::Validation {
        method,
        reason: "params are required".to_string(),
    })?;
    deserialize(method, params)
}

fn optional_params<T: DeserializeOwned + Default>(
    method: Method,
    params: Option<Map<String, Value>>,
) -> Result<T, DispatchError> {
    match params {
        None => Ok(T::default()),
        Some(params) => deserialize(method, params),
    }
}

fn no_params(method: Method, params: Option<Map<String, Value>>) -> Result<(), DispatchError> {
    match params {
        Some(params) if !params.is_empty() => Err(DispatchError::Validation {
            method,
            reason: "takes no parameters".to_string(),
        }),
        _ => Ok(()),
    }
}

fn deserialize<T: DeserializeOwned>(
    method: Method,
    params: Map<String, Value>,
) -> Result<T, DispatchError> {
    serde_json::from_value(Value::Object(params)).map_err(|e| DispatchError::Validation {
        method,
        reason: e.to_string(),
    })
}

fn to_value(value: &impl Serialize) -> Value {
    serde_json::to_value(value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parse_query;

    fn validate(line: &str) -> Result<Operation, DispatchError> {
        Operation::validate(parse_query(line).unwrap())
    }

    #[test]
    fn test_validate_unknown_method() {
        let err = validate("prompts/unknown").unwrap_err();
        assert!(matches!(err, DispatchError::UnknownMethod(ref m) if m == "prompts/unknown"));
        assert!(err.to_string().contains("Unknown method"));
    }

    #[test]
    fn test_validate_missing_required_params() {
        let err = validate("prompts/get").unwrap_err();
        assert!(err.to_string().contains("params are required"));

        // Structural reason surfaces, not a generic message.
        let err = validate("prompts/get {}").unwrap_err();
        assert!(err.to_string().contains("missing field `name`"));
    }

    #[test]
    fn test_validate_wrong_param_type() {
        let err = validate(r#"resources/read {"uri": 42}"#).unwrap_err();
        match err {
            DispatchError::Validation { method, ref reason } => {
                assert_eq!(method, Method::ReadResource);
                assert!(reason.contains("invalid type"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_typed_operations() {
        let operation = validate(r#"prompts/get {"name": "simple_prompt"}"#).unwrap();
        match operation {
            Operation::GetPrompt(ref params) => assert_eq!(params.name, "simple_prompt"),
            other => panic!("expected GetPrompt, got {:?}", other),
        }

        let operation = validate(r#"tools/call {"name": "echo", "arguments": {"message": "hi"}}"#)
            .unwrap();
        match operation {
            Operation::CallTool(ref params) => assert_eq!(params.name, "echo"),
            other => panic!("expected CallTool, got {:?}", other),
        }

        let operation =
            validate(r#"notifications/progress {"progressToken": "t1", "progress": 0.5}"#).unwrap();
        assert_eq!(operation.method(), Method::ProgressNotification);
    }

    #[test]
    fn test_validate_list_cursor_is_optional() {
        let operation = validate("prompts/list").unwrap();
        match operation {
            Operation::ListPrompts(ref params) => assert!(params.cursor.is_none()),
            other => panic!("expected ListPrompts, got {:?}", other),
        }

        let operation = validate(r#"tools/list {"cursor": "abc"}"#).unwrap();
        match operation {
            Operation::ListTools(ref params) => assert_eq!(params.cursor.as_deref(), Some("abc")),
            other => panic!("expected ListTools, got {:?}", other),
        }

        let err = validate(r#"tools/list {"cursor": 7}"#).unwrap_err();
        assert!(err.to_string().contains("invalid type"));
    }

    #[test]
    fn test_validate_rejects_params_on_no_param_methods() {
        let err = validate(r#"ping {"x": 1}"#).unwrap_err();
        assert!(err.to_string().contains("takes no parameters"));

        // Absent and empty params are both fine.
        assert!(matches!(validate("ping").unwrap(), Operation::Ping));
        assert!(matches!(validate("ping {}").unwrap(), Operation::Ping));
        assert!(matches!(
            validate("notifications/initialized").unwrap(),
            Operation::Initialized
        ));
    }

    #[test]
    fn test_capability_gate_tracks_completions_entry_only() {
        let caps: ServerCapabilities = serde_json::from_str(
            r#"{"prompts":{},"resources":{},"tools":{},"logging":{}}"#,
        )
        .unwrap();
        let err = check_capability(Method::Complete, &caps).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::MissingCapability {
                method: Method::Complete,
                capability: Capability::Completions,
            }
        ));

        let caps: ServerCapabilities = serde_json::from_str(r#"{"completions":{}}"#).unwrap();
        assert!(check_capability(Method::Complete, &caps).is_ok());

        // ping and client notifications pass with no capabilities at all.
        let none = ServerCapabilities::default();
        assert!(check_capability(Method::Ping, &none).is_ok());
        assert!(check_capability(Method::ProgressNotification, &none).is_ok());
    }

    #[test]
    fn test_request_object_shape() {
        let operation = validate("ping").unwrap();
        assert_eq!(operation.params_value(), None);

        let operation = validate("prompts/list").unwrap();
        assert_eq!(operation.params_value(), None);

        let operation = validate(r#"resources/read {"uri": "file:///x"}"#).unwrap();
        assert_eq!(
            operation.params_value(),
            Some(serde_json::json!({"uri": "file:///x"}))
        );
    }
}
