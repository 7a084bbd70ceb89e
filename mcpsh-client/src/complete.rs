// mcpsh-client/src/complete.rs
use mcpsh_common::{Method, Prompt, ServerCapabilities, Tool};

use crate::query::parse_query;

/// Listing data fetched from the server, for parameter-level completion.
/// Currently carried through unused; see `complete`.
#[derive(Debug, Clone, Default)]
pub struct CompletionSchema {
    pub prompts: Option<Vec<Prompt>>,
    pub tools: Option<Vec<Tool>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionResult<'a> {
    /// Full method identifiers, in catalog order.
    pub candidates: Vec<&'static str>,
    /// The input line, unmodified; the caller computes the replacement
    /// span against it.
    pub line: &'a str,
}

/// Proposes completions for a partially typed query line.
///
/// Method completion first: request methods the server's capabilities
/// allow, plus every client notification, filtered by prefix. Only when
/// that yields nothing does parameter completion run, and that branch is
/// an extension point which currently always returns no candidates.
pub fn complete<'a>(
    line: &'a str,
    capabilities: &ServerCapabilities,
    _schema: &CompletionSchema,
) -> CompletionResult<'a> {
    let prefix = line.trim_start();

    let candidates: Vec<&'static str> = Method::REQUESTS
        .iter()
        .filter(|method| match method.required_capability() {
            None => true,
            Some(capability) => capabilities.supports(capability),
        })
        .chain(Method::NOTIFICATIONS.iter())
        .map(Method::as_str)
        .filter(|identifier| identifier.starts_with(prefix))
        .collect();

    if !candidates.is_empty() {
        return CompletionResult { candidates, line };
    }

    // Parameter completion. A line that does not parse, or parses without
    // params, has nothing to offer. When params are present this is where
    // schema-driven argument completion (prompt names, tool arguments)
    // would go; for now the contract is an empty candidate list.
    match parse_query(line) {
        Ok(query) if query.params.is_some() => CompletionResult {
            candidates: Vec::new(),
            line,
        },
        _ => CompletionResult {
            candidates: Vec::new(),
            line,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_capabilities() -> ServerCapabilities {
        ServerCapabilities::default()
    }

    // Mirrors what a typical everything-server advertises in the fixtures:
    // prompts and tools, nothing else.
    fn prompts_and_tools() -> ServerCapabilities {
        serde_json::from_str(r#"{"prompts":{},"tools":{}}"#).unwrap()
    }

    const ALL_NOTIFICATIONS: [&str; 4] = [
        "notifications/cancelled",
        "notifications/progress",
        "notifications/initialized",
        "notifications/roots/list_changed",
    ];

    #[test]
    fn test_complete_empty_line_no_capabilities() {
        let result = complete("", &no_capabilities(), &CompletionSchema::default());
        let mut expected = vec!["ping"];
        expected.extend(ALL_NOTIFICATIONS);
        assert_eq!(result.candidates, expected);
        assert_eq!(result.line, "");
    }

    #[test]
    fn test_complete_prefix_no_capabilities() {
        let result = complete("p", &no_capabilities(), &CompletionSchema::default());
        assert_eq!(result.candidates, vec!["ping"]);

        // Leading whitespace is stripped before matching.
        let result = complete(" p", &no_capabilities(), &CompletionSchema::default());
        assert_eq!(result.candidates, vec!["ping"]);

        let result = complete("ping", &no_capabilities(), &CompletionSchema::default());
        assert_eq!(result.candidates, vec!["ping"]);
    }

    #[test]
    fn test_complete_trailing_space_breaks_prefix_match() {
        let result = complete("ping ", &no_capabilities(), &CompletionSchema::default());
        assert!(result.candidates.is_empty());
        assert_eq!(result.line, "ping ");
    }

    #[test]
    fn test_complete_notifications_unaffected_by_capabilities() {
        for caps in [no_capabilities(), prompts_and_tools()] {
            let result = complete("no", &caps, &CompletionSchema::default());
            assert_eq!(result.candidates, ALL_NOTIFICATIONS);

            let result = complete("notifications/", &caps, &CompletionSchema::default());
            assert_eq!(result.candidates, ALL_NOTIFICATIONS);

            let result = complete("notifications/p", &caps, &CompletionSchema::default());
            assert_eq!(result.candidates, vec!["notifications/progress"]);

            let result = complete("notifications/progress", &caps, &CompletionSchema::default());
            assert_eq!(result.candidates, vec!["notifications/progress"]);
        }
    }

    #[test]
    fn test_complete_empty_line_with_capabilities() {
        let result = complete("", &prompts_and_tools(), &CompletionSchema::default());
        let mut expected = vec![
            "ping",
            "prompts/list",
            "prompts/get",
            "tools/list",
            "tools/call",
        ];
        expected.extend(ALL_NOTIFICATIONS);
        assert_eq!(result.candidates, expected);
    }

    #[test]
    fn test_complete_prefix_with_capabilities() {
        // tools excluded: does not start with "p".
        let result = complete("p", &prompts_and_tools(), &CompletionSchema::default());
        assert_eq!(result.candidates, vec!["ping", "prompts/list", "prompts/get"]);

        let result = complete(" p", &prompts_and_tools(), &CompletionSchema::default());
        assert_eq!(result.candidates, vec!["ping", "prompts/list", "prompts/get"]);
    }

    #[test]
    fn test_complete_gates_completion_category_on_completions_entry() {
        let caps: ServerCapabilities = serde_json::from_str(r#"{"completions":{}}"#).unwrap();
        let result = complete("completion/", &caps, &CompletionSchema::default());
        assert_eq!(result.candidates, vec!["completion/complete"]);

        let result = complete(
            "completion/",
            &prompts_and_tools(),
            &CompletionSchema::default(),
        );
        assert!(result.candidates.is_empty());
    }

    #[test]
    fn test_complete_unknown_prefix() {
        for caps in [no_capabilities(), prompts_and_tools()] {
            let result = complete("unknown", &caps, &CompletionSchema::default());
            assert!(result.candidates.is_empty());
        }
    }

    #[test]
    fn test_complete_params_branch_is_empty() {
        // Parses with params: reaches the extension point, still empty.
        let result = complete(
            r#"prompts/get {"name":"x"}"#,
            &prompts_and_tools(),
            &CompletionSchema::default(),
        );
        assert!(result.candidates.is_empty());

        // Does not parse at all: also empty, never an error.
        let result = complete(
            "prompts/get {not json",
            &prompts_and_tools(),
            &CompletionSchema::default(),
        );
        assert!(result.candidates.is_empty());
    }
}
