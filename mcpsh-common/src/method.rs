// mcpsh-common/src/method.rs
//
// The closed catalog of operations the shell can issue. Request methods
// expect a response; client notifications are fire-and-forget and are never
// gated on a server capability.
use crate::ServerCapabilities;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    // Request methods
    Ping,
    ListPrompts,
    GetPrompt,
    ListResources,
    ReadResource,
    ListResourceTemplates,
    ListTools,
    CallTool,
    Complete,
    SetLoggingLevel,
    // Client notifications
    CancelledNotification,
    ProgressNotification,
    InitializedNotification,
    RootsListChangedNotification,
}

// Catalog order is significant: completion candidates are offered in
// exactly this order, requests first, notifications appended last.
impl Method {
    pub const REQUESTS: [Method; 10] = [
        Method::Ping,
        Method::ListPrompts,
        Method::GetPrompt,
        Method::ListResources,
        Method::ReadResource,
        Method::ListResourceTemplates,
        Method::ListTools,
        Method::CallTool,
        Method::Complete,
        Method::SetLoggingLevel,
    ];

    pub const NOTIFICATIONS: [Method; 4] = [
        Method::CancelledNotification,
        Method::ProgressNotification,
        Method::InitializedNotification,
        Method::RootsListChangedNotification,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Ping => "ping",
            Method::ListPrompts => "prompts/list",
            Method::GetPrompt => "prompts/get",
            Method::ListResources => "resources/list",
            Method::ReadResource => "resources/read",
            Method::ListResourceTemplates => "resources/templates/list",
            Method::ListTools => "tools/list",
            Method::CallTool => "tools/call",
            Method::Complete => "completion/complete",
            Method::SetLoggingLevel => "logging/setLevel",
            Method::CancelledNotification => "notifications/cancelled",
            Method::ProgressNotification => "notifications/progress",
            Method::InitializedNotification => "notifications/initialized",
            Method::RootsListChangedNotification => "notifications/roots/list_changed",
        }
    }

    pub fn from_identifier(identifier: &str) -> Option<Method> {
        Method::REQUESTS
            .iter()
            .chain(Method::NOTIFICATIONS.iter())
            .copied()
            .find(|method| method.as_str() == identifier)
    }

    pub fn is_notification(&self) -> bool {
        matches!(
            self,
            Method::CancelledNotification
                | Method::ProgressNotification
                | Method::InitializedNotification
                | Method::RootsListChangedNotification
        )
    }

    // Total gating map: every new method must state its capability here.
    // `ping` and the client notifications are available unconditionally.
    pub fn required_capability(&self) -> Option<Capability> {
        match self {
            Method::Ping => None,
            Method::ListPrompts | Method::GetPrompt => Some(Capability::Prompts),
            Method::ListResources
            | Method::ReadResource
            | Method::ListResourceTemplates => Some(Capability::Resources),
            Method::ListTools | Method::CallTool => Some(Capability::Tools),
            Method::Complete => Some(Capability::Completions),
            Method::SetLoggingLevel => Some(Capability::Logging),
            Method::CancelledNotification
            | Method::ProgressNotification
            | Method::InitializedNotification
            | Method::RootsListChangedNotification => None,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// The capability categories a server can advertise, as far as the catalog
// cares. Presence of the matching entry enables the category's methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Prompts,
    Resources,
    Tools,
    Completions,
    Logging,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Prompts => "prompts",
            Capability::Resources => "resources",
            Capability::Tools => "tools",
            Capability::Completions => "completions",
            Capability::Logging => "logging",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ServerCapabilities {
    // Presence, not value, is what enables a category.
    pub fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::Prompts => self.prompts.is_some(),
            Capability::Resources => self.resources.is_some(),
            Capability::Tools => self.tools.is_some(),
            Capability::Completions => self.completions.is_some(),
            Capability::Logging => self.logging.is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_round_trip() {
        for method in Method::REQUESTS.iter().chain(Method::NOTIFICATIONS.iter()) {
            assert_eq!(Method::from_identifier(method.as_str()), Some(*method));
        }
        assert_eq!(Method::from_identifier("prompts/unknown"), None);
        assert_eq!(Method::from_identifier(""), None);
    }

    #[test]
    fn test_notifications_are_never_gated() {
        for method in Method::NOTIFICATIONS {
            assert!(method.is_notification());
            assert_eq!(method.required_capability(), None);
        }
    }

    #[test]
    fn test_completion_gates_on_completions_entry() {
        assert_eq!(
            Method::Complete.required_capability(),
            Some(Capability::Completions)
        );

        // Other categories being present must not enable completion/complete.
        let caps: ServerCapabilities = serde_json::from_str(
            r#"{"prompts":{},"resources":{},"tools":{},"logging":{}}"#,
        )
        .unwrap();
        assert!(!caps.supports(Capability::Completions));

        let caps: ServerCapabilities = serde_json::from_str(r#"{"completions":{}}"#).unwrap();
        assert!(caps.supports(Capability::Completions));
    }

    #[test]
    fn test_gating_by_category() {
        let caps: ServerCapabilities =
            serde_json::from_str(r#"{"prompts":{},"tools":{}}"#).unwrap();
        assert!(caps.supports(Capability::Prompts));
        assert!(caps.supports(Capability::Tools));
        assert!(!caps.supports(Capability::Resources));
        assert!(!caps.supports(Capability::Logging));
        assert_eq!(Method::Ping.required_capability(), None);
        assert_eq!(
            Method::ListResourceTemplates.required_capability(),
            Some(Capability::Resources)
        );
    }
}
