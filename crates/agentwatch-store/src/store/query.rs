//! Query options for listing events

/// Query options for listing events
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventQuery {
    /// Filter by source application
    pub source_app: Option<String>,
    /// Filter by session
    pub session_id: Option<String>,
    /// Filter by event kind
    pub hook_event_type: Option<String>,
    /// Maximum results
    pub limit: i64,
}

impl EventQuery {
    /// Create a new query with default limits
    #[must_use]
    pub fn new() -> Self {
        Self {
            limit: 100,
            ..Default::default()
        }
    }

    /// Set the source application filter
    #[must_use]
    pub fn for_app(mut self, source_app: &str) -> Self {
        self.source_app = Some(source_app.to_string());
        self
    }

    /// Set the session filter
    #[must_use]
    pub fn for_session(mut self, session_id: &str) -> Self {
        self.session_id = Some(session_id.to_string());
        self
    }

    /// Set the event kind filter
    #[must_use]
    pub fn with_type(mut self, hook_event_type: &str) -> Self {
        self.hook_event_type = Some(hook_event_type.to_string());
        self
    }

    /// Set the result limit
    #[must_use]
    pub fn paginate(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }
}
