use uuid::Uuid;

/// Per-request identity threaded explicitly into every call that logs or
/// audits. Constructed once per inbound webhook/poll/trap/rule-tick/
/// scheduler-tick and passed down — never thread-local.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: Uuid,
    pub actor: String,
    pub source_ip: Option<String>,
}

impl RequestContext {
    pub fn new(actor: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            actor: actor.into(),
            source_ip: None,
        }
    }

    pub fn with_source_ip(mut self, source_ip: impl Into<String>) -> Self {
        self.source_ip = Some(source_ip.into());
        self
    }

    /// Context for activity with no external caller: scheduler ticks, rule
    /// evaluation, TTL expiry. `actor` identifies the internal subsystem.
    pub fn system(actor: impl Into<String>) -> Self {
        Self::new(format!("system:{}", actor.into()))
    }
}
