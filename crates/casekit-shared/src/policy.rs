//! Policy overlays and policy resolution.
//!
//! Tool specs attach session/casefile/audit overlays; when a spec supplies
//! none, the loader merges in a named default template. At dispatch time the
//! orchestrator combines the tool's overlays with the operation's business
//! rules into one [`ResolvedPolicy`] that the context-preparation and hook
//! stages consult.

use serde::{Deserialize, Serialize};

use crate::operation::BusinessRules;

/// Session handling rules for a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionPolicy {
    /// The request must run inside an active session.
    #[serde(default)]
    pub requires_active_session: bool,
    /// A missing session may be created on demand.
    #[serde(default)]
    pub allow_new_session: bool,
    /// An expired session may be transparently closed and recreated.
    #[serde(default)]
    pub allow_session_resume: bool,
    /// Seconds of inactivity after which a session counts as expired.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

fn default_idle_timeout() -> u64 {
    1800
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            requires_active_session: false,
            allow_new_session: false,
            allow_session_resume: false,
            idle_timeout_secs: default_idle_timeout(),
        }
    }
}

/// Casefile handling rules for a tool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CasefilePolicy {
    /// The payload must reference an accessible casefile.
    #[serde(default)]
    pub casefile_required: bool,
    /// Ownership is checked against the requesting user.
    #[serde(default)]
    pub enforce_access: bool,
    /// Casefile states the operation accepts; empty means any state.
    #[serde(default)]
    pub allowed_states: Vec<String>,
}

/// Audit rules for a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditPolicy {
    /// Whether the audit hook records this tool's requests.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Whether the audit record carries the request payload.
    #[serde(default)]
    pub include_payload: bool,
}

fn default_true() -> bool {
    true
}

impl Default for AuditPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            include_payload: false,
        }
    }
}

/// The three overlays a spec can attach.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyOverlays {
    #[serde(default)]
    pub session: SessionPolicy,
    #[serde(default)]
    pub casefile: CasefilePolicy,
    #[serde(default)]
    pub audit: AuditPolicy,
}

impl PolicyOverlays {
    /// Look up a named default template. Specs that omit policy blocks get
    /// `authenticated_access` merged in by the loader.
    pub fn template(name: &str) -> Option<PolicyOverlays> {
        match name {
            "authenticated_access" => Some(PolicyOverlays {
                session: SessionPolicy {
                    requires_active_session: true,
                    allow_new_session: true,
                    allow_session_resume: true,
                    idle_timeout_secs: default_idle_timeout(),
                },
                casefile: CasefilePolicy::default(),
                audit: AuditPolicy::default(),
            }),
            "public_access" => Some(PolicyOverlays::default()),
            "casefile_bound" => Some(PolicyOverlays {
                session: SessionPolicy {
                    requires_active_session: true,
                    allow_new_session: true,
                    allow_session_resume: true,
                    idle_timeout_secs: default_idle_timeout(),
                },
                casefile: CasefilePolicy {
                    casefile_required: true,
                    enforce_access: true,
                    allowed_states: Vec::new(),
                },
                audit: AuditPolicy {
                    enabled: true,
                    include_payload: true,
                },
            }),
            _ => None,
        }
    }

    /// The template merged in when a spec supplies no policy blocks.
    pub fn default_template_name() -> &'static str {
        "authenticated_access"
    }
}

/// The effective policy for one request: tool overlays plus the referenced
/// operation's business rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPolicy {
    pub auth_required: bool,
    pub required_permissions: Vec<String>,
    pub timeout_ms: u64,
    pub session: SessionPolicy,
    pub casefile: CasefilePolicy,
    pub audit: AuditPolicy,
}

impl ResolvedPolicy {
    /// Combine overlays with business rules. Business rules only widen
    /// requirements: an operation that requires a casefile keeps that
    /// requirement even when the overlay does not.
    pub fn resolve(overlays: &PolicyOverlays, rules: &BusinessRules) -> Self {
        let mut casefile = overlays.casefile.clone();
        casefile.casefile_required = casefile.casefile_required || rules.casefile_required;

        Self {
            auth_required: rules.auth_required,
            required_permissions: rules.required_permissions.clone(),
            timeout_ms: rules.timeout_ms,
            session: overlays.session.clone(),
            casefile,
            audit: overlays.audit.clone(),
        }
    }
}
