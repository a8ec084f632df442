use serde::{Deserialize, Serialize};

/// A reviewer role, either supplied by the caller or produced by the
/// meta-planner. Spec §3/§4.4 keep `role`, `expertise` and
/// `perspective` as three distinct fields so the planner's "distinct,
/// non-overlapping expertise" requirement is actually representable —
/// collapsing them into one free-text field can't be checked for
/// overlap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleSpec {
    /// Unique within a session; doubles as the stable participant id.
    pub name: String,
    /// Short title, e.g. "Security Reviewer".
    pub role: String,
    /// What this reviewer is an expert in.
    pub expertise: String,
    /// The angle this reviewer reads the document from.
    pub perspective: String,
    /// Full system prompt this reviewer is given.
    pub system_prompt: String,
    pub model_id: Option<String>,
}

impl RoleSpec {
    pub fn new(
        name: impl Into<String>,
        role: impl Into<String>,
        expertise: impl Into<String>,
        perspective: impl Into<String>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            expertise: expertise.into(),
            perspective: perspective.into(),
            system_prompt: system_prompt.into(),
            model_id: None,
        }
    }

    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = Some(model_id.into());
        self
    }
}

/// A participant bound to a session: a `RoleSpec` plus a stable id.
/// The id is always `role.name` — the planner's output is the single
/// source of participant identity, so there is nothing else for a
/// `Participant` to assign independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    pub role: RoleSpec,
}

impl Participant {
    pub fn new(id: impl Into<String>, role: RoleSpec) -> Self {
        Self { id: id.into(), role }
    }

    /// Build a participant whose id is its role's name, the normal
    /// construction path once a session's role set is known.
    pub fn from_role(role: RoleSpec) -> Self {
        Self {
            id: role.name.clone(),
            role,
        }
    }
}
