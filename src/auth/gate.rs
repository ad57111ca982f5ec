use super::Principal;

/// How a list of required capabilities is matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// At least one of them.
    Any,
    /// Every one of them.
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        self == Decision::Allow
    }
}

/// Decides whether a principal may perform an operation.
pub trait AccessGate: Send + Sync {
    fn authorize(&self, principal: &Principal, required: &[&str], mode: MatchMode) -> Decision;

    /// Ownership check for per-record edits: the author may always edit, anyone
    /// else needs `override_capability`.
    fn authorize_owned(
        &self,
        principal: &Principal,
        owner_id: &str,
        override_capability: &str,
    ) -> Decision {
        if principal.id == owner_id {
            return Decision::Allow;
        }
        self.authorize(principal, &[override_capability], MatchMode::Any)
    }
}

/// Gate that compares required capabilities against the token's capability list.
#[derive(Debug, Clone, Copy, Default)]
pub struct CapabilityGate;

impl AccessGate for CapabilityGate {
    fn authorize(&self, principal: &Principal, required: &[&str], mode: MatchMode) -> Decision {
        let granted = match mode {
            MatchMode::Any => required.iter().any(|c| principal.has_capability(c)),
            MatchMode::All => required.iter().all(|c| principal.has_capability(c)),
        };
        if granted {
            Decision::Allow
        } else {
            Decision::Deny
        }
    }
}
