use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::{LedgerError, Result};

/// Opaque identifier of a tenant. Accepted as given; the ledger performs no
/// referential-integrity check against whatever service owns tenants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantId(Uuid);

impl TenantId {
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Parses a caller-supplied tenant identifier. Blank or malformed values
    /// are rejected, as is the nil UUID.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(LedgerError::UnauthorizedContext);
        }
        let id = Uuid::parse_str(raw).map_err(|_| LedgerError::UnauthorizedContext)?;
        if id.is_nil() {
            return Err(LedgerError::UnauthorizedContext);
        }
        Ok(Self(id))
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The active tenant for one unit of work.
///
/// A context is an explicit per-call value, threaded through every ledger
/// operation; nothing is stored in process-wide or task-local state, so
/// concurrent units of work cannot leak into each other. Every component
/// calls [`TenantContext::require`] before touching storage, and a context
/// without an active tenant denies everything (fail-closed).
#[derive(Debug, Clone, Default)]
pub struct TenantContext {
    active: Option<TenantId>,
}

impl TenantContext {
    /// A unit of work with no active tenant. Every ledger operation under
    /// this context fails with `UnauthorizedContext`.
    pub fn none() -> Self {
        Self { active: None }
    }

    pub fn for_tenant(tenant_id: TenantId) -> Self {
        Self {
            active: Some(tenant_id),
        }
    }

    /// Establishes the active tenant from a raw caller-supplied value, e.g.
    /// a claim extracted from an authenticated request.
    pub fn establish(raw: &str) -> Result<Self> {
        Ok(Self::for_tenant(TenantId::parse(raw)?))
    }

    /// Returns the active tenant or refuses the operation.
    pub fn require(&self) -> Result<TenantId> {
        self.active.ok_or(LedgerError::UnauthorizedContext)
    }
}
