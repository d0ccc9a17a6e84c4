//! Capability checks for admin surfaces. Handlers ask the policy whether a
//! caller may perform an action; nothing below this interface knows about
//! sessions or tokens.

use crate::error::AppError;
use crate::types::user::{Caller, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAction {
    ManageCatalog,
    ViewReports,
    ModerateReviews,
    ManageInsights,
}

pub trait AccessPolicy: Send + Sync {
    fn allows(&self, caller: &Caller, action: AdminAction) -> bool;
}

/// Default policy: every admin capability maps to the Admin role.
pub struct RolePolicy;

impl AccessPolicy for RolePolicy {
    fn allows(&self, caller: &Caller, _action: AdminAction) -> bool {
        caller.role == Role::Admin
    }
}

/// Gate an operation on a capability. Denials surface as `Unauthorized`.
pub fn authorize(
    policy: &dyn AccessPolicy,
    caller: &Caller,
    action: AdminAction,
) -> Result<(), AppError> {
    if policy.allows(caller, action) {
        Ok(())
    } else {
        Err(AppError::Unauthorized)
    }
}
