//! Role and permission predicates
//!
//! Pure functions over `(caller, resource)`. Route handlers and the
//! provisioning workflow consult these instead of re-deriving role
//! logic inline.

use crate::store::types::{Account, AccountUpdate, Mailbox, Role};

/// Only admins manage domains.
pub fn can_manage_domains(caller: &Account) -> bool {
    caller.role == Role::Admin
}

/// Mailbox creation requires the per-account flag or the admin role.
pub fn can_create_mailbox(caller: &Account) -> bool {
    caller.can_create_emails || caller.role == Role::Admin
}

/// Admins see everything; users only their own mailboxes.
pub fn can_view_mailbox(caller: &Account, mailbox: &Mailbox) -> bool {
    caller.role == Role::Admin || caller.id == mailbox.owner_id
}

/// An admin may not deactivate or demote their own account through the
/// generic update path. Prevents accidental self-lockout.
pub fn is_self_lockout(caller: &Account, target_id: &str, update: &AccountUpdate) -> bool {
    caller.id == target_id && (update.is_active.is_some() || update.role.is_some())
}
