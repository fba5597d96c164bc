//! kav-api: Shared types for the kav access viewer
//!
//! This crate defines the parsed models for the two RBAC reporting tools
//! (`rakkess` and `kubectl-who-can`), the parsers that build them from raw
//! tool output, and the markdown rendering of both.
//!
//! Parsing is total: every input, however garbled, produces a well-formed
//! value. Missing structure degrades to an empty result and unreadable
//! permission cells degrade to [`PermissionState::Error`].

pub mod access;
pub mod markdown;
pub mod tranche;
pub mod whocan;

pub use access::{
    parse_permission_table, KindPermissions, PermissionMatrix, PermissionState, VerbPermissions,
};
pub use markdown::{
    no_subjects_message, render_permission_matrix, render_permission_matrix_with,
    render_who_can_result, CellStyle,
};
pub use whocan::{parse_binding_report, ClusterRoleBindingGrant, RoleBindingGrant, WhoCanResult};
