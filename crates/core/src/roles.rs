//! Well-known role names and the explicit authorization check.
//!
//! Role names are stored upper-case. These must match the seed data in
//! `20261001000002_create_roles_table.sql`.

use crate::error::CoreError;

pub const ROLE_ADMINISTRATOR: &str = "ADMINISTRATOR";
pub const ROLE_ATTENDANT: &str = "ATTENDANT";
pub const ROLE_PATIENT: &str = "PATIENT";

pub const PERMISSION_PATIENT_READ: &str = "PATIENT_READ";
pub const PERMISSION_PATIENT_WRITE: &str = "PATIENT_WRITE";

/// Canonical form of a role or permission name: trimmed and upper-cased.
pub fn normalize_role_name(name: &str) -> String {
    name.trim().to_uppercase()
}

/// Map a role requested at registration to its stored name.
///
/// `ADMIN` is accepted as an alias of `ADMINISTRATOR`. Any other unknown
/// value is a [`CoreError::RoleNotFound`].
pub fn registration_role(input: &str) -> Result<&'static str, CoreError> {
    match normalize_role_name(input).as_str() {
        ROLE_PATIENT => Ok(ROLE_PATIENT),
        ROLE_ATTENDANT => Ok(ROLE_ATTENDANT),
        ROLE_ADMINISTRATOR | "ADMIN" => Ok(ROLE_ADMINISTRATOR),
        other => Err(CoreError::RoleNotFound(other.to_string())),
    }
}

/// Whether `actual` contains `required`, comparing normalized names.
pub fn has_role<S: AsRef<str>>(required: &str, actual: &[S]) -> bool {
    let required = normalize_role_name(required);
    actual
        .iter()
        .any(|role| normalize_role_name(role.as_ref()) == required)
}

/// Allow or deny an operation that requires `required`.
pub fn authorize<S: AsRef<str>>(required: &str, actual: &[S]) -> Result<(), CoreError> {
    if has_role(required, actual) {
        Ok(())
    } else {
        Err(CoreError::Forbidden(format!(
            "{} role required",
            normalize_role_name(required)
        )))
    }
}
