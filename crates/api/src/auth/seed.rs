//! Development seed data, applied at startup when `SEED_DEV_USERS=true`.

use warden_core::error::CoreError;
use warden_core::roles::{
    PERMISSION_PATIENT_READ, PERMISSION_PATIENT_WRITE, ROLE_ADMINISTRATOR, ROLE_ATTENDANT,
    ROLE_PATIENT,
};
use warden_core::user::{NewUser, RoleStore, UserDirectory};

use crate::auth::password::hash_password;

/// Password shared by every seeded account.
pub const DEV_PASSWORD: &str = "warden-dev-password";

const DEV_ROLES: &[(&str, &[&str])] = &[
    (
        ROLE_ADMINISTRATOR,
        &[PERMISSION_PATIENT_READ, PERMISSION_PATIENT_WRITE],
    ),
    (ROLE_ATTENDANT, &[PERMISSION_PATIENT_READ]),
    (ROLE_PATIENT, &[]),
];

const DEV_USERS: &[(&str, &str, &str, &str)] = &[
    ("admin@warden.local", "Ada", "Admin", ROLE_ADMINISTRATOR),
    ("attendant@warden.local", "Alan", "Attendant", ROLE_ATTENDANT),
    ("patient@warden.local", "Grace", "Patient", ROLE_PATIENT),
];

/// Ensure the well-known roles and one user per role exist.
///
/// Existing users are left untouched. Returns the emails that were created.
pub async fn seed_dev_data(
    users: &dyn UserDirectory,
    roles: &dyn RoleStore,
) -> Result<Vec<String>, CoreError> {
    for (name, permissions) in DEV_ROLES {
        roles.ensure(name, permissions).await?;
    }

    let mut created = Vec::new();
    for (email, first_name, last_name, role) in DEV_USERS {
        if users.find_by_email(email).await?.is_some() {
            continue;
        }
        let new_user = NewUser::new(
            email,
            hash_password(DEV_PASSWORD)?,
            first_name,
            last_name,
            &[*role],
        )?;
        let user = users.create(new_user).await?;
        tracing::info!(user_id = user.id, email = %user.email, role = *role, "Seeded development user");
        created.push(user.email);
    }

    Ok(created)
}
