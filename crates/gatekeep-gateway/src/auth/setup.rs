//! First-run seeding of the super-admin account.

use gatekeep_core::SeedCredentials;

use super::AuthError;
use super::password::CredentialHasher;
use super::users::{NewUser, Role, User, UserDirectory};

/// What a seeding run did.
#[derive(Debug, Clone)]
pub enum SeedOutcome {
    /// A super-admin was created.
    Created(User),
    /// A super-admin already exists; nothing was written.
    AlreadyExists,
}

/// Create the super-admin from `credentials` unless one already exists.
///
/// # Errors
///
/// Returns error if the directory or the hasher fails.
pub async fn seed_super_admin(
    users: &dyn UserDirectory,
    hasher: &CredentialHasher,
    credentials: &SeedCredentials,
) -> Result<SeedOutcome, AuthError> {
    if users.exists_with_role(Role::SuperAdmin).await? {
        return Ok(SeedOutcome::AlreadyExists);
    }

    let password_hash = hasher
        .hash_async(credentials.password.expose().to_string())
        .await?;

    let admin = User::new(
        NewUser {
            email: credentials.email.clone(),
            first_name: "SUPER".to_string(),
            last_name: "ADMIN".to_string(),
            profile_image: None,
            role: Role::SuperAdmin,
        },
        password_hash,
    );
    users.insert(&admin).await?;

    Ok(SeedOutcome::Created(admin))
}

/// Run [`seed_super_admin`] and log the outcome. Never fails.
pub async fn run_seed(
    users: &dyn UserDirectory,
    hasher: &CredentialHasher,
    credentials: Option<&SeedCredentials>,
) {
    let Some(credentials) = credentials else {
        tracing::warn!("No super-admin credentials configured, skipping seed");
        return;
    };

    match seed_super_admin(users, hasher, credentials).await {
        Ok(SeedOutcome::Created(admin)) => {
            tracing::info!(user_id = %admin.id, email = %admin.email, "Super admin account created");
        }
        Ok(SeedOutcome::AlreadyExists) => tracing::info!("Super admin already exists"),
        Err(e) => tracing::error!(error = %e, "Error creating super admin"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::UserStore;
    use gatekeep_core::Secret;
    use tempfile::TempDir;

    fn credentials() -> SeedCredentials {
        SeedCredentials {
            email: "root@example.com".to_string(),
            password: Secret::new("root-password"),
        }
    }

    #[tokio::test]
    async fn test_seed_twice() {
        let temp_dir = TempDir::new().unwrap();
        let store = UserStore::open(temp_dir.path()).unwrap();
        let hasher = CredentialHasher::new(1, 64).unwrap();

        let first = seed_super_admin(&store, &hasher, &credentials())
            .await
            .unwrap();
        let SeedOutcome::Created(admin) = first else {
            panic!("expected a super admin to be created");
        };
        assert!(admin.has_role(Role::SuperAdmin));
        assert_eq!(admin.first_name, "SUPER");
        assert!(hasher.verify("root-password", &admin.password_hash).unwrap());

        let second = seed_super_admin(&store, &hasher, &credentials())
            .await
            .unwrap();
        assert!(matches!(second, SeedOutcome::AlreadyExists));
        assert_eq!(store.count(), 1);
    }

    #[tokio::test]
    async fn test_seed_skips_when_email_taken_by_other_role() {
        let temp_dir = TempDir::new().unwrap();
        let store = UserStore::open(temp_dir.path()).unwrap();
        let hasher = CredentialHasher::new(1, 64).unwrap();

        let customer = User::new(
            NewUser {
                email: "root@example.com".to_string(),
                first_name: "Not".to_string(),
                last_name: "Root".to_string(),
                profile_image: None,
                role: Role::Customer,
            },
            hasher.hash("pw").unwrap(),
        );
        store.create(&customer).unwrap();

        let result = seed_super_admin(&store, &hasher, &credentials()).await;
        assert!(matches!(result, Err(AuthError::UserExists(_))));

        // The logging wrapper swallows the failure.
        run_seed(&store, &hasher, Some(&credentials())).await;
        run_seed(&store, &hasher, None).await;
        assert!(!store.has_role(Role::SuperAdmin).unwrap());
    }
}
