//! User model and directory.

use std::collections::BTreeSet;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sled::transaction::{ConflictableTransactionError, TransactionError};
use uuid::Uuid;

use super::AuthError;

/// User role for access control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Regular customer account.
    Customer,
    /// Store administrator.
    Admin,
    /// The seeded root account; may create admins.
    SuperAdmin,
}

impl Role {
    /// Wire name of the role.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "CUSTOMER",
            Self::Admin => "ADMIN",
            Self::SuperAdmin => "SUPERADMIN",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "CUSTOMER" => Ok(Self::Customer),
            "ADMIN" => Ok(Self::Admin),
            "SUPERADMIN" => Ok(Self::SuperAdmin),
            _ => Err(AuthError::Validation(format!("Unknown role: {s}"))),
        }
    }
}

/// Input for creating a user. The password is hashed before this is built.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Email address (normalized on creation).
    pub email: String,
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: String,
    /// Optional profile image reference.
    pub profile_image: Option<String>,
    /// Role assigned at creation.
    pub role: Role,
}

/// User account as stored in the directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique user ID.
    pub id: Uuid,
    /// Email address, unique across users.
    pub email: String,
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: String,
    /// Argon2 password hash (stored, never returned by the API).
    pub password_hash: String,
    /// Granted roles; never empty.
    pub roles: BTreeSet<Role>,
    /// Block flag. Stored but not enforced.
    pub is_blocked: bool,
    /// Optional profile image reference.
    pub profile_image: Option<String>,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Build a new user with a fresh ID from already-hashed credentials.
    #[must_use]
    pub fn new(new: NewUser, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: normalize_email(&new.email),
            first_name: new.first_name,
            last_name: new.last_name,
            password_hash,
            roles: BTreeSet::from([new.role]),
            is_blocked: false,
            profile_image: new.profile_image,
            created_at: Utc::now(),
        }
    }

    /// Check whether the user holds `role`.
    #[must_use]
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Create a safe version of user for API responses (no password hash).
    #[must_use]
    pub fn to_public(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            roles: self.roles.clone(),
            profile_image: self.profile_image.clone(),
        }
    }
}

/// Public user representation (for API responses).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    /// Unique user ID.
    pub id: Uuid,
    /// Email address.
    pub email: String,
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: String,
    /// Granted roles.
    pub roles: BTreeSet<Role>,
    /// Profile image reference.
    pub profile_image: Option<String>,
}

/// Canonical form used for storage and lookup.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Storage backend for user records.
///
/// `insert` must reject a duplicate email atomically with
/// [`AuthError::UserExists`]; handlers treat that as the authoritative conflict.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Look a user up by email.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError>;

    /// Whether any user holds `role`.
    async fn exists_with_role(&self, role: Role) -> Result<bool, AuthError>;

    /// Insert a new user.
    async fn insert(&self, user: &User) -> Result<(), AuthError>;
}

const USER_PREFIX: &str = "user:";
const EMAIL_INDEX_PREFIX: &str = "idx:email:";
const ROLE_INDEX_PREFIX: &str = "idx:role:";

fn user_key(id: &Uuid) -> String {
    format!("{USER_PREFIX}{id}")
}

fn email_key(email: &str) -> String {
    format!("{EMAIL_INDEX_PREFIX}{}", normalize_email(email))
}

fn role_prefix(role: Role) -> String {
    format!("{ROLE_INDEX_PREFIX}{role}:")
}

/// User store backed by sled.
pub struct UserStore {
    tree: sled::Tree,
}

impl UserStore {
    /// Open or create a user store at the given path.
    ///
    /// # Errors
    ///
    /// Returns error if database cannot be opened.
    pub fn open(path: &Path) -> Result<Self, AuthError> {
        let db = sled::open(path.join("users"))
            .map_err(|e| AuthError::Storage(format!("Failed to open user database: {e}")))?;

        let tree = db
            .open_tree("users")
            .map_err(|e| AuthError::Storage(format!("Failed to open users tree: {e}")))?;

        Ok(Self { tree })
    }

    /// Count total users.
    #[must_use]
    pub fn count(&self) -> usize {
        self.tree.scan_prefix(USER_PREFIX).count()
    }

    /// Create a new user.
    ///
    /// The email index entry, the record and the role index entries are
    /// written in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `UserExists` if the email is taken, or a storage error.
    pub fn create(&self, user: &User) -> Result<(), AuthError> {
        if user.roles.is_empty() {
            return Err(AuthError::Validation(
                "User must hold at least one role".to_string(),
            ));
        }
        if user.password_hash.is_empty() {
            return Err(AuthError::Validation(
                "User must have a password hash".to_string(),
            ));
        }

        let id = user.id.to_string();
        let record_key = user_key(&user.id);
        let index_key = email_key(&user.email);
        let role_keys: Vec<String> = user
            .roles
            .iter()
            .map(|role| format!("{}{id}", role_prefix(*role)))
            .collect();
        let value = serde_json::to_vec(user)
            .map_err(|e| AuthError::Storage(format!("Serialization error: {e}")))?;

        self.tree
            .transaction(|tx| {
                if tx.get(index_key.as_bytes())?.is_some() {
                    return Err(ConflictableTransactionError::Abort(AuthError::UserExists(
                        user.email.clone(),
                    )));
                }
                tx.insert(index_key.as_bytes(), id.as_bytes())?;
                tx.insert(record_key.as_bytes(), value.as_slice())?;
                for key in &role_keys {
                    tx.insert(key.as_bytes(), id.as_bytes())?;
                }
                Ok(())
            })
            .map_err(|e| match e {
                TransactionError::Abort(err) => err,
                TransactionError::Storage(err) => AuthError::Storage(format!("Insert error: {err}")),
            })?;

        self.tree
            .flush()
            .map_err(|e| AuthError::Storage(format!("Flush error: {e}")))?;

        Ok(())
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    pub fn get(&self, id: &Uuid) -> Result<Option<User>, AuthError> {
        match self.tree.get(user_key(id).as_bytes()) {
            Ok(Some(value)) => {
                let user: User = serde_json::from_slice(&value)
                    .map_err(|e| AuthError::Storage(format!("Deserialization error: {e}")))?;
                Ok(Some(user))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(AuthError::Storage(format!("Get error: {e}"))),
        }
    }

    /// Get a user by email.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    pub fn get_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        match self.tree.get(email_key(email).as_bytes()) {
            Ok(Some(id_bytes)) => {
                let id = Uuid::try_parse_ascii(&id_bytes)
                    .map_err(|e| AuthError::Storage(format!("Corrupt email index: {e}")))?;
                self.get(&id)
            }
            Ok(None) => Ok(None),
            Err(e) => Err(AuthError::Storage(format!("Index lookup error: {e}"))),
        }
    }

    /// Whether any user holds `role`.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    pub fn has_role(&self, role: Role) -> Result<bool, AuthError> {
        match self.tree.scan_prefix(role_prefix(role)).next() {
            Some(Ok(_)) => Ok(true),
            Some(Err(e)) => Err(AuthError::Storage(format!("Role index error: {e}"))),
            None => Ok(false),
        }
    }
}

#[async_trait]
impl UserDirectory for UserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        self.get_by_email(email)
    }

    async fn exists_with_role(&self, role: Role) -> Result<bool, AuthError> {
        self.has_role(role)
    }

    async fn insert(&self, user: &User) -> Result<(), AuthError> {
        self.create(user)
    }
}

impl std::fmt::Debug for UserStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserStore")
            .field("user_count", &self.count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn new_user(email: &str, role: Role) -> User {
        User::new(
            NewUser {
                email: email.to_string(),
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                profile_image: None,
                role,
            },
            "$argon2id$v=19$m=64,t=1,p=1$c2FsdHNhbHQ$aGFzaA".to_string(),
        )
    }

    #[test]
    fn test_user_creation() {
        let user = new_user("  Ada@Example.COM ", Role::Customer);
        assert_eq!(user.email, "ada@example.com");
        assert!(user.has_role(Role::Customer));
        assert!(!user.has_role(Role::Admin));
        assert!(!user.is_blocked);
    }

    #[test]
    fn test_role_names() {
        assert_eq!(Role::SuperAdmin.to_string(), "SUPERADMIN");
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert!("root".parse::<Role>().is_err());
        assert_eq!(
            serde_json::to_string(&Role::SuperAdmin).unwrap(),
            "\"SUPERADMIN\""
        );
    }

    #[test]
    fn test_public_projection_has_no_hash() {
        let user = new_user("ada@example.com", Role::Customer);
        let json = serde_json::to_value(user.to_public()).unwrap();

        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["email"], "ada@example.com");
        assert_eq!(json["firstName"], "Ada");
        assert_eq!(json["roles"], serde_json::json!(["CUSTOMER"]));
    }

    #[test]
    fn test_user_store() {
        let temp_dir = TempDir::new().unwrap();
        let store = UserStore::open(temp_dir.path()).unwrap();
        assert_eq!(store.count(), 0);

        let user = new_user("ada@example.com", Role::Customer);
        store.create(&user).unwrap();
        assert_eq!(store.count(), 1);

        let loaded = store.get(&user.id).unwrap().unwrap();
        assert_eq!(loaded.email, "ada@example.com");

        let by_email = store.get_by_email("ADA@example.com").unwrap().unwrap();
        assert_eq!(by_email.id, user.id);

        assert!(store.get_by_email("nobody@example.com").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_email() {
        let temp_dir = TempDir::new().unwrap();
        let store = UserStore::open(temp_dir.path()).unwrap();

        store
            .create(&new_user("ada@example.com", Role::Customer))
            .unwrap();
        let result = store.create(&new_user("Ada@Example.com", Role::Admin));

        assert!(matches!(result, Err(AuthError::UserExists(_))));
        assert_eq!(store.count(), 1);
        assert!(!store.has_role(Role::Admin).unwrap());
    }

    #[test]
    fn test_role_index() {
        let temp_dir = TempDir::new().unwrap();
        let store = UserStore::open(temp_dir.path()).unwrap();
        assert!(!store.has_role(Role::SuperAdmin).unwrap());

        store
            .create(&new_user("root@example.com", Role::SuperAdmin))
            .unwrap();

        assert!(store.has_role(Role::SuperAdmin).unwrap());
        assert!(!store.has_role(Role::Customer).unwrap());
    }

    #[test]
    fn test_rejects_incomplete_user() {
        let temp_dir = TempDir::new().unwrap();
        let store = UserStore::open(temp_dir.path()).unwrap();

        let mut user = new_user("ada@example.com", Role::Customer);
        user.password_hash.clear();
        assert!(matches!(store.create(&user), Err(AuthError::Validation(_))));

        let mut user = new_user("ada@example.com", Role::Customer);
        user.roles.clear();
        assert!(matches!(store.create(&user), Err(AuthError::Validation(_))));
    }

    #[tokio::test]
    async fn test_directory_trait() {
        let temp_dir = TempDir::new().unwrap();
        let store = UserStore::open(temp_dir.path()).unwrap();
        let directory: &dyn UserDirectory = &store;

        let user = new_user("ada@example.com", Role::Admin);
        directory.insert(&user).await.unwrap();

        let found = directory.find_by_email("ada@example.com").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(user.id));
        assert!(directory.find_by_email("nobody@example.com").await.unwrap().is_none());
        assert!(directory.exists_with_role(Role::Admin).await.unwrap());
    }
}
