use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::store::{Column, ColumnKind, read_rows, write_rows};

pub const USER_SCHEMA: &[Column] = &[
    Column {
        name: "Email",
        kind: ColumnKind::Text,
    },
    Column {
        name: "Name",
        kind: ColumnKind::Text,
    },
    Column {
        name: "Password_Hash",
        kind: ColumnKind::Text,
    },
];

#[derive(Debug, Clone, Serialize, Deserialize)]
struct UserRow {
    #[serde(rename = "Email")]
    email: String,
    #[serde(rename = "Name")]
    name: String,
    /// Argon2id PHC string; carries its own salt and parameters.
    #[serde(rename = "Password_Hash")]
    password_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub email: String,
    pub name: String,
}

impl From<&UserRow> for User {
    fn from(row: &UserRow) -> Self {
        Self {
            email: row.email.clone(),
            name: row.name.clone(),
        }
    }
}

/// Registered users, stored as CSV with hashed passwords.
///
/// Unlike the record table, a malformed credential file is an error: loading
/// it as empty and then registering would overwrite every account.
pub struct UserStore {
    path: PathBuf,
    hasher: Argon2<'static>,
}

impl UserStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            hasher: Argon2::default(),
        }
    }

    /// Cheap hashing parameters so tests don't spend seconds per hash.
    #[cfg(test)]
    pub(crate) fn new_for_tests(path: impl Into<PathBuf>) -> Self {
        let params = argon2::Params::new(256, 1, 1, None).unwrap();
        Self {
            path: path.into(),
            hasher: Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Vec<UserRow>> {
        Ok(read_rows(&self.path, USER_SCHEMA)?.unwrap_or_default())
    }

    pub fn find(&self, email: &str) -> Result<Option<User>> {
        let email = normalize_email(email);
        Ok(self
            .load()?
            .iter()
            .find(|u| u.email == email)
            .map(User::from))
    }

    pub fn register(&self, email: &str, name: &str, password: &str) -> Result<User> {
        let email = normalize_email(email);
        if !email.contains('@') {
            return Err(Error::InvalidInput(format!("Invalid email '{email}'")).into());
        }
        if password.is_empty() {
            return Err(Error::InvalidInput("Password must not be empty".to_string()).into());
        }

        let mut rows = self.load()?;
        if rows.iter().any(|u| u.email == email) {
            return Err(Error::UserExists(email).into());
        }

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = self
            .hasher
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow!("Failed to hash password: {e}"))?
            .to_string();

        let row = UserRow {
            email,
            name: name.trim().to_string(),
            password_hash,
        };
        let user = User::from(&row);
        rows.push(row);
        write_rows(&self.path, &column_names(), &rows)?;
        info!("registered user {}", user.email);
        Ok(user)
    }

    /// Check `password` for `email`. Unknown emails and wrong passwords both
    /// fail with [`Error::Auth`].
    pub fn authenticate(&self, email: &str, password: &str) -> Result<User> {
        let email = normalize_email(email);
        let rows = self.load()?;
        let Some(row) = rows.iter().find(|u| u.email == email) else {
            return Err(Error::Auth.into());
        };

        let parsed = match PasswordHash::new(&row.password_hash) {
            Ok(h) => h,
            Err(e) => {
                warn!("stored password hash for {email} is unreadable: {e}");
                return Err(Error::Auth.into());
            }
        };
        if self
            .hasher
            .verify_password(password.as_bytes(), &parsed)
            .is_err()
        {
            return Err(Error::Auth.into());
        }
        Ok(User::from(row))
    }
}

fn column_names() -> Vec<&'static str> {
    USER_SCHEMA.iter().map(|c| c.name).collect()
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
