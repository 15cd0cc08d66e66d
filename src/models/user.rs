use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Upload,
    Search,
    Download,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(rename = "group")]
    pub user_group: String,
    #[serde(skip_serializing)]
    pub token: String,
    pub is_admin: bool,
    pub can_upload: bool,
    pub can_search: bool,
    pub can_download: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn has(&self, permission: Permission) -> bool {
        if self.is_admin {
            return true;
        }

        match permission {
            Permission::Upload => self.can_upload,
            Permission::Search => self.can_search,
            Permission::Download => self.can_download,
            Permission::Admin => false,
        }
    }

    pub fn require(&self, permission: Permission) -> Result<(), Error> {
        if self.has(permission) {
            return Ok(());
        }

        Err(Error::Forbidden(format!(
            "User {} lacks the {:?} permission",
            self.username, permission
        )))
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub user_group: String,
    pub token: String,
    pub is_admin: bool,
    pub can_upload: bool,
    pub can_search: bool,
    pub can_download: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(is_admin: bool, can_search: bool) -> User {
        User {
            id: 1,
            username: "ada".to_string(),
            user_group: "eng".to_string(),
            token: "t".to_string(),
            is_admin,
            can_upload: false,
            can_search,
            can_download: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_admin_has_every_permission() {
        let admin = user(true, false);
        for permission in [
            Permission::Upload,
            Permission::Search,
            Permission::Download,
            Permission::Admin,
        ] {
            assert!(admin.has(permission));
        }
    }

    #[test]
    fn test_require_reports_forbidden() {
        let reader = user(false, true);
        assert!(reader.require(Permission::Search).is_ok());
        assert!(matches!(
            reader.require(Permission::Upload),
            Err(Error::Forbidden(_))
        ));
        assert!(reader.require(Permission::Admin).is_err());
    }
}
