use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::filter::{FieldKind, FieldSpec, ResourceSchema};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Publisher,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Publisher => "publisher",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "publisher" => Ok(Role::Publisher),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Account row. Credential and reset columns load with the row but never serialize.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    #[serde(skip_serializing)]
    pub password: String,
    #[serde(skip_serializing)]
    pub reset_password_token: Option<String>,
    #[serde(skip_serializing)]
    pub reset_password_expire: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

pub static USER_SCHEMA: ResourceSchema = ResourceSchema {
    table: "users",
    fields: &[
        FieldSpec::new("id", "id", FieldKind::Uuid),
        FieldSpec::new("name", "name", FieldKind::Text),
        FieldSpec::new("email", "email", FieldKind::Text),
        FieldSpec::new("role", "role", FieldKind::Text),
        FieldSpec::new("createdAt", "created_at", FieldKind::Timestamp),
    ],
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_never_serialize() {
        let user = User {
            id: Uuid::new_v4(),
            name: "Jane".into(),
            email: "jane@example.com".into(),
            role: Role::Publisher,
            password: "$2b$10$hash".into(),
            reset_password_token: Some("abc".into()),
            reset_password_expire: Some(Utc::now()),
            created_at: Utc::now(),
        };

        let value = serde_json::to_value(&user).unwrap();
        assert_eq!(value["role"], "publisher");
        assert!(value.get("password").is_none());
        assert!(value.get("resetPasswordToken").is_none());
        assert!(value.get("resetPasswordExpire").is_none());
    }

    #[test]
    fn schema_hides_credentials() {
        assert!(USER_SCHEMA.field("password").is_none());
        assert!(USER_SCHEMA.field("resetPasswordToken").is_none());
    }

    #[test]
    fn role_round_trips_through_text() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert!(Role::try_from("root".to_string()).is_err());
    }
}
