use serde::{Deserialize, Serialize};

/// Role column of `users`. Stored as the Postgres enum `user_role`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Supervisor,
    #[default]
    Operador,
}

/// Roles allowed to change the catalog, approve orders and read the audit trail.
pub const MANAGERS: &[UserRole] = &[UserRole::Admin, UserRole::Supervisor];

/// Roles allowed to manage user accounts.
pub const ADMINS: &[UserRole] = &[UserRole::Admin];

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Supervisor => "supervisor",
            UserRole::Operador => "operador",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(UserRole::Admin),
            "supervisor" => Some(UserRole::Supervisor),
            "operador" => Some(UserRole::Operador),
            _ => None,
        }
    }

    pub fn is_one_of(self, roles: &[UserRole]) -> bool {
        roles.contains(&self)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
