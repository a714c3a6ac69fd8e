//! User entity

use serde::{Deserialize, Serialize};

/// User identifier. Signed so that zero and negative ids parse and miss.
pub type UserId = i64;

/// A user record. Immutable once built; shared as `Arc<User>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct User {
    /// Unique positive id
    pub id: UserId,
    /// Display name
    pub name: String,
}

impl User {
    /// Create a user
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// Generated catalog entry for `id`: `User{id}`
    pub fn generated(id: UserId) -> Self {
        Self::new(id, format!("User{}", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_name() {
        let user = User::generated(42);
        assert_eq!(user.id, 42);
        assert_eq!(user.name, "User42");
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_string(&User::generated(1)).unwrap();
        assert_eq!(json, r#"{"id":1,"name":"User1"}"#);
    }

    #[test]
    fn test_json_rejects_wrong_types() {
        let result = serde_json::from_str::<User>(r#"{"id":"Morty","name":1}"#);
        assert!(result.is_err());
    }
}
