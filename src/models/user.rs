use crate::domain::UserId;
use crate::entities::users;

/// A registered account, without its password hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: UserId::new(model.id),
            first_name: model.first_name,
            last_name: model.last_name,
            username: model.username,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Signup input. The password is plain text until the repository hashes it.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub first_name: String,
    pub last_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_name_joins_first_and_last() {
        let user = User::from(users::Model {
            id: 3,
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            username: "ada".to_string(),
            password_hash: "$argon2id$...".to_string(),
            created_at: String::new(),
            updated_at: String::new(),
        });
        assert_eq!(user.id, UserId::new(3));
        assert_eq!(user.full_name(), "Ada Lovelace");
    }
}
