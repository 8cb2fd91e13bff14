use serde::Serialize;
use sqlx::FromRow;
use chrono::NaiveDateTime;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub phone: Option<String>,
    pub real_name: Option<String>,
    pub created_at: NaiveDateTime,
}

impl User {
    // Логин по имени пользователя или по email
    pub fn matches_login(&self, login: &str) -> bool {
        self.username == login || self.email == login
    }

    pub fn verify_password(&self, password: &str) -> bool {
        bcrypt::verify(password, &self.password_hash).unwrap_or(false)
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

impl NewUser {
    pub fn with_password(
        username: impl Into<String>,
        email: impl Into<String>,
        password: &str,
        cost: u32,
    ) -> Result<Self, bcrypt::BcryptError> {
        Ok(NewUser {
            username: username.into(),
            email: email.into(),
            password_hash: bcrypt::hash(password, cost)?,
        })
    }
}
