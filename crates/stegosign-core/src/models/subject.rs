use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The signed-in user as reported by `GET /auth/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: i64,
    #[serde(default)]
    pub firstname: String,
    #[serde(default)]
    pub lastname: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, with = "super::timestamp::optional")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Subject {
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.firstname, self.lastname);
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}

/// Registration form payload
#[derive(Debug, Clone, Serialize)]
pub struct NewAccount {
    pub firstname: String,
    pub lastname: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Characters the service accepts as the required password symbol
const PASSWORD_SYMBOLS: &str = "@$!%*?&";

impl NewAccount {
    /// Check the form before it is sent. Returns the first problem found.
    pub fn validate(&self) -> Result<(), &'static str> {
        check_name_len(self.firstname.trim(), "First name must be 2 to 100 characters")?;
        check_name_len(self.lastname.trim(), "Last name must be 2 to 100 characters")?;

        let username_len = self.username.chars().count();
        if !(3..30).contains(&username_len) {
            return Err("Username must be 3 to 29 characters");
        }
        if !self.username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err("Username can only contain letters, numbers, and underscores");
        }

        if !looks_like_email(&self.email) {
            return Err("Please enter a valid email address");
        }

        let password = &self.password;
        if password.chars().count() < 8 {
            return Err("Password must be at least 8 characters");
        }
        if !password.chars().any(|c| c.is_ascii_lowercase()) {
            return Err("Password must contain at least one lowercase letter");
        }
        if !password.chars().any(|c| c.is_ascii_uppercase()) {
            return Err("Password must contain at least one uppercase letter");
        }
        if !password.chars().any(|c| c.is_ascii_digit()) {
            return Err("Password must contain at least one number");
        }
        if !password.chars().any(|c| PASSWORD_SYMBOLS.contains(c)) {
            return Err("Password must contain at least one special character");
        }
        Ok(())
    }
}

fn check_name_len(name: &str, message: &'static str) -> Result<(), &'static str> {
    let len = name.chars().count();
    if (2..100).contains(&len) {
        Ok(())
    } else {
        Err(message)
    }
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && !email.contains(char::is_whitespace)
                && domain.split('.').count() >= 2
                && domain.split('.').all(|part| !part.is_empty())
        }
        None => false,
    }
}
