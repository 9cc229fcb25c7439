//! Sign-in passwords remembered in the OS keychain.
//!
//! Entries live under the `stegosign` service with the account email as the
//! user name. Emails are trimmed and lower-cased first, so `Alice@Example.com`
//! and `alice@example.com` share one entry, matching how the server treats
//! sign-in addresses.

use anyhow::{Context, Result};
use keyring::Entry;

const SERVICE_NAME: &str = "stegosign";

pub struct PasswordVault;

impl PasswordVault {
    pub fn store(email: &str, password: &str) -> Result<()> {
        Self::entry(email)?
            .set_password(password)
            .with_context(|| format!("Failed to remember password for {}", account_key(email)))
    }

    pub fn get_password(email: &str) -> Result<String> {
        Self::entry(email)?
            .get_password()
            .with_context(|| format!("No usable stored password for {}", account_key(email)))
    }

    /// Forget the stored password. Forgetting an address with nothing
    /// stored is not an error.
    pub fn delete(email: &str) -> Result<()> {
        match Self::entry(email)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to forget password for {}", account_key(email))),
        }
    }

    pub fn has_password(email: &str) -> bool {
        if let Ok(entry) = Self::entry(email) {
            entry.get_password().is_ok()
        } else {
            false
        }
    }

    fn entry(email: &str) -> Result<Entry> {
        let key = account_key(email);
        if key.is_empty() {
            anyhow::bail!("Cannot store a password without an email address");
        }
        Entry::new(SERVICE_NAME, &key).context("Keychain unavailable")
    }
}

/// Keychain user name for an email address.
fn account_key(email: &str) -> String {
    email.trim().to_lowercase()
}
