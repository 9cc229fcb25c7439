//! Application state and command handlers for the stegosign shell.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::{debug, error, info, warn};

use stegosign_core::api::ImageUpload;
use stegosign_core::auth::{self, Admission, IdentityProof, SessionError};
use stegosign_core::models::{NewAccount, Subject};
use stegosign_core::{ApiError, Config, Services};

use crate::shell::{Command, HELP};
use crate::vault::PasswordVault;

// ============================================================================
// Constants
// ============================================================================

/// Maximum length for email input
const MAX_EMAIL_LENGTH: usize = 254;

/// Maximum length for password input.
/// 128 chars accommodates password managers and passphrases.
const MAX_PASSWORD_LENGTH: usize = 128;

/// Password for non-interactive sign-in; never written to the config
const ENV_PASSWORD: &str = "STEGOSIGN_PASSWORD";

pub struct App {
    config: Config,
    services: Services,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let services = Services::connect(&config).context("Failed to set up API client")?;
        Ok(Self { config, services })
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Run one command. Returns `true` when the shell should exit.
    pub async fn handle(&mut self, command: Command) -> Result<bool> {
        debug!(?command, "Handling command");

        if command.is_protected() {
            match self.services.guard.admit().await {
                Admission::Granted(subject) => return self.handle_protected(command, subject).await.map(|_| false),
                Admission::Redirect { login_route, cause } => {
                    println!("{}", user_message(&cause));
                    println!("Run '{}' to sign in.", login_route);
                    return Ok(false);
                }
            }
        }

        match command {
            Command::Login { email } => self.login(email).await?,
            Command::Google => {
                let url = self.services.accounts.google_login_url().await?;
                println!("Open this URL to sign in with Google:\n  {}", url);
                println!("Then run 'callback <code>' with the code from the redirect.");
            }
            Command::Callback { code } => {
                let subject = auth::sign_in(&self.services.api, &IdentityProof::OAuthCode(code)).await?;
                println!("Signed in as {}.", subject.display_name());
            }
            Command::Register => self.register().await?,
            Command::Confirm { token } => {
                let msg = self.services.accounts.confirm_email(&token).await?;
                println!("{}", msg);
            }
            Command::Forgot { email } => {
                let msg = self.services.accounts.forgot_password(&email).await?;
                println!("{}", msg);
            }
            Command::Reset { token } => {
                let password = prompt_new_password()?;
                let msg = self.services.accounts.reset_password(&token, &password).await?;
                println!("{}", msg);
            }
            Command::Logout => {
                auth::sign_out(&self.services.api).await;
                println!("Signed out.");
            }
            Command::Forget => self.forget_password()?,
            Command::Status => self.print_status(),
            Command::Help => println!("{}", HELP),
            Command::Quit => return Ok(true),
            protected => bail!("{:?} requires sign-in", protected),
        }
        Ok(false)
    }

    async fn handle_protected(&self, command: Command, subject: Subject) -> Result<()> {
        let api = &self.services.api;
        match command {
            Command::Whoami => {
                println!("{} <{}>", subject.display_name(), subject.email);
                println!("  id: {}  username: {}", subject.id, subject.username);
                if let Some(created) = subject.created_at {
                    println!("  member since {}", created.format("%Y-%m-%d"));
                }
            }
            Command::Sign { path, message } => {
                let upload = read_image(&path)?;
                let receipt = api.sign_image(&upload, &message).await?;
                println!("Signed {} (signature {}).", upload.filename, receipt.signature_uuid);
                println!("Run 'download {}' to save the signed image.", receipt.signature_uuid);
            }
            Command::Verify { path } => {
                let upload = read_image(&path)?;
                let outcome = api.verify_image(&upload).await?;
                if outcome.valid {
                    println!("Valid signature.");
                    if let Some(uuid) = outcome.signature_uuid {
                        println!("  signature: {}", uuid);
                    }
                    if let Some(author) = outcome.author_id {
                        println!("  signed by user {}", author);
                    }
                    if let Some(message) = outcome.message {
                        println!("  message: {}", message);
                    }
                } else {
                    println!("No valid signature found in {}.", upload.filename);
                }
            }
            Command::Signatures => print_signatures(&api.fetch_signatures().await?),
            Command::Verifications => print_verifications(&api.fetch_verifications().await?),
            Command::History => {
                let (signatures, verifications) =
                    futures::try_join!(api.fetch_signatures(), api.fetch_verifications())?;
                print_signatures(&signatures);
                println!();
                print_verifications(&verifications);
            }
            Command::Download { signature_uuid, out } => {
                let image = api.download_signed_image(&signature_uuid).await?;
                let bytes = image.decode().context("Signed image payload is not valid base64")?;
                let target = out.unwrap_or_else(|| default_download_path(&image.filename, &signature_uuid));
                std::fs::write(&target, &bytes)
                    .with_context(|| format!("Failed to write {}", target.display()))?;
                info!(path = %target.display(), bytes = bytes.len(), "Saved signed image");
                println!("Saved {} ({} bytes).", target.display(), bytes.len());
            }
            Command::Deactivate { user_id } => {
                if confirm(&format!("Deactivate user {}? [y/N]: ", user_id))? {
                    api.deactivate_user(user_id).await?;
                    println!("User {} deactivated.", user_id);
                } else {
                    println!("Cancelled.");
                }
            }
            other => bail!("{:?} is not a protected command", other),
        }
        Ok(())
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    async fn login(&mut self, email: Option<String>) -> Result<()> {
        let email = match email {
            Some(email) => email,
            None => prompt_with_default("Email", self.config.last_email.as_deref())?,
        };
        if email.is_empty() || email.len() > MAX_EMAIL_LENGTH {
            bail!("Email required");
        }

        let password = if let Ok(password) = std::env::var(ENV_PASSWORD) {
            password
        } else if PasswordVault::has_password(&email) && confirm("Use stored password? [Y/n]: ")? {
            PasswordVault::get_password(&email)?
        } else {
            prompt_password("Password: ")?
        };

        println!("Authenticating...");
        let proof = IdentityProof::Password {
            email: email.clone(),
            password: password.clone(),
        };
        match auth::sign_in(&self.services.api, &proof).await {
            Ok(subject) => {
                if let Err(e) = PasswordVault::store(&email, &password) {
                    warn!(error = %e, "Failed to store password");
                }
                self.config.last_email = Some(email);
                if let Err(e) = self.config.save() {
                    warn!(error = %e, "Failed to save config");
                }
                info!("Login successful");
                println!("Welcome, {}!", subject.display_name());
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Login failed");
                Err(e.into())
            }
        }
    }

    fn forget_password(&self) -> Result<()> {
        let Some(email) = self.config.last_email.as_deref() else {
            println!("No saved email.");
            return Ok(());
        };
        if PasswordVault::has_password(email) {
            PasswordVault::delete(email)?;
            println!("Removed stored password for {}.", email);
        } else {
            println!("No stored password for {}.", email);
        }
        Ok(())
    }

    async fn register(&self) -> Result<()> {
        let account = NewAccount {
            firstname: prompt("First name")?,
            lastname: prompt("Last name")?,
            username: prompt("Username")?,
            email: prompt("Email")?,
            password: prompt_new_password()?,
        };
        if let Err(problem) = account.validate() {
            bail!("{}", problem);
        }
        let subject = self.services.accounts.register(&account).await?;
        println!("Account created for {}.", subject.username);
        println!("Check {} for a confirmation link, then run 'confirm <token>'.", subject.email);
        Ok(())
    }

    fn print_status(&self) {
        let session = &self.services.session;
        println!("Server: {}", self.config.api_base_url);
        match (session.credential(), session.subject()) {
            (Some(credential), Some(subject)) => {
                println!("Signed in as {} ({} token)", subject.display_name(), credential.kind())
            }
            (Some(credential), None) => println!("Holding a {} token, profile not loaded", credential.kind()),
            _ => println!("Not signed in"),
        }
    }

    /// Drop all session state on exit.
    pub fn teardown(&self) {
        self.services.session.clear();
    }
}

// ============================================================================
// Output
// ============================================================================

fn print_signatures(records: &[stegosign_core::models::SignatureRecord]) {
    if records.is_empty() {
        println!("No signed images yet.");
        return;
    }
    println!("Signatures:");
    for record in records {
        println!(
            "  {}  {}  {}",
            record.signed_at.format("%Y-%m-%d %H:%M"),
            record.signature_uuid,
            record.original_filename.as_deref().unwrap_or("-")
        );
    }
}

fn print_verifications(records: &[stegosign_core::models::VerificationRecord]) {
    if records.is_empty() {
        println!("No verifications yet.");
        return;
    }
    println!("Verifications:");
    for record in records {
        println!(
            "  {}  {}  {}",
            record.timestamp.format("%Y-%m-%d %H:%M"),
            if record.verified { "valid  " } else { "invalid" },
            record.signature_uuid.as_deref().unwrap_or("-")
        );
    }
}

fn read_image(path: &Path) -> Result<ImageUpload> {
    ImageUpload::from_path(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Save under the server's file name, stripped to its last component.
fn default_download_path(filename: &str, signature_uuid: &str) -> PathBuf {
    Path::new(filename)
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(format!("{}.png", signature_uuid)))
}

/// Friendly wording for errors shown to the user
pub fn user_message(err: &SessionError) -> String {
    match err {
        SessionError::SignInFailed(e) if e.is_unauthorized() => "Invalid email or password".to_string(),
        SessionError::SignInFailed(e) => describe_api_error(&e.source),
        SessionError::SessionEnded(_) => "Your session has expired. Please sign in again.".to_string(),
        SessionError::Api(e) => describe_api_error(e),
    }
}

pub fn describe_api_error(err: &ApiError) -> String {
    match err {
        ApiError::NetworkError(e) if e.is_timeout() => "Connection timed out. Please try again.".to_string(),
        ApiError::NetworkError(e) if e.is_connect() => {
            "Unable to connect to server. Check your internet connection.".to_string()
        }
        ApiError::Unauthorized => "You are not signed in.".to_string(),
        ApiError::BadRequest { message, .. } => message.clone(),
        other => other.to_string(),
    }
}

// ============================================================================
// Prompts
// ============================================================================

fn prompt(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

fn prompt_with_default(label: &str, default: Option<&str>) -> Result<String> {
    match default {
        Some(default) => {
            let input = prompt(&format!("{} [{}]", label, default))?;
            Ok(if input.is_empty() { default.to_string() } else { input })
        }
        None => prompt(label),
    }
}

fn prompt_password(label: &str) -> Result<String> {
    let password = rpassword::prompt_password(label)?;
    if password.len() > MAX_PASSWORD_LENGTH {
        bail!("Password too long");
    }
    Ok(password)
}

fn prompt_new_password() -> Result<String> {
    let password = prompt_password("New password: ")?;
    let again = prompt_password("Confirm password: ")?;
    if password != again {
        bail!("Passwords don't match");
    }
    Ok(password)
}

fn confirm(question: &str) -> Result<bool> {
    print!("{}", question);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let answer = input.trim().to_lowercase();
    let default_yes = question.contains("[Y/n]");
    Ok(match answer.as_str() {
        "" => default_yes,
        "y" | "yes" => true,
        _ => false,
    })
}

// ============================================================================
// Tests
// ============================================================================
