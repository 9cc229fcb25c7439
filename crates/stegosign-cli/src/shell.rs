//! Command parsing for the interactive shell.

use std::path::PathBuf;

/// Commands that render protected content and must pass the route guard
/// before running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login { email: Option<String> },
    Google,
    Callback { code: String },
    Register,
    Confirm { token: String },
    Forgot { email: String },
    Reset { token: String },
    Whoami,
    Sign { path: PathBuf, message: String },
    Verify { path: PathBuf },
    Signatures,
    Verifications,
    History,
    Download { signature_uuid: String, out: Option<PathBuf> },
    Deactivate { user_id: i64 },
    Logout,
    Forget,
    Status,
    Help,
    Quit,
}

impl Command {
    /// Whether the route guard must admit the user first
    pub fn is_protected(&self) -> bool {
        matches!(
            self,
            Command::Whoami
                | Command::Sign { .. }
                | Command::Verify { .. }
                | Command::Signatures
                | Command::Verifications
                | Command::History
                | Command::Download { .. }
                | Command::Deactivate { .. }
        )
    }
}

pub const HELP: &str = "\
Commands:
  login [email]              Sign in with email and password
  google                     Print the Google sign-in URL
  callback <code>            Finish Google sign-in with the returned code
  register                   Create an account
  confirm <token>            Confirm an email address
  forgot <email>             Request a password reset link
  reset <token>              Set a new password using a reset token
  whoami                     Show the signed-in user
  sign <image> <message...>  Embed a message into an image
  verify <image>             Check an image for a signature
  signatures                 List images you have signed
  verifications              List verifications you have run
  history                    Signatures and verifications together
  download <uuid> [file]     Save a signed image
  deactivate <user-id>       Deactivate a user (admin)
  logout                     Sign out
  forget                     Remove the stored password for the last email
  status                     Show session state
  help                       Show this help
  quit                       Exit";

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse(line: &str) -> Result<Option<Command>, String> {
    let mut words = line.split_whitespace();
    let Some(name) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let command = match name.to_ascii_lowercase().as_str() {
        "login" => Command::Login {
            email: optional(&args, 0),
        },
        "google" => Command::Google,
        "callback" => Command::Callback {
            code: required(&args, 0, "callback <code>")?,
        },
        "register" => Command::Register,
        "confirm" => Command::Confirm {
            token: required(&args, 0, "confirm <token>")?,
        },
        "forgot" => Command::Forgot {
            email: required(&args, 0, "forgot <email>")?,
        },
        "reset" => Command::Reset {
            token: required(&args, 0, "reset <token>")?,
        },
        "whoami" | "me" => Command::Whoami,
        "sign" => {
            let path = required(&args, 0, "sign <image> <message...>")?;
            let message = args.get(1..).map(|rest| rest.join(" ")).unwrap_or_default();
            if message.is_empty() {
                return Err("usage: sign <image> <message...>".to_string());
            }
            Command::Sign {
                path: PathBuf::from(path),
                message,
            }
        }
        "verify" => Command::Verify {
            path: PathBuf::from(required(&args, 0, "verify <image>")?),
        },
        "signatures" => Command::Signatures,
        "verifications" => Command::Verifications,
        "history" => Command::History,
        "download" => Command::Download {
            signature_uuid: required(&args, 0, "download <uuid> [file]")?,
            out: optional(&args, 1).map(PathBuf::from),
        },
        "deactivate" => {
            let raw = required(&args, 0, "deactivate <user-id>")?;
            let user_id = raw
                .parse()
                .map_err(|_| format!("Not a user id: {}", raw))?;
            Command::Deactivate { user_id }
        }
        "logout" => Command::Logout,
        "forget" => Command::Forget,
        "status" => Command::Status,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("Unknown command: {} (try 'help')", other)),
    };
    Ok(Some(command))
}

fn optional(args: &[&str], index: usize) -> Option<String> {
    args.get(index).map(|s| s.to_string())
}

fn required(args: &[&str], index: usize, usage: &str) -> Result<String, String> {
    optional(args, index).ok_or_else(|| format!("usage: {}", usage))
}
