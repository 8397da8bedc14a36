pub mod commands;
pub mod handlers;
use crate::error::Error;

pub use commands::{GenerateArgs, GenerateCommands, SignArgs};
pub use handlers::{handle_generate_command, handle_sign_command, handle_version_command};

pub const CLI_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const CLI_NAME: &str = "slsa-provenance";

pub fn format_error(error: &Error) -> String {
    match error {
        Error::Io(err) => format!("IO error: {err}"),
        Error::FileIo { context, source } => format!("IO error: {context}: {source}"),
        Error::NotFound(msg) => format!("Not found: {msg}"),
        Error::Validation(msg) => format!("Validation error: {msg}"),
        Error::Serialization(msg) => format!("Serialization error: {msg}"),
        Error::Signing(msg) => format!("Signing error: {msg}"),
        Error::Transport(msg) => format!("Release service error: {msg}"),
        Error::Registry(msg) => format!("Registry error: {msg}"),
        Error::Cancelled => "Operation cancelled".to_string(),
        Error::Timeout(msg) => format!("Timed out: {msg}"),
        Error::InitializationError(msg) => format!("Initialization error: {msg}"),
        Error::Json(err) => format!("JSON error: {err}"),
    }
}
