//! Error types for the meal plan bot.

use std::time::Duration;

/// Top-level error type for the bot.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Command error: {0}")]
    Command(#[from] CommandError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Database-related errors. Any of these is a storage failure for the
/// command that triggered it.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Channel-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("Failed to send response on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("Invalid message format: {0}")]
    InvalidMessage(String),
}

/// Meal plan provider errors.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} timed out after {timeout:?}")]
    Timeout { provider: String, timeout: Duration },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },
}

/// User input that does not fit the state it was sent to.
///
/// Always recoverable: the dialogue re-prompts and keeps its state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} must be a whole number between {min} and {max}")]
    NotANumber { field: String, min: u32, max: u32 },

    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: String,
        min: u32,
        max: u32,
        value: i64,
    },

    #[error("Unknown {field} option: {token}")]
    UnknownToken { field: String, token: String },

    #[error("Expected {expected}")]
    WrongInputKind { expected: String },
}

/// A precondition for the requested command does not hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PreconditionError {
    #[error("User has no profile")]
    MissingProfile,

    #[error("Weekly plans require an active subscription")]
    NotSubscribed,
}

/// Failure that terminates the current command.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Precondition failed: {0}")]
    Precondition(#[from] PreconditionError),

    #[error("Provider failure: {0}")]
    Generation(#[from] GenerationError),

    #[error("Storage failure: {0}")]
    Database(#[from] DatabaseError),
}

impl CommandError {
    /// Text shown to the user. Provider and storage details stay in the logs.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Precondition(PreconditionError::MissingProfile) => {
                "❌ You don't have a profile yet. Create one with /profile"
            }
            Self::Precondition(PreconditionError::NotSubscribed) => {
                "❌ Weekly meal plans are available to subscribers only.\n\
                 Use /subscribe to get a subscription."
            }
            Self::Generation(_) => {
                "❌ Could not generate a meal plan right now. Please try again later."
            }
            Self::Database(_) => "❌ Something went wrong while accessing your data. Please try again later.",
        }
    }
}

/// Result type alias for the bot.
pub type Result<T> = std::result::Result<T, Error>;
