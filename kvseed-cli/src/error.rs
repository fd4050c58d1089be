use kvseed_core::{ConfigError, SeedError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Seed(#[from] SeedError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),

    #[error("Failed to encode output: {0}")]
    Encode(#[from] serde_json::Error),
}

impl CliError {
    /// Process exit code for a failed command. Verification mismatches exit
    /// with 1 and are not errors.
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::Config(_) | CliError::Seed(SeedError::Config(_)) => 3,
            _ => 2,
        }
    }
}
