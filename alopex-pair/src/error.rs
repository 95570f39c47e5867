/*!
 * Pairing Errors
 */

use std::io;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PairError {
    /// Address or PIN rejected before anything is spawned
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Failed to open pseudo-terminal: {0}")]
    Pty(#[from] nix::Error),

    #[error("Failed to spawn {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: io::Error,
    },

    /// A pattern wait ran out of time
    #[error("Timed out after {waited:?} waiting for {pattern:?}")]
    PromptTimeout { pattern: String, waited: Duration },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, PairError>;
