use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

use crate::error::{PairError, Result};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PairConfig {
    /// Interactive control tool to drive
    pub tool: String,
    /// Text that marks the tool as ready for a command
    pub prompt: String,
    /// Pattern to wait for before sending the PIN, e.g. "Enter PIN code:"
    pub pin_prompt: Option<String>,
    pub timing: TimingConfig,
    pub prepare: PrepareConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimingConfig {
    pub command_delay_ms: u64,
    pub pin_delay_ms: u64,
    /// 0 waits forever
    pub prompt_timeout_secs: u64,
}

/// Optional steps run before the pairing commands
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PrepareConfig {
    /// Run `rfkill unblock all` before spawning the tool
    pub rfkill_unblock: bool,
    /// Power the controller off and on again before `remove`
    pub power_cycle: bool,
}

impl Default for PairConfig {
    fn default() -> Self {
        Self {
            tool: "bluetoothctl".to_string(),
            prompt: "#".to_string(),
            pin_prompt: None,
            timing: TimingConfig::default(),
            prepare: PrepareConfig::default(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            command_delay_ms: 5000,
            pin_delay_ms: 3000,
            prompt_timeout_secs: 30,
        }
    }
}

impl TimingConfig {
    pub fn command_delay(&self) -> Duration {
        Duration::from_millis(self.command_delay_ms)
    }

    pub fn pin_delay(&self) -> Duration {
        Duration::from_millis(self.pin_delay_ms)
    }

    pub fn prompt_timeout(&self) -> Option<Duration> {
        match self.prompt_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

impl PairConfig {
    pub fn load(path: &str) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(_) => {
                // Fall back to defaults and try to leave a template behind
                let config = Self::default();
                if let Ok(rendered) = toml::to_string_pretty(&config) {
                    let _ = fs::write(path, rendered);
                }
                Ok(config)
            }
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// An empty pattern would match nothing but end of stream.
    pub fn validate(&self) -> Result<()> {
        if self.tool.trim().is_empty() {
            return Err(PairError::InvalidConfig("tool must not be empty".to_string()));
        }
        if self.prompt.is_empty() {
            return Err(PairError::InvalidConfig("prompt must not be empty".to_string()));
        }
        if self.pin_prompt.as_deref() == Some("") {
            return Err(PairError::InvalidConfig(
                "pin_prompt must not be empty, leave it unset instead".to_string(),
            ));
        }
        Ok(())
    }
}
