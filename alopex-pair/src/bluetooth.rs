/*!
 * Bluetooth Device Pairing
 * Scripted pairing through an interactive bluetoothctl session
 */

use std::io::Write;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::config::PairConfig;
use crate::error::{PairError, Result};
use crate::pty;
use crate::session::{Expected, Session};

pub const COMPLETION_MESSAGE: &str = "Should be paired now.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Expect(String),
    Send(String),
    Sleep(Duration),
    /// Message for the user, not for the tool
    Notice(String),
    ExpectEof,
}

pub struct BluetoothManager {
    config: PairConfig,
}

impl BluetoothManager {
    pub fn new(config: PairConfig) -> Self {
        Self { config }
    }

    pub async fn pair_device(&self, address: &str, pin: &str) -> Result<()> {
        validate_inputs(address, pin)?;

        tracing::info!("Pairing with device: {}", address);
        if self.config.pin_prompt.is_none() {
            tracing::warn!("PIN will be sent without waiting for a PIN request");
        }
        if self.config.prepare.rfkill_unblock {
            unblock_rfkill().await;
        }

        let (mut child, stream) = pty::spawn(&self.config.tool, &[])?;
        let mut session = Session::new(stream);

        let steps = pairing_script(address, pin, &self.config);
        run_script(
            &mut session,
            &steps,
            self.config.timing.prompt_timeout(),
            &mut std::io::stdout(),
        )
        .await?;

        let status = child.wait().await?;
        tracing::debug!("{} exited with {}", self.config.tool, status);
        Ok(())
    }
}

/// Best effort, like the rest of the script: a failure is only logged.
async fn unblock_rfkill() {
    match tokio::process::Command::new("rfkill")
        .args(["unblock", "all"])
        .status()
        .await
    {
        Ok(status) if status.success() => tracing::debug!("rfkill unblocked all radios"),
        Ok(status) => tracing::warn!("rfkill unblock exited with {}", status),
        Err(e) => tracing::warn!("Failed to run rfkill: {}", e),
    }
}

pub fn validate_inputs(address: &str, pin: &str) -> Result<()> {
    if address.trim().is_empty() {
        return Err(PairError::InvalidInput("device address is empty".to_string()));
    }
    if address.chars().any(char::is_control) {
        return Err(PairError::InvalidInput(
            "device address contains control characters".to_string(),
        ));
    }
    if pin.chars().any(char::is_control) {
        return Err(PairError::InvalidInput(
            "PIN code contains control characters".to_string(),
        ));
    }
    Ok(())
}

/// The fixed remove/trust/pair/PIN sequence. Every step runs once, in order.
pub fn pairing_script(address: &str, pin: &str, config: &PairConfig) -> Vec<Step> {
    let prompt = Step::Expect(config.prompt.clone());
    let command_delay = Step::Sleep(config.timing.command_delay());

    let mut steps = vec![prompt.clone()];

    if config.prepare.power_cycle {
        steps.extend([
            Step::Send("power off".to_string()),
            Step::Expect("Changing power off succeeded".to_string()),
            Step::Send("power on".to_string()),
            Step::Expect("Changing power on succeeded".to_string()),
        ]);
    }

    steps.extend([
        Step::Send(format!("remove {}", address)),
        command_delay.clone(),
        prompt,
        Step::Send(format!("trust {}", address)),
        command_delay.clone(),
        Step::Send(format!("pair {}", address)),
        command_delay,
    ]);

    if let Some(pin_prompt) = &config.pin_prompt {
        steps.push(Step::Expect(pin_prompt.clone()));
    }

    steps.extend([
        Step::Send(pin.to_string()),
        Step::Sleep(config.timing.pin_delay()),
        Step::Notice(COMPLETION_MESSAGE.to_string()),
        Step::Send("quit".to_string()),
        Step::ExpectEof,
    ]);

    steps
}

pub async fn run_script<T, W>(
    session: &mut Session<T>,
    steps: &[Step],
    timeout: Option<Duration>,
    out: &mut W,
) -> Result<()>
where
    T: AsyncRead + AsyncWrite + Unpin,
    W: Write,
{
    for step in steps {
        match step {
            Step::Expect(pattern) => {
                if session.expect(pattern, timeout).await? == Expected::Eof {
                    tracing::debug!("Stream ended before {:?} appeared", pattern);
                }
            }
            Step::Send(line) => session.send_line(line).await?,
            Step::Sleep(duration) => tokio::time::sleep(*duration).await,
            Step::Notice(message) => {
                writeln!(out, "{}", message)?;
                out.flush()?;
            }
            Step::ExpectEof => session.expect_eof(timeout).await?,
        }
    }

    Ok(())
}
