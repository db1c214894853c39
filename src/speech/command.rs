//! Speech through an external program.
//!
//! `<command> <args…> <text>` is spawned once per utterance.  The child is
//! created with `kill_on_drop`, so an interrupted utterance stops speaking
//! immediately.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use super::{SpeechEngine, SpeechError};
use crate::config::SpeechConfig;

#[derive(Debug, Clone)]
pub struct CommandSpeech {
    command: String,
    args: Vec<String>,
}

impl CommandSpeech {
    pub fn from_config(config: &SpeechConfig) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
        }
    }

    /// Make sure the speech program can be started by speaking an empty
    /// utterance.
    ///
    /// # Errors
    ///
    /// [`SpeechError::Unavailable`] when the program cannot be spawned,
    /// [`SpeechError::Failed`] when it rejects the configured arguments.
    pub async fn check(&self) -> Result<(), SpeechError> {
        self.speak("").await
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

#[async_trait]
impl SpeechEngine for CommandSpeech {
    async fn speak(&self, text: &str) -> Result<(), SpeechError> {
        log::debug!("speech: {:?}", text);

        let output = Command::new(&self.command)
            .args(&self.args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| SpeechError::Unavailable(format!("{}: {e}", self.command)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SpeechError::Failed(format!(
                "{} exited with {}: {}",
                self.command,
                output.status,
                stderr.trim()
            )));
        }

        Ok(())
    }
}
