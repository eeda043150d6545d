//! Interactive terminal session
//!
//! Reads human messages line by line and prints the conversation. Logs go to
//! stderr, so stdout carries only the dialogue.

use crate::runtime::{DriverError, HumanInput, SharedDriver};
use crate::state_machine::{Conversation, Speaker};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tokio_util::sync::CancellationToken;

/// Line-oriented front end over any async reader and writer
pub struct TerminalInput<R, W> {
    lines: Lines<R>,
    out: W,
}

impl<R: AsyncBufRead + Unpin + Send, W: Write + Send> TerminalInput<R, W> {
    pub fn new(reader: R, out: W) -> Self {
        Self {
            lines: reader.lines(),
            out,
        }
    }

    #[cfg(test)]
    fn into_output(self) -> W {
        self.out
    }
}

// Write failures on the terminal are not actionable, so they are dropped
#[async_trait]
impl<R: AsyncBufRead + Unpin + Send, W: Write + Send> HumanInput for TerminalInput<R, W> {
    async fn begin(&mut self, conv: &Conversation) {
        let _ = writeln!(self.out, "Context: {}\n", conv.visible_context());
        for (speaker, text) in conv.entries() {
            let _ = writeln!(self.out, "<{}>: {text}", speaker.label());
        }
        let _ = writeln!(self.out, "(Ctrl-D to quit)");
    }

    async fn read_message(&mut self) -> Option<String> {
        let _ = write!(self.out, "<{}>: ", Speaker::Human.label());
        let _ = self.out.flush();
        match self.lines.next_line().await {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read from terminal");
                None
            }
        }
    }

    async fn show_reply(&mut self, reply: &str) {
        let _ = writeln!(self.out, "<{}>: {reply}", Speaker::Automated.label());
    }

    async fn show_error(&mut self, error: &DriverError) {
        let hint = if error.is_retryable() { " (retrying)" } else { "" };
        let _ = writeln!(self.out, "[error] {error}{hint}");
    }

    async fn finish(&mut self, conv: &Conversation) {
        let _ = writeln!(self.out, "\n--- Conversation finished ---");
        let _ = writeln!(self.out, "What was really going on: {}", conv.true_context());
        match conv.evaluation() {
            Some(evaluation) => {
                let _ = writeln!(self.out, "\nEvaluation: {evaluation}");
            }
            None => {
                let _ = writeln!(self.out, "\nEvaluation unavailable.");
            }
        }
    }
}

/// Run one conversation on stdin/stdout. Ctrl-C ends the session, whether it
/// is waiting on the human or on the backend.
pub async fn run_chat(driver: &SharedDriver) -> Result<(), DriverError> {
    let session = uuid::Uuid::new_v4().to_string();
    let cancel = CancellationToken::new();

    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut input = TerminalInput::new(stdin, std::io::stdout());
    let mut rng = StdRng::from_entropy();

    match driver.run(&session, &mut input, &mut rng, &cancel).await {
        Ok(_) | Err(DriverError::InputClosed) => Ok(()),
        Err(DriverError::Cancelled) => {
            println!();
            tracing::info!(session = %session, "Session interrupted");
            Ok(())
        }
        Err(e) => Err(e),
    }
}
