//! CLI surface: stdin/stdout REPL over a single intake session.

use std::path::PathBuf;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::booking::SLOTS;
use crate::error::Result;
use crate::intake::{IntakeController, IntakeSession};
use crate::summary::{SUMMARY_FILE_NAME, SummaryRenderer};

/// One parsed line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    Message(String),
    Summary(Option<PathBuf>),
    Book,
    Slots,
    /// 1-based index into the slot list.
    Slot(usize),
    Confirm,
    Help,
    Quit,
    Unknown(String),
}

impl CliCommand {
    /// Parse a line. Anything not starting with `/` is a message for the model.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Some(Self::Message(line.to_string()));
        };

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };

        let command = match name {
            "summary" if arg.is_empty() => Self::Summary(None),
            "summary" => Self::Summary(Some(PathBuf::from(arg))),
            "book" => Self::Book,
            "slots" => Self::Slots,
            "slot" => match arg.parse() {
                Ok(n) => Self::Slot(n),
                Err(_) => Self::Unknown(line.to_string()),
            },
            "confirm" => Self::Confirm,
            "help" => Self::Help,
            "quit" | "exit" => Self::Quit,
            _ => Self::Unknown(line.to_string()),
        };
        Some(command)
    }
}

const HELP: &str = "Commands: /summary [path], /book, /slots, /slot <n>, /confirm, /quit";

/// Interactive loop for local use.
pub struct CliRepl<'a> {
    controller: &'a IntakeController,
    renderer: &'a SummaryRenderer,
    session: IntakeSession,
}

impl<'a> CliRepl<'a> {
    pub fn new(controller: &'a IntakeController, renderer: &'a SummaryRenderer) -> Self {
        Self {
            controller,
            renderer,
            session: IntakeSession::new(),
        }
    }

    pub fn session(&self) -> &IntakeSession {
        &self.session
    }

    /// Run until `/quit` or end of input.
    pub async fn run<R, W>(&mut self, input: R, output: &mut W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        if let Some(greeting) = self.session.transcript().last_assistant() {
            output
                .write_all(format!("\n{}\n\n", greeting.content).as_bytes())
                .await?;
        }

        let mut lines = input.lines();
        loop {
            output.write_all(b"> ").await?;
            output.flush().await?;

            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    tracing::error!("Error reading stdin: {}", e);
                    break;
                }
            };

            let Some(command) = CliCommand::parse(&line) else {
                continue;
            };
            if command == CliCommand::Quit {
                break;
            }
            let reply = self.execute(command).await;
            output.write_all(format!("\n{reply}\n\n").as_bytes()).await?;
        }

        output.flush().await?;
        Ok(())
    }

    async fn execute(&mut self, command: CliCommand) -> String {
        match command {
            CliCommand::Message(text) => {
                match self.controller.handle_user_turn(&mut self.session, &text).await {
                    Ok(outcome) if outcome.classified => format!(
                        "{}\n\nIntake complete. /summary [path] saves the PDF, /book books a session.",
                        outcome.reply
                    ),
                    Ok(outcome) => outcome.reply,
                    Err(e) => format!("Error: {e}. Your message was not recorded, please try again."),
                }
            }
            CliCommand::Summary(path) => self.save_summary(path).await,
            CliCommand::Book => match self.session.start_booking() {
                Ok(()) => format!("Choose a slot with /slot <n>:\n{}", slot_list()),
                Err(e) => format!("Error: {e}"),
            },
            CliCommand::Slots => slot_list(),
            CliCommand::Slot(n) => {
                let Some(slot) = n.checked_sub(1).and_then(|i| SLOTS.get(i)) else {
                    return format!("Unknown slot number {n}, choose 1-{}", SLOTS.len());
                };
                match self.session.select_slot(slot) {
                    Ok(()) => format!("Selected {slot}. /confirm to book it."),
                    Err(e) => format!("Error: {e}"),
                }
            }
            CliCommand::Confirm => match self.session.confirm_booking() {
                Ok(confirmation) => format!("{}\n{}", confirmation.message, confirmation.note),
                Err(e) => format!("Error: {e}"),
            },
            CliCommand::Help => HELP.to_string(),
            CliCommand::Unknown(line) => format!("Unknown command: {line}\n{HELP}"),
            CliCommand::Quit => String::new(),
        }
    }

    async fn save_summary(&self, path: Option<PathBuf>) -> String {
        let Some(text) = self.session.final_classification() else {
            return "No classification yet, keep answering the questions first.".to_string();
        };
        let doc = match self.renderer.render(text) {
            Ok(doc) => doc,
            Err(e) => return format!("Error: {e}"),
        };
        let path = path.unwrap_or_else(|| PathBuf::from(SUMMARY_FILE_NAME));
        match tokio::fs::write(&path, &doc.bytes).await {
            Ok(()) => {
                tracing::info!(path = %path.display(), pages = doc.page_count, "Summary saved");
                format!("Summary saved to {} ({} page(s))", path.display(), doc.page_count)
            }
            Err(e) => format!("Error: could not write {}: {e}", path.display()),
        }
    }
}

fn slot_list() -> String {
    SLOTS
        .iter()
        .enumerate()
        .map(|(i, slot)| format!("  {}. {slot}", i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use tokio::io::BufReader;

    use super::*;
    use crate::intake::controller::tests::{ScriptedLlm, WORK_STRESS_RECORD};

    #[test]
    fn parses_commands() {
        assert_eq!(CliCommand::parse("   "), None);
        assert_eq!(
            CliCommand::parse(" I feel stuck "),
            Some(CliCommand::Message("I feel stuck".to_string()))
        );
        assert_eq!(CliCommand::parse("/summary"), Some(CliCommand::Summary(None)));
        assert_eq!(
            CliCommand::parse("/summary out/me.pdf"),
            Some(CliCommand::Summary(Some(PathBuf::from("out/me.pdf"))))
        );
        assert_eq!(CliCommand::parse("/slot 3"), Some(CliCommand::Slot(3)));
        assert_eq!(
            CliCommand::parse("/slot x"),
            Some(CliCommand::Unknown("/slot x".to_string()))
        );
        assert_eq!(CliCommand::parse("/quit"), Some(CliCommand::Quit));
        assert_eq!(
            CliCommand::parse("/dance"),
            Some(CliCommand::Unknown("/dance".to_string()))
        );
    }

    async fn run_script(controller: &IntakeController, script: &str) -> (String, IntakeSession) {
        let renderer = SummaryRenderer::default();
        let mut repl = CliRepl::new(controller, &renderer);
        let mut output = Vec::new();
        repl.run(BufReader::new(script.as_bytes()), &mut output)
            .await
            .unwrap();
        (String::from_utf8(output).unwrap(), repl.session().clone())
    }

    #[tokio::test]
    async fn full_flow_through_booking() {
        let dir = tempfile::tempdir().unwrap();
        let pdf_path = dir.path().join("summary.pdf");
        let controller =
            IntakeController::new(ScriptedLlm::replying(&["How long?", WORK_STRESS_RECORD]));

        let script = format!(
            "/summary\nAnxious at work\nTwo weeks\n/summary {}\n/book\n/slot 3\n/confirm\n/quit\nignored\n",
            pdf_path.display()
        );
        let (output, session) = run_script(&controller, &script).await;

        assert!(output.contains("Hi — what brings you here today?"));
        assert!(output.contains("No classification yet"));
        assert!(output.contains("Intake complete."));
        assert!(output.contains("Session booked for Friday — 11:00 AM"));
        assert_eq!(session.transcript().len(), 5);
        assert_eq!(session.booked_slot(), Some("Friday — 11:00 AM"));

        let bytes = std::fs::read(&pdf_path).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn booking_commands_are_rejected_before_classification() {
        let controller = IntakeController::new(ScriptedLlm::replying(&[]));
        let (output, session) = run_script(&controller, "/book\n/slot 9\n/confirm\n").await;

        assert!(output.contains("Error: Booking is only available"));
        assert!(output.contains("Unknown slot number 9"));
        assert!(output.contains("Error: Booking has not been started"));
        assert!(!session.booking_started());
    }
}
