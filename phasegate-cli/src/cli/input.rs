//! Terminal input for the interactive loop

use anyhow::{Context, Result};
use async_trait::async_trait;
use phasegate_core::models::workflow::GateAction;
use phasegate_core::workflow::{AnswerSource, PhaseRequest};
use std::io::{self, BufRead, Write};

/// Line that ends a multi-line answer typed at the terminal
pub const END_OF_ANSWER: &str = ".";

/// Choice made at the gate prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateChoice {
    Decide(GateAction),
    /// Leave without recording anything for this phase
    Quit,
}

/// Parse user input for the gate prompt; `None` means ask again
pub fn parse_gate_choice(input: &str) -> Option<GateChoice> {
    match input.trim().to_lowercase().as_str() {
        "c" | "confirm" | "y" | "yes" => Some(GateChoice::Decide(GateAction::Confirm)),
        "r" | "revise" => Some(GateChoice::Decide(GateAction::Revise)),
        "p" | "park" => Some(GateChoice::Decide(GateAction::Park)),
        "q" | "quit" | "exit" => Some(GateChoice::Quit),
        _ => None,
    }
}

/// Read one line from stdin (async wrapper); `None` on end of input
pub async fn read_user_input() -> Result<Option<String>> {
    tokio::task::spawn_blocking(|| {
        let mut buffer = String::new();
        let read = io::stdin().read_line(&mut buffer)?;
        Ok::<Option<String>, io::Error>((read > 0).then_some(buffer))
    })
    .await
    .context("Failed to read user input")?
    .context("Failed to read from stdin")
}

/// Ask for a gate decision until a valid choice is made; end of input quits
pub async fn prompt_gate_choice() -> Result<GateChoice> {
    loop {
        print!("Decision [c]onfirm / [r]evise / [p]ark / [q]uit: ");
        io::stdout().flush().context("Failed to flush stdout")?;

        let Some(line) = read_user_input().await? else {
            return Ok(GateChoice::Quit);
        };
        match parse_gate_choice(&line) {
            Some(choice) => return Ok(choice),
            None => println!("Invalid response. Please enter c, r, p or q."),
        }
    }
}

/// Optional single-line notes for the audit trail
pub async fn prompt_notes() -> Result<Option<String>> {
    print!("Notes (optional): ");
    io::stdout().flush().context("Failed to flush stdout")?;
    Ok(read_user_input()
        .await?
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty()))
}

/// Collect everything up to a line holding only `.` (or end of input)
pub fn read_answer_from<R: BufRead>(reader: R) -> io::Result<String> {
    let mut answer = String::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim_end() == END_OF_ANSWER {
            break;
        }
        answer.push_str(&line);
        answer.push('\n');
    }
    Ok(answer)
}

/// Answers typed by a human at the terminal
pub struct TerminalAnswer;

#[async_trait]
impl AnswerSource for TerminalAnswer {
    async fn answer(&self, request: &PhaseRequest) -> Result<String> {
        println!(
            "Enter the {} answer; finish with a line containing only '{}':",
            request.phase_name, END_OF_ANSWER
        );
        tokio::task::spawn_blocking(|| read_answer_from(io::stdin().lock()))
            .await
            .context("Failed to read answer")?
            .context("Failed to read answer from stdin")
    }
}
