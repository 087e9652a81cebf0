use std::path::PathBuf;

use anyhow::{Context, Result};
use console::{style, Term};
use moo::agent::{Agent, TurnOutcome};
use moo::config::{MooConfig, SYSTEM_PROMPT};
use moo::errors::AgentResult;
use moo::models::message::Message;
use moo::providers::factory::get_provider;
use moo::tools::ToolRegistry;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use serde_json::json;
use tracing::{debug, info};

use crate::render::TerminalRenderer;

const PROMPT: &str = "\x1b[1m\x1b[38;5;30m(oo)> \x1b[0m";
const HISTORY_FILE: &str = ".moo_history";

pub const DEMO_PROMPTS: [&str; 3] = [
    "Tell me a joke, use cowsay.",
    "Which cow files are available?",
    "Use the dragon cow file to say hello.",
];

/// Id of the tool call injected by the test harness
pub const TEST_CALL_ID: &str = "call_test_0";

pub fn build_agent(config: &MooConfig, api_key: Option<String>) -> Result<Agent> {
    let selection = config
        .provider_selection(api_key)
        .context("Failed to configure the provider")?;
    info!(provider = %selection.kind(), model = selection.model(), "provider selected");

    let provider = get_provider(selection, config.observer())?;
    let registry = ToolRegistry::with_cowsay(config.cowsay())?;

    Ok(Agent::new(provider, registry, SYSTEM_PROMPT).with_renderer(Box::new(TerminalRenderer::new())))
}

#[derive(Debug, PartialEq, Eq)]
pub enum InputCommand {
    Message(String),
    Help,
    Clear,
    Exit,
    Empty,
}

pub fn parse_input(line: &str) -> InputCommand {
    let text = line.trim();
    if text.is_empty() {
        return InputCommand::Empty;
    }
    match text.to_lowercase().as_str() {
        "exit" | "/exit" | "/quit" => InputCommand::Exit,
        "/?" | "/help" => InputCommand::Help,
        "/clear" => InputCommand::Clear,
        _ => InputCommand::Message(text.to_string()),
    }
}

fn print_help() {
    println!("Commands:");
    println!("exit | /exit | /quit - Exit the session");
    println!("/clear - Clear the screen");
    println!("/? | /help - Display this help message");
}

fn history_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(HISTORY_FILE))
}

/// Print the failure of a turn; the session goes on either way
fn report(result: AgentResult<TurnOutcome>) {
    match result {
        Ok(outcome) => debug!(
            depth = outcome.depth,
            total_tokens = ?outcome.usage.total_tokens,
            "turn finished"
        ),
        Err(e) => eprintln!("{} {}", style("error:").red().bold(), e),
    }
}

pub async fn run_repl(agent: &mut Agent) -> Result<()> {
    println!(
        "moo is running on {} ({}) {}",
        agent.provider().name(),
        agent.provider().model(),
        style("- type \"exit\" to end the session, /help for commands").dim()
    );
    println!();

    let mut editor = DefaultEditor::new()?;
    let history = history_path();
    if let Some(path) = &history {
        // a missing history file is normal on first run
        let _ = editor.load_history(path);
    }

    loop {
        let line = match editor.readline(PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {}", e);
                break;
            }
        };

        match parse_input(&line) {
            InputCommand::Empty => continue,
            InputCommand::Exit => break,
            InputCommand::Help => print_help(),
            InputCommand::Clear => Term::stdout().clear_screen()?,
            InputCommand::Message(text) => {
                let _ = editor.add_history_entry(text.as_str());
                report(agent.reply(&text).await);
            }
        }
    }

    if let Some(path) = &history {
        if let Err(e) = editor.save_history(path) {
            debug!(error = %e, "could not save history");
        }
    }
    Ok(())
}

pub async fn run_demo(agent: &mut Agent) -> Result<()> {
    for prompt in DEMO_PROMPTS {
        println!("{} {}", style(">").cyan().bold(), style(prompt).cyan());
        report(agent.reply(prompt).await);
        println!();
    }
    Ok(())
}

/// The assistant message the test harness pretends to have received
pub fn test_message(message: &str, file: &str) -> Message {
    Message::assistant().with_tool_call(
        TEST_CALL_ID,
        "call_cowsay",
        json!({"message": message, "file": file}),
    )
}

pub async fn run_test(agent: &mut Agent, message: &str, file: &str) -> Result<()> {
    let outcome = agent.inspect(test_message(message, file)).await?;
    info!(depth = outcome.depth, "test harness finished");
    Ok(())
}
