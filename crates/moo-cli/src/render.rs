use std::io::{self, Write};

use bat::WrappingMode;
use cliclack::spinner;
use console::style;
use moo::agent::Renderer;
use moo::models::message::{Message, Role};
use moo::models::tool::ToolCallRequest;
use serde_json::Value;

const MAX_STRING_LENGTH: usize = 40;
const INDENT: &str = "    ";
const THEME: &str = "zenburn";

/// Prints assistant replies as markdown and shows a spinner while the provider works
pub struct TerminalRenderer {
    spinner: Option<cliclack::ProgressBar>,
}

impl TerminalRenderer {
    pub fn new() -> Self {
        TerminalRenderer { spinner: None }
    }
}

impl Default for TerminalRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for TerminalRenderer {
    fn render(&mut self, message: &Message) {
        // the user already sees what they typed
        if message.role != Role::Assistant {
            return;
        }
        print_markdown(message.text(), THEME);
        println!();
        let _ = io::stdout().flush();
    }

    fn show_busy(&mut self) {
        let progress = spinner();
        progress.start("awaiting reply...");
        self.spinner = Some(progress);
    }

    fn hide_busy(&mut self) {
        if let Some(progress) = self.spinner.take() {
            progress.stop("");
        }
    }

    fn tool_call(&mut self, call: &ToolCallRequest) {
        println!();
        println!(
            "─── {} | {} ──────────────────────────",
            style(&call.tool_name),
            style(&call.id).magenta().dim(),
        );
        print!("{}", format_arguments(&call.arguments, 0));
        println!();
    }
}

fn print_markdown(content: &str, theme: &str) {
    let printed = bat::PrettyPrinter::new()
        .input(bat::Input::from_bytes(content.as_bytes()))
        .theme(theme)
        .language("Markdown")
        .wrapping_mode(WrappingMode::Character)
        .print();

    if printed.is_err() {
        println!("{}", content);
    }
}

/// Arguments as indented `key: value` lines, long strings elided
pub fn format_arguments(value: &Value, depth: usize) -> String {
    let indent = INDENT.repeat(depth);
    let mut out = String::new();

    match value {
        Value::Object(map) => {
            for (key, val) in map {
                match val {
                    Value::Object(_) | Value::Array(_) => {
                        out.push_str(&format!("{}{}:\n", indent, style(key).dim()));
                        out.push_str(&format_arguments(val, depth + 1));
                    }
                    _ => out.push_str(&format!(
                        "{}{}: {}\n",
                        indent,
                        style(key).dim(),
                        format_scalar(val)
                    )),
                }
            }
        }
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                out.push_str(&format!("{}{}.\n", indent, i + 1));
                out.push_str(&format_arguments(item, depth + 1));
            }
        }
        _ => out.push_str(&format!("{}{}\n", indent, format_scalar(value))),
    }

    out
}

fn format_scalar(value: &Value) -> String {
    match value {
        Value::String(s) if s.chars().count() > MAX_STRING_LENGTH => {
            style("...").dim().to_string()
        }
        Value::String(s) => style(s).green().to_string(),
        Value::Number(n) => style(n).blue().to_string(),
        Value::Bool(b) => style(b).blue().to_string(),
        Value::Null => style("null").dim().to_string(),
        other => other.to_string(),
    }
}
