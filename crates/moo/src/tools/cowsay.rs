use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Map, Value};
use tokio::process::Command;
use tracing::debug;

use super::registry::{ToolDefinition, ToolExecutor, ToolRegistry};
use crate::errors::{ToolError, ToolResult};
use crate::models::tool::Tool;

pub const COWSAY_BIN: &str = "cowsay";
pub const DEFAULT_COW_FILE: &str = "default";
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30);

lazy_static! {
    static ref LISTING_HEADER: Regex =
        Regex::new(r"(?m)^Cow files in .*:\s*$").expect("valid regex");
}

/// Shells out to the cowsay rendering utility
#[derive(Debug, Clone)]
pub struct Cowsay {
    program: String,
    leading_args: Vec<String>,
    timeout: Duration,
}

impl Default for Cowsay {
    fn default() -> Self {
        Self::new(COWSAY_BIN)
    }
}

impl Cowsay {
    pub fn new<S: Into<String>>(program: S) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
            timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    /// Arguments placed before the cowsay arguments, e.g. a script path when `program` is `sh`
    pub fn with_leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run(&self, args: &[&str]) -> ToolResult<String> {
        debug!(program = %self.program, ?args, "running cowsay");

        let child = Command::new(&self.program)
            .args(&self.leading_args)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                ToolError::ToolExecutionFailed(format!("Failed to start {}: {}", self.program, e))
            })?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                ToolError::ToolExecutionFailed(format!(
                    "{} timed out after {}s",
                    self.program,
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| ToolError::ToolExecutionFailed(e.to_string()))?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let diagnostic = if !stderr.trim().is_empty() {
                stderr.trim().to_string()
            } else if !stdout.trim().is_empty() {
                stdout.trim().to_string()
            } else {
                format!("{} exited with {}", self.program, output.status)
            };
            return Err(ToolError::ToolExecutionFailed(diagnostic));
        }

        Ok(stdout.trim_end().to_string())
    }

    /// Render `message` in a speech bubble using the named cow file
    pub async fn say(&self, message: &str, file: &str) -> ToolResult<String> {
        self.run(&["-f", file, "--", message]).await
    }

    /// List the installed cow files, one per line
    pub async fn cow_files(&self) -> ToolResult<String> {
        let listing = self.run(&["-l"]).await?;
        Ok(format_cow_files(&listing))
    }

    /// The two builtin tool definitions backed by this utility
    pub fn tools(self) -> Vec<ToolDefinition> {
        let cowsay = Arc::new(self);
        vec![
            ToolDefinition::new(call_cowsay_tool(), Arc::new(CallCowsay(cowsay.clone()))),
            ToolDefinition::new(get_cow_files_tool(), Arc::new(GetCowFiles(cowsay))),
        ]
    }
}

/// `cowsay -l` prints a header per directory followed by space separated names
fn format_cow_files(listing: &str) -> String {
    LISTING_HEADER
        .replace_all(listing, "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("\n")
}

fn call_cowsay_tool() -> Tool {
    Tool::new(
        "call_cowsay",
        "Render a message in a speech bubble spoken by an ASCII-art cow. \
        Use get_cow_files to discover other characters for the `file` parameter.",
        json!({
            "type": "object",
            "required": ["message"],
            "properties": {
                "message": {
                    "type": "string",
                    "description": "The text the cow says."
                },
                "file": {
                    "type": "string",
                    "default": DEFAULT_COW_FILE,
                    "description": "The cow file to draw, e.g. default, tux or dragon."
                }
            }
        }),
    )
}

fn get_cow_files_tool() -> Tool {
    Tool::new(
        "get_cow_files",
        "List the cow files available to call_cowsay, one per line.",
        json!({
            "type": "object",
            "properties": {}
        }),
    )
}

struct CallCowsay(Arc<Cowsay>);

#[async_trait]
impl ToolExecutor for CallCowsay {
    async fn execute(&self, arguments: &Map<String, Value>) -> ToolResult<String> {
        let message = arguments
            .get("message")
            .and_then(Value::as_str)
            .filter(|m| !m.trim().is_empty())
            .ok_or_else(|| {
                ToolError::InvalidArgument("call_cowsay requires a non-empty 'message'".into())
            })?;

        let file = match arguments.get("file") {
            None | Some(Value::Null) => DEFAULT_COW_FILE,
            Some(Value::String(file)) if file.trim().is_empty() => DEFAULT_COW_FILE,
            Some(Value::String(file)) if file.starts_with('-') => {
                return Err(ToolError::InvalidArgument(format!(
                    "'{}' is not a cow file",
                    file
                )))
            }
            Some(Value::String(file)) => file.as_str(),
            Some(other) => {
                return Err(ToolError::InvalidArgument(format!(
                    "'file' must be a string, got: {}",
                    other
                )))
            }
        };

        self.0.say(message, file).await
    }
}

struct GetCowFiles(Arc<Cowsay>);

#[async_trait]
impl ToolExecutor for GetCowFiles {
    async fn execute(&self, _arguments: &Map<String, Value>) -> ToolResult<String> {
        self.0.cow_files().await
    }
}

impl ToolRegistry {
    /// A registry holding `call_cowsay` and `get_cow_files`
    pub fn with_cowsay(cowsay: Cowsay) -> Result<Self> {
        cowsay
            .tools()
            .into_iter()
            .try_fold(ToolRegistry::new(), ToolRegistry::with_tool)
    }
}
