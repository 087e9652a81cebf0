use thiserror::Error;

/// Failures raised by a single tool dispatch.
///
/// These never end a turn on their own: the agent either skips the call
/// (`UnknownTool`) or folds the message into a tool result for the model.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Tool execution failed: {0}")]
    ToolExecutionFailed(String),
}

pub type ToolResult<T> = Result<T, ToolError>;

/// Transport level failures talking to a provider.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server error: {status}\n{body}")]
    Status { status: u16, body: String },

    #[error("Provider API error: {0}")]
    Api(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversationError {
    #[error("A conversation holds exactly one system message")]
    DuplicateSystemMessage,

    #[error("Tool result references unknown tool call id '{0}'")]
    UnknownToolCallId(String),

    #[error("Only assistant messages may carry tool calls")]
    MisplacedToolCalls,
}

/// Errors that end the current turn.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error(transparent)]
    Transport(#[from] ProviderError),

    #[error("Recursion limit exceeded: depth {depth} is over the limit of {limit}")]
    RecursionLimitExceeded { depth: usize, limit: usize },

    #[error(transparent)]
    Conversation(#[from] ConversationError),
}

pub type AgentResult<T> = Result<T, AgentError>;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable '{0}' is required but not set.")]
    Missing(String),

    #[error("Environment variable '{key}' has an invalid value '{value}'")]
    Invalid { key: String, value: String },

    #[error(transparent)]
    Env(#[from] std::env::VarError),
}
