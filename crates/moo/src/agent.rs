//! The tool-call orchestration loop.
//!
//! One user turn runs a small state machine:
//!
//! ```text
//! AwaitingProviderReply -> InspectingMessage -> ExecutingTools -> AwaitingProviderReply ...
//!                                           \-> done
//! ```
//!
//! Every provider round-trip caused by tool output bumps a per-turn
//! [`RecursionGuard`], so a model that keeps asking for tools is cut off after
//! a fixed number of rounds.
use tracing::{debug, info, warn};

use crate::conversation::Conversation;
use crate::errors::{AgentError, AgentResult, ToolError};
use crate::models::message::Message;
use crate::models::tool::ToolCallRequest;
use crate::providers::base::{Provider, Usage};
use crate::tools::ToolRegistry;

/// Tool-triggered provider re-queries allowed per user turn
pub const MAX_DEPTH: usize = 8;

/// Which tool calls of an assistant message get executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolCallMode {
    /// Every requested call, in order, within one round
    #[default]
    All,
    /// Only the first call; the rest are ignored
    FirstOnly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    pub max_depth: usize,
    pub tool_call_mode: ToolCallMode,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_depth: MAX_DEPTH,
            tool_call_mode: ToolCallMode::default(),
        }
    }
}

/// Per-turn depth counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecursionGuard {
    depth: usize,
    limit: usize,
}

impl RecursionGuard {
    pub fn new(limit: usize) -> Self {
        Self { depth: 0, limit }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn reset(&mut self) {
        self.depth = 0;
    }

    /// Count one more tool round, failing once the limit is passed
    pub fn advance(&mut self) -> AgentResult<usize> {
        self.depth += 1;
        if self.depth > self.limit {
            return Err(AgentError::RecursionLimitExceeded {
                depth: self.depth,
                limit: self.limit,
            });
        }
        Ok(self.depth)
    }
}

/// Where the agent shows progress and replies to the caller
pub trait Renderer {
    /// Called for every appended message the caller should see
    fn render(&mut self, message: &Message);

    fn show_busy(&mut self) {}

    fn hide_busy(&mut self) {}

    fn tool_call(&mut self, _call: &ToolCallRequest) {}
}

/// Shows nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn render(&mut self, _message: &Message) {}
}

/// How a turn ended when it ended normally
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    /// Tool rounds used by this turn
    pub depth: usize,
    /// Text of the last assistant message
    pub reply: String,
    pub usage: Usage,
}

enum LoopState {
    AwaitingProviderReply,
    InspectingMessage(Message),
    ExecutingTools(Vec<ToolCallRequest>),
}

/// Agent ties a provider to the tools it may call and owns the session's conversation
pub struct Agent {
    provider: Box<dyn Provider>,
    registry: ToolRegistry,
    conversation: Conversation,
    guard: RecursionGuard,
    config: AgentConfig,
    renderer: Box<dyn Renderer>,
}

impl Agent {
    pub fn new<S: Into<String>>(
        provider: Box<dyn Provider>,
        registry: ToolRegistry,
        system_prompt: S,
    ) -> Self {
        let config = AgentConfig::default();
        Self {
            provider,
            registry,
            conversation: Conversation::new(system_prompt),
            guard: RecursionGuard::new(config.max_depth),
            config,
            renderer: Box::new(NullRenderer),
        }
    }

    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.guard = RecursionGuard::new(config.max_depth);
        self.config = config;
        self
    }

    pub fn with_renderer(mut self, renderer: Box<dyn Renderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn provider(&self) -> &dyn Provider {
        self.provider.as_ref()
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Depth reached by the current or most recent turn
    pub fn depth(&self) -> usize {
        self.guard.depth()
    }

    /// Run one user turn to completion
    pub async fn reply(&mut self, text: &str) -> AgentResult<TurnOutcome> {
        self.guard.reset();
        self.record(Message::user(text))?;
        self.run(LoopState::AwaitingProviderReply).await
    }

    /// Run a turn starting from an assistant message that did not come from the provider
    pub async fn inspect(&mut self, message: Message) -> AgentResult<TurnOutcome> {
        self.guard.reset();
        self.run(LoopState::InspectingMessage(message)).await
    }

    async fn run(&mut self, mut state: LoopState) -> AgentResult<TurnOutcome> {
        let tools = self.registry.describe();
        let mut usage = Usage::default();
        let mut reply = String::new();

        loop {
            state = match state {
                LoopState::AwaitingProviderReply => {
                    debug!(
                        provider = self.provider.name(),
                        model = self.provider.model(),
                        depth = self.guard.depth(),
                        messages = self.conversation.len(),
                        "awaiting provider reply"
                    );
                    self.renderer.show_busy();
                    let result = self
                        .provider
                        .complete(self.conversation.snapshot(), &tools)
                        .await;
                    self.renderer.hide_busy();

                    let (message, round_usage) = result?;
                    usage += &round_usage;
                    LoopState::InspectingMessage(message)
                }
                LoopState::InspectingMessage(message) => {
                    let tool_calls = self.select_tool_calls(&message);
                    reply = message.content.clone();
                    self.record(message)?;

                    if tool_calls.is_empty() {
                        return Ok(self.outcome(reply, usage));
                    }
                    LoopState::ExecutingTools(tool_calls)
                }
                LoopState::ExecutingTools(tool_calls) => {
                    let depth = self.guard.advance().map_err(|e| {
                        warn!(limit = self.guard.limit(), "tool recursion limit reached");
                        e
                    })?;

                    if self.execute_tools(tool_calls, depth).await? == 0 {
                        // nothing to send back, the model's request stays unanswered
                        return Ok(self.outcome(reply, usage));
                    }
                    LoopState::AwaitingProviderReply
                }
            };
        }
    }

    fn select_tool_calls(&self, message: &Message) -> Vec<ToolCallRequest> {
        match self.config.tool_call_mode {
            ToolCallMode::All => message.tool_calls.clone(),
            ToolCallMode::FirstOnly => {
                if message.tool_calls.len() > 1 {
                    debug!(
                        ignored = message.tool_calls.len() - 1,
                        "processing only the first tool call"
                    );
                }
                message.tool_calls.iter().take(1).cloned().collect()
            }
        }
    }

    /// Dispatch each call and append its result, returning how many results were appended
    async fn execute_tools(
        &mut self,
        tool_calls: Vec<ToolCallRequest>,
        depth: usize,
    ) -> AgentResult<usize> {
        let mut answered = 0;

        for call in tool_calls {
            self.renderer.tool_call(&call);
            let output = match self.registry.dispatch(&call.tool_name, &call.arguments).await {
                Ok(output) => {
                    info!(tool = %call.tool_name, depth, "tool call succeeded");
                    output
                }
                Err(ToolError::UnknownTool(name)) => {
                    warn!(tool = %name, id = %call.id, "model requested an unknown tool, skipping");
                    continue;
                }
                Err(error) => {
                    warn!(tool = %call.tool_name, depth, %error, "tool call failed");
                    error.to_string()
                }
            };

            self.record(Message::tool_result(call.id, call.tool_name, output))?;
            answered += 1;
        }

        Ok(answered)
    }

    fn record(&mut self, message: Message) -> AgentResult<()> {
        self.conversation.append(message)?;
        if let Some(message) = self.conversation.last().filter(|m| m.is_displayable()) {
            self.renderer.render(message);
        }
        Ok(())
    }

    fn outcome(&self, reply: String, usage: Usage) -> TurnOutcome {
        TurnOutcome {
            depth: self.guard.depth(),
            reply,
            usage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ProviderError;
    use crate::models::message::Role;
    use crate::models::tool::Tool;
    use crate::providers::mock::MockProvider;
    use crate::tools::cowsay::tests::fake_cowsay;
    use crate::tools::ToolDefinition;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    const SYSTEM: &str = "You are an AI assistant with tool support";
    const JOKE: &str = "Why don't programmers like nature? Too many bugs!";

    #[derive(Clone, Default)]
    struct RecordingRenderer(Arc<Mutex<Vec<String>>>);

    impl Renderer for RecordingRenderer {
        fn render(&mut self, message: &Message) {
            self.0.lock().unwrap().push(message.content.clone());
        }
    }

    fn counting_tool(name: &str, counter: Arc<AtomicUsize>) -> ToolDefinition {
        ToolDefinition::from_fn(Tool::new(name, "counts calls", json!({})), move |_| {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("call {}", n))
        })
    }

    fn tool_call_message(id: &str, name: &str, arguments: Value) -> Message {
        Message::assistant().with_tool_call(id, name, arguments)
    }

    fn agent(provider: &MockProvider, registry: ToolRegistry) -> Agent {
        Agent::new(Box::new(provider.clone()), registry, SYSTEM)
    }

    #[tokio::test]
    async fn test_plain_reply_is_terminal() {
        let provider = MockProvider::new(vec![Message::assistant().with_text("Moo to you too")]);
        let renderer = RecordingRenderer::default();
        let mut agent = agent(&provider, ToolRegistry::new())
            .with_renderer(Box::new(renderer.clone()));

        let outcome = agent.reply("Hello").await.unwrap();

        assert_eq!(outcome.depth, 0);
        assert_eq!(outcome.reply, "Moo to you too");
        assert_eq!(provider.calls(), 1);
        assert_eq!(agent.conversation().len(), 3);
        assert_eq!(*renderer.0.lock().unwrap(), vec!["Hello", "Moo to you too"]);
    }

    #[tokio::test]
    async fn test_tool_round_then_reply() {
        let counter = Arc::new(AtomicUsize::new(0));
        let registry = ToolRegistry::new()
            .with_tool(counting_tool("get_cow_files", counter.clone()))
            .unwrap();
        let provider = MockProvider::new(vec![
            tool_call_message("call_1", "get_cow_files", json!({})),
            Message::assistant().with_text("There is one cow"),
        ]);
        let mut agent = agent(&provider, registry);

        let outcome = agent.reply("Which cows exist?").await.unwrap();

        assert_eq!(outcome.depth, 1);
        assert_eq!(outcome.reply, "There is one cow");
        assert_eq!(outcome.usage.total_tokens, Some(4));
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        let roles: Vec<Role> = agent.conversation().snapshot().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::Tool, Role::Assistant]
        );
        let tool_message = &agent.conversation().snapshot()[3];
        assert_eq!(tool_message.tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(tool_message.content, "call 1");
    }

    #[tokio::test]
    async fn test_recursion_limit() {
        let counter = Arc::new(AtomicUsize::new(0));
        let registry = ToolRegistry::new()
            .with_tool(counting_tool("get_cow_files", counter.clone()))
            .unwrap();
        let ids = Arc::new(AtomicUsize::new(0));
        let provider = MockProvider::new(vec![]).repeat(move || {
            let id = ids.fetch_add(1, Ordering::SeqCst);
            Ok(tool_call_message(&format!("call_{}", id), "get_cow_files", json!({})))
        });
        let mut agent = agent(&provider, registry);

        let error = agent.reply("loop forever").await.unwrap_err();

        assert!(matches!(
            error,
            AgentError::RecursionLimitExceeded { depth: 9, limit: 8 }
        ));
        assert_eq!(counter.load(Ordering::SeqCst), MAX_DEPTH);
        assert_eq!(provider.calls(), MAX_DEPTH + 1);
        // the unanswered ninth request is recorded, no result is fabricated for it
        let last = agent.conversation().last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert!(last.has_tool_calls());
    }

    #[tokio::test]
    async fn test_depth_increases_by_one_per_round() {
        let counter = Arc::new(AtomicUsize::new(0));
        let registry = ToolRegistry::new()
            .with_tool(counting_tool("get_cow_files", counter))
            .unwrap();
        let provider = MockProvider::new(vec![
            tool_call_message("a", "get_cow_files", json!({})),
            tool_call_message("b", "get_cow_files", json!({})),
            tool_call_message("c", "get_cow_files", json!({})),
            Message::assistant().with_text("done"),
        ]);
        let mut agent = agent(&provider, registry);

        let outcome = agent.reply("go").await.unwrap();
        assert_eq!(outcome.depth, 3);

        // a fresh turn starts from zero again
        provider.push(|| Ok(Message::assistant().with_text("again")));
        let outcome = agent.reply("once more").await.unwrap();
        assert_eq!(outcome.depth, 0);
    }

    #[tokio::test]
    async fn test_guard_resets_after_limit() {
        let provider = MockProvider::new(vec![tool_call_message("x", "get_cow_files", json!({}))]);
        let counter = Arc::new(AtomicUsize::new(0));
        let registry = ToolRegistry::new()
            .with_tool(counting_tool("get_cow_files", counter))
            .unwrap();
        let mut agent = agent(&provider, registry).with_config(AgentConfig {
            max_depth: 0,
            ..AgentConfig::default()
        });

        assert!(matches!(
            agent.reply("one").await,
            Err(AgentError::RecursionLimitExceeded { depth: 1, limit: 0 })
        ));

        provider.push(|| Ok(Message::assistant().with_text("plain")));
        let outcome = agent.reply("two").await.unwrap();
        assert_eq!(outcome.depth, 0);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_skipped() {
        let counter = Arc::new(AtomicUsize::new(0));
        let registry = ToolRegistry::new()
            .with_tool(counting_tool("get_cow_files", counter.clone()))
            .unwrap();
        let provider = MockProvider::new(vec![tool_call_message("f", "frobnicate", json!({}))]);
        let mut agent = agent(&provider, registry);

        let outcome = agent.reply("do something odd").await.unwrap();

        assert_eq!(provider.calls(), 1);
        assert_eq!(outcome.depth, 1);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert!(agent
            .conversation()
            .snapshot()
            .iter()
            .all(|m| m.role != Role::Tool));
    }

    #[tokio::test]
    async fn test_unknown_tool_does_not_affect_siblings() {
        let counter = Arc::new(AtomicUsize::new(0));
        let registry = ToolRegistry::new()
            .with_tool(counting_tool("get_cow_files", counter.clone()))
            .unwrap();
        let provider = MockProvider::new(vec![
            Message::assistant()
                .with_tool_call("f", "frobnicate", json!({}))
                .with_tool_call("g", "get_cow_files", json!({})),
            Message::assistant().with_text("listed"),
        ]);
        let mut agent = agent(&provider, registry);

        let outcome = agent.reply("list cows").await.unwrap();

        assert_eq!(outcome.reply, "listed");
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(provider.calls(), 2);
        let tool_messages: Vec<&Message> = agent
            .conversation()
            .snapshot()
            .iter()
            .filter(|m| m.role == Role::Tool)
            .collect();
        assert_eq!(tool_messages.len(), 1);
        assert_eq!(tool_messages[0].tool_call_id.as_deref(), Some("g"));
    }

    #[tokio::test]
    async fn test_first_only_mode() {
        let counter = Arc::new(AtomicUsize::new(0));
        let registry = ToolRegistry::new()
            .with_tool(counting_tool("get_cow_files", counter.clone()))
            .unwrap();
        let provider = MockProvider::new(vec![
            Message::assistant()
                .with_tool_call("1", "get_cow_files", json!({}))
                .with_tool_call("2", "get_cow_files", json!({})),
            Message::assistant().with_text("ok"),
        ]);
        let mut agent = agent(&provider, registry).with_config(AgentConfig {
            tool_call_mode: ToolCallMode::FirstOnly,
            ..AgentConfig::default()
        });

        agent.reply("list").await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalid_argument_becomes_tool_result() {
        let (_dir, cowsay) = fake_cowsay();
        let provider = MockProvider::new(vec![
            tool_call_message("c1", "call_cowsay", json!({"message": ""})),
            Message::assistant().with_text("Sorry, let me try that again."),
        ]);
        let mut agent = agent(&provider, ToolRegistry::with_cowsay(cowsay).unwrap());

        let outcome = agent.reply("Say nothing").await.unwrap();

        assert_eq!(outcome.depth, 1);
        let tool_message = &agent.conversation().snapshot()[3];
        assert_eq!(tool_message.role, Role::Tool);
        assert_eq!(tool_message.tool_name.as_deref(), Some("call_cowsay"));
        assert!(tool_message.content.starts_with("Invalid argument:"));
        // the failure went back to the model
        assert_eq!(provider.snapshots()[1].last(), Some(tool_message));
    }

    #[tokio::test]
    async fn test_joke_scenario() {
        let (_dir, cowsay) = fake_cowsay();
        let provider = MockProvider::new(vec![
            tool_call_message(
                "call_joke",
                "call_cowsay",
                json!({"message": JOKE, "file": "default"}),
            ),
            Message::assistant().with_text("Hope that made you smile!"),
        ]);
        let mut agent = agent(&provider, ToolRegistry::with_cowsay(cowsay).unwrap());

        let outcome = agent.reply("Tell me a joke, use cowsay.").await.unwrap();

        assert_eq!(provider.calls(), 2);
        assert_eq!(outcome.depth, 1);
        let snapshot = agent.conversation().snapshot();
        assert_eq!(snapshot[0], Message::system(SYSTEM));
        assert_eq!(snapshot[1], Message::user("Tell me a joke, use cowsay."));
        assert_eq!(
            snapshot[3],
            Message::tool_result("call_joke", "call_cowsay", format!(" default\n< {} >", JOKE))
        );
    }

    #[tokio::test]
    async fn test_history_is_replayed_unchanged() {
        let counter = Arc::new(AtomicUsize::new(0));
        let registry = ToolRegistry::new()
            .with_tool(counting_tool("get_cow_files", counter))
            .unwrap();
        let provider = MockProvider::new(vec![
            tool_call_message("1", "get_cow_files", json!({})),
            Message::assistant().with_text("first answer"),
            Message::assistant().with_text("second answer"),
        ]);
        let mut agent = agent(&provider, registry);

        agent.reply("first").await.unwrap();
        agent.reply("second").await.unwrap();

        let snapshots = provider.snapshots();
        for pair in snapshots.windows(2) {
            let (earlier, later) = (&pair[0], &pair[1]);
            assert!(later.len() > earlier.len());
            assert_eq!(&later[..earlier.len()], earlier.as_slice());
        }
        let last = snapshots.last().unwrap();
        assert_eq!(
            &agent.conversation().snapshot()[..last.len()],
            last.as_slice()
        );
    }

    #[tokio::test]
    async fn test_transport_error_aborts_turn() {
        let provider = MockProvider::new(vec![]);
        provider.push(|| Err(ProviderError::Api("boom".to_string())));
        provider.push(|| Ok(Message::assistant().with_text("back again")));
        let mut agent = agent(&provider, ToolRegistry::new());

        let error = agent.reply("first").await.unwrap_err();
        assert!(matches!(error, AgentError::Transport(ProviderError::Api(_))));
        assert_eq!(agent.conversation().len(), 2);

        let outcome = agent.reply("second").await.unwrap();
        assert_eq!(outcome.reply, "back again");
    }

    #[tokio::test]
    async fn test_inspect_injected_message() {
        let (_dir, cowsay) = fake_cowsay();
        let provider = MockProvider::new(vec![Message::assistant().with_text("Moo!")]);
        let mut agent = agent(&provider, ToolRegistry::with_cowsay(cowsay).unwrap());

        let injected = tool_call_message("call_test_0", "call_cowsay", json!({"message": "hi"}));
        let outcome = agent.inspect(injected.clone()).await.unwrap();

        assert_eq!(outcome.depth, 1);
        assert_eq!(outcome.reply, "Moo!");
        assert_eq!(provider.calls(), 1);
        assert_eq!(agent.conversation().snapshot()[1], injected);
        assert_eq!(agent.conversation().snapshot()[2].content, " default\n< hi >");
    }

    #[tokio::test]
    async fn test_inspect_without_tool_calls_does_not_query() {
        let provider = MockProvider::new(vec![]);
        let mut agent = agent(&provider, ToolRegistry::new());

        let outcome = agent
            .inspect(Message::assistant().with_text("nothing to do"))
            .await
            .unwrap();

        assert_eq!(outcome.depth, 0);
        assert_eq!(provider.calls(), 0);
    }

    #[test]
    fn test_guard() {
        let mut guard = RecursionGuard::new(2);
        assert_eq!(guard.advance().unwrap(), 1);
        assert_eq!(guard.advance().unwrap(), 2);
        assert!(guard.advance().is_err());
        guard.reset();
        assert_eq!(guard.depth(), 0);
    }
}
