use clap::{Parser, Subcommand};
use moo::config::{parse_provider, MooConfig};
use moo::providers::factory::ProviderKind;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Provider to talk to (openai or ollama), overrides MOO_PROVIDER
    #[arg(short, long, value_parser = parse_provider)]
    pub provider: Option<ProviderKind>,

    /// Model to use, overrides MOO_MODEL
    #[arg(short, long)]
    pub model: Option<String>,

    /// OpenAI API Key (can also be set via OPENAI_API_KEY environment variable)
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Log provider payloads and agent decisions to stderr
    #[arg(short, long)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Chat with the agent line by line (default)
    Repl,

    /// Run a fixed list of prompts
    Demo,

    /// Dispatch a ready-made cowsay call without asking the provider first
    Test {
        /// Text for the cow to say
        #[arg(default_value = "Hello from the test harness!")]
        message: String,

        /// Cow file to render with
        #[arg(short, long, default_value = "default")]
        file: String,
    },
}

impl Cli {
    /// Flags win over whatever the environment configured
    pub fn apply(&self, mut config: MooConfig) -> MooConfig {
        if let Some(provider) = self.provider {
            config.provider = provider;
        }
        if let Some(model) = &self.model {
            config.model = Some(model.clone());
        }
        config.debug |= self.debug;
        config
    }

    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Repl)
    }
}
