mod config;
mod error;

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use research::ResearchConfig;
use runtime::{
    Arguments, FunctionCallIntent, GeminiGateway, Session, SessionBridge, ToolRegistry, invoke,
};
use serde_json::Value;
use tokio::io::BufReader;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use config::Config;
use error::{Error, Result};

const CONFIG_FILE: &str = "toolchat.toml";

#[derive(Parser)]
#[command(name = "toolchat")]
#[command(about = "Chat with a model that can call local or hosted tools", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the config file
    #[arg(short, long, global = true, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat session
    Chat,
    /// List the tools the model would see
    Tools,
    /// Invoke one tool directly, without the model
    Call {
        /// Tool name
        name: String,
        /// Arguments as a JSON object
        #[arg(default_value = "{}")]
        args: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // Exit explicitly: a pending stdin read would otherwise hold the runtime open.
    let code = match run(cli).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {e}");
            1
        }
    };
    std::process::exit(code);
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    if let Err(e) = dotenvy::dotenv()
        && !e.not_found()
    {
        warn!(error = %e, "ignoring unreadable .env file");
    }
    let config = Config::load_or_default(&cli.config)?;

    match cli.command {
        Some(Commands::Chat) | None => cmd_chat(&config, &cli.config).await,
        Some(Commands::Tools) => cmd_tools(&config).await,
        Some(Commands::Call { name, args }) => cmd_call(&config, &name, &args).await,
    }
}

/// Tools available to a session: either the local research tools or
/// everything a tool host advertises.
enum Toolset {
    Local(ToolRegistry),
    Remote(SessionBridge),
}

impl Toolset {
    async fn open(config: &Config) -> Result<Self> {
        match &config.tool_host {
            Some(host) => {
                let bridge = SessionBridge::connect(host.server_config()).await?;
                Ok(Self::Remote(bridge))
            }
            None => {
                let mut registry = ToolRegistry::new();
                research::register_all(&mut registry, &ResearchConfig::from(&config.research))?;
                Ok(Self::Local(registry))
            }
        }
    }

    fn into_session(self, gateway: GeminiGateway) -> Session<GeminiGateway> {
        match self {
            Self::Local(registry) => Session::new(gateway, registry),
            Self::Remote(bridge) => Session::new(gateway, ToolRegistry::new()).with_bridge(bridge),
        }
    }

    /// Run `f` against the registry, closing the tool host afterwards.
    async fn with_registry<T>(
        self,
        f: impl AsyncFnOnce(&ToolRegistry) -> Result<T>,
    ) -> Result<T> {
        match self {
            Self::Local(registry) => f(&registry).await,
            Self::Remote(bridge) => {
                let mut registry = ToolRegistry::new();
                bridge.register_into(&mut registry);
                let outcome = f(&registry).await;
                bridge.close().await?;
                outcome
            }
        }
    }
}

async fn cmd_chat(config: &Config, config_path: &Path) -> Result<()> {
    let api_key = config.api_key().ok_or_else(|| Error::MissingApiKey {
        config: config_path.display().to_string(),
    })?;
    let gateway = GeminiGateway::builder(api_key)
        .model(&config.backend.model)
        .base_url(&config.backend.base_url)
        .build();

    println!("toolchat v{}", env!("CARGO_PKG_VERSION"));
    println!("Model: {}", gateway.model());

    let mut session = Toolset::open(config).await?.into_session(gateway);
    match session.bridge() {
        Some(bridge) => println!(
            "Connected to {} with tools: {}",
            bridge.name(),
            tool_list(session.registry())
        ),
        None => println!("Tools: {}", tool_list(session.registry())),
    }

    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = io::stdout();

    let outcome = tokio::select! {
        result = session.run(stdin, &mut stdout) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted");
            Ok(())
        }
    };
    let closed = session.close().await;

    outcome?;
    closed?;
    println!();
    Ok(())
}

async fn cmd_tools(config: &Config) -> Result<()> {
    Toolset::open(config)
        .await?
        .with_registry(async |registry| {
            if registry.is_empty() {
                println!("No tools available.");
                return Ok(());
            }
            write_tools(registry, &mut io::stdout())
        })
        .await
}

async fn cmd_call(config: &Config, name: &str, args: &str) -> Result<()> {
    let arguments = parse_arguments(args)?;
    let intent = FunctionCallIntent::new(name, arguments);

    Toolset::open(config)
        .await?
        .with_registry(async |registry| {
            let result = invoke(&intent, registry).await?;
            println!("{result}");
            Ok(())
        })
        .await
}

fn write_tools(registry: &ToolRegistry, out: &mut impl Write) -> Result<()> {
    for tool in registry.describe_all() {
        writeln!(out, "{}", tool.name)?;
        if !tool.description.is_empty() {
            writeln!(out, "  {}", tool.description)?;
        }
        let required = tool.required();
        if !required.is_empty() {
            writeln!(out, "  required: {}", required.join(", "))?;
        }
        let schema = serde_json::to_string_pretty(&tool.parameter_schema)
            .unwrap_or_else(|_| tool.parameter_schema.to_string());
        for line in schema.lines() {
            writeln!(out, "  {line}")?;
        }
    }
    Ok(())
}

fn parse_arguments(args: &str) -> Result<Arguments> {
    match serde_json::from_str(args) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(Error::Arguments(format!("got {other}"))),
        Err(e) => Err(Error::Arguments(e.to_string())),
    }
}

fn tool_list(registry: &ToolRegistry) -> String {
    let names: Vec<&str> = registry.names().collect();
    if names.is_empty() {
        "none".to_string()
    } else {
        names.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_arguments_must_be_an_object() {
        let args = parse_arguments(r#"{"topic": "rust"}"#).unwrap();
        assert_eq!(args.get("topic"), Some(&Value::from("rust")));

        assert!(matches!(parse_arguments("[1]"), Err(Error::Arguments(_))));
        assert!(matches!(parse_arguments("{"), Err(Error::Arguments(_))));
    }

    #[test]
    fn cli_defaults_to_chat() {
        let cli = Cli::try_parse_from(["toolchat"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.config, PathBuf::from(CONFIG_FILE));

        let cli = Cli::try_parse_from(["toolchat", "call", "extract_info", "-v"]).unwrap();
        assert!(cli.verbose);
        let Some(Commands::Call { name, args }) = cli.command else {
            panic!("expected call");
        };
        assert_eq!(name, "extract_info");
        assert_eq!(args, "{}");
    }

    #[tokio::test]
    async fn tool_listing_shows_required_parameters() {
        let toolset = Toolset::open(&Config::default()).await.unwrap();
        let listing = toolset
            .with_registry(async |registry| {
                let mut out = Vec::new();
                write_tools(registry, &mut out)?;
                Ok(String::from_utf8_lossy(&out).into_owned())
            })
            .await
            .unwrap();
        assert!(
            listing.starts_with("search_papers\n  Search for papers on arXiv\n  required: topic\n"),
            "{listing}"
        );
        assert!(listing.contains("extract_info\n"), "{listing}");
        assert!(listing.contains("  required: paper_id\n"), "{listing}");
    }

    #[tokio::test]
    async fn local_toolset_lists_research_tools() {
        let toolset = Toolset::open(&Config::default()).await.unwrap();
        let names = toolset
            .with_registry(async |registry| Ok(tool_list(registry)))
            .await
            .unwrap();
        assert_eq!(names, "search_papers, extract_info");
    }
}
