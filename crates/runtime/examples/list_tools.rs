//! Connect to a tool host, list its tools, and optionally call one.
//!
//! Run with: cargo run --example list_tools -- uv run research_server.py
//!
//! Set `TOOL_CALL=name` and `TOOL_ARGS='{"topic":"rust"}'` to invoke a tool.

use mcp::ServerConfig;
use runtime::{FunctionCallIntent, SessionBridge, ToolRegistry, invoke};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);
    let command = argv.next().ok_or("usage: list_tools <command> [args...]")?;
    let config = ServerConfig::new(command, argv);

    println!("Spawning tool host: {} {:?}", config.command, config.args);
    let bridge = SessionBridge::connect(config).await?;

    let mut registry = ToolRegistry::new();
    let bound = bridge.register_into(&mut registry);
    println!("\nDiscovered {} tools ({bound} usable):", bridge.tools().len());
    for tool in registry.describe_all() {
        println!("  - {}", tool.name);
        if !tool.description.is_empty() {
            println!("    {}", tool.description);
        }
    }

    if let Ok(name) = std::env::var("TOOL_CALL") {
        let args = std::env::var("TOOL_ARGS").unwrap_or_else(|_| "{}".into());
        let arguments = serde_json::from_str(&args)?;
        let result = invoke(&FunctionCallIntent::new(name, arguments), &registry).await;
        match result {
            Ok(r) => println!("\nResult:\n{r}"),
            Err(e) => println!("\nError: {e}"),
        }
    }

    bridge.close().await?;
    println!("\nDone!");
    Ok(())
}
