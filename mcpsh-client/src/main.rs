// mcpsh-client/src/main.rs
use clap::Parser;
use std::error::Error;
use tracing_subscriber::EnvFilter;

mod client;
mod complete;
mod dispatch;
mod io;
mod query;
mod repl;

use client::McpClient;

/// Interactive shell for issuing Model Context Protocol operations
/// against a server program, one query line at a time.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the MCP server script (.js or .py)
    server_script: String,
}

type BoxedError = Box<dyn Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxedError> {
    // Diagnostics go to stderr so they never tangle with the prompt;
    // silent unless RUST_LOG says otherwise.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // A connect failure is the one fatal error: report it and exit
    // non-zero before any prompt appears.
    let (client, notifications) = McpClient::connect(&cli.server_script).await?;

    println!("Connected to server");
    println!(
        "Version: {} {}",
        client.server_info().name,
        client.server_info().version
    );
    if let Ok(capabilities) = serde_json::to_string(client.capabilities()) {
        println!("Capabilities: {}", capabilities);
    }
    if let Some(instructions) = client.instructions() {
        println!("Instructions: {}", instructions);
    }

    // The repl owns the client from here on and tears it down before
    // returning, so reaching Ok(()) means cleanup already happened.
    repl::run(client, notifications).await?;

    Ok(())
}
