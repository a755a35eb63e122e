use anyhow::Result;
use chat_core::{load_settings, SessionContext, TokenExchangeClient};
use clap::Parser;

#[derive(Parser, Debug)]
struct Args {
    /// Base URL of the credential exchange service.
    #[arg(long)]
    auth_url: String,
    #[arg(long)]
    username: String,
    #[arg(long)]
    password: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let args = Args::parse();

    let exchange = TokenExchangeClient::new(args.auth_url);
    let grant = exchange.exchange(&args.username, &args.password).await?;
    let session = SessionContext::from_grant(&grant);
    println!("Logged in as {}", session.identity);

    let settings = load_settings();
    println!(
        "Join policy: gate_on_message_count={} rename_from_author_number={}",
        settings.gate_on_message_count, settings.rename_from_author_number
    );

    println!("Desired conversations ({}):", grant.conversations.len());
    for conversation in &grant.conversations {
        println!("  {}", serde_json::to_string(conversation)?);
    }

    println!("Messaging SDK connection and reconciliation run from the UI shell.");

    Ok(())
}
