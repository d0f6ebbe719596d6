pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod llm;
pub mod models;
pub mod relay;
pub mod server;

use cli::{ Args, ChatArgs, Command, ServeArgs };
use config::prompt::load_system_prompt;
use llm::chat::OpenRouterChatClient;
use log::{ info, warn };
use relay::Relay;
use server::Server;
use std::error::Error;
use std::sync::Arc;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    match args.command {
        Command::Serve(serve_args) => serve(serve_args).await,
        Command::Chat(chat_args) => chat(chat_args).await,
    }
}

async fn serve(args: ServeArgs) -> Result<(), Box<dyn Error + Send + Sync>> {
    let tls = args.tls()?;
    let upstream = args.upstream_config();

    info!("--- Relay Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("TLS Enabled: {}", tls.is_some());
    info!("Upstream URL: {}", upstream.url);
    info!("Chat Model: {}", upstream.model);
    info!("Credential Variable: {}", args.api_key_env);
    info!("App Title: {}", upstream.title.as_deref().unwrap_or("(none)"));
    info!("System Prompt: {}", args.system_prompt_path.as_deref().unwrap_or("built-in"));
    info!("Relay Buffer: {} chunk(s)", args.relay_buffer);
    info!("---------------------------");

    if upstream.credentials.bearer_token().is_none() {
        warn!(
            "Credential variable '{}' is not set; requests will fail until it is.",
            args.api_key_env
        );
    }

    let system_prompt = load_system_prompt(args.system_prompt_path.as_deref())?;
    let client = OpenRouterChatClient::new(upstream)?;
    let relay = Arc::new(Relay::new(client, system_prompt, args.relay_buffer));

    let server = Server::new(args.server_addr, relay, tls);
    server.run().await?;

    Ok(())
}

async fn chat(args: ChatArgs) -> Result<(), Box<dyn Error + Send + Sync>> {
    client::repl::run(&args.relay_url).await
}
