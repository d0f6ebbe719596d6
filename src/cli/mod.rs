use clap::{ Parser, Subcommand };
use std::net::SocketAddr;
use std::sync::Arc;

use crate::client::DEFAULT_RELAY_URL;
use crate::llm::{ EnvCredential, UpstreamConfig, DEFAULT_API_KEY_ENV, DEFAULT_CHAT_MODEL, DEFAULT_UPSTREAM_URL };
use crate::relay::DEFAULT_BUFFER;
use crate::server::TlsPaths;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the streaming relay HTTP server. A malformed conversation is answered
    /// with 400, every other failure with a generic 500.
    Serve(ServeArgs),
    /// Chat with a running relay from the terminal.
    Chat(ChatArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct ServeArgs {
    // --- Server Args ---
    /// Host address and port for the relay to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:3000")]
    pub server_addr: SocketAddr,

    /// Optional path to the TLS certificate file (PEM format). Requires --tls-key-path.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Optional path to the TLS private key file (PEM format). Requires --tls-cert-path.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,

    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,

    // --- Upstream Args ---
    /// Chat completions endpoint the relay forwards to.
    #[arg(long, env = "UPSTREAM_URL", default_value = DEFAULT_UPSTREAM_URL)]
    pub upstream_url: String,

    /// Model identifier sent with every upstream request.
    #[arg(long, env = "CHAT_MODEL", default_value = DEFAULT_CHAT_MODEL)]
    pub chat_model: String,

    /// Name of the environment variable holding the upstream API key.
    /// The key itself is read on every request and is never accepted as a flag.
    #[arg(long, env = "API_KEY_ENV", default_value = DEFAULT_API_KEY_ENV)]
    pub api_key_env: String,

    /// Value for the upstream X-Title attribution header. Empty disables it.
    #[arg(long, env = "APP_TITLE", default_value = "Headstarter Chatbot")]
    pub app_title: String,

    // --- Relay Args ---
    /// Optional file replacing the built-in system prompt.
    #[arg(long, env = "SYSTEM_PROMPT_PATH")]
    pub system_prompt_path: Option<String>,

    /// Chunks buffered between the upstream reader and the caller before
    /// upstream reads are suspended.
    #[arg(long, env = "RELAY_BUFFER", default_value_t = DEFAULT_BUFFER)]
    pub relay_buffer: usize,
}

impl ServeArgs {
    pub fn upstream_config(&self) -> UpstreamConfig {
        UpstreamConfig::new(self.upstream_url.clone(), Arc::new(EnvCredential::new(self.api_key_env.clone())))
            .with_model(self.chat_model.clone())
            .with_title(Some(self.app_title.clone()))
    }

    pub fn tls(&self) -> Result<Option<TlsPaths>, String> {
        if !self.enable_tls {
            return Ok(None);
        }
        match (&self.tls_cert_path, &self.tls_key_path) {
            (Some(cert_path), Some(key_path)) =>
                Ok(
                    Some(TlsPaths {
                        cert_path: cert_path.clone(),
                        key_path: key_path.clone(),
                    })
                ),
            (Some(_), None) | (None, Some(_)) => {
                Err("Both --tls-cert-path and --tls-key-path must be provided to enable TLS.".into())
            }
            (None, None) => Err("--enable-tls was set but no certificate/key paths provided.".into()),
        }
    }
}

#[derive(clap::Args, Debug, Clone)]
pub struct ChatArgs {
    /// Relay chat endpoint.
    #[arg(long, env = "RELAY_URL", default_value = DEFAULT_RELAY_URL)]
    pub relay_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn serve_args(extra: &[&str]) -> ServeArgs {
        let mut argv = vec!["chat-relay", "serve"];
        argv.extend_from_slice(extra);
        match Args::try_parse_from(argv).unwrap().command {
            Command::Serve(args) => args,
            other => panic!("expected serve, got {:?}", other),
        }
    }

    #[test]
    fn serve_overrides_apply() {
        let args = serve_args(&[
            "--upstream-url",
            "http://localhost:9999/v1/chat/completions",
            "--chat-model",
            "local-model",
            "--relay-buffer",
            "4",
            "--app-title",
            "",
        ]);
        let config = args.upstream_config();

        assert_eq!(config.url, "http://localhost:9999/v1/chat/completions");
        assert_eq!(config.model, "local-model");
        assert_eq!(config.title, None);
        assert_eq!(args.relay_buffer, 4);
    }

    #[test]
    fn tls_requires_both_paths() {
        assert!(serve_args(&["--enable-tls", "--tls-cert-path", "cert.pem"]).tls().is_err());
        assert!(serve_args(&["--enable-tls"]).tls().is_err());
        assert!(serve_args(&["--tls-cert-path", "cert.pem"]).tls().unwrap().is_none());

        let tls = serve_args(&["--enable-tls", "--tls-cert-path", "c.pem", "--tls-key-path", "k.pem"])
            .tls()
            .unwrap()
            .unwrap();
        assert_eq!(tls.cert_path, "c.pem");
        assert_eq!(tls.key_path, "k.pem");
    }

    #[test]
    fn serve_help_lists_failure_statuses() {
        let err = Args::try_parse_from(["chat-relay", "serve", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
        let help = err.to_string();
        assert!(help.contains("400"), "{}", help);
        assert!(help.contains("500"), "{}", help);
    }

    #[test]
    fn chat_subcommand_parses_relay_url() {
        let args = Args::try_parse_from(["chat-relay", "chat", "--relay-url", "http://relay:8080/api/chat"]).unwrap();
        match args.command {
            Command::Chat(chat) => assert_eq!(chat.relay_url, "http://relay:8080/api/chat"),
            other => panic!("expected chat, got {:?}", other),
        }
    }
}
