use std::error::Error;
use std::io::Write;
use log::info;
use tokio::io::{ AsyncBufReadExt, BufReader };

use super::{ ChatSession, ReplyError, FALLBACK_REPLY };

const TYPING: &str = "assistant is typing...";

/// Line-oriented chat against a running relay. Empty lines are ignored;
/// `/quit` or end of input leaves.
pub async fn run(relay_url: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("Chatting through relay at {}", relay_url);
    let mut session = ChatSession::new(relay_url);
    for message in session.history() {
        println!("{}: {}", message.role, message.content);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("you: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line == "/quit" {
            break;
        }
        if line.is_empty() {
            continue;
        }

        eprint!("{}", TYPING);
        let result = session.send(line).await;
        eprint!("\r{}\r", " ".repeat(TYPING.len()));

        match result {
            Ok(reply) => println!("{}: {}", reply.role, reply.content),
            Err(ReplyError::EmptyMessage) => {}
            Err(_) => println!("assistant: {}", FALLBACK_REPLY),
        }
    }
    Ok(())
}
