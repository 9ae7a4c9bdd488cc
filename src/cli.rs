use clap::{Parser, Subcommand};
use inquire::Text;
use std::sync::Arc;

use crate::service::chat_service::ChatEngine;

#[derive(Parser)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a single message and print the reply.
    Chat { message: String },
    /// Interactive conversation; the conversation id is kept across turns.
    ChatPrompt {},
}

pub async fn cli(engine: Arc<ChatEngine>, default_user_id: i64) {
    // Fine to panic here
    let cli = Cli::parse();
    match &cli.command {
        Commands::Chat { message } => {
            match engine.handle_turn(default_user_id, message, None).await {
                Ok(outcome) => println!("{}", outcome.reply),
                Err(e) => println!("Failed to handle message: {}", e),
            }
        }
        Commands::ChatPrompt {} => {
            if let Err(e) = chat_loop(engine, default_user_id).await {
                println!("Chat session ended with error: {}", e);
            }
        }
    }
}

async fn chat_loop(
    engine: Arc<ChatEngine>,
    user_id: i64,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut conversation_id: Option<String> = None;
    println!("Terminplaner-Chat. 'exit' beendet die Sitzung.");
    loop {
        let message = Text::new("Du:").prompt()?;
        let trimmed = message.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.eq_ignore_ascii_case("exit") || trimmed.eq_ignore_ascii_case("ende") {
            if let Some(id) = &conversation_id {
                engine.end_conversation(id).await;
            }
            return Ok(());
        }
        let outcome = engine
            .handle_turn(user_id, trimmed, conversation_id.clone())
            .await?;
        conversation_id = Some(outcome.conversation_id.clone());
        if let Some(entry_id) = outcome.created_entry_id {
            println!("[Termin #{} gespeichert]", entry_id);
        }
        println!("Assistent: {}", outcome.reply);
    }
}
