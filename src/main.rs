#![allow(non_snake_case)]

mod cli;
mod clients;
mod config;
mod error;
mod extract;
mod models;
mod runtime;
mod service;
mod store;

use std::env;
use std::sync::Arc;

use crate::clients::lm_client::LmStudioClient;
use crate::config::AppConfig;
use crate::service::chat_service::ChatEngine;
use crate::store::memory::MemoryStore;
use crate::store::ConversationStore;

const DEFAULT_RUN_MODE: &str = "cli";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = match env::var("CONFIG_FILE") {
        Ok(path) => AppConfig::from_file(&path).unwrap_or_default(),
        Err(_) => AppConfig::default(),
    };

    let completion = Arc::new(LmStudioClient::new(
        config.lm_studio_url(),
        config.lm_studio_api_key(),
        config.lm_studio_model(),
    ));
    let engine = Arc::new(ChatEngine::new(
        Arc::new(MemoryStore::new()),
        Arc::new(ConversationStore::new()),
        completion,
    ));

    let run_mode = config.run_mode();
    if run_mode == "api" {
        runtime::run_api(engine, config.bind_port(), config.default_user_id()).await;
    } else if run_mode == DEFAULT_RUN_MODE {
        cli::cli(engine, config.default_user_id()).await;
    } else {
        println!("Invalid run mode {}", run_mode);
    }
}
