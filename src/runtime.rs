//! HTTP surface. One route per engine operation; the engine itself is
//! shared behind an `Arc` across requests.

use std::convert::Infallible;
use std::sync::Arc;

use chrono::Local;
use serde::{Deserialize, Serialize};
use warp::http::StatusCode;
use warp::Filter;

use crate::extract;
use crate::service::chat_service::ChatEngine;
use crate::service::intent::Intent;

#[derive(Debug, Deserialize)]
struct ChatRequest {
    prompt: String,
    conversation_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    response: String,
    conversation_id: String,
    auto_created_task_id: Option<i64>,
    intent: Intent,
}

#[derive(Debug, Deserialize)]
struct ParseRequest {
    text: String,
}

pub async fn run_api(engine: Arc<ChatEngine>, bind_port: u16, default_user_id: i64) {
    let with_engine = {
        let engine = engine.clone();
        warp::any().map(move || engine.clone())
    };

    let chat = warp::path("chat")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::json())
        .and(warp::header::optional::<i64>("x-user-id"))
        .and(with_engine.clone())
        .and_then(move |request, user_id: Option<i64>, engine| {
            handle_chat(request, user_id.unwrap_or(default_user_id), engine)
        });

    let end_conversation = warp::path!("chat" / String)
        .and(warp::delete())
        .and(with_engine)
        .and_then(handle_end_conversation);

    let parse = warp::path("parse")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::json())
        .map(|request: ParseRequest| {
            let candidate = extract::extract(&request.text, Local::now().naive_local());
            warp::reply::json(&candidate)
        });

    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .map(|| warp::reply::json(&serde_json::json!({ "status": "ok" })));

    let routes = chat.or(end_conversation).or(parse).or(health);

    tracing::info!(port = bind_port, "api listening");
    warp::serve(routes).run(([0, 0, 0, 0], bind_port)).await;
}

async fn handle_chat(
    request: ChatRequest,
    user_id: i64,
    engine: Arc<ChatEngine>,
) -> Result<impl warp::Reply, Infallible> {
    match engine
        .handle_turn(user_id, &request.prompt, request.conversation_id)
        .await
    {
        Ok(outcome) => Ok(warp::reply::with_status(
            warp::reply::json(&ChatResponse {
                response: outcome.reply,
                conversation_id: outcome.conversation_id,
                auto_created_task_id: outcome.created_entry_id,
                intent: outcome.intent,
            }),
            StatusCode::OK,
        )),
        Err(err) => {
            tracing::error!(error = %err, "chat turn failed");
            Ok(warp::reply::with_status(
                warp::reply::json(&serde_json::json!({ "detail": err.to_string() })),
                StatusCode::INTERNAL_SERVER_ERROR,
            ))
        }
    }
}

async fn handle_end_conversation(
    conversation_id: String,
    engine: Arc<ChatEngine>,
) -> Result<impl warp::Reply, Infallible> {
    engine.end_conversation(&conversation_id).await;
    Ok(StatusCode::NO_CONTENT)
}
