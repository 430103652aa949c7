//! Health assistant chat handlers.

use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::{info, warn};

use carebridge_assistant::{ClinicalContext, LlmMessage};
use carebridge_persistence::AppStorage;
use carebridge_persistence::types::{ChatMessage, ChatRole, NewChatMessage};

use crate::error::{RestError, RestResult};
use crate::extractors::{ValidJson, ValidQuery};
use crate::handlers::fhir::session_bundle;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatQuery {
    pub session_id: Option<String>,
}

/// Body of `POST /api/chat/messages`.
#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub message: String,
}

fn to_llm(message: &ChatMessage) -> LlmMessage {
    match message.role {
        ChatRole::User => LlmMessage::user(&message.content),
        ChatRole::Assistant => LlmMessage::assistant(&message.content),
        ChatRole::System => LlmMessage::system(&message.content),
    }
}

/// `GET /api/chat/messages[?sessionId=]`
pub async fn list_messages_handler<S>(
    State(state): State<AppState<S>>,
    ValidQuery(query): ValidQuery<ChatQuery>,
) -> RestResult<Response>
where
    S: AppStorage + 'static,
{
    let messages = state
        .storage()
        .list_messages(query.session_id.as_deref())
        .await?;
    Ok(Json(messages).into_response())
}

/// `POST /api/chat/messages`
///
/// Answers a question, using the connected patient's record as context when
/// a provider is connected. The question and the reply are stored only when
/// the model answers.
///
/// # Response
///
/// - `200 OK` - `{ "question": ChatMessage, "answer": ChatMessage }`
/// - `503 Service Unavailable` - no model configured, or the model failed
pub async fn ask_handler<S>(
    State(state): State<AppState<S>>,
    ValidJson(request): ValidJson<AskRequest>,
) -> RestResult<Response>
where
    S: AppStorage + 'static,
{
    let question = request.message.trim();
    if question.is_empty() {
        return Err(RestError::invalid("message", "message is required"));
    }
    if !state.assistant().is_configured() {
        return Err(carebridge_assistant::AssistantError::NotConfigured.into());
    }

    let session = state.storage().current_session().await?;
    let session_id = session.as_ref().map(|s| s.id.clone());

    let context = match &session {
        Some(session) => match session_bundle(&state, session).await {
            Ok(bundle) => Some(ClinicalContext::from_bundle(&bundle)),
            Err(e) => {
                warn!(session_id = %session.id, error = %e, "Answering without the patient record");
                None
            }
        },
        None => None,
    };

    // Without a session, only earlier sessionless messages count as history.
    let history: Vec<LlmMessage> = state
        .storage()
        .list_messages(session_id.as_deref())
        .await?
        .iter()
        .filter(|m| m.session_id == session_id)
        .map(to_llm)
        .collect();

    let reply = state
        .assistant()
        .answer(question, &history, context.as_ref())
        .await?;

    let question = state
        .storage()
        .add_message(NewChatMessage {
            session_id: session_id.clone(),
            role: ChatRole::User,
            content: question.to_string(),
        })
        .await?;
    let answer = state
        .storage()
        .add_message(NewChatMessage {
            session_id,
            role: ChatRole::Assistant,
            content: reply,
        })
        .await?;

    info!(has_record = context.is_some(), "Chat question answered");

    Ok(Json(serde_json::json!({
        "question": question,
        "answer": answer
    }))
    .into_response())
}

/// `DELETE /api/chat/messages`
pub async fn clear_messages_handler<S>(State(state): State<AppState<S>>) -> RestResult<Response>
where
    S: AppStorage + 'static,
{
    let deleted = state.storage().clear_messages().await?;
    info!(deleted, "Chat history cleared");
    Ok(Json(serde_json::json!({ "deleted": deleted })).into_response())
}
