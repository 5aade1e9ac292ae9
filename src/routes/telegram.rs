use axum::{extract::State, Json};

use crate::error::{Error, Result};
use crate::models::question::QuestionView;
use crate::services::retry_service::RetryOutcome;
use crate::services::session_service::{AnswerOutcome, QuestionPrompt};
use crate::AppState;
use serde::Deserialize;
use std::sync::OnceLock;

static HTTP_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

/// One connection pool for all outgoing Bot API calls.
fn http_client() -> &'static reqwest::Client {
    HTTP_CLIENT.get_or_init(reqwest::Client::new)
}

#[derive(Debug, Deserialize)]
pub struct TelegramUpdate {
    pub update_id: i64,
    pub message: Option<TelegramMessage>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramMessage {
    pub message_id: i64,
    pub from: TelegramUser,
    pub chat: TelegramChat,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    pub is_bot: bool,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
    pub r#type: String,
}

/// Entry point for bot traffic. Always answers 200 so Telegram does not
/// redeliver the update; failures are reported to the participant in chat.
pub async fn handle_webhook(
    State(state): State<AppState>,
    Json(update): Json<TelegramUpdate>,
) -> Result<impl axum::response::IntoResponse> {
    tracing::info!("Received Telegram webhook update ID: {}", update.update_id);

    if let Some(message) = update.message {
        if message.from.is_bot {
            return Ok(axum::http::StatusCode::OK);
        }
        if let Some(text) = message.text.clone() {
            let chat_id = message.chat.id;
            if let Err(e) = route_message(&state, &message, text.trim()).await {
                match &e {
                    Error::Database(_) | Error::Internal(_) => {
                        tracing::error!("Webhook handling failed: {:?}", e);
                        let _ = send_telegram_message(
                            chat_id,
                            "Something went wrong. Please try again later.",
                            None,
                        )
                        .await;
                    }
                    // Domain errors carry participant-facing text.
                    _ => {
                        let _ = send_telegram_message(chat_id, &e.to_string(), None).await;
                    }
                }
            }
        }
    }

    Ok(axum::http::StatusCode::OK)
}

async fn route_message(state: &AppState, message: &TelegramMessage, text: &str) -> Result<()> {
    let chat_id = message.chat.id;
    let participant = state
        .participant_service
        .get_or_create(
            message.from.id,
            message.from.username.as_deref(),
            Some(&message.from.first_name),
            message.from.last_name.as_deref(),
        )
        .await?;

    if text.starts_with("/start") {
        let names = state.quiz_service.list_public_quiz_names().await?;
        let greeting = format!(
            "Hello, {}! Send a quiz name to begin, or /continue to pick up where you left off.",
            participant.display_name()
        );
        let markup = (!names.is_empty()).then(|| name_keyboard(&names));
        send_telegram_message(chat_id, &greeting, markup).await?;
        return Ok(());
    }

    if text.starts_with("/continue") {
        let resumed = state.session_service.resume(participant.id).await?;
        let header = format!("Resuming quiz '{}'", resumed.quiz_name);
        send_question(chat_id, &header, &resumed.prompt).await?;
        return Ok(());
    }

    // Free text: an answer if something is awaiting one, otherwise the name
    // of a quiz to start. Starting a retry leaves any unfinished attempt's
    // session intact (it stays resumable), so both flows can be live at
    // once; the retry flow takes priority while it expects an answer and
    // free text reaches the main session again once the retry completes or
    // is cleared. Starting a quiz clears retry sessions, not vice versa.
    let retry = state.retry_service.status(participant.id).await?;
    if retry.active && retry.expecting_answer {
        match state.retry_service.submit_answer(participant.id, text).await? {
            RetryOutcome::Feedback { feedback, next } => {
                send_question(chat_id, &feedback, &next).await?;
            }
            RetryOutcome::Completed {
                feedback,
                score,
                total_questions,
            } => {
                let summary = format!(
                    "{}\nRetry complete! You got {} out of {}.",
                    feedback, score, total_questions
                );
                send_telegram_message(chat_id, &summary, None).await?;
            }
        }
        return Ok(());
    }

    match state.session_service.submit_answer(participant.id, text).await {
        Ok(AnswerOutcome::Feedback { feedback, next }) => {
            send_question(chat_id, &feedback, &next).await?;
        }
        Ok(AnswerOutcome::Completed {
            feedback,
            score,
            total_questions,
            ..
        }) => {
            let summary = format!(
                "{}\nQuiz complete! You scored {} out of {}.",
                feedback, score, total_questions
            );
            send_telegram_message(chat_id, &summary, None).await?;
        }
        Err(Error::NotFound(_)) => {
            // No session in flight; the text names a quiz to start.
            let started = state.session_service.start_quiz(participant.id, text).await?;
            let header = format!("Starting quiz '{}'. Good luck!", started.quiz_name);
            send_question(chat_id, &header, &started.prompt).await?;
        }
        Err(e) => return Err(e),
    }

    Ok(())
}

async fn send_question(chat_id: i64, header: &str, prompt: &QuestionPrompt) -> Result<()> {
    let body = format!(
        "{}\n\nQuestion {} ({})\n{}",
        header,
        prompt.question.number,
        prompt.progress,
        question_body(&prompt.question)
    );
    send_telegram_message(chat_id, &body, Some(option_keyboard(&prompt.question))).await
}

fn question_body(question: &QuestionView) -> String {
    let mut body = question.text.clone();
    for option in &question.options {
        body.push('\n');
        body.push_str(option);
    }
    body
}

/// One option per keyboard row, blank options already filtered out of the
/// view. One-time so the keyboard collapses once the participant answers.
fn option_keyboard(question: &QuestionView) -> serde_json::Value {
    let rows: Vec<Vec<serde_json::Value>> = question
        .options
        .iter()
        .map(|opt| vec![serde_json::json!({ "text": opt })])
        .collect();
    serde_json::json!({
        "keyboard": rows,
        "resize_keyboard": true,
        "one_time_keyboard": true,
    })
}

fn name_keyboard(names: &[String]) -> serde_json::Value {
    let rows: Vec<Vec<serde_json::Value>> = names
        .iter()
        .map(|name| vec![serde_json::json!({ "text": name })])
        .collect();
    serde_json::json!({
        "keyboard": rows,
        "resize_keyboard": true,
        "one_time_keyboard": true,
    })
}

async fn send_telegram_message(
    chat_id: i64,
    text: &str,
    reply_markup: Option<serde_json::Value>,
) -> Result<()> {
    let config = crate::config::get_config();
    let url = format!(
        "https://api.telegram.org/bot{}/sendMessage",
        config.telegram_bot_token
    );

    let mut body = serde_json::json!({
        "chat_id": chat_id,
        "text": text,
    });
    if let Some(markup) = reply_markup {
        body["reply_markup"] = markup;
    }

    let response = http_client()
        .post(&url)
        .json(&body)
        .send()
        .await
        .map_err(|e| Error::Internal(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let response_text = response.text().await.unwrap_or_default();
        tracing::warn!("Telegram API error: {} - {}", status, response_text);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_text_update() {
        let payload = serde_json::json!({
            "update_id": 42,
            "message": {
                "message_id": 7,
                "from": {
                    "id": 1001,
                    "is_bot": false,
                    "first_name": "Ada",
                    "username": "ada"
                },
                "chat": { "id": 1001, "type": "private" },
                "text": "/start"
            }
        });
        let update: TelegramUpdate = serde_json::from_value(payload).unwrap();
        let message = update.message.unwrap();
        assert_eq!(message.from.id, 1001);
        assert_eq!(message.text.as_deref(), Some("/start"));
    }

    #[test]
    fn outbound_client_is_shared() {
        assert!(std::ptr::eq(http_client(), http_client()));
    }

    #[test]
    fn option_keyboard_has_one_row_per_option() {
        let view = QuestionView {
            number: "1".to_string(),
            text: "Q?".to_string(),
            options: vec!["A: yes".to_string(), "B: no".to_string()],
        };
        let markup = option_keyboard(&view);
        assert_eq!(markup["keyboard"].as_array().unwrap().len(), 2);
        assert_eq!(markup["keyboard"][1][0]["text"], "B: no");
    }
}
