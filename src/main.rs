use axum::{
    routing::{get, post},
    Router,
};
use quiz_backend::{
    config::{get_config, init_config},
    database::pool::create_pool,
    routes, AppState,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();
    init_config()?;
    let config = get_config();

    let pool = create_pool().await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let app_state = AppState::new(pool);

    {
        let bot_token = config.telegram_bot_token.clone();
        let target_webhook_url = format!("{}/api/webhook/telegram", config.webapp_url);

        info!("Checking Telegram webhook status...");

        match reqwest::get(format!(
            "https://api.telegram.org/bot{}/getWebhookInfo",
            bot_token
        ))
        .await
        {
            Ok(resp) => {
                if let Ok(info) = resp.json::<serde_json::Value>().await {
                    let current_url = info["result"]["url"].as_str().unwrap_or("");

                    if current_url == target_webhook_url {
                        info!("Telegram webhook is already up to date: {}", current_url);
                    } else {
                        info!(
                            "Updating Telegram webhook: {} -> {}",
                            current_url, target_webhook_url
                        );
                        let set_url = format!(
                            "https://api.telegram.org/bot{}/setWebhook?url={}",
                            bot_token, target_webhook_url
                        );
                        if let Ok(set_resp) = reqwest::get(&set_url).await {
                            if set_resp.status().is_success() {
                                info!("Telegram webhook registered successfully");
                            } else {
                                tracing::warn!(
                                    "Failed to register Telegram webhook: {:?}",
                                    set_resp.status()
                                );
                            }
                        }
                    }
                }
            }
            Err(e) => tracing::warn!("Could not check Telegram webhook status: {:?}", e),
        }
    }

    let base_routes = Router::new().route("/health", get(routes::health::health));

    let public_api = Router::new()
        .route("/api/quiz/quizzes", get(routes::quiz_routes::list_quizzes))
        .route("/api/quiz", post(routes::quiz_routes::create_quiz))
        .route(
            "/api/quiz/:id/access",
            post(routes::quiz_routes::grant_access),
        )
        .route(
            "/api/quiz/participated",
            get(routes::quiz_routes::list_participated),
        )
        .route("/api/session/start", post(routes::session_routes::start_quiz))
        .route(
            "/api/session/answer",
            post(routes::session_routes::submit_answer),
        )
        .route(
            "/api/session/resume",
            post(routes::session_routes::resume_quiz),
        )
        .route(
            "/api/retry/scores",
            get(routes::retry_routes::list_retryable),
        )
        .route("/api/retry/start", post(routes::retry_routes::start_retry))
        .route(
            "/api/retry/answer",
            post(routes::retry_routes::submit_retry_answer),
        )
        .route(
            "/api/retry/status",
            get(routes::retry_routes::retry_status),
        )
        .route("/api/retry/clear", post(routes::retry_routes::clear_retry))
        .route(
            "/api/webhook/telegram",
            post(routes::telegram::handle_webhook),
        )
        .layer(axum::middleware::from_fn_with_state(
            quiz_backend::middleware::rate_limit::new_rps_state(config.public_rps),
            quiz_backend::middleware::rate_limit::rps_middleware,
        ));

    let app = base_routes
        .merge(public_api)
        .with_state(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
