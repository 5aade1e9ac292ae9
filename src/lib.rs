pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use crate::services::{
    participant_service::ParticipantService, quiz_service::QuizService,
    retry_service::RetryService, session_service::SessionService, sheet_service::SheetService,
};
use reqwest::Client;
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub participant_service: ParticipantService,
    pub quiz_service: QuizService,
    pub sheet_service: SheetService,
    pub session_service: SessionService,
    pub retry_service: RetryService,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .expect("failed to build HTTP client");

        let participant_service = ParticipantService::new(pool.clone());
        let quiz_service = QuizService::new(pool.clone());
        let sheet_service = SheetService::new(http_client);
        let session_service =
            SessionService::new(pool.clone(), quiz_service.clone(), sheet_service.clone());
        let retry_service =
            RetryService::new(pool.clone(), quiz_service.clone(), sheet_service.clone());

        Self {
            pool,
            participant_service,
            quiz_service,
            sheet_service,
            session_service,
            retry_service,
        }
    }
}
