pub mod health;
pub mod quiz_routes;
pub mod retry_routes;
pub mod session_routes;
pub mod telegram;
