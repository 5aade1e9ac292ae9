pub mod participant;
pub mod question;
pub mod quiz;
pub mod quiz_access;
pub mod retry;
pub mod score;
pub mod session;
