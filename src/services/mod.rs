pub mod grading_service;
pub mod participant_service;
pub mod quiz_service;
pub mod retry_service;
pub mod session_service;
pub mod sheet_service;
