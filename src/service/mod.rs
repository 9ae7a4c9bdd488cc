pub mod calendar;
pub mod chat_service;
pub mod habit;
pub mod intent;
pub mod merge;
