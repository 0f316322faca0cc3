/// Database model definitions.
pub mod models;
/// Persistence layer for players, questions, the waiting queue and sessions.
pub mod quiz_store;
/// Storage abstraction layer for database operations.
pub mod storage;
