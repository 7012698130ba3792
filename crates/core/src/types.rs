/// User primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// Sessions are keyed by a random UUID so ids are not guessable.
pub type SessionId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Source of the current time, injectable so lifecycle code can be tested
/// across expiry boundaries.
pub type Clock = std::sync::Arc<dyn Fn() -> Timestamp + Send + Sync>;

/// The wall clock.
pub fn system_clock() -> Clock {
    std::sync::Arc::new(chrono::Utc::now)
}
