/// Daily absence poll and report
pub mod attendance;
/// Supervisor attachments and their delivery
pub mod attachments;
/// Attachment dialogue state machine
pub mod conversation;
/// Persisted user display names
pub mod display_names;
/// Per-group runtime wiring
pub mod group;
/// HTTP health endpoints
pub mod health;
/// Periodic schedule re-extraction
pub mod refresh;
/// Daily cron jobs at local times
pub mod scheduler;
/// HTTP downloads
pub mod transfer;
