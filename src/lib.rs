//! # Attendance Bot
//!
//! A Telegram bot that tracks class attendance for university student groups.
//!
//! ## Features
//! - Timetables extracted from the university's published xlsx workbooks
//! - Daily attendance poll in every registered group chat, closed and reported
//!   to the group's supervisor the next evening
//! - Per-lesson attachments prepared by the supervisor and delivered to the
//!   group the evening before the lesson
//! - Token-based registration of group and supervisor chats
//! - Persistent storage with SQLite

/// Telegram glue, chat abstraction, registration and update handlers
pub mod bot;
/// Configuration management and environment variables
pub mod config;
/// Database models, connections, and migrations
pub mod database;
/// Domain error type
pub mod error;
/// Timetable model, workbook extraction and caching
pub mod schedule;
/// Per-group attendance and attachment services, timers and health endpoint
pub mod services;
/// Utility functions for datetime, validation, and logging
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;
