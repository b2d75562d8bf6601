/// Transport-neutral chat port and inbound event types
pub mod chat;
/// Bot command definitions
pub mod commands;
/// Shared state handed to the update handlers
pub mod context;
/// Update routing for messages and poll answers
pub mod handlers;
/// Registration token handshake
pub mod registration;
/// Chat role bindings per group
pub mod registry;
/// teloxide adapter for the chat port
pub mod telegram;
