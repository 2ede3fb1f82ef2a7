//! Integration tests for kiba-bot.
//!
//! These tests run real connections against an in-process exchange:
//! - WebSocket connection lifecycle and subscription replay
//! - Frame parsing through the event loop into the engine
//! - Periodic reports of the cross-source average

pub mod common;
