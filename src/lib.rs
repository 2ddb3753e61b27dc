//! chat-widget-engine: turn-taking and transcript assembly for an
//! embeddable chat widget
//!
//! The library holds the engine: the transcript store, the turn lifecycle
//! that gates the input, voice capture, and interaction routing. The
//! `chat-widget-engine` binary hosts widgets behind a Unix socket.

pub mod capture;
pub mod config;
pub mod events;
pub mod interaction;
pub mod ipc;
pub mod lifecycle;
pub mod state;
pub mod transcript;
pub mod view;
pub mod widget;
