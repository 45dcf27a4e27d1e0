//! # supperclub core
//!
//! Domain types, traits, and error definitions for the supperclub dining
//! planner. This crate has **no framework dependencies**: it defines the
//! domain model that every other crate implements against.
//!
//! Every external collaborator (the chat-completion provider, the tools) is a
//! trait here. Implementations live in their own crates, which keeps the
//! orchestration loop testable with scripted stubs.

pub mod error;
pub mod event;
pub mod location;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProviderError, Result, SessionError, ToolError};
pub use event::{DomainEvent, EventBus};
pub use location::UserLocation;
pub use message::{Message, MessageToolCall, Role};
pub use provider::{
    ChunkReceiver, Provider, ProviderRequest, StreamChunk, ToolCallDelta, ToolChoice,
    ToolDefinition, Usage,
};
pub use tool::{Tool, ToolCall, ToolContext, ToolRegistry};
