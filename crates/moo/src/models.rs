//! Internal representation of the conversation.
//!
//! Providers speak slightly different dialects of the chat-completion format.
//! Everything coming back from a provider is converted into these structs
//! immediately, and converted out again only when a request is built.
pub mod message;
pub mod objectid;
pub mod tool;
