//! These models represent the objects passed between the gateway, the composer and the providers
//!
//! There are several different related formats we need to interact with:
//! - gateway requests, sent from the browser to the server
//! - openai chat messages, sent from the server to the LLM
//! - anthropic messages, sent from the server to the LLM
//! - backboard assistant/thread/message calls, sent from the server to the LLM
//!
//! We always immediately convert those data models into the canonical structs here.
//! Every provider adapter translates from these structs into its own wire shape.
pub mod content;
pub mod message;
pub mod role;
