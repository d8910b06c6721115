//! Outbound service clients.

pub mod reasoning_client;

pub use reasoning_client::{ChatCompletionsClient, ReasoningClientError};
