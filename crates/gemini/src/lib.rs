pub mod client;
pub mod sse;
pub mod wire;

pub use client::GeminiClient;
pub use sse::{chunk_stream, SseDecoder};
