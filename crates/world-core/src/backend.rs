use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::GenerationError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: String,
}

/// One incremental text delta.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
}

impl Chunk {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

pub type ChunkStream = BoxStream<'static, Result<Chunk, GenerationError>>;

/// The remote model that turns a prompt into a stream of text.
///
/// Failure can happen when the call is made (`Err` from `stream_generate`)
/// or at any point while the stream is consumed (an `Err` item).
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn stream_generate(
        &self,
        request: GenerationRequest,
    ) -> Result<ChunkStream, GenerationError>;
}
