use futures::stream::{self, BoxStream, StreamExt};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::backend::{ChunkStream, GenerationBackend, GenerationRequest};
use crate::config::WorldConfig;
use crate::error::GenerationError;
use crate::preset::{Preset, PresetRegistry};
use crate::prompt::build_prompt;

/// Where the current generation attempt stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing has been requested yet.
    Idle,
    /// Request sent, waiting for the first chunk.
    Requesting,
    /// Chunks are arriving.
    Streaming,
    Settled,
    Failed,
}

impl Phase {
    pub fn is_loading(self) -> bool {
        matches!(self, Phase::Requesting | Phase::Streaming)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Settled | Phase::Failed)
    }
}

/// Snapshot of what the presentation layer renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationState {
    active_preset: Preset,
    message: String,
    phase: Phase,
}

impl GenerationState {
    fn new(active_preset: Preset) -> Self {
        Self {
            active_preset,
            message: String::new(),
            phase: Phase::Idle,
        }
    }

    pub fn active_preset(&self) -> &Preset {
        &self.active_preset
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_loading(&self) -> bool {
        self.phase.is_loading()
    }
}

/// Token identifying one generation attempt. Later attempts compare greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AttemptId(u64);

impl AttemptId {
    pub fn value(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptEvent {
    Chunk(String),
    Finished,
    Failed(GenerationError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptUpdate {
    pub attempt: AttemptId,
    pub event: AttemptEvent,
}

/// An in-flight generation, detached from the controller so it can run on
/// another task. Its updates are applied back through [`GreetingController::apply`].
pub struct Attempt {
    id: AttemptId,
    preset: Preset,
    request: GenerationRequest,
    backend: Arc<dyn GenerationBackend>,
    read_timeout: Option<Duration>,
}

/// Fails with `Transport` if `fut` is still pending after `limit`.
async fn within<F: Future>(limit: Option<Duration>, fut: F) -> Result<F::Output, GenerationError> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut).await.map_err(|_| {
            GenerationError::Transport(format!("no response for {}s", limit.as_secs()))
        }),
        None => Ok(fut.await),
    }
}

impl Attempt {
    pub fn id(&self) -> AttemptId {
        self.id
    }

    pub fn preset(&self) -> &Preset {
        &self.preset
    }

    pub fn request(&self) -> &GenerationRequest {
        &self.request
    }

    /// Zero or more `Chunk`s followed by exactly one `Finished` or `Failed`.
    /// A stall longer than the read timeout counts as a failure.
    pub fn updates(self) -> BoxStream<'static, AttemptUpdate> {
        enum Stage {
            Connect(Arc<dyn GenerationBackend>, GenerationRequest),
            Streaming(ChunkStream),
            Done,
        }

        let id = self.id;
        let limit = self.read_timeout;
        stream::unfold(Stage::Connect(self.backend, self.request), move |mut stage| async move {
            loop {
                match stage {
                    Stage::Connect(backend, request) => {
                        match within(limit, backend.stream_generate(request)).await {
                            Ok(Ok(chunks)) => stage = Stage::Streaming(chunks),
                            Ok(Err(err)) | Err(err) => {
                                return Some((AttemptEvent::Failed(err), Stage::Done))
                            }
                        }
                    }
                    Stage::Streaming(mut chunks) => {
                        let next = match within(limit, chunks.next()).await {
                            Ok(next) => next,
                            Err(err) => return Some((AttemptEvent::Failed(err), Stage::Done)),
                        };
                        let event = match next {
                            Some(Ok(chunk)) => {
                                return Some((
                                    AttemptEvent::Chunk(chunk.text),
                                    Stage::Streaming(chunks),
                                ))
                            }
                            Some(Err(err)) => AttemptEvent::Failed(err),
                            None => AttemptEvent::Finished,
                        };
                        return Some((event, Stage::Done));
                    }
                    Stage::Done => return None,
                }
            }
        })
        .map(move |event| AttemptUpdate { attempt: id, event })
        .boxed()
    }

    /// Forwards every update into `tx`. Stops early once the receiver is dropped.
    pub async fn run<T>(self, tx: mpsc::Sender<T>)
    where
        T: From<AttemptUpdate> + Send + 'static,
    {
        let id = self.id;
        let mut updates = self.updates();
        while let Some(update) = updates.next().await {
            if tx.send(T::from(update)).await.is_err() {
                debug!(attempt = id.value(), "receiver dropped, abandoning attempt");
                break;
            }
        }
    }
}

/// Owns the single [`GenerationState`] and is the only thing that writes it.
pub struct GreetingController {
    backend: Arc<dyn GenerationBackend>,
    registry: PresetRegistry,
    model: String,
    failure_message: String,
    read_timeout: Option<Duration>,
    state: GenerationState,
    current: AttemptId,
    publisher: watch::Sender<GenerationState>,
}

impl GreetingController {
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        registry: PresetRegistry,
        config: &WorldConfig,
    ) -> Self {
        let state = GenerationState::new(registry.default_preset().clone());
        let (publisher, _) = watch::channel(state.clone());
        Self {
            backend,
            registry,
            model: config.model.clone(),
            failure_message: config.failure_message.clone(),
            read_timeout: (config.read_timeout_secs > 0)
                .then(|| Duration::from_secs(config.read_timeout_secs)),
            state,
            current: AttemptId(0),
            publisher,
        }
    }

    /// Builds the controller and begins the startup attempt with the default preset.
    pub fn launch(
        backend: Arc<dyn GenerationBackend>,
        registry: PresetRegistry,
        config: &WorldConfig,
    ) -> (Self, Attempt) {
        let mut controller = Self::new(backend, registry, config);
        let attempt = controller.begin(None);
        (controller, attempt)
    }

    pub fn state(&self) -> &GenerationState {
        &self.state
    }

    pub fn registry(&self) -> &PresetRegistry {
        &self.registry
    }

    pub fn subscribe(&self) -> watch::Receiver<GenerationState> {
        self.publisher.subscribe()
    }

    pub fn select_preset(&mut self, preset: &Preset) {
        self.state.active_preset = preset.clone();
        self.publish();
    }

    /// Starts a new attempt. `preset` only shapes the prompt; the active preset
    /// is left alone. Any attempt started earlier is superseded.
    pub fn begin(&mut self, preset: Option<Preset>) -> Attempt {
        let preset = preset.unwrap_or_else(|| self.state.active_preset.clone());
        self.current = AttemptId(self.current.0 + 1);
        self.state.phase = Phase::Requesting;
        self.state.message.clear();
        self.publish();

        info!(
            attempt = self.current.value(),
            preset = %preset.id,
            backend = self.backend.name(),
            "starting generation"
        );

        let request = GenerationRequest {
            model: self.model.clone(),
            prompt: build_prompt(&preset),
        };
        Attempt {
            id: self.current,
            preset,
            request,
            backend: Arc::clone(&self.backend),
            read_timeout: self.read_timeout,
        }
    }

    /// Applies one update. Returns false when it belongs to a superseded
    /// attempt or arrives after the attempt already ended.
    pub fn apply(&mut self, update: AttemptUpdate) -> bool {
        if update.attempt != self.current {
            debug!(
                attempt = update.attempt.value(),
                current = self.current.value(),
                "ignoring stale update"
            );
            return false;
        }
        if self.state.phase.is_terminal() {
            return false;
        }

        match update.event {
            AttemptEvent::Chunk(text) => {
                debug!(attempt = update.attempt.value(), len = text.len(), "chunk");
                self.state.phase = Phase::Streaming;
                self.state.message.push_str(&text);
            }
            AttemptEvent::Finished => {
                info!(
                    attempt = update.attempt.value(),
                    chars = self.state.message.chars().count(),
                    "generation settled"
                );
                self.state.phase = Phase::Settled;
            }
            AttemptEvent::Failed(err) => {
                warn!(attempt = update.attempt.value(), error = %err, "generation failed");
                self.state.message = self.failure_message.clone();
                self.state.phase = Phase::Failed;
            }
        }
        self.publish();
        true
    }

    /// Runs a whole attempt on the calling task and returns its terminal phase.
    pub async fn generate(&mut self, preset: Option<Preset>) -> Phase {
        let mut updates = self.begin(preset).updates();
        while let Some(update) = updates.next().await {
            self.apply(update);
        }
        self.state.phase
    }

    fn publish(&self) {
        self.publisher.send_replace(self.state.clone());
    }
}
