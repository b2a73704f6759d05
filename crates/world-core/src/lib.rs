pub mod backend;
pub mod config;
pub mod controller;
pub mod error;
pub mod preset;
pub mod prompt;

// Re-export common types
pub use backend::{Chunk, ChunkStream, GenerationBackend, GenerationRequest};
pub use config::WorldConfig;
pub use controller::{
    Attempt, AttemptEvent, AttemptId, AttemptUpdate, GenerationState, GreetingController, Phase,
};
pub use error::{GenerationError, RegistryError};
pub use preset::{Preset, PresetRegistry};
pub use prompt::build_prompt;
