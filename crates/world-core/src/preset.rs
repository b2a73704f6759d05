use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::RegistryError;

/// A named tone/style for the generated greeting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Preset {
    /// Stable identifier, unique within a registry.
    pub id: String,
    /// Text shown on the vibe selector.
    pub label: String,
    /// Fragment spliced into the prompt, e.g. "a beautiful, short poem".
    pub prompt: String,
}

impl Preset {
    pub fn new(id: impl Into<String>, label: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            prompt: prompt.into(),
        }
    }
}

/// Immutable, ordered, non-empty list of presets.
#[derive(Debug, Clone)]
pub struct PresetRegistry {
    presets: Vec<Preset>,
}

impl PresetRegistry {
    pub fn new(presets: Vec<Preset>) -> Result<Self, RegistryError> {
        if presets.is_empty() {
            return Err(RegistryError::Empty);
        }

        let mut seen = HashSet::new();
        for preset in &presets {
            if !seen.insert(preset.id.as_str()) {
                return Err(RegistryError::DuplicateId(preset.id.clone()));
            }
        }

        Ok(Self { presets })
    }

    /// The four vibes the app ships with.
    pub fn builtin() -> Self {
        Self {
            presets: vec![
                Preset::new("friendly", "😊 Friendly", "a friendly and warm greeting"),
                Preset::new("scifi", "🚀 Sci-Fi", "a futuristic, space-themed greeting"),
                Preset::new("poetic", "📜 Poetic", "a beautiful, short poem"),
                Preset::new("code", "💻 Hacker", "a nerdy, terminal-style greeting"),
            ],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Preset> {
        self.presets.iter()
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    /// Never true for a constructed registry.
    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Preset> {
        self.presets.iter().find(|p| p.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.presets.iter().position(|p| p.id == id)
    }

    pub fn at(&self, index: usize) -> Option<&Preset> {
        self.presets.get(index)
    }

    pub fn default_preset(&self) -> &Preset {
        // Non-empty by construction.
        &self.presets[0]
    }

    pub fn ids(&self) -> Vec<&str> {
        self.presets.iter().map(|p| p.id.as_str()).collect()
    }
}

impl Default for PresetRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
