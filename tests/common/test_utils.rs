use std::collections::HashSet;

use heart_fall::scene::SpriteTextures;

/// Texture source that records what it was asked for instead of touching a GPU.
#[derive(Debug, Default)]
pub struct RecordingTextures {
    pub disabled: bool,
    pub prepared: HashSet<String>,
    pub requests: usize,
}

impl RecordingTextures {
    pub fn disabled() -> Self {
        Self {
            disabled: true,
            ..Default::default()
        }
    }
}

impl SpriteTextures for RecordingTextures {
    fn prepare(&mut self, text: &str) -> bool {
        self.requests += 1;
        if self.disabled {
            return false;
        }
        self.prepared.insert(text.to_string());
        true
    }
}
