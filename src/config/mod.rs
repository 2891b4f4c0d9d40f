//! Configuration module for Pugg.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{IdentityPrompt, Prompts, SynthesisPrompts, ToolPrompts};
pub use settings::{
    AgentSettings, ChunkingSettings, EmbeddingSettings, GeneralSettings, LlmSettings,
    PromptSettings, RetrievalSettings, Settings, VectorStoreSettings,
};
