//! # Epsilon Agent
//!
//! Puts a language model in front of the station and lets it play:
//! 1. The controller sends the conversation so far to a completion provider
//! 2. The reply is normalized into game commands (a text line, or tool calls)
//! 3. Commands run against the game engine (or the shell station)
//! 4. Output goes back into the conversation
//! 5. Repeat until won, given up, out of budget, forced to stop, or the provider fails
//!
//! Every playthrough ends in a `RunRecord`.

pub mod controller;
pub mod executor;
pub mod normalize;
pub mod prompts;
pub mod provider;
pub mod record;
pub mod tools;

pub use controller::{ControllerConfig, TurnController};
pub use executor::{CommandExecutor, EngineExecutor, ShellExecutor};
pub use provider::{
    ChatMessage, CompletionRequest, CompletionResponse, LlmProvider, OpenAIProvider,
    ProviderConfig, ProviderError, ProviderType, ScriptedProvider, ToolCall, Usage,
};
pub use record::{CommandEntry, Modality, RunRecord, Termination};
pub use tools::{tool_definitions, GameTool, ToolAction};
