//! Turn controller - drives one agent through one playthrough
//!
//! Both modalities share the same loop:
//! 1. Stop with `token-limit` once the running total reaches the budget
//! 2. Ask the provider for the next reply (full history, plus tools in tool mode)
//! 3. Account tokens and the turn
//! 4. Stop with `gave-up` if the reply carries the give-up keyword
//! 5. Execute the command(s); stop with `won` as soon as the game is won
//! 6. Nudge on loops and blank replies; stop with `forced-stop` after too many blanks
//! 7. Feed the output back as the next turn's context
//!
//! A provider failure ends the playthrough with `provider-error`. Nothing in
//! here returns an error once the playthrough has started: every path ends in
//! a `RunRecord`.

use crate::executor::CommandExecutor;
use crate::normalize::{is_give_up, normalize_reply};
use crate::prompts;
use crate::provider::{
    ChatMessage, CompletionRequest, CompletionResponse, LlmProvider, ToolCall, UsageTracker,
};
use crate::record::{CommandEntry, Modality, RunRecord, Termination};
use crate::tools::{tool_definitions, unknown_tool_message, ToolAction};
use chrono::Utc;
use epsilon_error::{Error, Result};
use epsilon_game::GameEngine;
use tracing::{debug, info, warn};

/// Log previews of narrative text are cut to this many characters
const PREVIEW_CHARS: usize = 200;

/// Configuration for the controller
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Model id sent with every request
    pub model: String,
    /// Display label for records; defaults to the model id
    pub label: Option<String>,
    /// Cumulative prompt + completion token budget
    pub token_limit: usize,
    /// Completion cap per turn in the text modality
    pub text_max_tokens: usize,
    /// Completion cap per turn in the tool modality
    pub tools_max_tokens: usize,
    pub temperature: f32,
    pub give_up_keyword: String,
    /// Identical consecutive commands before a loop nudge
    pub loop_threshold: usize,
    /// Consecutive blank turns before a forced stop
    pub streak_limit: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            model: String::new(),
            label: None,
            token_limit: 50_000,
            text_max_tokens: 50,
            tools_max_tokens: 200,
            temperature: 0.0,
            give_up_keyword: "GIVE_UP".to_string(),
            loop_threshold: 3,
            streak_limit: 5,
        }
    }
}

impl ControllerConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_token_limit(mut self, limit: usize) -> Self {
        self.token_limit = limit;
        self
    }

    pub fn with_max_tokens(mut self, text: usize, tools: usize) -> Self {
        self.text_max_tokens = text;
        self.tools_max_tokens = tools;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_give_up_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.give_up_keyword = keyword.into();
        self
    }

    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.model)
    }
}

/// Tracks the current run of identical commands
#[derive(Debug)]
struct LoopDetector {
    threshold: usize,
    last: Option<String>,
    run: usize,
}

impl LoopDetector {
    fn new(threshold: usize) -> Self {
        Self {
            threshold,
            last: None,
            run: 0,
        }
    }

    /// Record a command; true while the run is at or past the threshold
    fn observe(&mut self, command: &str) -> bool {
        if self.last.as_deref() == Some(command) {
            self.run += 1;
        } else {
            self.last = Some(command.to_string());
            self.run = 1;
        }
        self.threshold > 0 && self.run >= self.threshold
    }
}

/// Mutable state of one playthrough
struct Playthrough {
    mode: Modality,
    backend: Option<String>,
    messages: Vec<ChatMessage>,
    usage: UsageTracker,
    turns: usize,
    commands: Vec<CommandEntry>,
    loops: LoopDetector,
    blank_streak: usize,
}

impl Playthrough {
    fn new(mode: Modality, system_prompt: &str, opening: &str, config: &ControllerConfig) -> Self {
        Self {
            mode,
            backend: None,
            messages: vec![
                ChatMessage::system(system_prompt),
                ChatMessage::user(prompts::opening(opening)),
            ],
            usage: UsageTracker::new(),
            turns: 0,
            commands: Vec::new(),
            loops: LoopDetector::new(config.loop_threshold),
            blank_streak: 0,
        }
    }

    fn total_tokens(&self) -> usize {
        self.usage.total_tokens()
    }

    fn account(&mut self, config: &ControllerConfig, response: &CompletionResponse) {
        self.usage.track(&config.model, &response.usage);
        self.turns += 1;

        info!(
            mode = %self.mode,
            turn = self.turns,
            tokens = response.usage.prompt_tokens + response.usage.completion_tokens,
            total = self.total_tokens(),
            "turn"
        );
    }

    fn record(&mut self, command: &str, tool: Option<&str>, output: &str) {
        debug!(command, output = %preview(output), "executed");
        self.commands.push(CommandEntry {
            command: command.to_string(),
            tool: tool.map(str::to_string),
            output: output.to_string(),
        });
    }

    /// Count a blank turn; true once the streak hits the limit
    fn blank(&mut self, config: &ControllerConfig) -> bool {
        self.blank_streak += 1;
        warn!(streak = self.blank_streak, mode = %self.mode, "blank turn");
        self.blank_streak >= config.streak_limit
    }

    fn finish(self, config: &ControllerConfig, termination: Termination, error: Option<String>) -> RunRecord {
        let record = RunRecord {
            model: config.model.clone(),
            label: config.label().to_string(),
            mode: self.mode,
            backend: self.backend,
            won: termination == Termination::Won,
            gave_up: termination == Termination::GaveUp,
            termination,
            error,
            prompt_tokens: self.usage.total_prompt_tokens,
            completion_tokens: self.usage.total_completion_tokens,
            total_tokens: self.usage.total_tokens(),
            turns: self.turns,
            commands: self.commands,
            timestamp: Utc::now(),
        };

        info!(
            model = %record.model,
            mode = %record.mode,
            termination = %record.termination,
            total_tokens = record.total_tokens,
            turns = record.turns,
            "playthrough finished"
        );
        record
    }
}

/// The turn controller
pub struct TurnController<P: LlmProvider> {
    provider: P,
    config: ControllerConfig,
}

impl<P: LlmProvider> TurnController<P> {
    pub fn new(provider: P, config: ControllerConfig) -> Self {
        Self { provider, config }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Text modality: one normalized command per turn
    ///
    /// Only fails if the executor cannot produce its opening narrative.
    pub async fn run_text<E: CommandExecutor>(&self, executor: &mut E) -> Result<RunRecord> {
        let opening = executor
            .start()
            .map_err(|e| e.with_operation("controller::run_text"))?;

        let config = &self.config;
        let mut play = Playthrough::new(Modality::Text, executor.system_prompt(), &opening, config);
        play.backend = Some(executor.name().to_string());

        info!(model = %config.model, backend = executor.name(), limit = config.token_limit, "text playthrough");

        loop {
            if let Some(total) = self.over_budget(&play) {
                warn!(total, "token limit hit");
                return Ok(play.finish(config, Termination::TokenLimit, None));
            }

            let response = match self.next_reply(&play, config.text_max_tokens, false).await {
                Ok(response) => response,
                Err(err) => return Ok(play.finish(config, Termination::ProviderError, Some(err.to_string()))),
            };
            play.account(config, &response);

            let reply = response.content.unwrap_or_default();
            debug!(reply = %preview(&reply), "agent");

            if is_give_up(&reply, &config.give_up_keyword) {
                info!("agent gave up");
                return Ok(play.finish(config, Termination::GaveUp, None));
            }

            let command = normalize_reply(&reply);
            play.messages.push(ChatMessage::assistant(reply));

            if command.is_empty() {
                if play.blank(config) {
                    warn!(limit = config.streak_limit, "forced stop: consecutive blank commands");
                    return Ok(play.finish(config, Termination::ForcedStop, None));
                }
                play.messages.push(ChatMessage::user(prompts::INVALID_COMMAND_NUDGE));
                continue;
            }
            play.blank_streak = 0;

            let output = executor.execute(&command).await;
            play.record(&command, None, &output);

            if executor.is_won() {
                play.messages.push(ChatMessage::user(output));
                info!("game won");
                return Ok(play.finish(config, Termination::Won, None));
            }

            if output.is_empty() {
                play.messages.push(ChatMessage::user(prompts::NO_OUTPUT));
            } else {
                play.messages.push(ChatMessage::user(output));
            }

            if play.loops.observe(&command) {
                warn!(command = %command, "loop detected");
                play.messages
                    .push(ChatMessage::user(prompts::loop_nudge(&command, play.loops.run)));
            }
        }
    }

    /// Tool-call modality: every tool call in a turn is executed in order
    pub async fn run_tools(&self, engine: &mut GameEngine) -> RunRecord {
        let config = &self.config;
        let opening = engine.describe();
        let mut play = Playthrough::new(Modality::Tools, prompts::TOOLS_SYSTEM_PROMPT, &opening, config);

        info!(model = %config.model, limit = config.token_limit, "tool playthrough");

        loop {
            if let Some(total) = self.over_budget(&play) {
                warn!(total, "token limit hit");
                return play.finish(config, Termination::TokenLimit, None);
            }

            let response = match self.next_reply(&play, config.tools_max_tokens, true).await {
                Ok(response) => response,
                Err(err) => return play.finish(config, Termination::ProviderError, Some(err.to_string())),
            };
            play.account(config, &response);

            let content = response
                .content
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string);

            if let Some(content) = &content {
                debug!(content = %preview(content), "agent");
                if is_give_up(content, &config.give_up_keyword) {
                    play.messages.push(ChatMessage::assistant(content.clone()));
                    info!("agent gave up");
                    return play.finish(config, Termination::GaveUp, None);
                }
            }

            if !response.tool_calls.is_empty() {
                play.blank_streak = 0;
                let calls = with_call_ids(response.tool_calls, play.turns);
                play.messages
                    .push(ChatMessage::assistant_tool_calls(content, calls.clone()));

                let mut looped: Option<(String, usize)> = None;
                for call in &calls {
                    let (command, tool, output) = match ToolAction::from_call(call) {
                        ToolAction::Command { tool, command } => {
                            let output = engine.execute(&command);
                            (command, tool.name().to_string(), output)
                        }
                        ToolAction::Unknown(name) => {
                            warn!(tool = %name, "unknown tool");
                            (name.clone(), name.clone(), unknown_tool_message(&name))
                        }
                    };

                    play.messages.push(ChatMessage::tool_result(&call.id, &output));
                    play.record(&command, Some(tool.as_str()), &output);

                    if engine.is_won() {
                        info!("game won");
                        return play.finish(config, Termination::Won, None);
                    }

                    if play.loops.observe(&command) {
                        looped = Some((command, play.loops.run));
                    }
                }

                // Count as of detection; later calls in the batch may have reset the run.
                if let Some((command, times)) = looped {
                    warn!(command = %command, times, "loop detected");
                    play.messages
                        .push(ChatMessage::user(prompts::loop_nudge(&command, times)));
                }
            } else if let Some(content) = content {
                play.blank_streak = 0;
                play.messages.push(ChatMessage::assistant(content));
                play.messages.push(ChatMessage::user(prompts::USE_TOOLS_NUDGE));
            } else {
                play.messages.push(ChatMessage::assistant(""));
                if play.blank(config) {
                    warn!(limit = config.streak_limit, "forced stop: consecutive empty responses");
                    return play.finish(config, Termination::ForcedStop, None);
                }
                play.messages.push(ChatMessage::user(prompts::USE_TOOLS_NUDGE));
            }
        }
    }

    fn over_budget(&self, play: &Playthrough) -> Option<usize> {
        let total = play.total_tokens();
        (total >= self.config.token_limit).then_some(total)
    }

    async fn next_reply(&self, play: &Playthrough, max_tokens: usize, with_tools: bool) -> Result<CompletionResponse> {
        let mut request = CompletionRequest::new(play.messages.clone())
            .with_model(&self.config.model)
            .with_temperature(self.config.temperature)
            .with_max_tokens(max_tokens);
        if with_tools {
            request = request.with_tools(tool_definitions());
        }

        self.provider.complete(request).await.map_err(|e| {
            let err = Error::from(e)
                .with_operation("controller::next_reply")
                .with_context("model", self.config.model.clone())
                .with_context("turn", (play.turns + 1).to_string());
            warn!(error = %err, "provider error");
            err
        })
    }
}

/// Fill in ids some providers leave blank, so tool results can reference them
fn with_call_ids(calls: Vec<ToolCall>, turn: usize) -> Vec<ToolCall> {
    calls
        .into_iter()
        .enumerate()
        .map(|(i, mut call)| {
            if call.id.is_empty() {
                call.id = format!("call_{}_{}", turn, i);
            }
            call
        })
        .collect()
}

fn preview(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}
