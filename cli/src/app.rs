//! Application context: unified state passed to every command handler.
//!
//! Output flags, interactivity and the config file location are resolved
//! once here. Commands ask the context for a layered [`VerifierConfig`]
//! with their own flag overrides applied last.

use std::io::IsTerminal as _;
use std::path::PathBuf;

use anyhow::Result;

use crate::domain::{ConfigOverrides, VerifierConfig, validate_config};
use crate::infra::config::YamlConfigStore;
use crate::output::{HumanRenderer, OutputContext, Renderer};

/// Output rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable terminal output (default).
    Human,
    /// Machine-readable JSON output.
    Json,
}

/// Output rendering flags.
pub struct OutputFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
    /// Enable JSON output mode.
    pub json: bool,
}

/// Behaviour flags.
pub struct BehaviourFlags {
    /// Skip interactive prompts (also set by the `CI` env var).
    pub yes: bool,
    /// `--config` path.
    pub config: Option<PathBuf>,
}

/// Flags passed from the top-level CLI to `AppContext::new`.
pub struct AppFlags {
    /// Output rendering options.
    pub output: OutputFlags,
    /// Behaviour options.
    pub behaviour: BehaviourFlags,
}

/// Unified application context passed to every command handler.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    ///
    /// Always quiet in JSON mode so progress lines never mix with the
    /// JSON document on stdout.
    pub output: OutputContext,
    /// Output rendering mode (human vs JSON).
    pub mode: OutputMode,
    /// When `true`, skip interactive prompts and use defaults.
    ///
    /// Set when `--yes` / `-y` is passed, when `CI` is present, or when
    /// stdin is not a terminal.
    pub non_interactive: bool,
    config_store: YamlConfigStore,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags.
    #[must_use]
    pub fn new(flags: AppFlags) -> Self {
        let ci_env = std::env::var("CI").is_ok();
        let non_interactive =
            flags.behaviour.yes || ci_env || !std::io::stdin().is_terminal();

        let mode = if flags.output.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        };

        Self {
            output: OutputContext::new(
                flags.output.no_color,
                flags.output.quiet || flags.output.json,
            ),
            mode,
            non_interactive,
            config_store: YamlConfigStore::new(flags.behaviour.config),
        }
    }

    /// Returns `true` when JSON output mode is active.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }

    /// Returns the appropriate `Renderer` variant for the current output mode.
    #[must_use]
    pub fn renderer(&self) -> Renderer<'_> {
        match self.mode {
            OutputMode::Human => Renderer::Human(HumanRenderer::new(&self.output)),
            OutputMode::Json => Renderer::Json,
        }
    }

    /// Load the layered configuration and apply `overrides` on top.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file or environment is invalid, or if
    /// the final configuration fails validation.
    pub fn load_config(&self, overrides: ConfigOverrides) -> Result<VerifierConfig> {
        let mut config = self.config_store.load()?;
        overrides.apply(&mut config);
        validate_config(&config)?;
        tracing::debug!(?config, "configuration loaded");
        Ok(config)
    }

    /// Ask the user for confirmation.
    ///
    /// When `non_interactive` is `true`, returns `default` immediately
    /// without prompting.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal prompt fails.
    pub fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        if self.non_interactive {
            return Ok(default);
        }
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()?;
        Ok(confirmed)
    }
}
