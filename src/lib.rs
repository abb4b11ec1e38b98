//! WinAgent Intent - command understanding for a Russian desktop assistant
//!
//! Turns free-form Russian utterances into typed commands, keeps the short
//! dialogue memory that "открой второй" relies on, and routes commands to
//! file, application, web and LLM collaborators.
//!
//! # Architecture
//!
//! - **Normalizer**: lower-casing, tokens and keywords
//! - **Intent Parser**: ordered table of explicit command patterns
//! - **Scorers**: app / file / web heuristics for everything else
//! - **Policy Arbiter**: threshold rules between the three readings
//! - **Context Manager**: TTL-bound result list for follow-up references
//! - **Router**: confirmation gate and dispatch to the tools
//!
//! # Usage
//!
//! ```rust,no_run
//! use winagent_intent::{AgentConfig, DialogueContext, IntentRouter, Session};
//!
//! let router = IntentRouter::from_config(AgentConfig::default());
//! let mut session = Session::default();
//! let mut context = DialogueContext::default();
//!
//! let reply = router.handle_message("найди файл отчёт", &mut session, &mut context, false);
//! println!("{}", reply.reply);
//!
//! let reply = router.handle_message("открой второй", &mut session, &mut context, false);
//! println!("{}", reply.reply);
//! ```

pub mod config;
pub mod context_manager;
pub mod intent_parser;
pub mod normalizer;
pub mod policy_arbiter;
pub mod registry;
pub mod router;
pub mod scorers;
pub mod session;
pub mod similarity;
pub mod tools;
pub mod types;

pub use config::{AgentConfig, ConfigError, SimilarityBackend};
pub use context_manager::{Clock, ContextError, DialogueContext, ManualClock, SystemClock};
pub use registry::{Conversation, SessionId, SessionRegistry};
pub use router::{IntentRouter, Toolbox};
pub use session::{FileOperation, PendingAction, Session};
pub use types::*;

use intent_parser::IntentParser;
use normalizer::Normalizer;
use policy_arbiter::PolicyArbiter;
use scorers::{AppAliases, Scorers};
use similarity::StringSimilarity;
use std::path::PathBuf;
use std::sync::Arc;

/// Classification pipeline: patterns first, then scorers and arbiter
pub struct IntentEngine {
    config: Arc<AgentConfig>,
    similarity: Arc<dyn StringSimilarity>,
    aliases: Arc<AppAliases>,
    normalizer: Normalizer,
    parser: IntentParser,
    scorers: Scorers,
    arbiter: PolicyArbiter,
}

impl IntentEngine {
    pub fn new(config: AgentConfig) -> Self {
        let similarity = similarity::from_backend(config.similarity);
        let aliases = Arc::new(AppAliases::from_config(&config, Arc::clone(&similarity)));

        Self {
            normalizer: Normalizer::new(&config.vocabulary),
            parser: IntentParser::new(&config, Arc::clone(&aliases)),
            scorers: Scorers::new(&config, Arc::clone(&aliases)),
            arbiter: PolicyArbiter::new(config.thresholds.clone()),
            config: Arc::new(config),
            similarity,
            aliases,
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn aliases(&self) -> Arc<AppAliases> {
        Arc::clone(&self.aliases)
    }

    pub fn similarity(&self) -> Arc<dyn StringSimilarity> {
        Arc::clone(&self.similarity)
    }

    /// Parse user input into an intent; never fails
    pub fn parse(&self, input: &str) -> ParseResult {
        let normalized = self.normalizer.normalize(input);
        if normalized.is_empty() {
            return ParseResult::single(Intent::unknown());
        }

        if let Some(result) = self.parser.parse(input) {
            return result;
        }

        let signals = self.scorers.signals(&normalized);
        let scores = self
            .scorers
            .score(&normalized, signals.explicit_web || signals.explicit_search);
        log::debug!(
            "engine: app={:.2} file={:.2} web={:.2} search={} web_hint={}",
            scores.app,
            scores.file,
            scores.web,
            signals.explicit_search,
            signals.explicit_web
        );

        let Some(intent) = self.arbiter.arbitrate(&scores, signals.explicit_search) else {
            return ParseResult::single(Intent::unknown());
        };

        match &intent.command {
            Command::Ambiguous { possibilities, .. } => {
                let alternatives = possibilities
                    .iter()
                    .map(|command| {
                        let confidence = match command {
                            Command::OpenFile { .. } => scores.file,
                            _ => scores.web,
                        };
                        Intent::new(command.clone(), confidence)
                    })
                    .collect();

                ParseResult {
                    intent,
                    alternatives,
                    needs_clarification: true,
                }
            }
            _ => ParseResult::single(intent),
        }
    }

    /// Get engine info
    pub fn info(&self) -> String {
        let config = &self.config;
        format!(
            "WinAgent Intent Engine\n\
             Similarity: {:?}\n\
             Apps: {} ({} aliases)\n\
             Allow-list: {}\n\
             Model: {} @ {}\n\
             Result TTL: {}s\n\
             Web search: {}",
            config.similarity,
            config.apps.len(),
            self.aliases.len(),
            config
                .paths
                .allowlist
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
            config.llm.default_model,
            config.llm.base_url,
            config.dialogue.ttl_secs,
            if cfg!(feature = "net") {
                "enabled"
            } else {
                "disabled (built without net)"
            },
        )
    }
}

/// Builder for AgentConfig
pub struct AgentConfigBuilder {
    config: AgentConfig,
}

impl AgentConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: AgentConfig::default(),
        }
    }

    /// Start from a loaded configuration
    pub fn from_config(config: AgentConfig) -> Self {
        Self { config }
    }

    pub fn allowlist(mut self, dirs: Vec<PathBuf>) -> Self {
        self.config.paths.allowlist = dirs;
        self
    }

    pub fn working_dir(mut self, dir: PathBuf) -> Self {
        self.config.paths.working_dir = Some(dir);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.llm.default_model = model.into();
        self
    }

    pub fn llm_url(mut self, url: impl Into<String>) -> Self {
        self.config.llm.base_url = url.into();
        self
    }

    pub fn context_ttl(mut self, secs: u64) -> Self {
        self.config.dialogue.ttl_secs = secs;
        self
    }

    pub fn similarity(mut self, backend: SimilarityBackend) -> Self {
        self.config.similarity = backend;
        self
    }

    pub fn build(self) -> AgentConfig {
        self.config
    }
}

impl Default for AgentConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
