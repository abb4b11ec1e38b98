//! WinAgent Intent - CLI Interface
//!
//! Command-line front end for parsing and running assistant commands.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use winagent_intent::*;

#[derive(Parser)]
#[command(name = "winagent-intent")]
#[command(about = "WinAgent Intent - Russian command understanding and dispatch", long_about = None)]
struct Cli {
    /// Path to configuration file (TOML)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the parsed intent without side effects
    Parse {
        /// Utterance to parse
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Process one utterance
    Run {
        /// Print the response envelope as JSON
        #[arg(long)]
        json: bool,

        /// Run operations outside the allow-list without asking
        #[arg(long)]
        auto_confirm: bool,

        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Interactive session
    Repl {
        #[arg(long)]
        auto_confirm: bool,
    },

    /// Show configuration summary
    Info,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let config = match &cli.config {
        Some(path) => {
            log::info!("Loading config from: {}", path.display());
            AgentConfig::load(path)?
        }
        None => AgentConfig::default(),
    };

    match cli.command {
        Commands::Parse { text } => parse_command(config, &text.join(" ")),
        Commands::Run {
            json,
            auto_confirm,
            text,
        } => run_once(config, &text.join(" "), json, auto_confirm),
        Commands::Repl { auto_confirm } => run_repl(config, auto_confirm),
        Commands::Info => {
            println!("{}", IntentEngine::new(config).info());
            Ok(())
        }
    }
}

/// Parse a single command
fn parse_command(config: AgentConfig, input: &str) -> Result<()> {
    let engine = IntentEngine::new(config);
    let result = engine.parse(input);

    println!("Input: {}\n", input);
    println!("Intent ID: {:?}", result.intent.id);
    println!("Intent: {}", result.intent.command.tag());
    println!(
        "Command: {}",
        serde_json::to_string(&result.intent.command).context("serialize command")?
    );
    println!("Confidence: {:.2}", result.intent.confidence);
    println!("Needs Clarification: {}", result.needs_clarification);

    if !result.alternatives.is_empty() {
        println!("\nAlternatives:");
        for alt in &result.alternatives {
            println!("  - {} ({:.2})", alt.command.tag(), alt.confidence);
        }
    }

    Ok(())
}

fn run_once(config: AgentConfig, input: &str, json: bool, auto_confirm: bool) -> Result<()> {
    let mut session = Session::new(config.llm.default_model.clone()).with_auto_confirm(auto_confirm);
    let mut context = DialogueContext::new(config.dialogue.ttl_secs);
    let router = IntentRouter::from_config(config);

    let envelope = guarded_turn(&router, input, &mut session, &mut context, false);
    if json {
        println!("{}", serde_json::to_string_pretty(&envelope)?);
    } else {
        print_envelope(&envelope);
    }
    Ok(())
}

/// Run interactive REPL
fn run_repl(config: AgentConfig, auto_confirm: bool) -> Result<()> {
    let mut session = Session::new(config.llm.default_model.clone()).with_auto_confirm(auto_confirm);
    let mut context = DialogueContext::new(config.dialogue.ttl_secs);
    let router = IntentRouter::from_config(config);

    println!("{}\n", router.engine().info());
    println!("Команды: :auto on|off, :model <имя>, :reset, выход\n");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let input = line?;
        let input = input.trim();

        if input.is_empty() {
            continue;
        }
        if matches!(input, "выход" | "exit" | "quit") {
            break;
        }
        if let Some(command) = input.strip_prefix(':') {
            handle_prompt_command(command, &mut session, &mut context);
            continue;
        }

        let mut envelope = guarded_turn(&router, input, &mut session, &mut context, false);
        print_envelope(&envelope);

        while envelope.requires_confirmation {
            print!("[y/n] ");
            io::stdout().flush()?;

            let answer = match lines.next() {
                Some(answer) => answer?,
                None => return Ok(()),
            };
            let confirmed = matches!(answer.trim().to_lowercase().as_str(), "y" | "yes" | "д" | "да");
            let reply = if confirmed { "да" } else { "нет" };

            envelope = guarded_turn(&router, reply, &mut session, &mut context, confirmed);
            print_envelope(&envelope);
        }
    }

    Ok(())
}

fn handle_prompt_command(command: &str, session: &mut Session, context: &mut DialogueContext) {
    let mut parts = command.split_whitespace();

    match (parts.next(), parts.next()) {
        (Some("auto"), Some("on")) => {
            session.auto_confirm = true;
            println!("Автоподтверждение включено");
        }
        (Some("auto"), Some("off")) => {
            session.auto_confirm = false;
            println!("Автоподтверждение выключено");
        }
        (Some("model"), Some(model)) => {
            session.model = model.to_string();
            println!("Использую модель {}", session.model);
        }
        (Some("reset"), None) => {
            context.clear();
            session.pending = None;
            println!("Контекст очищен.");
        }
        _ => println!("Неизвестная команда: :{}", command),
    }
}

/// One turn; a panic is logged and reported instead of ending the session
fn guarded_turn(
    router: &IntentRouter,
    input: &str,
    session: &mut Session,
    context: &mut DialogueContext,
    force_confirm: bool,
) -> ResponseEnvelope {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        router.handle_message(input, session, context, force_confirm)
    }));

    outcome.unwrap_or_else(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        log::error!("turn panicked on '{}': {}", input, message);
        ResponseEnvelope::failure(format!("Ошибка: {}", message))
    })
}

fn print_envelope(envelope: &ResponseEnvelope) {
    println!("{}", envelope.reply);
    if let Some(items) = &envelope.items {
        log::debug!("{} item(s) in reply", items.len());
    }
}
