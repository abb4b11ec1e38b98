//! End-to-end dialogue scenarios through the router

use chrono::Duration;
use parking_lot::Mutex;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use winagent_intent::tools::fs::FsFileOps;
use winagent_intent::tools::*;
use winagent_intent::*;

#[derive(Default)]
struct RecordingShell {
    opened: Mutex<Vec<String>>,
}

impl Shell for RecordingShell {
    fn open(&self, target: &str) -> io::Result<()> {
        self.opened.lock().push(target.to_string());
        Ok(())
    }
}

struct NoApps;

impl AppLauncher for NoApps {
    fn resolve(&self, _name: &str) -> Option<String> {
        None
    }

    fn launch(&self, app: &str) -> Result<String, ToolError> {
        Err(ToolError::UnknownApp(app.to_string()))
    }

    fn close(&self, app: &str) -> Result<String, ToolError> {
        Err(ToolError::UnknownApp(app.to_string()))
    }

    fn refresh(&self) -> Result<usize, ToolError> {
        Ok(0)
    }
}

struct OfflineWeb;

impl WebSearch for OfflineWeb {
    fn search(&self, _query: &str, _max: usize) -> Result<Vec<WebHit>, ToolError> {
        Err(ToolError::Network("offline".to_string()))
    }

    fn open(&self, url: &str) -> Result<String, ToolError> {
        Ok(url.to_string())
    }
}

/// Returns a fixed list of paths for every query
struct FixedSearch(Vec<String>);

impl LocalSearch for FixedSearch {
    fn search(&self, _query: &str, _ext: &[String], max: usize) -> Result<Vec<String>, ToolError> {
        Ok(self.0.iter().take(max).cloned().collect())
    }
}

struct SilentLlm;

impl LlmChat for SilentLlm {
    fn generate(&self, _prompt: &str, _model: &str) -> Result<String, ToolError> {
        Err(ToolError::Model("offline".to_string()))
    }
}

struct Fixture {
    router: IntentRouter,
    shell: Arc<RecordingShell>,
    allowed: TempDir,
    outside: TempDir,
    reports: Vec<String>,
}

fn fixture() -> Fixture {
    let allowed = TempDir::new().unwrap();
    let outside = TempDir::new().unwrap();
    let shell = Arc::new(RecordingShell::default());

    let reports: Vec<String> = ["отчёт_март.txt", "отчёт_апрель.txt"]
        .iter()
        .map(|name| {
            let path = allowed.path().join(name);
            std::fs::write(&path, "данные").unwrap();
            path.display().to_string()
        })
        .collect();

    let config = AgentConfigBuilder::new()
        .allowlist(vec![allowed.path().to_path_buf()])
        .working_dir(allowed.path().to_path_buf())
        .build();

    let files = FsFileOps::from_config(&config.paths).with_shell(shell.clone());
    let tools = Toolbox {
        files: Box::new(files),
        apps: Box::new(NoApps),
        web: Box::new(OfflineWeb),
        search: Box::new(FixedSearch(reports.clone())),
        llm: Box::new(SilentLlm),
    };

    Fixture {
        router: IntentRouter::new(IntentEngine::new(config), tools),
        shell,
        allowed,
        outside,
        reports,
    }
}

#[test]
fn test_create_then_write() {
    let f = fixture();
    let mut session = Session::default().with_auto_confirm(true);
    let mut context = DialogueContext::default();

    let env = f
        .router
        .handle_message("создай файл test.txt", &mut session, &mut context, false);
    assert!(env.ok, "{}", env.reply);
    assert!(env.reply.contains("exists=True"));

    let env = f
        .router
        .handle_message("запиши в test.txt: привет", &mut session, &mut context, false);
    assert!(env.ok, "{}", env.reply);

    let written = std::fs::read_to_string(f.allowed.path().join("test.txt")).unwrap();
    assert_eq!(written, "привет");
}

#[test]
fn test_search_then_pronoun_and_number() {
    let f = fixture();
    let mut session = Session::default();
    let mut context = DialogueContext::default();

    let env = f
        .router
        .handle_message("найди файл отчёт", &mut session, &mut context, false);
    assert!(env.ok, "{}", env.reply);
    assert_eq!(env.items.as_ref(), Some(&f.reports));

    let env = f
        .router
        .handle_message("открой его", &mut session, &mut context, false);
    assert!(env.ok, "{}", env.reply);
    assert!(env.reply.contains("уточните номер"));

    let env = f
        .router
        .handle_message("открой 2", &mut session, &mut context, false);
    assert!(env.ok, "{}", env.reply);

    let opened = f.shell.opened.lock().clone();
    assert_eq!(opened, f.reports);
    assert_eq!(context.get_results(None), f.reports);
}

#[test]
fn test_reset_then_reference_fails() {
    let f = fixture();
    let mut session = Session::default();
    let mut context = DialogueContext::default();

    f.router
        .handle_message("найди файл отчёт", &mut session, &mut context, false);
    f.router
        .handle_message("сбрось контекст", &mut session, &mut context, false);
    assert!(context.get_results(None).is_empty());

    let env = f
        .router
        .handle_message("открой первый", &mut session, &mut context, false);
    assert!(!env.ok);
    assert!(env.reply.contains("Нет сохранённых результатов"));
}

#[test]
fn test_outside_allowlist_needs_confirmation() {
    let f = fixture();
    let mut session = Session::default();
    let mut context = DialogueContext::default();
    let target: PathBuf = f.outside.path().join("data.txt");

    let env = f.router.handle_message(
        &format!("запиши в {}: данные", target.display()),
        &mut session,
        &mut context,
        false,
    );
    assert!(!env.ok);
    assert!(env.requires_confirmation);
    assert!(!target.exists());
    assert!(session.pending.is_some());

    let env = f
        .router
        .handle_message("да", &mut session, &mut context, true);
    assert!(env.ok, "{}", env.reply);
    assert!(session.pending.is_none());
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "данные");
}

#[test]
fn test_results_expire_after_ttl() {
    let f = fixture();
    let clock = Arc::new(ManualClock::default());
    let mut session = Session::default();
    let mut context = DialogueContext::with_clock(900, clock.clone());

    f.router
        .handle_message("найди файл отчёт", &mut session, &mut context, false);
    clock.advance(Duration::seconds(901));

    assert!(context.get_results(None).is_empty());
    assert_eq!(context.last_kind(), ResultKind::None);

    let env = f
        .router
        .handle_message("открой 1", &mut session, &mut context, false);
    assert!(!env.ok);
}

#[test]
fn test_collaborator_failures_become_envelopes() {
    let f = fixture();
    let mut session = Session::default();
    let mut context = DialogueContext::default();

    let env = f
        .router
        .handle_message("найди в интернете погоду", &mut session, &mut context, false);
    assert!(!env.ok);
    assert!(env.reply.starts_with("Не удалось выполнить веб-поиск"));

    let env = f
        .router
        .handle_message("как дела", &mut session, &mut context, false);
    assert!(!env.ok);
    assert!(env.reply.starts_with("Ошибка:"));
}
