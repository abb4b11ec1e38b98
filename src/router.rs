//! Intent Router - confirmation gate and dispatch
//!
//! Turns parsed intents into collaborator calls and wraps every outcome in a
//! [`ResponseEnvelope`]. Collaborator failures never escape as errors.

use crate::config::AgentConfig;
use crate::context_manager::DialogueContext;
use crate::session::{FileOperation, FileOutcome, PendingAction, Reply, Session};
use crate::tools::apps::ProcessLauncher;
use crate::tools::fs::FsFileOps;
use crate::tools::llm::OllamaChat;
use crate::tools::search::WalkSearch;
use crate::tools::web::DuckDuckGo;
use crate::tools::*;
use crate::types::*;
use crate::IntentEngine;
use serde_json::{json, Value};

pub const REPROMPT: &str = "Пожалуйста, ответьте 'да' или 'нет' для подтверждения.";

/// Collaborators used by the router
pub struct Toolbox {
    pub files: Box<dyn FileOps>,
    pub apps: Box<dyn AppLauncher>,
    pub web: Box<dyn WebSearch>,
    pub search: Box<dyn LocalSearch>,
    pub llm: Box<dyn LlmChat>,
}

impl Toolbox {
    /// Default implementations wired from configuration
    pub fn from_engine(engine: &IntentEngine) -> Self {
        let config = engine.config();

        Self {
            files: Box::new(FsFileOps::from_config(&config.paths)),
            apps: Box::new(ProcessLauncher::new(config.apps.clone(), engine.aliases())),
            web: Box::new(DuckDuckGo::new(config.web.clone())),
            search: Box::new(WalkSearch::new(
                config.paths.allowlist.clone(),
                config.paths.search_max_depth,
                config.thresholds.local_match_min,
                engine.similarity(),
            )),
            llm: Box::new(OllamaChat::new(config.llm.clone())),
        }
    }
}

/// Intent router
pub struct IntentRouter {
    engine: IntentEngine,
    tools: Toolbox,
}

impl IntentRouter {
    pub fn new(engine: IntentEngine, tools: Toolbox) -> Self {
        Self { engine, tools }
    }

    pub fn from_config(config: AgentConfig) -> Self {
        let engine = IntentEngine::new(config);
        let tools = Toolbox::from_engine(&engine);
        Self::new(engine, tools)
    }

    pub fn engine(&self) -> &IntentEngine {
        &self.engine
    }

    pub fn tools(&self) -> &Toolbox {
        &self.tools
    }

    fn config(&self) -> &AgentConfig {
        self.engine.config()
    }

    /// Process one user turn
    pub fn handle_message(
        &self,
        message: &str,
        session: &mut Session,
        context: &mut DialogueContext,
        force_confirm: bool,
    ) -> ResponseEnvelope {
        let message = message.trim();

        if let Some(pending) = session.pending.take() {
            if force_confirm {
                return self.run_pending(pending);
            }

            return match Reply::classify(message, &self.config().vocabulary) {
                Reply::Affirmative => self.run_pending(pending),
                Reply::Negative => {
                    log::info!("router: cancelled {}", pending.description);
                    ResponseEnvelope::success(format!("Отменено: {}", pending.description))
                }
                Reply::Other => {
                    let description = pending.description.clone();
                    session.pending = Some(pending);
                    ResponseEnvelope::confirmation(REPROMPT)
                        .with_data("pending", Value::String(description))
                }
            };
        }

        if message.is_empty() {
            return ResponseEnvelope::failure("Пустой запрос");
        }

        let parsed = self.engine.parse(message);
        log::debug!(
            "router: {} ({:.2})",
            parsed.intent.command.tag(),
            parsed.intent.confidence
        );
        self.dispatch(parsed.intent, message, session, context, force_confirm)
    }

    fn dispatch(
        &self,
        intent: Intent,
        message: &str,
        session: &mut Session,
        context: &mut DialogueContext,
        force_confirm: bool,
    ) -> ResponseEnvelope {
        let confidence = intent.confidence;

        match intent.command {
            Command::CreateFile { path, content, kind } => {
                log::debug!("router: create {} as {:?}", path, kind);
                self.run_file_op(FileOperation::Create { path, content }, session, force_confirm)
            }
            Command::WriteFile { path, content } => {
                self.run_file_op(FileOperation::Write { path, content }, session, force_confirm)
            }
            Command::AppendFile { path, content } => {
                self.run_file_op(FileOperation::Append { path, content }, session, force_confirm)
            }
            Command::MovePath {
                source,
                destination,
            } => self.run_file_op(
                FileOperation::Move {
                    source,
                    destination,
                },
                session,
                force_confirm,
            ),
            Command::CopyPath {
                source,
                destination,
            } => self.run_file_op(
                FileOperation::Copy {
                    source,
                    destination,
                },
                session,
                force_confirm,
            ),
            Command::DeletePath { path } => {
                self.run_file_op(FileOperation::Delete { path }, session, force_confirm)
            }
            Command::ListDirectory { path } => {
                self.run_file_op(FileOperation::List { path }, session, force_confirm)
            }
            Command::ReadFile { path } => {
                self.run_file_op(FileOperation::Read { path }, session, force_confirm)
            }
            Command::OpenFile {
                target: FileTarget::Path { path },
            } => self.open_path(&path, context),
            Command::OpenFile {
                target: FileTarget::Query { query, domain },
            } => self.open_best_file(&query, domain, context),
            Command::SearchFile { query, domain } => self.search_files(&query, domain, context),
            Command::OpenApp { app } => self.launch_app(&app, context),
            Command::CloseApp { app } => match self.tools.apps.close(&app) {
                Ok(reply) => ResponseEnvelope::success(reply),
                Err(e) => tool_failure(e),
            },
            Command::OpenWeb {
                target: WebTarget::Url { url },
            } => self.open_url(&url, context),
            Command::OpenWeb {
                target: WebTarget::Query { query },
            } => self.search_web(&query, true, context),
            Command::SearchWeb { query } => {
                let open_first = confidence >= self.config().thresholds.web_autoopen;
                self.search_web(&query, open_first, context)
            }
            Command::GenerateAppendText { topic, path, cell } => {
                let prompt = format!(
                    "Напиши короткий текст на тему: {}. Ответь только самим текстом.",
                    topic
                );
                match self.tools.llm.generate(&prompt, &session.model) {
                    Ok(text) => self.run_file_op(
                        FileOperation::Insert { path, text, cell },
                        session,
                        force_confirm,
                    ),
                    Err(e) => tool_failure(e),
                }
            }
            Command::Chat { prompt } => self.chat(&prompt, session),
            Command::OpenBrowser => match self.tools.web.open(&self.config().web.home_page) {
                Ok(url) => ResponseEnvelope::success(format!("Браузер открыт: {}", url)),
                Err(e) => tool_failure(e),
            },
            Command::RefreshApps => match self.tools.apps.refresh() {
                Ok(count) => ResponseEnvelope::success(format!(
                    "Список приложений обновлён, установлено: {}",
                    count
                )),
                Err(e) => tool_failure(e),
            },
            Command::SwitchModel { model } => {
                log::info!("router: model {} -> {}", session.model, model);
                session.model = model;
                ResponseEnvelope::success(format!("Использую модель {}", session.model))
            }
            Command::DesktopPath => {
                let desktop = self.tools.files.desktop_dir();
                ResponseEnvelope::success(format!("Рабочий стол: {}", desktop.display()))
                    .with_data("path", json!(desktop.display().to_string()))
            }
            Command::DesktopListing => self.list_desktop(),
            Command::ContextReference { reference } => self.follow_reference(reference, context),
            Command::ResetContext => {
                context.clear();
                ResponseEnvelope::success("Контекст очищен.")
            }
            Command::Ambiguous {
                possibilities,
                question,
            } => {
                let options: Vec<&str> = possibilities.iter().map(Command::tag).collect();
                ResponseEnvelope::success(question).with_data("options", json!(options))
            }
            Command::Unknown => self.chat(message, session),
        }
    }

    /// Run a file operation through the confirmation gate
    fn run_file_op(
        &self,
        operation: FileOperation,
        session: &mut Session,
        force_confirm: bool,
    ) -> ResponseEnvelope {
        let confirmed = session.auto_confirm || force_confirm;

        match operation.run(self.tools.files.as_ref(), confirmed) {
            Ok(outcome) => self.file_envelope(&operation, outcome),
            Err(ToolError::ConfirmationRequired { path, action }) => {
                log::warn!("router: '{}' on {} needs confirmation", action, path.display());

                let shown = path.display().to_string();
                let report = json!({
                    "path": shown,
                    "exists": path.exists(),
                    "verified": false,
                    "requires_confirmation": true,
                });
                session.pending = Some(PendingAction {
                    description: format!("{}: {}", operation.action(), shown),
                    operation,
                });

                ResponseEnvelope::confirmation(format!(
                    "Требуется подтверждение для пути: {}. Скажите 'да' для подтверждения.",
                    shown
                ))
                .with_data("result", report)
            }
            Err(e) => tool_failure(e),
        }
    }

    /// Replay a parked operation exactly once
    fn run_pending(&self, pending: PendingAction) -> ResponseEnvelope {
        log::info!("router: confirmed {}", pending.description);
        match pending.operation.run(self.tools.files.as_ref(), true) {
            Ok(outcome) => self.file_envelope(&pending.operation, outcome),
            Err(e) => tool_failure(e),
        }
    }

    fn file_envelope(&self, operation: &FileOperation, outcome: FileOutcome) -> ResponseEnvelope {
        let reply = operation.format(&outcome, self.config().dialogue.preview_chars);

        match outcome {
            FileOutcome::Report(report) => {
                let result = serde_json::to_value(&report).unwrap_or(Value::Null);
                ResponseEnvelope::success(reply).with_data("result", result)
            }
            FileOutcome::Listing { path, items } => ResponseEnvelope::success(reply)
                .with_items(items)
                .with_data("path", json!(path.display().to_string())),
            FileOutcome::Content { path, .. } => ResponseEnvelope::success(reply)
                .with_data("path", json!(path.display().to_string())),
        }
    }

    fn open_path(&self, path: &str, context: &mut DialogueContext) -> ResponseEnvelope {
        match self.tools.files.open(path) {
            Ok(opened) => {
                let shown = opened.display().to_string();
                context.set_results(vec![shown.clone()], ResultKind::File);
                ResponseEnvelope::success(format!("Открыл: {}", shown))
            }
            Err(e) => tool_failure(e),
        }
    }

    fn find_files(&self, query: &str, domain: Option<FileDomain>) -> Result<Vec<String>, ToolError> {
        let config = self.config();
        let extensions = domain
            .and_then(|d| config.file_domain(d))
            .map(|entry| entry.extensions.clone())
            .unwrap_or_default();

        self.tools
            .search
            .search(query, &extensions, config.dialogue.max_local_results)
    }

    fn search_files(
        &self,
        query: &str,
        domain: Option<FileDomain>,
        context: &mut DialogueContext,
    ) -> ResponseEnvelope {
        let hits = match self.find_files(query, domain) {
            Ok(hits) => hits,
            Err(e) => return tool_failure(e),
        };

        if hits.is_empty() {
            context.clear_results();
            return ResponseEnvelope::failure("Ничего подходящего не нашёл.");
        }

        let reply = format!(
            "Нашёл следующие варианты:\n{}\nСкажите номер, чтобы открыть файл.",
            numbered(&hits, 1).join("\n")
        );
        context.set_results(hits.clone(), ResultKind::File);
        ResponseEnvelope::success(reply).with_items(hits)
    }

    /// Search locally and open the best match
    fn open_best_file(
        &self,
        query: &str,
        domain: Option<FileDomain>,
        context: &mut DialogueContext,
    ) -> ResponseEnvelope {
        let hits = match self.find_files(query, domain) {
            Ok(hits) => hits,
            Err(e) => return tool_failure(e),
        };

        let Some(best) = hits.first() else {
            context.clear_results();
            return ResponseEnvelope::failure("Ничего подходящего не нашёл.");
        };

        context.set_results(hits.clone(), ResultKind::File);
        let opened = match self.tools.files.open(best) {
            Ok(opened) => opened,
            Err(e) => return tool_failure(e).with_items(hits),
        };

        let mut reply = format!("Открыл: {}", opened.display());
        if hits.len() > 1 {
            reply.push_str("\nЕсли нужен другой вариант, назовите его номер.");
        }
        ResponseEnvelope::success(reply).with_items(hits)
    }

    fn launch_app(&self, app: &str, context: &mut DialogueContext) -> ResponseEnvelope {
        match self.tools.apps.launch(app) {
            Ok(reply) => {
                context.set_results(vec![app.to_string()], ResultKind::App);
                ResponseEnvelope::success(reply)
            }
            Err(ToolError::UnknownApp(name)) => {
                log::warn!("router: unknown app {}", name);
                ResponseEnvelope::failure("Не знаю, как запустить это приложение.")
            }
            Err(e) => tool_failure(e),
        }
    }

    fn open_url(&self, url: &str, context: &mut DialogueContext) -> ResponseEnvelope {
        match self.tools.web.open(url) {
            Ok(opened) => {
                context.set_results(vec![opened.clone()], ResultKind::Web);
                ResponseEnvelope::success(format!("Открыл ссылку: {}", opened))
            }
            Err(e) => tool_failure(e),
        }
    }

    fn search_web(
        &self,
        query: &str,
        open_first: bool,
        context: &mut DialogueContext,
    ) -> ResponseEnvelope {
        let hits = match self
            .tools
            .web
            .search(query, self.config().dialogue.max_web_results)
        {
            Ok(hits) => hits,
            Err(e) => {
                log::warn!("router: web search failed: {}", e);
                return ResponseEnvelope::failure(format!("Не удалось выполнить веб-поиск: {}", e));
            }
        };

        if hits.is_empty() {
            context.clear_results();
            return ResponseEnvelope::failure("Не удалось найти подходящие ссылки.");
        }

        let items: Vec<String> = hits
            .iter()
            .enumerate()
            .map(|(i, hit)| format!("{}) {} - {}", i + 1, hit.title, hit.url))
            .collect();
        context.set_results(hits.iter().map(|h| h.url.clone()).collect(), ResultKind::Web);

        if !open_first {
            let reply = format!(
                "Вот что нашёл:\n{}\nСкажите номер, чтобы открыть ссылку.",
                items.join("\n")
            );
            return ResponseEnvelope::success(reply).with_items(items);
        }

        let top = &hits[0];
        if let Err(e) = self.tools.web.open(&top.url) {
            return tool_failure(e);
        }

        let mut reply = format!("Открываю {}: {}", top.title, top.url);
        if items.len() > 1 {
            reply.push_str("\nДругие результаты:\n");
            reply.push_str(&items[1..].join("\n"));
            reply.push_str("\nСкажите номер, чтобы открыть другую ссылку.");
        }
        ResponseEnvelope::success(reply).with_items(items)
    }

    fn list_desktop(&self) -> ResponseEnvelope {
        let desktop = self.tools.files.desktop_dir();
        let shown = desktop.display().to_string();

        match self.tools.files.list(&shown, true) {
            Ok((path, items)) => {
                let listing = if items.is_empty() {
                    "(пусто)".to_string()
                } else {
                    items.join(", ")
                };
                ResponseEnvelope::success(format!("Рабочий стол ({}): {}", path.display(), listing))
                    .with_items(items)
            }
            Err(e) => {
                log::warn!("router: desktop listing failed: {}", e);
                ResponseEnvelope::failure(format!("Рабочий стол не найден: {}", shown))
            }
        }
    }

    /// Re-open a stored result by pronoun, ordinal or number
    fn follow_reference(
        &self,
        reference: Reference,
        context: &mut DialogueContext,
    ) -> ResponseEnvelope {
        let (target, kind) = match context.resolve(&reference) {
            Ok(resolved) => resolved,
            Err(e) => return ResponseEnvelope::failure(e.to_string()),
        };
        log::debug!("router: {:?} -> {} ({})", reference, target, kind);

        let envelope = match kind {
            ResultKind::Web => match self.tools.web.open(&target) {
                Ok(url) => ResponseEnvelope::success(format!("Открыл ссылку: {}", url)),
                Err(e) => tool_failure(e),
            },
            ResultKind::App => match self.tools.apps.launch(&target) {
                Ok(reply) => ResponseEnvelope::success(reply),
                Err(e) => tool_failure(e),
            },
            ResultKind::File | ResultKind::None => match self.tools.files.open(&target) {
                Ok(path) => ResponseEnvelope::success(format!("Открыл: {}", path.display())),
                Err(e) => tool_failure(e),
            },
        };

        let ambiguous_pronoun = reference == Reference::Pronoun
            && kind != ResultKind::App
            && context.get_results(None).len() > 1;
        if envelope.ok && ambiguous_pronoun {
            let reply = format!("{}\nЕсли нужен другой результат, уточните номер.", envelope.reply);
            return ResponseEnvelope { reply, ..envelope };
        }
        envelope
    }

    fn chat(&self, prompt: &str, session: &Session) -> ResponseEnvelope {
        match self.tools.llm.generate(prompt, &session.model) {
            Ok(text) => ResponseEnvelope::success(text),
            Err(e) => tool_failure(e),
        }
    }
}

fn tool_failure(error: ToolError) -> ResponseEnvelope {
    log::warn!("router: {}", error);
    ResponseEnvelope::failure(format!("Ошибка: {}", error))
}

fn numbered(items: &[String], start: usize) -> Vec<String> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("{}) {}", i + start, item))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::RecordingShell;
    use parking_lot::Mutex;
    use std::path::PathBuf;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[derive(Default)]
    struct FakeApps {
        launched: Mutex<Vec<String>>,
    }

    impl AppLauncher for FakeApps {
        fn resolve(&self, name: &str) -> Option<String> {
            Some(name.to_string())
        }

        fn launch(&self, app: &str) -> Result<String, ToolError> {
            if app == "ghost" {
                return Err(ToolError::UnknownApp(app.to_string()));
            }
            self.launched.lock().push(app.to_string());
            Ok(format!("Приложение '{}' запущено", app))
        }

        fn close(&self, app: &str) -> Result<String, ToolError> {
            Err(ToolError::NotRunning(app.to_string()))
        }

        fn refresh(&self) -> Result<usize, ToolError> {
            Ok(3)
        }
    }

    struct FakeWeb {
        hits: Vec<WebHit>,
        opened: Arc<Mutex<Vec<String>>>,
    }

    impl WebSearch for FakeWeb {
        fn search(&self, _query: &str, max_results: usize) -> Result<Vec<WebHit>, ToolError> {
            Ok(self.hits.iter().take(max_results).cloned().collect())
        }

        fn open(&self, url: &str) -> Result<String, ToolError> {
            self.opened.lock().push(url.to_string());
            Ok(url.to_string())
        }
    }

    struct FakeSearch(Vec<String>);

    impl LocalSearch for FakeSearch {
        fn search(&self, _q: &str, _e: &[String], max: usize) -> Result<Vec<String>, ToolError> {
            Ok(self.0.iter().take(max).cloned().collect())
        }
    }

    struct EchoLlm;

    impl LlmChat for EchoLlm {
        fn generate(&self, prompt: &str, model: &str) -> Result<String, ToolError> {
            Ok(format!("[{}] {}", model, prompt))
        }
    }

    struct Harness {
        router: IntentRouter,
        shell: Arc<RecordingShell>,
        web_opened: Arc<Mutex<Vec<String>>>,
        allowed: TempDir,
        outside: TempDir,
    }

    fn harness(found: Vec<String>) -> Harness {
        let allowed = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        let shell = Arc::new(RecordingShell::default());
        let web_opened = Arc::new(Mutex::new(Vec::new()));

        let mut config = AgentConfig::default();
        config.paths.allowlist = vec![allowed.path().to_path_buf()];
        config.paths.working_dir = Some(allowed.path().to_path_buf());

        let files = FsFileOps::from_config(&config.paths)
            .with_shell(shell.clone())
            .with_desktop(allowed.path().to_path_buf());
        let tools = Toolbox {
            files: Box::new(files),
            apps: Box::new(FakeApps::default()),
            web: Box::new(FakeWeb {
                hits: vec![
                    WebHit {
                        title: "Rust".to_string(),
                        url: "https://www.rust-lang.org".to_string(),
                    },
                    WebHit {
                        title: "Book".to_string(),
                        url: "https://doc.rust-lang.org/book".to_string(),
                    },
                ],
                opened: web_opened.clone(),
            }),
            search: Box::new(FakeSearch(found)),
            llm: Box::new(EchoLlm),
        };

        Harness {
            router: IntentRouter::new(IntentEngine::new(config), tools),
            shell,
            web_opened,
            allowed,
            outside,
        }
    }

    fn turn(h: &Harness, session: &mut Session, ctx: &mut DialogueContext, text: &str) -> ResponseEnvelope {
        h.router.handle_message(text, session, ctx, false)
    }

    #[test]
    fn test_create_inside_allowlist() {
        let h = harness(vec![]);
        let (mut session, mut ctx) = (Session::default(), DialogueContext::default());

        let env = turn(&h, &mut session, &mut ctx, "создай файл test.txt");
        assert!(env.ok, "{}", env.reply);
        assert!(env.reply.contains("exists=True"));
        assert!(h.allowed.path().join("test.txt").is_file());
        assert_eq!(env.data.unwrap()["result"]["status"], "created");
    }

    #[test]
    fn test_outside_allowlist_reprompts_then_cancels() {
        let h = harness(vec![]);
        let (mut session, mut ctx) = (Session::default(), DialogueContext::default());
        let target = h.outside.path().join("x.txt");

        let env = turn(&h, &mut session, &mut ctx, &format!("запиши в {}: данные", target.display()));
        assert!(!env.ok);
        assert!(env.requires_confirmation);
        assert!(!target.exists());
        let pending = session.pending.clone();

        let env = turn(&h, &mut session, &mut ctx, "что?");
        assert!(env.requires_confirmation);
        assert_eq!(env.reply, REPROMPT);
        assert_eq!(session.pending, pending);

        let env = turn(&h, &mut session, &mut ctx, "нет");
        assert!(env.ok);
        assert!(env.reply.starts_with("Отменено: запись файла"));
        assert!(session.pending.is_none());
        assert!(!target.exists());
    }

    #[test]
    fn test_affirmative_runs_pending_once() {
        let h = harness(vec![]);
        let (mut session, mut ctx) = (Session::default(), DialogueContext::default());
        let target = h.outside.path().join("log.txt");
        std::fs::write(&target, "a").unwrap();

        turn(&h, &mut session, &mut ctx, &format!("добавь к {}: b", target.display()));
        let env = turn(&h, &mut session, &mut ctx, "да");
        assert!(env.ok, "{}", env.reply);
        assert!(session.pending.is_none());

        // a second "да" has nothing to confirm and goes to chat
        let env = turn(&h, &mut session, &mut ctx, "да");
        assert!(env.ok);
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "ab");
    }

    #[test]
    fn test_search_then_ordinal_is_idempotent() {
        let found = vec!["/data/a.txt".to_string(), "/data/b.txt".to_string()];
        let h = harness(found.clone());
        let (mut session, mut ctx) = (Session::default(), DialogueContext::default());

        let env = turn(&h, &mut session, &mut ctx, "найди файл отчёт");
        assert!(env.ok);
        assert_eq!(env.items.as_ref(), Some(&found));

        // the fake paths do not exist, so opening fails but the target is resolved
        let first = turn(&h, &mut session, &mut ctx, "открой второй");
        let second = turn(&h, &mut session, &mut ctx, "открой второй");
        assert_eq!(first.reply, second.reply);
        assert!(first.reply.contains("b.txt"));
        assert_eq!(ctx.get_results(None), found);
    }

    #[test]
    fn test_failed_auto_open_keeps_results() {
        let found = vec!["/data/a.txt".to_string(), "/data/b.txt".to_string()];
        let h = harness(found.clone());
        let (mut session, mut ctx) = (Session::default(), DialogueContext::default());

        let env = turn(&h, &mut session, &mut ctx, "открой файл отчёт");
        assert!(!env.ok);
        assert_eq!(env.items.as_ref(), Some(&found));
        assert_eq!(ctx.get_results(None), found);
        assert_eq!(ctx.last_kind(), ResultKind::File);

        let env = turn(&h, &mut session, &mut ctx, "открой 2");
        assert!(env.reply.contains("b.txt"), "{}", env.reply);
    }

    #[test]
    fn test_out_of_range_reference_leaves_context() {
        let h = harness(vec!["/data/a.txt".to_string()]);
        let (mut session, mut ctx) = (Session::default(), DialogueContext::default());

        turn(&h, &mut session, &mut ctx, "найди файл отчёт");
        let before = ctx.last_updated();

        let env = turn(&h, &mut session, &mut ctx, "открой 5");
        assert!(!env.ok);
        assert_eq!(env.reply, "Выберите число от 1 до 1.");
        assert_eq!(ctx.last_updated(), before);
        assert_eq!(ctx.get_results(None).len(), 1);
    }

    #[test]
    fn test_web_search_opens_first_and_stores_urls() {
        let h = harness(vec![]);
        let (mut session, mut ctx) = (Session::default(), DialogueContext::default());

        let env = turn(&h, &mut session, &mut ctx, "найди в интернете rust");
        assert!(env.ok);
        assert!(env.reply.starts_with("Открываю Rust: https://www.rust-lang.org"));
        assert_eq!(ctx.last_kind(), ResultKind::Web);

        let env = turn(&h, &mut session, &mut ctx, "открой ссылку 2");
        assert_eq!(env.reply, "Открыл ссылку: https://doc.rust-lang.org/book");
        assert_eq!(h.web_opened.lock().len(), 2);
    }

    #[test]
    fn test_open_path_records_file_result() {
        let h = harness(vec![]);
        let (mut session, mut ctx) = (Session::default(), DialogueContext::default());
        std::fs::write(h.allowed.path().join("notes.md"), "x").unwrap();

        let env = turn(&h, &mut session, &mut ctx, "открой notes.md");
        assert!(env.ok, "{}", env.reply);
        assert_eq!(h.shell.opened.lock().len(), 1);
        assert_eq!(ctx.last_kind(), ResultKind::File);
    }

    #[test]
    fn test_app_launch_and_unknown_app() {
        let h = harness(vec![]);
        let (mut session, mut ctx) = (Session::default(), DialogueContext::default());

        let env = turn(&h, &mut session, &mut ctx, "запусти калькулятор");
        assert!(env.ok);
        assert_eq!(ctx.get_results(Some(ResultKind::App)), vec!["calc".to_string()]);

        let env = h.router.dispatch(
            Intent::new(Command::OpenApp { app: "ghost".to_string() }, 0.9),
            "",
            &mut session,
            &mut ctx,
            false,
        );
        assert_eq!(env.reply, "Не знаю, как запустить это приложение.");
    }

    #[test]
    fn test_model_switch_and_chat_fallback() {
        let h = harness(vec![]);
        let (mut session, mut ctx) = (Session::default(), DialogueContext::default());

        let env = turn(&h, &mut session, &mut ctx, "используй модель qwen2:7b");
        assert_eq!(env.reply, "Использую модель qwen2:7b");

        let env = turn(&h, &mut session, &mut ctx, "как дела");
        assert_eq!(env.reply, "[qwen2:7b] как дела");
    }

    #[test]
    fn test_reset_and_empty_message() {
        let h = harness(vec!["/data/a.txt".to_string()]);
        let (mut session, mut ctx) = (Session::default(), DialogueContext::default());

        turn(&h, &mut session, &mut ctx, "найди файл отчёт");
        let env = turn(&h, &mut session, &mut ctx, "сбрось контекст");
        assert_eq!(env.reply, "Контекст очищен.");

        let env = turn(&h, &mut session, &mut ctx, "открой первый");
        assert!(!env.ok);
        assert!(env.reply.starts_with("Нет сохранённых результатов"));

        assert!(!turn(&h, &mut session, &mut ctx, "   ").ok);
    }

    #[test]
    fn test_desktop_commands() {
        let h = harness(vec![]);
        let (mut session, mut ctx) = (Session::default(), DialogueContext::default());
        std::fs::write(h.allowed.path().join("a.txt"), "").unwrap();

        let env = turn(&h, &mut session, &mut ctx, "какие файлы есть на рабочем столе");
        assert!(env.ok);
        assert_eq!(env.items, Some(vec!["a.txt".to_string()]));

        let env = turn(&h, &mut session, &mut ctx, "напиши путь до рабочего стола");
        let shown = PathBuf::from(h.allowed.path()).display().to_string();
        assert_eq!(env.reply, format!("Рабочий стол: {}", shown));
    }
}
