//! Agent configuration
//!
//! Everything the engine treats as data lives here: vocabularies, the
//! application alias table, file-domain tables, tuned score thresholds and
//! collaborator settings. The struct is built once (defaults, TOML file or
//! builder) and shared read-only afterwards.

use crate::types::{FileDomain, FileKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failure to load a configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("не удалось прочитать конфигурацию {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("ошибка разбора конфигурации {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub paths: PathsConfig,
    pub apps: BTreeMap<String, AppEntry>,
    pub web: WebConfig,
    pub llm: LlmConfig,
    pub dialogue: DialogueConfig,
    pub similarity: SimilarityBackend,
    pub thresholds: Thresholds,
    pub vocabulary: Vocabulary,
    pub file_domains: Vec<FileDomainEntry>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            apps: default_apps(),
            web: WebConfig::default(),
            llm: LlmConfig::default(),
            dialogue: DialogueConfig::default(),
            similarity: SimilarityBackend::default(),
            thresholds: Thresholds::default(),
            vocabulary: Vocabulary::default(),
            file_domains: default_file_domains(),
        }
    }
}

impl AgentConfig {
    /// Load from a TOML file; missing sections fall back to defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Domain table entry for a file domain
    pub fn file_domain(&self, domain: FileDomain) -> Option<&FileDomainEntry> {
        self.file_domains.iter().find(|entry| entry.domain == domain)
    }

    /// Every extension known to some file domain, lower-case with dot
    pub fn known_extensions(&self) -> impl Iterator<Item = &str> {
        self.file_domains
            .iter()
            .flat_map(|entry| entry.extensions.iter().map(String::as_str))
    }
}

/// Directories and allow-list
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directories where file operations run without confirmation
    pub allowlist: Vec<PathBuf>,

    /// Base for relative paths; defaults to the first allow-listed directory
    pub working_dir: Option<PathBuf>,

    /// Depth limit for the local file walk
    pub search_max_depth: usize,
}

impl Default for PathsConfig {
    fn default() -> Self {
        let allowlist = [dirs::desktop_dir(), dirs::document_dir(), dirs::download_dir()]
            .into_iter()
            .flatten()
            .collect();

        Self {
            allowlist,
            working_dir: None,
            search_max_depth: 8,
        }
    }
}

impl PathsConfig {
    pub fn base_dir(&self) -> PathBuf {
        self.working_dir
            .clone()
            .or_else(|| self.allowlist.first().cloned())
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Launchable application
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppEntry {
    pub title: String,
    pub command: String,
    pub args: Vec<String>,
    /// Executable name used to find running instances when closing
    pub process_name: String,
    pub aliases: Vec<String>,
}

/// Web search and browser settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub home_page: String,
    pub search_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            home_page: "https://duckduckgo.com".to_string(),
            search_url: "https://html.duckduckgo.com/html/".to_string(),
            user_agent: "Mozilla/5.0".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Local LLM (Ollama) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub default_model: String,
    pub system_prompt: String,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:11434".to_string(),
            default_model: "llama3.1:8b".to_string(),
            system_prompt: "Ты дружелюбный локальный помощник Windows. Отвечай кратко и по делу."
                .to_string(),
            timeout_secs: 120,
        }
    }
}

/// Result cache and reply limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogueConfig {
    /// Stored results expire after this many seconds
    pub ttl_secs: u64,
    pub max_local_results: usize,
    pub max_web_results: usize,
    /// Characters of a file shown by "прочитай файл"
    pub preview_chars: usize,
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 900,
            max_local_results: 25,
            max_web_results: 5,
            preview_chars: 500,
        }
    }
}

/// String similarity implementation used for fuzzy alias and file matching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityBackend {
    #[default]
    Lcs,
    Levenshtein,
}

/// Empirically tuned score constants.
///
/// Defaults reproduce the values the assistant shipped with; change them here
/// rather than in code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    // app scorer
    pub app_alias_long: f32,
    pub app_alias_short: f32,
    pub app_min_score: f32,
    /// Fuzzy alias match accepted by the open/close command patterns
    pub alias_fuzzy_min: f32,

    // file scorer
    pub file_hit_base: f32,
    pub file_hit_step: f32,
    pub file_ext_only: f32,
    pub file_ext_step: f32,

    // web scorer
    pub web_hit_base: f32,
    pub web_hit_step: f32,
    pub web_hint_floor: f32,
    pub web_url_floor: f32,
    pub web_domain_floor: f32,

    /// Hits beyond this count add nothing
    pub max_counted_hits: usize,

    // disambiguation
    pub app_strong: f32,
    pub app_strong_margin: f32,
    pub search_floor: f32,
    pub app_medium: f32,
    pub app_medium_margin: f32,
    pub file_open: f32,
    pub file_web_slack: f32,
    pub web_open: f32,
    pub ambiguity_floor: f32,
    pub ambiguity_gap: f32,
    pub app_weak: f32,

    /// Web searches below this confidence list results instead of opening
    pub web_autoopen: f32,
    /// Local search keeps file names scoring at least this much
    pub local_match_min: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            app_alias_long: 0.85,
            app_alias_short: 0.65,
            app_min_score: 0.55,
            alias_fuzzy_min: 0.6,
            file_hit_base: 0.6,
            file_hit_step: 0.08,
            file_ext_only: 0.58,
            file_ext_step: 0.03,
            web_hit_base: 0.6,
            web_hit_step: 0.05,
            web_hint_floor: 0.65,
            web_url_floor: 0.7,
            web_domain_floor: 0.65,
            max_counted_hits: 3,
            app_strong: 0.8,
            app_strong_margin: 0.1,
            search_floor: 0.55,
            app_medium: 0.75,
            app_medium_margin: 0.05,
            file_open: 0.62,
            file_web_slack: 0.05,
            web_open: 0.62,
            ambiguity_floor: 0.55,
            ambiguity_gap: 0.12,
            app_weak: 0.6,
            web_autoopen: 0.6,
            local_match_min: 0.75,
        }
    }
}

/// Keyword phrase that selects a file kind ("документ word" -> .docx)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileKindRule {
    pub phrase: String,
    pub kind: FileKind,
}

/// Word prefix that selects a zero-based result index ("втор" -> 1)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrdinalPrefix {
    pub prefix: String,
    pub index: usize,
}

/// Russian word lists used by the normalizer, matchers and scorers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Vocabulary {
    pub stop_words: Vec<String>,
    pub generic_file_words: Vec<String>,
    pub search_markers: Vec<String>,
    pub negative_search_markers: Vec<String>,
    pub web_search_hints: Vec<String>,
    pub web_keywords: Vec<String>,
    pub affirmative: Vec<String>,
    pub negative: Vec<String>,
    /// Generic nouns accepted after "создай" when no kind phrase matches
    pub create_nouns: Vec<String>,
    pub file_kinds: Vec<FileKindRule>,
    pub ordinal_prefixes: Vec<OrdinalPrefix>,
    pub last_prefix: String,
    /// Extra aliases merged into the app table without overriding it
    pub app_extra_aliases: BTreeMap<String, Vec<String>>,
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            stop_words: words(&[
                "а", "еще", "ещё", "в", "во", "это", "этот", "эта", "эту", "эти", "тот", "та",
                "то", "на", "надо", "нужно", "нужен", "нужна", "нужны", "мне", "пожалуйста",
                "пожалуй", "давай", "да", "нет", "хочу", "хотел", "хотела", "можно", "дайте",
                "дай", "глянь", "глянуть", "посмотри", "посмотреть", "посмотри-ка", "послушай",
                "послушать", "покажи", "показать", "открой", "открыть", "запусти", "запустить",
                "запуск", "просто", "там", "его", "ее", "её", "их", "по", "из", "для", "как",
                "что", "какой", "какая", "какие", "тут", "вот", "бы", "быть", "плиз", "pls",
                "please", "можешь", "могу", "сильно", "прям", "очень",
            ]),
            generic_file_words: words(&[
                "файл", "файлы", "папка", "папку", "каталог", "документ", "документы",
            ]),
            search_markers: words(&[
                "найди",
                "найти",
                "поищи",
                "поищем",
                "ищи",
                "поиск",
                "хочу посмотреть в интернете",
                "посмотри в интернете",
                "искать",
                "отыщи",
            ]),
            negative_search_markers: words(&["не ищи", "не надо искать", "без интернета"]),
            web_search_hints: words(&[
                "в интернете",
                "в сети",
                "в гугле",
                "в google",
                "в яндексе",
                "в yandex",
                "в бинг",
                "в bing",
                "в вебе",
            ]),
            web_keywords: words(&[
                "документация", "страница", "сайт", "страничку", "википедия", "wiki", "docs",
                "официальный", "официальную", "блог", "мануал", "руководство", "форум", "гайд",
                "tutorial", "инструкция", "описание", "продукт", "release",
            ]),
            affirmative: words(&["да", "подтверждаю", "конечно", "ок", "ok", "yes", "давай"]),
            negative: words(&["нет", "отмена", "не надо", "no", "отменить"]),
            create_nouns: words(&["файл", "документ"]),
            file_kinds: vec![
                rule("текстовый файл", FileKind::Text),
                rule("текстовый документ", FileKind::Text),
                rule("документ word", FileKind::Word),
                rule("документ ворд", FileKind::Word),
                rule("word документ", FileKind::Word),
                rule("вордовский документ", FileKind::Word),
                rule("таблицу excel", FileKind::Excel),
                rule("таблица excel", FileKind::Excel),
                rule("excel таблицу", FileKind::Excel),
                rule("таблицу", FileKind::Excel),
                rule("таблица", FileKind::Excel),
                rule("презентацию", FileKind::PowerPoint),
                rule("презентация", FileKind::PowerPoint),
                rule("markdown файл", FileKind::Markdown),
                rule("заметку", FileKind::Markdown),
                rule("csv файл", FileKind::Csv),
                rule("json файл", FileKind::Json),
                rule("pdf", FileKind::Pdf),
            ],
            ordinal_prefixes: vec![
                ordinal("перв", 0),
                ordinal("втор", 1),
                ordinal("трет", 2),
                ordinal("четв", 3),
                ordinal("пят", 4),
            ],
            last_prefix: "последн".to_string(),
            app_extra_aliases: [
                ("calc", &["калькулятор", "посчитать", "calculator", "calc"][..]),
                ("notepad", &["блокнот", "заметки", "notepad", "текстовый редактор"][..]),
                ("excel", &["excel", "ексель", "таблицы", "таблицу", "spreadsheet"][..]),
                ("word", &["word", "ворд", "документы word"][..]),
                ("chrome", &["браузер", "chrome", "хром", "google"][..]),
                (
                    "vscode",
                    &["vscode", "vs code", "редактор кода", "код", "visual studio code"][..],
                ),
            ]
            .into_iter()
            .map(|(key, aliases)| (key.to_string(), words(aliases)))
            .collect(),
        }
    }
}

fn rule(phrase: &str, kind: FileKind) -> FileKindRule {
    FileKindRule {
        phrase: phrase.to_string(),
        kind,
    }
}

fn ordinal(prefix: &str, index: usize) -> OrdinalPrefix {
    OrdinalPrefix {
        prefix: prefix.to_string(),
        index,
    }
}

/// Keyword and extension sets for one file domain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileDomainEntry {
    pub domain: FileDomain,
    pub keywords: Vec<String>,
    pub extensions: Vec<String>,
    /// Terms appended to the search query for this domain
    pub default_terms: Vec<String>,
}

fn domain(
    domain: FileDomain,
    keywords: &[&str],
    extensions: &[&str],
    default_terms: &[&str],
) -> FileDomainEntry {
    FileDomainEntry {
        domain,
        keywords: words(keywords),
        extensions: words(extensions),
        default_terms: words(default_terms),
    }
}

fn default_file_domains() -> Vec<FileDomainEntry> {
    vec![
        domain(
            FileDomain::Documents,
            &[
                "документ", "документы", "отчёт", "отчет", "смета", "invoice", "инвойс",
                "контракт", "презентация", "спецификация", "спека", "протокол", "план",
                "таблица", "заметка",
            ],
            &[".pdf", ".doc", ".docx", ".txt", ".rtf", ".xlsx", ".xls", ".ppt", ".pptx"],
            &["pdf", "docx", "xlsx"],
        ),
        domain(
            FileDomain::Images,
            &[
                "фото", "фотку", "фотография", "картинка", "картинку", "изображение", "скрин",
                "скриншот", "снимок", "превью",
            ],
            &[".png", ".jpg", ".jpeg", ".bmp", ".gif", ".webp", ".svg"],
            &["png", "jpg", "screenshot"],
        ),
        domain(
            FileDomain::Audio,
            &["музыка", "музыку", "трек", "треков", "песня", "песню", "аудио", "sound"],
            &[".mp3", ".wav", ".flac", ".aac", ".ogg"],
            &["mp3", "audio"],
        ),
        domain(
            FileDomain::Video,
            &["видео", "ролик", "фильм", "запись", "клип"],
            &[".mp4", ".mkv", ".avi", ".mov", ".wmv", ".webm"],
            &["mp4", "video"],
        ),
        domain(
            FileDomain::Archives,
            &["архив", "архивы", "backup", "бэкап"],
            &[".zip", ".rar", ".7z", ".tar", ".gz"],
            &["zip", "rar"],
        ),
    ]
}

fn app(title: &str, command: &str, process_name: &str, aliases: &[&str]) -> AppEntry {
    AppEntry {
        title: title.to_string(),
        command: command.to_string(),
        args: vec![],
        process_name: process_name.to_string(),
        aliases: words(aliases),
    }
}

fn default_apps() -> BTreeMap<String, AppEntry> {
    let mut apps = BTreeMap::new();
    apps.insert(
        "calc".to_string(),
        app(
            "Калькулятор",
            "calc.exe",
            "CalculatorApp.exe",
            &["калькулятор", "calculator", "calc"],
        ),
    );
    apps.insert(
        "notepad".to_string(),
        app(
            "Блокнот",
            "notepad.exe",
            "notepad.exe",
            &["блокнот", "notepad", "текстовый редактор"],
        ),
    );
    apps.insert(
        "word".to_string(),
        app(
            "Microsoft Word",
            r"C:\Program Files\Microsoft Office\root\Office16\WINWORD.EXE",
            "WINWORD.EXE",
            &["word", "ворд", "microsoft word"],
        ),
    );
    apps.insert(
        "excel".to_string(),
        app(
            "Microsoft Excel",
            r"C:\Program Files\Microsoft Office\root\Office16\EXCEL.EXE",
            "EXCEL.EXE",
            &["excel", "ексель", "microsoft excel"],
        ),
    );
    apps.insert(
        "chrome".to_string(),
        app(
            "Google Chrome",
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            "chrome.exe",
            &["chrome", "хром", "google chrome"],
        ),
    );
    apps.insert(
        "firefox".to_string(),
        app(
            "Mozilla Firefox",
            r"C:\Program Files\Mozilla Firefox\firefox.exe",
            "firefox.exe",
            &["firefox", "фаерфокс", "мозилла"],
        ),
    );
    apps.insert(
        "vscode".to_string(),
        app(
            "Visual Studio Code",
            r"%LOCALAPPDATA%\Programs\Microsoft VS Code\Code.exe",
            "Code.exe",
            &["vscode", "vs code", "visual studio code", "вс код"],
        ),
    );
    apps
}
