//! Intent Parser - explicit command patterns
//!
//! An ordered table of `(regex, extractor)` rules; the first rule whose
//! pattern matches and whose extractor accepts the captures wins. Utterances
//! no rule accepts go on to the domain scorers.

use crate::config::{AgentConfig, FileDomainEntry, FileKindRule, OrdinalPrefix};
use crate::scorers::AppAliases;
use crate::types::*;
use regex::{Captures, Regex};
use std::collections::HashSet;
use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

type Extractor = fn(&IntentParser, &Captures<'_>) -> Option<Command>;

/// One command shape
struct Rule {
    name: &'static str,
    pattern: Regex,
    confidence: f32,
    /// Match against the raw text, trailing `?`/`!` included
    raw: bool,
    extract: Extractor,
}

impl Rule {
    fn new(name: &'static str, pattern: &str, confidence: f32, extract: Extractor) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).expect("static command pattern"),
            confidence,
            raw: false,
            extract,
        }
    }

    /// Content-carrying commands keep their punctuation
    fn raw(mut self) -> Self {
        self.raw = true;
        self
    }
}

/// Pattern table in priority order
struct CommandPatterns {
    rules: Vec<Rule>,
}

impl Default for CommandPatterns {
    fn default() -> Self {
        let rules = vec![
            Rule::new(
                "reset_context",
                r"(?i)^(?:сбрось\s+контекст|очисти\s+память|забудь\s+результаты)$",
                1.0,
                |_, _| Some(Command::ResetContext),
            ),
            Rule::new(
                "context_pronoun",
                r"(?i)^(?:открой|покажи|запусти)\s+(?:его|её|ее|их|это|этот|эту)(?:\s+пожалуйста)?$",
                0.95,
                |_, _| {
                    Some(Command::ContextReference {
                        reference: Reference::Pronoun,
                    })
                },
            ),
            Rule::new(
                "context_index",
                r"(?i)^(?:открой|покажи|запусти)\s+(?:(?:ссылку|файл|результат|вариант|номер)\s+)?(\d+|[а-яё]+)$",
                0.95,
                |p, caps| {
                    let reference = p.reference(&caps[1])?;
                    Some(Command::ContextReference { reference })
                },
            ),
            Rule::new(
                "create_file",
                r"(?is)^(?:создай|создать|сделай)\s+(?:нов(?:ый|ую|ое)\s+)?(.+)$",
                0.95,
                IntentParser::extract_create,
            )
            .raw(),
            Rule::new(
                "write_file",
                r"(?is)^(?:запиши|записать|перезапиши|перезаписать)\s+(?:в\s+|во\s+)?(.+)$",
                0.95,
                |p, caps| {
                    let (path, content) = p.extract_content(&caps[1]);
                    let path = strip_file_noun(&path);
                    if path.is_empty() {
                        return None;
                    }
                    Some(Command::WriteFile {
                        path,
                        content: content?,
                    })
                },
            )
            .raw(),
            Rule::new(
                "append_file",
                r"(?is)^(?:добавь|добавить|допиши|дописать)\s+(?:к|в|во)\s+(.+)$",
                0.95,
                |p, caps| {
                    let (path, content) = p.extract_content(&caps[1]);
                    let path = strip_file_noun(&path);
                    if path.is_empty() {
                        return None;
                    }
                    Some(Command::AppendFile {
                        path,
                        content: content?,
                    })
                },
            )
            .raw(),
            Rule::new(
                "generate_append_text",
                r"(?is)^(?:сгенерируй|придумай|напиши)\s+(?:текст\s+)?(?:про|о|об|на\s+тему)\s+(.+?)\s+и\s+(?:добавь|вставь|запиши)\s+(?:в|во)\s+(?:ячейку\s+([a-z]{1,3}\d+)\s+)?(?:файла?\s+|таблицу\s+|таблицы\s+|документ\s+)?(.+)$",
                0.9,
                |_, caps| {
                    Some(Command::GenerateAppendText {
                        topic: unquote(&caps[1]),
                        path: unquote(&caps[3]),
                        cell: caps.get(2).map(|m| m.as_str().to_uppercase()),
                    })
                },
            )
            .raw(),
            Rule::new(
                "move_path",
                r"(?i)^(?:перемести|переместить)\s+(.+?)\s+в\s+(.+)$",
                0.9,
                |_, caps| {
                    Some(Command::MovePath {
                        source: unquote(&caps[1]),
                        destination: unquote(&caps[2]),
                    })
                },
            ),
            Rule::new(
                "copy_path",
                r"(?i)^(?:скопируй|скопировать)\s+(.+?)\s+в\s+(.+)$",
                0.9,
                |_, caps| {
                    Some(Command::CopyPath {
                        source: unquote(&caps[1]),
                        destination: unquote(&caps[2]),
                    })
                },
            ),
            Rule::new(
                "delete_path",
                r"(?i)^(?:удали|удалить)\s+(?:файл\s+|папку\s+|каталог\s+)?(.+)$",
                0.9,
                |_, caps| Some(Command::DeletePath { path: unquote(&caps[1]) }),
            ),
            Rule::new(
                "list_directory",
                r"(?i)^(?:покажи|список|выведи|list)\s+(?:содержимое\s+)?(?:каталога?|папки|папку)\s+(.+)$",
                0.9,
                |_, caps| Some(Command::ListDirectory { path: unquote(&caps[1]) }),
            ),
            Rule::new(
                "read_file",
                r"(?i)^(?:прочитай|прочти|прочитать)\s+(?:файл\s+)?(.+)$",
                0.9,
                |_, caps| Some(Command::ReadFile { path: unquote(&caps[1]) }),
            ),
            Rule::new(
                "desktop_path",
                r"(?i)^(?:напиши|скажи|какой|где)\s+(?:путь\s+(?:до|к)\s+)?рабоч(?:его|ему|ий)\s+стол(?:а|у)?$",
                0.9,
                |_, _| Some(Command::DesktopPath),
            ),
            Rule::new(
                "desktop_listing",
                r"(?i)^(?:какие\s+файлы\s+(?:есть\s+)?на\s+рабочем\s+столе|что\s+(?:лежит\s+|есть\s+)?на\s+рабочем\s+столе|покажи\s+рабочий\s+стол)$",
                0.9,
                |_, _| Some(Command::DesktopListing),
            ),
            Rule::new(
                "open_file",
                r"(?i)^(?:открой|открыть)\s+(?:файл|папку|каталог)\s+(.+)$",
                0.9,
                |p, caps| {
                    let target = unquote(&caps[1]);
                    let target = if p.looks_like_file(&target) {
                        FileTarget::Path { path: target }
                    } else {
                        FileTarget::Query {
                            domain: p.domain_for(&target),
                            query: target,
                        }
                    };
                    Some(Command::OpenFile { target })
                },
            ),
            Rule::new(
                "close_app",
                r"(?i)^(?:закрой|закрыть|выключи)\s+(?:приложение\s+|программу\s+)?(.+)$",
                0.9,
                |p, caps| {
                    let app = p.aliases.best_match(&caps[1], p.alias_fuzzy_min)?;
                    Some(Command::CloseApp { app })
                },
            ),
            Rule::new(
                "open_browser",
                r"(?i)^(?:открой|открыть|запусти|запустить)\s+браузер$",
                0.9,
                |_, _| Some(Command::OpenBrowser),
            ),
            Rule::new(
                "open_app",
                r"(?i)^(?:открой|открыть|запусти|запустить|включи)\s+(?:приложение\s+|программу\s+)?(.+)$",
                0.9,
                |p, caps| {
                    let target = caps[1].trim();
                    if p.looks_like_file(target) || p.url.is_match(target) {
                        return None;
                    }
                    let app = p.aliases.best_match(target, p.alias_fuzzy_min)?;
                    Some(Command::OpenApp { app })
                },
            ),
            Rule::new(
                "switch_model",
                r"(?i)^(?:используй|переключись\s+на|смени)\s+модель\s+(?:на\s+)?(\S+)$",
                0.95,
                |_, caps| Some(Command::SwitchModel { model: caps[1].to_string() }),
            ),
            Rule::new(
                "refresh_apps",
                r"(?i)^(?:обнови|обновить|пересканируй)\s+(?:список\s+)?(?:приложени[йя]|программ)$",
                0.95,
                |_, _| Some(Command::RefreshApps),
            ),
            Rule::new(
                "search_file",
                r"(?i)^(?:найди|найти|поищи|отыщи)\s+(?:мне\s+)?(?:файлы?|документы?)\s+(.+)$",
                0.9,
                |p, caps| {
                    let query = unquote(&caps[1]);
                    Some(Command::SearchFile {
                        domain: p.domain_for(&query),
                        query,
                    })
                },
            ),
            Rule::new(
                "open_generic",
                r"(?i)^(?:открой|открыть|покажи)\s+(.+)$",
                0.85,
                |p, caps| {
                    let target = unquote(&caps[1]);
                    p.looks_like_file(&target).then(|| Command::OpenFile {
                        target: FileTarget::Path { path: target },
                    })
                },
            ),
            Rule::new(
                "open_url",
                r"(?i)^(?:открой|открыть|зайди\s+на|перейди\s+на)\s+(?:сайт\s+|ссылку\s+|страницу\s+)?(\S+)$",
                0.9,
                |p, caps| {
                    let url = caps[1].trim_end_matches(&['.', ','][..]);
                    if !url.contains("://") && p.has_file_extension(url) {
                        return None;
                    }
                    p.url.is_match(url).then(|| Command::OpenWeb {
                        target: WebTarget::Url { url: url.to_string() },
                    })
                },
            ),
            Rule::new(
                "search_web",
                r"(?i)^(?:(?:найди|найти|поищи|ищи)\s+(?:в\s+(?:интернете|сети|гугле|google|яндексе)\s+|страницу\s+|сайт\s+)|загугли\s+|погугли\s+)(.+)$",
                0.9,
                |_, caps| Some(Command::SearchWeb { query: unquote(&caps[1]) }),
            ),
            Rule::new(
                "search_local",
                r"(?i)^(?:найди|найти|поищи|ищи)\s+(.+?)\s+(?:на\s+диске|на\s+компьютере|на\s+пк|локально)$",
                0.85,
                |p, caps| {
                    let query = unquote(&caps[1]);
                    Some(Command::SearchFile {
                        domain: p.domain_for(&query),
                        query,
                    })
                },
            ),
            Rule::new(
                "chat",
                r"(?is)^(?:расскажи|объясни|ответь|спроси\s+модель)\s+(.+)$",
                0.8,
                |_, caps| Some(Command::Chat { prompt: caps[0].trim().to_string() }),
            )
            .raw(),
        ];

        Self { rules }
    }
}

/// Intent parser for explicit commands
pub struct IntentParser {
    patterns: CommandPatterns,
    aliases: Arc<AppAliases>,
    alias_fuzzy_min: f32,
    /// Longest phrase first
    file_kinds: Vec<FileKindRule>,
    create_nouns: Vec<String>,
    ordinal_prefixes: Vec<OrdinalPrefix>,
    last_prefix: String,
    file_domains: Vec<FileDomainEntry>,
    /// Every file-domain extension, lower-case with dot
    file_extensions: HashSet<String>,
    content_marker: Regex,
    url: Regex,
}

impl IntentParser {
    pub fn new(config: &AgentConfig, aliases: Arc<AppAliases>) -> Self {
        let vocabulary = &config.vocabulary;

        let mut file_kinds = vocabulary.file_kinds.clone();
        file_kinds.sort_by_key(|rule| std::cmp::Reverse(rule.phrase.chars().count()));

        let file_extensions = config.known_extensions().map(str::to_lowercase).collect();

        Self {
            patterns: CommandPatterns::default(),
            aliases,
            alias_fuzzy_min: config.thresholds.alias_fuzzy_min,
            file_kinds,
            create_nouns: vocabulary.create_nouns.clone(),
            ordinal_prefixes: vocabulary.ordinal_prefixes.clone(),
            last_prefix: vocabulary.last_prefix.clone(),
            file_domains: config.file_domains.clone(),
            file_extensions,
            content_marker: Regex::new(
                r"(?i)\s(?:с\s+текстом|с\s+содержимым|с\s+содержанием|текстом|текст|содержимое)(?:\s*[:：]\s*|\s+)",
            )
            .expect("static content pattern"),
            url: Regex::new(
                r"(?i)^(?:https?://\S+|www\.\S+|[a-z0-9-]+(?:\.[a-z0-9-]+)*\.[a-z]{2,}(?:/\S*)?)$",
            )
            .expect("static url pattern"),
        }
    }

    /// First accepted rule, or `None` when the scorers should decide
    pub fn parse(&self, input: &str) -> Option<ParseResult> {
        let raw = input.trim();
        if raw.is_empty() {
            return None;
        }
        let stripped = raw.trim_end_matches(&['?', '!'][..]).trim_end();

        for rule in &self.patterns.rules {
            let text = if rule.raw { raw } else { stripped };
            let Some(caps) = rule.pattern.captures(text) else {
                continue;
            };

            match (rule.extract)(self, &caps) {
                Some(command) => {
                    log::debug!("parser: rule '{}' -> {}", rule.name, command.tag());
                    return Some(ParseResult::single(Intent::new(command, rule.confidence)));
                }
                None => log::trace!("parser: rule '{}' matched but declined", rule.name),
            }
        }

        None
    }

    /// Split `<head> с текстом <value>` or `<head>: <value>`.
    ///
    /// Whichever separator comes first wins. A drive colon (`C:\`) is never a
    /// separator, and marker words inside quotes belong to the value. The
    /// value is `None` when the text carries no content at all.
    pub fn extract_content(&self, text: &str) -> (String, Option<String>) {
        let quoted = quoted_spans(text);
        let colon = separator_colon(text, &quoted);

        let marker = self.content_marker.find_iter(text).find(|m| {
            !quoted.iter().any(|span| span.contains(&m.start()))
                && colon.map_or(true, |(index, _)| m.start() < index)
        });
        if let Some(marker) = marker {
            return (
                unquote(&text[..marker.start()]),
                Some(unquote(&text[marker.end()..])),
            );
        }

        match colon {
            Some((index, width)) => (
                unquote(&text[..index]),
                Some(unquote(&text[index + width..])),
            ),
            None => (unquote(text), None),
        }
    }

    /// Extension of a document kind or of any configured file domain
    pub fn has_file_extension(&self, target: &str) -> bool {
        let Some(ext) = Path::new(target.trim()).extension() else {
            return false;
        };
        let ext = ext.to_string_lossy().to_lowercase();
        FileKind::from_extension(&ext).is_some() || self.file_extensions.contains(&format!(".{}", ext))
    }

    /// Path-shaped target: known extension, separator, drive, `~`, `.` or `%` prefix
    pub fn looks_like_file(&self, target: &str) -> bool {
        let target = target.trim();
        if target.is_empty() || target.contains("://") {
            return false;
        }

        let bytes = target.as_bytes();
        let has_drive = bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':';

        self.has_file_extension(target)
            || target.contains('/')
            || target.contains('\\')
            || has_drive
            || target.starts_with('~')
            || target.starts_with('.')
            || target.starts_with('%')
    }

    fn extract_create(&self, caps: &Captures<'_>) -> Option<Command> {
        let rest = caps[1].trim();

        let (rest, kind) = self
            .file_kinds
            .iter()
            .find_map(|rule| strip_phrase(rest, &rule.phrase).map(|r| (r, Some(rule.kind))))
            .or_else(|| {
                self.create_nouns
                    .iter()
                    .find_map(|noun| strip_phrase(rest, noun).map(|r| (r, None)))
            })?;

        let (name, content) = self.extract_content(rest);
        if name.is_empty() {
            return None;
        }

        let (path, kind) = infer_file_kind(&name, kind);
        Some(Command::CreateFile {
            path,
            content: content.unwrap_or_default(),
            kind,
        })
    }

    /// Digits, ordinal words and "последний"; anything else declines
    fn reference(&self, word: &str) -> Option<Reference> {
        if let Ok(number) = word.parse::<usize>() {
            return Some(Reference::Number(number));
        }

        let word = word.to_lowercase();
        if !self.last_prefix.is_empty() && word.starts_with(&self.last_prefix) {
            return Some(Reference::Last);
        }
        self.ordinal_prefixes
            .iter()
            .find(|ordinal| word.starts_with(&ordinal.prefix))
            .map(|ordinal| Reference::Ordinal(ordinal.index))
    }

    /// File domain named by a keyword or extension in the query
    fn domain_for(&self, query: &str) -> Option<FileDomain> {
        let lowered = query.to_lowercase();
        let tokens: Vec<&str> = lowered
            .split(|c: char| !(c.is_alphanumeric() || c == '-'))
            .filter(|t| !t.is_empty())
            .collect();

        self.file_domains
            .iter()
            .find(|entry| {
                tokens.iter().any(|t| entry.keywords.iter().any(|k| k == t))
                    || entry.extensions.iter().any(|ext| lowered.ends_with(ext.as_str()))
            })
            .map(|entry| entry.domain)
    }
}

/// Byte offset and width of the first `:`/`：` that is neither a drive colon
/// nor inside quotes
fn separator_colon(text: &str, quoted: &[Range<usize>]) -> Option<(usize, usize)> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();

    for (pos, &(index, c)) in chars.iter().enumerate() {
        if (c != ':' && c != '：') || quoted.iter().any(|span| span.contains(&index)) {
            continue;
        }
        let is_drive = c == ':'
            && pos >= 1
            && chars[pos - 1].1.is_ascii_alphabetic()
            && (pos == 1 || !chars[pos - 2].1.is_alphanumeric())
            && matches!(chars.get(pos + 1), Some((_, '\\' | '/')));
        if !is_drive {
            return Some((index, c.len_utf8()));
        }
    }
    None
}

/// Byte ranges of balanced quoted spans, quotes included
fn quoted_spans(text: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut chars = text.char_indices();

    while let Some((start, c)) = chars.next() {
        let Some(&(_, close)) = QUOTE_PAIRS.iter().find(|(open, _)| *open == c) else {
            continue;
        };
        if let Some((end, _)) = chars.by_ref().find(|&(_, next)| next == close) {
            spans.push(start..end + close.len_utf8());
        }
    }
    spans
}

const QUOTE_PAIRS: [(char, char); 4] = [('"', '"'), ('\'', '\''), ('«', '»'), ('“', '”')];

/// Quoted values keep their inside verbatim, bare values are trimmed
pub fn unquote(value: &str) -> String {
    let trimmed = value.trim();
    let mut chars = trimmed.chars();
    if let (Some(first), Some(last)) = (chars.next(), chars.next_back()) {
        if QUOTE_PAIRS.iter().any(|&(open, close)| first == open && last == close) {
            let inner = &trimmed[first.len_utf8()..trimmed.len() - last.len_utf8()];
            return inner.to_string();
        }
    }
    trimmed.to_string()
}

/// Case-insensitive phrase prefix followed by whitespace or the end
fn strip_phrase<'a>(text: &'a str, phrase: &str) -> Option<&'a str> {
    let count = phrase.chars().count();
    let end = text
        .char_indices()
        .nth(count)
        .map_or(text.len(), |(index, _)| index);
    if text[..end].chars().count() != count || text[..end].to_lowercase() != phrase {
        return None;
    }

    let rest = &text[end..];
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        Some(rest.trim_start())
    } else {
        None
    }
}

fn strip_file_noun(path: &str) -> String {
    ["файлу", "файл"]
        .iter()
        .find_map(|noun| strip_phrase(path, noun))
        .filter(|rest| !rest.is_empty())
        .map(unquote)
        .unwrap_or_else(|| path.to_string())
}

/// Explicit known extension wins; otherwise append the inferred one
pub fn infer_file_kind(name: &str, kind: Option<FileKind>) -> (String, Option<FileKind>) {
    let explicit = Path::new(name)
        .extension()
        .and_then(|ext| FileKind::from_extension(&ext.to_string_lossy()));

    match explicit {
        Some(explicit) => (name.to_string(), Some(explicit)),
        None => {
            let kind = kind.unwrap_or(FileKind::Text);
            (format!("{}{}", name, kind.extension()), Some(kind))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::LcsRatio;

    fn parser() -> IntentParser {
        let config = AgentConfig::default();
        let aliases = Arc::new(AppAliases::from_config(&config, Arc::new(LcsRatio)));
        IntentParser::new(&config, aliases)
    }

    fn command(text: &str) -> Command {
        parser()
            .parse(text)
            .map(|result| result.intent.command)
            .unwrap_or(Command::Unknown)
    }

    #[test]
    fn test_parse_create_with_quoted_content() {
        match command(r#"создай файл test.txt с текстом "  Привет, мир  ""#) {
            Command::CreateFile { path, content, kind } => {
                assert_eq!(path, "test.txt");
                assert_eq!(content, "  Привет, мир  ");
                assert_eq!(kind, Some(FileKind::Text));
            }
            other => panic!("Expected CreateFile, got: {:?}", other),
        }
    }

    #[test]
    fn test_parse_create_infers_kind() {
        match command("создай документ word отчёт") {
            Command::CreateFile { path, content, kind } => {
                assert_eq!(path, "отчёт.docx");
                assert!(content.is_empty());
                assert_eq!(kind, Some(FileKind::Word));
            }
            other => panic!("Expected CreateFile, got: {:?}", other),
        }

        match command("создай заметку план: купить хлеб") {
            Command::CreateFile { path, content, .. } => {
                assert_eq!(path, "план.md");
                assert_eq!(content, "купить хлеб");
            }
            other => panic!("Expected CreateFile, got: {:?}", other),
        }
    }

    #[test]
    fn test_parse_write_skips_drive_colon() {
        match command(r"запиши в C:\temp\a.txt: данные") {
            Command::WriteFile { path, content } => {
                assert_eq!(path, r"C:\temp\a.txt");
                assert_eq!(content, "данные");
            }
            other => panic!("Expected WriteFile, got: {:?}", other),
        }
    }

    #[test]
    fn test_parse_write_keeps_punctuation() {
        assert_eq!(
            command("запиши в test.txt: привет!"),
            Command::WriteFile {
                path: "test.txt".to_string(),
                content: "привет!".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_append() {
        assert_eq!(
            command("добавь в файл log.txt текст «строка»"),
            Command::AppendFile {
                path: "log.txt".to_string(),
                content: "строка".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_generate_into_cell() {
        match command("сгенерируй текст про котиков и вставь в ячейку b3 файла data.csv") {
            Command::GenerateAppendText { topic, path, cell } => {
                assert_eq!(topic, "котиков");
                assert_eq!(path, "data.csv");
                assert_eq!(cell.as_deref(), Some("B3"));
            }
            other => panic!("Expected GenerateAppendText, got: {:?}", other),
        }
    }

    #[test]
    fn test_parse_move_and_delete() {
        assert_eq!(
            command("перемести a.txt в архив"),
            Command::MovePath {
                source: "a.txt".to_string(),
                destination: "архив".to_string(),
            }
        );
        assert_eq!(
            command("удали файл old.txt"),
            Command::DeletePath {
                path: "old.txt".to_string()
            }
        );
    }

    #[test]
    fn test_parse_context_references() {
        let reference = |text: &str| match command(text) {
            Command::ContextReference { reference } => reference,
            other => panic!("Expected ContextReference for '{}', got: {:?}", text, other),
        };

        assert_eq!(reference("открой его"), Reference::Pronoun);
        assert_eq!(reference("открой 2"), Reference::Number(2));
        assert_eq!(reference("открой второй"), Reference::Ordinal(1));
        assert_eq!(reference("покажи ссылку третью"), Reference::Ordinal(2));
        assert_eq!(reference("открой последний"), Reference::Last);
        assert_eq!(command("сбрось контекст"), Command::ResetContext);
    }

    #[test]
    fn test_non_ordinal_word_falls_through_to_app() {
        assert_eq!(
            command("открой блокнот"),
            Command::OpenApp {
                app: "notepad".to_string()
            }
        );
        assert_eq!(
            command("закрой калькулятор"),
            Command::CloseApp {
                app: "calc".to_string()
            }
        );
    }

    #[test]
    fn test_parse_open_targets() {
        assert_eq!(
            command("открой ~/notes.md"),
            Command::OpenFile {
                target: FileTarget::Path {
                    path: "~/notes.md".to_string()
                }
            }
        );
        assert_eq!(
            command("открой rust-lang.org"),
            Command::OpenWeb {
                target: WebTarget::Url {
                    url: "rust-lang.org".to_string()
                }
            }
        );
        assert_eq!(command("открой браузер"), Command::OpenBrowser);
    }

    #[test]
    fn test_parse_searches() {
        match command("найди файл отчёт") {
            Command::SearchFile { query, domain } => {
                assert_eq!(query, "отчёт");
                assert_eq!(domain, Some(FileDomain::Documents));
            }
            other => panic!("Expected SearchFile, got: {:?}", other),
        }
        assert_eq!(
            command("найди в интернете погоду в Казани?"),
            Command::SearchWeb {
                query: "погоду в Казани".to_string()
            }
        );
        assert!(matches!(
            command("поищи фото кота на диске"),
            Command::SearchFile {
                domain: Some(FileDomain::Images),
                ..
            }
        ));
    }

    #[test]
    fn test_supplemented_commands() {
        assert_eq!(
            command("используй модель qwen2:7b"),
            Command::SwitchModel {
                model: "qwen2:7b".to_string()
            }
        );
        assert_eq!(command("напиши путь до рабочего стола"), Command::DesktopPath);
        assert_eq!(command("какие файлы есть на рабочем столе"), Command::DesktopListing);
        assert_eq!(command("обнови список приложений"), Command::RefreshApps);
        assert_eq!(
            command("прочитай файл notes.txt"),
            Command::ReadFile {
                path: "notes.txt".to_string()
            }
        );
    }

    #[test]
    fn test_unmatched_input_goes_to_scorers() {
        assert!(parser().parse("как дела").is_none());
        assert!(parser().parse("   ").is_none());
    }

    #[test]
    fn test_unquote_and_infer() {
        assert_eq!(unquote("  «текст»  "), "текст");
        assert_eq!(unquote(r#""  a ""#), "  a ");
        assert_eq!(unquote("  bare  "), "bare");
        assert_eq!(unquote("\"a'"), "\"a'");

        assert_eq!(
            infer_file_kind("data", Some(FileKind::Excel)),
            ("data.xlsx".to_string(), Some(FileKind::Excel))
        );
        assert_eq!(
            infer_file_kind("notes.MD", Some(FileKind::Word)),
            ("notes.MD".to_string(), Some(FileKind::Markdown))
        );
        assert_eq!(infer_file_kind("x", None).0, "x.txt");
    }

    #[test]
    fn test_looks_like_file() {
        let p = parser();
        assert!(p.looks_like_file("report.pdf"));
        assert!(p.looks_like_file("photo.PNG"));
        assert!(p.looks_like_file("backup.zip"));
        assert!(p.looks_like_file(r"D:\work"));
        assert!(p.looks_like_file("./build"));
        assert!(!p.looks_like_file("блокнот"));
        assert!(!p.looks_like_file("https://example.com/a.pdf"));
        assert!(!p.looks_like_file("rust-lang.org"));
    }

    #[test]
    fn test_open_media_file_by_path() {
        for name in ["photo.png", "backup.zip", "song.mp3", "отпуск.jpg", "clip.mp4"] {
            assert_eq!(
                command(&format!("открой {}", name)),
                Command::OpenFile {
                    target: FileTarget::Path { path: name.to_string() },
                },
                "{}",
                name
            );
        }
    }

    #[test]
    fn test_open_url_still_accepts_sites() {
        assert_eq!(
            command("открой rust-lang.org"),
            Command::OpenWeb {
                target: WebTarget::Url { url: "rust-lang.org".to_string() },
            }
        );
    }

    #[test]
    fn test_marker_word_inside_quoted_content() {
        assert_eq!(
            command(r#"запиши в a.txt: "мой текст тут""#),
            Command::WriteFile {
                path: "a.txt".to_string(),
                content: "мой текст тут".to_string(),
            }
        );
        assert_eq!(
            command(r#"создай файл a.txt с текстом "новый текст""#),
            Command::CreateFile {
                path: "a.txt".to_string(),
                content: "новый текст".to_string(),
                kind: Some(FileKind::Text),
            }
        );
    }

    #[test]
    fn test_colon_inside_quotes_is_content() {
        let (head, content) = parser().extract_content(r#"todo.txt "9:30 созвон""#);
        assert_eq!(head, r#"todo.txt "9:30 созвон""#);
        assert_eq!(content, None);

        assert_eq!(
            command(r#"добавь к todo.txt: "9:30 созвон""#),
            Command::AppendFile {
                path: "todo.txt".to_string(),
                content: "9:30 созвон".to_string(),
            }
        );
    }

    #[test]
    fn test_colon_before_marker_word_wins() {
        assert_eq!(
            command("запиши в a.txt: это текст письма"),
            Command::WriteFile {
                path: "a.txt".to_string(),
                content: "это текст письма".to_string(),
            }
        );
    }
}
