//! Policy Arbiter - disambiguation between app, file and web readings
//!
//! Applies an ordered list of threshold rules to the scorer output:
//! - strong app alias beats everything
//! - an explicit search verb forces a search (file on ties)
//! - medium app, then file, then web readings
//! - near-equal file and web scores ask the user instead of guessing
//! - a weak app alias is the last resort before chat

use crate::config::Thresholds;
use crate::scorers::Scores;
use crate::types::*;

pub const CLARIFY_FILE_OR_WEB: &str = "Открыть как файл или как сайт?";

/// Policy arbiter turns scores into at most one intent
pub struct PolicyArbiter {
    thresholds: Thresholds,
}

impl PolicyArbiter {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    /// `None` means nothing cleared a threshold (chat fallback)
    pub fn arbitrate(&self, scores: &Scores, explicit_search: bool) -> Option<Intent> {
        let t = &self.thresholds;
        let rivals = scores.file.max(scores.web);

        if let Some(app) = self.app_above(scores, t.app_strong, rivals + t.app_strong_margin) {
            log::debug!("arbiter: strong app alias {:.2}", scores.app);
            return Some(app);
        }

        if explicit_search {
            log::debug!(
                "arbiter: explicit search, file={:.2} web={:.2}",
                scores.file,
                scores.web
            );
            return Some(if scores.file >= scores.web {
                Intent::new(
                    Command::SearchFile {
                        query: scores.file_query.clone(),
                        domain: Some(scores.file_domain),
                    },
                    scores.file.max(t.search_floor),
                )
            } else {
                Intent::new(
                    Command::SearchWeb {
                        query: scores.web_query.clone(),
                    },
                    scores.web.max(t.search_floor),
                )
            });
        }

        if let Some(app) = self.app_above(scores, t.app_medium, rivals + t.app_medium_margin) {
            return Some(app);
        }

        if scores.file >= t.file_open && scores.file >= scores.web - t.file_web_slack {
            return Some(Intent::new(self.open_file(scores), scores.file));
        }

        if scores.web >= t.web_open {
            return Some(Intent::new(self.open_web(scores), scores.web));
        }

        if scores.file >= t.ambiguity_floor
            && scores.web >= t.ambiguity_floor
            && (scores.file - scores.web).abs() <= t.ambiguity_gap
        {
            log::debug!("arbiter: file/web too close to call");
            return Some(Intent::new(
                Command::Ambiguous {
                    possibilities: vec![self.open_file(scores), self.open_web(scores)],
                    question: CLARIFY_FILE_OR_WEB.to_string(),
                },
                0.0,
            ));
        }

        if let Some(app) = self.app_above(scores, t.app_weak, 0.0) {
            return Some(app);
        }

        None
    }

    /// Open-app intent when the app score reaches both bounds
    fn app_above(&self, scores: &Scores, floor: f32, margin: f32) -> Option<Intent> {
        let key = scores.app_key.as_ref()?;
        if scores.app >= floor && scores.app >= margin {
            Some(Intent::new(Command::OpenApp { app: key.clone() }, scores.app))
        } else {
            None
        }
    }

    fn open_file(&self, scores: &Scores) -> Command {
        Command::OpenFile {
            target: FileTarget::Query {
                query: scores.file_query.clone(),
                domain: Some(scores.file_domain),
            },
        }
    }

    fn open_web(&self, scores: &Scores) -> Command {
        Command::OpenWeb {
            target: WebTarget::Query {
                query: scores.web_query.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(app: Option<f32>, file: f32, web: f32) -> Scores {
        Scores {
            app_key: app.map(|_| "notepad".to_string()),
            app: app.unwrap_or(0.0),
            file,
            file_domain: FileDomain::Documents,
            file_query: "отчёт pdf".to_string(),
            web,
            web_query: "отчёт".to_string(),
        }
    }

    fn arbiter() -> PolicyArbiter {
        PolicyArbiter::new(Thresholds::default())
    }

    #[test]
    fn test_strong_app_wins() {
        let intent = arbiter().arbitrate(&scores(Some(0.85), 0.6, 0.0), true).unwrap();
        assert_eq!(
            intent.command,
            Command::OpenApp {
                app: "notepad".to_string()
            }
        );
    }

    #[test]
    fn test_explicit_search_prefers_file_on_tie() {
        let intent = arbiter().arbitrate(&scores(None, 0.65, 0.65), true).unwrap();
        assert_eq!(intent.command.tag(), "search_file");

        let intent = arbiter().arbitrate(&scores(None, 0.0, 0.0), true).unwrap();
        assert_eq!(intent.command.tag(), "search_file");
        assert!((intent.confidence - 0.55).abs() < 1e-6);

        let intent = arbiter().arbitrate(&scores(None, 0.0, 0.7), true).unwrap();
        assert_eq!(
            intent.command,
            Command::SearchWeb {
                query: "отчёт".to_string()
            }
        );
    }

    #[test]
    fn test_file_then_web_readings() {
        let intent = arbiter().arbitrate(&scores(None, 0.68, 0.7), false).unwrap();
        assert_eq!(intent.command.tag(), "open_file");

        let intent = arbiter().arbitrate(&scores(None, 0.61, 0.7), false).unwrap();
        assert_eq!(intent.command.tag(), "open_web");
    }

    #[test]
    fn test_close_scores_ask_for_clarification() {
        let intent = arbiter().arbitrate(&scores(None, 0.58, 0.6), false).unwrap();
        match intent.command {
            Command::Ambiguous {
                possibilities,
                question,
            } => {
                assert_eq!(possibilities.len(), 2);
                assert_eq!(question, CLARIFY_FILE_OR_WEB);
            }
            other => panic!("expected ambiguity, got {:?}", other),
        }
    }

    #[test]
    fn test_weak_app_and_unknown() {
        let intent = arbiter().arbitrate(&scores(Some(0.62), 0.0, 0.0), false).unwrap();
        assert_eq!(intent.command.tag(), "open_app");

        assert!(arbiter().arbitrate(&scores(Some(0.56), 0.0, 0.0), false).is_none());
        assert!(arbiter().arbitrate(&scores(None, 0.0, 0.0), false).is_none());
    }
}
