//! Feedback-adaptive instruction learner.
//!
//! An append-only log of user feedback, partitioned by category and
//! persisted as a single JSON document. Derived per-role statistics are
//! recomputed eagerly after every write so readers never see stale state,
//! and `augment` steers future prompts by quoting recent feedback — no
//! retraining, just textual hints the downstream model interprets.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Number of recent entries kept in derived stats.
const RECENT_LIMIT: usize = 5;
/// Ratings at or below this are treated as negative feedback.
const NEGATIVE_THRESHOLD: u8 = 3;
/// Number of themes quoted into an augmented prompt, per block.
const AUGMENT_LIMIT: usize = 3;

/// Feedback category. Partitions the persisted log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackCategory {
    CodeAnalysis,
    RepoAnalysis,
    Diagram,
}

impl FeedbackCategory {
    pub const ALL: [FeedbackCategory; 3] = [
        FeedbackCategory::CodeAnalysis,
        FeedbackCategory::RepoAnalysis,
        FeedbackCategory::Diagram,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackCategory::CodeAnalysis => "code_analysis",
            FeedbackCategory::RepoAnalysis => "repo_analysis",
            FeedbackCategory::Diagram => "diagram",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "code_analysis" => Some(FeedbackCategory::CodeAnalysis),
            "repo_analysis" => Some(FeedbackCategory::RepoAnalysis),
            "diagram" => Some(FeedbackCategory::Diagram),
            _ => None,
        }
    }
}

/// One submitted feedback entry. Never mutated after append.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackEntry {
    pub timestamp: String,
    pub rating: u8,
    pub feedback_text: String,
    #[serde(default)]
    pub additional_data: Value,
}

impl FeedbackEntry {
    /// The role this entry contributes statistics to, when tagged.
    fn role(&self) -> Option<&str> {
        self.additional_data.get("role").and_then(Value::as_str)
    }
}

/// Derived statistics for one role. Pure function of the log, never
/// persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RoleImprovement {
    pub average_rating: f64,
    /// Up to five entries, most recent first.
    pub recent_feedback: Vec<FeedbackEntry>,
    /// Feedback texts with rating <= 3, in log order.
    pub negative_themes: Vec<String>,
    pub total_feedback: usize,
}

/// Aggregate view of one category, for the stats endpoint.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CategoryStats {
    pub total_feedback: usize,
    pub average_rating: f64,
    pub recent_feedback: Vec<FeedbackEntry>,
}

/// Persisted shape: one array per category.
#[derive(Debug, Default, Serialize, Deserialize)]
struct FeedbackLog {
    #[serde(default)]
    code_analysis: Vec<FeedbackEntry>,
    #[serde(default)]
    repo_analysis: Vec<FeedbackEntry>,
    #[serde(default)]
    diagram: Vec<FeedbackEntry>,
}

impl FeedbackLog {
    fn entries(&self, category: FeedbackCategory) -> &Vec<FeedbackEntry> {
        match category {
            FeedbackCategory::CodeAnalysis => &self.code_analysis,
            FeedbackCategory::RepoAnalysis => &self.repo_analysis,
            FeedbackCategory::Diagram => &self.diagram,
        }
    }

    fn entries_mut(&mut self, category: FeedbackCategory) -> &mut Vec<FeedbackEntry> {
        match category {
            FeedbackCategory::CodeAnalysis => &mut self.code_analysis,
            FeedbackCategory::RepoAnalysis => &mut self.repo_analysis,
            FeedbackCategory::Diagram => &mut self.diagram,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FeedbackError {
    #[error("feedback store I/O error: {0}")]
    Io(String),
    #[error("feedback log is corrupt: {0}")]
    Corrupt(String),
}

struct Inner {
    log: FeedbackLog,
    improvements: HashMap<String, RoleImprovement>,
}

/// JSON-file-backed feedback store.
///
/// Construct once at startup and hand out via shared state — writers are
/// serialized by the interior mutex, readers see a consistent pre- or
/// post-write snapshot.
pub struct FeedbackStore {
    path: PathBuf,
    inner: Mutex<Inner>,
}

impl FeedbackStore {
    /// Load the full log from `path`, or start empty when the file does
    /// not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, FeedbackError> {
        let path = path.into();
        let log = match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str::<FeedbackLog>(&text)
                .map_err(|e| FeedbackError::Corrupt(e.to_string()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => FeedbackLog::default(),
            Err(e) => return Err(FeedbackError::Io(e.to_string())),
        };
        let improvements = analyze_log(&log);
        Ok(Self {
            path,
            inner: Mutex::new(Inner { log, improvements }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append an entry and persist the full log.
    ///
    /// Rating range (1..=5) is the caller's contract; the store only
    /// appends. Derived stats are recomputed before returning, and a
    /// failed persist leaves the in-memory log unchanged.
    pub fn save(
        &self,
        category: FeedbackCategory,
        rating: u8,
        feedback_text: &str,
        additional_data: Value,
    ) -> Result<(), FeedbackError> {
        let entry = FeedbackEntry {
            timestamp: Utc::now().to_rfc3339(),
            rating,
            feedback_text: feedback_text.to_string(),
            additional_data,
        };

        let mut inner = self.inner.lock();
        inner.log.entries_mut(category).push(entry);
        if let Err(e) = persist(&self.path, &inner.log) {
            inner.log.entries_mut(category).pop();
            return Err(e);
        }
        inner.improvements = analyze_log(&inner.log);
        Ok(())
    }

    /// Derived stats for a role; zeroed when the role has no entries.
    pub fn improvements_for(&self, role: &str) -> RoleImprovement {
        self.inner
            .lock()
            .improvements
            .get(role)
            .cloned()
            .unwrap_or_default()
    }

    /// Aggregate stats for one category.
    pub fn category_stats(&self, category: FeedbackCategory) -> CategoryStats {
        let inner = self.inner.lock();
        let entries = inner.log.entries(category);
        if entries.is_empty() {
            return CategoryStats::default();
        }
        let total: u64 = entries.iter().map(|e| u64::from(e.rating)).sum();
        let recent = entries
            .iter()
            .rev()
            .take(RECENT_LIMIT)
            .cloned()
            .collect::<Vec<_>>();
        CategoryStats {
            total_feedback: entries.len(),
            average_rating: total as f64 / entries.len() as f64,
            recent_feedback: recent,
        }
    }

    /// Augment base prompt instructions with learned themes for a role.
    ///
    /// Identity when the role has no feedback. Given an identical log this
    /// is a pure function of its inputs.
    pub fn augment(&self, base_instructions: &str, role: &str) -> String {
        let improvements = self.improvements_for(role);
        if improvements.total_feedback == 0 {
            return base_instructions.to_string();
        }

        let mut blocks = Vec::new();

        if !improvements.negative_themes.is_empty() {
            let themes = improvements
                .negative_themes
                .iter()
                .take(AUGMENT_LIMIT)
                .map(|t| format!("- {t}"))
                .collect::<Vec<_>>()
                .join("\n");
            blocks.push(format!(
                "Based on previous feedback, please avoid these issues:\n{themes}"
            ));
        }

        if !improvements.recent_feedback.is_empty() {
            let themes = improvements
                .recent_feedback
                .iter()
                .take(AUGMENT_LIMIT)
                .map(|f| format!("- {}", f.feedback_text))
                .collect::<Vec<_>>()
                .join("\n");
            blocks.push(format!(
                "Recent feedback suggests focusing on:\n{themes}"
            ));
        }

        if blocks.is_empty() {
            return base_instructions.to_string();
        }
        format!("{base_instructions}\n\n{}", blocks.join("\n\n"))
    }

    /// Bulk-clear every category and persist the empty log.
    pub fn clear(&self) -> Result<(), FeedbackError> {
        let mut inner = self.inner.lock();
        let empty = FeedbackLog::default();
        persist(&self.path, &empty)?;
        inner.log = empty;
        inner.improvements.clear();
        Ok(())
    }
}

fn persist(path: &Path, log: &FeedbackLog) -> Result<(), FeedbackError> {
    let json = serde_json::to_string_pretty(log)
        .map_err(|e| FeedbackError::Corrupt(e.to_string()))?;
    std::fs::write(path, json).map_err(|e| FeedbackError::Io(e.to_string()))
}

/// Recompute per-role statistics from the full log.
fn analyze_log(log: &FeedbackLog) -> HashMap<String, RoleImprovement> {
    let mut by_role: HashMap<String, Vec<&FeedbackEntry>> = HashMap::new();
    for category in FeedbackCategory::ALL {
        for entry in log.entries(category) {
            if let Some(role) = entry.role() {
                by_role.entry(role.to_string()).or_default().push(entry);
            }
        }
    }

    by_role
        .into_iter()
        .map(|(role, mut entries)| {
            let total: u64 = entries.iter().map(|e| u64::from(e.rating)).sum();
            let average_rating = total as f64 / entries.len() as f64;
            // RFC 3339 sorts lexicographically; stable sort keeps log
            // order for same-instant entries.
            entries.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
            let negative_themes = entries
                .iter()
                .filter(|e| e.rating <= NEGATIVE_THRESHOLD)
                .map(|e| e.feedback_text.clone())
                .collect();
            let recent_feedback = entries
                .iter()
                .rev()
                .take(RECENT_LIMIT)
                .map(|e| (*e).clone())
                .collect();
            let improvement = RoleImprovement {
                average_rating,
                recent_feedback,
                negative_themes,
                total_feedback: entries.len(),
            };
            (role, improvement)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_store() -> (tempfile::TempDir, FeedbackStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FeedbackStore::open(dir.path().join("feedback_data.json")).unwrap();
        (dir, store)
    }

    fn meta(role: &str) -> Value {
        json!({"role": role})
    }

    #[test]
    fn save_increments_totals_and_recomputes_average() {
        let (_dir, store) = temp_store();
        for rating in 1..=5u8 {
            store
                .save(FeedbackCategory::CodeAnalysis, rating, "note", meta("backend"))
                .unwrap();
            let imp = store.improvements_for("backend");
            assert_eq!(imp.total_feedback, usize::from(rating));
        }
        let imp = store.improvements_for("backend");
        assert!((imp.average_rating - 3.0).abs() < 1e-9);
    }

    #[test]
    fn negative_themes_keep_log_order_and_threshold() {
        let (_dir, store) = temp_store();
        let ratings = [(2u8, "too verbose"), (5, "great"), (1, "missed edge cases")];
        for (rating, text) in ratings {
            store
                .save(FeedbackCategory::CodeAnalysis, rating, text, meta("backend"))
                .unwrap();
        }
        let imp = store.improvements_for("backend");
        assert!((imp.average_rating - 8.0 / 3.0).abs() < 1e-4);
        assert_eq!(imp.negative_themes, vec!["too verbose", "missed edge cases"]);
        assert_eq!(imp.total_feedback, 3);
    }

    #[test]
    fn recent_feedback_is_most_recent_first_capped_at_five() {
        let (_dir, store) = temp_store();
        for i in 0..7 {
            store
                .save(
                    FeedbackCategory::CodeAnalysis,
                    4,
                    &format!("note {i}"),
                    meta("frontend"),
                )
                .unwrap();
        }
        let imp = store.improvements_for("frontend");
        assert_eq!(imp.recent_feedback.len(), 5);
        assert_eq!(imp.recent_feedback[0].feedback_text, "note 6");
        assert_eq!(imp.recent_feedback[4].feedback_text, "note 2");
    }

    #[test]
    fn augment_is_identity_without_feedback() {
        let (_dir, store) = temp_store();
        assert_eq!(store.augment("Base instructions.", "backend"), "Base instructions.");
    }

    #[test]
    fn augment_appends_negative_then_recent_blocks() {
        let (_dir, store) = temp_store();
        store
            .save(FeedbackCategory::CodeAnalysis, 2, "too verbose", meta("backend"))
            .unwrap();
        store
            .save(FeedbackCategory::CodeAnalysis, 5, "great detail", meta("backend"))
            .unwrap();
        let augmented = store.augment("Base.", "backend");
        assert!(augmented.starts_with("Base.\n\n"));
        let avoid = augmented.find("avoid these issues").unwrap();
        let focus = augmented.find("focusing on").unwrap();
        assert!(avoid < focus);
        assert!(augmented.contains("- too verbose"));
        assert!(augmented.contains("- great detail"));
    }

    #[test]
    fn roles_accumulate_across_categories() {
        let (_dir, store) = temp_store();
        store
            .save(FeedbackCategory::CodeAnalysis, 4, "a", meta("backend"))
            .unwrap();
        store
            .save(FeedbackCategory::Diagram, 2, "b", meta("backend"))
            .unwrap();
        assert_eq!(store.improvements_for("backend").total_feedback, 2);
    }

    #[test]
    fn untagged_entries_count_for_categories_but_not_roles() {
        let (_dir, store) = temp_store();
        store
            .save(FeedbackCategory::RepoAnalysis, 3, "anonymous", json!({}))
            .unwrap();
        assert_eq!(store.improvements_for("backend").total_feedback, 0);
        assert_eq!(
            store.category_stats(FeedbackCategory::RepoAnalysis).total_feedback,
            1
        );
    }

    #[test]
    fn log_round_trips_through_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feedback_data.json");
        {
            let store = FeedbackStore::open(&path).unwrap();
            store
                .save(FeedbackCategory::CodeAnalysis, 5, "persisted", meta("backend"))
                .unwrap();
        }
        let reloaded = FeedbackStore::open(&path).unwrap();
        let imp = reloaded.improvements_for("backend");
        assert_eq!(imp.total_feedback, 1);
        assert_eq!(imp.recent_feedback[0].feedback_text, "persisted");
    }

    #[test]
    fn clear_resets_log_and_stats() {
        let (_dir, store) = temp_store();
        store
            .save(FeedbackCategory::CodeAnalysis, 1, "bad", meta("backend"))
            .unwrap();
        store.clear().unwrap();
        assert_eq!(store.improvements_for("backend").total_feedback, 0);
        assert_eq!(
            store.category_stats(FeedbackCategory::CodeAnalysis).total_feedback,
            0
        );
    }

    #[test]
    fn corrupt_file_is_reported_not_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feedback_data.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            FeedbackStore::open(&path),
            Err(FeedbackError::Corrupt(_))
        ));
    }
}
