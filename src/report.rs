//! Final run report.
//!
//! Produced by the search controller once the double-check has run. Rendered as text
//! (comfy-table + styled headings) for humans or as JSON for scripts. The report goes
//! to stdout; logging stays on stderr.

use crate::state::FileState;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Residual differences at or above this count are summarized instead of listed
pub const SUMMARIZE_THRESHOLD: usize = 1000;

/// Overall verdict of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Some differences were accepted and the best state passed the double-check
    Success,
    /// The search finished without accepting any difference
    NothingAccepted,
    /// The best state failed when rebuilt and retested
    DoubleCheckFailed,
}

impl RunStatus {
    pub fn is_success(self) -> bool {
        matches!(self, RunStatus::Success)
    }
}

/// One difference that could not be carried over
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedEntry {
    pub path: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub status: RunStatus,
    pub passing_path: PathBuf,
    pub failing_path: PathBuf,
    pub original_differences: usize,
    pub accepted_differences: usize,
    pub unresolved_summary: String,
    pub unresolved: Vec<UnresolvedEntry>,
    pub best_state_path: PathBuf,
    pub started_at: String,
    pub elapsed_secs: f64,
    pub double_check_passed: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<String>,
}

impl RunReport {
    /// Flatten the residual target into report rows
    pub fn unresolved_entries(target: &FileState) -> Vec<UnresolvedEntry> {
        target
            .iter()
            .map(|(path, content)| UnresolvedEntry {
                path: path.to_string(),
                content: content.to_string(),
            })
            .collect()
    }

    /// Hints printed when the double-check fails
    pub fn double_check_hints(
        assume_no_side_effects: bool,
        assume_input_states_are_correct: bool,
    ) -> Vec<String> {
        let mut hints = vec!["Could the test be non-deterministic?".to_string()];
        if assume_no_side_effects {
            hints.push("It may help to remove the --assume-no-side-effects flag".to_string());
        }
        if assume_input_states_are_correct {
            hints.push(
                "It may help to remove the --assume-input-states-are-correct flag".to_string(),
            );
        }
        hints
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("{}\n\n", "Bisection Report".bold().underline()));
        out.push_str(&format!(
            "Done trying to transform the contents of passing path:\n  {}\ninto the contents of failing path:\n  {}\n\n",
            self.passing_path.display(),
            self.failing_path.display()
        ));
        out.push_str(&format!(
            "  Differences: {}\n  Accepted: {}\n  Elapsed: {:.1}s\n\n",
            self.original_differences, self.accepted_differences, self.elapsed_secs
        ));

        out.push_str(&format!("{}\n\n", "Could not accept".bold().underline()));
        if self.unresolved.is_empty() {
            out.push_str("  (nothing)\n\n");
        } else if self.unresolved.len() >= SUMMARIZE_THRESHOLD {
            out.push_str(&format!("  {}\n\n", self.unresolved_summary));
        } else {
            let mut table = Table::new();
            table.load_preset(UTF8_BORDERS_ONLY);
            table.set_header(vec!["Path", "Content"]);
            for entry in &self.unresolved {
                table.add_row(vec![entry.path.clone(), entry.content.clone()]);
            }
            out.push_str(&format!("{}\n\n", table));
        }

        match self.status {
            RunStatus::Success => {
                out.push_str(&format!("{}\n", "Double-check passed".green()));
            }
            RunStatus::NothingAccepted => {
                out.push_str(&format!(
                    "{}\n",
                    "No changes could be accepted; applying every change on its own still fails"
                        .yellow()
                ));
            }
            RunStatus::DoubleCheckFailed => {
                out.push_str(&format!(
                    "{}\n",
                    format!(
                        "Best state at {} did not pass the second time",
                        self.best_state_path.display()
                    )
                    .red()
                    .bold()
                ));
            }
        }
        for hint in &self.hints {
            out.push_str(&format!("  - {}\n", hint.yellow()));
        }
        out.push_str(&format!(
            "The final accepted state can be seen at {}\n",
            self.best_state_path.display()
        ));
        out
    }
}
