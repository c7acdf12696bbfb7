//! Duplicate resolution policy
//!
//! Holds one decision per detected duplicate (defaulting to cancel for
//! critical and import-anyway for informative) and turns the decisions into
//! the final file set for the wizard.

use serde::Serialize;
use std::collections::HashSet;
use thiserror::Error;

use crate::models::{
    DuplicateCandidate, DuplicateClass, FileEntry, ResolutionAction, ResolutionDecision,
    WizardDataPatch,
};

/// Resolution errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("No duplicate at index {0}")]
    UnknownDuplicate(usize),

    #[error("{action:?} is not permitted for {classification:?} duplicate '{file}'")]
    ActionNotPermitted {
        file: String,
        action: ResolutionAction,
        classification: DuplicateClass,
    },
}

/// Final file set after resolution
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResolutionOutcome {
    pub files_to_add: Vec<FileEntry>,
    /// Names imported with replacement semantics
    pub replace_tags: Vec<String>,
    /// Names imported despite a duplicate in another location
    pub import_anyway_tags: Vec<String>,
}

impl ResolutionOutcome {
    /// Wizard data update carrying this outcome
    pub fn into_patch(self) -> WizardDataPatch {
        WizardDataPatch {
            files: Some(self.files_to_add),
            replace_tags: Some(self.replace_tags),
            import_anyway_tags: Some(self.import_anyway_tags),
            ..Default::default()
        }
    }
}

/// Per-batch resolution state
#[derive(Debug, Clone, Default)]
pub struct ResolutionPolicyEngine {
    candidates: Vec<DuplicateCandidate>,
    actions: Vec<ResolutionAction>,
}

impl ResolutionPolicyEngine {
    /// Start with the default decision for every duplicate
    pub fn new(candidates: Vec<DuplicateCandidate>) -> Self {
        let actions = candidates
            .iter()
            .map(|c| ResolutionAction::default_for(c.classification))
            .collect();
        Self {
            candidates,
            actions,
        }
    }

    pub fn candidates(&self) -> &[DuplicateCandidate] {
        &self.candidates
    }

    pub fn action(&self, index: usize) -> Option<ResolutionAction> {
        self.actions.get(index).copied()
    }

    /// Current decisions, one per duplicate
    pub fn decisions(&self) -> Vec<ResolutionDecision> {
        self.actions
            .iter()
            .enumerate()
            .map(|(duplicate_index, &action)| ResolutionDecision {
                duplicate_index,
                action,
            })
            .collect()
    }

    /// Record a single decision
    pub fn decide(&mut self, decision: ResolutionDecision) -> Result<(), ResolutionError> {
        self.check(&decision)?;
        self.actions[decision.duplicate_index] = decision.action;
        Ok(())
    }

    /// Record several decisions; nothing is applied if any is invalid
    pub fn decide_all(&mut self, decisions: &[ResolutionDecision]) -> Result<(), ResolutionError> {
        for decision in decisions {
            self.check(decision)?;
        }
        for decision in decisions {
            self.actions[decision.duplicate_index] = decision.action;
        }
        Ok(())
    }

    /// Build the final file set
    ///
    /// `passthrough` files keep their names. Names kept by passthrough,
    /// replace and import-anyway files are reserved first, so a renamed
    /// file never takes a name another file in the batch keeps.
    pub fn apply(&self, passthrough: &[FileEntry]) -> ResolutionOutcome {
        let mut committed: HashSet<String> = passthrough.iter().map(|f| f.name.clone()).collect();
        for (candidate, action) in self.candidates.iter().zip(&self.actions) {
            if matches!(action, ResolutionAction::Replace | ResolutionAction::ImportAnyway) {
                committed.insert(candidate.file.name.clone());
            }
        }

        let mut outcome = ResolutionOutcome {
            files_to_add: passthrough.to_vec(),
            ..Default::default()
        };

        for (candidate, action) in self.candidates.iter().zip(&self.actions) {
            let file = &candidate.file;
            match action {
                ResolutionAction::Cancel => {
                    tracing::debug!(file = %file.name, "Duplicate cancelled");
                }
                ResolutionAction::Rename => {
                    let new_name = generate_unique_name(&file.name, &committed);
                    tracing::debug!(file = %file.name, new_name = %new_name, "Duplicate renamed");
                    committed.insert(new_name.clone());
                    outcome.files_to_add.push(file.renamed(new_name));
                }
                ResolutionAction::Replace => {
                    outcome.replace_tags.push(file.name.clone());
                    outcome.files_to_add.push(file.clone());
                }
                ResolutionAction::ImportAnyway => {
                    outcome.import_anyway_tags.push(file.name.clone());
                    outcome.files_to_add.push(file.clone());
                }
            }
        }

        outcome
    }

    fn check(&self, decision: &ResolutionDecision) -> Result<(), ResolutionError> {
        let candidate = self
            .candidates
            .get(decision.duplicate_index)
            .ok_or(ResolutionError::UnknownDuplicate(decision.duplicate_index))?;
        if !decision.action.is_permitted_for(candidate.classification) {
            return Err(ResolutionError::ActionNotPermitted {
                file: candidate.file.name.clone(),
                action: decision.action,
                classification: candidate.classification,
            });
        }
        Ok(())
    }
}

/// Collision-free variant of `original`
///
/// `report.pdf` becomes `report (1).pdf`; `report (3).pdf` becomes
/// `report (4).pdf`. The counter keeps increasing until the name is neither
/// in `existing` nor equal to `original`.
pub fn generate_unique_name(original: &str, existing: &HashSet<String>) -> String {
    let (stem, extension) = match original.rfind('.') {
        Some(pos) if pos > 0 => original.split_at(pos),
        _ => (original, ""),
    };
    let (base, mut counter) = split_counter(stem);

    loop {
        counter += 1;
        let candidate = format!("{} ({}){}", base, counter, extension);
        if candidate != original && !existing.contains(&candidate) {
            return candidate;
        }
    }
}

/// `"name (3)"` → `("name", 3)`, anything else → `(stem, 0)`
fn split_counter(stem: &str) -> (&str, u64) {
    if let Some(inner) = stem.strip_suffix(')') {
        if let Some(open) = inner.rfind(" (") {
            let digits = &inner[open + 2..];
            if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
                if let Ok(n) = digits.parse::<u64>() {
                    return (&stem[..open], n);
                }
            }
        }
    }
    (stem, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExistingRecord;
    use chrono::Utc;
    use uuid::Uuid;

    fn candidate(name: &str, class: DuplicateClass) -> DuplicateCandidate {
        DuplicateCandidate {
            file: FileEntry::new(name, 100, format!("/in/{}", name)),
            existing: ExistingRecord {
                id: Uuid::new_v4(),
                size: 100,
                created_at: Utc::now(),
                location_label: "archive".to_string(),
                owner_label: "someone".to_string(),
            },
            classification: class,
        }
    }

    fn names(files: &[FileEntry]) -> Vec<&str> {
        files.iter().map(|f| f.name.as_str()).collect()
    }

    #[test]
    fn test_unique_name_appends_counter_before_extension() {
        let existing = HashSet::new();
        assert_eq!(generate_unique_name("a.png", &existing), "a (1).png");
        assert_eq!(generate_unique_name("README", &existing), "README (1)");
        assert_eq!(generate_unique_name("archive.tar.gz", &existing), "archive.tar (1).gz");
    }

    #[test]
    fn test_unique_name_increments_existing_counter() {
        let existing = HashSet::new();
        assert_eq!(generate_unique_name("a (3).png", &existing), "a (4).png");
        assert_eq!(generate_unique_name("a (x).png", &existing), "a (x) (1).png");
    }

    #[test]
    fn test_unique_name_skips_taken_names() {
        let existing: HashSet<String> = ["a (1).png", "a (2).png"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(generate_unique_name("a.png", &existing), "a (3).png");
    }

    #[test]
    fn test_repeated_generation_yields_distinct_names() {
        let mut existing = HashSet::new();
        let mut produced = Vec::new();
        for _ in 0..5 {
            let name = generate_unique_name("scan.pdf", &existing);
            assert_ne!(name, "scan.pdf");
            assert!(!existing.contains(&name));
            existing.insert(name.clone());
            produced.push(name);
        }
        assert_eq!(produced.len(), existing.len());
    }

    #[test]
    fn test_defaults_cancel_critical_keep_informative() {
        let engine = ResolutionPolicyEngine::new(vec![
            candidate("a.pdf", DuplicateClass::Critical),
            candidate("b.pdf", DuplicateClass::Informative),
        ]);

        let outcome = engine.apply(&[FileEntry::new("c.pdf", 1, "")]);
        assert_eq!(names(&outcome.files_to_add), vec!["c.pdf", "b.pdf"]);
        assert_eq!(outcome.import_anyway_tags, vec!["b.pdf".to_string()]);
        assert!(outcome.replace_tags.is_empty());
    }

    #[test]
    fn test_two_renames_of_same_name_do_not_collide() {
        let mut engine = ResolutionPolicyEngine::new(vec![
            candidate("a.png", DuplicateClass::Critical),
            candidate("a.png", DuplicateClass::Critical),
        ]);
        engine
            .decide_all(&[
                ResolutionDecision {
                    duplicate_index: 0,
                    action: ResolutionAction::Rename,
                },
                ResolutionDecision {
                    duplicate_index: 1,
                    action: ResolutionAction::Rename,
                },
            ])
            .unwrap();

        let outcome = engine.apply(&[]);
        assert_eq!(names(&outcome.files_to_add), vec!["a (1).png", "a (2).png"]);
    }

    #[test]
    fn test_rename_avoids_names_kept_elsewhere_in_batch() {
        let mut engine = ResolutionPolicyEngine::new(vec![
            candidate("a.png", DuplicateClass::Critical),
            candidate("a (1).png", DuplicateClass::Informative),
        ]);
        engine
            .decide(ResolutionDecision {
                duplicate_index: 0,
                action: ResolutionAction::Rename,
            })
            .unwrap();

        let outcome = engine.apply(&[FileEntry::new("a (2).png", 1, "")]);
        assert_eq!(
            names(&outcome.files_to_add),
            vec!["a (2).png", "a (3).png", "a (1).png"]
        );
    }

    #[test]
    fn test_replace_tags_and_keeps_name() {
        let mut engine =
            ResolutionPolicyEngine::new(vec![candidate("a.pdf", DuplicateClass::Critical)]);
        engine
            .decide(ResolutionDecision {
                duplicate_index: 0,
                action: ResolutionAction::Replace,
            })
            .unwrap();

        let outcome = engine.apply(&[]);
        assert_eq!(names(&outcome.files_to_add), vec!["a.pdf"]);
        assert_eq!(outcome.replace_tags, vec!["a.pdf".to_string()]);

        let patch = outcome.into_patch();
        assert_eq!(patch.files.map(|f| f.len()), Some(1));
        assert!(patch.category.is_none());
    }

    #[test]
    fn test_invalid_actions_rejected() {
        let mut engine = ResolutionPolicyEngine::new(vec![
            candidate("a.pdf", DuplicateClass::Critical),
            candidate("b.pdf", DuplicateClass::Informative),
        ]);

        let err = engine
            .decide(ResolutionDecision {
                duplicate_index: 0,
                action: ResolutionAction::ImportAnyway,
            })
            .unwrap_err();
        assert!(matches!(err, ResolutionError::ActionNotPermitted { .. }));

        let err = engine
            .decide(ResolutionDecision {
                duplicate_index: 1,
                action: ResolutionAction::Replace,
            })
            .unwrap_err();
        assert!(matches!(err, ResolutionError::ActionNotPermitted { .. }));

        assert_eq!(
            engine.decide(ResolutionDecision {
                duplicate_index: 5,
                action: ResolutionAction::Cancel,
            }),
            Err(ResolutionError::UnknownDuplicate(5))
        );
    }

    #[test]
    fn test_decide_all_is_atomic() {
        let mut engine = ResolutionPolicyEngine::new(vec![
            candidate("a.pdf", DuplicateClass::Critical),
            candidate("b.pdf", DuplicateClass::Informative),
        ]);

        let result = engine.decide_all(&[
            ResolutionDecision {
                duplicate_index: 0,
                action: ResolutionAction::Rename,
            },
            ResolutionDecision {
                duplicate_index: 1,
                action: ResolutionAction::Replace,
            },
        ]);

        assert!(result.is_err());
        assert_eq!(engine.action(0), Some(ResolutionAction::Cancel));
    }
}
