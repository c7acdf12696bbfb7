//! File intake validation
//!
//! Partitions candidate files into accepted and rejected sets according to
//! the extension policy of the declared category. The catch-all category
//! inverts the rule: it accepts exactly the extensions no other category owns.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use docimp_common::config::CategoryConfig;

use crate::models::{FileCategory, FileEntry};

/// Extension policy per category
#[derive(Debug, Clone)]
pub struct CategoryPolicy {
    allowed: BTreeMap<FileCategory, BTreeSet<String>>,
    catch_all: FileCategory,
    adaptive_category: FileCategory,
    adaptive_extensions: BTreeSet<String>,
}

fn normalize<I, S>(extensions: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    extensions
        .into_iter()
        .map(|e| e.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

impl CategoryPolicy {
    /// Built-in extension lists
    pub fn builtin() -> Self {
        let mut allowed = BTreeMap::new();
        allowed.insert(
            FileCategory::Documents,
            normalize(["pdf", "doc", "docx", "odt", "rtf", "txt"]),
        );
        allowed.insert(
            FileCategory::Images,
            normalize(["png", "jpg", "jpeg", "gif", "bmp", "tif", "tiff", "webp"]),
        );
        allowed.insert(
            FileCategory::Spreadsheets,
            normalize(["xls", "xlsx", "ods", "csv"]),
        );

        Self {
            allowed,
            catch_all: FileCategory::Other,
            adaptive_category: FileCategory::Documents,
            adaptive_extensions: normalize(["pdf"]),
        }
    }

    /// Built-in lists with TOML overrides applied
    pub fn from_config(config: &CategoryConfig) -> Self {
        let mut policy = Self::builtin();
        let overrides = [
            (FileCategory::Documents, &config.documents),
            (FileCategory::Images, &config.images),
            (FileCategory::Spreadsheets, &config.spreadsheets),
        ];
        for (category, list) in overrides {
            if let Some(list) = list {
                policy.allowed.insert(category, normalize(list));
            }
        }
        if let Some(list) = &config.adaptive_extensions {
            policy.adaptive_extensions = normalize(list);
        }
        policy
    }

    pub fn catch_all(&self) -> FileCategory {
        self.catch_all
    }

    pub fn is_catch_all(&self, category: FileCategory) -> bool {
        category == self.catch_all
    }

    /// Allow-list of a regular category (`None` for the catch-all)
    pub fn allowed_extensions(&self, category: FileCategory) -> Option<&BTreeSet<String>> {
        self.allowed.get(&category)
    }

    /// Union of every regular category's allow-list
    pub fn owned_extensions(&self) -> BTreeSet<String> {
        self.allowed.values().flatten().cloned().collect()
    }

    /// Reverse lookup: first regular category whose allow-list has `extension`
    pub fn category_for_extension(&self, extension: &str) -> Option<FileCategory> {
        self.allowed
            .iter()
            .find(|(_, exts)| exts.contains(extension))
            .map(|(category, _)| *category)
    }

    /// Categories that go through the adaptive-options step
    pub fn adaptive_categories(&self) -> Vec<FileCategory> {
        vec![self.adaptive_category]
    }

    /// Whether `file` in `category` gets OCR / text-extraction analysis
    pub fn is_adaptive_eligible(&self, category: FileCategory, file: &FileEntry) -> bool {
        category == self.adaptive_category
            && file
                .extension()
                .map(|ext| self.adaptive_extensions.contains(&ext))
                .unwrap_or(false)
    }
}

impl Default for CategoryPolicy {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Why a file was rejected
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectionReason {
    /// Extension missing from the category's allow-list
    ExtensionNotAllowed { extension: Option<String> },
    /// Catch-all category: extension belongs to another category
    OwnedByOtherCategory { extension: String },
}

/// A rejected file with optional feedback
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedFile {
    pub file: FileEntry,
    pub reason: RejectionReason,
    /// Category that would accept the file (catch-all rejections only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_category: Option<FileCategory>,
}

/// Intake partition
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IntakeReport {
    pub accepted: Vec<FileEntry>,
    pub rejected: Vec<RejectedFile>,
}

impl IntakeReport {
    pub fn has_rejections(&self) -> bool {
        !self.rejected.is_empty()
    }
}

/// File intake validator
#[derive(Debug, Clone)]
pub struct FileIntakeValidator {
    policy: CategoryPolicy,
}

impl FileIntakeValidator {
    pub fn new(policy: CategoryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &CategoryPolicy {
        &self.policy
    }

    /// Partition `files` for `category`
    ///
    /// Every input file lands in exactly one of `accepted` / `rejected`,
    /// input order preserved within each.
    pub fn validate(&self, files: Vec<FileEntry>, category: FileCategory) -> IntakeReport {
        let mut report = IntakeReport::default();

        if self.policy.is_catch_all(category) {
            let owned = self.policy.owned_extensions();
            for file in files {
                match file.extension() {
                    Some(ext) if owned.contains(&ext) => {
                        let suggested_category = self.policy.category_for_extension(&ext);
                        report.rejected.push(RejectedFile {
                            file,
                            reason: RejectionReason::OwnedByOtherCategory { extension: ext },
                            suggested_category,
                        });
                    }
                    _ => report.accepted.push(file),
                }
            }
        } else {
            let allowed = self.policy.allowed_extensions(category);
            for file in files {
                let ext = file.extension();
                let ok = match (&ext, allowed) {
                    (Some(ext), Some(allowed)) => allowed.contains(ext),
                    _ => false,
                };
                if ok {
                    report.accepted.push(file);
                } else {
                    report.rejected.push(RejectedFile {
                        file,
                        reason: RejectionReason::ExtensionNotAllowed { extension: ext },
                        suggested_category: None,
                    });
                }
            }
        }

        tracing::debug!(
            category = category.id(),
            accepted = report.accepted.len(),
            rejected = report.rejected.len(),
            "Intake validated"
        );

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(names: &[&str]) -> Vec<FileEntry> {
        names
            .iter()
            .map(|n| FileEntry::new(*n, 100, format!("/in/{}", n)))
            .collect()
    }

    fn validator() -> FileIntakeValidator {
        FileIntakeValidator::new(CategoryPolicy::builtin())
    }

    #[test]
    fn test_allow_list_partition() {
        let input = files(&["a.png", "b.PDF", "c.jpg", "noext"]);
        let report = validator().validate(input.clone(), FileCategory::Images);

        let accepted: Vec<_> = report.accepted.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(accepted, vec!["a.png", "c.jpg"]);
        assert_eq!(report.rejected.len(), 2);
        assert_eq!(report.accepted.len() + report.rejected.len(), input.len());
        assert!(report.rejected.iter().all(|r| r.suggested_category.is_none()));
    }

    #[test]
    fn test_catch_all_accepts_exactly_unowned_extensions() {
        let input = files(&["a.zip", "b.pdf", "c.png", "d.xlsx", "e", "f.mp4"]);
        let validator = validator();
        let owned = validator.policy().owned_extensions();
        let report = validator.validate(input.clone(), FileCategory::Other);

        let expected: Vec<_> = input
            .iter()
            .filter(|f| f.extension().map(|e| !owned.contains(&e)).unwrap_or(true))
            .cloned()
            .collect();
        assert_eq!(report.accepted, expected);
        assert_eq!(report.accepted.len() + report.rejected.len(), input.len());
    }

    #[test]
    fn test_catch_all_rejections_suggest_owning_category() {
        let report = validator().validate(files(&["scan.pdf", "chart.xlsx"]), FileCategory::Other);

        let suggestions: Vec<_> = report
            .rejected
            .iter()
            .map(|r| r.suggested_category)
            .collect();
        assert_eq!(
            suggestions,
            vec![Some(FileCategory::Documents), Some(FileCategory::Spreadsheets)]
        );
        assert_eq!(
            report.rejected[0].reason,
            RejectionReason::OwnedByOtherCategory {
                extension: "pdf".to_string()
            }
        );
    }

    #[test]
    fn test_config_override_changes_catch_all_complement() {
        let config = CategoryConfig {
            images: Some(vec![".PNG".to_string()]),
            ..Default::default()
        };
        let validator = FileIntakeValidator::new(CategoryPolicy::from_config(&config));

        let report = validator.validate(files(&["a.jpg", "b.png"]), FileCategory::Other);
        let accepted: Vec<_> = report.accepted.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(accepted, vec!["a.jpg"]);
    }

    #[test]
    fn test_adaptive_eligibility() {
        let policy = CategoryPolicy::builtin();
        let pdf = FileEntry::new("scan.pdf", 1, "");
        let docx = FileEntry::new("memo.docx", 1, "");

        assert!(policy.is_adaptive_eligible(FileCategory::Documents, &pdf));
        assert!(!policy.is_adaptive_eligible(FileCategory::Documents, &docx));
        assert!(!policy.is_adaptive_eligible(FileCategory::Other, &pdf));
        assert_eq!(policy.adaptive_categories(), vec![FileCategory::Documents]);
    }
}
