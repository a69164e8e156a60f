use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::pages::{discover_articles, display_path};

/// Hex-escaped segments MoinMoin leaves in page directory names.
pub const DEFAULT_REPLACEMENTS: &[(&str, &str)] = &[
    ("(20)", " "),
    ("(20c3a5)", " å"),
    ("(26)", "&"),
    ("(2b2b)", "++"),
    ("(2d)", "-"),
    ("(2dc3a5)", "-å"),
    ("(2e)", "."),
    ("(2f)", "--"),
    ("(c396)", "Ö"),
    ("(c3a4)", "ä"),
    ("(c3a5)", "å"),
    ("(c3a9)", "e"),
    ("(c3b6)", "ö"),
];

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Replacement {
    pub from: String,
    pub to: String,
}

pub fn default_replacements() -> Vec<Replacement> {
    DEFAULT_REPLACEMENTS
        .iter()
        .map(|(from, to)| Replacement {
            from: (*from).to_string(),
            to: (*to).to_string(),
        })
        .collect()
}

/// Apply every replacement, in table order, to a directory name.
pub fn apply_replacements(name: &str, table: &[Replacement]) -> String {
    table
        .iter()
        .filter(|replacement| !replacement.from.is_empty())
        .fold(name.to_string(), |current, replacement| {
            current.replace(&replacement.from, &replacement.to)
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenameStatus {
    Renamed,
    Planned,
    Collision,
}

#[derive(Debug, Clone, Serialize)]
pub struct RenameEntry {
    pub from: String,
    pub to: String,
    pub status: RenameStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct RenameReport {
    pub pages_dir: String,
    pub dry_run: bool,
    pub unchanged: usize,
    pub entries: Vec<RenameEntry>,
}

impl RenameReport {
    pub fn count(&self, status: RenameStatus) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.status == status)
            .count()
    }
}

/// Normalize legacy page directory names in place.
///
/// A destination that already exists, or that an earlier entry in the same
/// pass claimed, is never overwritten; the entry is reported as a collision
/// and left alone. Dry runs report the same statuses a real pass would.
pub fn rename_page_dirs(
    pages_dir: &Path,
    table: &[Replacement],
    dry_run: bool,
) -> Result<RenameReport> {
    let mut entries = Vec::new();
    let mut unchanged = 0usize;
    let mut claimed = HashSet::new();

    for article in discover_articles(pages_dir)? {
        let renamed = apply_replacements(&article.name, table);
        if renamed == article.name {
            unchanged += 1;
            continue;
        }

        let target = pages_dir.join(&renamed);
        let status = if target.exists() || !claimed.insert(renamed.clone()) {
            warn!(
                from = %article.name,
                to = %renamed,
                "skipping rename, destination already exists"
            );
            RenameStatus::Collision
        } else if dry_run {
            RenameStatus::Planned
        } else {
            fs::rename(&article.root, &target).with_context(|| {
                format!(
                    "failed to rename {} to {}",
                    display_path(&article.root),
                    display_path(&target)
                )
            })?;
            info!(from = %article.name, to = %renamed, "renamed page directory");
            RenameStatus::Renamed
        };

        entries.push(RenameEntry {
            from: article.name,
            to: renamed,
            status,
        });
    }

    Ok(RenameReport {
        pages_dir: display_path(pages_dir),
        dry_run,
        unchanged,
        entries,
    })
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn default_table_decodes_legacy_names() {
        let table = default_replacements();
        assert_eq!(apply_replacements("Front(20)Page", &table), "Front Page");
        assert_eq!(apply_replacements("C(2b2b)(2f)Notes", &table), "C++--Notes");
        assert_eq!(apply_replacements("Sm(c3b6)rg(c3a5)s", &table), "Smörgås");
        assert_eq!(apply_replacements("V(2e)1(2dc3a5)r", &table), "V.1-år");
        assert_eq!(apply_replacements("Plain", &table), "Plain");
    }

    #[test]
    fn empty_patterns_are_ignored() {
        let table = vec![Replacement {
            from: String::new(),
            to: "x".to_string(),
        }];
        assert_eq!(apply_replacements("Name", &table), "Name");
    }

    #[test]
    fn rename_moves_directories_and_skips_collisions() {
        let temp = tempdir().expect("tempdir");
        let pages = temp.path().join("pages");
        fs::create_dir_all(pages.join("Front(20)Page").join("revisions")).expect("create");
        fs::create_dir_all(pages.join("Hello(2d)World")).expect("create");
        fs::create_dir_all(pages.join("Hello-World")).expect("create");
        fs::create_dir_all(pages.join("Plain")).expect("create");

        let report =
            rename_page_dirs(&pages, &default_replacements(), false).expect("rename");

        assert_eq!(report.unchanged, 2);
        assert_eq!(report.count(RenameStatus::Renamed), 1);
        assert_eq!(report.count(RenameStatus::Collision), 1);
        assert!(pages.join("Front Page").join("revisions").is_dir());
        assert!(!pages.join("Front(20)Page").exists());
        assert!(pages.join("Hello(2d)World").is_dir());
    }

    #[test]
    fn dry_run_only_plans() {
        let temp = tempdir().expect("tempdir");
        let pages = temp.path().join("pages");
        fs::create_dir_all(pages.join("Caf(c3a9)")).expect("create");

        let report =
            rename_page_dirs(&pages, &default_replacements(), true).expect("dry run");

        assert!(report.dry_run);
        assert_eq!(report.entries.len(), 1);
        assert_eq!(report.entries[0].to, "Cafe");
        assert_eq!(report.entries[0].status, RenameStatus::Planned);
        assert!(pages.join("Caf(c3a9)").is_dir());
    }

    #[test]
    fn dry_run_matches_real_run_when_names_converge() {
        let temp = tempdir().expect("tempdir");
        let pages = temp.path().join("pages");
        fs::create_dir_all(pages.join("X(2f)Y")).expect("create");
        fs::create_dir_all(pages.join("X(2d)(2d)Y")).expect("create");
        let table = default_replacements();

        let statuses = |report: &RenameReport| {
            report
                .entries
                .iter()
                .map(|entry| (entry.from.clone(), entry.to.clone(), entry.status))
                .collect::<Vec<_>>()
        };

        let planned = rename_page_dirs(&pages, &table, true).expect("dry run");
        assert_eq!(
            statuses(&planned),
            vec![
                ("X(2d)(2d)Y".to_string(), "X--Y".to_string(), RenameStatus::Planned),
                ("X(2f)Y".to_string(), "X--Y".to_string(), RenameStatus::Collision),
            ]
        );

        let applied = rename_page_dirs(&pages, &table, false).expect("rename");
        assert_eq!(
            statuses(&applied),
            vec![
                ("X(2d)(2d)Y".to_string(), "X--Y".to_string(), RenameStatus::Renamed),
                ("X(2f)Y".to_string(), "X--Y".to_string(), RenameStatus::Collision),
            ]
        );
        assert!(pages.join("X--Y").is_dir());
        assert!(pages.join("X(2f)Y").is_dir());
    }
}
