use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Serialize;
use tracing::warn;
use walkdir::WalkDir;

use crate::revision::FsRevisionSource;

/// One page directory of a MoinMoin `pages/` export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Article {
    pub name: String,
    pub root: PathBuf,
}

impl Article {
    pub fn revision_source(&self) -> FsRevisionSource {
        FsRevisionSource::new(&self.root)
    }
}

/// List the article directories directly under `pages_dir`, sorted by name.
pub fn discover_articles(pages_dir: &Path) -> Result<Vec<Article>> {
    if !pages_dir.is_dir() {
        bail!("pages directory not found: {}", display_path(pages_dir));
    }

    let mut articles = Vec::new();
    for entry in WalkDir::new(pages_dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if err.depth() == 0 => {
                return Err(err)
                    .with_context(|| format!("failed to list {}", display_path(pages_dir)));
            }
            Err(err) => {
                warn!(path = ?err.path(), "ignoring unreadable page entry: {err}");
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }
        articles.push(Article {
            name: entry.file_name().to_string_lossy().to_string(),
            root: entry.path().to_path_buf(),
        });
    }
    Ok(articles)
}

pub fn display_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
