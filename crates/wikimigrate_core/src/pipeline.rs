use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::output::{ArticleSink, DirectorySink, OutlineSink};
use crate::pages::{Article, discover_articles, display_path};
use crate::revision::{ResolutionExhausted, ResolvedVia, RevisionId, RevisionSource, resolve};
use crate::translate::translate_text;

#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    pub pages_dir: PathBuf,
    pub output_dir: Option<PathBuf>,
    pub org_file: Option<PathBuf>,
    /// Remove an existing Org document before appending to it.
    pub truncate_org: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatedArticle {
    pub revision: RevisionId,
    pub via: ResolvedVia,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    NoRevisions,
    RevisionsUnlistable { detail: String },
    FallbackUnreadable { revision: RevisionId, detail: String },
    EmptyRevision { revision: RevisionId },
}

impl From<ResolutionExhausted> for SkipReason {
    fn from(value: ResolutionExhausted) -> Self {
        match value {
            ResolutionExhausted::NoRevisions => Self::NoRevisions,
            ResolutionExhausted::ListingFailed(err) => Self::RevisionsUnlistable {
                detail: err.to_string(),
            },
            ResolutionExhausted::FallbackReadFailed { revision, source } => {
                Self::FallbackUnreadable {
                    revision,
                    detail: source.to_string(),
                }
            }
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoRevisions => f.write_str("no revisions found"),
            Self::RevisionsUnlistable { detail } => write!(f, "revisions unlistable ({detail})"),
            Self::FallbackUnreadable { revision, detail } => {
                write!(f, "revision {revision} unreadable ({detail})")
            }
            Self::EmptyRevision { revision } => write!(f, "revision {revision} is empty"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArticleOutcome {
    Resolved(TranslatedArticle),
    Skipped(SkipReason),
}

/// Resolve and translate one article without writing anything.
pub fn convert_article<S>(name: &str, source: &S) -> ArticleOutcome
where
    S: RevisionSource + ?Sized,
{
    let resolution = match resolve(name, source) {
        Ok(resolution) => resolution,
        Err(err) => return ArticleOutcome::Skipped(err.into()),
    };

    let content = resolution.content.trim();
    if content.is_empty() {
        return ArticleOutcome::Skipped(SkipReason::EmptyRevision {
            revision: resolution.revision,
        });
    }

    ArticleOutcome::Resolved(TranslatedArticle {
        lines: translate_text(content),
        revision: resolution.revision,
        via: resolution.via,
    })
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ArticleStatus {
    Converted {
        revision: RevisionId,
        via: ResolvedVia,
        lines: usize,
    },
    Skipped {
        reason: SkipReason,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct ArticleReport {
    pub name: String,
    #[serde(flatten)]
    pub status: ArticleStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConvertReport {
    pub pages_dir: String,
    pub output_dir: Option<String>,
    pub org_file: Option<String>,
    pub discovered: usize,
    pub interrupted: bool,
    pub articles: Vec<ArticleReport>,
}

impl ConvertReport {
    pub fn converted(&self) -> usize {
        self.articles
            .iter()
            .filter(|article| matches!(article.status, ArticleStatus::Converted { .. }))
            .count()
    }

    pub fn skipped(&self) -> impl Iterator<Item = (&str, &SkipReason)> {
        self.articles
            .iter()
            .filter_map(|article| match &article.status {
                ArticleStatus::Skipped { reason } => Some((article.name.as_str(), reason)),
                ArticleStatus::Converted { .. } => None,
            })
    }

    pub fn fallbacks(&self) -> usize {
        self.articles
            .iter()
            .filter(|article| {
                matches!(
                    article.status,
                    ArticleStatus::Converted {
                        via: ResolvedVia::Fallback { .. },
                        ..
                    }
                )
            })
            .count()
    }
}

pub fn convert_pages(options: &ConvertOptions) -> Result<ConvertReport> {
    convert_pages_until(options, &AtomicBool::new(false))
}

/// Convert every article under `options.pages_dir`, checking `stop` between
/// articles.
///
/// Articles that cannot be resolved are skipped and reported. An output that
/// cannot be written aborts the run.
pub fn convert_pages_until(options: &ConvertOptions, stop: &AtomicBool) -> Result<ConvertReport> {
    let articles = discover_articles(&options.pages_dir)?;

    let mut directory = match &options.output_dir {
        Some(output_dir) => Some(DirectorySink::create(output_dir)?),
        None => None,
    };
    let mut outline = match &options.org_file {
        Some(org_file) => {
            let sink = OutlineSink::open(org_file)?;
            if options.truncate_org {
                sink.truncate()?;
            }
            Some(sink)
        }
        None => None,
    };

    let mut sinks: Vec<&mut dyn ArticleSink> = Vec::new();
    if let Some(directory) = directory.as_mut() {
        sinks.push(directory);
    }
    if let Some(outline) = outline.as_mut() {
        sinks.push(outline);
    }

    let (reports, interrupted) = run_articles(&articles, &mut sinks, stop)?;
    Ok(ConvertReport {
        pages_dir: display_path(&options.pages_dir),
        output_dir: options.output_dir.as_deref().map(display_path),
        org_file: options.org_file.as_deref().map(display_path),
        discovered: articles.len(),
        interrupted,
        articles: reports,
    })
}

/// Push each article through resolution, translation and every sink, in order.
/// Returns the per-article reports and whether `stop` cut the run short.
pub fn run_articles(
    articles: &[Article],
    sinks: &mut [&mut dyn ArticleSink],
    stop: &AtomicBool,
) -> Result<(Vec<ArticleReport>, bool)> {
    let mut reports = Vec::with_capacity(articles.len());

    for article in articles {
        if stop.load(Ordering::Relaxed) {
            info!(remaining = articles.len() - reports.len(), "stop requested");
            return Ok((reports, true));
        }

        debug!(article = %article.name, path = %display_path(&article.root), "converting");
        let status = match convert_article(&article.name, &article.revision_source()) {
            ArticleOutcome::Resolved(translated) => {
                for sink in sinks.iter_mut() {
                    sink.write_article(&article.name, &translated.lines)
                        .with_context(|| format!("failed to write article {}", article.name))?;
                }
                ArticleStatus::Converted {
                    lines: translated.lines.len(),
                    revision: translated.revision,
                    via: translated.via,
                }
            }
            ArticleOutcome::Skipped(reason) => {
                warn!(article = %article.name, "giving up on article: {reason}");
                ArticleStatus::Skipped { reason }
            }
        };

        reports.push(ArticleReport {
            name: article.name.clone(),
            status,
        });
    }

    Ok((reports, false))
}
