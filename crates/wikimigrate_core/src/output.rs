use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::translate::SECTION_MARKER;

/// A destination that cannot be written. Always fatal for the run.
#[derive(Debug, Error)]
#[error("failed to {action} {}: {source}", .path.display())]
pub struct OutputError {
    pub action: &'static str,
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

impl OutputError {
    fn new(action: &'static str, path: &Path, source: io::Error) -> Self {
        Self {
            action,
            path: path.to_path_buf(),
            source,
        }
    }
}

pub trait ArticleSink {
    fn write_article(&mut self, name: &str, lines: &[String]) -> Result<(), OutputError>;
}

/// One plain file per article, named after the article.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn create(dir: &Path) -> Result<Self, OutputError> {
        fs::create_dir_all(dir).map_err(|err| OutputError::new("create", dir, err))?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn article_path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

impl ArticleSink for DirectorySink {
    fn write_article(&mut self, name: &str, lines: &[String]) -> Result<(), OutputError> {
        let path = self.article_path(name);
        fs::write(&path, render_lines(lines)).map_err(|err| OutputError::new("write", &path, err))
    }
}

/// Shared Org document, one top-level section per article.
///
/// Sections are appended, never replaced: writing into an existing document
/// adds to it. Call [`OutlineSink::truncate`] first for an empty document.
#[derive(Debug, Clone)]
pub struct OutlineSink {
    path: PathBuf,
}

impl OutlineSink {
    pub fn open(path: &Path) -> Result<Self, OutputError> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| OutputError::new("create", parent, err))?;
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    /// Empty the document, creating it if needed. The file is never removed.
    pub fn truncate(&self) -> Result<(), OutputError> {
        File::create(&self.path)
            .map(drop)
            .map_err(|err| OutputError::new("truncate", &self.path, err))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ArticleSink for OutlineSink {
    fn write_article(&mut self, name: &str, lines: &[String]) -> Result<(), OutputError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|err| OutputError::new("open", &self.path, err))?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(section_header(name).as_bytes())
            .and_then(|()| writer.write_all(render_lines(lines).as_bytes()))
            .and_then(|()| writer.flush())
            .map_err(|err| OutputError::new("append to", &self.path, err))
    }
}

/// Top-level outline heading for an article, newline included.
pub fn section_header(name: &str) -> String {
    format!("{SECTION_MARKER} {name}\n")
}

fn render_lines(lines: &[String]) -> String {
    let mut out = String::with_capacity(lines.iter().map(|line| line.len() + 1).sum());
    for line in lines {
        out.push_str(line);
        out.push('\n');
    }
    out
}
