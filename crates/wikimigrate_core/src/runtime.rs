use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use crate::config::{DEFAULT_CONFIG_FILENAME, MigrateConfig, load_config};
use crate::pages::display_path;
use crate::pipeline::ConvertOptions;

pub const ENV_CONFIG: &str = "WIKIMIGRATE_CONFIG";
pub const ENV_PAGES_DIR: &str = "WIKIMIGRATE_PAGES_DIR";
pub const ENV_OUTPUT_DIR: &str = "WIKIMIGRATE_OUTPUT_DIR";
pub const ENV_ORG_FILE: &str = "WIKIMIGRATE_ORG_FILE";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    Flag,
    Env,
    Config,
    Default,
}

impl ValueSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flag => "flag",
            Self::Env => "env",
            Self::Config => "config",
            Self::Default => "default",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SettingOverrides {
    pub config: Option<PathBuf>,
    pub pages_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub org_file: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ResolutionContext {
    pub cwd: PathBuf,
}

impl ResolutionContext {
    pub fn from_process() -> Result<Self> {
        let cwd = env::current_dir().context("failed to read current directory")?;
        Ok(Self { cwd })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    pub path: Option<PathBuf>,
    pub source: ValueSource,
}

impl ResolvedPath {
    fn describe(&self) -> String {
        match &self.path {
            Some(path) => format!("{} ({})", display_path(path), self.source.as_str()),
            None => format!("<none> ({})", self.source.as_str()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedSettings {
    pub config_path: PathBuf,
    pub config_source: ValueSource,
    pub config: MigrateConfig,
    pub pages_dir: ResolvedPath,
    pub output_dir: ResolvedPath,
    pub org_file: ResolvedPath,
}

impl ResolvedSettings {
    pub fn diagnostics(&self) -> String {
        format!(
            "config_path={} ({})\nconfig_exists={}\npages_dir={}\noutput_dir={}\norg_file={}",
            display_path(&self.config_path),
            self.config_source.as_str(),
            self.config_path.exists(),
            self.pages_dir.describe(),
            self.output_dir.describe(),
            self.org_file.describe(),
        )
    }

    pub fn convert_options(&self, truncate_org: bool) -> Result<ConvertOptions> {
        let Some(pages_dir) = self.pages_dir.path.clone() else {
            bail!(
                "no pages directory configured.\nPass --pages-dir, set {ENV_PAGES_DIR}, or add `pages_dir` under [convert] in {}",
                display_path(&self.config_path)
            );
        };
        Ok(ConvertOptions {
            pages_dir,
            output_dir: self.output_dir.path.clone(),
            org_file: self.org_file.path.clone(),
            truncate_org,
        })
    }
}

/// Resolve every setting as flag > env > config file > unset.
pub fn resolve_settings(
    context: &ResolutionContext,
    overrides: &SettingOverrides,
) -> Result<ResolvedSettings> {
    resolve_settings_with_lookup(context, overrides, |key| env::var(key).ok())
}

fn resolve_settings_with_lookup<F>(
    context: &ResolutionContext,
    overrides: &SettingOverrides,
    lookup_env: F,
) -> Result<ResolvedSettings>
where
    F: Fn(&str) -> Option<String>,
{
    let (config_path, config_source) = if let Some(path) = overrides.config.as_deref() {
        (absolutize(path, &context.cwd), ValueSource::Flag)
    } else if let Some(value) = non_empty_env(&lookup_env, ENV_CONFIG) {
        (absolutize(Path::new(&value), &context.cwd), ValueSource::Env)
    } else {
        (context.cwd.join(DEFAULT_CONFIG_FILENAME), ValueSource::Default)
    };
    if config_source != ValueSource::Default && !config_path.exists() {
        bail!("config file not found: {}", display_path(&config_path));
    }
    let config = load_config(&config_path)?;

    let pages_dir = resolve_path(
        overrides.pages_dir.as_deref(),
        ENV_PAGES_DIR,
        config.convert.pages_dir.as_deref(),
        context,
        &lookup_env,
    );
    let output_dir = resolve_path(
        overrides.output_dir.as_deref(),
        ENV_OUTPUT_DIR,
        config.convert.output_dir.as_deref(),
        context,
        &lookup_env,
    );
    let org_file = resolve_path(
        overrides.org_file.as_deref(),
        ENV_ORG_FILE,
        config.convert.org_file.as_deref(),
        context,
        &lookup_env,
    );

    Ok(ResolvedSettings {
        config_path,
        config_source,
        config,
        pages_dir,
        output_dir,
        org_file,
    })
}

fn resolve_path<F>(
    flag: Option<&Path>,
    env_key: &str,
    configured: Option<&Path>,
    context: &ResolutionContext,
    lookup_env: &F,
) -> ResolvedPath
where
    F: Fn(&str) -> Option<String>,
{
    let (path, source) = if let Some(path) = flag {
        (Some(absolutize(path, &context.cwd)), ValueSource::Flag)
    } else if let Some(value) = non_empty_env(lookup_env, env_key) {
        (
            Some(absolutize(Path::new(&value), &context.cwd)),
            ValueSource::Env,
        )
    } else if let Some(path) = configured {
        (Some(absolutize(path, &context.cwd)), ValueSource::Config)
    } else {
        (None, ValueSource::Default)
    };
    ResolvedPath { path, source }
}

fn non_empty_env<F>(lookup_env: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup_env(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn absolutize(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
