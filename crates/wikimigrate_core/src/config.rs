use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::rename::{Replacement, default_replacements};

pub const DEFAULT_CONFIG_FILENAME: &str = "wikimigrate.toml";

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct MigrateConfig {
    #[serde(default)]
    pub convert: ConvertSection,
    #[serde(default)]
    pub rename: RenameSection,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct ConvertSection {
    pub pages_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub org_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RenameSection {
    #[serde(default = "default_use_defaults")]
    pub use_defaults: bool,
    #[serde(default)]
    pub replacements: Vec<Replacement>,
}

impl Default for RenameSection {
    fn default() -> Self {
        Self {
            use_defaults: true,
            replacements: Vec::new(),
        }
    }
}

fn default_use_defaults() -> bool {
    true
}

impl MigrateConfig {
    /// Replacement table for the rename pass: built-ins (unless disabled)
    /// followed by configured extras.
    pub fn rename_table(&self) -> Vec<Replacement> {
        let mut table = if self.rename.use_defaults {
            default_replacements()
        } else {
            Vec::new()
        };
        table.extend(self.rename.replacements.iter().cloned());
        table
    }
}

/// Load and parse a MigrateConfig from a TOML file. Returns default if file doesn't exist.
pub fn load_config(config_path: &Path) -> Result<MigrateConfig> {
    if !config_path.exists() {
        return Ok(MigrateConfig::default());
    }
    let content = fs::read_to_string(config_path)
        .with_context(|| format!("failed to read {}", config_path.display()))?;
    let parsed: MigrateConfig = toml::from_str(&content)
        .with_context(|| format!("failed to parse {}", config_path.display()))?;
    for replacement in &parsed.rename.replacements {
        if replacement.from.is_empty() {
            bail!(
                "rename replacement pattern cannot be empty in {}",
                config_path.display()
            );
        }
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn default_config_has_no_paths() {
        let config = MigrateConfig::default();
        assert!(config.convert.pages_dir.is_none());
        assert!(config.convert.output_dir.is_none());
        assert!(config.convert.org_file.is_none());
        assert!(config.rename.use_defaults);
    }

    #[test]
    fn load_config_returns_default_for_missing_file() {
        let config = load_config(Path::new("/nonexistent/wikimigrate.toml")).expect("load config");
        assert_eq!(config, MigrateConfig::default());
    }

    #[test]
    fn load_config_parses_sections() {
        let temp = tempdir().expect("tempdir");
        let config_path = temp.path().join("wikimigrate.toml");
        fs::write(
            &config_path,
            r#"
[convert]
pages_dir = "data/pages"
output_dir = "out"
org_file = "wiki.org"

[rename]
use_defaults = false

[[rename.replacements]]
from = "(c3bc)"
to = "ü"
"#,
        )
        .expect("write config");

        let config = load_config(&config_path).expect("load config");
        assert_eq!(
            config.convert.pages_dir.as_deref(),
            Some(Path::new("data/pages"))
        );
        assert_eq!(config.convert.output_dir.as_deref(), Some(Path::new("out")));
        assert_eq!(config.convert.org_file.as_deref(), Some(Path::new("wiki.org")));
        assert_eq!(
            config.rename_table(),
            vec![Replacement {
                from: "(c3bc)".to_string(),
                to: "ü".to_string(),
            }]
        );
    }

    #[test]
    fn rename_table_appends_extras_to_defaults() {
        let config = MigrateConfig {
            rename: RenameSection {
                use_defaults: true,
                replacements: vec![Replacement {
                    from: "(c3bc)".to_string(),
                    to: "ü".to_string(),
                }],
            },
            ..MigrateConfig::default()
        };
        let table = config.rename_table();
        assert_eq!(table.len(), default_replacements().len() + 1);
        assert_eq!(table.last().map(|r| r.to.as_str()), Some("ü"));
    }

    #[test]
    fn load_config_tolerates_partial_toml() {
        let temp = tempdir().expect("tempdir");
        let config_path = temp.path().join("wikimigrate.toml");
        fs::write(&config_path, "[convert]\norg_file = \"wiki.org\"\n").expect("write config");

        let config = load_config(&config_path).expect("load config");
        assert!(config.convert.pages_dir.is_none());
        assert!(config.rename.use_defaults);
    }

    #[test]
    fn load_config_returns_error_for_invalid_toml() {
        let temp = tempdir().expect("tempdir");
        let config_path = temp.path().join("wikimigrate.toml");
        fs::write(&config_path, "[convert\npages_dir = \"oops\"").expect("write config");
        let error = load_config(&config_path).expect_err("must fail");
        assert!(error.to_string().contains("failed to parse"));
    }

    #[test]
    fn load_config_rejects_empty_replacement_pattern() {
        let temp = tempdir().expect("tempdir");
        let config_path = temp.path().join("wikimigrate.toml");
        fs::write(
            &config_path,
            "[[rename.replacements]]\nfrom = \"\"\nto = \"x\"\n",
        )
        .expect("write config");
        let error = load_config(&config_path).expect_err("must fail");
        assert!(error.to_string().contains("cannot be empty"));
    }
}
