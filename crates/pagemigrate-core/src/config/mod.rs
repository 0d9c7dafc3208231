use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{MigrateError, Result};
use crate::home_pages::HomePageOptions;
use crate::reconcile::MatchOptions;
use crate::similarity::{DEFAULT_HOME_PAGE_CUTOFF, DEFAULT_TITLE_CUTOFF, SimilarityMetric};

mod env;

pub const ENV_TITLE_CUTOFF: &str = "PAGEMIGRATE_TITLE_CUTOFF";
pub const ENV_HOME_PAGE_CUTOFF: &str = "PAGEMIGRATE_HOME_PAGE_CUTOFF";
pub const ENV_METRIC: &str = "PAGEMIGRATE_METRIC";
pub const ENV_STRIP_HOME_ICONS: &str = "PAGEMIGRATE_STRIP_HOME_ICONS";

pub const DEFAULT_AUDIT_FILE_NAME: &str = "html_title_to_md_title.csv";
pub const DEFAULT_MANIFEST_FILE_NAME: &str = "migration-manifest.json";

/// Tunables shared by both pipelines.
///
/// Layered as defaults, then an optional TOML file, then `PAGEMIGRATE_*`
/// environment variables; command-line flags are applied last by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MigrationConfig {
    pub title_cutoff: f64,
    pub home_page_cutoff: f64,
    pub metric: SimilarityMetric,
    pub strip_home_icons: bool,
    pub exclude_globs: Vec<String>,
    pub audit_file_name: String,
    pub manifest_file_name: String,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            title_cutoff: DEFAULT_TITLE_CUTOFF,
            home_page_cutoff: DEFAULT_HOME_PAGE_CUTOFF,
            metric: SimilarityMetric::default(),
            strip_home_icons: false,
            exclude_globs: Vec::new(),
            audit_file_name: DEFAULT_AUDIT_FILE_NAME.to_string(),
            manifest_file_name: DEFAULT_MANIFEST_FILE_NAME.to_string(),
        }
    }
}

impl MigrationConfig {
    /// Defaults, overlaid with `path` when given, then with the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_toml_str(&std::fs::read_to_string(path)?)?,
            None => Self::default(),
        };
        config.overlay(env::read_non_empty_env)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config = toml::from_str::<Self>(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `PAGEMIGRATE_*` values produced by `lookup`.
    pub fn overlay<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_TITLE_CUTOFF) {
            self.title_cutoff = parse_cutoff(ENV_TITLE_CUTOFF, &raw)?;
        }
        if let Some(raw) = lookup(ENV_HOME_PAGE_CUTOFF) {
            self.home_page_cutoff = parse_cutoff(ENV_HOME_PAGE_CUTOFF, &raw)?;
        }
        if let Some(raw) = lookup(ENV_METRIC) {
            self.metric = raw.parse()?;
        }
        if let Some(raw) = lookup(ENV_STRIP_HOME_ICONS) {
            self.strip_home_icons = env::parse_env_bool(&raw).ok_or_else(|| {
                MigrateError::Validation(format!("invalid {ENV_STRIP_HOME_ICONS}: {raw}"))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("title_cutoff", self.title_cutoff),
            ("home_page_cutoff", self.home_page_cutoff),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(MigrateError::Validation(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        for (name, value) in [
            ("audit_file_name", &self.audit_file_name),
            ("manifest_file_name", &self.manifest_file_name),
        ] {
            if value.trim().is_empty() || value.contains(['/', '\\']) {
                return Err(MigrateError::Validation(format!(
                    "{name} must be a plain file name, got '{value}'"
                )));
            }
        }
        Ok(())
    }

    #[must_use]
    pub const fn match_options(&self) -> MatchOptions {
        MatchOptions {
            cutoff: self.title_cutoff,
            metric: self.metric,
        }
    }

    #[must_use]
    pub const fn home_page_options(&self) -> HomePageOptions {
        HomePageOptions {
            cutoff: self.home_page_cutoff,
            metric: self.metric,
        }
    }
}

fn parse_cutoff(name: &str, raw: &str) -> Result<f64> {
    raw.trim()
        .parse::<f64>()
        .map_err(|err| MigrateError::Validation(format!("invalid {name}: {raw} ({err})")))
}
