//! Configuration
//!
//! TOML configuration for template locations, output naming, derived-field
//! settings and the payee address book. Every section and key has a default,
//! so an empty file (or no file at all) is a valid configuration.

use crate::calc::DEFAULT_DEPARTMENT_PREFIX;
use crate::model::FormKind;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_FILE_PREFIX: &str = "USC_Finance_Package";

/// Main configuration structure loaded from TOML files
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// PDF template locations
    pub templates: TemplatesConfig,
    /// Where and under what name packages are written
    pub output: OutputConfig,
    /// Settings for derived fields
    pub derived: DerivedConfig,
    /// Named payee addresses, selectable from a session by key
    pub address_book: BTreeMap<String, String>,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Relative template paths and a relative output directory are resolved
    /// against the directory containing the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the TOML is malformed.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use formpack_core::config::Config;
    ///
    /// # fn example() -> anyhow::Result<()> {
    /// let config = Config::from_file("formpack.toml")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config = Self::from_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        if let Some(base) = path.parent() {
            config.resolve_relative_to(base);
        }
        Ok(config)
    }

    /// Parse configuration from a TOML string
    ///
    /// # Example
    ///
    /// ```
    /// use formpack_core::config::Config;
    ///
    /// # fn example() -> anyhow::Result<()> {
    /// let config = Config::from_str(r#"
    ///     [output]
    ///     file_prefix = "Club_Package"
    /// "#)?;
    /// assert_eq!(config.output.file_prefix, "Club_Package");
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        toml::from_str(s).context("Failed to parse TOML configuration")
    }

    fn resolve_relative_to(&mut self, base: &Path) {
        for path in [
            &mut self.templates.cover_sheet,
            &mut self.templates.non_travel,
            &mut self.templates.travel,
            &mut self.output.directory,
        ] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplatesConfig {
    pub cover_sheet: PathBuf,
    pub non_travel: PathBuf,
    pub travel: PathBuf,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            cover_sheet: PathBuf::from("templates/Expense_Cover_Sheet.pdf"),
            non_travel: PathBuf::from("templates/Non_travel expense form.pdf"),
            travel: PathBuf::from("templates/Travel_Expense_Form.pdf"),
        }
    }
}

impl TemplatesConfig {
    pub fn path_for(&self, form: FormKind) -> &Path {
        match form {
            FormKind::CoverSheet => &self.cover_sheet,
            FormKind::NonTravelExpense => &self.non_travel,
            FormKind::TravelExpense => &self.travel,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,
    /// Package file names are `<file_prefix>_<YYYYmmdd_HHMMSS>.pdf`
    pub file_prefix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DerivedConfig {
    /// Text placed before the club name in the department field
    pub department_prefix: String,
}

impl Default for DerivedConfig {
    fn default() -> Self {
        Self {
            department_prefix: DEFAULT_DEPARTMENT_PREFIX.to_string(),
        }
    }
}
