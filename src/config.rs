//! Input and output locations for a run.
//!
//! Every path has a default, may be set from a TOML file, and may be
//! overridden again on the command line.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use snafu::{ResultExt, Snafu};

pub const DEFAULT_LOOKUP_TABLE: &str = "lookup_table_with_protocol_names.csv";
pub const DEFAULT_FLOW_LOG: &str = "flow_log.csv";
pub const DEFAULT_OUTPUT: &str = "tag_counts_and_port_protocol_combination_counts.csv";

#[derive(Debug, Snafu)]
pub enum ConfigError {
    #[snafu(display("Unable to read config {}: {}", path.display(), source))]
    Read { path: PathBuf, source: io::Error },

    #[snafu(display("Unable to parse config {}: {}", path.display(), source))]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl ConfigError {
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Read { .. } => "read_failed",
            Self::Parse { .. } => "parse_failed",
        }
    }
}

/// Paths used by a run.
///
/// ```toml
/// lookup_table = "lookup_table_with_protocol_names.csv"
/// flow_log = "flow_log.csv"
/// output = "tag_counts_and_port_protocol_combination_counts.csv"
/// ```
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// CSV file of `dstport,protocol,tag` rows.
    pub lookup_table: PathBuf,

    /// Version 2 flow log in CSV form.
    pub flow_log: PathBuf,

    /// Where the report is written. Overwritten if it exists.
    pub output: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lookup_table: DEFAULT_LOOKUP_TABLE.into(),
            flow_log: DEFAULT_FLOW_LOG.into(),
            output: DEFAULT_OUTPUT.into(),
        }
    }
}

impl Config {
    /// Reads a TOML config file. Keys it leaves out keep their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).context(ReadSnafu { path })?;
        toml::from_str(&content).context(ParseSnafu { path })
    }

    /// Replaces each path for which an override is given.
    pub fn with_overrides(
        mut self,
        lookup_table: Option<&Path>,
        flow_log: Option<&Path>,
        output: Option<&Path>,
    ) -> Self {
        if let Some(path) = lookup_table {
            self.lookup_table = path.to_path_buf();
        }
        if let Some(path) = flow_log {
            self.flow_log = path.to_path_buf();
        }
        if let Some(path) = output {
            self.output = path.to_path_buf();
        }
        self
    }
}
