//! Builds a [`TagIndex`] from a `dstport,protocol,tag` lookup table.

use std::{
    fs::File,
    io,
    num::ParseIntError,
    path::{Path, PathBuf},
};

use csv::{ReaderBuilder, StringRecord, Trim};
use snafu::{ResultExt, Snafu, ensure};

use crate::{
    internal_events::{LookupTableDuplicateIgnored, error_type},
    tag_index::{TagIndex, TagIndexBuilder},
};

#[derive(Debug, Snafu)]
pub enum LookupTableError {
    #[snafu(display("Unable to open {}: {}", path.display(), source))]
    Open { path: PathBuf, source: io::Error },

    #[snafu(display("Unable to read row: {}", source))]
    Read { source: csv::Error },

    #[snafu(display("Expected {} columns on line {}, found {}", expected, line, found))]
    ColumnCount {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[snafu(display("Invalid port {:?} on line {}: {}", value, line, source))]
    InvalidPort {
        line: u64,
        value: String,
        source: ParseIntError,
    },

    #[snafu(display("Empty {} on line {}", field, line))]
    EmptyField { line: u64, field: &'static str },
}

impl LookupTableError {
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Open { .. } => "open_failed",
            Self::Read { .. } => "read_failed",
            Self::ColumnCount { .. } => "column_count_mismatch",
            Self::InvalidPort { .. } => "invalid_port",
            Self::EmptyField { .. } => "empty_field",
        }
    }

    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::Open { .. } | Self::Read { .. } => error_type::READER_FAILED,
            _ => error_type::PARSER_FAILED,
        }
    }

    /// Returns `true` if the file itself could not be opened, as opposed to
    /// containing a bad row.
    pub const fn is_unreadable(&self) -> bool {
        matches!(self, Self::Open { .. })
    }
}

/// One row of the lookup table, with protocol and tag case-normalized.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LookupEntry {
    pub port: u16,
    pub protocol: String,
    pub tag: String,
}

impl LookupEntry {
    const COLUMNS: usize = 3;

    pub fn from_record(record: &StringRecord) -> Result<Self, LookupTableError> {
        let line = line_of(record);
        ensure!(
            record.len() == Self::COLUMNS,
            ColumnCountSnafu {
                line,
                expected: Self::COLUMNS,
                found: record.len(),
            }
        );

        let port = record[0].trim();
        let port = port
            .parse::<u16>()
            .context(InvalidPortSnafu { line, value: port })?;

        let protocol = normalize(&record[1]);
        ensure!(
            !protocol.is_empty(),
            EmptyFieldSnafu {
                line,
                field: "protocol"
            }
        );

        let tag = normalize(&record[2]);
        ensure!(!tag.is_empty(), EmptyFieldSnafu { line, field: "tag" });

        Ok(Self {
            port,
            protocol,
            tag,
        })
    }
}

/// What a load did, for logging.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Data rows read, header excluded.
    pub rows: usize,
    /// Distinct `(port, protocol)` pairs in the index.
    pub combinations: usize,
    /// Rows whose pair was already present.
    pub duplicates: usize,
}

/// Canonical form of protocol names and tags.
pub(crate) fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// 1-based line of `record` in its file.
pub(crate) fn line_of(record: &StringRecord) -> u64 {
    record.position().map_or(0, |position| position.line())
}

/// Reads a lookup table, header row first, and builds the index from it.
///
/// Rows are inserted in file order. The first tag seen for a `(port, protocol)`
/// pair is the one kept. Any malformed row aborts the load.
pub fn load<R: io::Read>(reader: R) -> Result<(TagIndex, LoadSummary), LookupTableError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut builder = TagIndexBuilder::new();
    let mut record = StringRecord::new();
    let mut rows = 0;

    while reader.read_record(&mut record).context(ReadSnafu)? {
        let entry = LookupEntry::from_record(&record)?;
        rows += 1;

        if let Some(kept) = builder.tag_for(entry.port, &entry.protocol)
            && kept != entry.tag
        {
            emit!(LookupTableDuplicateIgnored {
                line: line_of(&record),
                port: entry.port,
                protocol: &entry.protocol,
                kept,
                ignored: &entry.tag,
            });
        }

        builder.insert(entry.port, &entry.protocol, &entry.tag);
    }

    let summary = LoadSummary {
        rows,
        combinations: builder.len(),
        duplicates: rows - builder.len(),
    };
    Ok((builder.build(), summary))
}

/// Opens `path` and [`load`]s it.
pub fn load_path(path: &Path) -> Result<(TagIndex, LoadSummary), LookupTableError> {
    let file = File::open(path).context(OpenSnafu { path })?;
    load(file)
}
