//! Classifies version 2 flow log records against a [`TagIndex`].
//!
//! A record has 14 columns:
//!
//! ```text
//! version account-id interface-id srcaddr dstaddr srcport dstport protocol
//! packets bytes start_time end_time action log-status
//! ```
//!
//! Only `dstport` and `protocol` take part in classification. The numeric
//! protocol is resolved to its registered name before the index is queried.

use std::{
    fs::File,
    io,
    num::ParseIntError,
    path::{Path, PathBuf},
};

use csv::{ReaderBuilder, StringRecord, Trim};
use snafu::{ResultExt, Snafu, ensure};

use crate::{
    internal_events::error_type,
    lookup_table::{line_of, normalize},
    protocols::protocol_name,
    tag_index::TagIndex,
};

#[derive(Debug, Snafu)]
pub enum FlowLogError {
    #[snafu(display("Unable to open {}: {}", path.display(), source))]
    Open { path: PathBuf, source: io::Error },

    #[snafu(display("Unable to read record: {}", source))]
    Read { source: csv::Error },

    #[snafu(display("Expected {} columns on line {}, found {}", expected, line, found))]
    ColumnCount {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[snafu(display("Invalid destination port {:?} on line {}: {}", value, line, source))]
    InvalidPort {
        line: u64,
        value: String,
        source: ParseIntError,
    },

    #[snafu(display("Invalid protocol number {:?} on line {}: {}", value, line, source))]
    InvalidProtocol {
        line: u64,
        value: String,
        source: ParseIntError,
    },
}

impl FlowLogError {
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Open { .. } => "open_failed",
            Self::Read { .. } => "read_failed",
            Self::ColumnCount { .. } => "column_count_mismatch",
            Self::InvalidPort { .. } => "invalid_port",
            Self::InvalidProtocol { .. } => "invalid_protocol",
        }
    }

    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::Open { .. } | Self::Read { .. } => error_type::READER_FAILED,
            _ => error_type::PARSER_FAILED,
        }
    }

    /// Returns `true` if the file itself could not be opened.
    pub const fn is_unreadable(&self) -> bool {
        matches!(self, Self::Open { .. })
    }
}

/// The fields of a flow log record that classification looks at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlowRecord {
    pub dstport: u16,
    pub protocol: u32,
}

impl FlowRecord {
    pub const COLUMNS: usize = 14;
    const DSTPORT: usize = 6;
    const PROTOCOL: usize = 7;

    pub fn from_record(record: &StringRecord) -> Result<Self, FlowLogError> {
        let line = line_of(record);
        ensure!(
            record.len() == Self::COLUMNS,
            ColumnCountSnafu {
                line,
                expected: Self::COLUMNS,
                found: record.len(),
            }
        );

        let dstport = record[Self::DSTPORT].trim();
        let dstport = dstport
            .parse::<u16>()
            .context(InvalidPortSnafu {
                line,
                value: dstport,
            })?;

        let protocol = record[Self::PROTOCOL].trim();
        let protocol = protocol
            .parse::<u32>()
            .context(InvalidProtocolSnafu {
                line,
                value: protocol,
            })?;

        Ok(Self { dstport, protocol })
    }

    /// Case-normalized name of the record's protocol, `unassigned` when the
    /// number has no registration.
    pub fn protocol_name(&self) -> String {
        normalize(protocol_name(self.protocol))
    }
}

/// What a classification pass did, for logging.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClassifySummary {
    /// Records read, header excluded.
    pub records: usize,
    /// Records whose pair carried a tag.
    pub tagged: usize,
    /// Records counted in the untagged bucket.
    pub untagged: usize,
}

/// Reads a flow log, header row first, and counts every record in `index`.
///
/// Any malformed record aborts the pass. Counts already advanced by earlier
/// records stay in the index, so callers must discard it on error.
pub fn classify<R: io::Read>(
    reader: R,
    index: &mut TagIndex,
) -> Result<ClassifySummary, FlowLogError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);

    let untagged_before = index.untagged_count();
    let mut record = StringRecord::new();
    let mut records = 0;

    while reader.read_record(&mut record).context(ReadSnafu)? {
        let flow = FlowRecord::from_record(&record)?;
        index.search_and_count(flow.dstport, &flow.protocol_name());
        records += 1;
    }

    let untagged = index.untagged_count() - untagged_before;
    Ok(ClassifySummary {
        records,
        tagged: records - untagged,
        untagged,
    })
}

/// Opens `path` and [`classify`]s it.
pub fn classify_path(path: &Path, index: &mut TagIndex) -> Result<ClassifySummary, FlowLogError> {
    let file = File::open(path).context(OpenSnafu { path })?;
    classify(file, index)
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;
    use crate::tag_index::{Combination, TagIndexBuilder};

    const HEADER: &str = "version,account-id,interface-id,srcaddr,dstaddr,srcport,dstport,protocol,packets,bytes,start_time,end_time,action,log-status\n";

    fn record(dstport: &str, protocol: &str) -> String {
        format!(
            "2,123456789012,eni-0a1b2c3d,10.0.1.201,198.51.100.2,49153,{dstport},{protocol},25,20000,1620140761,1620140821,ACCEPT,OK\n"
        )
    }

    fn flow_log(records: &[(&str, &str)]) -> String {
        records
            .iter()
            .fold(HEADER.to_string(), |mut log, (dstport, protocol)| {
                log.push_str(&record(dstport, protocol));
                log
            })
    }

    fn https_index() -> TagIndex {
        let mut builder = TagIndexBuilder::new();
        builder.insert(443, "tcp", "sv_p1");
        builder.build()
    }

    #[test]
    fn classifies_records() {
        let mut index = https_index();
        let log = flow_log(&[("443", "6"), ("443", "6"), ("443", "6"), ("80", "6")]);

        let summary = classify(log.as_bytes(), &mut index).unwrap();

        assert_eq!(
            summary,
            ClassifySummary {
                records: 4,
                tagged: 3,
                untagged: 1,
            }
        );
        assert_eq!(index.tag_counts().get("sv_p1"), Some(&3));
        assert_eq!(
            index.untagged_combinations().get(&Combination::new(80, "tcp")),
            Some(&1)
        );
    }

    #[test]
    fn header_only_log_counts_nothing() {
        let mut index = https_index();

        let summary = classify(HEADER.as_bytes(), &mut index).unwrap();

        assert_eq!(summary, ClassifySummary::default());
        assert_eq!(index.untagged_count(), 0);
    }

    #[test]
    fn unregistered_protocol_is_unassigned() {
        let mut index = https_index();
        let log = flow_log(&[("443", "200")]);

        classify(log.as_bytes(), &mut index).unwrap();

        assert!(index.tag_counts().is_empty());
        assert_eq!(
            index.untagged_combinations().get(&Combination::new(443, "unassigned")),
            Some(&1)
        );
    }

    #[test]
    fn unassigned_protocol_can_be_tagged() {
        let mut builder = TagIndexBuilder::new();
        builder.insert(1000, "unassigned", "odd");
        let mut index = builder.build();

        classify(flow_log(&[("1000", "150")]).as_bytes(), &mut index).unwrap();

        assert_eq!(index.tag_counts().get("odd"), Some(&1));
    }

    #[test]
    fn resolves_protocol_names() {
        let flow = |protocol| FlowRecord {
            dstport: 0,
            protocol,
        };

        assert_eq!(flow(1).protocol_name(), "icmp");
        assert_eq!(flow(17).protocol_name(), "udp");
        assert_eq!(flow(58).protocol_name(), "ipv6-icmp");
        assert_eq!(flow(999).protocol_name(), "unassigned");
    }

    #[test]
    fn rejects_missing_columns() {
        let mut index = https_index();
        let log = format!("{HEADER}2,123456789012,eni-0a1b2c3d,10.0.1.201,198.51.100.2,49153,443\n");

        let error = classify(log.as_bytes(), &mut index).unwrap_err();

        assert!(matches!(
            error,
            FlowLogError::ColumnCount {
                line: 2,
                expected: 14,
                found: 7
            }
        ));
    }

    #[test]
    fn rejects_non_numeric_protocol() {
        let mut index = https_index();
        let log = flow_log(&[("443", "6"), ("443", "tcp")]);

        let error = classify(log.as_bytes(), &mut index).unwrap_err();

        assert_eq!(
            error.to_string(),
            r#"Invalid protocol number "tcp" on line 3: invalid digit found in string"#
        );
        assert_eq!(error.error_code(), "invalid_protocol");
    }

    #[test]
    fn rejects_non_numeric_port() {
        let mut index = https_index();
        let log = flow_log(&[("-", "6")]);

        let error = classify(log.as_bytes(), &mut index).unwrap_err();

        assert!(matches!(error, FlowLogError::InvalidPort { line: 2, .. }));
    }

    #[test]
    fn missing_file_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = https_index();

        let error = classify_path(&dir.path().join("flow_log.csv"), &mut index).unwrap_err();

        assert!(error.is_unreadable());
    }
}
