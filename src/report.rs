//! The tag count and port/protocol count report.
//!
//! Both tables go to one CSV file, one after the other:
//!
//! ```text
//! Tag,Count
//! sv_p1,3
//! Untagged,1
//! Port,Protocol,Count
//! 443,tcp,3
//! 80,tcp,1
//! ```
//!
//! Tagged combinations come first, ordered by port, then the untagged ones in
//! the order they were first seen.

use std::{
    collections::BTreeMap,
    fs::File,
    io::{self, BufWriter},
    path::{Path, PathBuf},
};

use csv::WriterBuilder;
use indexmap::IndexMap;
use snafu::{ResultExt, Snafu};

use crate::tag_index::{Combination, TagIndex};

#[derive(Debug, Snafu)]
pub enum ReportError {
    #[snafu(display("Unable to create {}: {}", path.display(), source))]
    Create { path: PathBuf, source: io::Error },

    #[snafu(display("Unable to write row: {}", source))]
    Write { source: csv::Error },

    #[snafu(display("Unable to flush report: {}", source))]
    Flush { source: io::Error },
}

impl ReportError {
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create_failed",
            Self::Write { .. } => "write_failed",
            Self::Flush { .. } => "flush_failed",
        }
    }
}

/// Final counts extracted from a [`TagIndex`] once every record is counted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Report {
    pub tags: BTreeMap<String, usize>,
    pub untagged: usize,
    pub combinations: BTreeMap<Combination, usize>,
    pub untagged_combinations: IndexMap<Combination, usize>,
}

impl Report {
    pub fn from_index(index: &TagIndex) -> Self {
        Self {
            tags: index.tag_counts(),
            untagged: index.untagged_count(),
            combinations: index.combination_counts(),
            untagged_combinations: index.untagged_combinations().clone(),
        }
    }

    /// Number of records the report accounts for.
    pub fn records(&self) -> usize {
        self.tags.values().sum::<usize>() + self.untagged
    }

    /// Rows in the port/protocol table, header excluded.
    pub fn combination_rows(&self) -> usize {
        self.combinations.len() + self.untagged_combinations.len()
    }

    pub fn write<W: io::Write>(&self, writer: W) -> Result<(), ReportError> {
        let mut writer = WriterBuilder::new().flexible(true).from_writer(writer);

        writer.write_record(["Tag", "Count"]).context(WriteSnafu)?;
        for (tag, count) in &self.tags {
            writer
                .write_record([tag.as_str(), count.to_string().as_str()])
                .context(WriteSnafu)?;
        }
        writer
            .write_record(["Untagged", self.untagged.to_string().as_str()])
            .context(WriteSnafu)?;

        writer
            .write_record(["Port", "Protocol", "Count"])
            .context(WriteSnafu)?;
        for (combination, count) in self.combinations.iter().chain(&self.untagged_combinations) {
            writer
                .write_record([
                    combination.port.to_string().as_str(),
                    combination.protocol.as_str(),
                    count.to_string().as_str(),
                ])
                .context(WriteSnafu)?;
        }

        writer.flush().context(FlushSnafu)
    }

    /// Creates (or truncates) `path` and writes the report to it.
    pub fn write_path(&self, path: &Path) -> Result<(), ReportError> {
        let file = File::create(path).context(CreateSnafu { path })?;
        self.write(BufWriter::new(file))
    }
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;
    use crate::tag_index::TagIndexBuilder;

    fn render(report: &Report) -> String {
        let mut out = Vec::new();
        report.write(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn writes_both_tables() {
        let mut builder = TagIndexBuilder::new();
        builder.insert(443, "tcp", "sv_p1");
        let mut index = builder.build();
        for _ in 0..3 {
            index.search_and_count(443, "tcp");
        }
        index.search_and_count(80, "tcp");

        let report = Report::from_index(&index);

        assert_eq!(report.records(), 4);
        assert_eq!(report.combination_rows(), 2);
        assert_eq!(
            render(&report),
            "Tag,Count\n\
             sv_p1,3\n\
             Untagged,1\n\
             Port,Protocol,Count\n\
             443,tcp,3\n\
             80,tcp,1\n"
        );
    }

    #[test]
    fn empty_report() {
        let index = TagIndexBuilder::new().build();

        assert_eq!(
            render(&Report::from_index(&index)),
            "Tag,Count\nUntagged,0\nPort,Protocol,Count\n"
        );
    }

    #[test]
    fn tags_and_combinations_are_ordered() {
        let mut builder = TagIndexBuilder::new();
        builder.insert(8080, "tcp", "web");
        builder.insert(22, "tcp", "admin");
        builder.insert(53, "udp", "dns");
        builder.insert(53, "tcp", "dns");
        let mut index = builder.build();
        for (port, protocol) in [
            (8080, "tcp"),
            (53, "udp"),
            (9999, "udp"),
            (22, "tcp"),
            (53, "tcp"),
            (1, "tcp"),
            (9999, "udp"),
        ] {
            index.search_and_count(port, protocol);
        }

        assert_eq!(
            render(&Report::from_index(&index)),
            "Tag,Count\n\
             admin,1\n\
             dns,2\n\
             web,1\n\
             Untagged,3\n\
             Port,Protocol,Count\n\
             22,tcp,1\n\
             53,tcp,1\n\
             53,udp,1\n\
             8080,tcp,1\n\
             9999,udp,2\n\
             1,tcp,1\n"
        );
    }

    #[test]
    fn quotes_fields_when_needed() {
        let report = Report {
            tags: BTreeMap::from([("a,b".to_string(), 1)]),
            ..Default::default()
        };

        assert!(render(&report).contains("\"a,b\",1\n"));
    }

    #[test]
    fn writes_to_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");

        Report::default().write_path(&path).unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "Tag,Count\nUntagged,0\nPort,Protocol,Count\n"
        );
    }

    #[test]
    fn unwritable_path_fails() {
        let dir = tempfile::tempdir().unwrap();

        let error = Report::default()
            .write_path(&dir.path().join("missing").join("report.csv"))
            .unwrap_err();

        assert_eq!(error.error_code(), "create_failed");
    }
}
