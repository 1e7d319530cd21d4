use std::path::Path;

use metrics::counter;

use super::{InternalEvent, error_stage};
use crate::lookup_table::{LoadSummary, LookupTableError};

#[derive(Debug)]
pub struct LookupTableLoaded<'a> {
    pub path: &'a Path,
    pub summary: LoadSummary,
}

impl InternalEvent for LookupTableLoaded<'_> {
    fn emit(self) {
        info!(
            message = "Lookup table loaded.",
            path = %self.path.display(),
            rows = %self.summary.rows,
            combinations = %self.summary.combinations,
            duplicates = %self.summary.duplicates,
        );
        counter!("lookup_rows_loaded_total").increment(self.summary.rows as u64);
        counter!("lookup_duplicate_rows_total").increment(self.summary.duplicates as u64);
    }
}

/// A row whose `(port, protocol)` pair was already tagged differently.
#[derive(Debug)]
pub struct LookupTableDuplicateIgnored<'a> {
    pub line: u64,
    pub port: u16,
    pub protocol: &'a str,
    pub kept: &'a str,
    pub ignored: &'a str,
}

impl InternalEvent for LookupTableDuplicateIgnored<'_> {
    fn emit(self) {
        debug!(
            message = "Ignoring duplicate lookup entry; first tag is kept.",
            line = %self.line,
            port = %self.port,
            protocol = %self.protocol,
            kept = %self.kept,
            ignored = %self.ignored,
        );
        counter!("lookup_conflicting_rows_total").increment(1);
    }
}

#[derive(Debug)]
pub struct LookupTableLoadError<'a> {
    pub path: &'a Path,
    pub error: &'a LookupTableError,
}

impl InternalEvent for LookupTableLoadError<'_> {
    fn emit(self) {
        error!(
            message = "Failed to load lookup table.",
            path = %self.path.display(),
            error = %self.error,
            error_code = self.error.error_code(),
            error_type = self.error.error_type(),
            stage = error_stage::RECEIVING,
        );
        counter!(
            "component_errors_total",
            "error_code" => self.error.error_code(),
            "error_type" => self.error.error_type(),
            "stage" => error_stage::RECEIVING,
        )
        .increment(1);
    }
}
