use std::path::Path;

use metrics::counter;

use super::{InternalEvent, error_stage, error_type};
use crate::report::ReportError;

#[derive(Debug)]
pub struct ReportWritten<'a> {
    pub path: &'a Path,
    pub tag_rows: usize,
    pub combination_rows: usize,
}

impl InternalEvent for ReportWritten<'_> {
    fn emit(self) {
        info!(
            message = "Report written.",
            path = %self.path.display(),
            tag_rows = %self.tag_rows,
            combination_rows = %self.combination_rows,
        );
        counter!("reports_written_total").increment(1);
    }
}

#[derive(Debug)]
pub struct ReportWriteError<'a> {
    pub path: &'a Path,
    pub error: &'a ReportError,
}

impl InternalEvent for ReportWriteError<'_> {
    fn emit(self) {
        error!(
            message = "Failed to write report.",
            path = %self.path.display(),
            error = %self.error,
            error_code = self.error.error_code(),
            error_type = error_type::WRITER_FAILED,
            stage = error_stage::SENDING,
        );
        counter!(
            "component_errors_total",
            "error_code" => self.error.error_code(),
            "error_type" => error_type::WRITER_FAILED,
            "stage" => error_stage::SENDING,
        )
        .increment(1);
    }
}
