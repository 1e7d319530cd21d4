use std::path::Path;

use metrics::counter;

use super::{InternalEvent, error_stage};
use crate::flow_log::{ClassifySummary, FlowLogError};

#[derive(Debug)]
pub struct FlowLogClassified<'a> {
    pub path: &'a Path,
    pub summary: ClassifySummary,
}

impl InternalEvent for FlowLogClassified<'_> {
    fn emit(self) {
        info!(
            message = "Flow log classified.",
            path = %self.path.display(),
            records = %self.summary.records,
            tagged = %self.summary.tagged,
            untagged = %self.summary.untagged,
        );
        counter!("flow_records_classified_total").increment(self.summary.records as u64);
        counter!("flow_records_untagged_total").increment(self.summary.untagged as u64);
    }
}

#[derive(Debug)]
pub struct FlowLogReadError<'a> {
    pub path: &'a Path,
    pub error: &'a FlowLogError,
}

impl InternalEvent for FlowLogReadError<'_> {
    fn emit(self) {
        error!(
            message = "Failed to classify flow log.",
            path = %self.path.display(),
            error = %self.error,
            error_code = self.error.error_code(),
            error_type = self.error.error_type(),
            stage = error_stage::PROCESSING,
        );
        counter!(
            "component_errors_total",
            "error_code" => self.error.error_code(),
            "error_type" => self.error.error_type(),
            "stage" => error_stage::PROCESSING,
        )
        .increment(1);
    }
}
