use metrics::counter;

use super::{InternalEvent, error_stage, error_type};
use crate::config::ConfigError;

#[derive(Debug)]
pub struct ConfigLoadError<'a> {
    pub error: &'a ConfigError,
}

impl InternalEvent for ConfigLoadError<'_> {
    fn emit(self) {
        error!(
            message = "Failed to load configuration.",
            error = %self.error,
            error_code = self.error.error_code(),
            error_type = error_type::CONFIGURATION_FAILED,
            stage = error_stage::RECEIVING,
        );
        counter!(
            "component_errors_total",
            "error_code" => self.error.error_code(),
            "error_type" => error_type::CONFIGURATION_FAILED,
            "stage" => error_stage::RECEIVING,
        )
        .increment(1);
    }
}
