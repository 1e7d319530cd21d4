//! Notable occurrences during a run.
//!
//! Each event is a plain struct. Emitting it writes a structured log line
//! through `tracing` and advances the matching `metrics` counters.

mod config;
mod flow_log;
mod lookup_table;
mod report;

pub use self::config::*;
pub use self::flow_log::*;
pub use self::lookup_table::*;
pub use self::report::*;

/// An event worth logging and counting.
pub trait InternalEvent: Sized {
    /// Logs the event and records its metrics.
    fn emit(self);
}

/// Emits `event`.
pub fn emit(event: impl InternalEvent) {
    event.emit();
}

/// Emits an [`InternalEvent`].
#[macro_export]
macro_rules! emit {
    ($event:expr) => {
        $crate::internal_events::emit($event)
    };
}

/// Values for the `error_type` tag of `component_errors_total`.
pub mod error_type {
    /// The input could not be read.
    pub const READER_FAILED: &str = "reader_failed";
    /// The input was read but could not be parsed.
    pub const PARSER_FAILED: &str = "parser_failed";
    /// The output could not be written.
    pub const WRITER_FAILED: &str = "writer_failed";
    /// The configuration was rejected.
    pub const CONFIGURATION_FAILED: &str = "configuration_failed";
}

/// Values for the `stage` tag of `component_errors_total`.
pub mod error_stage {
    /// Loading configuration and inputs.
    pub const RECEIVING: &str = "receiving";
    /// Building the index or classifying records.
    pub const PROCESSING: &str = "processing";
    /// Writing the report.
    pub const SENDING: &str = "sending";
}
