//! Ties a run together: build the index, classify the flow log, write the
//! report.
//!
//! The batch is all or nothing. If any input row is malformed the run stops
//! before the report is written.

use std::path::PathBuf;

use snafu::{ResultExt, Snafu};

use crate::{
    cli::{LogFormat, Opts},
    config::{Config, ConfigError},
    flow_log::{self, FlowLogError},
    internal_events::{
        ConfigLoadError, FlowLogClassified, FlowLogReadError, LookupTableLoadError,
        LookupTableLoaded, ReportWriteError, ReportWritten,
    },
    lookup_table::{self, LookupTableError},
    report::{Report, ReportError},
    trace,
};

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("{}", source), context(false))]
    Config { source: ConfigError },

    #[snafu(display("Lookup table {}: {}", path.display(), source))]
    LookupTable {
        path: PathBuf,
        source: LookupTableError,
    },

    #[snafu(display("Flow log {}: {}", path.display(), source))]
    FlowLog { path: PathBuf, source: FlowLogError },

    #[snafu(display("Report {}: {}", path.display(), source))]
    Report { path: PathBuf, source: ReportError },
}

impl Error {
    pub const fn exit_code(&self) -> exitcode::ExitCode {
        match self {
            Self::Config { .. } => exitcode::CONFIG,
            Self::LookupTable { source, .. } if source.is_unreadable() => exitcode::NOINPUT,
            Self::FlowLog { source, .. } if source.is_unreadable() => exitcode::NOINPUT,
            Self::LookupTable { .. } | Self::FlowLog { .. } => exitcode::DATAERR,
            Self::Report { .. } => exitcode::CANTCREAT,
        }
    }
}

pub struct Application {
    pub config: Config,
}

impl Application {
    pub fn prepare() -> Result<Self, exitcode::ExitCode> {
        let opts = Opts::get_matches().map_err(|error| {
            // Printing only fails if stdout/stderr are closed.
            let _ = error.print();
            error.exit_code()
        })?;
        Self::prepare_from_opts(&opts)
    }

    pub fn prepare_from_opts(opts: &Opts) -> Result<Self, exitcode::ExitCode> {
        let level = std::env::var(trace::LOG_ENV).unwrap_or_else(|_| match opts.log_level() {
            "off" => "off".to_owned(),
            level => format!("flowtag={level}"),
        });
        trace::init(
            opts.color.use_color(),
            opts.log_format == LogFormat::Json,
            &level,
        );
        debug!(message = "Log level is enabled.", level = ?level);

        let config = load_config(opts).map_err(|error| {
            emit!(ConfigLoadError { error: &error });
            Error::from(error).exit_code()
        })?;

        Ok(Self { config })
    }

    /// Runs the batch, returning the report that was written.
    pub fn run(&self) -> Result<Report, Error> {
        run(&self.config)
    }

    /// Runs the batch and maps the outcome to a process exit code.
    pub fn run_to_exit_code(&self) -> exitcode::ExitCode {
        match self.run() {
            Ok(_) => exitcode::OK,
            Err(error) => error.exit_code(),
        }
    }
}

fn load_config(opts: &Opts) -> Result<Config, ConfigError> {
    let config = match &opts.config {
        Some(path) => {
            info!(message = "Loading config.", path = %path.display());
            Config::load(path)?
        }
        None => Config::default(),
    };

    Ok(config.with_overrides(
        opts.lookup_table.as_deref(),
        opts.flow_log.as_deref(),
        opts.output.as_deref(),
    ))
}

/// Builds the index from the lookup table, classifies the whole flow log
/// against it and writes the report.
pub fn run(config: &Config) -> Result<Report, Error> {
    let (mut index, summary) = lookup_table::load_path(&config.lookup_table)
        .inspect_err(|error| {
            emit!(LookupTableLoadError {
                path: &config.lookup_table,
                error,
            })
        })
        .context(LookupTableSnafu {
            path: &config.lookup_table,
        })?;
    emit!(LookupTableLoaded {
        path: &config.lookup_table,
        summary,
    });

    let summary = flow_log::classify_path(&config.flow_log, &mut index)
        .inspect_err(|error| {
            emit!(FlowLogReadError {
                path: &config.flow_log,
                error,
            })
        })
        .context(FlowLogSnafu {
            path: &config.flow_log,
        })?;
    emit!(FlowLogClassified {
        path: &config.flow_log,
        summary,
    });

    let report = Report::from_index(&index);
    report
        .write_path(&config.output)
        .inspect_err(|error| {
            emit!(ReportWriteError {
                path: &config.output,
                error,
            })
        })
        .context(ReportSnafu {
            path: &config.output,
        })?;
    emit!(ReportWritten {
        path: &config.output,
        tag_rows: report.tags.len(),
        combination_rows: report.combination_rows(),
    });

    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::{fs, path::Path};

    use similar_asserts::assert_eq;

    use super::*;

    const FLOW_HEADER: &str = "version,account-id,interface-id,srcaddr,dstaddr,srcport,dstport,protocol,packets,bytes,start_time,end_time,action,log-status";

    fn flow(dstport: u16, protocol: u8) -> String {
        format!(
            "2,123456789012,eni-4d3c2b1a,192.168.1.100,203.0.113.101,23,{dstport},{protocol},20,3000,1620140661,1620140721,REJECT,OK"
        )
    }

    fn config(dir: &Path, lookup: &str, flows: &[String]) -> Config {
        let config = Config {
            lookup_table: dir.join("lookup.csv"),
            flow_log: dir.join("flows.csv"),
            output: dir.join("report.csv"),
        };
        fs::write(&config.lookup_table, lookup).unwrap();
        let mut log = vec![FLOW_HEADER.to_string()];
        log.extend_from_slice(flows);
        fs::write(&config.flow_log, log.join("\n")).unwrap();
        config
    }

    #[test]
    fn writes_report() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(
            dir.path(),
            "dstport,protocol,tag\n443,tcp,sv_P1\n",
            &[flow(443, 6), flow(443, 6), flow(443, 6), flow(80, 6)],
        );

        let report = run(&config).unwrap();

        assert_eq!(report.records(), 4);
        assert_eq!(
            fs::read_to_string(&config.output).unwrap(),
            "Tag,Count\n\
             sv_p1,3\n\
             Untagged,1\n\
             Port,Protocol,Count\n\
             443,tcp,3\n\
             80,tcp,1\n"
        );
    }

    #[test]
    fn unregistered_protocol_is_reported_untagged() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(
            dir.path(),
            "dstport,protocol,tag\n443,tcp,sv_P1\n",
            &[flow(443, 200)],
        );

        run(&config).unwrap();

        assert_eq!(
            fs::read_to_string(&config.output).unwrap(),
            "Tag,Count\n\
             Untagged,1\n\
             Port,Protocol,Count\n\
             443,unassigned,1\n"
        );
    }

    #[test]
    fn malformed_flow_log_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(
            dir.path(),
            "dstport,protocol,tag\n443,tcp,sv_P1\n",
            &[flow(443, 6), "2,123456789012,eni-4d3c2b1a".to_string()],
        );

        let error = run(&config).unwrap_err();

        assert!(matches!(error, Error::FlowLog { .. }));
        assert_eq!(error.exit_code(), exitcode::DATAERR);
        assert!(!config.output.exists());
    }

    #[test]
    fn malformed_lookup_table_is_data_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), "dstport,protocol,tag\nx,tcp,sv_P1\n", &[]);

        let error = run(&config).unwrap_err();

        assert!(matches!(error, Error::LookupTable { .. }));
        assert_eq!(error.exit_code(), exitcode::DATAERR);
        assert!(!config.output.exists());
    }

    #[test]
    fn missing_input_is_no_input() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            lookup_table: dir.path().join("missing.csv"),
            ..Config::default()
        };

        let error = run(&config).unwrap_err();

        assert_eq!(error.exit_code(), exitcode::NOINPUT);
    }

    #[test]
    fn unwritable_output_is_cant_create() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path(), "dstport,protocol,tag\n", &[]);
        config.output = dir.path().join("missing").join("report.csv");

        let error = run(&config).unwrap_err();

        assert_eq!(error.exit_code(), exitcode::CANTCREAT);
    }
}
