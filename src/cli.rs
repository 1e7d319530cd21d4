use std::{io::IsTerminal, path::PathBuf};

use clap::{ArgAction, Parser};

#[derive(Parser, Debug)]
#[command(name = "flowtag", version, about, rename_all = "kebab-case")]
pub struct Opts {
    /// Read configuration from a TOML file.
    /// Paths given on the command line take precedence over the file.
    #[arg(short, long, env = "FLOWTAG_CONFIG")]
    pub config: Option<PathBuf>,

    /// Lookup table with `dstport,protocol,tag` columns.
    #[arg(short, long, env = "FLOWTAG_LOOKUP_TABLE")]
    pub lookup_table: Option<PathBuf>,

    /// Version 2 flow log to classify.
    #[arg(short, long, env = "FLOWTAG_FLOW_LOG")]
    pub flow_log: Option<PathBuf>,

    /// Where to write the report.
    #[arg(short, long, env = "FLOWTAG_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Enable more detailed internal logging. Repeat to increase level. Overridden by `--quiet`.
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Reduce detail of internal logging. Repeat to reduce further. Overrides `--verbose`.
    #[arg(short, long, action = ArgAction::Count)]
    pub quiet: u8,

    /// Set the logging format
    #[arg(long, default_value = "text", env = "FLOWTAG_LOG_FORMAT")]
    pub log_format: LogFormat,

    /// Control when ANSI terminal formatting is used.
    ///
    /// By default `flowtag` will try and detect if `stderr` is a terminal, if it is
    /// ANSI will be enabled. Otherwise it will be disabled. By providing this flag with
    /// the `--color always` option will always enable ANSI terminal formatting. `--color never`
    /// will disable all ANSI terminal formatting. `--color auto` will attempt
    /// to detect it automatically.
    #[arg(long, default_value = "auto", env = "FLOWTAG_COLOR")]
    pub color: Color,
}

impl Opts {
    pub fn get_matches() -> Result<Self, clap::Error> {
        Self::try_parse()
    }

    pub const fn log_level(&self) -> &'static str {
        match self.quiet {
            0 => match self.verbose {
                0 => "info",
                1 => "debug",
                2..=255 => "trace",
            },
            1 => "warn",
            2 => "error",
            3..=255 => "off",
        }
    }
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Auto,
    Always,
    Never,
}

impl Color {
    pub fn use_color(&self) -> bool {
        match self {
            Color::Auto => std::io::stderr().is_terminal(),
            Color::Always => true,
            Color::Never => false,
        }
    }
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    fn parse(args: &[&str]) -> Opts {
        Opts::try_parse_from(std::iter::once("flowtag").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Opts::command().debug_assert();
    }

    #[test]
    fn paths() {
        let opts = parse(&["-l", "tags.csv", "--flow-log", "flows.csv", "-o", "out.csv"]);

        assert_eq!(opts.lookup_table.as_deref(), Some(Path::new("tags.csv")));
        assert_eq!(opts.flow_log.as_deref(), Some(Path::new("flows.csv")));
        assert_eq!(opts.output.as_deref(), Some(Path::new("out.csv")));
        assert_eq!(opts.config, None);
    }

    #[test]
    fn log_levels() {
        assert_eq!(parse(&[]).log_level(), "info");
        assert_eq!(parse(&["-v"]).log_level(), "debug");
        assert_eq!(parse(&["-vvv"]).log_level(), "trace");
        assert_eq!(parse(&["-q"]).log_level(), "warn");
        assert_eq!(parse(&["-qq", "-v"]).log_level(), "error");
        assert_eq!(parse(&["-qqq"]).log_level(), "off");
    }

    #[test]
    fn log_format_and_color() {
        let opts = parse(&["--log-format", "json", "--color", "never"]);

        assert_eq!(opts.log_format, LogFormat::Json);
        assert!(!opts.color.use_color());
    }
}
