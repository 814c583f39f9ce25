use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "jcompat")]
#[command(about = "Check binary and source compatibility between two versions of a Java library")]
#[command(version)]
pub struct Cli {
    /// Old version input: archive, directory, comma-separated list, XML
    /// descriptor, or API dump.
    #[arg(value_name = "OLD")]
    pub old_positional: Option<String>,

    /// New version input, same forms as OLD.
    #[arg(value_name = "NEW")]
    pub new_positional: Option<String>,

    /// Library name used in reports and output paths.
    #[arg(short = 'l', long = "lib", value_name = "NAME")]
    pub library: Option<String>,

    #[arg(long, value_name = "PATH", conflicts_with = "old_positional")]
    pub old: Option<String>,

    #[arg(long, value_name = "PATH", conflicts_with = "new_positional")]
    pub new: Option<String>,

    /// Version label for the old input when not derivable.
    #[arg(long = "v1", value_name = "VER")]
    pub version1: Option<String>,

    /// Version label for the new input when not derivable.
    #[arg(long = "v2", value_name = "VER")]
    pub version2: Option<String>,

    /// Restrict analysis to classes used by this client archive.
    #[arg(long, value_name = "PATH")]
    pub client: Option<PathBuf>,

    /// Restrict analysis to class names listed in this file.
    #[arg(long = "class-list", value_name = "FILE")]
    pub class_list: Option<PathBuf>,

    /// Emit the binary-level report (default: both).
    #[arg(long)]
    pub binary: bool,

    /// Emit the source-level report (default: both).
    #[arg(long)]
    pub source: bool,

    /// Serialize an API dump of OLD instead of comparing.
    #[arg(long)]
    pub dump: bool,

    #[arg(long = "dump-path", value_name = "FILE")]
    pub dump_path: Option<PathBuf>,

    /// Report path when a single report is emitted.
    #[arg(long = "report-path", value_name = "FILE")]
    pub report_path: Option<PathBuf>,

    #[arg(long = "bin-report-path", value_name = "FILE")]
    pub bin_report_path: Option<PathBuf>,

    #[arg(long = "src-report-path", value_name = "FILE")]
    pub src_report_path: Option<PathBuf>,

    #[arg(short = 'f', long, value_enum, default_value_t = ReportFormat::Json)]
    pub format: ReportFormat,

    /// Suppress the added-methods section and cap affected lists.
    #[arg(long)]
    pub short: bool,

    /// Treat Low-severity changes as problems rather than warnings.
    #[arg(long)]
    pub strict: bool,

    /// Disable the implicit internal-package filter.
    #[arg(long = "keep-internal")]
    pub keep_internal: bool,

    /// Skip parameter-name, constant-value, and usage analysis.
    #[arg(long)]
    pub quick: bool,

    /// Also diff method bodies (binary level only).
    #[arg(long = "check-implementation")]
    pub check_implementation: bool,

    /// File with package prefixes to skip, one per line.
    #[arg(long = "skip-packages", value_name = "FILE")]
    pub skip_packages: Option<PathBuf>,

    /// File with package prefixes to keep, one per line.
    #[arg(long = "packages", value_name = "FILE")]
    pub keep_packages: Option<PathBuf>,

    /// Path to the javap binary (also JCOMPAT_JAVAP).
    #[arg(long, value_name = "FILE")]
    pub javap: Option<PathBuf>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Json,
    Text,
}

impl Cli {
    pub fn old_input(&self) -> Option<&str> {
        self.old.as_deref().or(self.old_positional.as_deref())
    }

    pub fn new_input(&self) -> Option<&str> {
        self.new.as_deref().or(self.new_positional.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positional_and_flagged_inputs_are_equivalent() {
        let cli = Cli::parse_from(["jcompat", "old.jar", "new.jar"]);
        assert_eq!(cli.old_input(), Some("old.jar"));
        assert_eq!(cli.new_input(), Some("new.jar"));

        let cli = Cli::parse_from(["jcompat", "--old", "old.jar", "--new", "new.jar"]);
        assert_eq!(cli.old_input(), Some("old.jar"));
        assert_eq!(cli.new_input(), Some("new.jar"));
    }

    #[test]
    fn report_selection_flags_parse() {
        let cli = Cli::parse_from([
            "jcompat",
            "--lib",
            "widgets",
            "old.jar",
            "new.jar",
            "--binary",
            "--strict",
            "--short",
            "--quick",
            "-f",
            "text",
        ]);
        assert!(cli.binary);
        assert!(!cli.source);
        assert!(cli.strict && cli.short && cli.quick);
        assert_eq!(cli.format, ReportFormat::Text);
        assert_eq!(cli.library.as_deref(), Some("widgets"));
    }
}
