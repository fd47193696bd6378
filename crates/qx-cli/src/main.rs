//! qx - deployment automation for web projects
//!
//! Usage:
//!   qx deploy [project-path]          # Build and push to the release repository
//!   qx bump <pkg> <version-range>     # Point a dependency at a new revision

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use console::style;

use qx_core::commands::{BumpCommand, BumpReport, DEMO_FOLDER_CHOICES, DeployCommand, DeployReport};
use qx_core::error::{ErrorKind, classify, exit_code};
use qx_core::lifecycle::{CommandArgs, Lifecycle};
use qx_core::logging::{self, LogLevel};

#[derive(Parser)]
#[command(name = "qx")]
#[command(about = "Build a web project and publish it to its release repository", long_about = None)]
#[command(version, disable_version_flag = true)]
struct Cli {
    /// Print version
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    version: Option<bool>,

    /// Verbose logging (same as --loglevel verbose)
    #[arg(short = 'V', long, global = true)]
    verbose: bool,

    /// Log level: silly, verbose, info, success, notice, warn, error, silent
    #[arg(long, global = true, value_parser = parse_level)]
    loglevel: Option<LogLevel>,

    /// Disable step progress output
    #[arg(long = "no-progress", global = true)]
    no_progress: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the project and push the build output to the release repository
    Deploy {
        /// Project directory (defaults to the current directory)
        project_path: Option<PathBuf>,
        /// Demo folder selection
        #[arg(long, value_parser = DEMO_FOLDER_CHOICES)]
        demo_folder_option: Option<String>,
        /// Log release commands instead of running them
        #[arg(long)]
        dry_run: bool,
    },

    /// Bump a package version
    Bump {
        /// The package name
        pkg: String,
        /// The package version range
        version_range: String,
        /// Show the new range without writing package.json
        #[arg(long)]
        dry: bool,
    },
}

fn parse_level(value: &str) -> Result<LogLevel, String> {
    value.parse()
}

impl Cli {
    /// Options shared by every subcommand, as the argv layer.
    fn base_args(&self) -> Result<CommandArgs> {
        let cwd = std::env::current_dir().context("Failed to read the current directory")?;
        let loglevel = self
            .loglevel
            .or(self.verbose.then_some(LogLevel::Verbose))
            .map(|level| level.as_str());
        Ok(CommandArgs::new(cwd)
            .with_arg("loglevel", loglevel)
            .with_arg("progress", self.no_progress.then_some(false))
            .with_arg("qxjsCliVersion", Some(env!("CARGO_PKG_VERSION"))))
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = logging::init() {
        eprintln!("{} WARN failed to initialize logging: {}", logging::HEADING, err);
    }

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_error(&err);
            ExitCode::from(u8::try_from(exit_code(&err)).unwrap_or(1))
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let args = cli.base_args()?;
    match cli.command {
        Commands::Deploy {
            project_path,
            demo_folder_option,
            dry_run,
        } => {
            let args = args
                .with_arg(
                    "projectPath",
                    project_path.as_ref().map(|path| path.display().to_string()),
                )
                .with_project_path(project_path)
                .with_arg("demoFolderOption", demo_folder_option)
                .with_arg("dryRun", dry_run.then_some(true));
            let report = Lifecycle::new(args)
                .run(&mut DeployCommand::default())
                .await?;
            print_deploy_result(&report);
        }
        Commands::Bump {
            pkg,
            version_range,
            dry,
        } => {
            let args = args
                .with_arg("pkg", Some(pkg))
                .with_arg("versionRange", Some(version_range))
                .with_arg("dry", dry.then_some(true));
            let report = Lifecycle::new(args).run(&mut BumpCommand::new()).await?;
            print_bump_result(&report);
        }
    }
    Ok(())
}

fn print_deploy_result(report: &DeployReport) {
    println!(
        "{} Released {} (built from {})",
        style("✓").green(),
        report.commit,
        report.source_commit
    );
    println!(
        "  Copied {} files, {} directories",
        report.copied.files, report.copied.dirs
    );
    if report.pruned {
        println!("  Removed devDependencies from the release manifest");
    }
}

fn print_bump_result(report: &BumpReport) {
    if report.written {
        println!(
            "{} {}: {} -> {}",
            style("✓").green(),
            report.package,
            report.previous_range,
            report.range
        );
    } else {
        println!(
            "• {}: {} -> {} (dry run, package.json unchanged)",
            report.package, report.previous_range, report.range
        );
    }
}

/// Validation errors were logged when raised; everything else is logged here
/// with its cause chain at verbose level.
fn report_error(err: &anyhow::Error) {
    if classify(err) == ErrorKind::Validation {
        return;
    }
    logging::resume();
    tracing::error!(prefix = "qx", "{}", err);
    for cause in err.chain().skip(1) {
        tracing::debug!(prefix = "qx", "caused by: {}", cause);
    }
}
