//! Casekit build-time CLI.
//!
//! `generate` renders tool artifacts from declarative specs; `validate` runs
//! the alignment validator as the pre-commit/CI gate. The process exit code
//! mirrors the validator's pass state, so `casekit-ctl validate` is the whole
//! gate.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use casekit_orchestration::bootstrap::canonical_operations;
use casekit_sdk::{load_spec_dir, scan_all, Generator};
use casekit_shared::OperationRegistry;

#[derive(Parser)]
#[command(
    name = "casekit-ctl",
    about = "Generate and validate Casekit tool wrappers",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate tool artifacts from a directory of declarative specs.
    Generate {
        /// Directory containing `*.yaml` tool specs.
        #[arg(long)]
        specs: PathBuf,
        /// Output directory for rendered artifacts; artifacts are printed to
        /// stdout when omitted.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Run the alignment validator over a directory of specs (the CI gate).
    Validate {
        /// Directory containing `*.yaml` tool specs.
        #[arg(long)]
        specs: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut operations = OperationRegistry::new();
    for operation in canonical_operations() {
        operations.register(operation).context("bootstrap failed")?;
    }

    match cli.command {
        Commands::Generate { specs, out } => generate(&operations, &specs, out.as_deref()),
        Commands::Validate { specs } => validate(&operations, &specs),
    }
}

fn generate(
    operations: &OperationRegistry,
    specs_dir: &std::path::Path,
    out: Option<&std::path::Path>,
) -> anyhow::Result<()> {
    let specs = load_spec_dir(specs_dir)
        .with_context(|| format!("failed to load specs from '{}'", specs_dir.display()))?;
    let generator = Generator::new()?;
    let outcome = generator.generate_all(operations, &specs)?;

    for finding in &outcome.findings {
        eprintln!(
            "{}: {} ({})",
            finding.code, finding.message, finding.tool
        );
    }

    match out {
        Some(out_dir) => {
            for tool in &outcome.tools {
                generator.write_artifacts(out_dir, tool)?;
                eprintln!(
                    "generated {} -> {}",
                    tool.definition.name,
                    out_dir.join(&tool.artifacts.implementation.path).display()
                );
            }
        }
        None => {
            for tool in &outcome.tools {
                print!("{}", tool.artifacts.implementation.content);
                print!("{}", tool.artifacts.test.content);
            }
        }
    }

    if !outcome.is_clean() {
        bail!(
            "generation reported {} finding(s); artifacts for affected specs were not produced",
            outcome.findings.len()
        );
    }
    Ok(())
}

fn validate(operations: &OperationRegistry, specs_dir: &std::path::Path) -> anyhow::Result<()> {
    let specs = load_spec_dir(specs_dir)
        .with_context(|| format!("failed to load specs from '{}'", specs_dir.display()))?;
    let generator = Generator::new()?;
    let outcome = generator.generate_all(operations, &specs)?;
    let report = scan_all(operations, &outcome.tools);

    // The report is the gate's machine-readable output; everything else goes
    // to stderr.
    println!("{}", serde_json::to_string_pretty(&report)?);

    for finding in &outcome.findings {
        eprintln!("{}: {} ({})", finding.code, finding.message, finding.tool);
    }

    if !outcome.is_clean() {
        bail!(
            "{} spec(s) failed to generate; see findings above",
            outcome.findings.len()
        );
    }
    if !report.passed() {
        bail!(
            "alignment validation failed with {} error finding(s)",
            report.error_count()
        );
    }

    eprintln!(
        "alignment ok: {} tool(s), {} warning(s)",
        report.checked_tools,
        report.warning_count()
    );
    Ok(())
}
