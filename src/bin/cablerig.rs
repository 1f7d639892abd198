use std::path::PathBuf;

use clap::Parser;

/// Build cable assemblies for every curve-bearing entity in the scene's
/// current selection.
#[derive(Parser, Debug)]
#[command(name = "cablerig", version)]
struct Cli {
    /// Input scene JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Where to write the mutated scene; omit for a dry run.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Give each cable its own private cross-section profile instead of the
    /// shared one.
    #[arg(long)]
    independent: bool,

    /// Print the batch report as JSON on stdout.
    #[arg(long)]
    report_json: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut host = cablerig::MemoryHost::load(&cli.in_path)?;
    let mode = if cli.independent {
        cablerig::ProfileMode::Independent
    } else {
        cablerig::ProfileMode::Shared
    };

    let mut session = cablerig::RigSession::new();
    let report = session.process_selection(&mut host, mode)?;

    for entry in &report.entries {
        match &entry.outcome {
            cablerig::BuildOutcome::Built { container } => {
                eprintln!("built '{container}' from '{}'", entry.entity);
            }
            cablerig::BuildOutcome::Skipped { reason } => {
                eprintln!("skipped '{}': {reason}", entry.entity);
            }
            cablerig::BuildOutcome::Failed { error } => {
                eprintln!("failed '{}': {error}", entry.entity);
            }
        }
    }
    eprintln!(
        "{} of {} built",
        report.built_count(),
        report.entries.len()
    );

    if cli.report_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    if let Some(out) = &cli.out {
        if let Some(parent) = out.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        host.save(out)?;
        eprintln!("wrote {}", out.display());
    }

    Ok(())
}
