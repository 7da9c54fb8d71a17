use std::io;

use anyhow::{Context, Result};
use clap::{Parser, error::ErrorKind};
use tracing::{error, info, warn};

use ttb_merge::{
    Args, Config, GitContext, MergeOrchestrator,
    core::{ExitCode, report::OutputWriter},
    discover_files,
    logging::{init_logging, parse_early_log_config},
};

fn main() -> std::process::ExitCode {
    // Logging comes up before argument parsing so config resolution is traced
    let raw_args: Vec<String> = std::env::args().collect();
    let _log_guard = init_logging(parse_early_log_config(&raw_args));

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
            _ => {
                // clap's own exit status would collide with the conflict code
                let _ = e.print();
                return ExitCode::GeneralError.into();
            }
        },
    };

    match run(args) {
        Ok(code) => {
            info!(code = code.code(), "Run finished");
            code.into()
        }
        Err(e) => {
            error!(error = %e, "Run failed");
            eprintln!("Error: {:#}", e);
            ExitCode::GeneralError.into()
        }
    }
}

fn run(args: Args) -> Result<ExitCode> {
    if args.create_config {
        let path = Config::create_sample_config()?;
        println!("Sample config available at: {}", path.display());
        return Ok(ExitCode::Success);
    }

    let origin_branch = args
        .origin_branch
        .clone()
        .context("ORIGIN_BRANCH is required")?;

    let config = args.resolve_config()?;
    config.log_sources();
    let pattern = config.pattern();
    let options = config.into_options(&origin_branch)?;

    let ctx = GitContext::open(&args.repo)
        .with_context(|| format!("Failed to open repository at {}", args.repo.display()))?;
    let files = discover_files(ctx.root(), &pattern)?;
    if files.is_empty() {
        warn!(pattern = %pattern, root = %ctx.root().display(), "No timetable files found");
        eprintln!(
            "Warning: no timetable files found for '{}' under {}",
            pattern,
            ctx.root().display()
        );
    } else {
        info!(count = files.len(), pattern = %pattern, "Discovered timetable files");
    }

    let mut output = OutputWriter::new(io::stdout().lock(), args.output);
    let orchestrator = MergeOrchestrator::new(&ctx, options);
    let report = orchestrator.run_batch(&files, |event| {
        if let Err(e) = output.write_event(event) {
            warn!(error = %e, "Failed to write progress event");
        }
    })?;

    output
        .write_report(&report)
        .context("Failed to write report")?;
    Ok(report.exit_code())
}
