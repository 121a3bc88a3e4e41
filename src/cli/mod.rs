//! # CLI Module
//!
//! Command-line interface for the media merge engine.
//!
//! ## Usage
//! ```bash
//! # Merge one source tree into an archive
//! media-merge merge --source ~/incoming --target /archive/photos
//!
//! # Several sources into one archive, fast (byte-hash only) mode
//! media-merge merge -s /mnt/a /mnt/b -t /archive --fast
//!
//! # JSON report for scripting
//! media-merge merge -s ~/incoming -t /archive --output json
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use media_merge::core::report::RunReport;
use media_merge::core::runner::{Task, TaskRunner};
use media_merge::core::MatchMode;
use media_merge::error::{MergeError, Result};
use media_merge::events::{Event, EventChannel, MergeEvent, TaskEvent};
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;

/// Media Merge - deduplicating archive merger
#[derive(Parser, Debug)]
#[command(name = "media-merge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Merge source trees into target trees, removing duplicates
    Merge {
        /// Source directories (one or more)
        #[arg(short, long, required = true, num_args = 1..)]
        source: Vec<PathBuf>,

        /// Target directories: exactly one, or one per source
        #[arg(short, long, required = true, num_args = 1..)]
        target: Vec<PathBuf>,

        /// Fast mode: match by file hash only, skip image decoding
        #[arg(long)]
        fast: bool,

        /// Directory for the duplicate index databases
        #[arg(long)]
        index_dir: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,

        /// Print every copy/replace/skip decision
        #[arg(short, long)]
        verbose: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
}

/// Run the CLI
pub fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Merge {
            source,
            target,
            fast,
            index_dir,
            output,
            verbose,
        } => run_merge(source, target, fast, index_dir, output, verbose),
    }
}

/// Pair every source with its target.
///
/// One target serves all sources; otherwise the counts must match.
fn pair_tasks(
    sources: Vec<PathBuf>,
    targets: Vec<PathBuf>,
    mode: MatchMode,
) -> Result<Vec<Task>> {
    if targets.len() != 1 && targets.len() != sources.len() {
        return Err(MergeError::Config(format!(
            "expected 1 target or {} targets (one per source), got {}",
            sources.len(),
            targets.len()
        )));
    }

    Ok(sources
        .into_iter()
        .enumerate()
        .map(|(i, source_root)| {
            let target_root = if targets.len() == 1 {
                targets[0].clone()
            } else {
                targets[i].clone()
            };
            Task {
                source_root,
                target_root,
                mode,
            }
        })
        .collect())
}

fn run_merge(
    sources: Vec<PathBuf>,
    targets: Vec<PathBuf>,
    fast: bool,
    index_dir: Option<PathBuf>,
    output: OutputFormat,
    verbose: bool,
) -> Result<ExitCode> {
    let term = Term::stderr();

    let mode = if fast {
        MatchMode::Fast
    } else {
        MatchMode::Precise
    };
    let tasks = pair_tasks(sources, targets, mode)?;

    let index_dir = index_dir.unwrap_or_else(|| {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("media-merge")
    });

    if matches!(output, OutputFormat::Pretty) {
        term.write_line(&format!(
            "{} {} ({} mode, {} task{})",
            style("Media Merge").bold().cyan(),
            style(env!("CARGO_PKG_VERSION")).dim(),
            mode,
            tasks.len(),
            if tasks.len() == 1 { "" } else { "s" }
        ))
        .ok();
        term.write_line("").ok();
    }

    let (sender, receiver) = EventChannel::new();

    let progress = if matches!(output, OutputFormat::Pretty) {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {pos} files {msg}")
                .unwrap(),
        );
        Some(pb)
    } else {
        None
    };

    let progress_clone = progress.clone();
    let event_thread = thread::spawn(move || {
        for event in receiver.iter() {
            match event {
                Event::Task(TaskEvent::Started {
                    source_root,
                    target_root,
                }) => {
                    if let Some(ref pb) = progress_clone {
                        pb.set_position(0);
                        pb.set_message(format!(
                            "{} -> {}",
                            source_root.display(),
                            target_root.display()
                        ));
                    }
                }
                Event::Task(TaskEvent::Progress(p)) => {
                    if let Some(ref pb) = progress_clone {
                        pb.set_position(p.processed as u64);
                    }
                }
                Event::Merge(merge_event) if verbose => {
                    let line = match &merge_event {
                        MergeEvent::Copied { source, dest } => {
                            format!("copied {} -> {}", source.display(), dest.display())
                        }
                        MergeEvent::Replaced {
                            path,
                            old_size,
                            new_size,
                        } => {
                            format!("replaced {} ({} -> {} bytes)", path.display(), old_size, new_size)
                        }
                        MergeEvent::Skipped { path, duplicate_of } => {
                            format!(
                                "skipped {} (duplicate of {})",
                                path.display(),
                                duplicate_of.display()
                            )
                        }
                        MergeEvent::DuplicateRemoved { path } => {
                            format!("removed duplicate {}", path.display())
                        }
                        MergeEvent::Error { path, reason } => {
                            format!("error {}: {}", path.display(), reason)
                        }
                    };
                    if let Some(ref pb) = progress_clone {
                        pb.println(line);
                    } else {
                        eprintln!("{}", line);
                    }
                }
                _ => {}
            }
        }
    });

    let mut runner = TaskRunner::new(index_dir);
    let report = runner.run_with_events(&tasks, &sender);

    drop(sender);
    event_thread.join().ok();
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    match output {
        OutputFormat::Pretty => print_pretty_report(&term, &report),
        OutputFormat::Json => print_json_report(&report),
    }

    if report.has_fatal_errors() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn print_pretty_report(term: &Term, report: &RunReport) {
    term.write_line("").ok();
    term.write_line(&format!("{} Merge Complete", style("✓").green().bold()))
        .ok();
    term.write_line("").ok();

    for task in &report.tasks {
        let header = format!(
            "  {} -> {}",
            task.source_root.display(),
            task.target_root.display()
        );
        match &task.fatal_error {
            Some(message) => {
                term.write_line(&format!(
                    "{} {}",
                    style(header).dim(),
                    style(format!("FAILED: {}", message)).red()
                ))
                .ok();
            }
            None => {
                term.write_line(&header).ok();
            }
        }
        term.write_line(&format!(
            "    {} in {:.1}s",
            task.counters,
            task.duration_ms as f64 / 1000.0
        ))
        .ok();
    }

    term.write_line("").ok();
    term.write_line(&format!(
        "  {} {}",
        style("Totals:").bold(),
        style(report.totals).cyan()
    ))
    .ok();

    if report.totals.errors > 0 {
        term.write_line(&format!(
            "  {}",
            style(format!(
                "{} file(s) had recoverable errors - see the log for details",
                report.totals.errors
            ))
            .yellow()
        ))
        .ok();
    }
}

fn print_json_report(report: &RunReport) {
    println!(
        "{}",
        serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string())
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_target_serves_all_sources() {
        let tasks = pair_tasks(
            vec![PathBuf::from("/a"), PathBuf::from("/b")],
            vec![PathBuf::from("/archive")],
            MatchMode::Fast,
        )
        .unwrap();

        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].target_root, PathBuf::from("/archive"));
        assert_eq!(tasks[1].target_root, PathBuf::from("/archive"));
    }

    #[test]
    fn matching_counts_pair_in_order() {
        let tasks = pair_tasks(
            vec![PathBuf::from("/a"), PathBuf::from("/b")],
            vec![PathBuf::from("/x"), PathBuf::from("/y")],
            MatchMode::Precise,
        )
        .unwrap();

        assert_eq!(tasks[0].target_root, PathBuf::from("/x"));
        assert_eq!(tasks[1].target_root, PathBuf::from("/y"));
    }

    #[test]
    fn mismatched_counts_are_rejected() {
        let result = pair_tasks(
            vec![
                PathBuf::from("/a"),
                PathBuf::from("/b"),
                PathBuf::from("/c"),
            ],
            vec![PathBuf::from("/x"), PathBuf::from("/y")],
            MatchMode::Fast,
        );

        assert!(matches!(result, Err(MergeError::Config(_))));
    }
}
