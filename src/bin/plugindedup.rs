use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc;
use std::thread;

use anyhow::{Context, Result};
use clap::Parser;
use plugindedup_core::locator::{sample_entries, DirectoryLocator, InstallRootLocator};
use plugindedup_core::{
    AssumeYes, CleanupConfig, CleanupExecutor, CleanupOutcome, CleanupPlan, Confirm, Decision,
    ScanOptions,
};
use tracing_subscriber::EnvFilter;

/// Exit status for bad invocations and I/O failures outside the pipeline.
const EXIT_USAGE: u8 = 5;

#[derive(Parser, Debug)]
#[command(name = "plugindedup")]
#[command(about = "Remove superseded plugin versions from an Eclipse plugin directory", long_about = None)]
struct Cli {
    /// Plugin directory to clean. Prompts for one when omitted.
    #[arg(env = "PLUGINDEDUP_DIR")]
    plugin_dir: Option<PathBuf>,

    /// Where to put the backup (default: <plugin_dir>/backup_<timestamp>)
    #[arg(long, env = "PLUGINDEDUP_BACKUP_DIR")]
    backup_dir: Option<PathBuf>,

    /// Show what would be deleted without changing anything
    #[arg(long)]
    preview: bool,

    /// Do not ask for confirmation
    #[arg(long, short = 'y')]
    yes: bool,

    /// Eclipse install root whose plugins/dropins directories are offered as candidates
    #[arg(long = "eclipse-home", value_name = "DIR")]
    eclipse_homes: Vec<PathBuf>,

    /// Print candidate plugin directories and exit
    #[arg(long)]
    list_candidates: bool,

    /// Additional entry-name prefix to leave alone (repeatable)
    #[arg(long = "ignore-prefix", value_name = "PREFIX")]
    ignore_prefixes: Vec<String>,

    /// Log debug output
    #[arg(long, short)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match real_main(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(EXIT_USAGE)
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "plugindedup=debug,plugindedup_core=debug"
    } else {
        "plugindedup=info,plugindedup_core=info"
    };
    let filter =
        EnvFilter::try_from_env("PLUGINDEDUP_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn real_main(cli: Cli) -> Result<u8> {
    let locator = InstallRootLocator::new(cli.eclipse_homes.iter().cloned());

    if cli.list_candidates {
        for candidate in locator.suggest_candidates() {
            println!("{}", describe_candidate(&candidate));
        }
        return Ok(0);
    }

    let mut console = Console::start()?;

    let plugin_dir = match cli.plugin_dir {
        Some(dir) => dir,
        None => match choose_directory(&mut console, &locator)? {
            Some(dir) => dir,
            None => {
                println!("Cancelled.");
                return Ok(1);
            }
        },
    };

    let mut scan = ScanOptions::default();
    scan.ignored_prefixes.extend(cli.ignore_prefixes);

    let mut config = CleanupConfig::new(&plugin_dir)
        .preview_only(cli.preview)
        .with_scan_options(scan);
    if let Some(backup_dir) = cli.backup_dir {
        config = config.with_backup_dir(backup_dir);
    }

    println!("Scanning plugin directory: {}", plugin_dir.display());
    let mut executor = CleanupExecutor::new(config);
    let outcome = if cli.yes {
        executor.run(&mut ShowPlan(AssumeYes))
    } else {
        executor.run(&mut ConsolePrompt(&mut console))
    };

    if let (CleanupOutcome::Previewed { .. }, Some(plan)) = (&outcome, executor.plan()) {
        print_plan(plan);
        println!("\nPreview only, nothing was deleted.");
    }
    report(&outcome);
    Ok(outcome.exit_code())
}

/// Prints the plan, then defers to the wrapped policy.
struct ShowPlan<C>(C);

impl<C: Confirm> Confirm for ShowPlan<C> {
    fn confirm(&mut self, plan: &CleanupPlan) -> Decision {
        print_plan(plan);
        self.0.confirm(plan)
    }
}

/// Asks on the console. Anything but `y`/`yes` aborts, and so do end of input
/// and Ctrl-C.
struct ConsolePrompt<'a>(&'a mut Console);

impl Confirm for ConsolePrompt<'_> {
    fn confirm(&mut self, plan: &CleanupPlan) -> Decision {
        print_plan(plan);
        let question = format!("\nDelete these {} plugins? (y/N): ", plan.delete().len());
        match self.0.prompt(&question) {
            Ok(Some(answer)) => Decision::from_answer(&answer),
            Ok(None) => {
                println!();
                Decision::Abort
            }
            Err(e) => {
                tracing::warn!("failed to read answer: {e}");
                Decision::Abort
            }
        }
    }
}

/// What the console delivers to a waiting prompt.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Line(String),
    Eof,
    Interrupted,
}

/// Operator input. Stdin is read on its own thread and Ctrl-C is delivered on
/// the same channel, so an interrupt ends a blocked prompt instead of the process.
/// An interrupt that arrives before a prompt cancels that prompt; a backup or
/// delete in progress is not cut short.
struct Console {
    rx: mpsc::Receiver<Input>,
    closed: bool,
}

impl Console {
    fn start() -> Result<Self> {
        let (tx, rx) = mpsc::channel();

        let tx_interrupt = tx.clone();
        ctrlc::set_handler(move || {
            let _ = tx_interrupt.send(Input::Interrupted);
        })
        .context("Failed to install Ctrl-C handler")?;

        thread::spawn(move || {
            let stdin = io::stdin();
            loop {
                let mut line = String::new();
                let input = match stdin.lock().read_line(&mut line) {
                    Ok(0) | Err(_) => Input::Eof,
                    Ok(_) => Input::Line(line.trim().to_string()),
                };
                let last = input == Input::Eof;
                if tx.send(input).is_err() || last {
                    break;
                }
            }
        });

        Ok(Console::from_receiver(rx))
    }

    fn from_receiver(rx: mpsc::Receiver<Input>) -> Self {
        Console { rx, closed: false }
    }

    /// Ask and wait for one line; `None` on end of input or interrupt.
    fn prompt(&mut self, question: &str) -> io::Result<Option<String>> {
        print!("{question}");
        io::stdout().flush()?;
        Ok(self.next_line())
    }

    fn next_line(&mut self) -> Option<String> {
        if self.closed {
            return None;
        }
        match self.rx.recv() {
            Ok(Input::Line(line)) => Some(line),
            Ok(Input::Interrupted) => None,
            Ok(Input::Eof) | Err(_) => {
                self.closed = true;
                None
            }
        }
    }
}

fn print_plan(plan: &CleanupPlan) {
    println!(
        "\nFound {} plugins: keeping {}, deleting {}",
        plan.plugin_count(),
        plan.keep().len(),
        plan.delete().len()
    );

    for group in plan.duplicate_groups() {
        println!("\nPlugin: {}", group.base_name);
        println!(
            "  keep:   {} (v{})",
            group.keep.original_name,
            group.keep.display_version()
        );
        for entry in group.delete {
            println!("  delete: {} (v{})", entry.original_name, entry.display_version());
        }
    }
}

fn report(outcome: &CleanupOutcome) {
    match outcome {
        CleanupOutcome::NothingToDo => println!("No duplicate plugins found."),
        CleanupOutcome::Previewed { planned } => println!("{planned} plugins would be deleted."),
        CleanupOutcome::Completed {
            backup_dir, report, ..
        } => {
            println!(
                "\nDeleted {}/{} plugins.",
                report.success_count(),
                report.total()
            );
            for failure in report.failures() {
                println!("  {failure}");
            }
            println!("Backup: {}", backup_dir.display());
        }
        CleanupOutcome::Aborted => println!("Cancelled, nothing was changed."),
        CleanupOutcome::BackupFailed(err) => {
            println!("Backup failed, nothing was deleted: {err}");
        }
        CleanupOutcome::DirectoryNotFound(dir) => {
            println!("Plugin directory not found: {}", dir.display());
        }
        CleanupOutcome::NotAnalyzed | CleanupOutcome::Finished(_) => {}
    }
}

/// Offer the current directory, the locator's candidates and manual entry.
/// `None` means the operator gave up.
fn choose_directory(
    console: &mut Console,
    locator: &dyn DirectoryLocator,
) -> Result<Option<PathBuf>> {
    let current = std::env::current_dir().context("Failed to read current directory")?;
    let candidates: Vec<PathBuf> = locator
        .suggest_candidates()
        .into_iter()
        .filter(|candidate| candidate != &current)
        .collect();
    let manual = candidates.len() + 1;

    println!("Plugin directory candidates:");
    println!("  0. current directory ({})", current.display());
    for (i, candidate) in candidates.iter().enumerate() {
        println!("  {}. {}", i + 1, describe_candidate(candidate));
    }
    println!("  {manual}. enter a path");

    loop {
        let Some(choice) = console.prompt(&format!("\nSelect plugin directory (0-{manual}): "))? else {
            return Ok(None);
        };
        let Ok(index) = choice.parse::<usize>() else {
            println!("Please enter a number.");
            continue;
        };

        if index == 0 {
            return Ok(Some(current));
        }
        if index == manual {
            let Some(raw) = console.prompt("Plugin directory path: ")? else {
                return Ok(None);
            };
            let path = PathBuf::from(raw.trim_matches(|c| c == '"' || c == '\''));
            if path.is_dir() {
                return Ok(Some(path));
            }
            println!("Not a directory: {}", path.display());
            continue;
        }
        match candidates.get(index - 1) {
            Some(candidate) => return Ok(Some(candidate.clone())),
            None => println!("Please enter a number between 0 and {manual}."),
        }
    }
}

fn describe_candidate(dir: &std::path::Path) -> String {
    let sample = sample_entries(dir, 3);
    if sample.is_empty() {
        dir.display().to_string()
    } else {
        format!("{} (contains: {})", dir.display(), sample.join(", "))
    }
}
