//! `linage` CLI: drives a `Repository` end to end. Every subcommand opens (or
//! initializes) the repository at `--repo` (default: the current directory),
//! runs one operation through `repository::block_on`, and prints a short
//! human-readable summary. Logging goes to stderr so it never pollutes
//! piped stdout.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use colored::Colorize;

use linage::diff::DiffStrategyKind;
use linage::repository::block_on;
use linage::unified_diff;
use linage::Repository;

#[derive(Parser, Debug)]
#[command(name = "linage", version, about = "Line-granular version control engine")]
struct Cli {
    /// Repository root. Defaults to the current directory.
    #[arg(long, global = true, default_value = ".")]
    repo: PathBuf,

    /// Log verbosity passed to `RUST_LOG` when unset (error, warn, info, debug, trace).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a new repository with an empty `main` branch.
    Init,
    /// Record a commit from the current working-tree state.
    Commit {
        #[arg(short, long)]
        message: String,
        #[arg(long, default_value = "Anonymous")]
        author_name: String,
        #[arg(long, default_value = "anonymous@example.com")]
        author_email: String,
    },
    /// Show per-path dirty status against HEAD.
    Status,
    /// Print commit history on the active branch.
    Log,
    /// Create a new branch pointing at the active branch's head.
    Branch { name: String },
    /// Switch the active branch and rescan the working tree.
    Switch { name: String },
    /// Merge `source` into the active branch.
    Merge {
        source: String,
        #[arg(long, value_enum)]
        strategy: Option<Strategy>,
    },
    /// Replay the active branch's commits onto `onto`.
    Rebase { onto: uuid::Uuid },
    /// List commits unreachable from any branch head.
    Dangling,
    /// Create a new branch at a dangling commit.
    Recover { commit_id: uuid::Uuid, branch_name: String },
    /// Print a unified diff between two commits.
    Diff { old: uuid::Uuid, new: uuid::Uuid },
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum Strategy {
    Myers,
    Patience,
    Minimal,
}

impl From<Strategy> for DiffStrategyKind {
    fn from(value: Strategy) -> Self {
        match value {
            Strategy::Myers => DiffStrategyKind::Myers,
            Strategy::Patience => DiffStrategyKind::Patience,
            Strategy::Minimal => DiffStrategyKind::Minimal,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stderr).init();

    match block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {err}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> linage::Result<()> {
    match cli.command {
        Commands::Init => {
            let repo = Repository::init(&cli.repo).await?;
            println!("{} {}", "initialized".green(), repo.root().display());
        }
        Commands::Commit { message, author_name, author_email } => {
            let mut repo = Repository::open(&cli.repo).await?;
            let commit = repo.commit(message, author_name, author_email).await?;
            println!("{} {}", "commit".green().bold(), commit.digest);
        }
        Commands::Status => {
            let mut repo = Repository::open(&cli.repo).await?;
            repo.rescan()?;
            for (path, status) in repo.status() {
                let label = format!("{status:?}").to_lowercase();
                println!("{:>10}  {path}", colorize_status(&label));
            }
        }
        Commands::Log => {
            let mut repo = Repository::open(&cli.repo).await?;
            for commit in repo.log()? {
                println!("{} {}", "commit".yellow(), commit.digest);
                println!("Author: {} <{}>", commit.author_name, commit.author_email);
                println!("Date:   {}\n", commit.timestamp);
                println!("    {}\n", commit.message);
            }
        }
        Commands::Branch { name } => {
            let mut repo = Repository::open(&cli.repo).await?;
            let branch = repo.create_branch(&name).await?;
            println!("{} {}", "branch created".green(), branch.name);
        }
        Commands::Switch { name } => {
            let mut repo = Repository::open(&cli.repo).await?;
            repo.switch_branch(&name).await?;
            println!("{} {}", "switched to".green(), name);
        }
        Commands::Merge { source, strategy } => {
            let repo = Repository::open(&cli.repo).await?;
            let conflicts = match strategy {
                Some(strategy) => repo.merge_with_strategy(&source, strategy.into()).await?,
                None => repo.merge(&source).await?,
            };
            if conflicts.is_empty() {
                println!("{}", "merge completed cleanly".green());
            } else {
                println!("{} {} file(s)", "conflicts in".red().bold(), conflicts.len());
                for conflict in conflicts {
                    println!("  {}", conflict.path);
                }
            }
        }
        Commands::Rebase { onto } => {
            let mut repo = Repository::open(&cli.repo).await?;
            repo.rebase(onto).await?;
            println!("{}", "rebase complete".green());
        }
        Commands::Dangling => {
            let repo = Repository::open(&cli.repo).await?;
            for commit in repo.find_dangling() {
                println!("{} {}", "dangling".yellow(), commit.digest);
            }
        }
        Commands::Recover { commit_id, branch_name } => {
            let mut repo = Repository::open(&cli.repo).await?;
            let branch = repo.recover(commit_id, &branch_name).await?;
            println!("{} {}", "recovered into".green(), branch.name);
        }
        Commands::Diff { old, new } => {
            let mut repo = Repository::open(&cli.repo).await?;
            let history = repo.log()?;
            let old_commit = history.iter().find(|c| c.id == old).ok_or_else(|| linage::LinageError::NotFound(old.to_string()))?;
            let new_commit = history.iter().find(|c| c.id == new).ok_or_else(|| linage::LinageError::NotFound(new.to_string()))?;
            for item in unified_diff::diff_commits(old_commit, new_commit, repo.blobs())? {
                println!("--- {}", item.path);
                for line in item.text.lines() {
                    match line.as_bytes().first() {
                        Some(b'+') => println!("{}", line.green()),
                        Some(b'-') => println!("{}", line.red()),
                        _ => println!("{line}"),
                    }
                }
            }
        }
    }
    Ok(())
}

fn colorize_status(label: &str) -> colored::ColoredString {
    match label {
        "new" => label.green(),
        "deleted" => label.red(),
        "modified" => label.yellow(),
        other => other.normal(),
    }
}
