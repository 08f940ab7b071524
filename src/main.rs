use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use twig::areas::config::Config;
use twig::areas::refs::Head;
use twig::areas::repository::Repository;
use twig::areas::workspace::DiskWorkspace;
use twig::artifacts::branch::branch_name::{RefKind, SymRefName};
use twig::artifacts::log::bisect::{Bisect, BisectStep};
use twig::artifacts::objects::commit::Commit;
use twig::artifacts::objects::object_id::ObjectId;
use twig::artifacts::rebase::{RebaseOutcome, RebasePlan, StopReason, SuspendedRebase};
use twig::artifacts::status::file_change::{FileChangeType, IndexChangeType, WorkspaceChangeType};
use twig::commands::porcelain::cherry_pick::PickOutcome;
use twig::commands::porcelain::merge::MergeOutcome;
use twig::commands::porcelain::reset::ResetMode;
use twig::commands::porcelain::stash::StashApplyOutcome;
use twig::errors::RepositoryError;

const LOG_ENV: &str = "TWIG_LOG";

#[derive(Parser)]
#[command(
    name = "twig",
    version = "0.1.0",
    author = "Sami Barbut-Dica",
    about = "A small content-addressable version control system",
    long_about = "twig keeps snapshots of a directory in a content-addressed object store \
    and offers branching, three-way merging and history rewriting on top of it. \
    Set TWIG_LOG (e.g. TWIG_LOG=debug) to see what the engine is doing.",
    help_template = r"
{name} {version} - {about}

USAGE:
    {usage}

OPTIONS:
    {all-args}
",
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(
        name = "init",
        about = "Initialize a new repository",
        long_about = "This command creates a .twig directory in the current directory or at the specified path. \
        Running it on an existing repository is safe."
    )]
    Init {
        #[arg(index = 1, help = "The path to the repository")]
        path: Option<PathBuf>,
    },
    #[command(name = "add", about = "Stage files for the next commit")]
    Add {
        #[arg(required = true, help = "Files or directories to stage")]
        paths: Vec<PathBuf>,
    },
    #[command(name = "rm", about = "Stop tracking files")]
    Rm {
        #[arg(long, help = "Only remove the files from the index")]
        cached: bool,
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    #[command(
        name = "commit",
        about = "Record the staged changes as a new commit",
        long_about = "This command creates a new commit from the index. While a merge, cherry-pick or revert \
        is waiting for conflict resolution, it concludes that operation instead."
    )]
    Commit {
        #[arg(short, long, help = "The commit message")]
        message: Option<String>,
        #[arg(long, help = "Replace the HEAD commit instead of adding a new one")]
        amend: bool,
    },
    #[command(name = "status", about = "Show the working tree status")]
    Status {
        #[arg(long, help = "Two-column output for scripts")]
        porcelain: bool,
    },
    #[command(name = "log", about = "Show the commit history")]
    Log {
        #[arg(index = 1, help = "Revision to start from, HEAD by default")]
        revision: Option<String>,
        #[arg(long, help = "One line per commit")]
        oneline: bool,
        #[arg(long, help = "Follow only the first parent of merge commits")]
        first_parent: bool,
    },
    #[command(name = "branch", about = "List, create or delete branches")]
    Branch {
        #[arg(index = 1)]
        name: Option<String>,
        #[arg(index = 2, help = "Revision the new branch starts at, HEAD by default")]
        start: Option<String>,
        #[arg(short, long, help = "Delete a fully merged branch")]
        delete: bool,
        #[arg(short = 'D', help = "Delete a branch even if it is not merged")]
        force_delete: bool,
    },
    #[command(name = "tag", about = "List, create or delete tags")]
    Tag {
        #[arg(index = 1)]
        name: Option<String>,
        #[arg(index = 2, help = "Revision to tag, HEAD by default")]
        target: Option<String>,
        #[arg(short, long, help = "Create an annotated tag with this message")]
        message: Option<String>,
        #[arg(short, long)]
        delete: bool,
    },
    #[command(name = "checkout", about = "Switch to a branch or detach HEAD at a commit")]
    Checkout {
        #[arg(index = 1)]
        target: String,
    },
    #[command(name = "merge", about = "Join another line of history into HEAD")]
    Merge {
        #[arg(index = 1, required_unless_present_any = ["abort", "resume"])]
        revision: Option<String>,
        #[arg(long, help = "Abandon the pending merge")]
        abort: bool,
        #[arg(long = "continue", help = "Commit the resolved merge")]
        resume: bool,
        #[arg(short, long)]
        message: Option<String>,
    },
    #[command(name = "cherry-pick", about = "Apply the change of an existing commit")]
    CherryPick {
        #[arg(index = 1)]
        revision: String,
        #[arg(short, long, help = "Parent number to diff a merge commit against")]
        mainline: Option<usize>,
    },
    #[command(name = "revert", about = "Undo the change of an existing commit with a new commit")]
    Revert {
        #[arg(index = 1)]
        revision: String,
        #[arg(short, long, help = "Parent number to diff a merge commit against")]
        mainline: Option<usize>,
    },
    #[command(name = "reset", about = "Move HEAD, optionally resetting the index and working tree")]
    Reset {
        #[arg(index = 1, default_value = "HEAD")]
        revision: String,
        #[command(flatten)]
        mode: ResetArgs,
    },
    #[command(
        name = "rebase",
        about = "Replay the current branch on top of another commit",
        long_about = "This command replays the commits of the current branch that are missing from the \
        upstream. A todo file (pick/reword/squash/fixup/drop/edit lines) can replace the default plan. \
        When a step stops, fix things up and run --continue, or --abort to go back."
    )]
    Rebase {
        #[arg(index = 1, required_unless_present_any = ["abort", "resume"])]
        upstream: Option<String>,
        #[arg(long, help = "Read the plan from this todo file")]
        todo: Option<PathBuf>,
        #[arg(long, help = "Print the default plan and stop")]
        show_todo: bool,
        #[arg(long = "continue")]
        resume: bool,
        #[arg(long)]
        abort: bool,
    },
    #[command(name = "stash", about = "Put local changes aside")]
    Stash {
        #[command(subcommand)]
        action: Option<StashCommand>,
    },
    #[command(name = "reflog", about = "Show the history of a ref")]
    Reflog {
        #[arg(index = 1, default_value = "HEAD")]
        name: String,
    },
    #[command(name = "bisect", about = "Find the commit that introduced a bug")]
    Bisect {
        #[command(subcommand)]
        action: BisectCommand,
    },
    #[command(name = "merge-base", about = "Print the best common ancestor of two commits")]
    MergeBase {
        #[arg(index = 1)]
        first: String,
        #[arg(index = 2)]
        second: String,
    },
    #[command(
        name = "cat-file",
        about = "Print the content of an object",
        long_about = "This command prints the content of an object in the repository. \
        It requires the SHA of the object to be specified."
    )]
    CatFile {
        #[arg(short = 'p', long, help = "The object SHA to print")]
        sha: String,
    },
    #[command(
        name = "hash-object",
        about = "Hash an object and optionally write it to the object database",
        long_about = "This command hashes a file of the working tree and can write it to the object database. \
        It requires the path to the file to be specified."
    )]
    HashObject {
        #[arg(short, long, required = false, help = "Write the object to the object database")]
        write: bool,
        #[arg(index = 1)]
        file: PathBuf,
    },
    #[command(name = "ls-tree", about = "List the files of a tree, commit or tag")]
    LsTree {
        #[arg(index = 1, default_value = "HEAD")]
        revision: String,
    },
    #[command(name = "gc", about = "Delete unreachable objects")]
    Gc,
    #[command(name = "fsck", about = "Verify the object database")]
    Fsck,
}

#[derive(Args)]
#[group(multiple = false)]
struct ResetArgs {
    #[arg(long, help = "Only move HEAD")]
    soft: bool,
    #[arg(long, help = "Move HEAD and reset the index (default)")]
    mixed: bool,
    #[arg(long, help = "Move HEAD and reset the index and working tree")]
    hard: bool,
}

impl ResetArgs {
    fn mode(&self) -> ResetMode {
        if self.soft {
            ResetMode::Soft
        } else if self.hard {
            ResetMode::Hard
        } else {
            ResetMode::Mixed
        }
    }
}

#[derive(Subcommand)]
enum StashCommand {
    Push {
        #[arg(short, long)]
        message: Option<String>,
    },
    List,
    Apply {
        #[arg(index = 1, default_value_t = 0)]
        position: usize,
    },
    Pop {
        #[arg(index = 1, default_value_t = 0)]
        position: usize,
    },
    Drop {
        #[arg(index = 1, default_value_t = 0)]
        position: usize,
    },
}

#[derive(Subcommand)]
enum BisectCommand {
    Start {
        #[arg(index = 1)]
        bad: String,
        #[arg(index = 2)]
        goods: Vec<String>,
    },
    Good {
        #[arg(index = 1)]
        revision: String,
    },
    Bad {
        #[arg(index = 1)]
        revision: String,
    },
    Reset,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli.command).await {
        Ok(code) => code,
        Err(error) => {
            eprintln!("{} {error:#}", "error:".red().bold());
            ExitCode::from(128)
        }
    }
}

fn open_repository() -> anyhow::Result<Repository> {
    let pwd = std::env::current_dir().context("Unable to read the current directory")?;
    Repository::open(&pwd, Box::new(DiskWorkspace::new(pwd.clone().into_boxed_path())))
}

async fn run(command: Commands) -> anyhow::Result<ExitCode> {
    if let Commands::Init { path } = &command {
        let pwd = std::env::current_dir().context("Unable to read the current directory")?;
        let path = path.as_ref().map_or(pwd.clone(), |path| pwd.join(path));
        std::fs::create_dir_all(&path)
            .with_context(|| format!("Failed to create directory {}", path.display()))?;
        let path = path.canonicalize()?;

        let repository = Repository::init(
            &path,
            Box::new(DiskWorkspace::new(path.clone().into_boxed_path())),
            Config::default(),
        )?;
        println!("Initialized twig repository at {}", repository.git_dir().display());
        return Ok(ExitCode::SUCCESS);
    }

    let repository = open_repository()?;

    match command {
        Commands::Init { .. } => {}
        Commands::Add { paths } => repository.add(&paths).await?,
        Commands::Rm { cached, paths } => {
            repository.rm(&paths, cached).await?;
            for path in paths {
                println!("rm '{}'", path.display());
            }
        }
        Commands::Commit { message, amend } => {
            let commit_oid = if amend {
                repository.amend(message.as_deref()).await?
            } else {
                repository.commit(message.as_deref().unwrap_or_default()).await?
            };
            print_commit_summary(&repository, &commit_oid)?;
        }
        Commands::Status { porcelain } => print_status(&repository, porcelain).await?,
        Commands::Log {
            revision,
            oneline,
            first_parent,
        } => print_log(&repository, revision.as_deref(), oneline, first_parent)?,
        Commands::Branch {
            name,
            start,
            delete,
            force_delete,
        } => match name {
            Some(name) if delete || force_delete => {
                let tip = repository.delete_branch(&name, force_delete)?;
                println!("Deleted branch {name} (was {}).", tip.to_short_oid());
            }
            Some(name) => {
                repository.create_branch(&name, start.as_deref())?;
            }
            None => {
                let current = repository.refs().current_branch()?;
                for (branch, _) in repository.list_branches()? {
                    if current.as_ref() == Some(&branch) {
                        println!("* {}", branch.short_name().green());
                    } else {
                        println!("  {}", branch.short_name());
                    }
                }
            }
        },
        Commands::Tag {
            name,
            target,
            message,
            delete,
        } => match name {
            Some(name) if delete => {
                let oid = repository.delete_tag(&name)?;
                println!("Deleted tag '{name}' (was {}).", oid.to_short_oid());
            }
            Some(name) => {
                repository.create_tag(&name, target.as_deref(), message.as_deref())?;
            }
            None => {
                for (tag, _) in repository.list_tags()? {
                    println!("{}", tag.short_name());
                }
            }
        },
        Commands::Checkout { target } => match repository.checkout(&target).await? {
            Head::Attached(branch) => println!("Switched to branch '{}'", branch.short_name()),
            Head::Detached(oid) => println!("HEAD is now at {}", oid.to_short_oid()),
        },
        Commands::Merge {
            revision,
            abort,
            resume,
            message,
        } => {
            if abort {
                let head = repository.merge_abort().await?;
                println!("HEAD is now at {}", head.to_short_oid());
            } else if resume {
                let commit_oid = repository.merge_continue(message.as_deref()).await?;
                print_commit_summary(&repository, &commit_oid)?;
            } else if let Some(revision) = revision {
                return report_merge(repository.merge(&revision).await?);
            }
        }
        Commands::CherryPick { revision, mainline } => {
            let outcome = repository.cherry_pick(&revision, mainline).await?;
            return report_pick(&repository, outcome, "cherry-pick");
        }
        Commands::Revert { revision, mainline } => {
            let outcome = repository.revert(&revision, mainline).await?;
            return report_pick(&repository, outcome, "revert");
        }
        Commands::Reset { revision, mode } => {
            let mode = mode.mode();
            let head = repository.reset(mode, &revision).await?;
            if mode == ResetMode::Hard {
                print_commit_summary(&repository, &head)?;
            }
        }
        Commands::Rebase {
            upstream,
            todo,
            show_todo,
            resume,
            abort,
        } => return run_rebase(&repository, upstream, todo, show_todo, resume, abort).await,
        Commands::Stash { action } => {
            return run_stash(&repository, action.unwrap_or(StashCommand::Push { message: None }))
                .await;
        }
        Commands::Reflog { name } => {
            let entries = if name == "HEAD" {
                repository.head_reflog()?
            } else {
                repository.reflog(&name)?
            };
            for (position, entry) in entries.iter().enumerate() {
                let oid = entry
                    .new_oid
                    .as_ref()
                    .map_or_else(|| "0".repeat(7), ObjectId::to_short_oid);
                println!("{} {name}@{{{position}}}: {}", oid.yellow(), entry.operation);
            }
        }
        Commands::Bisect { action } => return run_bisect(&repository, action),
        Commands::MergeBase { first, second } => match repository.merge_base(&first, &second)? {
            Some(base) => println!("{base}"),
            None => return Ok(ExitCode::FAILURE),
        },
        Commands::CatFile { sha } => {
            let (_, object) = repository.cat_file(&sha)?;
            print!("{}", object.display());
        }
        Commands::HashObject { write, file } => {
            println!("{}", repository.hash_file(&file, write)?);
        }
        Commands::LsTree { revision } => {
            for (path, entry) in repository.ls_tree(&revision)? {
                println!("{} blob {}\t{}", entry.mode.as_str(), entry.oid, path.display());
            }
        }
        Commands::Gc => {
            let report = repository.gc().await?;
            println!(
                "Removed {} unreachable objects, kept {}",
                report.removed.len(),
                report.kept
            );
        }
        Commands::Fsck => {
            let report = repository.fsck()?;
            for (oid, reason) in &report.corrupt {
                println!("{} {oid}: {reason}", "corrupt".red());
            }
            for link in &report.broken_links {
                println!("{} {link}", "broken link".red());
            }
            if !report.is_ok() {
                return Ok(ExitCode::FAILURE);
            }
            println!("Checked {} objects", report.checked);
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn print_commit_summary(repository: &Repository, oid: &ObjectId) -> anyhow::Result<()> {
    let commit = repository.database().load_commit(oid)?;
    let branch = match repository.refs().head()? {
        Head::Attached(branch) => branch.short_name().to_string(),
        Head::Detached(_) => "detached HEAD".to_string(),
    };
    println!("[{branch} {}] {}", oid.to_short_oid(), commit.short_message());

    Ok(())
}

async fn print_status(repository: &Repository, porcelain: bool) -> anyhow::Result<()> {
    let status = repository.status().await?;

    if porcelain {
        let mut lines = status
            .changed_files()
            .into_iter()
            .filter(|(path, _)| !status.unmerged.contains(path))
            .map(|(path, change)| (path, change.to_string()))
            .collect::<Vec<_>>();
        lines.extend(status.unmerged.iter().map(|path| (path.clone(), "UU".to_string())));
        lines.sort();
        for (path, code) in lines {
            println!("{code} {}", path.display());
        }
        return Ok(());
    }

    match repository.refs().head()? {
        Head::Attached(branch) => println!("On branch {}", branch.short_name()),
        Head::Detached(oid) => println!("HEAD detached at {}", oid.to_short_oid()),
    }

    let staged = status
        .staged
        .iter()
        .filter(|(_, change)| **change != IndexChangeType::None)
        .map(|(path, change)| (path, FileChangeType::Index(*change)))
        .collect::<Vec<_>>();
    print_section("Changes to be committed:", &staged);

    let unmerged = status
        .unmerged
        .iter()
        .map(|path| (path, FileChangeType::Unmerged))
        .collect::<Vec<_>>();
    print_section("Unmerged paths:", &unmerged);

    let unstaged = status
        .unstaged
        .iter()
        .filter(|(_, change)| **change != WorkspaceChangeType::None)
        .map(|(path, change)| (path, FileChangeType::Workspace(*change)))
        .collect::<Vec<_>>();
    print_section("Changes not staged for commit:", &unstaged);

    if !status.untracked.is_empty() {
        println!("Untracked files:");
        for path in &status.untracked {
            println!("\t{}", path.display().to_string().red());
        }
        println!();
    }

    if status.is_clean() {
        println!("nothing to commit, working tree clean");
    }

    Ok(())
}

fn print_section(title: &str, changes: &[(&PathBuf, FileChangeType)]) {
    if changes.is_empty() {
        return;
    }

    println!("{title}");
    for (path, change) in changes {
        println!("{change}{}", path.display());
    }
    println!();
}

fn print_log(
    repository: &Repository,
    revision: Option<&str>,
    oneline: bool,
    first_parent: bool,
) -> anyhow::Result<()> {
    let decorations = repository.refs().reverse_refs()?;
    let head = repository.refs().head()?;

    for (oid, commit) in repository.log(revision, first_parent)? {
        let decoration = decorate(&oid, &decorations, &head);
        if oneline {
            println!("{}{decoration} {}", oid.to_short_oid().yellow(), commit.short_message());
        } else {
            print_medium(&oid, &commit, &decoration);
        }
    }

    Ok(())
}

fn print_medium(oid: &ObjectId, commit: &Commit, decoration: &str) {
    println!("{}{decoration}", format!("commit {oid}").yellow());
    if commit.is_merge() {
        let parents = commit
            .parents()
            .iter()
            .map(ObjectId::to_short_oid)
            .collect::<Vec<_>>();
        println!("Merge: {}", parents.join(" "));
    }
    println!("Author: {}", commit.author().display_name());
    println!("Date:   {}", commit.author().readable_timestamp());
    println!();
    for line in commit.message().lines() {
        println!("    {line}");
    }
    println!();
}

fn decorate(oid: &ObjectId, decorations: &HashMap<ObjectId, Vec<SymRefName>>, head: &Head) -> String {
    let mut names = Vec::new();
    if let Head::Detached(detached) = head
        && detached == oid
    {
        names.push("HEAD".bold().cyan().to_string());
    }

    for sym_ref in decorations.get(oid).into_iter().flatten() {
        if sym_ref.is_head() {
            continue;
        }

        let name = match sym_ref.kind() {
            Some(RefKind::Tag) => {
                format!("tag: {}", sym_ref.short_name()).yellow().to_string()
            }
            _ => sym_ref.short_name().green().to_string(),
        };
        if head.branch() == Some(sym_ref) {
            names.insert(0, format!("{} -> {name}", "HEAD".bold().cyan()));
        } else {
            names.push(name);
        }
    }

    if names.is_empty() {
        String::new()
    } else {
        format!(" ({})", names.join(", "))
    }
}

fn report_conflicts(paths: &[PathBuf]) {
    for path in paths {
        println!("CONFLICT (content): Merge conflict in {}", path.display());
    }
}

fn report_merge(outcome: MergeOutcome) -> anyhow::Result<ExitCode> {
    match outcome {
        MergeOutcome::AlreadyUpToDate => println!("Already up to date."),
        MergeOutcome::FastForward(oid) => println!("Fast-forward to {}", oid.to_short_oid()),
        MergeOutcome::Merged(oid) => println!("Merge made as {}", oid.to_short_oid()),
        MergeOutcome::Conflicted(paths) => {
            report_conflicts(&paths);
            println!("Automatic merge failed; fix conflicts and then commit the result.");
            return Ok(ExitCode::FAILURE);
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn report_pick(
    repository: &Repository,
    outcome: PickOutcome,
    operation: &str,
) -> anyhow::Result<ExitCode> {
    match outcome {
        PickOutcome::Committed(oid) => print_commit_summary(repository, &oid)?,
        PickOutcome::Empty => println!("nothing to commit, the change is already applied"),
        PickOutcome::Conflicted(paths) => {
            report_conflicts(&paths);
            println!(
                "error: could not {operation}; resolve the conflicts, stage them and commit, or run 'twig merge --abort'"
            );
            return Ok(ExitCode::FAILURE);
        }
    }

    Ok(ExitCode::SUCCESS)
}

async fn run_rebase(
    repository: &Repository,
    upstream: Option<String>,
    todo: Option<PathBuf>,
    show_todo: bool,
    resume: bool,
    abort: bool,
) -> anyhow::Result<ExitCode> {
    let git_dir = repository.git_dir();

    if abort || resume {
        let state = SuspendedRebase::load(git_dir)?
            .ok_or_else(|| RepositoryError::invalid_state("no rebase in progress"))?;

        if abort {
            let head = repository.rebase_abort(state).await?;
            SuspendedRebase::clear(git_dir)?;
            println!("HEAD is now at {}", head.to_short_oid());
            return Ok(ExitCode::SUCCESS);
        }

        let outcome = repository.rebase_continue(state).await?;
        return report_rebase(git_dir, outcome);
    }

    let Some(upstream) = upstream else {
        return Err(RepositoryError::invalid_state("no upstream to rebase onto"));
    };
    let mut plan = repository.rebase_plan(&upstream)?;
    if let Some(todo) = todo {
        let text = std::fs::read_to_string(&todo)
            .with_context(|| format!("Unable to read todo file {}", todo.display()))?;
        plan.items = RebasePlan::parse_items(&text, |name| repository.resolve(name))?;
    }
    if show_todo {
        print!("{}", plan.render());
        return Ok(ExitCode::SUCCESS);
    }

    let outcome = repository.rebase(plan).await?;
    report_rebase(git_dir, outcome)
}

fn report_rebase(git_dir: &Path, outcome: RebaseOutcome) -> anyhow::Result<ExitCode> {
    match outcome {
        RebaseOutcome::UpToDate => {
            SuspendedRebase::clear(git_dir)?;
            println!("Current branch is up to date.");
        }
        RebaseOutcome::Completed(tip) => {
            SuspendedRebase::clear(git_dir)?;
            println!("Successfully rebased, now at {}.", tip.to_short_oid());
        }
        RebaseOutcome::Paused(state) => {
            state.save(git_dir)?;
            let Some(stop) = &state.stopped else {
                return Ok(ExitCode::FAILURE);
            };

            return Ok(match stop.reason {
                StopReason::Conflict => {
                    println!("Could not apply {}", stop.item);
                    println!(
                        "Resolve the conflicts, stage them, then run 'twig rebase --continue' or 'twig rebase --abort'."
                    );
                    ExitCode::FAILURE
                }
                StopReason::Edit => {
                    println!("Stopped at {}", stop.item);
                    println!(
                        "You can amend the commit now with 'twig commit --amend', then run 'twig rebase --continue'."
                    );
                    ExitCode::SUCCESS
                }
            });
        }
    }

    Ok(ExitCode::SUCCESS)
}

async fn run_stash(repository: &Repository, action: StashCommand) -> anyhow::Result<ExitCode> {
    let outcome = match action {
        StashCommand::Push { message } => {
            let oid = repository.stash_push(message.as_deref()).await?;
            let stash = repository.database().load_commit(&oid)?;
            println!("Saved working directory and index state {}", stash.short_message());
            return Ok(ExitCode::SUCCESS);
        }
        StashCommand::List => {
            for (position, (_, commit)) in repository.stash_list()?.iter().enumerate() {
                println!("stash@{{{position}}}: {}", commit.short_message());
            }
            return Ok(ExitCode::SUCCESS);
        }
        StashCommand::Drop { position } => {
            let oid = repository.stash_drop(position)?;
            println!("Dropped stash@{{{position}}} ({oid})");
            return Ok(ExitCode::SUCCESS);
        }
        StashCommand::Apply { position } => repository.stash_apply(position).await?,
        StashCommand::Pop { position } => repository.stash_pop(position).await?,
    };

    match outcome {
        StashApplyOutcome::Applied => Ok(ExitCode::SUCCESS),
        StashApplyOutcome::Conflicted(paths) => {
            report_conflicts(&paths);
            println!("The stash entry is kept in case you need it again.");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn run_bisect(repository: &Repository, action: BisectCommand) -> anyhow::Result<ExitCode> {
    let git_dir = repository.git_dir();

    let (revision, good) = match action {
        BisectCommand::Start { bad, goods } => {
            let goods = goods.iter().map(String::as_str).collect::<Vec<_>>();
            let (session, step) = repository.bisect_start(&bad, &goods)?;
            session.save(git_dir)?;
            return report_bisect(&session, &step);
        }
        BisectCommand::Reset => {
            Bisect::clear(git_dir)?;
            return Ok(ExitCode::SUCCESS);
        }
        BisectCommand::Good { revision } => (revision, true),
        BisectCommand::Bad { revision } => (revision, false),
    };

    let mut session = Bisect::load(git_dir)?
        .ok_or_else(|| RepositoryError::invalid_state("no bisect in progress; run 'twig bisect start'"))?;
    let step = repository.bisect_mark(&mut session, &revision, good)?;
    session.save(git_dir)?;

    report_bisect(&session, &step)
}

fn report_bisect(session: &Bisect, step: &BisectStep) -> anyhow::Result<ExitCode> {
    match step {
        BisectStep::Test(candidate) => println!(
            "Bisecting: {} candidates left, test {} ({} steps so far)",
            session.remaining(),
            candidate.to_string().yellow(),
            session.steps()
        ),
        BisectStep::Done(first_bad) => {
            println!("{} is the first bad commit", first_bad.to_string().yellow())
        }
    }

    Ok(ExitCode::SUCCESS)
}
