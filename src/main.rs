use std::path::PathBuf;

use clap::{Parser, Subcommand};

use vcs_bridge::config::{Config, Verbosity};
use vcs_bridge::error::EngineError;
use vcs_bridge::{commands, logging};

#[derive(Parser)]
#[command(name = "vcs-bridge")]
#[command(about = "Bidirectional mirror between a source VCS and a target VCS")]
struct Cli {
    /// More verbose logging (debug level).
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Most verbose logging (trace level); also disables `--quiet` on child
    /// VCS invocations.
    #[arg(short = 'd', long)]
    debug: bool,

    /// Run as if started in <dir> instead of the current directory.
    #[arg(short = 'C', long = "directory", value_name = "dir")]
    directory: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a new, empty repository at <path>.
    Init { path: PathBuf },

    /// Register and perform the first sync of a new branch pair.
    Import {
        /// Target-VCS branch name (defaults to the source branch name).
        #[arg(short = 'b', long = "branch")]
        target_name: Option<String>,
        url: String,
        source_branch: String,
    },

    /// Re-sync one or more already-registered branches.
    Update {
        /// Update every registered branch.
        #[arg(short = 'a', long)]
        all: bool,
        target_branches: Vec<String>,
    },

    /// Health-check both VCS binaries.
    TestInstall,

    /// List registered target branches.
    Branches {
        /// Also print the source branch name and URL.
        #[arg(short = 'v', long)]
        verbose: bool,
    },

    /// Mirror a target-VCS ref update back into the source VCS. Intended to
    /// be invoked as the target VCS's pre-receive/update hook.
    UpdateHook { ref_name: String, old_rev: String, new_rev: String },
}

fn main() {
    let cli = Cli::parse();

    let verbosity = Verbosity::from_flags(cli.verbose, cli.debug);
    logging::init(verbosity);

    let root = cli.directory.unwrap_or_else(|| PathBuf::from("."));
    let config = Config {
        verbosity,
        ..Config::default()
    };

    let result = match cli.command {
        Command::Init { path } => commands::init(&root.join(&path), config),
        Command::Import {
            target_name,
            url,
            source_branch,
        } => commands::import(&root, config, &url, &source_branch, target_name.as_deref()),
        Command::Update { all, target_branches } => commands::update(&root, config, &target_branches, all),
        Command::TestInstall => commands::test_install(&root, config),
        Command::Branches { verbose } => commands::branches(&root, config, verbose),
        Command::UpdateHook { ref_name, old_rev, new_rev } => commands::update_hook(&root, config, &ref_name, &old_rev, &new_rev),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(exit_code(&e));
    }
}

fn exit_code(e: &EngineError) -> i32 {
    e.exit_code()
}
