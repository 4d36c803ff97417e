#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]

mod commands;
mod logging;

use clap::Parser;
use haveit_core::config::DEFAULT_MAX_DEPTH;
use miette::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "have")]
#[command(author, version, about = "Reuse packages already installed elsewhere on this machine", long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Override the working directory
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    #[command(flatten)]
    install: InstallArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Arguments of the default action: find, link, and install packages.
#[derive(clap::Args, Debug)]
struct InstallArgs {
    /// Packages to provide (`name` or `name@version`); defaults to package.json
    #[arg(value_name = "NAMES")]
    names: Vec<String>,

    /// Record the packages in `dependencies`
    #[arg(short = 'S', long)]
    save: bool,

    /// Record the packages in `devDependencies`
    #[arg(short = 'D', long)]
    save_dev: bool,

    /// Folder searched for existing installations (default: home directory)
    #[arg(long, env = "HAVE", value_name = "PATH")]
    root: Option<PathBuf>,

    /// How deep below the root `node_modules` folders are searched
    #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if matches!(cli.command, Some(Commands::Version)) {
        return commands::version::run(cli.json);
    }

    let cwd = cli
        .cwd
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    logging::init(cli.verbose, cli.json);

    let args = commands::install::Args {
        names: cli.install.names,
        save: cli.install.save,
        save_dev: cli.install.save_dev,
        root: cli.install.root,
        max_depth: cli.install.max_depth,
        verbosity: cli.verbose,
    };
    commands::install::run(cwd, args, cli.json)
}
