mod cmd;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::output::{OutputFormat, print_error, print_hint};

/// Exit status after an interrupt, as shells report SIGINT.
const EXIT_CANCELLED: u8 = 130;

/// toolmod - Go tool dependencies, pinned in gotool.mod
#[derive(Parser)]
#[command(name = "toolmod")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Project root (default: the enclosing git work tree)
  #[arg(short = 'C', long = "project", global = true, value_name = "DIR")]
  project: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Create an empty gotool.mod in the project root
  Init,

  /// Add tools, or upgrade them with -u
  Get {
    /// Tools as importpath[@version]
    specs: Vec<String>,

    /// Upgrade to the newest versions (all tools when none are given)
    #[arg(short, long)]
    update: bool,

    /// Install the tool under this name (single tool only)
    #[arg(short = 'o', long = "name", value_name = "NAME")]
    name: Option<String>,

    /// Output directory for built tools
    #[arg(short, long, value_name = "DIR")]
    dir: Option<PathBuf>,

    /// Only update gotool.mod, do not build
    #[arg(long)]
    no_build: bool,
  },

  /// Remove tools by module path or import path
  Remove {
    #[arg(required = true)]
    paths: Vec<String>,
  },

  /// Build tools into the output directory
  Build {
    /// Tools to build, by name or import path (default: all)
    tools: Vec<String>,

    /// Output directory
    #[arg(short, long, value_name = "DIR")]
    dir: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t)]
    output: OutputFormat,
  },

  /// List declared tools
  List {
    /// Only tools under these module or import paths
    filters: Vec<String>,

    #[arg(long, value_enum, default_value_t)]
    output: OutputFormat,
  },

  /// Run a tool, building it on first use
  Exec {
    /// Tool name
    name: String,

    /// Arguments passed to the tool
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
  },

  /// Remove every cached build
  Clean {
    #[arg(long, value_enum, default_value_t)]
    output: OutputFormat,
  },
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  let filter = if cli.verbose {
    EnvFilter::new("debug")
  } else {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
  };
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let project = cli.project;
  let result = match cli.command {
    Commands::Init => cmd::cmd_init(project).map(|_| ExitCode::SUCCESS),
    Commands::Get {
      specs,
      update,
      name,
      dir,
      no_build,
    } => cmd::cmd_get(project, &specs, update, name, dir, no_build).map(|_| ExitCode::SUCCESS),
    Commands::Remove { paths } => cmd::cmd_remove(project, &paths).map(|_| ExitCode::SUCCESS),
    Commands::Build { tools, dir, output } => cmd::cmd_build(project, tools, dir, output).map(|_| ExitCode::SUCCESS),
    Commands::List { filters, output } => cmd::cmd_list(project, &filters, output).map(|_| ExitCode::SUCCESS),
    Commands::Exec { name, args } => cmd::cmd_exec(project, &name, &args),
    Commands::Clean { output } => cmd::cmd_clean(project, output).map(|_| ExitCode::SUCCESS),
  };

  match result {
    Ok(code) => code,
    Err(err) => report(&err),
  }
}

fn report(err: &anyhow::Error) -> ExitCode {
  let lib_err = err.downcast_ref::<toolmod_lib::Error>();
  if lib_err.is_some_and(toolmod_lib::Error::is_cancelled) {
    return ExitCode::from(EXIT_CANCELLED);
  }

  print_error(&format!("{err:#}"));
  if lib_err.is_some_and(toolmod_lib::Error::is_not_found) {
    print_hint("run `toolmod init` first");
  }
  ExitCode::FAILURE
}
