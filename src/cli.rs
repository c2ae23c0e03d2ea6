/// Command-line surface
use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use std::ffi::OsString;
use std::path::PathBuf;

use crate::config::DEFAULT_CONFIG_FILE;
use crate::k8s::status::OutputFormat;

/// Printed for `--help` and for a bare invocation
pub const USAGE: &str = "\
tufin cli use :
     cluster        to deploy k3s cluster
     deploy         to deploy Wordpress App
     status         get status of pods in default namespace
";

pub const NOT_FOUND: &str = "Command not found use tufin --help to see disponible options";

#[derive(Parser, Debug)]
#[command(name = "tufin", disable_help_flag = true, disable_help_subcommand = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Kubeconfig file (default: /etc/rancher/k3s/k3s.yaml)
    #[arg(long, global = true)]
    pub kubeconfig: Option<PathBuf>,

    /// Settings file path
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print usage
    #[arg(short = 'h', long = "help")]
    pub help: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Install k3s on this machine
    Cluster,

    /// Create the WordPress and MySQL workloads
    Deploy {
        /// Skip objects whose prerequisite failed to be created
        #[arg(long)]
        skip_dependents: bool,
    },

    /// Show pod status in the default namespace
    Status {
        /// Row format
        #[arg(short, long, value_enum, default_value_t)]
        output: OutputFormat,
    },

    /// Print the deployment as a YAML manifest
    Manifest,
}

/// What the process should do with its arguments
#[derive(Debug)]
pub enum Invocation {
    /// Print [`USAGE`] and exit with `exit_code`
    Usage { exit_code: i32 },
    /// Unrecognized command token
    NotFound,
    /// Malformed options for a known command
    Invalid(clap::Error),
    Run { cli: Cli, command: Commands },
}

const COMMANDS: [&str; 4] = ["cluster", "deploy", "status", "manifest"];

pub fn parse_args<I, T>(args: I) -> Invocation
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args: Vec<OsString> = args.into_iter().map(Into::into).collect();

    match Cli::try_parse_from(&args) {
        Ok(cli) if cli.help => Invocation::Usage { exit_code: 0 },
        Ok(mut cli) => match cli.command.take() {
            Some(command) => Invocation::Run { cli, command },
            None => Invocation::Usage { exit_code: 1 },
        },
        Err(e) => match e.kind() {
            ErrorKind::InvalidSubcommand => Invocation::NotFound,
            ErrorKind::UnknownArgument if !names_command(&args) => Invocation::NotFound,
            _ => Invocation::Invalid(e),
        },
    }
}

/// Whether any argument is one of the known command tokens
fn names_command(args: &[OsString]) -> bool {
    args.iter()
        .skip(1)
        .any(|arg| COMMANDS.iter().any(|name| arg.as_os_str() == *name))
}
