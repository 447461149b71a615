use clap::{command, Parser, Subcommand};

// ///////////// //
// CLI interface //
// ///////////// //

/// cups2web - A web gateway for printing to and monitoring the print queues of a CUPS server.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Serves the HTTP API. This is the default.
    Serve,

    /// Dumps the current printers and jobs as JSON to stdout.
    Dump,
}
