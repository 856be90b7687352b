use clap::{Parser, Subcommand};

/// Command-line interface definition for rClockIn
/// Clock in and out of tasks, keep a local CSV ledger and mirror it to a SharePoint list
#[derive(Parser)]
#[command(
    name = "rclockin",
    version = env!("CARGO_PKG_VERSION"),
    about = "A simple clock-in/clock-out tool: local CSV ledger, SharePoint list sync and PDF summaries",
    long_about = None
)]
pub struct Cli {
    /// Override the data directory (useful for tests or multiple profiles)
    #[arg(global = true, long = "dir")]
    pub dir: Option<String>,

    /// Also print diagnostic logs on stderr
    #[arg(global = true, long = "verbose", short = 'v')]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the data directory and a default settings file
    Init,

    /// View or change the identity-provider and remote list settings
    Config {
        #[arg(long = "print", help = "Print the current settings")]
        print_config: bool,

        #[arg(
            long = "set",
            value_name = "KEY=VALUE",
            help = "Change one setting (client_id, authority, scopes, site_url, list_name)"
        )]
        set: Vec<String>,
    },

    /// Start working on a task
    In {
        /// What you are working on
        task: String,

        #[arg(long = "user", help = "Worker ID recorded on the remote list")]
        user: Option<String>,

        #[arg(long = "dept", help = "Department recorded on the remote list")]
        dept: Option<String>,
    },

    /// Stop the current task, record it and push it to the remote list
    Out {
        #[arg(long = "user", help = "Worker ID recorded on the remote list")]
        user: Option<String>,

        #[arg(long = "dept", help = "Department recorded on the remote list")]
        dept: Option<String>,

        #[arg(
            long = "wait",
            value_name = "SECS",
            default_value_t = 30,
            help = "How long to wait for the remote push before exiting"
        )]
        wait: u64,
    },

    /// Show the open session, if any
    Status,

    /// List recorded sessions
    List {
        #[arg(long, short, help = "Filter by week, year, month, day or a custom range")]
        period: Option<String>,
    },

    /// Generate the PDF summary of the ledger
    Report {
        #[arg(long, value_name = "FILE", help = "Output file (default: weekly_summary.pdf)")]
        file: Option<String>,

        #[arg(long, short, help = "Filter by week, year, month, day or a custom range")]
        period: Option<String>,
    },

    /// Sign in now instead of at the first push
    Login,

    /// Interactive mode: one long-lived session with the same operations
    Shell,
}
