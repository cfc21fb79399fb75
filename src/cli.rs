use clap::{Parser, Subcommand};

/// revq — fetch PR review comments and track which ones are addressed
#[derive(Parser, Debug, Clone)]
#[command(name = "revq", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,

    /// Working directory holding config and status files
    #[arg(long, global = true, default_value = ".")]
    pub dir: String,

    /// Path to config file (default: <dir>/.revq/config.toml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Review platform (azure-devops, github)
    #[arg(long, global = true)]
    pub platform: Option<String>,

    /// Azure DevOps organization
    #[arg(long, global = true)]
    pub org: Option<String>,

    /// Azure DevOps project
    #[arg(long, global = true)]
    pub project: Option<String>,

    /// Repository name (Azure DevOps) or GitHub repo
    #[arg(long, global = true)]
    pub repo: Option<String>,

    /// GitHub repository owner
    #[arg(long, global = true)]
    pub owner: Option<String>,

    /// Access token (prefer the platform's environment variable)
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Verbose logging
    #[arg(long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CliCommand {
    /// Fetch review threads, merge with local statuses, render a report
    Review {
        /// Pull request number
        pr_number: u64,

        /// Emit the reconciled view as JSON instead of markdown
        #[arg(long)]
        json: bool,

        /// Include already-handled threads in the action items list
        #[arg(long)]
        all: bool,

        /// Write the report to a file instead of stdout
        #[arg(long)]
        output: Option<String>,
    },

    /// Set or clear the locally-tracked status of a review thread
    Status {
        /// Pull request number
        pr_number: u64,

        /// Thread id as reported by the platform
        thread_id: String,

        /// Status to set (ACTIVE, COMPLETED, IN_PROGRESS, SKIPPED, BLOCKED)
        status: Option<String>,

        /// Optional note/reason for the status
        #[arg(long, short = 'n')]
        note: Option<String>,

        /// Remove the stored status for this thread
        #[arg(long)]
        clear: bool,
    },

    /// List the PR's changed files
    Files {
        /// Pull request number
        pr_number: u64,

        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Verify the configured platform is reachable with the resolved token
    Check,

    /// Show where the access token was resolved from (masked)
    Token,
}
