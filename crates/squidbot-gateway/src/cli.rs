use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "squidbot", about = "A personal AI assistant runtime")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactive setup wizard. Idempotent.
    Onboard,
    /// Run a single interactive session on the terminal channel.
    Agent {
        /// Send one message non-interactively and exit.
        #[arg(short = 'm', long = "message")]
        message: Option<String>,
    },
    /// Start all enabled channels, the scheduler, and the heartbeat.
    Gateway,
    /// Print a configuration summary.
    Status,
    /// Manage cron jobs.
    Cron {
        #[command(subcommand)]
        action: CronAction,
    },
    /// List discovered skills.
    Skills {
        #[command(subcommand)]
        action: SkillsAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum CronAction {
    List,
    Add {
        name: String,
        schedule: String,
        message: String,
        #[arg(long, default_value = "cli:local")]
        channel: String,
    },
    Remove {
        id: String,
    },
    SetEnabled {
        id: String,
        enabled: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum SkillsAction {
    List,
}
