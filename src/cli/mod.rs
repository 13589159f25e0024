//! CLI command definitions for workforce-tracker
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

use crate::types::{NewUser, Role};
use clap::{Args, Parser, Subcommand, ValueEnum};

/// Workforce time-tracking API server and admin tools
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Path to database file (overrides config)
    #[arg(short, long, global = true)]
    pub database: Option<String>,

    /// Port for the HTTP API (overrides config)
    #[arg(short, long, global = true)]
    pub port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP API and the daily sweep (default if no subcommand given)
    Serve,

    /// Run the reconciliation sweep once and exit
    Sweep,

    /// Register a user and print their access token
    AddUser(AddUserArgs),
}

/// Role accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum CliRole {
    #[default]
    Member,
    Admin,
}

impl From<CliRole> for Role {
    fn from(role: CliRole) -> Self {
        match role {
            CliRole::Member => Role::TeamMember,
            CliRole::Admin => Role::Admin,
        }
    }
}

#[derive(Args, Debug)]
pub struct AddUserArgs {
    #[arg(long)]
    pub first_name: String,

    #[arg(long)]
    pub last_name: String,

    #[arg(long)]
    pub email: String,

    #[arg(long, value_enum, default_value_t = CliRole::Member)]
    pub role: CliRole,

    /// Team whose queue list applies to this user
    #[arg(long, default_value = crate::config::DEFAULT_TEAM)]
    pub team: String,
}

impl AddUserArgs {
    pub fn to_new_user(&self) -> NewUser {
        NewUser {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            role: self.role.into(),
            team: self.team.clone(),
        }
    }
}
