//! Command-line interface: server startup plus the privileged admin
//! operations that bypass quorum.

mod commands;

use clap::{Parser, Subcommand};

/// Vouchr - peer-vouched access and recovery
#[derive(Parser)]
#[command(name = "vouchr")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API server
    #[command(alias = "-d", alias = "--daemon")]
    Serve,

    /// List all users with their account state and membership counts
    #[command(name = "list-users", alias = "ls")]
    ListUsers,

    /// Reset a user's password to a generated temporary one.
    /// Invalidates all sessions and re-opens per-project approvals.
    #[command(name = "reset-password")]
    ResetPassword {
        /// Username to reset
        username: String,
    },

    /// Approve a user instantly, bypassing quorum
    Approve {
        /// Username to approve
        username: String,
    },

    /// Revoke a user's access and invalidate all sessions
    Revoke {
        /// Username to revoke
        username: String,
    },

    /// Verify the audit log hash chain
    #[command(name = "verify-audit")]
    VerifyAudit,

    /// Create default config file
    #[command(alias = "--init")]
    Init,
}

pub use commands::*;
