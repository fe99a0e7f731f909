//! Domain types and pure logic for the approval engine.
//!
//! Everything in here is storage-independent: account/membership state
//! machines, quorum arithmetic, and the audit hash chain. The database
//! layer persists these as plain strings and re-parses on read.

pub mod access;
pub mod hashchain;
pub mod quorum;

pub use access::{
    AccountState, ApprovalStatus, MembershipStatus, RecoveryStatus, Role, UserAccessState,
    VoteKind,
};
pub use hashchain::{ChainEntry, GENESIS_HASH, chain_hash, verify_chain};
pub use quorum::{QuorumMode, required_votes};
