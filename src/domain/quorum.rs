//! Quorum arithmetic for approval resolution.
//!
//! The rules are policy, not derivation, and are deliberately explicit:
//! a project admin resolves an approval with a single vote, regular
//! members need `ceil(0.33 * active_member_count)` distinct approvals,
//! and a solo project has no in-project path at all (the sole member
//! cannot vouch for themselves; only the admin override resolves it).

/// How a given approval can be resolved by voters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuorumMode {
    /// A single approving vote from a project admin resolves immediately.
    AdminInstant,
    /// `n` distinct approving votes from regular active members.
    Quorum(u32),
    /// Solo project: no satisfiable in-project quorum exists.
    NoInProjectPath,
}

/// Number of distinct approving votes required for `active_member_count`
/// eligible voters. Integer form of `ceil(0.33 * n)`, avoiding floats.
#[must_use]
pub const fn required_votes(active_member_count: u32) -> u32 {
    (33 * active_member_count).div_ceil(100)
}

/// Resolution mode for a project with `total_members` rows on its roster
/// and `active_member_count` eligible (active, non-affected) voters.
#[must_use]
pub const fn quorum_mode(total_members: u32, active_member_count: u32) -> QuorumMode {
    if total_members <= 1 {
        QuorumMode::NoInProjectPath
    } else {
        QuorumMode::Quorum(required_votes(active_member_count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quorum_matches_one_third_ceiling() {
        assert_eq!(required_votes(2), 1);
        assert_eq!(required_votes(3), 1);
        assert_eq!(required_votes(4), 2);
        assert_eq!(required_votes(5), 2);
        assert_eq!(required_votes(10), 4);
    }

    #[test]
    fn quorum_never_zero_for_nonempty_pool() {
        for n in 1..200 {
            assert!(required_votes(n) >= 1, "n={n}");
        }
    }

    #[test]
    fn solo_project_has_no_in_project_path() {
        assert_eq!(quorum_mode(1, 0), QuorumMode::NoInProjectPath);
        assert_eq!(quorum_mode(1, 1), QuorumMode::NoInProjectPath);
        assert_eq!(quorum_mode(5, 4), QuorumMode::Quorum(2));
    }
}
