//! Required community membership.
//!
//! The bot layer asks the platform for the user's status in every required
//! community and hands the answers here; the decision itself has no I/O.

/// A user's standing in one required community.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipStatus {
    /// Regular member
    Member,
    /// Has admin rights in the community
    Administrator,
    /// Owns the community
    Owner,
    /// Never joined or left
    Left,
    /// Removed or banned
    Kicked,
    /// The platform could not tell
    Unknown,
}

impl MembershipStatus {
    /// Whether this status counts as having joined.
    #[must_use]
    pub const fn is_joined(self) -> bool {
        matches!(self, Self::Member | Self::Administrator | Self::Owner)
    }
}

/// Whether every required community reports a joined status.
///
/// With no required communities everyone passes.
#[must_use]
pub fn all_joined(statuses: &[MembershipStatus]) -> bool {
    statuses.iter().all(|status| status.is_joined())
}
