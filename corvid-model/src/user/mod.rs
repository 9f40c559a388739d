//! User records.

use crate::id::{marker::UserMarker, Id};
use serde::{Deserialize, Serialize};

/// A Discord user.
///
/// Mirrors the subset of fields the cache and gateway dispatch handlers
/// actually consume; the full user object (banner, accent color, etc.) is
/// out of scope per spec.md §1 (domain object wrappers).
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct User {
    pub id: Id<UserMarker>,
    pub username: String,
    /// Four-digit discriminator tag, or `"0"` for users migrated to the new
    /// unique-username system.
    pub discriminator: String,
    pub avatar: Option<String>,
    #[serde(default)]
    pub bot: bool,
    #[serde(default)]
    pub system: bool,
    pub public_flags: Option<u64>,
}

impl User {
    /// Whether this user has migrated off the legacy discriminator system.
    #[must_use]
    pub fn has_legacy_discriminator(&self) -> bool {
        self.discriminator != "0"
    }

    /// Index into Discord's five (legacy) or six (new) default avatar
    /// images.
    ///
    /// spec.md §9's open question on default-avatar indexing is resolved in
    /// SPEC_FULL.md: both branches are implemented, selected by
    /// `legacy_discriminator`.
    #[must_use]
    pub fn default_avatar_index(&self, legacy_discriminator: bool) -> u64 {
        if legacy_discriminator && self.has_legacy_discriminator() {
            self.discriminator.parse::<u64>().unwrap_or(0) % 5
        } else {
            (self.id.get() >> 22) % 6
        }
    }
}

/// A guild member: a [`User`] plus guild-scoped metadata.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Member {
    pub user: Option<User>,
    pub nick: Option<String>,
    pub roles: Vec<Id<crate::id::marker::RoleMarker>>,
    pub joined_at: Option<String>,
    #[serde(default)]
    pub deaf: bool,
    #[serde(default)]
    pub mute: bool,
    #[serde(default)]
    pub pending: bool,
}
