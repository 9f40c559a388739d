//! Read-only size counters, grounded in the teacher's
//! `cache/in-memory/src/stats.rs`.

use crate::InMemoryCache;

/// A snapshot of how many entries each store currently holds.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct InMemoryCacheStats<'a> {
    cache: &'a InMemoryCache,
}

impl<'a> InMemoryCacheStats<'a> {
    pub(crate) const fn new(cache: &'a InMemoryCache) -> Self {
        Self { cache }
    }

    #[must_use]
    pub fn guilds(&self) -> usize {
        self.cache.guilds.len()
    }

    #[must_use]
    pub fn channels(&self) -> usize {
        self.cache.channels.len()
    }

    #[must_use]
    pub fn users(&self) -> usize {
        self.cache.users.len()
    }

    #[must_use]
    pub fn members(&self) -> usize {
        self.cache.members.len()
    }

    #[must_use]
    pub fn roles(&self) -> usize {
        self.cache.roles.len()
    }

    #[must_use]
    pub fn presences(&self) -> usize {
        self.cache.presences.len()
    }

    #[must_use]
    pub fn voice_states(&self) -> usize {
        self.cache.voice_states.len()
    }

    #[must_use]
    pub fn messages(&self) -> usize {
        self.cache.messages.iter().map(|entry| entry.value().len()).sum()
    }
}
