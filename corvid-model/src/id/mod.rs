//! Discord snowflake identifiers.
//!
//! Every entity on Discord is addressed by a 64-bit snowflake: a timestamp
//! in the high bits, an internal worker/process/increment in the low bits.
//! [`Id<T>`] is a single generic new-type tagged by a zero-sized marker (see
//! [`marker`]) rather than one struct per entity, matching the approach the
//! teacher repo settled on.

pub mod marker;

use marker::GenericMarker;
use std::{
    fmt::{Debug, Display, Formatter, Result as FmtResult},
    hash::{Hash, Hasher},
    marker::PhantomData,
    num::NonZeroU64,
    str::FromStr,
};

/// First second of 2015, in milliseconds, per Discord's documented epoch.
///
/// `timestamp = (id >> 22) + DISCORD_EPOCH`.
pub const DISCORD_EPOCH: u64 = 1_420_070_400_000;

/// A Discord snowflake, generic over what kind of entity it identifies.
///
/// IDs are sent over the wire as JSON strings (a `u64` would lose precision
/// in a JS `Number`), so [`Id`] (de)serializes as a string but stores a
/// [`NonZeroU64`] for cheap comparisons and to make `Id::new(0)` a
/// programmer error instead of a silent footgun.
pub struct Id<T> {
    value: NonZeroU64,
    phantom: PhantomData<fn() -> T>,
}

impl<T> Id<T> {
    /// Create an ID from an already-nonzero value.
    ///
    /// # Panics
    ///
    /// Panics if `n` is zero.
    #[must_use]
    pub const fn new(n: u64) -> Self {
        match NonZeroU64::new(n) {
            Some(value) => Self {
                value,
                phantom: PhantomData,
            },
            None => panic!("id must be non-zero"),
        }
    }

    /// Create an ID from a checked-nonzero value, returning `None` if `n` is
    /// zero.
    #[must_use]
    pub const fn new_checked(n: u64) -> Option<Self> {
        match NonZeroU64::new(n) {
            Some(value) => Some(Self {
                value,
                phantom: PhantomData,
            }),
            None => None,
        }
    }

    /// The ID's raw `u64` value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.value.get()
    }

    /// The timestamp the ID was generated at, as Unix milliseconds.
    #[must_use]
    pub const fn timestamp(self) -> u64 {
        (self.value.get() >> 22) + DISCORD_EPOCH
    }

    /// The internal worker ID, bits 17-21.
    #[must_use]
    pub const fn worker_id(self) -> u8 {
        ((self.value.get() & 0x003E_0000) >> 17) as u8
    }

    /// The internal process ID, bits 12-16.
    #[must_use]
    pub const fn process_id(self) -> u8 {
        ((self.value.get() & 0x0001_F000) >> 12) as u8
    }

    /// The increment of this ID within its process' millisecond, bits 0-11.
    #[must_use]
    pub const fn increment(self) -> u16 {
        (self.value.get() & 0x0000_0FFF) as u16
    }

    /// Cast this ID to a differently-marked ID of the same value.
    ///
    /// Discord reuses the same snowflake across marker boundaries (a guild's
    /// `@everyone` role ID equals the guild's own ID, a DM channel's
    /// recipient can be looked up via a user ID, etc.), so this is a common,
    /// legitimate operation rather than a type-safety hole.
    #[must_use]
    pub const fn cast<New>(self) -> Id<New> {
        Id {
            value: self.value,
            phantom: PhantomData,
        }
    }
}

impl Id<GenericMarker> {
    /// Cast an untyped ID read straight off the wire into a marked one.
    #[must_use]
    pub const fn into_marked<T>(self) -> Id<T> {
        self.cast()
    }
}

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Id<T> {}

impl<T> Debug for Id<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        Debug::fmt(&self.value, f)
    }
}

impl<T> Display for Id<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        Display::fmt(&self.value, f)
    }
}

impl<T> Eq for Id<T> {}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T> PartialOrd for Id<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Id<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.value.cmp(&other.value)
    }
}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<T> From<NonZeroU64> for Id<T> {
    fn from(value: NonZeroU64) -> Self {
        Self {
            value,
            phantom: PhantomData,
        }
    }
}

impl<T> FromStr for Id<T> {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.parse::<NonZeroU64>()?;

        Ok(Self::from(value))
    }
}

mod serde_impl {
    use super::Id;
    use serde::{
        de::{Deserialize, Deserializer, Error as DeError, Visitor},
        ser::{Serialize, Serializer},
    };
    use std::{
        fmt::{Formatter, Result as FmtResult},
        marker::PhantomData,
    };

    struct IdVisitor<T> {
        phantom: PhantomData<fn() -> T>,
    }

    impl<'de, T> Visitor<'de> for IdVisitor<T> {
        type Value = Id<T>;

        fn expecting(&self, formatter: &mut Formatter<'_>) -> FmtResult {
            formatter.write_str("a non-zero Discord snowflake, as a string or integer")
        }

        fn visit_u64<E: DeError>(self, value: u64) -> Result<Self::Value, E> {
            Id::new_checked(value).ok_or_else(|| DeError::custom("id must be non-zero"))
        }

        fn visit_i64<E: DeError>(self, value: i64) -> Result<Self::Value, E> {
            self.visit_u64(value as u64)
        }

        fn visit_str<E: DeError>(self, value: &str) -> Result<Self::Value, E> {
            value.parse().map_err(DeError::custom)
        }
    }

    impl<'de, T> Deserialize<'de> for Id<T> {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            deserializer.deserialize_any(IdVisitor {
                phantom: PhantomData,
            })
        }
    }

    impl<T> Serialize for Id<T> {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.collect_str(&self.value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{marker::GuildMarker, Id};

    #[test]
    fn timestamp_round_trips_discord_epoch() {
        // First snowflake ever minted: timestamp bits all zero.
        let id = Id::<GuildMarker>::new(1 << 22);
        assert_eq!(id.timestamp(), super::DISCORD_EPOCH);
    }

    #[test]
    fn decodes_worker_process_increment() {
        let raw = (7u64 << 22) + (13 << 17) + (5 << 12) + 42;
        let id = Id::<GuildMarker>::new(raw);

        assert_eq!(id.worker_id(), 13);
        assert_eq!(id.process_id(), 5);
        assert_eq!(id.increment(), 42);
    }

    #[test]
    fn serde_round_trip_is_identity() {
        let id = Id::<GuildMarker>::new(175_928_847_299_117_063);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"175928847299117063\"");

        let decoded: Id<GuildMarker> = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, id);
    }

    #[test]
    fn accepts_bare_integers_too() {
        let decoded: Id<GuildMarker> = serde_json::from_str("175928847299117063").unwrap();
        assert_eq!(decoded.get(), 175_928_847_299_117_063);
    }

    #[test]
    #[should_panic(expected = "id must be non-zero")]
    fn new_panics_on_zero() {
        let _ = Id::<GuildMarker>::new(0);
    }
}
