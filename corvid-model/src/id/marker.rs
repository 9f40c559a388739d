//! Marker types denoting what kind of entity an [`Id`] points to.
//!
//! [`Id`]: super::Id

/// Marks an [`Id`] as belonging to an application.
///
/// [`Id`]: super::Id
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct ApplicationMarker;

/// Marks an [`Id`] as belonging to an attachment.
///
/// [`Id`]: super::Id
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct AttachmentMarker;

/// Marks an [`Id`] as belonging to a channel.
///
/// This is a "major parameter" per spec.md §4.3: it participates in the
/// REST route key and in rate-limit bucket identity.
///
/// [`Id`]: super::Id
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct ChannelMarker;

/// Marks an [`Id`] as belonging to an emoji.
///
/// [`Id`]: super::Id
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct EmojiMarker;

/// Marks an [`Id`] as belonging to a guild.
///
/// This is a "major parameter".
///
/// [`Id`]: super::Id
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct GuildMarker;

/// Marks an [`Id`] as belonging to a message.
///
/// [`Id`]: super::Id
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct MessageMarker;

/// Marks an [`Id`] as belonging to a role.
///
/// [`Id`]: super::Id
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct RoleMarker;

/// Marks an [`Id`] as belonging to a user.
///
/// [`Id`]: super::Id
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct UserMarker;

/// Marks an [`Id`] as belonging to a webhook.
///
/// This is a "major parameter".
///
/// [`Id`]: super::Id
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct WebhookMarker;

/// Marks an [`Id`] as belonging to a generic, unspecified entity.
///
/// [`Id`]: super::Id
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct GenericMarker;
