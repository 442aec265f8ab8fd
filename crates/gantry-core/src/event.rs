//! Ambient invocation context.
//!
//! Converters that do not read message text (the "non-command" converters)
//! pull their values from an [`Ambient`] implementation instead. The
//! framework never inspects a platform event directly; it only asks for
//! values by [`AmbientKind`].

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::ids::{ChannelId, GuildId, UserId};
use crate::value::Value;

/// The kinds of value an ambient context can provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AmbientKind {
    /// The invoking user.
    User,
    /// The channel the message was sent in.
    Channel,
    /// The guild the message was sent in, if any.
    Guild,
    /// The raw triggering event.
    Event,
    /// Whether the author is a bot account.
    BotAuthor,
    /// The full message content.
    Content,
}

impl fmt::Display for AmbientKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::User => "user",
            Self::Channel => "channel",
            Self::Guild => "guild",
            Self::Event => "event",
            Self::BotAuthor => "bot flag",
            Self::Content => "message content",
        })
    }
}

/// Accessor for invocation-time data, implemented by the calling application.
pub trait Ambient: Send + Sync {
    /// Returns the value of the given kind, or `None` when unavailable.
    fn get_ambient(&self, kind: AmbientKind) -> Option<Value>;

    fn user_id(&self) -> Option<UserId> {
        match self.get_ambient(AmbientKind::User) {
            Some(Value::User(id)) => Some(id),
            _ => None,
        }
    }

    fn channel_id(&self) -> Option<ChannelId> {
        match self.get_ambient(AmbientKind::Channel) {
            Some(Value::Channel(id)) => Some(id),
            _ => None,
        }
    }

    fn guild_id(&self) -> Option<GuildId> {
        match self.get_ambient(AmbientKind::Guild) {
            Some(Value::Guild(id)) => Some(id),
            _ => None,
        }
    }

    fn is_bot_author(&self) -> bool {
        matches!(self.get_ambient(AmbientKind::BotAuthor), Some(Value::Bool(true)))
    }
}

/// A platform-neutral inbound chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEvent {
    pub author: UserId,
    #[serde(default)]
    pub author_name: String,
    #[serde(default)]
    pub author_is_bot: bool,
    pub channel: ChannelId,
    #[serde(default)]
    pub guild: Option<GuildId>,
    pub content: String,
}

impl MessageEvent {
    /// Creates a private message event.
    pub fn new(author: UserId, channel: ChannelId, content: impl Into<String>) -> Self {
        Self {
            author,
            author_name: String::new(),
            author_is_bot: false,
            channel,
            guild: None,
            content: content.into(),
        }
    }

    /// Places the message inside a guild.
    pub fn in_guild(mut self, guild: GuildId) -> Self {
        self.guild = Some(guild);
        self
    }

    pub fn with_author_name(mut self, name: impl Into<String>) -> Self {
        self.author_name = name.into();
        self
    }

    /// Marks the author as a bot account.
    pub fn from_bot(mut self) -> Self {
        self.author_is_bot = true;
        self
    }

    pub fn is_private(&self) -> bool {
        self.guild.is_none()
    }
}

impl Ambient for MessageEvent {
    fn get_ambient(&self, kind: AmbientKind) -> Option<Value> {
        match kind {
            AmbientKind::User => Some(Value::User(self.author)),
            AmbientKind::Channel => Some(Value::Channel(self.channel)),
            AmbientKind::Guild => self.guild.map(Value::Guild),
            AmbientKind::Event => Some(Value::Event(Arc::new(self.clone()))),
            AmbientKind::BotAuthor => Some(Value::Bool(self.author_is_bot)),
            AmbientKind::Content => Some(Value::Text(self.content.clone())),
        }
    }
}

impl<T: Ambient + ?Sized> Ambient for Arc<T> {
    fn get_ambient(&self, kind: AmbientKind) -> Option<Value> {
        (**self).get_ambient(kind)
    }
}

/// An ambient context that provides nothing.
///
/// Used when parsing default values at registration time.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyAmbient;

impl Ambient for EmptyAmbient {
    fn get_ambient(&self, _kind: AmbientKind) -> Option<Value> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_event_ambient() {
        let event = MessageEvent::new(UserId(7), ChannelId(3), "!ping").in_guild(GuildId(1));

        assert_eq!(event.user_id(), Some(UserId(7)));
        assert_eq!(event.channel_id(), Some(ChannelId(3)));
        assert_eq!(event.guild_id(), Some(GuildId(1)));
        assert!(!event.is_bot_author());
        assert_eq!(
            event.get_ambient(AmbientKind::Content),
            Some(Value::Text("!ping".into()))
        );
    }

    #[test]
    fn test_private_message_has_no_guild() {
        let event = MessageEvent::new(UserId(7), ChannelId(3), "hi");
        assert!(event.is_private());
        assert_eq!(event.guild_id(), None);
    }

    #[test]
    fn test_event_from_json() {
        let event: MessageEvent = serde_json::from_str(
            r#"{"author": 5, "channel": 9, "guild": 2, "content": "!add 1 2", "author_is_bot": true}"#,
        )
        .unwrap();
        assert_eq!(event.guild, Some(GuildId(2)));
        assert!(event.is_bot_author());
        assert_eq!(event.author_name, "");
    }

    #[test]
    fn test_empty_ambient() {
        assert_eq!(EmptyAmbient.user_id(), None);
        assert_eq!(EmptyAmbient.get_ambient(AmbientKind::Event), None);
    }
}
