//! Capability flag registry.
//!
//! Every [`Permission`] owns a fixed bit offset inside a 64-bit mask. Offsets
//! never change once assigned because raw masks travel outside this crate.
//! Bits that have no registered permission are ignored by [`decode`], so a
//! mask produced by a newer peer still decodes on older code. The flip side
//! is that `encode(&decode(mask))` drops those bits.

use crate::error::{OverlayError, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Decoded permissions, ordered by bit offset.
pub type PermissionSet = BTreeSet<Permission>;

/// A named capability backed by a single bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    CreateInstantInvite,
    KickMembers,
    BanMembers,
    Administrator,
    ManageChannel,
    ManageServer,
    AddReaction,
    ViewAuditLogs,
    PrioritySpeaker,
    Stream,
    ViewChannel,
    SendMessages,
    SendTtsMessages,
    ManageMessages,
    EmbedLinks,
    AttachFiles,
    ReadMessageHistory,
    MentionEveryone,
    UseExternalEmojis,
    ViewGuildInsights,
    Connect,
    Speak,
    MuteMembers,
    DeafenMembers,
    MoveMembers,
    UseVoiceActivity,
    ChangeNickname,
    ManageNicknames,
    ManageRoles,
    ManageWebhooks,
    ManageEmojis,
}

/// Static description of a permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionInfo {
    pub offset: u8,
    pub identifier: &'static str,
    pub name: &'static str,
    pub guild: bool,
    pub channel: bool,
}

impl PermissionInfo {
    const fn new(
        offset: u8,
        identifier: &'static str,
        name: &'static str,
        guild: bool,
        channel: bool,
    ) -> Self {
        Self {
            offset,
            identifier,
            name,
            guild,
            channel,
        }
    }
}

impl Permission {
    /// Every registered permission in offset order.
    pub const ALL: [Permission; 31] = [
        Permission::CreateInstantInvite,
        Permission::KickMembers,
        Permission::BanMembers,
        Permission::Administrator,
        Permission::ManageChannel,
        Permission::ManageServer,
        Permission::AddReaction,
        Permission::ViewAuditLogs,
        Permission::PrioritySpeaker,
        Permission::Stream,
        Permission::ViewChannel,
        Permission::SendMessages,
        Permission::SendTtsMessages,
        Permission::ManageMessages,
        Permission::EmbedLinks,
        Permission::AttachFiles,
        Permission::ReadMessageHistory,
        Permission::MentionEveryone,
        Permission::UseExternalEmojis,
        Permission::ViewGuildInsights,
        Permission::Connect,
        Permission::Speak,
        Permission::MuteMembers,
        Permission::DeafenMembers,
        Permission::MoveMembers,
        Permission::UseVoiceActivity,
        Permission::ChangeNickname,
        Permission::ManageNicknames,
        Permission::ManageRoles,
        Permission::ManageWebhooks,
        Permission::ManageEmojis,
    ];

    pub const fn info(self) -> PermissionInfo {
        use Permission::*;
        match self {
            CreateInstantInvite => {
                PermissionInfo::new(0, "CREATE_INSTANT_INVITE", "Create Instant Invite", true, true)
            }
            KickMembers => PermissionInfo::new(1, "KICK_MEMBERS", "Kick Members", true, false),
            BanMembers => PermissionInfo::new(2, "BAN_MEMBERS", "Ban Members", true, false),
            Administrator => PermissionInfo::new(3, "ADMINISTRATOR", "Administrator", true, false),
            ManageChannel => {
                PermissionInfo::new(4, "MANAGE_CHANNEL", "Manage Channels", true, true)
            }
            ManageServer => PermissionInfo::new(5, "MANAGE_SERVER", "Manage Server", true, false),
            AddReaction => PermissionInfo::new(6, "ADD_REACTION", "Add Reactions", true, true),
            ViewAuditLogs => {
                PermissionInfo::new(7, "VIEW_AUDIT_LOGS", "View Audit Logs", true, false)
            }
            PrioritySpeaker => {
                PermissionInfo::new(8, "PRIORITY_SPEAKER", "Priority Speaker", true, true)
            }
            Stream => PermissionInfo::new(9, "STREAM", "Video", true, true),
            ViewChannel => PermissionInfo::new(
                10,
                "VIEW_CHANNEL",
                "Read Text Channels & See Voice Channels",
                true,
                true,
            ),
            SendMessages => PermissionInfo::new(11, "SEND_MESSAGES", "Send Messages", true, true),
            SendTtsMessages => {
                PermissionInfo::new(12, "SEND_TTS_MESSAGES", "Send TTS Messages", true, true)
            }
            ManageMessages => {
                PermissionInfo::new(13, "MANAGE_MESSAGES", "Manage Messages", true, true)
            }
            EmbedLinks => PermissionInfo::new(14, "EMBED_LINKS", "Embed Links", true, true),
            AttachFiles => PermissionInfo::new(15, "ATTACH_FILES", "Attach Files", true, true),
            ReadMessageHistory => {
                PermissionInfo::new(16, "READ_MESSAGE_HISTORY", "Read History", true, true)
            }
            MentionEveryone => {
                PermissionInfo::new(17, "MENTION_EVERYONE", "Mention Everyone", true, true)
            }
            UseExternalEmojis => {
                PermissionInfo::new(18, "USE_EXTERNAL_EMOJIS", "Use External Emojis", true, true)
            }
            ViewGuildInsights => {
                PermissionInfo::new(19, "VIEW_GUILD_INSIGHTS", "View Server Insights", true, false)
            }
            Connect => PermissionInfo::new(20, "CONNECT", "Connect", true, true),
            Speak => PermissionInfo::new(21, "SPEAK", "Speak", true, true),
            MuteMembers => PermissionInfo::new(22, "MUTE_MEMBERS", "Mute Members", true, true),
            DeafenMembers => {
                PermissionInfo::new(23, "DEAFEN_MEMBERS", "Deafen Members", true, true)
            }
            MoveMembers => PermissionInfo::new(24, "MOVE_MEMBERS", "Move Members", true, true),
            UseVoiceActivity => {
                PermissionInfo::new(25, "USE_VOICE_ACTIVITY", "Use Voice Activity", true, true)
            }
            ChangeNickname => {
                PermissionInfo::new(26, "CHANGE_NICKNAME", "Change Nickname", true, false)
            }
            ManageNicknames => {
                PermissionInfo::new(27, "MANAGE_NICKNAMES", "Manage Nicknames", true, false)
            }
            ManageRoles => PermissionInfo::new(28, "MANAGE_ROLES", "Manage Roles", true, true),
            ManageWebhooks => {
                PermissionInfo::new(29, "MANAGE_WEBHOOKS", "Manage Webhooks", true, true)
            }
            ManageEmojis => PermissionInfo::new(30, "MANAGE_EMOJIS", "Manage Emojis", true, false),
        }
    }

    /// Bit offset inside a permission mask.
    pub const fn offset(self) -> u8 {
        self.info().offset
    }

    /// The single-bit mask for this permission.
    pub const fn raw(self) -> u64 {
        1u64 << self.offset()
    }

    /// Human readable name.
    pub const fn name(self) -> &'static str {
        self.info().name
    }

    /// Upper snake case identifier, the serialized form.
    pub const fn identifier(self) -> &'static str {
        self.info().identifier
    }

    pub const fn is_guild(self) -> bool {
        self.info().guild
    }

    pub const fn is_channel(self) -> bool {
        self.info().channel
    }

    /// Look up the permission registered at `offset`.
    pub fn from_offset(offset: u8) -> Option<Permission> {
        Self::ALL.iter().copied().find(|p| p.offset() == offset)
    }

    /// Whether this permission's bit is set in `mask`.
    pub const fn is_set_in(self, mask: u64) -> bool {
        mask & self.raw() != 0
    }
}

const fn union_where(channel_only: bool) -> u64 {
    let mut mask = 0u64;
    let mut i = 0;
    while i < Permission::ALL.len() {
        let permission = Permission::ALL[i];
        if !channel_only || permission.is_channel() {
            mask |= permission.raw();
        }
        i += 1;
    }
    mask
}

// Offsets must be unique and inside the 64-bit domain.
const _: () = {
    let mut seen = 0u64;
    let mut i = 0;
    while i < Permission::ALL.len() {
        let permission = Permission::ALL[i];
        assert!(permission.offset() < 64, "permission offset out of range");
        assert!(seen & permission.raw() == 0, "duplicate permission offset");
        seen |= permission.raw();
        i += 1;
    }
};

/// Every registered bit.
pub const ALL_PERMISSIONS: u64 = union_where(false);

/// Every bit that can appear in a channel overlay.
pub const ALL_CHANNEL_PERMISSIONS: u64 = union_where(true);

pub const ALL_TEXT_PERMISSIONS: u64 = Permission::AddReaction.raw()
    | Permission::SendMessages.raw()
    | Permission::SendTtsMessages.raw()
    | Permission::ManageMessages.raw()
    | Permission::EmbedLinks.raw()
    | Permission::AttachFiles.raw()
    | Permission::ReadMessageHistory.raw()
    | Permission::MentionEveryone.raw()
    | Permission::UseExternalEmojis.raw();

pub const ALL_VOICE_PERMISSIONS: u64 = Permission::Stream.raw()
    | Permission::Connect.raw()
    | Permission::Speak.raw()
    | Permission::MuteMembers.raw()
    | Permission::DeafenMembers.raw()
    | Permission::MoveMembers.raw()
    | Permission::UseVoiceActivity.raw()
    | Permission::PrioritySpeaker.raw();

/// Decode a raw mask into the registered permissions whose bits are set.
pub fn decode(mask: u64) -> PermissionSet {
    Permission::ALL
        .iter()
        .copied()
        .filter(|p| p.is_set_in(mask))
        .collect()
}

/// OR together the bits of `permissions`.
pub fn encode<I>(permissions: I) -> u64
where
    I: IntoIterator,
    I::Item: Borrow<Permission>,
{
    permissions
        .into_iter()
        .fold(0, |mask, p| mask | p.borrow().raw())
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Permission {
    type Err = OverlayError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().replace(['-', ' '], "_");
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.identifier().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| OverlayError::UnknownPermission(s.to_string()))
    }
}
