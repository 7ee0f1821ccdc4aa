pub mod cache;
pub mod config;
pub mod diff;
pub mod dispatch;
pub mod error;
pub mod event_log;
pub mod events;
pub mod holder;
pub mod overlay;
pub mod permission;
pub mod resource;

pub use cache::InMemoryCache;
pub use config::OverlayConfig;
pub use diff::OverlayDiff;
pub use dispatch::{ChangeNotification, Notification, OverlayDispatcher};
pub use error::{OverlayError, Result};
pub use event_log::{ChangeKind, EventLog, OverlayRecord};
pub use events::{EventMetadata, OverlayEvent, OverlayUpdate};
pub use holder::{
    resolve_holder, resolve_permission_holder, HolderLookup, Member, PermissionHolder,
    ResolvedHolder, Role,
};
pub use overlay::{Holder, OverlayMasks, PermissionOverlay};
pub use permission::{decode, encode, Permission, PermissionSet};
pub use resource::{
    AnyResource, Category, Resource, ResourceKind, StoreChannel, TextChannel, VoiceChannel,
};
