//! Resources that carry permission overlays.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Category,
    Text,
    Voice,
    Store,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Category => write!(f, "category"),
            Self::Text => write!(f, "text channel"),
            Self::Voice => write!(f, "voice channel"),
            Self::Store => write!(f, "store channel"),
        }
    }
}

/// A channel or category overlays can be attached to.
pub trait Resource: fmt::Debug {
    fn id(&self) -> Uuid;

    fn name(&self) -> &str;

    fn kind(&self) -> ResourceKind;

    /// The category this resource sits in, if any.
    fn parent_id(&self) -> Option<Uuid> {
        None
    }
}

impl<R: Resource + ?Sized> Resource for Arc<R> {
    fn id(&self) -> Uuid {
        (**self).id()
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn kind(&self) -> ResourceKind {
        (**self).kind()
    }

    fn parent_id(&self) -> Option<Uuid> {
        (**self).parent_id()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub position: i32,
}

impl Category {
    pub fn new(id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            position: 0,
        }
    }
}

impl Resource for Category {
    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::Category
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChannel {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    pub topic: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceChannel {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    #[serde(default = "default_bitrate")]
    pub bitrate: u32,
}

fn default_bitrate() -> u32 {
    64_000
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreChannel {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
}

macro_rules! channel_resource {
    ($ty:ident, $kind:expr) => {
        impl $ty {
            /// Create a channel outside any category
            pub fn new(id: Uuid, name: impl Into<String>) -> Self {
                Self {
                    id,
                    name: name.into(),
                    ..Default::default()
                }
            }

            pub fn in_category(mut self, category_id: Uuid) -> Self {
                self.parent_id = Some(category_id);
                self
            }
        }

        impl Resource for $ty {
            fn id(&self) -> Uuid {
                self.id
            }

            fn name(&self) -> &str {
                &self.name
            }

            fn kind(&self) -> ResourceKind {
                $kind
            }

            fn parent_id(&self) -> Option<Uuid> {
                self.parent_id
            }
        }
    };
}

impl Default for TextChannel {
    fn default() -> Self {
        Self {
            id: Uuid::nil(),
            name: String::new(),
            parent_id: None,
            topic: None,
        }
    }
}

impl Default for VoiceChannel {
    fn default() -> Self {
        Self {
            id: Uuid::nil(),
            name: String::new(),
            parent_id: None,
            bitrate: default_bitrate(),
        }
    }
}

impl Default for StoreChannel {
    fn default() -> Self {
        Self {
            id: Uuid::nil(),
            name: String::new(),
            parent_id: None,
        }
    }
}

channel_resource!(TextChannel, ResourceKind::Text);
channel_resource!(VoiceChannel, ResourceKind::Voice);
channel_resource!(StoreChannel, ResourceKind::Store);

/// Any resource kind, for callers that handle them uniformly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnyResource {
    Category(Category),
    Text(TextChannel),
    Voice(VoiceChannel),
    Store(StoreChannel),
}

impl AnyResource {
    fn inner(&self) -> &dyn Resource {
        match self {
            AnyResource::Category(category) => category,
            AnyResource::Text(channel) => channel,
            AnyResource::Voice(channel) => channel,
            AnyResource::Store(channel) => channel,
        }
    }
}

impl Resource for AnyResource {
    fn id(&self) -> Uuid {
        self.inner().id()
    }

    fn name(&self) -> &str {
        self.inner().name()
    }

    fn kind(&self) -> ResourceKind {
        self.inner().kind()
    }

    fn parent_id(&self) -> Option<Uuid> {
        self.inner().parent_id()
    }
}

impl From<Category> for AnyResource {
    fn from(category: Category) -> Self {
        AnyResource::Category(category)
    }
}

impl From<TextChannel> for AnyResource {
    fn from(channel: TextChannel) -> Self {
        AnyResource::Text(channel)
    }
}

impl From<VoiceChannel> for AnyResource {
    fn from(channel: VoiceChannel) -> Self {
        AnyResource::Voice(channel)
    }
}

impl From<StoreChannel> for AnyResource {
    fn from(channel: StoreChannel) -> Self {
        AnyResource::Store(channel)
    }
}
