//! Typed aliases of the overlay events for each resource kind.

use super::{OverlayEvent, OverlayUpdate};
use crate::resource::{AnyResource, Category, StoreChannel, TextChannel, VoiceChannel};

pub type CategoryOverlayEvent = OverlayEvent<Category>;
pub type CategoryOverlayUpdate = OverlayUpdate<Category>;

pub type TextChannelOverlayEvent = OverlayEvent<TextChannel>;
pub type TextChannelOverlayUpdate = OverlayUpdate<TextChannel>;

pub type VoiceChannelOverlayEvent = OverlayEvent<VoiceChannel>;
pub type VoiceChannelOverlayUpdate = OverlayUpdate<VoiceChannel>;

pub type StoreChannelOverlayEvent = OverlayEvent<StoreChannel>;
pub type StoreChannelOverlayUpdate = OverlayUpdate<StoreChannel>;

pub type AnyOverlayEvent = OverlayEvent<AnyResource>;
pub type AnyOverlayUpdate = OverlayUpdate<AnyResource>;

impl OverlayEvent<Category> {
    /// The category whose overlay changed
    pub fn category(&self) -> &Category {
        self.resource()
    }
}

impl OverlayUpdate<Category> {
    /// The category whose overlay changed
    pub fn category(&self) -> &Category {
        self.resource()
    }
}

macro_rules! channel_accessor {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl OverlayEvent<$ty> {
                /// The channel whose overlay changed
                pub fn channel(&self) -> &$ty {
                    self.resource()
                }
            }

            impl OverlayUpdate<$ty> {
                /// The channel whose overlay changed
                pub fn channel(&self) -> &$ty {
                    self.resource()
                }
            }
        )+
    };
}

channel_accessor!(TextChannel, VoiceChannel, StoreChannel);
