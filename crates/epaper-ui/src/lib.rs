//! Flush pipeline between a strip-rendering screen and an SSD1681 e-paper panel.
//!
//! - [`Screen`] keeps the dirty areas and renders them in strips
//! - [`PixelBridge`] repacks strips into panel RAM layout
//! - [`RefreshPolicy`] picks partial or full refresh per flush
//! - [`FlushCoordinator`] drives the panel for each strip
//! - [`EinkSubsystem`] ties them together behind `init`
//!
//! Works on ESP32 and on the host (see [`mock_panel`]).

#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]
#![cfg_attr(
    not(test),
    deny(
        clippy::expect_used,
        clippy::panic,
        clippy::todo,
        clippy::unimplemented,
        clippy::unreachable,
        clippy::unwrap_used
    )
)]

extern crate alloc;

pub mod bridge;
pub mod clock;
pub mod config;
pub mod coordinator;
pub mod eink;
pub mod error;
pub mod framebuffer;
pub mod mock_panel;
pub mod policy;
pub mod screen;
pub mod subsystem;

pub use bridge::{BridgeError, PixelBridge};
pub use clock::Clock;
pub use config::{Config, PinMap, Polarity};
pub use coordinator::FlushCoordinator;
pub use eink::RefreshMode;
pub use error::{ConfigError, Error, RenderError};
pub use framebuffer::FramebufferRegion;
pub use policy::{FullRefreshRequest, RefreshPolicy};
pub use screen::{FlushDone, FlushTarget, RenderSummary, Screen, StripCanvas};
pub use subsystem::EinkSubsystem;
