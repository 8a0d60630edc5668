//! # Hearth
//!
//! The client-side integration layer around [`hearth_core`]: configuration,
//! decoded server updates, and the per-frame driver that applies them.
//!
//! ## Example
//!
//! ```rust,ignore
//! use hearth::{ClientConfig, EventChannel, ObjectEvent, TickDriver};
//!
//! let config = ClientConfig::load("client.toml")?;
//! let events = EventChannel::unbounded();
//! let glob = Glob::new(resources, terrain, config.display_settings(), session);
//! let mut driver = TickDriver::new(glob, events.receiver(), config.timing.clone());
//!
//! events.send(ObjectEvent::Create { id: ObjectId(5), position: Coord2d::ZERO })?;
//! let stats = driver.frame(config.timing.sim_period());
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod driver;
pub mod events;

pub use config::{ClientConfig, ConfigError, DisplayConfig, EffectsConfig, TimingConfig};
pub use driver::{FrameStats, TickDriver};
pub use events::{AttrMaker, EventChannel, ObjectEvent};
