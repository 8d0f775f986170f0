//! Sugar Core
//!
//! This crate provides reactive controllers for component hosts together
//! with a portal component built on top of them.
//! It implements:
//!
//! - State cells, memoized computed values and two-phase observers
//! - Event listeners bound to the host lifecycle, optionally conditional
//! - A portal that renders its content under a different document target
//! - A small in-memory document tree and a reference host to drive it all
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: State, computed values, observers and listeners
//! - `host`: The host lifecycle contract and the reference `ComponentHost`
//! - `dom`: Arena-backed document tree and event targets
//! - `timer`: Timeout scheduling, manual and tokio-backed
//! - `portal`: The portal component and its configuration
//! - `registry`: Custom element definitions
//!
//! # Example
//!
//! ```rust,ignore
//! use sugar_core::dom::Document;
//! use sugar_core::portal::{Portal, PortalConfig, PortalVariant};
//! use sugar_core::timer::ManualClock;
//!
//! let document = Document::new();
//! let clock = ManualClock::new();
//! let portal = Portal::new(&document, clock.clone(), PortalVariant::Shadow, PortalConfig::default())?;
//!
//! // Mount the portal somewhere; its container lands under the body.
//! portal.mount(&document.body())?;
//! portal.flush()?;
//!
//! // Disable with a 200ms exit transition.
//! portal.set_disable_delay(Some(200));
//! portal.set_disabled(true);
//! portal.flush()?;
//! assert!(portal.should_render()?);
//!
//! clock.advance(std::time::Duration::from_millis(200));
//! portal.flush()?;
//! assert!(!portal.should_render()?);
//! ```

pub mod dom;
pub mod error;
pub mod host;
pub mod portal;
pub mod reactive;
pub mod registry;
pub mod timer;

pub use error::{Error, Result};
