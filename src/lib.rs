//! Per-chapter personalization and Urdu translation for a documentation book.
//!
//! A [`ChapterController`] owns one chapter's [`TransformState`] and talks to
//! a [`TransformClient`]. A [`LanguageBroadcaster`] keeps every mounted
//! chapter in line with the page-wide language toggle. [`ChapterView`] is
//! what a rendering host draws.

pub mod auth;
pub mod broadcast;
pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod logger;
pub mod prefs;
pub mod state;
#[cfg(feature = "egui")]
pub mod ui;
pub mod view;

pub use auth::{AuthSession, AuthSnapshot, Credential, CredentialSource};
pub use broadcast::{Language, LanguageBroadcaster, Subscription};
pub use client::{HttpTransformClient, TransformClient};
pub use controller::{ChapterController, Transition};
pub use error::TransformError;
pub use state::{Axis, AxisStatus, TransformState};
pub use view::{ChapterAction, ChapterView};
