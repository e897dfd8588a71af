//! Client library for provisioning access-control state against the
//! platform REST API.
//!
//! The crate is organized around five components:
//!
//! - [`session`]: authenticated connection plus the privilege-elevated
//!   storage sub-session used for library access controls.
//! - [`directory`] / [`folders`]: typed operations on principals
//!   (users/groups) and content folders.
//! - [`rules`]: idempotent assertion of authorization rules.
//! - [`acl`]: the transactional replace/remove protocol for storage
//!   library access controls.
//! - [`reconcile`]: desired-vs-current group graph diffing and apply.
//!
//! All remote state lives on the platform; the types here are transient
//! in-memory projections built per run and discarded at process end.

pub mod acl;
pub mod auth;
pub mod client;
pub mod config;
pub mod directory;
pub mod error;
pub mod folders;
pub mod input;
pub mod reconcile;
pub mod rules;
pub mod session;

pub use client::{Collection, PlatformClient};
pub use config::Settings;
pub use error::{ClientError, ClientResult};
pub use session::Session;
