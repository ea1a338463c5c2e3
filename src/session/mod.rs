//! Session lifecycle for the DisasterConnect client.
//!
//! One [`SessionManager`] per process owns the bearer token, the cached
//! profile and the session state machine. UI code reads projections of it
//! ([`SessionManager::session`], [`SessionManager::subscribe`]) and gates
//! views with [`RoleGate`](crate::RoleGate).
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use disasterconnect_auth::{FileStorage, NoopNavigator, SessionConfig, SessionManager};
//!
//! let config = SessionConfig::from_env()?;
//! let storage = Arc::new(FileStorage::open("session.json")?);
//! let manager = SessionManager::new(config, storage, Arc::new(NoopNavigator));
//!
//! // Block protected rendering on this.
//! let session = manager.restore_session().await;
//! ```

mod config;
mod manager;
mod state;
mod traits;

pub use config::SessionConfig;
pub use manager::SessionManager;
pub use state::{GoogleLogin, Session};
pub use traits::FederatedIdentityProvider;
