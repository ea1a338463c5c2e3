#![doc = include_str!("../README.md")]

pub mod api;
pub mod error;
pub mod gate;
pub mod navigation;
pub mod profile_cache;
pub mod role;
pub mod session;
pub mod storage;
pub mod token_store;
pub mod types;

// Re-exports for convenient access
pub use api::{ApiClient, ApiConfig};
pub use error::Error;
pub use gate::{RoleGate, RoleSet};
pub use navigation::{Navigator, Notice, NoopNavigator, Route};
pub use profile_cache::ProfileCache;
pub use role::Role;
pub use session::{FederatedIdentityProvider, GoogleLogin, Session, SessionConfig, SessionManager};
pub use storage::{DurableStorage, FileStorage, MemoryStorage};
pub use token_store::TokenStore;
pub use types::{Credential, FederatedIdentity, ProfileData, UserId, UserProfile};
