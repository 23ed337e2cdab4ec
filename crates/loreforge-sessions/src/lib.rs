//! Session orchestration for the Loreforge game backend.
//!
//! One referee, a bounded table, and a join code: this crate owns the
//! rules for who sits down, who leaves, and what the lifecycle allows.
//! Lifecycle changes are announced on the event bus for presence,
//! analytics, and audit subscribers.
//!
//! # Modules
//!
//! - [`service`] -- the [`SessionService`] operations
//! - [`code`] -- join-code issuance from OS entropy
//! - [`error`] -- [`SessionError`]

pub mod code;
pub mod error;
pub mod service;

pub use code::{CODE_LENGTH, generate_join_code, is_valid_code};
pub use error::SessionError;
pub use service::{CreateSessionRequest, SessionService};
