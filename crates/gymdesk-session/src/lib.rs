//! GymDesk Session Layer
//!
//! Token-based session lifecycle for the gym backend client:
//! - Credential persistence (file-backed or in-memory)
//! - Unverified bearer token decoding into claims
//! - Session state machine with reactive subscription and scheduled expiry
//! - View navigation and the protected-view guard

pub mod clock;
pub mod codec;
pub mod guard;
pub mod manager;
pub mod navigation;
pub mod scheduler;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::{Claims, Role, decode};
pub use guard::{GuardDecision, NavigationGuard};
pub use manager::{
    LogoutReason, SessionEvent, SessionManager, SessionState, TokenGrant, TokenIssuer,
};
pub use navigation::{Navigator, View, ViewRouter};
pub use scheduler::ExpiryScheduler;
pub use store::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
