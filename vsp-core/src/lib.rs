//! vsp-core: session state for the vsp progressive disclosure engine.
//!
//! This crate owns every mutable byte of interview state:
//!
//! - **Session model** - [`Session`], [`BlockState`], [`Interaction`],
//!   [`Hypothesis`] and the `Active`/`Completed` lifecycle
//! - **Session store** - [`SessionStore`], a concurrent map of sessions with
//!   per-session serialization of mutations
//! - **Discovery events** - [`DiscoveryEvent`] records emitted when an intent
//!   reveals blocks
//! - **Persistence hooks** - [`SessionHooks`], fire-and-forget seams for
//!   external storage
//!
//! Invariants enforced here: revealed blocks never revert, the interaction
//! log is append-only, and a final diagnosis is accepted at most once.

pub mod error;
pub mod events;
pub mod hooks;
pub mod session;
pub mod store;

pub use error::SessionError;
pub use events::{DiscoveryEvent, EventId, TriggerType};
pub use hooks::{NoopHooks, RevealRecord, SessionHooks};
pub use session::{BlockState, Hypothesis, Interaction, Session, SessionId, SessionStatus};
pub use store::{RevealOutcome, SessionStore};
