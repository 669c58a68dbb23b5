//! `TaskHub`: task synchronization core with realtime change notices.
//!
//! Tasks and user profiles live in a [`store::DocumentStore`]; change
//! notices travel over a [`realtime::RealtimeTransport`]; the signed-in
//! actor comes from an [`identity::IdentityGateway`]. All three are
//! injected, and in-memory implementations are provided for tests and the
//! sandbox binary.

pub mod account;
pub mod clock;
pub mod config;
pub mod identity;
pub mod notify;
pub mod presence;
pub mod realtime;
pub mod session;
pub mod store;
pub mod tasks;
