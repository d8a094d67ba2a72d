//! Chat module for TownChat
//!
//! Session ids, session to thread resolution, turn logging, per-session
//! serialization and the chat façade built on top of them.

pub mod locks;
pub mod log_writer;
pub mod registry;
pub mod service;
pub mod session;

pub use locks::{SessionGuard, SessionLocks};
pub use log_writer::{ChatLogWriter, ChatTurn, LogOutcome};
pub use registry::{ThreadLookup, ThreadRegistry};
pub use service::{ChatOptions, ChatReply, ChatService};
pub use session::{generate_session_id, is_session_id};
