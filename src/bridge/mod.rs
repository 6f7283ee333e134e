//! Chat bridge: maps chat threads to backend sessions and relays results.

pub mod backend;
pub mod chat;
pub mod poller;
pub mod store;

pub use backend::{HttpTaskBackend, TaskBackend, TaskState, TaskStatus};
pub use chat::{strip_mentions, ChatBridge, ChatEvent, ChatSink, ServeSummary, SlackSink};
pub use poller::{PollOutcome, TaskPoller};
pub use store::SessionStore;
