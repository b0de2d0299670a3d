//! Per-user dialogue state machine.
//!
//! Owns every in-flight session. Callers only go through
//! [`DialogueManager`], whose operations each run under the user's lock.

pub mod manager;
pub mod prompts;
pub mod session;
pub mod state;

pub use manager::{DialogueManager, Transition};
pub use session::{BufferedFields, DialogueInput, DialogueSession, GENDER_SKIP_TOKEN, SessionTable};
pub use state::{DialogueFlow, DialogueState, ExpectedInput};
