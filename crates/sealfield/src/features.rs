//! Records of the features that ship with field-level encryption, and the
//! fields each one protects.
//!
//! | Feature      | Record              | Encrypted fields                         |
//! |--------------|---------------------|------------------------------------------|
//! | Tasks        | `TaskRequest`, `Task` | `title`, `notes`                       |
//! | Conversation | `Activity`          | `displayName`, `content`, `files[].displayName` |
//! | Assistant    | `AssistantRequest`  | `query`                                  |
//! | Assistant    | `AssistantResponse` | `messages[].value`                       |
//!
//! Every other field passes through untouched.

pub mod assistant;
pub mod conversation;
pub mod task;

pub use assistant::{AssistantMessage, AssistantRequest, AssistantResponse};
pub use conversation::{Activity, ActivityFile};
pub use task::{Task, TaskRequest};
