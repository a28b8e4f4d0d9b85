pub mod storage;
pub mod types;

pub use storage::ConversationLog;
pub use types::{ContentType, Message, MessageMetadata, NewMessage, Sender};
