//! 记忆层：LLM 消息与会话存储

pub mod conversation;
pub mod message;

pub use conversation::{
    new_conversation_id, Conversation, ConversationHistory, ConversationStore, TurnRecord,
};
pub use message::{Message, Role};
