//! Model conversation feed and on-demand translation of its summaries.

pub mod feed;
pub mod translate;

pub use feed::{Conversation, ConversationFeed, ModelFilter};
pub use translate::{ChatCompletionClient, TranslationBook, Translator};
