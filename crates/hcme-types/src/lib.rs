pub mod conversation;
pub mod error;
pub mod mention;
pub mod message;
pub mod summary;
pub mod tool;
pub mod turn;
pub mod util;

pub use conversation::{Conversation, ConversationStatus, NodeId};
pub use error::{Error, Result};
pub use mention::{is_absolute_path, FileMention, NodeMention, NodeMentionKind};
pub use message::{char_count_of, Message, Role};
pub use summary::{Summary, SummaryContent, SummaryGenerationOutput, SummaryLevel};
pub use tool::{ToolCall, ToolResult};
pub use turn::{Turn, TurnToolCall};
pub use util::truncate;
