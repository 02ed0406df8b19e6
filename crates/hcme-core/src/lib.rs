pub mod identity;

pub use identity::{
    derive_uuid, file_id, message_id, random_uuid, summary_id, tool_call_id, tool_result_id,
};
