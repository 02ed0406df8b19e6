//! Turn reconstruction, the summarization state machine, and the mention
//! extractor (spec §4.3, §4.5, §4.6, §4.7).

pub mod digest;
pub mod error;
pub mod mentions;
pub mod summarization;
pub mod turn;

pub use digest::{compute_digest, SummaryDigest};
pub use error::{Error, Result};
pub use mentions::{extract_mentions, ExtractedMentions};
pub use summarization::{
    create_l1, create_l2, run_l1_cycle, run_l2_cycle, should_create_l1, should_create_l2,
    L1Candidate, L2Candidate, SummaryExecutor,
};
pub use turn::messages_to_turns;
