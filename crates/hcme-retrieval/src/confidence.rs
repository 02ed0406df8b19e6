/// Confidence tiers for search hits, kept as adjustable constants rather
/// than hard-coded at each call site so a deployment can retune them
/// without touching retrieval logic.
#[derive(Debug, Clone, Copy)]
pub struct ConfidenceTiers {
    pub l0: f32,
    pub l1: f32,
    pub l2: f32,
    pub code_semantic: f32,
    pub code_grep: f32,
    pub code_brain_search: f32,
}

impl Default for ConfidenceTiers {
    fn default() -> Self {
        Self {
            l0: 1.0,
            l1: 0.7,
            l2: 0.5,
            code_semantic: 1.0,
            code_grep: 0.3,
            code_brain_search: 0.5,
        }
    }
}
