/// Context Builder budget partition (spec §4.10, §6's `Config` record,
/// extended with the two percentages named only in §4.10's table).
#[derive(Debug, Clone)]
pub struct Config {
    pub max_context_chars: usize,
    pub l1_threshold_percent: u8,
    pub l2_threshold_percent: u8,
    pub last_user_queries_percent: u8,
    pub recent_turns_percent: u8,
    pub recent_l1_summaries_percent: u8,
    pub code_search_percent: u8,
    pub code_search_initial_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_context_chars: 100_000,
            l1_threshold_percent: 10,
            l2_threshold_percent: 10,
            last_user_queries_percent: 5,
            recent_turns_percent: 5,
            recent_l1_summaries_percent: 10,
            code_search_percent: 10,
            code_search_initial_limit: 100,
        }
    }
}

impl Config {
    /// `share_chars(percent) = max_context_chars * percent / 100` (spec
    /// §4.10's per-source budget partition).
    pub fn share_chars(&self, percent: u8) -> usize {
        self.max_context_chars * percent as usize / 100
    }

    pub fn last_user_queries_budget(&self) -> usize {
        self.share_chars(self.last_user_queries_percent)
    }

    pub fn recent_turns_budget(&self) -> usize {
        self.share_chars(self.recent_turns_percent)
    }

    pub fn recent_l1_summaries_budget(&self) -> usize {
        self.share_chars(self.recent_l1_summaries_percent)
    }

    pub fn code_search_budget(&self) -> usize {
        self.share_chars(self.code_search_percent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn share_chars_computes_percentage_of_total() {
        let config = Config {
            max_context_chars: 1000,
            ..Default::default()
        };
        assert_eq!(config.recent_turns_budget(), 50);
        assert_eq!(config.last_user_queries_budget(), 50);
        assert_eq!(config.recent_l1_summaries_budget(), 100);
        assert_eq!(config.code_search_budget(), 100);
    }
}
