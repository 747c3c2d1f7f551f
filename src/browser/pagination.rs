/// Tuning of the automatic next-page loading
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PaginationPolicy {
    /// How close (in rows) the cursor must be to the end of the list to trigger a load
    pub prefetch_window: usize,
    /// Minimum matches for a text filter before automatic loading is suppressed
    pub min_filtered: usize,
}

impl Default for PaginationPolicy {
    fn default() -> Self {
        Self {
            prefetch_window: 10,
            min_filtered: 10,
        }
    }
}

/// Pagination state of a browsing surface
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PaginationState {
    /// Opaque continuation token of the next page
    pub next_token: Option<String>,
    pub has_more: bool,
    /// Guard preventing duplicate requests while a page is in flight
    pub is_loading_more: bool,
}

impl PaginationState {
    /// Builds the state after the first page was received
    pub fn from_token(next_token: Option<String>) -> Self {
        Self {
            has_more: next_token.is_some(),
            next_token,
            is_loading_more: false,
        }
    }

    /// Whether the cursor position should trigger loading the next page.
    ///
    /// Automatic loading is suppressed while a text filter has fewer than [`PaginationPolicy::min_filtered`] matches,
    /// so a selective search doesn't drain every page on its own.
    pub fn should_load(
        &self,
        policy: &PaginationPolicy,
        cursor: usize,
        visible: usize,
        text_filter_active: bool,
    ) -> bool {
        if !self.has_more || self.is_loading_more {
            return false;
        }
        if text_filter_active && visible < policy.min_filtered {
            return false;
        }
        cursor + policy.prefetch_window >= visible
    }

    /// Whether a manual request for more should be honored, ignoring the text filter suppression
    pub fn can_load(&self) -> bool {
        self.has_more && !self.is_loading_more
    }

    /// Marks a page as in flight, returning the token to request it with.
    ///
    /// Returns `None` when there's nothing to load or a page is already in flight.
    pub fn begin(&mut self) -> Option<Option<String>> {
        if !self.can_load() {
            return None;
        }
        self.is_loading_more = true;
        Some(self.next_token.clone())
    }

    /// Records a received page
    pub fn complete(&mut self, next_token: Option<String>) {
        self.has_more = next_token.is_some();
        self.next_token = next_token;
        self.is_loading_more = false;
    }

    /// Forgets the page in flight, whose result will be discarded, so the next one can be requested
    pub fn abort(&mut self) {
        self.is_loading_more = false;
    }

    /// Records a failed page, which stops any further loading
    pub fn fail(&mut self) {
        self.has_more = false;
        self.is_loading_more = false;
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn more() -> PaginationState {
        PaginationState::from_token(Some(String::from("t1")))
    }

    #[test]
    fn test_abort_releases_guard() {
        let mut state = more();
        assert_eq!(state.begin(), Some(Some(String::from("t1"))));
        assert!(!state.can_load());
        state.abort();
        assert!(state.has_more);
        assert_eq!(state.begin(), Some(Some(String::from("t1"))));
    }

    #[test]
    fn test_trigger_window() {
        let policy = PaginationPolicy::default();
        let state = more();
        assert!(!state.should_load(&policy, 0, 50, false));
        assert!(!state.should_load(&policy, 39, 50, false));
        assert!(state.should_load(&policy, 40, 50, false));
        assert!(state.should_load(&policy, 0, 5, false));
    }

    #[test]
    fn test_no_more_pages() {
        let policy = PaginationPolicy::default();
        let state = PaginationState::from_token(None);
        assert!(!state.has_more);
        assert!(!state.should_load(&policy, 49, 50, false));
        assert!(!state.can_load());
    }

    #[test]
    fn test_single_request_in_flight() {
        let policy = PaginationPolicy::default();
        let mut state = more();
        let mut requests = 0;
        for cursor in 40..50 {
            if state.should_load(&policy, cursor, 50, false) && state.begin().is_some() {
                requests += 1;
            }
        }
        assert_eq!(requests, 1);
        assert!(state.is_loading_more);
        assert_eq!(state.begin(), None);

        state.complete(Some(String::from("t2")));
        assert!(!state.is_loading_more);
        assert_eq!(state.begin(), Some(Some(String::from("t2"))));
    }

    #[test]
    fn test_text_filter_suppression() {
        let policy = PaginationPolicy::default();
        let state = more();
        assert!(!state.should_load(&policy, 3, 3, true));
        assert!(state.should_load(&policy, 3, 12, true));
        // Manual loading ignores the suppression
        assert!(state.can_load());
    }

    #[test]
    fn test_fail_stops_loading() {
        let mut state = more();
        assert!(state.begin().is_some());
        state.fail();
        assert!(!state.has_more);
        assert!(!state.is_loading_more);
        assert_eq!(state.begin(), None);
    }

    #[test]
    fn test_complete_last_page() {
        let mut state = more();
        state.begin();
        state.complete(None);
        assert_eq!(state, PaginationState::default());
    }
}
