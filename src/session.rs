/// Where the user is: account, mailbox, page and active search.
///
/// Owned by the controller; every change goes through these methods and is
/// visible to the next read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    account: Option<String>,
    mailbox: String,
    page: usize,
    query: Option<String>,
}

impl SessionState {
    pub fn new(mailbox: impl Into<String>) -> Self {
        Self {
            account: None,
            mailbox: mailbox.into(),
            page: 0,
            query: None,
        }
    }

    /// Switching accounts invalidates the page and any search
    pub fn set_account(&mut self, account: impl Into<String>) {
        self.account = Some(account.into());
        self.page = 0;
        self.query = None;
    }

    pub fn set_mailbox(&mut self, mailbox: impl Into<String>) {
        self.mailbox = mailbox.into();
        self.page = 0;
        self.query = None;
    }

    pub fn next_page(&mut self) {
        self.page = self.page.saturating_add(1);
    }

    pub fn prev_page(&mut self) {
        self.page = self.page.saturating_sub(1);
    }

    pub fn set_query(&mut self, query: Option<String>) {
        self.query = query.filter(|q| !q.trim().is_empty());
        self.page = 0;
    }

    pub fn current_account(&self) -> Option<&str> {
        self.account.as_deref()
    }

    pub fn current_mailbox(&self) -> &str {
        &self.mailbox
    }

    pub fn current_page(&self) -> usize {
        self.page
    }

    pub fn current_query(&self) -> Option<&str> {
        self.query.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prev_page_clamps_at_zero() {
        let mut state = SessionState::new("INBOX");
        for _ in 0..5 {
            state.prev_page();
        }
        assert_eq!(state.current_page(), 0);

        state.next_page();
        state.next_page();
        state.prev_page();
        assert_eq!(state.current_page(), 1);
    }

    #[test]
    fn test_set_mailbox_resets_page() {
        let mut state = SessionState::new("INBOX");
        state.next_page();
        state.next_page();
        state.set_mailbox("Archive");
        assert_eq!(state.current_mailbox(), "Archive");
        assert_eq!(state.current_page(), 0);

        state.set_mailbox("Archive");
        assert_eq!(state.current_page(), 0);
    }

    #[test]
    fn test_search_query_survives_paging_not_mailbox_change() {
        let mut state = SessionState::new("INBOX");
        state.set_query(Some("invoice".to_string()));
        state.next_page();
        assert_eq!(state.current_query(), Some("invoice"));
        assert_eq!(state.current_page(), 1);

        state.set_mailbox("Sent");
        assert_eq!(state.current_query(), None);
    }

    #[test]
    fn test_blank_query_clears_search() {
        let mut state = SessionState::new("INBOX");
        state.set_query(Some("   ".to_string()));
        assert_eq!(state.current_query(), None);
    }

    #[test]
    fn test_set_account_resets_page() {
        let mut state = SessionState::new("INBOX");
        state.next_page();
        state.set_account("work");
        assert_eq!(state.current_account(), Some("work"));
        assert_eq!(state.current_page(), 0);
    }
}
