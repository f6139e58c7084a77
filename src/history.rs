use std::collections::VecDeque;

use crate::models::ChatExchange;

/// Exchanges kept per chat session.
pub const CHAT_HISTORY_LIMIT: usize = 20;

/// Rolling window over the most recent exchanges of one session, oldest first.
#[derive(Debug, Clone, Default)]
pub struct ChatWindow {
    exchanges: VecDeque<ChatExchange>,
}

impl ChatWindow {
    /// Builds a window from exchanges ordered oldest first, keeping the newest.
    pub fn from_exchanges(exchanges: impl IntoIterator<Item = ChatExchange>) -> Self {
        let mut window = Self::default();
        for exchange in exchanges {
            window.push(exchange);
        }
        window
    }

    /// Appends an exchange and returns the one evicted to stay within the limit.
    pub fn push(&mut self, exchange: ChatExchange) -> Option<ChatExchange> {
        self.exchanges.push_back(exchange);
        if self.exchanges.len() > CHAT_HISTORY_LIMIT {
            self.exchanges.pop_front()
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChatExchange> {
        self.exchanges.iter()
    }

    pub fn into_vec(self) -> Vec<ChatExchange> {
        self.exchanges.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn exchange(n: i64) -> ChatExchange {
        ChatExchange {
            message: format!("question {n}"),
            response: format!("answer {n}"),
            timestamp: Utc::now() + Duration::seconds(n),
        }
    }

    #[test]
    fn push_evicts_oldest_past_limit() {
        let mut window = ChatWindow::default();
        for n in 0..CHAT_HISTORY_LIMIT as i64 {
            assert!(window.push(exchange(n)).is_none());
        }
        let evicted = window.push(exchange(99)).unwrap();
        assert_eq!(evicted.message, "question 0");
        assert_eq!(window.len(), CHAT_HISTORY_LIMIT);
        assert_eq!(window.iter().next().unwrap().message, "question 1");
        assert_eq!(window.iter().last().unwrap().message, "question 99");
    }

    #[test]
    fn from_exchanges_keeps_most_recent() {
        let window = ChatWindow::from_exchanges((0..25).map(exchange));
        let messages: Vec<_> = window.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages.len(), CHAT_HISTORY_LIMIT);
        assert_eq!(messages.first(), Some(&"question 5"));
        assert_eq!(messages.last(), Some(&"question 24"));
    }

    #[test]
    fn into_vec_is_oldest_first() {
        let mut window = ChatWindow::from_exchanges((0..3).map(exchange));
        window.push(exchange(3));
        let messages: Vec<_> = window.into_vec().into_iter().map(|e| e.message).collect();
        assert_eq!(
            messages,
            vec!["question 0", "question 1", "question 2", "question 3"]
        );
    }

    #[test]
    fn empty_window() {
        let window = ChatWindow::from_exchanges(Vec::new());
        assert!(window.is_empty());
        assert_eq!(window.len(), 0);
    }
}
