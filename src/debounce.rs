//! Trailing edge debouncing with stale result detection.
//!
//! Every call to [`Debouncer::bump`] starts a new generation and hands out a
//! [`Token`] for it. A token only stays current until the next bump, so the
//! holder can sleep through the delay and drop its work if something newer
//! arrived, then check again once a response lands.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token(u64);

impl Token {
    pub fn generation(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct Debouncer {
    generation: Arc<AtomicU64>,
    delay: Duration,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Debouncer {
            generation: Arc::new(AtomicU64::new(0)),
            delay,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// invalidates every token handed out so far
    pub fn bump(&self) -> Token {
        Token(self.generation.fetch_add(1, Ordering::AcqRel) + 1)
    }

    pub fn is_current(&self, token: Token) -> bool {
        self.generation.load(Ordering::Acquire) == token.0
    }

    /// waits out the delay, returns false if the token was superseded in the
    /// mean time
    pub async fn settle(&self, token: Token) -> bool {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.is_current(token)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn later_bump_supersedes() {
        let debouncer = Debouncer::new(Duration::from_millis(300));
        let first = debouncer.bump();

        let waiting = {
            let debouncer = debouncer.clone();

            tokio::spawn(async move { debouncer.settle(first).await })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;

        let second = debouncer.bump();

        assert!(!waiting.await.unwrap());
        assert!(debouncer.settle(second).await);
    }

    #[test]
    fn tokens_increase() {
        let debouncer = Debouncer::new(Duration::ZERO);
        let a = debouncer.bump();
        let b = debouncer.bump();

        assert!(b.generation() > a.generation());
        assert!(!debouncer.is_current(a));
        assert!(debouncer.is_current(b));
    }
}
