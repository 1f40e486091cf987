//! Observable value holder and the sync progress it carries.
//!
//! Producers `post` values from any thread; observers hold an
//! `mpsc::Receiver` and drain it when convenient. Dropping the receiver is
//! how an observer unsubscribes.

use std::sync::mpsc;
use std::sync::{Arc, Mutex, PoisonError};

struct Shared<T> {
    latest: Option<T>,
    subscribers: Vec<mpsc::Sender<T>>,
}

/// Latest-value holder that fans updates out to subscribers.
pub struct Observable<T> {
    shared: Arc<Mutex<Shared<T>>>,
}

impl<T: Clone> Observable<T> {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared {
                latest: None,
                subscribers: Vec::new(),
            })),
        }
    }

    pub fn with_value(value: T) -> Self {
        let observable = Self::new();
        observable.post(value);
        observable
    }

    /// Store `value` and deliver it to every live subscriber.
    pub fn post(&self, value: T) {
        let mut shared = self.shared.lock().unwrap_or_else(PoisonError::into_inner);
        shared
            .subscribers
            .retain(|tx| tx.send(value.clone()).is_ok());
        shared.latest = Some(value);
    }

    pub fn get(&self) -> Option<T> {
        self.shared
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .latest
            .clone()
    }

    /// Subscribe to future values. The receiver starts with the current value
    /// when there is one.
    pub fn subscribe(&self) -> mpsc::Receiver<T> {
        let (tx, rx) = mpsc::channel();
        let mut shared = self.shared.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(latest) = &shared.latest {
            let _ = tx.send(latest.clone());
        }
        shared.subscribers.push(tx);
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .subscribers
            .len()
    }
}

impl<T: Clone> Default for Observable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

/// Coarse progress of a schedule sync: a message and a percentage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncStatus {
    pub text: String,
    pub progress: u8,
    pub failed: bool,
}

impl SyncStatus {
    pub fn new(text: impl Into<String>, progress: u8) -> Self {
        Self {
            text: text.into(),
            progress: progress.min(100),
            failed: false,
        }
    }

    fn failure(text: String) -> Self {
        Self {
            text,
            progress: 0,
            failed: true,
        }
    }

    pub fn queued() -> Self {
        Self::new("Schedule update queued", 0)
    }

    pub fn downloading(file: &str) -> Self {
        Self::new(format!("Downloading {}", file), 10)
    }

    pub fn parsing(file: &str) -> Self {
        Self::new(format!("Parsing {}", file), 33)
    }

    pub fn done(file: &str) -> Self {
        Self::new(format!("Processing of {} completed", file), 100)
    }

    pub fn download_error(reason: impl std::fmt::Display) -> Self {
        Self::failure(format!("Schedule download failed: {}", reason))
    }

    pub fn parse_error(file: &str) -> Self {
        Self::failure(format!("Could not parse {}", file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_subscriber_receives_current_then_updates() {
        let observable = Observable::with_value(1);
        let rx = observable.subscribe();
        observable.post(2);
        observable.post(3);

        let seen: Vec<i32> = rx.try_iter().collect();
        assert_eq!(seen, vec![1, 2, 3]);
        assert_eq!(observable.get(), Some(3));
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let observable = Observable::new();
        let rx = observable.subscribe();
        let _kept = observable.subscribe();
        assert_eq!(observable.subscriber_count(), 2);

        drop(rx);
        observable.post("x".to_string());
        assert_eq!(observable.subscriber_count(), 1);
    }

    #[test]
    fn test_post_from_other_thread() {
        let observable = Observable::new();
        let rx = observable.subscribe();
        let producer = observable.clone();

        thread::spawn(move || producer.post(SyncStatus::parsing("a.csv")))
            .join()
            .unwrap();

        assert_eq!(rx.recv().unwrap().progress, 33);
    }

    #[test]
    fn test_status_stages() {
        assert_eq!(SyncStatus::queued().progress, 0);
        assert_eq!(SyncStatus::downloading("a").progress, 10);
        assert_eq!(SyncStatus::done("a").progress, 100);
        assert!(SyncStatus::download_error("no links").failed);
        assert_eq!(SyncStatus::parse_error("a").progress, 0);
        assert!(!SyncStatus::queued().failed);
        assert_eq!(SyncStatus::new("x", 250).progress, 100);
    }
}
