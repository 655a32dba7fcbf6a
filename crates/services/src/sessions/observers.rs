use std::fmt;

use super::snapshot::SessionSnapshot;

/// Callback invoked with a fresh snapshot after every session change.
pub type Observer = Box<dyn Fn(&SessionSnapshot) + Send>;

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Ordered subscriber list owned by one session.
#[derive(Default)]
pub struct Observers {
    next_id: u64,
    entries: Vec<(SubscriptionId, Observer)>,
}

impl Observers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, observer: Observer) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, observer));
        id
    }

    /// Returns false if `id` was not subscribed (already removed or cleared).
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn notify(&self, snapshot: &SessionSnapshot) {
        for (_, observer) in &self.entries {
            observer(snapshot);
        }
    }
}

impl fmt::Debug for Observers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("subscribers", &self.entries.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsubscribe_is_idempotent() {
        let mut observers = Observers::new();
        let id = observers.subscribe(Box::new(|_| {}));
        assert!(observers.unsubscribe(id));
        assert!(!observers.unsubscribe(id));
        assert!(observers.is_empty());
    }

    #[test]
    fn ids_are_not_reused_after_clear() {
        let mut observers = Observers::new();
        let first = observers.subscribe(Box::new(|_| {}));
        observers.clear();
        let second = observers.subscribe(Box::new(|_| {}));
        assert_ne!(first, second);
        assert!(!observers.unsubscribe(first));
        assert_eq!(observers.len(), 1);
    }
}
