//! Observable values for headless state containers.
//!
//! A [`Signal`] is owned by exactly one state container and mutated only
//! through it. Readers subscribe with [`Signal::observe`] and get a
//! [`tokio::sync::watch::Receiver`], so a frontend can await changes or
//! poll `has_changed` without the container knowing about it.

use tokio::sync::watch;

/// Read side handed to observers.
pub type Observer<T> = watch::Receiver<T>;

/// Single-owner observable value.
#[derive(Debug)]
pub struct Signal<T> {
    tx: watch::Sender<T>,
}

impl<T> Signal<T> {
    /// Wrap `initial` with no observers yet.
    pub fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// Subscribe to future changes. The current value counts as seen.
    pub fn observe(&self) -> Observer<T> {
        self.tx.subscribe()
    }

    /// Borrow the current value for the duration of `f`.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.tx.borrow())
    }

    /// Mutate in place. `f` returns whether it changed anything; observers
    /// are notified only in that case.
    pub fn update(&self, f: impl FnOnce(&mut T) -> bool) -> bool {
        self.tx.send_if_modified(f)
    }
}

impl<T: Clone> Signal<T> {
    /// Clone of the current value.
    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }
}

impl<T: PartialEq> Signal<T> {
    /// Replace the value, notifying observers if it differs.
    pub fn set(&self, value: T) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        })
    }
}

impl<T: Default> Default for Signal<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_notifies_only_on_change() {
        let signal = Signal::new(1_u32);
        let mut observer = signal.observe();
        assert!(!observer.has_changed().unwrap());

        assert!(!signal.set(1));
        assert!(!observer.has_changed().unwrap());

        assert!(signal.set(2));
        assert!(observer.has_changed().unwrap());
        assert_eq!(*observer.borrow_and_update(), 2);
        assert!(!observer.has_changed().unwrap());
    }

    #[test]
    fn update_reports_modification() {
        let signal = Signal::new(vec![1, 2]);
        let observer = signal.observe();
        assert!(!signal.update(|values| values.is_empty()));
        assert!(signal.update(|values| {
            values.push(3);
            true
        }));
        assert_eq!(*observer.borrow(), vec![1, 2, 3]);
        assert_eq!(signal.with(|values| values.len()), 3);
    }

    #[test]
    fn works_without_observers() {
        let signal = Signal::new(String::from("a"));
        assert!(signal.set("b".to_string()));
        assert_eq!(signal.get(), "b");
    }
}
