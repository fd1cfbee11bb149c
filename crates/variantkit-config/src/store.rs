use std::sync::Mutex;
use std::sync::RwLock;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::equality::deep_equal;
use crate::merge::MergeError;
use crate::merge::deep_merge;

type Listener<T> = Box<dyn Fn(&T) + Send + Sync>;

struct Registration<T> {
    id: u64,
    callback: Listener<T>,
}

/// An observable value holder over `T`.
///
/// `T` must round-trip through JSON so that [`patch`](Self::patch) and
/// [`reload`](Self::reload) can deep-merge an arbitrary partial document onto
/// it, and so that [`select`](Self::select) can deduplicate by deep
/// structural equality regardless of the selector's concrete return type.
pub struct ConfigStore<T> {
    initial: T,
    current: RwLock<T>,
    listeners: Mutex<Vec<Registration<T>>>,
    next_id: AtomicU64,
}

/// A handle returned by [`ConfigStore::subscribe`]; dropping it does nothing,
/// the subscription is removed only by calling [`unsubscribe`](Self::unsubscribe)
/// explicitly — not an RAII guard.
#[must_use]
pub struct Unsubscribe<'a, T> {
    store: &'a ConfigStore<T>,
    id: u64,
}

impl<'a, T> Unsubscribe<'a, T> {
    pub fn unsubscribe(self) {
        self.store.listeners.lock().expect("config store lock poisoned").retain(|r| r.id != self.id);
    }
}

impl<T> ConfigStore<T>
where
    T: Clone + Serialize + DeserializeOwned,
{
    pub fn new(initial: T) -> Self {
        Self {
            current: RwLock::new(initial.clone()),
            initial,
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// The current configuration snapshot.
    #[must_use]
    pub fn get(&self) -> T {
        self.current.read().expect("config store lock poisoned").clone()
    }

    /// A synchronous derived read.
    pub fn get_with<R>(&self, selector: impl FnOnce(&T) -> R) -> R {
        selector(&self.current.read().expect("config store lock poisoned"))
    }

    /// Registers `observer`, invoking it immediately with the current value
    /// and again on every subsequent change.
    pub fn subscribe<'a>(&'a self, observer: impl Fn(&T) + Send + Sync + 'static) -> Unsubscribe<'a, T> {
        observer(&self.current.read().expect("config store lock poisoned"));

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .expect("config store lock poisoned")
            .push(Registration { id, callback: Box::new(observer) });

        Unsubscribe { store: self, id }
    }

    /// Registers a derived selector, returning a channel that yields results
    /// deduplicated by deep structural equality; the current value is sent
    /// immediately, matching `subscribe`'s "emit current" behavior.
    pub fn select<R>(&self, selector: impl Fn(&T) -> R + Send + Sync + 'static) -> crossbeam_channel::Receiver<R>
    where
        R: Serialize + Clone + Send + 'static,
    {
        let (tx, rx) = crossbeam_channel::unbounded();

        let initial = selector(&self.current.read().expect("config store lock poisoned"));
        let last = Mutex::new(serde_json::to_value(&initial).unwrap_or(Value::Null));
        let _ = tx.send(initial);

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().expect("config store lock poisoned").push(Registration {
            id,
            callback: Box::new(move |state: &T| {
                let value = selector(state);
                let json = serde_json::to_value(&value).unwrap_or(Value::Null);

                let mut last_guard = last.lock().expect("selector state lock poisoned");
                if !deep_equal(&last_guard, &json) {
                    *last_guard = json;
                    let _ = tx.send(value);
                }
            }),
        });

        rx
    }

    /// Deep-merges `patch` onto the *current* state.
    pub fn patch(&self, patch: &Value) -> Result<(), MergeError> {
        self.apply(patch, Base::Current)
    }

    /// Deep-merges `patch` onto the *original initial* state, discarding any
    /// prior patches ("reset-plus-overlay").
    pub fn reload(&self, patch: &Value) -> Result<(), MergeError> {
        self.apply(patch, Base::Initial)
    }

    fn apply(&self, patch: &Value, base: Base) -> Result<(), MergeError> {
        let base_value = match base {
            Base::Current => serde_json::to_value(self.get()).unwrap_or(Value::Null),
            Base::Initial => serde_json::to_value(&self.initial).unwrap_or(Value::Null),
        };

        let mut merged_value = base_value;
        deep_merge(&mut merged_value, patch)?;

        let merged: T = serde_json::from_value(merged_value).expect("merged configuration no longer matches T");

        {
            let mut current = self.current.write().expect("config store lock poisoned");
            *current = merged;
        }

        tracing::debug!(base = ?base, "config store: patch applied, notifying subscribers");
        self.notify();
        Ok(())
    }

    fn notify(&self) {
        let current = self.current.read().expect("config store lock poisoned");
        for registration in self.listeners.lock().expect("config store lock poisoned").iter() {
            (registration.callback)(&current);
        }
    }
}

#[derive(Debug)]
enum Base {
    Current,
    Initial,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Configuration;
    use crate::domain::VariantConfig;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[test]
    fn subscribe_emits_current_then_on_change() {
        let store = ConfigStore::new(Configuration::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);

        let _handle = store.subscribe(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        store.patch(&json!({"variants": {"prod": {"define": {"DEBUG": false}}}})).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn select_deduplicates_by_deep_equality() {
        let store = ConfigStore::new(Configuration::default());
        let rx = store.select(|config: &Configuration| config.variants.len());

        assert_eq!(rx.try_recv().unwrap(), 0);

        store.patch(&json!({"variants": {"prod": {}}})).unwrap();
        assert_eq!(rx.try_recv().unwrap(), 1);

        // Patching with an already-represented shape doesn't change the
        // selector's output (still one variant), so nothing should be queued.
        store.patch(&json!({"variants": {"prod": {"define": {"DEBUG": true}}}})).unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn patch_is_a_noop_on_empty_object() {
        let mut initial = Configuration::default();
        initial.variants.insert("prod".to_string(), VariantConfig { define: [("A".to_string(), json!(1))].into() });

        let store = ConfigStore::new(initial.clone());
        store.patch(&json!({})).unwrap();
        assert_eq!(store.get(), initial);
    }

    #[test]
    fn reload_resets_to_initial_before_overlaying() {
        let mut initial = Configuration::default();
        initial.variants.insert("prod".to_string(), VariantConfig { define: [("A".to_string(), json!(1))].into() });

        let store = ConfigStore::new(initial);
        store.patch(&json!({"variants": {"prod": {"define": {"B": 2}}}})).unwrap();
        assert!(store.get().variants["prod"].define.contains_key("B"));

        store.reload(&json!({"variants": {"prod": {"define": {"C": 3}}}})).unwrap();
        let reloaded = store.get();
        // B came from a patch applied before reload and must be gone; A is
        // back because reload started from the original initial state again.
        assert!(!reloaded.variants["prod"].define.contains_key("B"));
        assert!(reloaded.variants["prod"].define.contains_key("A"));
        assert!(reloaded.variants["prod"].define.contains_key("C"));
    }

    #[test]
    fn unsubscribe_stops_further_notifications() {
        let store = ConfigStore::new(Configuration::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);

        let handle = store.subscribe(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });
        handle.unsubscribe();

        store.patch(&json!({"variants": {"prod": {}}})).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
