//! The external key-value store boundary.
//!
//! Networked play synchronizes through a generic slash-pathed blob store
//! with last-write-wins semantics: `get`/`set` are asynchronous
//! request/response calls, `subscribe` registers a callback that receives
//! the current value immediately and again after every write touching the
//! path. The store itself is an external collaborator; [`MemoryStore`] is
//! the in-process reference implementation used by tests.

use async_trait::async_trait;
use derive_more::{Display, Error};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tracing::{debug, instrument};

/// Value type stored at a path.
pub type StoreValue = Value;

/// Callback invoked with the value currently at the subscribed path
/// (`None` when the path does not exist).
pub type WatchCallback = Box<dyn Fn(Option<StoreValue>) + Send + Sync>;

/// Error at the store boundary, with caller location tracking.
///
/// Every failing `get`/`set` surfaces as this one discriminated value;
/// nothing at the store boundary panics.
#[derive(Debug, Clone, Display, Error)]
#[display("store error: {} at {}:{}", message, file, line)]
pub struct StoreError {
    /// Error message.
    pub message: String,
    /// Line number where the error was raised.
    pub line: u32,
    /// Source file where the error was raised.
    pub file: &'static str,
}

impl StoreError {
    /// Creates a new store error recording the caller's location.
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

/// Handle for an active subscription.
///
/// Cancelling is explicit via [`Subscription::cancel`]; dropping the handle
/// cancels too, so a subscription can never outlive its owner.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Wraps a cancellation action into a handle.
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Cancels the subscription, consuming the handle.
    pub fn cancel(mut self) {
        self.run();
    }

    fn run(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// A shared mutable record store addressed by slash-delimited paths.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetches the value at a path, `None` when absent.
    async fn get(&self, path: &str) -> Result<Option<StoreValue>, StoreError>;

    /// Writes a value at a path, replacing whatever was there (last write
    /// wins, no merge).
    async fn set(&self, path: &str, value: StoreValue) -> Result<(), StoreError>;

    /// Watches a path. The callback fires once with the current value right
    /// away, then after every write to the path, an ancestor of it, or a
    /// descendant under it.
    fn subscribe(&self, path: &str, callback: WatchCallback) -> Subscription;
}

struct Watcher {
    path: Vec<String>,
    callback: Arc<dyn Fn(Option<StoreValue>) + Send + Sync>,
}

struct MemoryStoreInner {
    root: Mutex<Value>,
    watchers: Mutex<HashMap<u64, Watcher>>,
    next_watcher: AtomicU64,
    offline: AtomicBool,
}

/// In-memory [`KeyValueStore`] backed by a JSON tree.
///
/// Writes to a nested path create intermediate objects, so
/// `get("a/b")` sees a field written via `set("a/b/c", ..)` and vice versa,
/// matching the path semantics of the hosted store this stands in for.
/// Callbacks fire synchronously inside `set`.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<MemoryStoreInner>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MemoryStoreInner {
                root: Mutex::new(Value::Object(Map::new())),
                watchers: Mutex::new(HashMap::new()),
                next_watcher: AtomicU64::new(0),
                offline: AtomicBool::new(false),
            }),
        }
    }

    /// Simulates losing the connection: while offline every `get`/`set`
    /// fails with a [`StoreError`]. Subscriptions stay registered.
    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.inner.offline.load(Ordering::SeqCst) {
            Err(StoreError::new("store unreachable"))
        } else {
            Ok(())
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn split_path(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

fn value_at<'a>(root: &'a Value, segments: &[String]) -> Option<&'a Value> {
    let mut current = root;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn set_at(root: &mut Value, segments: &[String], value: Value) {
    let Some((leaf, parents)) = segments.split_last() else {
        *root = value;
        return;
    };
    let mut current = root;
    for segment in parents {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        current = current
            .as_object_mut()
            .expect("just ensured object")
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    if !current.is_object() {
        *current = Value::Object(Map::new());
    }
    current
        .as_object_mut()
        .expect("just ensured object")
        .insert(leaf.clone(), value);
}

/// Whether a write at `written` is visible to a watcher at `watched`:
/// true when either path is a segment-wise prefix of the other.
fn paths_overlap(written: &[String], watched: &[String]) -> bool {
    let shorter = written.len().min(watched.len());
    written[..shorter] == watched[..shorter]
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    #[instrument(skip(self))]
    async fn get(&self, path: &str) -> Result<Option<StoreValue>, StoreError> {
        self.check_online()?;
        let segments = split_path(path);
        let root = self.inner.root.lock().expect("store lock poisoned");
        Ok(value_at(&root, &segments).cloned())
    }

    #[instrument(skip(self, value))]
    async fn set(&self, path: &str, value: StoreValue) -> Result<(), StoreError> {
        self.check_online()?;
        let segments = split_path(path);

        // Collect affected callbacks with their fresh values while holding
        // the data lock, then invoke after releasing it so a callback may
        // call back into the store.
        let pending: Vec<(Arc<dyn Fn(Option<StoreValue>) + Send + Sync>, Option<StoreValue>)> = {
            let mut root = self.inner.root.lock().expect("store lock poisoned");
            set_at(&mut root, &segments, value);

            let watchers = self.inner.watchers.lock().expect("watcher lock poisoned");
            watchers
                .values()
                .filter(|w| paths_overlap(&segments, &w.path))
                .map(|w| (Arc::clone(&w.callback), value_at(&root, &w.path).cloned()))
                .collect()
        };

        debug!(path, notified = pending.len(), "value written");
        for (callback, current) in pending {
            callback(current);
        }
        Ok(())
    }

    fn subscribe(&self, path: &str, callback: WatchCallback) -> Subscription {
        let segments = split_path(path);
        let callback: Arc<dyn Fn(Option<StoreValue>) + Send + Sync> = Arc::from(callback);

        // Deliver the current value immediately, as the hosted store does.
        let current = {
            let root = self.inner.root.lock().expect("store lock poisoned");
            value_at(&root, &segments).cloned()
        };
        callback(current);

        let id = self.inner.next_watcher.fetch_add(1, Ordering::SeqCst);
        self.inner.watchers.lock().expect("watcher lock poisoned").insert(
            id,
            Watcher {
                path: segments,
                callback,
            },
        );
        debug!(path, id, "watcher registered");

        let weak: Weak<MemoryStoreInner> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner
                    .watchers
                    .lock()
                    .expect("watcher lock poisoned")
                    .remove(&id);
                debug!(id, "watcher cancelled");
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn test_get_set_round_trip() {
        let store = MemoryStore::new();
        store.set("a/b", json!(42)).await.unwrap();
        assert_eq!(store.get("a/b").await.unwrap(), Some(json!(42)));
        assert_eq!(store.get("a").await.unwrap(), Some(json!({ "b": 42 })));
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_child_write_fires_parent_watcher() {
        let store = MemoryStore::new();
        store.set("room", json!({ "flag": false })).await.unwrap();

        let fired = Arc::new(AtomicUsize::new(0));
        let fired2 = Arc::clone(&fired);
        let _sub = store.subscribe(
            "room",
            Box::new(move |_| {
                fired2.fetch_add(1, Ordering::SeqCst);
            }),
        );
        // Immediate replay counts as one fire.
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        store.set("room/flag", json!(true)).await.unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 2);
        assert_eq!(
            store.get("room").await.unwrap(),
            Some(json!({ "flag": true }))
        );
    }

    #[tokio::test]
    async fn test_cancelled_watcher_stops_firing() {
        let store = MemoryStore::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let fired2 = Arc::clone(&fired);
        let sub = store.subscribe(
            "k",
            Box::new(move |_| {
                fired2.fetch_add(1, Ordering::SeqCst);
            }),
        );
        sub.cancel();

        store.set("k", json!(1)).await.unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 1, "only the initial replay");
    }

    #[tokio::test]
    async fn test_offline_store_errors() {
        let store = MemoryStore::new();
        store.set_offline(true);
        assert!(store.get("x").await.is_err());
        assert!(store.set("x", json!(1)).await.is_err());

        store.set_offline(false);
        assert!(store.set("x", json!(1)).await.is_ok());
    }
}
