// ============================
// crates/relay-lib/src/registry.rs
// ============================
//! Stream registry: the authoritative table of live streams and viewers.
//!
//! All mutation funnels through [`StreamRegistry`]; each public operation
//! takes the lock once and is atomic with respect to every other operation.
//! A reverse `viewer -> stream` index keeps viewer removal O(1) instead of
//! scanning every stream on disconnect.
//!
//! Invariants maintained here:
//! - a connection id appears in at most one stream's viewer set
//! - a viewer id never equals its own stream's id
//! - a stream owner never sits in another stream's viewer set
//! - the reverse index always agrees with the viewer sets

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;
use relay_common::{StreamMeta, StreamSummary};

use crate::error::AppError;

/// One active broadcast, keyed by its owner's connection id.
#[derive(Debug, Clone)]
pub struct Stream {
    pub stream_id: String,
    pub meta: Option<StreamMeta>,
    pub viewers: HashSet<String>,
}

/// Outcome of [`StreamRegistry::create_stream`].
#[derive(Debug)]
pub struct StreamCreated {
    /// Viewers displaced when an existing stream was overwritten.
    pub displaced_viewers: Vec<String>,
    /// Stream the owner was watching before it started broadcasting.
    pub detached_from: Option<ViewerRemoved>,
}

/// Outcome of [`StreamRegistry::add_viewer`].
#[derive(Debug)]
pub struct ViewerAdded {
    pub viewer_count: usize,
    /// False when the viewer was already attached to this stream.
    pub newly_attached: bool,
    /// Stream the viewer was detached from, when it switched streams.
    pub moved_from: Option<ViewerRemoved>,
}

/// Outcome of [`StreamRegistry::remove_viewer`].
#[derive(Debug)]
pub struct ViewerRemoved {
    pub stream_id: String,
    /// Viewer count of the stream after removal.
    pub viewer_count: usize,
}

#[derive(Default)]
struct RegistryInner {
    streams: HashMap<String, Stream>,
    // Insertion order, for a stable listing
    order: Vec<String>,
    viewer_index: HashMap<String, String>,
}

impl RegistryInner {
    fn detach(&mut self, viewer_id: &str) -> Option<ViewerRemoved> {
        let stream_id = self.viewer_index.remove(viewer_id)?;
        let stream = self.streams.get_mut(&stream_id)?;
        stream.viewers.remove(viewer_id);
        Some(ViewerRemoved {
            viewer_count: stream.viewers.len(),
            stream_id,
        })
    }
}

/// Registry of active streams, safe to share across connection tasks.
#[derive(Default)]
pub struct StreamRegistry {
    inner: RwLock<RegistryInner>,
}

impl StreamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a broadcast owned by `owner_id`.
    ///
    /// A second start from the same owner overwrites the existing stream:
    /// the meta is replaced and the viewer set resets to empty. Displaced
    /// viewers are returned so the caller can notify them. If the owner was
    /// itself viewing another stream it is detached from it first.
    pub fn create_stream(&self, owner_id: &str, meta: Option<StreamMeta>) -> StreamCreated {
        let mut guard = self.inner.write();
        let inner = &mut *guard;

        let detached_from = inner.detach(owner_id);

        let displaced_viewers = if let Some(existing) = inner.streams.get_mut(owner_id) {
            existing.meta = meta;
            let displaced: Vec<String> = existing.viewers.drain().collect();
            for viewer in &displaced {
                inner.viewer_index.remove(viewer);
            }
            displaced
        } else {
            inner.streams.insert(
                owner_id.to_string(),
                Stream {
                    stream_id: owner_id.to_string(),
                    meta,
                    viewers: HashSet::new(),
                },
            );
            inner.order.push(owner_id.to_string());
            Vec::new()
        };

        StreamCreated {
            displaced_viewers,
            detached_from,
        }
    }

    /// Remove and return the stream owned by `owner_id`, if any.
    ///
    /// Removing an absent stream is a no-op, so duplicate disconnect
    /// delivery is harmless.
    pub fn remove_stream(&self, owner_id: &str) -> Option<Stream> {
        let mut inner = self.inner.write();
        let stream = inner.streams.remove(owner_id)?;
        inner.order.retain(|id| id != owner_id);
        for viewer in &stream.viewers {
            inner.viewer_index.remove(viewer);
        }
        Some(stream)
    }

    /// Attach `viewer_id` to the stream `stream_id`.
    ///
    /// Re-attaching an already-attached viewer is idempotent. A viewer
    /// attached to a different stream is moved; the stream it left is
    /// reported back so its owner can be notified.
    pub fn add_viewer(&self, stream_id: &str, viewer_id: &str) -> Result<ViewerAdded, AppError> {
        let mut guard = self.inner.write();
        let inner = &mut *guard;

        if !inner.streams.contains_key(stream_id) {
            return Err(AppError::StreamNotFound(stream_id.to_string()));
        }
        if viewer_id == stream_id {
            return Err(AppError::SelfSubscribe);
        }
        // An owner in someone else's viewer set would be double-counted on
        // disconnect, which checks ownership first.
        if inner.streams.contains_key(viewer_id) {
            return Err(AppError::AlreadyBroadcasting);
        }

        if inner
            .viewer_index
            .get(viewer_id)
            .is_some_and(|attached| attached == stream_id)
        {
            let viewer_count = inner
                .streams
                .get(stream_id)
                .map_or(0, |stream| stream.viewers.len());
            return Ok(ViewerAdded {
                viewer_count,
                newly_attached: false,
                moved_from: None,
            });
        }

        let moved_from = inner.detach(viewer_id);

        let Some(stream) = inner.streams.get_mut(stream_id) else {
            return Err(AppError::StreamNotFound(stream_id.to_string()));
        };
        stream.viewers.insert(viewer_id.to_string());
        let viewer_count = stream.viewers.len();
        inner
            .viewer_index
            .insert(viewer_id.to_string(), stream_id.to_string());

        Ok(ViewerAdded {
            viewer_count,
            newly_attached: true,
            moved_from,
        })
    }

    /// Detach `viewer_id` from whatever stream it is watching.
    ///
    /// A no-op returning `None` when the viewer is not attached anywhere.
    pub fn remove_viewer(&self, viewer_id: &str) -> Option<ViewerRemoved> {
        self.inner.write().detach(viewer_id)
    }

    /// Atomic, insertion-ordered projection of the registry for clients.
    pub fn snapshot(&self) -> Vec<StreamSummary> {
        let inner = self.inner.read();
        inner
            .order
            .iter()
            .filter_map(|id| inner.streams.get(id))
            .map(|stream| StreamSummary {
                stream_id: stream.stream_id.clone(),
                viewer_count: stream.viewers.len(),
                meta: stream.meta.clone(),
            })
            .collect()
    }

    pub fn contains_stream(&self, stream_id: &str) -> bool {
        self.inner.read().streams.contains_key(stream_id)
    }

    pub fn viewer_count(&self, stream_id: &str) -> Option<usize> {
        self.inner
            .read()
            .streams
            .get(stream_id)
            .map(|stream| stream.viewers.len())
    }

    /// Stream the given connection is currently watching, if any.
    pub fn viewing(&self, viewer_id: &str) -> Option<String> {
        self.inner.read().viewer_index.get(viewer_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().streams.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(name: &str) -> Option<StreamMeta> {
        Some(StreamMeta {
            name: Some(name.to_string()),
            profile_image_url: None,
        })
    }

    #[test]
    fn test_create_stream_appears_in_snapshot() {
        let registry = StreamRegistry::new();
        registry.create_stream("a", meta("Alice"));

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].stream_id, "a");
        assert_eq!(snapshot[0].viewer_count, 0);
        assert_eq!(snapshot[0].meta, meta("Alice"));
    }

    #[test]
    fn test_overwrite_resets_viewers_and_keeps_position() {
        let registry = StreamRegistry::new();
        registry.create_stream("a", meta("Alice"));
        registry.create_stream("b", meta("Bea"));
        registry.add_viewer("a", "v1").unwrap();
        registry.add_viewer("a", "v2").unwrap();

        let created = registry.create_stream("a", meta("Alice"));
        let mut displaced = created.displaced_viewers.clone();
        displaced.sort();
        assert_eq!(displaced, vec!["v1", "v2"]);

        // Viewer set reset, listing position unchanged
        let snapshot = registry.snapshot();
        assert_eq!(snapshot[0].stream_id, "a");
        assert_eq!(snapshot[0].viewer_count, 0);
        assert_eq!(snapshot[1].stream_id, "b");

        // Displaced viewers are fully detached
        assert!(registry.viewing("v1").is_none());
        assert!(registry.remove_viewer("v1").is_none());
    }

    #[test]
    fn test_add_viewer_is_idempotent() {
        let registry = StreamRegistry::new();
        registry.create_stream("a", None);

        let first = registry.add_viewer("a", "v1").unwrap();
        assert!(first.newly_attached);
        assert_eq!(first.viewer_count, 1);

        let second = registry.add_viewer("a", "v1").unwrap();
        assert!(!second.newly_attached);
        assert_eq!(second.viewer_count, 1);
        assert_eq!(registry.viewer_count("a"), Some(1));
    }

    #[test]
    fn test_add_viewer_missing_stream() {
        let registry = StreamRegistry::new();
        let err = registry.add_viewer("nope", "v1").unwrap_err();
        assert!(matches!(err, AppError::StreamNotFound(_)));
        assert!(registry.viewing("v1").is_none());
    }

    #[test]
    fn test_self_subscribe_rejected() {
        let registry = StreamRegistry::new();
        registry.create_stream("a", None);
        let err = registry.add_viewer("a", "a").unwrap_err();
        assert!(matches!(err, AppError::SelfSubscribe));
    }

    #[test]
    fn test_broadcaster_cannot_view() {
        let registry = StreamRegistry::new();
        registry.create_stream("a", None);
        registry.create_stream("b", None);
        let err = registry.add_viewer("a", "b").unwrap_err();
        assert!(matches!(err, AppError::AlreadyBroadcasting));
        assert_eq!(registry.viewer_count("a"), Some(0));
    }

    #[test]
    fn test_viewer_moves_between_streams() {
        let registry = StreamRegistry::new();
        registry.create_stream("a", None);
        registry.create_stream("b", None);
        registry.add_viewer("a", "v1").unwrap();

        let moved = registry.add_viewer("b", "v1").unwrap();
        assert!(moved.newly_attached);
        let from = moved.moved_from.unwrap();
        assert_eq!(from.stream_id, "a");
        assert_eq!(from.viewer_count, 0);
        assert_eq!(registry.viewing("v1").as_deref(), Some("b"));
        assert_eq!(registry.viewer_count("a"), Some(0));
        assert_eq!(registry.viewer_count("b"), Some(1));
    }

    #[test]
    fn test_starting_broadcast_detaches_viewer() {
        let registry = StreamRegistry::new();
        registry.create_stream("a", None);
        registry.add_viewer("a", "v1").unwrap();

        let created = registry.create_stream("v1", None);
        let detached = created.detached_from.unwrap();
        assert_eq!(detached.stream_id, "a");
        assert_eq!(registry.viewer_count("a"), Some(0));
        assert!(registry.contains_stream("v1"));
    }

    #[test]
    fn test_remove_viewer_noop_when_absent() {
        let registry = StreamRegistry::new();
        registry.create_stream("a", None);
        assert!(registry.remove_viewer("ghost").is_none());
        // Calling it again stays a no-op
        assert!(registry.remove_viewer("ghost").is_none());
    }

    #[test]
    fn test_remove_stream_clears_reverse_index() {
        let registry = StreamRegistry::new();
        registry.create_stream("a", None);
        registry.add_viewer("a", "v1").unwrap();

        let removed = registry.remove_stream("a").unwrap();
        assert!(removed.viewers.contains("v1"));
        assert!(registry.remove_stream("a").is_none());
        // Former viewer no longer indexed anywhere
        assert!(registry.viewing("v1").is_none());
        assert!(registry.remove_viewer("v1").is_none());
    }

    #[test]
    fn test_snapshot_preserves_insertion_order() {
        let registry = StreamRegistry::new();
        registry.create_stream("a", None);
        registry.create_stream("b", None);
        registry.create_stream("c", None);
        registry.remove_stream("b");
        registry.create_stream("d", None);

        let ids: Vec<String> = registry
            .snapshot()
            .into_iter()
            .map(|s| s.stream_id)
            .collect();
        assert_eq!(ids, vec!["a", "c", "d"]);
    }

    #[test]
    fn test_counts_track_set_sizes() {
        let registry = StreamRegistry::new();
        registry.create_stream("a", None);
        registry.add_viewer("a", "v1").unwrap();
        registry.add_viewer("a", "v2").unwrap();
        registry.remove_viewer("v1");

        assert_eq!(registry.viewer_count("a"), Some(1));
        assert_eq!(registry.snapshot()[0].viewer_count, 1);
    }
}
