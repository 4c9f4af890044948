//! Source-to-mirror message links.
//!
//! The graph keeps direct edges only: a source message points at each of its
//! mirrors and every mirror points back at its single source. Mirrors of the
//! same source are never linked to each other.
//!
//! Every mutation is written to the backing [`DocumentTable`] first; memory is
//! only updated once the write succeeded.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::bridge::persona::Persona;
use crate::bridge::store::{Document, DocumentTable};
use crate::common::error::StoreError;
use crate::common::types::{ChannelEndpoint, MessageId, MessageLocation};

/// What was carried over from the source message's attachments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentSummary {
    pub image_filename: Option<String>,
    #[serde(default)]
    pub notes: Vec<String>,
}

/// Persisted state of one source message and its mirrors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub source_id: MessageId,
    #[serde(default)]
    pub destination_ids: BTreeSet<MessageId>,
    #[serde(default)]
    pub persona_seed: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub avatar_url: String,
    #[serde(default)]
    pub dicebear_failed: bool,
    #[serde(default)]
    pub attachments: AttachmentSummary,
    /// Known locations of the source and its mirrors at link time.
    #[serde(default)]
    pub locations: BTreeMap<MessageId, MessageLocation>,
    pub updated_at: DateTime<Utc>,
}

impl LinkRecord {
    fn new(source_id: MessageId) -> Self {
        Self {
            source_id,
            destination_ids: BTreeSet::new(),
            persona_seed: String::new(),
            display_name: String::new(),
            avatar_url: String::new(),
            dicebear_failed: false,
            attachments: AttachmentSummary::default(),
            locations: BTreeMap::new(),
            updated_at: Utc::now(),
        }
    }
}

impl Document for LinkRecord {
    fn key(&self) -> String {
        self.source_id.to_string()
    }
}

/// Persona and attachment details stored alongside a new link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkMetadata {
    pub persona: Persona,
    pub dicebear_failed: bool,
    pub attachments: AttachmentSummary,
}

struct LinkState {
    /// source -> mirrors
    forward: HashMap<MessageId, BTreeSet<MessageId>>,
    /// mirror -> source
    reverse: HashMap<MessageId, MessageId>,
    locations: HashMap<MessageId, MessageLocation>,
    store: DocumentTable<LinkRecord>,
}

impl LinkState {
    fn linked_ids(&self, id: MessageId) -> Vec<MessageId> {
        if let Some(destinations) = self.forward.get(&id) {
            return destinations.iter().copied().collect();
        }
        self.reverse.get(&id).map(|&source| vec![source]).unwrap_or_default()
    }

    fn rebuild(&mut self) {
        self.forward.clear();
        self.reverse.clear();

        for record in self.store.all() {
            if record.destination_ids.is_empty() {
                continue;
            }
            for &destination in &record.destination_ids {
                self.reverse.insert(destination, record.source_id);
            }
            self.forward
                .insert(record.source_id, record.destination_ids.clone());
            self.locations
                .extend(record.locations.iter().map(|(&id, &location)| (id, location)));
        }
    }

    fn forget(&mut self, record: &LinkRecord) {
        self.forward.remove(&record.source_id);
        self.locations.remove(&record.source_id);
        for destination in &record.destination_ids {
            self.reverse.remove(destination);
            self.locations.remove(destination);
        }
    }
}

/// Bidirectional link graph with its message location cache.
pub struct LinkGraph {
    state: Mutex<LinkState>,
}

impl LinkGraph {
    /// Open the link document file and rebuild the graph from it.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let store = DocumentTable::open(path)?;
        info!(records = store.len(), "Link graph restored");
        Ok(Self::with_store(store))
    }

    /// A graph that keeps nothing on disk.
    pub fn in_memory() -> Self {
        Self::with_store(DocumentTable::in_memory())
    }

    fn with_store(store: DocumentTable<LinkRecord>) -> Self {
        let mut state = LinkState {
            forward: HashMap::new(),
            reverse: HashMap::new(),
            locations: HashMap::new(),
            store,
        };
        state.rebuild();
        Self {
            state: Mutex::new(state),
        }
    }

    /// Rebuild edges and persisted locations from the stored records.
    pub async fn reconcile(&self) -> usize {
        let mut state = self.state.lock().await;
        state.rebuild();
        state.forward.len()
    }

    pub async fn record_location(&self, message_id: MessageId, location: MessageLocation) {
        self.state.lock().await.locations.insert(message_id, location);
    }

    pub async fn location_of(&self, message_id: MessageId) -> Option<MessageLocation> {
        self.state.lock().await.locations.get(&message_id).copied()
    }

    pub async fn forget_location(&self, message_id: MessageId) {
        self.state.lock().await.locations.remove(&message_id);
    }

    /// Link a source to one of its mirrors. Returns false when the edge was refused.
    pub async fn link(&self, source: MessageId, destination: MessageId) -> Result<bool, StoreError> {
        self.insert_edge(source, destination, None).await
    }

    /// Link a source to a mirror and store the persona and attachments used for it.
    pub async fn link_with_metadata(
        &self,
        source: MessageId,
        destination: MessageId,
        metadata: LinkMetadata,
    ) -> Result<bool, StoreError> {
        self.insert_edge(source, destination, Some(metadata)).await
    }

    async fn insert_edge(
        &self,
        source: MessageId,
        destination: MessageId,
        metadata: Option<LinkMetadata>,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;

        if source == destination {
            warn!(message_id = source, "Refusing to link a message to itself");
            return Ok(false);
        }
        if let Some(&owner) = state.reverse.get(&destination) {
            if owner != source {
                warn!(
                    source_id = source,
                    destination_id = destination,
                    owner_id = owner,
                    "Refusing link: destination already mirrors another message"
                );
                return Ok(false);
            }
        }
        if state.reverse.contains_key(&source) || state.forward.contains_key(&destination) {
            warn!(
                source_id = source,
                destination_id = destination,
                "Refusing link: mirrors cannot be chained"
            );
            return Ok(false);
        }

        let mut record = state
            .store
            .get(&source.to_string())
            .cloned()
            .unwrap_or_else(|| LinkRecord::new(source));
        record.destination_ids.insert(destination);
        for id in [source, destination] {
            if let Some(&location) = state.locations.get(&id) {
                record.locations.insert(id, location);
            }
        }
        if let Some(metadata) = metadata {
            record.persona_seed = metadata.persona.seed;
            record.display_name = metadata.persona.display_name;
            record.avatar_url = metadata.persona.avatar_url;
            record.dicebear_failed = metadata.dicebear_failed;
            record.attachments = metadata.attachments;
        }
        record.updated_at = Utc::now();

        state.store.upsert(record)?;

        state.forward.entry(source).or_default().insert(destination);
        state.reverse.insert(destination, source);
        debug!(source_id = source, destination_id = destination, "Linked messages");
        Ok(true)
    }

    /// Remove one edge. When the source has no mirrors left its record is dropped.
    pub async fn unlink(&self, source: MessageId, destination: MessageId) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;

        let Some(mut record) = state.store.get(&source.to_string()).cloned() else {
            return Ok(false);
        };
        if !record.destination_ids.remove(&destination) {
            return Ok(false);
        }

        if record.destination_ids.is_empty() {
            state.store.remove(&source.to_string())?;
            state.forward.remove(&source);
            state.locations.remove(&source);
        } else {
            record.locations.remove(&destination);
            record.updated_at = Utc::now();
            state.store.upsert(record)?;
            if let Some(destinations) = state.forward.get_mut(&source) {
                destinations.remove(&destination);
            }
        }
        state.reverse.remove(&destination);
        state.locations.remove(&destination);

        debug!(source_id = source, destination_id = destination, "Unlinked messages");
        Ok(true)
    }

    /// Remove the edge between two messages regardless of which one is the source.
    pub async fn unlink_pair(&self, a: MessageId, b: MessageId) -> Result<bool, StoreError> {
        let source = {
            let state = self.state.lock().await;
            if state.reverse.get(&b) == Some(&a) {
                Some((a, b))
            } else if state.reverse.get(&a) == Some(&b) {
                Some((b, a))
            } else {
                None
            }
        };

        match source {
            Some((source, destination)) => self.unlink(source, destination).await,
            None => Ok(false),
        }
    }

    /// Remove a source with all its edges, its record and every involved location.
    pub async fn delete_source(&self, source: MessageId) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;

        let record = match state.store.remove(&source.to_string())? {
            Some(record) => record,
            None => match state.forward.get(&source) {
                Some(destinations) => LinkRecord {
                    destination_ids: destinations.clone(),
                    ..LinkRecord::new(source)
                },
                None => return Ok(false),
            },
        };
        state.forget(&record);

        debug!(
            source_id = source,
            mirrors = record.destination_ids.len(),
            "Deleted source message links"
        );
        Ok(true)
    }

    /// The source of a message, whether it is the source itself or one of its mirrors.
    pub async fn find_source_for(&self, id: MessageId) -> Option<MessageId> {
        let state = self.state.lock().await;
        if state.forward.contains_key(&id) {
            return Some(id);
        }
        state.reverse.get(&id).copied()
    }

    /// Mirrors of a source, or the source of a mirror.
    pub async fn linked_ids(&self, id: MessageId) -> Vec<MessageId> {
        self.state.lock().await.linked_ids(id)
    }

    pub async fn is_destination(&self, id: MessageId) -> bool {
        self.state.lock().await.reverse.contains_key(&id)
    }

    pub async fn record(&self, source: MessageId) -> Option<LinkRecord> {
        self.state.lock().await.store.get(&source.to_string()).cloned()
    }

    /// Find the copy of `referenced` that lives in the target channel: the
    /// message itself when it is there, otherwise a directly linked message.
    pub async fn resolve_mirror_in_target_channel(
        &self,
        referenced: MessageId,
        target: &ChannelEndpoint,
    ) -> Option<MessageId> {
        let state = self.state.lock().await;

        if state
            .locations
            .get(&referenced)
            .is_some_and(|location| target.contains(location))
        {
            return Some(referenced);
        }

        state.linked_ids(referenced).into_iter().find(|id| {
            state
                .locations
                .get(id)
                .is_some_and(|location| target.contains(location))
        })
    }

    /// Drop records not touched since `threshold`. Returns how many were dropped.
    pub async fn purge_older_than(&self, threshold: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut state = self.state.lock().await;

        let dropped = state.store.retain(|record| record.updated_at >= threshold)?;
        for record in &dropped {
            state.forget(record);
        }
        Ok(dropped.len())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use tokio_test::assert_ok;

    use super::*;

    fn location(guild: u64, channel: u64) -> MessageLocation {
        MessageLocation::new(Some(guild), channel)
    }

    fn metadata(seed: &str) -> LinkMetadata {
        LinkMetadata {
            persona: Persona {
                seed: seed.to_string(),
                display_name: "braveotter".to_string(),
                avatar_url: "https://avatar.example/a.png".to_string(),
            },
            dicebear_failed: false,
            attachments: AttachmentSummary {
                image_filename: Some("cat.png".to_string()),
                notes: vec![],
            },
        }
    }

    #[tokio::test]
    async fn test_link_both_directions() {
        let graph = LinkGraph::in_memory();
        assert!(graph.link(1, 2).await.unwrap());
        assert!(graph.link(1, 3).await.unwrap());
        // Idempotent
        assert!(graph.link(1, 2).await.unwrap());

        assert_eq!(graph.linked_ids(1).await, vec![2, 3]);
        assert_eq!(graph.linked_ids(2).await, vec![1]);
        assert_eq!(graph.find_source_for(3).await, Some(1));
        assert_eq!(graph.find_source_for(1).await, Some(1));
        assert_eq!(graph.find_source_for(9).await, None);
        assert!(graph.is_destination(3).await);
        assert!(!graph.is_destination(1).await);
        assert_eq!(graph.record(1).await.unwrap().destination_ids.len(), 2);
    }

    #[tokio::test]
    async fn test_mirrors_are_not_linked_to_each_other() {
        let graph = LinkGraph::in_memory();
        graph.link(1, 2).await.unwrap();
        graph.link(1, 3).await.unwrap();

        assert!(!graph.linked_ids(2).await.contains(&3));
        assert!(!graph.link(2, 3).await.unwrap());
    }

    #[tokio::test]
    async fn test_destination_owned_by_other_source_is_refused() {
        let graph = LinkGraph::in_memory();
        graph.link(1, 2).await.unwrap();

        assert!(!graph.link(5, 2).await.unwrap());
        assert_eq!(graph.find_source_for(2).await, Some(1));
        assert!(graph.record(5).await.is_none());
    }

    #[tokio::test]
    async fn test_unlink_last_edge_purges_record_and_locations() {
        let graph = LinkGraph::in_memory();
        graph.record_location(1, location(10, 100)).await;
        graph.record_location(2, location(20, 200)).await;
        assert_ok!(graph.link(1, 2).await);

        assert!(assert_ok!(graph.unlink(1, 2).await));

        assert!(graph.record(1).await.is_none());
        assert!(graph.linked_ids(1).await.is_empty());
        assert!(graph.linked_ids(2).await.is_empty());
        assert_eq!(graph.location_of(1).await, None);
        assert_eq!(graph.location_of(2).await, None);
        assert!(!graph.unlink(1, 2).await.unwrap());
    }

    #[tokio::test]
    async fn test_unlink_pair_normalizes_direction() {
        let graph = LinkGraph::in_memory();
        graph.link(1, 2).await.unwrap();
        graph.link(1, 3).await.unwrap();

        assert!(graph.unlink_pair(2, 1).await.unwrap());
        assert_eq!(graph.linked_ids(1).await, vec![3]);
        assert!(!graph.unlink_pair(2, 3).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_source_cascades() {
        let graph = LinkGraph::in_memory();
        graph.record_location(1, location(10, 100)).await;
        graph.record_location(2, location(20, 200)).await;
        graph.record_location(3, location(30, 300)).await;
        graph.link(1, 2).await.unwrap();
        graph.link(1, 3).await.unwrap();

        assert!(graph.delete_source(1).await.unwrap());

        for id in [1, 2, 3] {
            assert!(graph.linked_ids(id).await.is_empty());
            assert_eq!(graph.location_of(id).await, None);
        }
        assert!(graph.record(1).await.is_none());
        assert!(!graph.delete_source(1).await.unwrap());
    }

    #[tokio::test]
    async fn test_metadata_is_stored_and_latest_wins() {
        let graph = LinkGraph::in_memory();
        graph.link_with_metadata(1, 2, metadata("1-2-20")).await.unwrap();
        graph.link_with_metadata(1, 3, metadata("1-3-30")).await.unwrap();

        let record = graph.record(1).await.unwrap();
        assert_eq!(record.persona_seed, "1-3-30");
        assert_eq!(record.display_name, "braveotter");
        assert_eq!(record.attachments.image_filename.as_deref(), Some("cat.png"));
        assert!(!record.dicebear_failed);
    }

    #[tokio::test]
    async fn test_resolve_mirror_in_target_channel() {
        let graph = LinkGraph::in_memory();
        graph.record_location(1, location(10, 100)).await;
        graph.record_location(2, location(20, 200)).await;
        graph.link(1, 2).await.unwrap();

        let here = ChannelEndpoint::new(10, 100);
        let there = ChannelEndpoint::new(20, 200);
        let elsewhere = ChannelEndpoint::new(30, 300);

        assert_eq!(graph.resolve_mirror_in_target_channel(1, &here).await, Some(1));
        assert_eq!(graph.resolve_mirror_in_target_channel(1, &there).await, Some(2));
        assert_eq!(graph.resolve_mirror_in_target_channel(2, &here).await, Some(1));
        assert_eq!(graph.resolve_mirror_in_target_channel(1, &elsewhere).await, None);
        assert_eq!(graph.resolve_mirror_in_target_channel(7, &here).await, None);
    }

    #[tokio::test]
    async fn test_links_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge_messages.json");
        {
            let graph = LinkGraph::open(&path).unwrap();
            graph.record_location(1, location(10, 100)).await;
            graph.record_location(2, location(20, 200)).await;
            graph.link_with_metadata(1, 2, metadata("s")).await.unwrap();
        }

        let graph = LinkGraph::open(&path).unwrap();
        assert_eq!(graph.linked_ids(1).await, vec![2]);
        assert!(graph.is_destination(2).await);
        assert_eq!(graph.location_of(2).await, Some(location(20, 200)));
        assert_eq!(graph.reconcile().await, 1);
    }

    #[tokio::test]
    async fn test_purge_older_than() {
        let graph = LinkGraph::in_memory();
        graph.link(1, 2).await.unwrap();
        graph.link(3, 4).await.unwrap();

        assert_eq!(
            graph.purge_older_than(Utc::now() - Duration::days(1)).await.unwrap(),
            0
        );
        assert_eq!(
            graph.purge_older_than(Utc::now() + Duration::seconds(1)).await.unwrap(),
            2
        );
        assert!(graph.linked_ids(1).await.is_empty());
        assert!(!graph.is_destination(4).await);
    }
}
