//! Canonical client-side post list and pending optimistic writes.
//!
//! [`FeedStore`] is the single owner of the visible list of posts and of every
//! [`PendingMutation`]. Other components change post data only through its
//! methods, and the view reads it only through [`FeedStore::snapshot`].
//!
//! # Reconciliation
//!
//! A fresh read result replaces the list wholesale, but writes that are still
//! in flight are layered back on top of it:
//!
//! - a post with a pending delete stays hidden, and its rollback copy is
//!   refreshed from the new data
//! - a post with a pending vote keeps the membership the voter asked for,
//!   and the fresh server set becomes the rollback base
//! - voter updates for a post hidden by a pending delete land on its
//!   rollback copy
//! - posts whose deletion the server confirmed are never resurrected by a
//!   read that raced the delete

use crate::domain::{FeedError, FeedQuery, MutationKind, Post, PostId, Result, VoterSet};
use std::collections::{HashMap, HashSet};

/// Data needed to confirm or roll back an optimistic write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationPayload {
    /// Text sent in the PATCH. Nothing was applied locally.
    Edit { text: String },
    /// The removed post and where it used to sit.
    Delete {
        removed: Post,
        /// Post that preceded it at removal time, `None` if it was first.
        anchor: Option<PostId>,
        index: usize,
    },
    /// The voter who toggled, the membership they asked for, and the voter
    /// set to roll back to.
    Vote {
        voter: String,
        /// Whether `voter` should be a member once the toggle lands.
        voted: bool,
        /// Latest known server set without the flip.
        before: VoterSet,
    },
}

/// An optimistic local write not yet confirmed by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMutation {
    /// Which write this is; at most one per kind and post.
    pub kind: MutationKind,
    /// Target post.
    pub id: PostId,
    /// What is needed to confirm or undo it.
    pub payload: MutationPayload,
    /// Store-wide write counter at the time the mutation was issued.
    pub issued_at: u64,
}

/// Read-only view of the posts to render, tagged with the store version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedSnapshot {
    posts: Vec<Post>,
    version: u64,
}

impl FeedSnapshot {
    /// Posts in display order.
    #[must_use]
    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    /// Monotonic counter bumped on every visible change.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.posts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: &PostId) -> Option<&Post> {
        self.posts.iter().find(|p| &p.id == id)
    }

    /// Post ids in display order.
    pub fn ids(&self) -> impl Iterator<Item = &PostId> {
        self.posts.iter().map(|p| &p.id)
    }
}

/// Owner of the visible posts, the outstanding writes and the deletes the
/// server confirmed.
#[derive(Debug, Clone, Default)]
pub struct FeedStore {
    posts: Vec<Post>,
    ordering: FeedQuery,
    pending: HashMap<(PostId, MutationKind), PendingMutation>,
    tombstones: HashSet<PostId>,
    version: u64,
    writes_issued: u64,
}

impl FeedStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole list with a fresh read result, in server order.
    ///
    /// `query` is the query that produced the result; it becomes the ordering
    /// used to place posts the client inserts itself.
    pub fn replace_all(&mut self, posts: Vec<Post>, query: &FeedQuery) {
        let _span = tracing::debug_span!(
            "replace_all",
            incoming = posts.len(),
            pending = self.pending.len()
        )
        .entered();

        let mut seen = HashSet::with_capacity(posts.len());
        let mut incoming: Vec<Post> = posts
            .into_iter()
            .filter(|p| !self.tombstones.contains(&p.id))
            .filter(|p| seen.insert(p.id.clone()))
            .collect();

        // Votes before deletes: a hidden post's rollback copy must carry the flip.
        for pending in self.pending.values_mut().filter(|p| p.kind == MutationKind::Vote) {
            if let Some(post) = incoming.iter_mut().find(|p| p.id == pending.id) {
                overlay_vote(&mut pending.payload, post);
                tracing::debug!(id = %pending.id, "re-applied pending vote");
            }
        }
        for pending in self.pending.values_mut().filter(|p| p.kind == MutationKind::Delete) {
            if let MutationPayload::Delete {
                removed,
                anchor,
                index,
            } = &mut pending.payload
            {
                if let Some(pos) = incoming.iter().position(|p| p.id == pending.id) {
                    *anchor = pos.checked_sub(1).map(|i| incoming[i].id.clone());
                    *index = pos;
                    *removed = incoming.remove(pos);
                    tracing::debug!(id = %pending.id, "keeping pending delete hidden");
                }
            }
        }

        self.posts = incoming;
        self.ordering = query.clone();
        self.bump();
    }

    /// Inserts or replaces a post by id.
    ///
    /// Replacement keeps the post's position. New posts are placed according
    /// to the ordering of the last applied read. Returns `false` if the post
    /// was not made visible: its deletion was confirmed, or a delete for it is
    /// pending (then only the rollback copy is refreshed).
    pub fn upsert(&mut self, post: Post) -> bool {
        if self.tombstones.contains(&post.id) {
            tracing::debug!(id = %post.id, "ignoring upsert of deleted post");
            return false;
        }
        if let Some(pending) = self.pending.get_mut(&(post.id.clone(), MutationKind::Delete)) {
            if let MutationPayload::Delete { removed, .. } = &mut pending.payload {
                *removed = post;
            }
            return false;
        }

        if let Some(existing) = self.posts.iter_mut().find(|p| p.id == post.id) {
            *existing = post;
        } else {
            let at = self
                .posts
                .iter()
                .position(|p| self.ordering.compare(&post, p).is_lt())
                .unwrap_or(self.posts.len());
            self.posts.insert(at, post);
        }
        self.bump();
        true
    }

    /// Removes a post by id, returning its former index and value.
    ///
    /// Absent ids are a no-op: a concurrent delete may already have removed it.
    pub fn remove(&mut self, id: &PostId) -> Option<(usize, Post)> {
        let index = self.posts.iter().position(|p| &p.id == id)?;
        let post = self.posts.remove(index);
        self.bump();
        Some((index, post))
    }

    /// Replaces the voter set of `id` with the server's authoritative set.
    ///
    /// Duplicate identities in `voters_after` collapse. A post hidden by a
    /// pending delete gets the set on its rollback copy. Returns `false` if
    /// the post is neither listed nor hidden.
    pub fn apply_vote<I, S>(&mut self, id: &PostId, voter: &str, voters_after: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let voters: VoterSet = voters_after.into_iter().collect();
        tracing::debug!(
            id = %id,
            voter,
            voted = voters.contains(voter),
            count = voters.len(),
            "applying server voter set"
        );
        self.set_voters(id, voters)
    }

    /// Sets the voter set of `id` without going through the server path.
    ///
    /// Used for optimistic flips and their rollback. Reaches the rollback copy
    /// of a post hidden by a pending delete, so a failed delete restores the
    /// settled voters.
    pub(crate) fn set_voters(&mut self, id: &PostId, voters: VoterSet) -> bool {
        let Some((current, visible)) = self.voters_mut(id) else {
            return false;
        };
        let changed = *current != voters;
        *current = voters;
        if changed && visible {
            self.bump();
        }
        true
    }

    /// Voter set of a listed post, or of the rollback copy of a hidden one.
    /// The flag tells whether the post is visible.
    fn voters_mut(&mut self, id: &PostId) -> Option<(&mut VoterSet, bool)> {
        if let Some(pos) = self.posts.iter().position(|p| &p.id == id) {
            return Some((&mut self.posts[pos].voters, true));
        }
        match self.pending.get_mut(&(id.clone(), MutationKind::Delete)) {
            Some(PendingMutation {
                payload: MutationPayload::Delete { removed, .. },
                ..
            }) => Some((&mut removed.voters, false)),
            _ => None,
        }
    }

    /// Puts a removed post back after a failed delete.
    ///
    /// Placement: right after `anchor` if it is still listed, at the front if
    /// the post had no predecessor, otherwise at `index` clamped to the list
    /// length. An already listed copy is replaced instead.
    pub(crate) fn restore(&mut self, post: Post, anchor: Option<&PostId>, index: usize) {
        if self.tombstones.contains(&post.id) {
            return;
        }
        if let Some(existing) = self.posts.iter_mut().find(|p| p.id == post.id) {
            *existing = post;
            self.bump();
            return;
        }
        let at = match anchor {
            None => 0,
            Some(anchor) => self
                .posts
                .iter()
                .position(|p| &p.id == anchor)
                .map_or_else(|| index.min(self.posts.len()), |i| i + 1),
        };
        self.posts.insert(at, post);
        self.bump();
    }

    /// Id of the post listed immediately before `id`.
    pub(crate) fn predecessor(&self, id: &PostId) -> Option<PostId> {
        let pos = self.posts.iter().position(|p| &p.id == id)?;
        pos.checked_sub(1).map(|i| self.posts[i].id.clone())
    }

    /// Marks a post as deleted on the server for the rest of the session.
    pub(crate) fn tombstone(&mut self, id: &PostId) {
        self.tombstones.insert(id.clone());
        if self.remove(id).is_some() {
            tracing::debug!(id = %id, "removed tombstoned post");
        }
    }

    /// Registers an outstanding write.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::MutationPending`] if a write of the same kind is
    /// already outstanding for this post.
    pub(crate) fn begin_mutation(
        &mut self,
        kind: MutationKind,
        id: &PostId,
        payload: MutationPayload,
    ) -> Result<u64> {
        let key = (id.clone(), kind);
        if self.pending.contains_key(&key) {
            return Err(FeedError::MutationPending {
                id: id.clone(),
                kind,
            });
        }
        self.writes_issued += 1;
        self.pending.insert(
            key,
            PendingMutation {
                kind,
                id: id.clone(),
                payload,
                issued_at: self.writes_issued,
            },
        );
        Ok(self.writes_issued)
    }

    /// Removes and returns the outstanding write, if any.
    pub(crate) fn finish_mutation(&mut self, id: &PostId, kind: MutationKind) -> Option<PendingMutation> {
        self.pending.remove(&(id.clone(), kind))
    }

    /// Whether a write of `kind` on `id` is awaiting the server.
    #[must_use]
    pub fn is_pending(&self, id: &PostId, kind: MutationKind) -> bool {
        self.pending.contains_key(&(id.clone(), kind))
    }

    #[must_use]
    pub fn pending(&self, id: &PostId, kind: MutationKind) -> Option<&PendingMutation> {
        self.pending.get(&(id.clone(), kind))
    }

    /// Outstanding writes across all posts.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// A visible post. Posts hidden by a pending delete are not returned.
    #[must_use]
    pub fn get(&self, id: &PostId) -> Option<&Post> {
        self.posts.iter().find(|p| &p.id == id)
    }

    /// Query of the last applied read. Its ordering places inserted posts
    /// and its keyword drives highlighting.
    #[must_use]
    pub const fn ordering(&self) -> &FeedQuery {
        &self.ordering
    }

    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Returns the posts to render. Pure read.
    #[must_use]
    pub fn snapshot(&self) -> FeedSnapshot {
        FeedSnapshot {
            posts: self.posts.clone(),
            version: self.version,
        }
    }

    fn bump(&mut self) {
        self.version += 1;
    }
}

/// Refreshes a pending vote's rollback base from `post`, then puts the
/// voter's requested membership back on it.
fn overlay_vote(payload: &mut MutationPayload, post: &mut Post) {
    if let MutationPayload::Vote { voter, voted, before } = payload {
        before.clone_from(&post.voters);
        if *voted {
            post.voters.insert(voter.clone());
        } else {
            post.voters.remove(voter);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::post::fixtures::post;
    use crate::domain::{SortKey, SortOrder};

    fn ids(store: &FeedStore) -> Vec<String> {
        store.snapshot().ids().map(ToString::to_string).collect()
    }

    fn seeded() -> FeedStore {
        let mut store = FeedStore::new();
        store.replace_all(
            vec![
                post("c", "a@x", "third", &[], 3),
                post("b", "a@x", "second", &["a@x"], 2),
                post("a", "b@x", "first", &[], 1),
            ],
            &FeedQuery::default(),
        );
        store
    }

    #[test]
    fn replace_all_keeps_server_order() {
        let mut store = FeedStore::new();
        store.replace_all(
            vec![post("a", "a@x", "", &[], 1), post("b", "a@x", "", &[], 5)],
            &FeedQuery::default(),
        );
        assert_eq!(ids(&store), vec!["a", "b"]);
    }

    #[test]
    fn replace_all_drops_duplicate_ids() {
        let mut store = FeedStore::new();
        store.replace_all(
            vec![post("a", "a@x", "1", &[], 1), post("a", "a@x", "2", &[], 1)],
            &FeedQuery::default(),
        );
        assert_eq!(store.snapshot().len(), 1);
        assert_eq!(store.snapshot().posts()[0].body, "1");
    }

    #[test]
    fn upsert_replaces_in_place() {
        let mut store = seeded();
        assert!(store.upsert(post("b", "a@x", "edited", &["a@x"], 2)));
        assert_eq!(ids(&store), vec!["c", "b", "a"]);
        assert_eq!(store.get(&"b".into()).unwrap().body, "edited");
    }

    #[test]
    fn upsert_inserts_newest_first_by_default() {
        let mut store = seeded();
        store.upsert(post("d", "a@x", "new", &[], 9));
        assert_eq!(ids(&store), vec!["d", "c", "b", "a"]);
    }

    #[test]
    fn upsert_follows_active_ordering() {
        let mut store = FeedStore::new();
        let oldest_first = FeedQuery::new("", SortKey::CreatedAt, SortOrder::Asc);
        store.replace_all(
            vec![post("a", "a@x", "", &[], 1), post("b", "a@x", "", &[], 2)],
            &oldest_first,
        );
        store.upsert(post("c", "a@x", "", &[], 9));
        assert_eq!(ids(&store), vec!["a", "b", "c"]);
    }

    #[test]
    fn remove_is_idempotent() {
        let mut store = seeded();
        let (index, removed) = store.remove(&"b".into()).unwrap();
        assert_eq!(index, 1);
        assert_eq!(removed.body, "second");

        let before = store.snapshot();
        assert!(store.remove(&"b".into()).is_none());
        assert!(store.remove(&"never".into()).is_none());
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn apply_vote_normalizes_duplicates() {
        let mut store = seeded();
        assert!(store.apply_vote(&"a".into(), "b@x", ["a@x", "b@x", "a@x", "b@x"]));
        let voters: Vec<_> = store.get(&"a".into()).unwrap().voters.iter().map(String::from).collect();
        assert_eq!(voters, vec!["a@x", "b@x"]);
    }

    #[test]
    fn apply_vote_on_missing_post_is_reported() {
        let mut store = seeded();
        assert!(!store.apply_vote(&"zzz".into(), "b@x", ["b@x"]));
    }

    #[test]
    fn snapshot_is_a_pure_read() {
        let store = seeded();
        let a = store.snapshot();
        let b = store.snapshot();
        assert_eq!(a, b);
        assert_eq!(a.version(), store.version());
    }

    #[test]
    fn restore_goes_back_after_anchor() {
        let mut store = seeded();
        let (index, removed) = store.remove(&"b".into()).unwrap();
        store.restore(removed, Some(&"c".into()), index);
        assert_eq!(ids(&store), vec!["c", "b", "a"]);
    }

    #[test]
    fn restore_without_anchor_goes_to_front() {
        let mut store = seeded();
        let (index, removed) = store.remove(&"c".into()).unwrap();
        store.restore(removed, None, index);
        assert_eq!(ids(&store), vec!["c", "b", "a"]);
    }

    #[test]
    fn restore_with_vanished_anchor_uses_clamped_index() {
        let mut store = seeded();
        let (_, removed) = store.remove(&"a".into()).unwrap();
        store.remove(&"b".into());
        store.restore(removed, Some(&"b".into()), 2);
        assert_eq!(ids(&store), vec!["c", "a"]);
    }

    #[test]
    fn begin_mutation_rejects_same_kind_twice() {
        let mut store = seeded();
        let id: PostId = "a".into();
        let payload = MutationPayload::Edit { text: "x".into() };
        store.begin_mutation(MutationKind::Edit, &id, payload.clone()).unwrap();
        assert_eq!(
            store.begin_mutation(MutationKind::Edit, &id, payload),
            Err(FeedError::MutationPending {
                id: id.clone(),
                kind: MutationKind::Edit
            })
        );
        // A different kind on the same post is independent.
        let vote = MutationPayload::Vote {
            voter: "b@x".into(),
            voted: true,
            before: VoterSet::new(),
        };
        assert!(store.begin_mutation(MutationKind::Vote, &id, vote).is_ok());
        assert_eq!(store.pending_count(), 2);
    }

    #[test]
    fn refresh_keeps_pending_delete_hidden() {
        let mut store = seeded();
        let id: PostId = "b".into();
        let (index, removed) = store.remove(&id).unwrap();
        store
            .begin_mutation(
                MutationKind::Delete,
                &id,
                MutationPayload::Delete {
                    removed,
                    anchor: Some("c".into()),
                    index,
                },
            )
            .unwrap();

        store.replace_all(
            vec![
                post("c", "a@x", "third", &[], 3),
                post("b", "a@x", "second v2", &["a@x"], 2),
            ],
            &FeedQuery::default(),
        );

        assert_eq!(ids(&store), vec!["c"]);
        let pending = store.pending(&id, MutationKind::Delete).unwrap();
        match &pending.payload {
            MutationPayload::Delete { removed, anchor, .. } => {
                assert_eq!(removed.body, "second v2");
                assert_eq!(anchor.as_ref(), Some(&PostId::from("c")));
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn refresh_reapplies_pending_vote_flip() {
        let mut store = seeded();
        let id: PostId = "a".into();
        store
            .begin_mutation(
                MutationKind::Vote,
                &id,
                MutationPayload::Vote {
                    voter: "b@x".into(),
                    voted: true,
                    before: VoterSet::new(),
                },
            )
            .unwrap();

        store.replace_all(vec![post("a", "b@x", "first", &["c@x"], 1)], &FeedQuery::default());

        let voters: Vec<_> = store.get(&id).unwrap().voters.iter().map(String::from).collect();
        assert_eq!(voters, vec!["c@x", "b@x"]);
    }

    fn voters(store: &FeedStore, id: &str) -> Vec<String> {
        store.get(&id.into()).unwrap().voters.iter().map(String::from).collect()
    }

    fn vote_base(store: &FeedStore, id: &str) -> Vec<String> {
        match &store.pending(&id.into(), MutationKind::Vote).unwrap().payload {
            MutationPayload::Vote { before, .. } => before.iter().map(String::from).collect(),
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn refresh_twice_keeps_pending_vote_intent() {
        let mut store = seeded();
        let id: PostId = "a".into();
        store
            .begin_mutation(
                MutationKind::Vote,
                &id,
                MutationPayload::Vote {
                    voter: "b@x".into(),
                    voted: true,
                    before: VoterSet::new(),
                },
            )
            .unwrap();
        store.set_voters(&id, ["b@x"].into_iter().collect());

        // The server has already counted the vote on both reads.
        for _ in 0..2 {
            store.replace_all(vec![post("a", "b@x", "first", &["b@x"], 1)], &FeedQuery::default());
            assert_eq!(voters(&store, "a"), vec!["b@x"]);
        }
        assert_eq!(vote_base(&store, "a"), vec!["b@x"]);

        store.replace_all(vec![post("a", "b@x", "first", &["c@x"], 1)], &FeedQuery::default());
        assert_eq!(voters(&store, "a"), vec!["c@x", "b@x"]);
        assert_eq!(vote_base(&store, "a"), vec!["c@x"]);
    }

    #[test]
    fn voter_updates_reach_rollback_copy_of_hidden_post() {
        let mut store = seeded();
        let id: PostId = "b".into();
        let (index, removed) = store.remove(&id).unwrap();
        store
            .begin_mutation(
                MutationKind::Delete,
                &id,
                MutationPayload::Delete {
                    removed,
                    anchor: Some("c".into()),
                    index,
                },
            )
            .unwrap();

        let version = store.version();
        assert!(store.apply_vote(&id, "b@x", ["a@x", "b@x"]));
        assert_eq!(store.version(), version);
        assert!(store.get(&id).is_none());

        let Some(PendingMutation {
            payload: MutationPayload::Delete { removed, .. },
            ..
        }) = store.finish_mutation(&id, MutationKind::Delete)
        else {
            panic!("expected pending delete");
        };
        assert_eq!(removed.voters.iter().collect::<Vec<_>>(), vec!["a@x", "b@x"]);
    }

    #[test]
    fn tombstoned_posts_do_not_come_back() {
        let mut store = seeded();
        let id: PostId = "a".into();
        store.tombstone(&id);
        assert!(store.get(&id).is_none());

        store.replace_all(vec![post("a", "b@x", "first", &[], 1)], &FeedQuery::default());
        assert!(store.snapshot().is_empty());
        assert!(!store.upsert(post("a", "b@x", "first", &[], 1)));
    }
}
