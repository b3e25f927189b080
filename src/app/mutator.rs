//! Optimistic writes and their reconciliation.
//!
//! [`OptimisticMutator`] turns user write intents into [`RemoteRequest`]s and
//! applies the matching responses to the [`FeedStore`]:
//!
//! | Write  | Before the response            | Success                  | Failure                     |
//! |--------|--------------------------------|--------------------------|-----------------------------|
//! | vote   | voter membership flipped       | server voter set applied | exact pre-toggle set back   |
//! | edit   | nothing (text in draft buffer) | post upserted, draft dropped | draft kept              |
//! | delete | post removed                   | post tombstoned          | post restored in place      |
//! | create | nothing (text in compose draft)| server post inserted     | compose draft kept          |
//!
//! Same-kind writes on the same post are rejected while one is outstanding;
//! writes on different posts, or of different kinds, are independent.

use super::store::{FeedStore, MutationPayload};
use crate::domain::{FeedError, Identity, MutationKind, Post, PostId, Result, VoterSet};
use crate::worker::messages::{Outcome, RemoteRequest};
use std::collections::HashMap;

/// Issues optimistic writes and settles them against the store.
///
/// Holds the text the user is typing: per-post edit drafts, the compose box,
/// and the text of creates awaiting the server.
#[derive(Debug, Clone, Default)]
pub struct OptimisticMutator {
    drafts: HashMap<PostId, String>,
    compose: String,
    /// Text of each in-flight create, by request id.
    creates: HashMap<u64, String>,
    next_create: u64,
}

impl OptimisticMutator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ---- vote -------------------------------------------------------------

    /// Flips `voter`'s membership locally and returns the toggle request.
    ///
    /// # Errors
    ///
    /// [`FeedError::UnknownPost`] if the post is not listed,
    /// [`FeedError::MutationPending`] if a toggle on it is outstanding.
    pub fn toggle_vote(&mut self, store: &mut FeedStore, id: &PostId, voter: &Identity) -> Result<RemoteRequest> {
        let before = store
            .get(id)
            .map(|p| p.voters.clone())
            .ok_or_else(|| FeedError::UnknownPost(id.clone()))?;

        let mut flipped = before.clone();
        let voted = flipped.toggle(&voter.email);

        store.begin_mutation(
            MutationKind::Vote,
            id,
            MutationPayload::Vote {
                voter: voter.email.clone(),
                voted,
                before,
            },
        )?;
        store.set_voters(id, flipped);

        tracing::debug!(id = %id, voted, "optimistic vote applied");
        Ok(RemoteRequest::toggle_vote(id.clone()))
    }

    /// Reconciles a toggle response.
    ///
    /// # Errors
    ///
    /// Returns the remote failure after rolling the voter set back.
    pub fn on_vote_result(&mut self, store: &mut FeedStore, id: &PostId, outcome: Outcome<VoterSet>) -> Result<()> {
        let Some(pending) = store.finish_mutation(id, MutationKind::Vote) else {
            tracing::debug!(id = %id, "vote response without pending toggle");
            return Ok(());
        };
        let MutationPayload::Vote { voter, before, .. } = pending.payload else {
            return Ok(());
        };

        match outcome {
            Ok(voters) => {
                store.apply_vote(id, &voter, voters.iter());
                Ok(())
            }
            Err(err) => {
                tracing::warn!(id = %id, error = %err, "vote failed, rolling back");
                store.set_voters(id, before);
                Err(err)
            }
        }
    }

    // ---- edit -------------------------------------------------------------

    /// Opens a draft for `id` seeded with the current text.
    ///
    /// An existing draft is kept so text from a failed save is not lost.
    ///
    /// # Errors
    ///
    /// [`FeedError::UnknownPost`] or [`FeedError::Validation`] if `user` does
    /// not own the post.
    pub fn begin_edit(&mut self, store: &FeedStore, id: &PostId, user: &Identity) -> Result<&str> {
        let post = owned_post(store, id, user)?;
        let draft = self
            .drafts
            .entry(id.clone())
            .or_insert_with(|| post.body.clone());
        Ok(draft.as_str())
    }

    /// Replaces the draft for `id`, opening one if needed.
    pub fn update_draft(&mut self, id: &PostId, text: impl Into<String>) {
        self.drafts.insert(id.clone(), text.into());
    }

    /// Closes the draft for `id` and returns its text.
    pub fn discard_draft(&mut self, id: &PostId) -> Option<String> {
        self.drafts.remove(id)
    }

    /// Open draft for `id`, if any.
    #[must_use]
    pub fn draft(&self, id: &PostId) -> Option<&str> {
        self.drafts.get(id).map(String::as_str)
    }

    /// Sends the draft for `id`. The store is untouched until confirmation.
    ///
    /// # Errors
    ///
    /// [`FeedError::Validation`] if there is no draft, it is blank, or `user`
    /// does not own the post; [`FeedError::MutationPending`] if a save for
    /// this post is outstanding.
    pub fn save_edit(&mut self, store: &mut FeedStore, id: &PostId, user: &Identity) -> Result<RemoteRequest> {
        owned_post(store, id, user)?;
        let text = self
            .drafts
            .get(id)
            .cloned()
            .ok_or_else(|| FeedError::Validation(format!("no draft for post {id}")))?;
        if text.trim().is_empty() {
            return Err(FeedError::Validation("post text is empty".to_string()));
        }

        store.begin_mutation(MutationKind::Edit, id, MutationPayload::Edit { text: text.clone() })?;
        Ok(RemoteRequest::edit_post(id.clone(), text))
    }

    /// Reconciles an edit response.
    ///
    /// # Errors
    ///
    /// Returns the remote failure; the draft stays for a retry.
    pub fn on_edit_result(&mut self, store: &mut FeedStore, id: &PostId, outcome: Outcome<Option<Post>>) -> Result<()> {
        let Some(pending) = store.finish_mutation(id, MutationKind::Edit) else {
            tracing::debug!(id = %id, "edit response without pending save");
            return Ok(());
        };
        let MutationPayload::Edit { text } = pending.payload else {
            return Ok(());
        };

        match outcome {
            Ok(echoed) => {
                let updated = echoed.or_else(|| {
                    store.get(id).cloned().map(|mut post| {
                        post.body.clone_from(&text);
                        post
                    })
                });
                if let Some(post) = updated {
                    store.upsert(post);
                }
                // Text typed after the save started is newer than what was sent.
                if self.drafts.get(id) == Some(&text) {
                    self.drafts.remove(id);
                }
                Ok(())
            }
            Err(err) => {
                tracing::warn!(id = %id, error = %err, "edit failed, keeping draft");
                self.drafts.entry(id.clone()).or_insert(text);
                Err(err)
            }
        }
    }

    // ---- delete -----------------------------------------------------------

    /// Removes `id` immediately and returns the delete request.
    ///
    /// # Errors
    ///
    /// [`FeedError::UnknownPost`], [`FeedError::Validation`] if `user` does not
    /// own the post, [`FeedError::MutationPending`] if a delete is outstanding.
    pub fn delete_post(&mut self, store: &mut FeedStore, id: &PostId, user: &Identity) -> Result<RemoteRequest> {
        owned_post(store, id, user)?;
        if store.is_pending(id, MutationKind::Delete) {
            return Err(FeedError::MutationPending {
                id: id.clone(),
                kind: MutationKind::Delete,
            });
        }

        let anchor = store.predecessor(id);
        let Some((index, removed)) = store.remove(id) else {
            return Err(FeedError::UnknownPost(id.clone()));
        };
        store.begin_mutation(
            MutationKind::Delete,
            id,
            MutationPayload::Delete {
                removed,
                anchor,
                index,
            },
        )?;

        tracing::debug!(id = %id, index, "optimistic delete applied");
        Ok(RemoteRequest::delete_post(id.clone()))
    }

    /// Reconciles a delete response.
    ///
    /// # Errors
    ///
    /// Returns the remote failure after the post has been restored.
    pub fn on_delete_result(&mut self, store: &mut FeedStore, id: &PostId, outcome: Outcome<()>) -> Result<()> {
        let Some(pending) = store.finish_mutation(id, MutationKind::Delete) else {
            tracing::debug!(id = %id, "delete response without pending delete");
            return Ok(());
        };
        let MutationPayload::Delete {
            removed,
            anchor,
            index,
        } = pending.payload
        else {
            return Ok(());
        };

        match outcome {
            Ok(()) => {
                store.tombstone(id);
                self.drafts.remove(id);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(id = %id, error = %err, "delete failed, restoring post");
                store.restore(removed, anchor.as_ref(), index);
                Err(err)
            }
        }
    }

    // ---- create -----------------------------------------------------------

    /// Replaces the compose box text.
    pub fn set_compose(&mut self, text: impl Into<String>) {
        self.compose = text.into();
    }

    /// Compose box text. Holds the text of a failed create.
    #[must_use]
    pub fn compose(&self) -> &str {
        &self.compose
    }

    /// Number of creates awaiting the server.
    #[must_use]
    pub fn creates_in_flight(&self) -> usize {
        self.creates.len()
    }

    /// Returns the create request. Nothing is shown until the server answers.
    ///
    /// # Errors
    ///
    /// [`FeedError::Validation`] if `text` is blank.
    pub fn create_post(&mut self, text: &str, author: &Identity) -> Result<RemoteRequest> {
        if text.trim().is_empty() {
            return Err(FeedError::Validation("post text is empty".to_string()));
        }
        self.next_create += 1;
        let request_id = self.next_create;
        self.creates.insert(request_id, text.to_string());
        self.compose = text.to_string();

        Ok(RemoteRequest::create_post(request_id, text.to_string(), author.clone()))
    }

    /// Reconciles a create response.
    ///
    /// # Errors
    ///
    /// Returns the remote failure; the compose draft holds the text.
    pub fn on_create_result(&mut self, store: &mut FeedStore, request_id: u64, outcome: Outcome<Post>) -> Result<()> {
        let text = self.creates.remove(&request_id).unwrap_or_default();
        match outcome {
            Ok(post) => {
                tracing::debug!(id = %post.id, "created post confirmed");
                store.upsert(post);
                if self.compose == text {
                    self.compose.clear();
                }
                Ok(())
            }
            Err(err) => {
                tracing::warn!(request_id, error = %err, "create failed, keeping text");
                if self.compose.is_empty() {
                    self.compose = text;
                }
                Err(err)
            }
        }
    }
}

/// Looks up `id` and checks that `user` authored it.
fn owned_post<'a>(store: &'a FeedStore, id: &PostId, user: &Identity) -> Result<&'a Post> {
    let post = store.get(id).ok_or_else(|| FeedError::UnknownPost(id.clone()))?;
    if !post.is_owned_by(&user.email) {
        return Err(FeedError::Validation(format!("post {id} belongs to another user")));
    }
    Ok(post)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::post::fixtures::post;
    use crate::domain::FeedQuery;

    fn me() -> Identity {
        Identity::new("b@x", "b")
    }

    fn store_with(posts: Vec<Post>) -> FeedStore {
        let mut store = FeedStore::new();
        store.replace_all(posts, &FeedQuery::default());
        store
    }

    fn voters_of(store: &FeedStore, id: &str) -> Vec<String> {
        store
            .get(&id.into())
            .unwrap()
            .voters
            .iter()
            .map(String::from)
            .collect()
    }

    fn network_down() -> FeedError {
        FeedError::NetworkFailure("connection refused".to_string())
    }

    #[test]
    fn vote_is_flipped_then_rolled_back_on_failure() {
        let mut store = store_with(vec![post("p", "a@x", "hi", &["a@x"], 1)]);
        let mut mutator = OptimisticMutator::new();
        let id: PostId = "p".into();

        let request = mutator.toggle_vote(&mut store, &id, &me()).unwrap();
        assert!(matches!(request, RemoteRequest::ToggleVote { .. }));
        assert_eq!(voters_of(&store, "p"), vec!["a@x", "b@x"]);

        let result = mutator.on_vote_result(&mut store, &id, Err(network_down()));
        assert_eq!(result, Err(network_down()));
        assert_eq!(voters_of(&store, "p"), vec!["a@x"]);
        assert!(!store.is_pending(&id, MutationKind::Vote));
    }

    #[test]
    fn vote_success_takes_server_set() {
        let mut store = store_with(vec![post("p", "a@x", "hi", &["a@x"], 1)]);
        let mut mutator = OptimisticMutator::new();
        let id: PostId = "p".into();

        mutator.toggle_vote(&mut store, &id, &me()).unwrap();
        // Server disagrees with the optimistic guess.
        let server: VoterSet = ["a@x", "c@x", "c@x"].into_iter().collect();
        mutator.on_vote_result(&mut store, &id, Ok(server)).unwrap();
        assert_eq!(voters_of(&store, "p"), vec!["a@x", "c@x"]);
    }

    #[test]
    fn second_toggle_while_outstanding_is_rejected() {
        let mut store = store_with(vec![post("p", "a@x", "hi", &[], 1), post("q", "a@x", "yo", &[], 0)]);
        let mut mutator = OptimisticMutator::new();
        let id: PostId = "p".into();

        mutator.toggle_vote(&mut store, &id, &me()).unwrap();
        let err = mutator.toggle_vote(&mut store, &id, &me()).unwrap_err();
        assert_eq!(
            err,
            FeedError::MutationPending {
                id: id.clone(),
                kind: MutationKind::Vote
            }
        );
        // Optimistic state from the first toggle is untouched.
        assert_eq!(voters_of(&store, "p"), vec!["b@x"]);
        // Other posts are independent.
        assert!(mutator.toggle_vote(&mut store, &"q".into(), &me()).is_ok());
    }

    #[test]
    fn failed_edit_keeps_canonical_text_and_draft() {
        let mut store = store_with(vec![post("p", "b@x", "old", &[], 1)]);
        let mut mutator = OptimisticMutator::new();
        let id: PostId = "p".into();

        assert_eq!(mutator.begin_edit(&store, &id, &me()).unwrap(), "old");
        mutator.update_draft(&id, "new");
        mutator.save_edit(&mut store, &id, &me()).unwrap();
        assert_eq!(store.get(&id).unwrap().body, "old");

        let err = mutator.on_edit_result(&mut store, &id, Err(FeedError::ServerRejected {
            status: 500,
            message: "boom".into(),
        }));
        assert!(err.is_err());
        assert_eq!(store.get(&id).unwrap().body, "old");
        assert_eq!(mutator.draft(&id), Some("new"));
    }

    #[test]
    fn confirmed_edit_updates_post_and_drops_draft() {
        let mut store = store_with(vec![post("p", "b@x", "old", &["a@x"], 1)]);
        let mut mutator = OptimisticMutator::new();
        let id: PostId = "p".into();

        mutator.update_draft(&id, "new");
        mutator.save_edit(&mut store, &id, &me()).unwrap();
        mutator.on_edit_result(&mut store, &id, Ok(None)).unwrap();

        let edited = store.get(&id).unwrap();
        assert_eq!(edited.body, "new");
        assert_eq!(edited.vote_count(), 1);
        assert_eq!(mutator.draft(&id), None);
    }

    #[test]
    fn draft_typed_during_save_survives_confirmation() {
        let mut store = store_with(vec![post("p", "b@x", "old", &[], 1)]);
        let mut mutator = OptimisticMutator::new();
        let id: PostId = "p".into();

        mutator.update_draft(&id, "new");
        mutator.save_edit(&mut store, &id, &me()).unwrap();
        mutator.update_draft(&id, "newer");
        mutator.on_edit_result(&mut store, &id, Ok(None)).unwrap();

        assert_eq!(store.get(&id).unwrap().body, "new");
        assert_eq!(mutator.draft(&id), Some("newer"));
    }

    #[test]
    fn edit_requires_ownership_and_text() {
        let mut store = store_with(vec![post("p", "a@x", "theirs", &[], 1), post("m", "b@x", "mine", &[], 0)]);
        let mut mutator = OptimisticMutator::new();

        assert!(matches!(
            mutator.begin_edit(&store, &"p".into(), &me()),
            Err(FeedError::Validation(_))
        ));
        mutator.update_draft(&"m".into(), "   ");
        assert!(matches!(
            mutator.save_edit(&mut store, &"m".into(), &me()),
            Err(FeedError::Validation(_))
        ));
        assert!(matches!(
            mutator.save_edit(&mut store, &"nope".into(), &me()),
            Err(FeedError::UnknownPost(_))
        ));
    }

    #[test]
    fn failed_delete_restores_post_in_place() {
        let listed = vec![
            post("c", "b@x", "third", &["a@x"], 3),
            post("b", "b@x", "second", &[], 2),
            post("a", "b@x", "first", &[], 1),
        ];
        let mut store = store_with(listed.clone());
        let mut mutator = OptimisticMutator::new();
        let id: PostId = "b".into();

        mutator.delete_post(&mut store, &id, &me()).unwrap();
        assert!(store.get(&id).is_none());

        let err = mutator.on_delete_result(&mut store, &id, Err(network_down()));
        assert!(err.is_err());
        assert_eq!(store.snapshot().posts(), listed.as_slice());
    }

    #[test]
    fn confirmed_delete_stays_deleted() {
        let mut store = store_with(vec![post("p", "b@x", "bye", &[], 1)]);
        let mut mutator = OptimisticMutator::new();
        let id: PostId = "p".into();

        mutator.delete_post(&mut store, &id, &me()).unwrap();
        mutator.on_delete_result(&mut store, &id, Ok(())).unwrap();
        assert!(store.snapshot().is_empty());

        store.replace_all(vec![post("p", "b@x", "bye", &[], 1)], &FeedQuery::default());
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn edit_confirmed_while_delete_pending_does_not_resurrect() {
        let mut store = store_with(vec![post("p", "b@x", "old", &[], 1)]);
        let mut mutator = OptimisticMutator::new();
        let id: PostId = "p".into();

        mutator.update_draft(&id, "new");
        mutator.save_edit(&mut store, &id, &me()).unwrap();
        mutator.delete_post(&mut store, &id, &me()).unwrap();

        mutator
            .on_edit_result(&mut store, &id, Ok(Some(post("p", "b@x", "new", &[], 1))))
            .unwrap();
        assert!(store.get(&id).is_none());

        // The delete fails: the restored copy carries the confirmed edit.
        let _ = mutator.on_delete_result(&mut store, &id, Err(network_down()));
        assert_eq!(store.get(&id).unwrap().body, "new");
    }

    #[test]
    fn vote_failure_after_refresh_rolls_back_to_fresh_set() {
        let mut store = store_with(vec![post("p", "a@x", "hi", &[], 1)]);
        let mut mutator = OptimisticMutator::new();
        let id: PostId = "p".into();

        mutator.toggle_vote(&mut store, &id, &me()).unwrap();
        store.replace_all(vec![post("p", "a@x", "hi", &["c@x"], 1)], &FeedQuery::default());
        store.replace_all(vec![post("p", "a@x", "hi", &["c@x"], 1)], &FeedQuery::default());
        assert_eq!(voters_of(&store, "p"), vec!["c@x", "b@x"]);

        let _ = mutator.on_vote_result(&mut store, &id, Err(network_down()));
        assert_eq!(voters_of(&store, "p"), vec!["c@x"]);
    }

    #[test]
    fn vote_failure_under_pending_delete_restores_pre_toggle_voters() {
        let mut store = store_with(vec![post("p", "b@x", "mine", &["a@x"], 1)]);
        let mut mutator = OptimisticMutator::new();
        let id: PostId = "p".into();

        mutator.toggle_vote(&mut store, &id, &me()).unwrap();
        mutator.delete_post(&mut store, &id, &me()).unwrap();

        assert!(mutator.on_vote_result(&mut store, &id, Err(network_down())).is_err());
        assert!(mutator.on_delete_result(&mut store, &id, Err(network_down())).is_err());

        assert_eq!(voters_of(&store, "p"), vec!["a@x"]);
    }

    #[test]
    fn vote_success_under_pending_delete_updates_rollback_copy() {
        let mut store = store_with(vec![post("p", "b@x", "mine", &["a@x"], 1)]);
        let mut mutator = OptimisticMutator::new();
        let id: PostId = "p".into();

        mutator.toggle_vote(&mut store, &id, &me()).unwrap();
        mutator.delete_post(&mut store, &id, &me()).unwrap();

        let server: VoterSet = ["a@x", "b@x", "c@x"].into_iter().collect();
        mutator.on_vote_result(&mut store, &id, Ok(server)).unwrap();
        assert!(store.get(&id).is_none());

        let _ = mutator.on_delete_result(&mut store, &id, Err(network_down()));
        assert_eq!(voters_of(&store, "p"), vec!["a@x", "b@x", "c@x"]);
    }

    #[test]
    fn refresh_with_vote_and_delete_pending_keeps_flip_on_hidden_copy() {
        let mut store = store_with(vec![post("p", "b@x", "mine", &["a@x"], 1)]);
        let mut mutator = OptimisticMutator::new();
        let id: PostId = "p".into();

        mutator.toggle_vote(&mut store, &id, &me()).unwrap();
        mutator.delete_post(&mut store, &id, &me()).unwrap();
        store.replace_all(vec![post("p", "b@x", "mine", &["a@x", "c@x"], 1)], &FeedQuery::default());
        assert!(store.get(&id).is_none());

        let _ = mutator.on_delete_result(&mut store, &id, Err(network_down()));
        assert_eq!(voters_of(&store, "p"), vec!["a@x", "c@x", "b@x"]);
        assert!(store.is_pending(&id, MutationKind::Vote));

        let _ = mutator.on_vote_result(&mut store, &id, Err(network_down()));
        assert_eq!(voters_of(&store, "p"), vec!["a@x", "c@x"]);
    }

    #[test]
    fn create_is_not_optimistic_and_keeps_text_on_failure() {
        let mut store = store_with(vec![]);
        let mut mutator = OptimisticMutator::new();

        assert!(matches!(mutator.create_post("  ", &me()), Err(FeedError::Validation(_))));

        let request = mutator.create_post("hello", &me()).unwrap();
        let RemoteRequest::CreatePost { request_id, .. } = request else {
            panic!("expected create request");
        };
        assert!(store.snapshot().is_empty());
        assert_eq!(mutator.creates_in_flight(), 1);

        let _ = mutator.on_create_result(&mut store, request_id, Err(network_down()));
        assert!(store.snapshot().is_empty());
        assert_eq!(mutator.compose(), "hello");
        assert_eq!(mutator.creates_in_flight(), 0);
    }

    #[test]
    fn confirmed_create_appears_and_clears_compose() {
        let mut store = store_with(vec![post("old", "a@x", "x", &[], 1)]);
        let mut mutator = OptimisticMutator::new();

        let RemoteRequest::CreatePost { request_id, .. } = mutator.create_post("hello", &me()).unwrap() else {
            panic!("expected create request");
        };
        mutator
            .on_create_result(&mut store, request_id, Ok(post("srv-1", "b@x", "hello", &[], 9)))
            .unwrap();

        let ids: Vec<_> = store.snapshot().ids().map(ToString::to_string).collect();
        assert_eq!(ids, vec!["srv-1", "old"]);
        assert_eq!(mutator.compose(), "");
    }
}
