// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nexa-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nexa and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use rstest::{fixture, rstest};

use super::*;
use crate::model::{ChatMessage, Role};
use crate::ops::{BranchMode, INTERRUPTED_PLACEHOLDER};
use crate::store::{
    snapshot_to_value, MemoryStorage, StorageError, LEGACY_SNAPSHOT_KEY, WORKSPACE_STATE_KEY,
};
use crate::stream::{scripted_reply, ReplyChunk, ScriptedStreamer};

#[fixture]
fn storage() -> Arc<MemoryStorage> {
    Arc::new(MemoryStorage::new())
}

fn instant() -> Arc<ScriptedStreamer> {
    Arc::new(ScriptedStreamer::new())
}

fn slow() -> Arc<ScriptedStreamer> {
    Arc::new(ScriptedStreamer::new().with_chunk_delay(Duration::from_millis(20)))
}

fn root() -> NodeId {
    NodeId::new("root").expect("node id")
}

fn message<'a>(session: &'a WorkspaceSession, id: &MessageId) -> &'a ChatMessage {
    session
        .active_snapshot()
        .and_then(|snapshot| snapshot.find_message(id))
        .expect("message exists")
}

struct RefusingStorage;

impl Storage for RefusingStorage {
    fn get_item(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Ok(None)
    }

    fn set_item(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Poisoned)
    }

    fn remove_item(&self, _key: &str) -> Result<(), StorageError> {
        Ok(())
    }
}

/// Yields its chunks and then ends without the closing `done` chunk.
struct TruncatedStreamer {
    chunks: Vec<&'static str>,
}

impl ReplyStreamer for TruncatedStreamer {
    fn stream_reply(&self, _request: ReplyRequest, _cancel: CancellationToken) -> ReplyStream {
        let chunks: Vec<Result<ReplyChunk, StreamError>> = self
            .chunks
            .iter()
            .map(|delta| {
                Ok(ReplyChunk {
                    delta: (*delta).to_owned(),
                    done: false,
                })
            })
            .collect();
        futures::stream::iter(chunks).boxed()
    }
}

#[rstest]
fn opening_empty_storage_seeds_and_persists(storage: Arc<MemoryStorage>) {
    let session = WorkspaceSession::open(storage.clone(), instant());

    assert_eq!(session.state().conversations().len(), 1);
    assert!(session.last_save_succeeded());
    assert!(session.is_idle());
    let stored = load_workspace_state(storage.as_ref()).expect("stored workspace");
    assert_eq!(stored.active_conversation_id(), session.active_conversation_id());
}

#[test]
fn opening_legacy_storage_migrates_it() {
    let legacy = crate::model::fixtures::linear_snapshot(&[("Where do I start?", "Here.")]);
    let raw = snapshot_to_value(&legacy).expect("encode").to_string();
    let storage = Arc::new(MemoryStorage::with_items([(LEGACY_SNAPSHOT_KEY, raw)]));

    let session = WorkspaceSession::open(storage.clone(), instant());
    assert_eq!(session.active_snapshot(), Some(&legacy));
    assert_eq!(storage.keys(), vec![WORKSPACE_STATE_KEY.to_owned()]);
}

#[rstest]
#[tokio::test]
async fn sent_message_streams_a_complete_reply(storage: Arc<MemoryStorage>) {
    let mut session = WorkspaceSession::open(storage.clone(), instant());

    let key = session.send_message("How do I read a paper quickly?").expect("send");
    assert!(message(&session, &key.message_id).is_streaming());
    assert_eq!(session.in_flight().collect::<Vec<_>>(), vec![&key]);

    session.run_until_idle().await;
    let reply = message(&session, &key.message_id);
    assert!(!reply.is_streaming());
    assert_eq!(reply.content(), scripted_reply("How do I read a paper quickly?", 0));
    assert!(session.is_idle());

    let conversation = session.state().active_conversation().expect("active");
    assert_eq!(conversation.title(), "How do I read a paper quic...");

    let stored = load_workspace_state(storage.as_ref()).expect("stored");
    let stored_reply = stored
        .active_conversation()
        .and_then(|conversation| conversation.snapshot().find_message(&key.message_id))
        .expect("stored reply");
    assert_eq!(stored_reply.content(), reply.content());
    assert!(!stored_reply.is_streaming());
}

#[rstest]
#[tokio::test]
async fn concurrent_replies_stay_on_their_own_messages(storage: Arc<MemoryStorage>) {
    let mut session = WorkspaceSession::open(storage, instant());

    let first = session.send_message("first topic").expect("send");
    let second = session.send_message("second topic").expect("send");
    session.run_until_idle().await;

    assert_eq!(
        message(&session, &first.message_id).content(),
        scripted_reply("first topic", 0)
    );
    assert_eq!(
        message(&session, &second.message_id).content(),
        scripted_reply("second topic", 0)
    );
}

#[rstest]
#[tokio::test]
async fn retry_streams_a_new_variant_with_prior_replies(storage: Arc<MemoryStorage>) {
    let mut session = WorkspaceSession::open(storage, instant());
    let first = session.send_message("Explain branching").expect("send");
    session.run_until_idle().await;
    let prompt_id = message(&session, &first.message_id)
        .reply_to_message_id()
        .cloned()
        .expect("prompt link");

    let retried = session.retry(&root(), &prompt_id).expect("retry");
    session.run_until_idle().await;

    let variant = message(&session, &retried.message_id);
    assert_eq!(variant.retry_index(), Some(2));
    assert_eq!(variant.content(), scripted_reply("Explain branching", 1));

    let roles: Vec<Role> = session
        .active_snapshot()
        .expect("snapshot")
        .messages(&root())
        .iter()
        .map(ChatMessage::role)
        .collect();
    assert_eq!(roles, vec![Role::User, Role::Assistant, Role::Assistant]);
}

#[rstest]
#[tokio::test]
async fn cancelled_reply_is_marked_interrupted(storage: Arc<MemoryStorage>) {
    let mut session = WorkspaceSession::open(storage, slow());
    let key = session.send_message("take your time").expect("send");

    assert!(session.cancel_stream(&key));
    let update = session.next_update().await.expect("update");
    assert_eq!(
        update,
        StreamUpdate::Finished {
            key: key.clone(),
            outcome: StreamOutcome::Cancelled,
        }
    );

    let reply = message(&session, &key.message_id);
    assert!(!reply.is_streaming());
    assert_eq!(reply.content(), INTERRUPTED_PLACEHOLDER);
    assert!(!session.cancel_stream(&key));
    assert_eq!(session.next_update().await, None);
}

#[rstest]
#[tokio::test]
async fn failed_reply_keeps_partial_content(storage: Arc<MemoryStorage>) {
    let streamer = Arc::new(ScriptedStreamer::new().failing_after(1));
    let mut session = WorkspaceSession::open(storage, streamer);
    let key = session.send_message("partial please").expect("send");

    let request = ReplyRequest {
        conversation_id: key.conversation_id.clone(),
        prompt: "partial please".to_owned(),
        prior_replies: Vec::new(),
        provider_url: String::new(),
        api_key: String::new(),
    };
    let first_chunk = ScriptedStreamer::chunks_for(&request).remove(0);

    session.run_until_idle().await;
    let reply = message(&session, &key.message_id);
    assert!(!reply.is_streaming());
    assert_eq!(reply.content(), first_chunk);
}

#[rstest]
#[case::nothing_arrived(vec![], INTERRUPTED_PLACEHOLDER)]
#[case::partial_text(vec!["Half ", "a thought"], "Half a thought")]
#[tokio::test]
async fn stream_ending_without_done_is_a_failure(
    storage: Arc<MemoryStorage>,
    #[case] chunks: Vec<&'static str>,
    #[case] expected: &str,
) {
    let mut session = WorkspaceSession::open(storage, Arc::new(TruncatedStreamer { chunks }));
    let key = session.send_message("hi").expect("send");

    let mut finished = None;
    while let Some(update) = session.next_update().await {
        if let StreamUpdate::Finished { outcome, .. } = update {
            finished = Some(outcome);
        }
    }

    assert_eq!(finished, Some(StreamOutcome::Failed));
    let reply = message(&session, &key.message_id);
    assert!(!reply.is_streaming());
    assert_eq!(reply.content(), expected);
}

#[rstest]
#[tokio::test]
async fn branching_mid_stream_keeps_the_reply_streaming(storage: Arc<MemoryStorage>) {
    let mut session = WorkspaceSession::open(storage, slow());
    let key = session.send_message("Explain branching").expect("send");
    let first = session.next_update().await.expect("first chunk");
    assert!(matches!(first, StreamUpdate::Delta { .. }));

    let prompt_id = message(&session, &key.message_id)
        .reply_to_message_id()
        .cloned()
        .expect("prompt link");
    let started = session
        .branch(&BranchRequest {
            mode: BranchMode::Clone,
            source_node_id: root(),
            source_message_id: prompt_id,
        })
        .expect("branch");
    assert_eq!(started.stream, None);
    assert!(message(&session, &key.message_id).is_streaming());
    assert_eq!(session.in_flight().collect::<Vec<_>>(), vec![&key]);

    session.run_until_idle().await;
    let reply = message(&session, &key.message_id);
    assert!(!reply.is_streaming());
    assert_eq!(reply.content(), scripted_reply("Explain branching", 0));

    let snapshot = session.active_snapshot().expect("snapshot");
    assert!(snapshot.is_well_formed_tree());
    assert_eq!(snapshot.active_node_id(), &started.node_id);
    assert!(snapshot
        .messages(&started.node_id)
        .iter()
        .all(|copied| !copied.is_streaming()));
}

#[rstest]
#[tokio::test]
async fn selection_branch_streams_its_follow_up(storage: Arc<MemoryStorage>) {
    let mut session = WorkspaceSession::open(storage, instant());
    let first = session.send_message("What is a literature matrix?").expect("send");
    session.run_until_idle().await;

    let request = BranchRequest {
        mode: BranchMode::Selection {
            text: "the original question".to_owned(),
        },
        source_node_id: root(),
        source_message_id: first.message_id.clone(),
    };
    let started = session.branch(&request).expect("branch");
    let stream = started.stream.clone().expect("follow-up stream");
    session.run_until_idle().await;

    let snapshot = session.active_snapshot().expect("snapshot");
    assert_eq!(snapshot.active_node_id(), &started.node_id);
    assert!(snapshot.is_well_formed_tree());
    let bucket = snapshot.messages(&started.node_id);
    let last = bucket.last().expect("reply");
    assert_eq!(last.id(), &stream.message_id);
    assert!(!last.is_streaming());
    assert!(!last.content().is_empty());
}

#[rstest]
#[tokio::test]
async fn clone_branch_does_not_stream(storage: Arc<MemoryStorage>) {
    let mut session = WorkspaceSession::open(storage, instant());
    let first = session.send_message("Clone me").expect("send");
    session.run_until_idle().await;

    let started = session
        .branch(&BranchRequest {
            mode: BranchMode::Clone,
            source_node_id: root(),
            source_message_id: first.message_id,
        })
        .expect("branch");
    assert_eq!(started.stream, None);
    assert!(session.is_idle());
}

#[rstest]
#[tokio::test]
async fn deleting_a_conversation_detaches_its_streams(storage: Arc<MemoryStorage>) {
    let mut session = WorkspaceSession::open(storage, slow());
    let doomed = session.active_conversation_id().clone();
    session.send_message("never finishes").expect("send");
    let kept = session.create_conversation();

    session.delete_conversation(&doomed).expect("delete");
    assert!(session.is_idle());
    assert_eq!(session.active_conversation_id(), &kept);
    assert!(session.state().conversation(&doomed).is_none());
    assert_eq!(session.next_update().await, None);
}

#[rstest]
#[tokio::test]
async fn shutdown_finalizes_every_stream(storage: Arc<MemoryStorage>) {
    let mut session = WorkspaceSession::open(storage.clone(), slow());
    let first = session.send_message("one").expect("send");
    let second = session.send_message("two").expect("send");

    session.shutdown().await;
    assert!(session.is_idle());
    for key in [&first, &second] {
        let reply = message(&session, &key.message_id);
        assert!(!reply.is_streaming());
        assert_eq!(reply.content(), INTERRUPTED_PLACEHOLDER);
    }

    let stored = load_workspace_state(storage.as_ref()).expect("stored");
    assert_eq!(stored.active_conversation(), session.state().active_conversation());
}

#[rstest]
fn conversation_and_note_edits_are_persisted(storage: Arc<MemoryStorage>) {
    let mut session = WorkspaceSession::open(storage.clone(), instant());
    let id = session.active_conversation_id().clone();

    session.rename_conversation(&id, "Reading group").expect("rename");
    session
        .update_model_provider(ModelProviderSettings {
            provider_url: "http://localhost:8080/v1".to_owned(),
            api_key: "sk-local".to_owned(),
        })
        .expect("settings");
    session
        .apply(&[SnapshotOp::AddManualTag {
            name: "papers".to_owned(),
        }])
        .expect("tag");

    let stored = load_workspace_state(storage.as_ref()).expect("stored");
    assert_eq!(stored.conversation(&id).expect("conversation").title(), "Reading group");
    assert_eq!(stored.model_provider().provider_url, "http://localhost:8080/v1");
    assert_eq!(
        stored
            .active_conversation()
            .expect("active")
            .snapshot()
            .conversation_tags()
            .len(),
        1
    );

    assert_eq!(
        session.rename_conversation(&id, " "),
        Err(OpError::Empty { field: "title" })
    );
}

#[rstest]
#[tokio::test]
async fn notes_point_at_streamed_messages(storage: Arc<MemoryStorage>) {
    let mut session = WorkspaceSession::open(storage.clone(), instant());
    let key = session.send_message("note-worthy").expect("send");
    session.run_until_idle().await;

    let note_id = session
        .add_note(NewNote {
            content: "worth keeping".to_owned(),
            source_conversation_id: key.conversation_id.clone(),
            source_node_id: root(),
            source_message_id: key.message_id.clone(),
        })
        .expect("note");
    let stored = load_workspace_state(storage.as_ref()).expect("stored");
    assert_eq!(stored.notes().len(), 1);

    session.remove_note(&note_id).expect("remove");
    assert!(session.state().notes().is_empty());
}

#[test]
fn write_failures_keep_the_session_usable() {
    let mut session = WorkspaceSession::open(Arc::new(RefusingStorage), instant());
    assert!(!session.last_save_succeeded());

    let id = session.create_conversation();
    assert_eq!(session.active_conversation_id(), &id);
    assert_eq!(session.state().conversations().len(), 2);
    assert!(!session.last_save_succeeded());
}

#[rstest]
fn reset_replaces_the_workspace(storage: Arc<MemoryStorage>) {
    let mut session = WorkspaceSession::open(storage.clone(), instant());
    let before = session.active_conversation_id().clone();
    session.create_conversation();

    session.reset();
    assert_eq!(session.state().conversations().len(), 1);
    assert_ne!(session.active_conversation_id(), &before);
    let stored = load_workspace_state(storage.as_ref()).expect("stored");
    assert_eq!(stored.active_conversation_id(), session.active_conversation_id());
}
