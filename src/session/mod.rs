// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nexa-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nexa and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Workspace session: the service object front ends talk to.
//!
//! A session owns the current [`WorkspaceState`], writes it to the injected [`Storage`] after
//! every mutation and drives assistant replies through the injected [`ReplyStreamer`]. Each
//! reply runs as a spawned task that forwards chunks over one channel; the session applies
//! them as [`StreamUpdate`]s when the caller awaits [`WorkspaceSession::next_update`] or
//! [`WorkspaceSession::run_until_idle`].
//!
//! Methods that start a reply must be called from inside a tokio runtime.

use std::collections::HashMap;
use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::model::fixtures::seed_workspace;
use crate::model::{
    timestamp_now, ConversationId, ConversationSnapshot, MessageId, ModelProviderSettings,
    NodeId, NoteId, WorkspaceState,
};
use crate::ops::{
    self, BranchRequest, NewNote, ObjectKind, OpError, PendingReply, SnapshotOp, StreamOutcome,
};
use crate::store::{clear_workspace_state, load_workspace_state, save_workspace_state, Storage};
use crate::stream::{ReplyRequest, ReplyStream, ReplyStreamer, StreamError};

/// Identifies one in-flight reply.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamKey {
    pub conversation_id: ConversationId,
    pub message_id: MessageId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamUpdate {
    Delta { key: StreamKey, delta: String },
    Finished { key: StreamKey, outcome: StreamOutcome },
}

impl StreamUpdate {
    pub fn key(&self) -> &StreamKey {
        match self {
            Self::Delta { key, .. } | Self::Finished { key, .. } => key,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchStarted {
    pub node_id: NodeId,
    /// Set when the branch asks a follow-up and a reply is streaming.
    pub stream: Option<StreamKey>,
}

pub struct WorkspaceSession {
    state: WorkspaceState,
    storage: Arc<dyn Storage>,
    streamer: Arc<dyn ReplyStreamer>,
    in_flight: HashMap<StreamKey, CancellationToken>,
    updates_tx: mpsc::UnboundedSender<StreamUpdate>,
    updates_rx: mpsc::UnboundedReceiver<StreamUpdate>,
    last_save_ok: bool,
}

impl std::fmt::Debug for WorkspaceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkspaceSession")
            .field("state", &self.state)
            .field("in_flight", &self.in_flight.len())
            .field("last_save_ok", &self.last_save_ok)
            .finish_non_exhaustive()
    }
}

impl WorkspaceSession {
    /// Loads the stored workspace (migrating a legacy snapshot when needed) or seeds a new one,
    /// and persists the result. Replies left streaming by an earlier run are finalized as
    /// interrupted.
    pub fn open(storage: Arc<dyn Storage>, streamer: Arc<dyn ReplyStreamer>) -> Self {
        let mut state = match load_workspace_state(storage.as_ref()) {
            Some(state) => state,
            None => {
                tracing::info!("no stored workspace, seeding a new one");
                seed_workspace(&timestamp_now())
            }
        };
        let settled = settle_orphaned_streams(&mut state);
        if settled > 0 {
            tracing::info!(settled, "finalized replies left streaming by an earlier run");
        }
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        let mut session = Self {
            state,
            storage,
            streamer,
            in_flight: HashMap::new(),
            updates_tx,
            updates_rx,
            last_save_ok: true,
        };
        session.persist();
        session
    }

    pub fn state(&self) -> &WorkspaceState {
        &self.state
    }

    pub fn active_conversation_id(&self) -> &ConversationId {
        self.state.active_conversation_id()
    }

    pub fn active_snapshot(&self) -> Option<&ConversationSnapshot> {
        self.state
            .active_conversation()
            .map(|conversation| conversation.snapshot())
    }

    /// Whether the most recent write reached storage. The session keeps working in memory
    /// either way.
    pub fn last_save_succeeded(&self) -> bool {
        self.last_save_ok
    }

    pub fn in_flight(&self) -> impl Iterator<Item = &StreamKey> {
        self.in_flight.keys()
    }

    pub fn is_idle(&self) -> bool {
        self.in_flight.is_empty()
    }

    fn persist(&mut self) -> bool {
        self.last_save_ok = save_workspace_state(&self.state, self.storage.as_ref());
        self.last_save_ok
    }

    fn commit(&mut self, next: WorkspaceState) {
        self.state = next;
        self.persist();
    }

    fn active_parts(&self) -> Result<(ConversationId, &ConversationSnapshot), OpError> {
        let id = self.state.active_conversation_id();
        let conversation = self
            .state
            .active_conversation()
            .ok_or_else(|| OpError::not_found(ObjectKind::Conversation, id))?;
        Ok((id.clone(), conversation.snapshot()))
    }

    fn store_snapshot(
        &mut self,
        conversation_id: &ConversationId,
        snapshot: ConversationSnapshot,
    ) -> Result<(), OpError> {
        let next =
            ops::replace_snapshot(&self.state, conversation_id, snapshot, &timestamp_now())?;
        self.commit(next);
        Ok(())
    }

    /// Appends a user message to the active node and starts streaming the reply.
    pub fn send_message(&mut self, content: &str) -> Result<StreamKey, OpError> {
        let (conversation_id, snapshot) = self.active_parts()?;
        let appended = ops::append_user_message(snapshot, content)?;
        self.store_snapshot(&conversation_id, appended.snapshot)?;
        Ok(self.start_stream(conversation_id, appended.reply))
    }

    /// Branches the active conversation; a selection branch also starts streaming its reply.
    pub fn branch(&mut self, request: &BranchRequest) -> Result<BranchStarted, OpError> {
        let (conversation_id, snapshot) = self.active_parts()?;
        let created = ops::create_branch(snapshot, request, &timestamp_now())?;
        self.store_snapshot(&conversation_id, created.snapshot)?;
        self.cancel_vanished_streams(&conversation_id);
        let stream = created
            .reply
            .map(|reply| self.start_stream(conversation_id, reply));
        Ok(BranchStarted {
            node_id: created.node_id,
            stream,
        })
    }

    pub fn retry(
        &mut self,
        node_id: &NodeId,
        reply_to_message_id: &MessageId,
    ) -> Result<StreamKey, OpError> {
        let (conversation_id, snapshot) = self.active_parts()?;
        let started = ops::retry(snapshot, node_id, reply_to_message_id)?;
        self.store_snapshot(&conversation_id, started.snapshot)?;
        Ok(self.start_stream(conversation_id, started.reply))
    }

    /// Applies navigation, geometry and tag edits to the active conversation as one batch.
    pub fn apply(&mut self, snapshot_ops: &[SnapshotOp]) -> Result<(), OpError> {
        let (conversation_id, snapshot) = self.active_parts()?;
        let next = ops::apply_ops(snapshot, snapshot_ops)?;
        self.store_snapshot(&conversation_id, next)
    }

    pub fn create_conversation(&mut self) -> ConversationId {
        let (next, id) = ops::create_conversation(&self.state, &timestamp_now());
        self.commit(next);
        id
    }

    pub fn rename_conversation(
        &mut self,
        id: &ConversationId,
        title: &str,
    ) -> Result<(), OpError> {
        let next = ops::rename_conversation(&self.state, id, title)?;
        self.commit(next);
        Ok(())
    }

    /// Deletes a conversation and cancels its in-flight replies.
    pub fn delete_conversation(&mut self, id: &ConversationId) -> Result<(), OpError> {
        let next = ops::delete_conversation(&self.state, id, &timestamp_now())?;
        self.in_flight.retain(|key, token| {
            let keep = &key.conversation_id != id;
            if !keep {
                token.cancel();
            }
            keep
        });
        self.commit(next);
        Ok(())
    }

    pub fn set_active_conversation(&mut self, id: &ConversationId) -> Result<(), OpError> {
        let next = ops::set_active_conversation(&self.state, id)?;
        self.commit(next);
        Ok(())
    }

    pub fn add_note(&mut self, note: NewNote) -> Result<NoteId, OpError> {
        let (next, id) = ops::add_note(&self.state, note, &timestamp_now())?;
        self.commit(next);
        Ok(id)
    }

    pub fn remove_note(&mut self, id: &NoteId) -> Result<(), OpError> {
        let next = ops::remove_note(&self.state, id)?;
        self.commit(next);
        Ok(())
    }

    pub fn update_model_provider(
        &mut self,
        settings: ModelProviderSettings,
    ) -> Result<(), OpError> {
        let next = ops::update_model_provider(&self.state, settings)?;
        self.commit(next);
        Ok(())
    }

    /// Cancels every reply, wipes both storage keys and starts over with a seeded workspace.
    pub fn reset(&mut self) {
        self.cancel_all();
        clear_workspace_state(self.storage.as_ref());
        self.state = seed_workspace(&timestamp_now());
        self.persist();
    }

    fn start_stream(
        &mut self,
        conversation_id: ConversationId,
        reply: PendingReply,
    ) -> StreamKey {
        let key = StreamKey {
            conversation_id: conversation_id.clone(),
            message_id: reply.message_id,
        };
        let provider = self.state.model_provider();
        let request = ReplyRequest {
            conversation_id,
            prompt: reply.prompt,
            prior_replies: reply.prior_replies,
            provider_url: provider.provider_url.clone(),
            api_key: provider.api_key.clone(),
        };

        let cancel = CancellationToken::new();
        let stream = self.streamer.stream_reply(request, cancel.clone());
        let scope = tracing::debug_span!("stream", message_id = %key.message_id);
        tokio::spawn(
            forward_stream(key.clone(), stream, cancel.clone(), self.updates_tx.clone())
                .instrument(scope),
        );
        tracing::debug!(
            conversation_id = %key.conversation_id,
            message_id = %key.message_id,
            "reply stream started"
        );
        self.in_flight.insert(key.clone(), cancel);
        key
    }

    /// Requests cancellation; the reply is finalized when its `Finished` update arrives.
    pub fn cancel_stream(&mut self, key: &StreamKey) -> bool {
        match self.in_flight.get(key) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancels streams whose message is gone from its conversation, for example an older retry
    /// variant dropped while the conversation was split into turns.
    fn cancel_vanished_streams(&mut self, conversation_id: &ConversationId) {
        let Some(conversation) = self.state.conversation(conversation_id) else {
            return;
        };
        for (key, token) in &self.in_flight {
            if &key.conversation_id == conversation_id
                && conversation.snapshot().find_message(&key.message_id).is_none()
            {
                tracing::debug!(
                    message_id = %key.message_id,
                    "cancelling stream of a dropped reply"
                );
                token.cancel();
            }
        }
    }

    fn cancel_all(&mut self) {
        for token in self.in_flight.values() {
            token.cancel();
        }
    }

    /// Waits for the next stream update, applies it and returns it. Returns `None` right away
    /// when nothing is streaming.
    pub async fn next_update(&mut self) -> Option<StreamUpdate> {
        if self.in_flight.is_empty() {
            return None;
        }
        let update = self.updates_rx.recv().await?;
        self.apply_update(&update);
        Some(update)
    }

    /// Applies updates until no reply is in flight.
    pub async fn run_until_idle(&mut self) {
        while self.next_update().await.is_some() {}
    }

    /// Cancels every in-flight reply and waits until each one has been finalized.
    pub async fn shutdown(&mut self) {
        self.cancel_all();
        self.run_until_idle().await;
    }

    fn apply_update(&mut self, update: &StreamUpdate) {
        let key = update.key();
        if !self.in_flight.contains_key(key) {
            tracing::debug!(message_id = %key.message_id, "dropping update for a detached stream");
            return;
        }
        let Some(conversation) = self.state.conversation(&key.conversation_id) else {
            self.in_flight.remove(key);
            return;
        };

        let snapshot = match update {
            StreamUpdate::Delta { delta, .. } => {
                ops::apply_stream_delta(conversation.snapshot(), &key.message_id, delta)
            }
            StreamUpdate::Finished { outcome, .. } => {
                self.in_flight.remove(key);
                tracing::debug!(
                    conversation_id = %key.conversation_id,
                    message_id = %key.message_id,
                    ?outcome,
                    "reply stream finished"
                );
                ops::finish_stream(conversation.snapshot(), &key.message_id, *outcome)
            }
        };

        let conversation_id = key.conversation_id.clone();
        if let Err(error) = self.store_snapshot(&conversation_id, snapshot) {
            tracing::warn!(%error, "failed to store streamed reply");
        }
    }
}

impl Drop for WorkspaceSession {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

/// Finalizes messages still flagged as streaming; no task is left to finish them.
fn settle_orphaned_streams(state: &mut WorkspaceState) -> usize {
    let mut settled = 0;
    for conversation in state.conversations_mut() {
        let streaming: Vec<MessageId> = conversation
            .snapshot()
            .messages_by_node()
            .values()
            .flatten()
            .filter(|message| message.is_streaming())
            .map(|message| message.id().clone())
            .collect();
        if streaming.is_empty() {
            continue;
        }
        let mut snapshot = conversation.snapshot().clone();
        for message_id in &streaming {
            snapshot = ops::finish_stream(&snapshot, message_id, StreamOutcome::Cancelled);
        }
        conversation.set_snapshot(snapshot);
        settled += streaming.len();
    }
    settled
}

/// Polls one reply stream and forwards its chunks until it ends, fails or is cancelled.
async fn forward_stream(
    key: StreamKey,
    mut stream: ReplyStream,
    cancel: CancellationToken,
    updates: mpsc::UnboundedSender<StreamUpdate>,
) {
    let outcome = loop {
        let item = tokio::select! {
            _ = cancel.cancelled() => break StreamOutcome::Cancelled,
            item = stream.next() => item,
        };
        match item {
            Some(Ok(chunk)) if chunk.done => break StreamOutcome::Completed,
            Some(Ok(chunk)) => {
                if chunk.delta.is_empty() {
                    continue;
                }
                let update = StreamUpdate::Delta {
                    key: key.clone(),
                    delta: chunk.delta,
                };
                if updates.send(update).is_err() {
                    return;
                }
            }
            Some(Err(StreamError::Cancelled)) => break StreamOutcome::Cancelled,
            Some(Err(StreamError::Failed(reason))) => {
                tracing::warn!(message_id = %key.message_id, %reason, "reply stream failed");
                break StreamOutcome::Failed;
            }
            None => {
                tracing::warn!(
                    message_id = %key.message_id,
                    "reply stream ended without a done chunk"
                );
                break StreamOutcome::Failed;
            }
        }
    };

    if outcome == StreamOutcome::Cancelled {
        tracing::debug!(message_id = %key.message_id, "reply stream cancelled");
    }
    let _ = updates.send(StreamUpdate::Finished { key, outcome });
}

#[cfg(test)]
mod tests;
