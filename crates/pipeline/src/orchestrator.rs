//! Send orchestration — the top-level use cases.
//!
//! `ChatPipeline` owns the transcript, the selected agent, and the two
//! advisory busy flags. Entry points: [`ChatPipeline::send_message`],
//! [`ChatPipeline::send_audio`], [`ChatPipeline::regenerate`], and
//! [`ChatPipeline::improve_prompt`]. Every failure is converted to a
//! notification here; nothing propagates to the caller.
//!
//! All transcript edits are expressed as [`TranscriptMutation`]s and applied
//! by this single owner in order — no collaborator holds a live mutable
//! reference to the transcript across an await point.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use denkitsu_config::ChatSettings;
use denkitsu_core::client::{ChatClient, ChatRequest, StreamEvent, WireMessage};
use denkitsu_core::error::Error;
use denkitsu_core::mutation::TranscriptMutation;
use denkitsu_core::notify::Notifier;
use denkitsu_core::transcribe::{AudioClip, Transcriber};
use denkitsu_core::turn::{ConversationTurn, Role, Transcript};

use crate::accumulator::mutations_for_delta;
use crate::router::DispatchState;

/// The chat pipeline: transcript owner and orchestration entry point.
pub struct ChatPipeline {
    client: Arc<dyn ChatClient>,
    transcriber: Arc<dyn Transcriber>,
    notifier: Arc<dyn Notifier>,

    transcript: Transcript,

    /// The externally visible agent; updated by a successful hand-off so
    /// subsequent turns default to the new agent until reset.
    selected_agent: String,

    // Advisory busy flags, checked at entry. Entry points are
    // user-gesture-triggered, so these are boundary checks, not locks.
    sending: bool,
    improving_prompt: bool,
}

impl ChatPipeline {
    pub fn new(
        client: Arc<dyn ChatClient>,
        transcriber: Arc<dyn Transcriber>,
        notifier: Arc<dyn Notifier>,
        initial_agent: impl Into<String>,
    ) -> Self {
        Self {
            client,
            transcriber,
            notifier,
            transcript: Transcript::new(),
            selected_agent: initial_agent.into(),
            sending: false,
            improving_prompt: false,
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn selected_agent(&self) -> &str {
        &self.selected_agent
    }

    /// Select the agent subsequent sends open with.
    pub fn select_agent(&mut self, agent: impl Into<String>) {
        self.selected_agent = agent.into();
    }

    pub fn is_sending(&self) -> bool {
        self.sending
    }

    pub fn is_improving_prompt(&self) -> bool {
        self.improving_prompt
    }

    /// Send a user message (text plus optional image attachments).
    pub async fn send_message(&mut self, settings: &ChatSettings, text: &str, images: &[String]) {
        if self.sending || self.improving_prompt {
            debug!("Send ignored: another operation is in flight");
            return;
        }

        if text.trim().is_empty() && images.is_empty() {
            self.notifier.warning("Nothing to send");
            return;
        }

        let turn = if images.is_empty() {
            ConversationTurn::user(text)
        } else {
            ConversationTurn::user_with_images(text, images)
        };
        let timestamp = turn.timestamp;
        self.transcript.apply(TranscriptMutation::Append(turn));

        self.sending = true;
        self.run_dispatch(settings, Some(timestamp)).await;
        self.sending = false;
    }

    /// Submit a voice recording: optimistic placeholder, transcription, then
    /// a normal send over the replaced content.
    pub async fn send_audio(&mut self, settings: &ChatSettings, clip: AudioClip) {
        if self.sending || self.improving_prompt {
            debug!("Audio send ignored: another operation is in flight");
            return;
        }

        let label = clip.placeholder_label();
        let placeholder = ConversationTurn::user(label.clone());
        let id = placeholder.id;
        let timestamp = placeholder.timestamp;
        self.transcript.apply(TranscriptMutation::Append(placeholder));

        self.sending = true;

        match self.transcriber.transcribe(&clip).await {
            Ok(text) => {
                self.transcript.apply(TranscriptMutation::ReplaceContent {
                    id,
                    content: format!("{label}\n\n{text}"),
                });
                self.run_dispatch(settings, Some(timestamp)).await;
            }
            Err(e) => {
                // Never leave an untranscribed placeholder behind
                self.transcript
                    .apply(TranscriptMutation::RemoveByTimestamp(timestamp));
                warn!(error = %e, "Transcription failed, placeholder rolled back");
                self.notifier.error(&e.notification_text());
            }
        }

        self.sending = false;
    }

    /// Regenerate the last assistant response against the remaining history.
    pub async fn regenerate(&mut self, settings: &ChatSettings) {
        if self.sending || self.improving_prompt {
            debug!("Regenerate ignored: another operation is in flight");
            return;
        }

        if self.transcript.last().map(|t| t.role) != Some(Role::Assistant) {
            self.notifier.warning("There is no response to regenerate");
            return;
        }

        self.transcript.apply(TranscriptMutation::RemoveLast);

        self.sending = true;
        // No user turn was added, so a failure rolls back nothing
        self.run_dispatch(settings, None).await;
        self.sending = false;
    }

    /// Rewrite a compose-box draft with the prompter persona. Returns the
    /// rewritten text, or the draft unchanged on failure.
    pub async fn improve_prompt(&mut self, settings: &ChatSettings, draft: String) -> String {
        if self.sending || self.improving_prompt {
            debug!("Prompt improvement ignored: another operation is in flight");
            return draft;
        }

        if draft.trim().is_empty() {
            self.notifier.warning("Nothing to improve");
            return draft;
        }

        self.improving_prompt = true;

        // Single-shot, never streamed, never tool-enabled
        let request = ChatRequest {
            credentials: settings.credentials.clone(),
            model: settings.model.clone(),
            candidate_models: settings.candidate_models.clone(),
            messages: WireMessage::project(&[ConversationTurn::user(draft.clone())]),
            agent: settings.prompter_agent.clone(),
            active_tools: Vec::new(),
        };

        let result = match self.client.send_atomic(request).await {
            Ok(response) if !response.content().is_empty() => {
                self.notifier.success("Prompt improved");
                response.content().to_string()
            }
            Ok(_) => {
                self.notifier.error("The prompter returned an empty rewrite");
                draft
            }
            Err(e) => {
                self.notifier
                    .error(&Error::Transport(e).notification_text());
                draft
            }
        };

        self.improving_prompt = false;
        result
    }

    /// Drive one dispatch to completion through the two-attempt state
    /// machine. All failures end here as notifications plus rollback.
    async fn run_dispatch(&mut self, settings: &ChatSettings, rollback: Option<DateTime<Utc>>) {
        let mut state = DispatchState::opening(
            self.transcript.turns().to_vec(),
            self.selected_agent.clone(),
            rollback,
        );

        loop {
            debug!(
                agent = %state.agent_for_call,
                attempt = ?state.attempt,
                "Dispatching chat call"
            );

            let request = self.build_request(settings, &state);

            if state.is_routing_pass(&settings.router_agent) {
                let response = match self.client.send_atomic(request).await {
                    Ok(r) => r,
                    Err(e) => {
                        self.fail(rollback, &Error::Transport(e));
                        return;
                    }
                };

                if let Some(target) = response.switch_agent_target() {
                    let target = target.to_string();
                    let from = state.agent_for_call.clone();
                    match state.next_hop(target.clone()) {
                        Ok(next) => {
                            info!(from = %from, to = %target, "Agent hand-off");
                            self.selected_agent = target;
                            state = next;
                            continue;
                        }
                        Err(e) => {
                            self.fail(rollback, &e);
                            return;
                        }
                    }
                }

                // Finalize under the current agent
                let mut turn = ConversationTurn::assistant(response.content());
                if let Some(reasoning) = response.reasoning() {
                    turn.reasoning = Some(reasoning.to_string());
                }
                turn.tool_calls = response.tool_calls.clone();
                turn.routing_info = state.routing_info.clone();
                self.transcript.apply(TranscriptMutation::Append(turn));

                debug!(agent = %state.agent_for_call, "Atomic response finalized");
                return;
            }

            // Dispatched pass: streamed
            let mut rx = match self.client.send_stream(request).await {
                Ok(rx) => rx,
                Err(e) => {
                    self.fail(rollback, &Error::Transport(e));
                    return;
                }
            };

            let placeholder = ConversationTurn::placeholder(state.routing_info.clone());
            let id = placeholder.id;
            self.transcript.apply(TranscriptMutation::Append(placeholder));

            while let Some(event) = rx.recv().await {
                match event {
                    StreamEvent::Delta(delta) => {
                        let mutations = mutations_for_delta(&self.transcript, id, &delta);
                        self.transcript.apply_all(mutations);
                    }
                    StreamEvent::Error { message } => {
                        // Terminal. Partial content already folded in stays
                        // visible; a placeholder that got nothing is removed.
                        self.fail(rollback, &Error::Transport(
                            denkitsu_core::error::TransportError::StreamInterrupted(message),
                        ));
                        let blank = self
                            .transcript
                            .turn_by_id(id)
                            .is_some_and(|t| t.is_blank());
                        if blank {
                            self.transcript.apply(TranscriptMutation::RemoveById(id));
                        }
                        return;
                    }
                }
            }

            // Finalization is implicit: the stream is exhausted
            debug!(agent = %state.agent_for_call, "Stream completed");
            return;
        }
    }

    fn build_request(&self, settings: &ChatSettings, state: &DispatchState) -> ChatRequest {
        ChatRequest {
            credentials: settings.credentials.clone(),
            model: settings.model.clone(),
            candidate_models: settings.candidate_models.clone(),
            messages: WireMessage::project(&state.history),
            agent: state.agent_for_call.clone(),
            active_tools: settings.active_tools.clone(),
        }
    }

    /// Notify and roll back the in-flight user turn, if any.
    fn fail(&mut self, rollback: Option<DateTime<Utc>>, error: &Error) {
        self.notifier.error(&error.notification_text());
        if let Some(timestamp) = rollback {
            self.transcript
                .apply(TranscriptMutation::RemoveByTimestamp(timestamp));
            warn!(error = %error, "Send failed, user turn rolled back");
        } else {
            warn!(error = %error, "Send failed");
        }
    }
}
