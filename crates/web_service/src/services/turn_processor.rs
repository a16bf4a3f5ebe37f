//! Turn pipeline: context assembly, provider streaming, aggregation,
//! persistence, titling.
//!
//! One inbound message drives one pass through
//! context -> stream -> aggregate -> persist -> title-check. Failures
//! before streaming starts surface only on the request; once partial
//! output has been emitted, provider and persistence failures also
//! push a terminal error event to the stream. Partial assistant output
//! is never persisted: the store is written once, after aggregation.

use std::sync::Arc;

use dashmap::DashMap;
use futures_util::StreamExt;
use tokio::sync::Mutex;
use uuid::Uuid;

use chat_core::budget::HeuristicTokenCounter;
use chat_core::context::{ContextBuilder, ContextError, ContextRequest};
use chat_core::conversation::Conversation;
use chat_core::message::{
    ContentBlock, LlmSettings, Message, MessageMetadata, MessageStatus, Role,
};
use chat_llm::ModelResolver;

use crate::error::{AppError, Result};
use crate::models::{MessageIn, MessageOut, OutboundMetadata};
use crate::services::title_generator::TitleGenerator;
use crate::services::transport::StreamTransport;
use crate::storage::{ConversationStore, ConversationUpdate, MessageUpdate};

/// Conversations a title is attempted for must have at least this
/// many messages; a lone user message is not enough signal.
const TITLE_MESSAGE_THRESHOLD: usize = 2;

pub struct TurnProcessor {
    store: Arc<dyn ConversationStore>,
    resolver: Arc<dyn ModelResolver>,
    title_generator: TitleGenerator,
    /// Per-conversation single-in-flight lock; a second turn for the
    /// same conversation queues behind the first.
    turn_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl TurnProcessor {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        resolver: Arc<dyn ModelResolver>,
        title_generator: TitleGenerator,
    ) -> Self {
        Self {
            store,
            resolver,
            title_generator,
            turn_locks: DashMap::new(),
        }
    }

    /// Run one turn to completion, emitting partial snapshots on
    /// `transport` and returning the final assistant event.
    pub async fn process(
        &self,
        request: MessageIn,
        transport: &dyn StreamTransport,
    ) -> Result<MessageOut> {
        let conversation_id = request.conversation_id.clone();
        let lock = self
            .turn_locks
            .entry(conversation_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let outcome = {
            let _in_flight = lock.lock().await;
            self.run_turn(request, transport).await
        };

        // Drop the lock entry once nothing else references it. A
        // queued turn for the same conversation holds its own clone,
        // which keeps the strong count above one and the entry alive.
        drop(lock);
        self.turn_locks
            .remove_if(&conversation_id, |_, l| Arc::strong_count(l) == 1);

        outcome
    }

    async fn run_turn(
        &self,
        request: MessageIn,
        transport: &dyn StreamTransport,
    ) -> Result<MessageOut> {
        let conversation_id = request.conversation_id.clone();
        let settings = request.metadata.llm.clone();

        // Resolve the model before touching the store so an unknown
        // name fails with nothing persisted.
        let model = self.resolver.resolve(&settings)?;
        let vision_capable = self.resolver.vision_capable(&settings.model);

        let conversation = self.store.create_conversation(&conversation_id).await?;

        let regenerate_from = request.metadata.message_to_regenerate.as_deref();
        let regeneration_target = match regenerate_from {
            Some(target_id) => {
                let target = conversation
                    .message(target_id)
                    .ok_or_else(|| AppError::MessageNotFound(target_id.to_string()))?;
                Some(target.clone())
            }
            None => None,
        };

        let counter = HeuristicTokenCounter::for_family(
            self.resolver.tokenizer_family(&settings.model),
        );
        let builder = ContextBuilder::new(Arc::new(counter));
        let context = builder
            .build(&ContextRequest {
                conversation: &conversation,
                new_content: &request.content,
                regenerate_from,
                max_tokens: settings.max_tokens,
                system_instructions: settings.instructions.as_deref(),
                vision_capable,
            })
            .map_err(|e| match e {
                ContextError::UnknownRegenerationTarget(id) => AppError::MessageNotFound(id),
            })?;

        tracing::debug!(
            conversation_id = %conversation_id,
            context_turns = context.len(),
            regenerating = regeneration_target.is_some(),
            "turn context built"
        );

        // Streaming. From here on, failures also surface on the
        // transport.
        let assistant_id = match &regeneration_target {
            Some(target) => target.id.clone(),
            None => Uuid::new_v4().to_string(),
        };
        let streaming_metadata =
            streaming_metadata(&settings, regeneration_target.as_ref());

        let mut stream = match model.stream(&context).await {
            Ok(stream) => stream,
            Err(e) => {
                let error: AppError = e.into();
                transport.send(&MessageOut::error(&conversation_id, &error.to_string()));
                return Err(error);
            }
        };

        let cancel = transport.cancellation();
        let mut buffer = String::new();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!(
                        conversation_id = %conversation_id,
                        buffered_chars = buffer.len(),
                        "client disconnected, abandoning turn"
                    );
                    return Err(AppError::Cancelled);
                }
                next = stream.next() => match next {
                    None => break,
                    Some(Ok(delta)) => {
                        if delta.content.is_empty() {
                            continue;
                        }
                        buffer.push_str(&delta.content);
                        transport.send(&MessageOut::incomplete(
                            &assistant_id,
                            &conversation_id,
                            &delta.content,
                            streaming_metadata.clone(),
                        ));
                    }
                    Some(Err(e)) => {
                        let error: AppError = e.into();
                        transport.send(&MessageOut::error(&conversation_id, &error.to_string()));
                        return Err(error);
                    }
                },
            }
        }

        // Aggregated. Build the final assistant record and persist the
        // whole turn as one unit.
        let assistant = match regeneration_target {
            Some(target) => regenerated_message(target, &settings, &buffer),
            None => Message::assistant(
                assistant_id,
                vec![ContentBlock::text(&buffer)],
                &conversation_id,
                MessageMetadata::with_llm(settings.clone()),
            ),
        };
        let final_event = MessageOut::complete(&assistant);
        transport.send(&final_event);

        let persisted = match regenerate_from {
            Some(_) => self
                .store
                .update_message(
                    &assistant.id,
                    MessageUpdate {
                        content: Some(assistant.content.clone()),
                        status: Some(MessageStatus::Complete),
                        metadata: Some(assistant.metadata.clone()),
                    },
                )
                .await
                .map(|_| ()),
            None => {
                let user = Message::user(
                    &request.id,
                    request.content.clone(),
                    &conversation_id,
                    request.user_metadata(),
                );
                self.store
                    .insert_turn(&conversation_id, user, assistant)
                    .await
            }
        };
        if let Err(e) = persisted {
            let error: AppError = e.into();
            transport.send(&MessageOut::error(&conversation_id, &error.to_string()));
            return Err(error);
        }

        self.maybe_generate_title(&conversation_id).await;

        Ok(final_event)
    }

    /// Title an untitled conversation once it has enough messages.
    /// Never fails the turn; every error path only logs.
    async fn maybe_generate_title(&self, conversation_id: &str) {
        let conversation = match self.store.get_conversation(conversation_id).await {
            Ok(Some(conversation)) => conversation,
            Ok(None) => return,
            Err(e) => {
                log::warn!("title check: failed to reload conversation {conversation_id}: {e}");
                return;
            }
        };

        if !needs_title(&conversation) {
            return;
        }

        if let Some(title) = self.title_generator.generate(&conversation).await {
            tracing::info!(conversation_id = %conversation_id, title = %title, "conversation titled");
            if let Err(e) = self
                .store
                .update_conversation(conversation_id, ConversationUpdate::title(title))
                .await
            {
                log::warn!("failed to persist title for conversation {conversation_id}: {e}");
            }
        }
    }
}

fn needs_title(conversation: &Conversation) -> bool {
    let untitled = conversation
        .title
        .as_deref()
        .map_or(true, |t| t.trim().is_empty());
    untitled && conversation.messages.len() >= TITLE_MESSAGE_THRESHOLD
}

/// Metadata attached to partial snapshots. When regenerating, the
/// version list already shows the about-to-be-superseded completion at
/// index 0 so clients can render history before the final event lands.
fn streaming_metadata(settings: &LlmSettings, target: Option<&Message>) -> OutboundMetadata {
    match target {
        Some(target) => {
            let mut versions = Vec::with_capacity(target.metadata.versions.len() + 1);
            versions.push(target.version_snapshot());
            versions.extend(target.metadata.versions.iter().cloned());
            OutboundMetadata {
                llm: Some(settings.clone()),
                versions,
                extra: target.metadata.extra.clone(),
            }
        }
        None => OutboundMetadata {
            llm: Some(settings.clone()),
            versions: Vec::new(),
            extra: Default::default(),
        },
    }
}

/// Fold a new completion into an existing assistant message: the
/// previous content becomes `versions[0]`, id stays stable.
fn regenerated_message(mut target: Message, settings: &LlmSettings, text: &str) -> Message {
    let snapshot = target.version_snapshot();
    target.metadata.push_version(snapshot);
    target.metadata.llm = Some(settings.clone());
    target.content = vec![ContentBlock::text(text)];
    target.status = MessageStatus::Complete;
    target.role = Role::Assistant;
    target
}
