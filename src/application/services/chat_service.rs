//! Chat Service
//!
//! Thread, participant and message operations for group threads and direct
//! conversations. Every rule about who may read, post, edit or delete lives
//! here; repositories only persist.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{
    Account, AccountRepository, DirectPair, EditWindow, Message, MessageAttachment,
    MessageRepository, Participant, Thread, ThreadKind, ThreadRepository, Upload,
    UploadRepository,
};
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;

pub const DEFAULT_MESSAGE_LIMIT: i64 = 50;
pub const DEFAULT_THREAD_LIMIT: i64 = 20;
pub const MAX_PAGE_LIMIT: i64 = 100;

/// Attempts at resolving a direct thread when concurrent creators collide.
const DIRECT_THREAD_ATTEMPTS: usize = 3;

/// Chat service trait
#[async_trait]
pub trait ChatService: Send + Sync {
    /// Create a thread. The creator always becomes a participant.
    async fn create_thread(&self, creator_id: i64, request: CreateThreadDto) -> Result<ThreadDto, ChatError>;

    /// Add (or reactivate) participants of a group thread.
    async fn add_participants(&self, thread_id: i64, actor_id: i64, user_ids: Vec<i64>) -> Result<ThreadDto, ChatError>;

    /// Get a thread the user participates (or participated) in.
    async fn get_thread(&self, thread_id: i64, user_id: i64) -> Result<ThreadDto, ChatError>;

    /// Deactivate the user's participation in a group thread.
    async fn leave_thread(&self, thread_id: i64, user_id: i64) -> Result<(), ChatError>;

    /// Threads the user actively participates in, most recent activity first.
    async fn list_threads(&self, user_id: i64, query: ThreadQueryDto) -> Result<Vec<ThreadDto>, ChatError>;

    /// Return the direct thread of the pair, creating it if needed.
    async fn get_or_create_direct_thread(&self, user_id: i64, other_user_id: i64) -> Result<ThreadDto, ChatError>;

    /// Return the existing direct thread of the pair.
    async fn get_direct_thread(&self, user_id: i64, other_user_id: i64) -> Result<ThreadDto, ChatError>;

    /// Direct conversations of the user, most recent activity first.
    async fn list_direct_conversations(&self, user_id: i64, query: ThreadQueryDto) -> Result<Vec<ThreadDto>, ChatError>;

    /// Post a message to a thread.
    async fn create_message(&self, thread_id: i64, sender_id: i64, request: CreateMessageDto) -> Result<MessageDto, ChatError>;

    /// Post a message to the direct thread of the pair, creating it if needed.
    /// Returns the message together with the thread it landed in.
    async fn send_direct_message(&self, sender_id: i64, recipient_id: i64, request: CreateMessageDto) -> Result<DirectMessageDto, ChatError>;

    /// Visible messages of a thread, newest first.
    async fn list_messages(&self, thread_id: i64, user_id: i64, query: MessageQueryDto) -> Result<MessagesPageDto, ChatError>;

    /// Visible messages of the existing direct thread of the pair, newest first.
    async fn list_direct_messages(&self, user_id: i64, other_user_id: i64, query: MessageQueryDto) -> Result<MessagesPageDto, ChatError>;

    /// Edit a message within the edit window.
    async fn edit_message(&self, thread_id: i64, message_id: i64, requester_id: i64, content: String) -> Result<MessageDto, ChatError>;

    /// Soft-delete a single message.
    async fn soft_delete_message(&self, thread_id: i64, message_id: i64, requester_id: i64) -> Result<(), ChatError>;

    /// Soft-delete every visible message of a thread. Returns the count.
    async fn soft_delete_all_messages(&self, thread_id: i64, requester_id: i64) -> Result<u64, ChatError>;
}

/// Create thread request
#[derive(Debug, Clone, Default)]
pub struct CreateThreadDto {
    pub title: Option<String>,
    pub participant_ids: Vec<i64>,
    pub is_direct: bool,
}

/// Create message request
#[derive(Debug, Clone, Default)]
pub struct CreateMessageDto {
    pub content: String,
    pub attachment_ids: Vec<i64>,
}

/// Thread listing parameters
#[derive(Debug, Clone, Default)]
pub struct ThreadQueryDto {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub include_direct: bool,
}

impl ThreadQueryDto {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_THREAD_LIMIT).clamp(1, MAX_PAGE_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

/// Message listing parameters
#[derive(Debug, Clone, Default)]
pub struct MessageQueryDto {
    pub limit: Option<i64>,
    /// Only messages with a smaller id are returned.
    pub before: Option<i64>,
}

impl MessageQueryDto {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_MESSAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT)
    }
}

/// Attachment metadata rendered inside a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttachmentDto {
    pub upload_id: String,
    pub file_url: String,
    pub file_name: String,
    pub file_size: i64,
    pub file_uuid_name: String,
}

impl From<&Upload> for AttachmentDto {
    fn from(upload: &Upload) -> Self {
        Self {
            upload_id: upload.id.to_string(),
            file_url: upload.file_url.clone(),
            file_name: upload.file_name.clone(),
            file_size: upload.file_size,
            file_uuid_name: upload.file_uuid_name.clone(),
        }
    }
}

/// Message data transfer object
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageDto {
    pub id: String,
    pub thread_id: String,
    pub sender_id: String,
    pub sender_username: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
    pub attachments: Vec<AttachmentDto>,
}

/// Participant data transfer object
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParticipantDto {
    pub user_id: String,
    pub username: Option<String>,
    pub joined_at: DateTime<Utc>,
    pub active: bool,
}

/// Thread data transfer object
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreadDto {
    pub id: String,
    pub is_direct: bool,
    pub title: Option<String>,
    pub created_by_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub participants: Vec<ParticipantDto>,
    pub last_message: Option<MessageDto>,
    /// For direct threads, the member of the pair that is not the viewer.
    pub other_participant_id: Option<String>,
}

/// One page of a thread's history
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessagesPageDto {
    pub thread_id: String,
    /// Set for direct threads, relative to the requester.
    pub other_participant_id: Option<String>,
    pub messages: Vec<MessageDto>,
}

/// A direct message and the conversation it was posted to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectMessageDto {
    pub message: MessageDto,
    pub thread: ThreadDto,
}

/// Chat service errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatError {
    #[error("Thread not found")]
    ThreadNotFound,

    #[error("Message not found")]
    MessageNotFound,

    #[error("Participant not found")]
    ParticipantNotFound,

    #[error("Attachment not found")]
    AttachmentNotFound,

    #[error("{0}")]
    NotAllowed(String),

    #[error("You cannot message yourself")]
    SelfMessagingNotAllowed,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ChatError {
    /// Whether this error is a domain rejection a client may react to, as
    /// opposed to an unexpected failure.
    pub fn is_domain(&self) -> bool {
        !matches!(self, ChatError::Internal(_))
    }
}

impl From<AppError> for ChatError {
    fn from(error: AppError) -> Self {
        ChatError::Internal(error.to_string())
    }
}

impl From<ChatError> for AppError {
    fn from(error: ChatError) -> Self {
        match error {
            ChatError::ThreadNotFound
            | ChatError::MessageNotFound
            | ChatError::ParticipantNotFound => AppError::NotFound(error.to_string()),
            ChatError::AttachmentNotFound | ChatError::SelfMessagingNotAllowed => {
                AppError::BadRequest(error.to_string())
            }
            ChatError::NotAllowed(reason) => AppError::Forbidden(reason),
            ChatError::Internal(detail) => AppError::Internal(detail),
        }
    }
}

/// Remove duplicates while keeping the first occurrence of each id.
fn dedup_ids(ids: impl IntoIterator<Item = i64>) -> Vec<i64> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

/// ChatService implementation
pub struct ChatServiceImpl<T, M, A, U>
where
    T: ThreadRepository,
    M: MessageRepository,
    A: AccountRepository,
    U: UploadRepository,
{
    thread_repo: Arc<T>,
    message_repo: Arc<M>,
    account_repo: Arc<A>,
    upload_repo: Arc<U>,
    id_generator: Arc<SnowflakeGenerator>,
    edit_window: EditWindow,
}

impl<T, M, A, U> ChatServiceImpl<T, M, A, U>
where
    T: ThreadRepository,
    M: MessageRepository,
    A: AccountRepository,
    U: UploadRepository,
{
    pub fn new(
        thread_repo: Arc<T>,
        message_repo: Arc<M>,
        account_repo: Arc<A>,
        upload_repo: Arc<U>,
        id_generator: Arc<SnowflakeGenerator>,
        edit_window: EditWindow,
    ) -> Self {
        Self {
            thread_repo,
            message_repo,
            account_repo,
            upload_repo,
            id_generator,
            edit_window,
        }
    }

    async fn load_thread(&self, thread_id: i64) -> Result<Thread, ChatError> {
        self.thread_repo
            .find_by_id(thread_id)
            .await?
            .ok_or(ChatError::ThreadNotFound)
    }

    /// Load a message of the given thread. Messages of other threads are
    /// reported as missing.
    async fn load_message(&self, thread_id: i64, message_id: i64) -> Result<Message, ChatError> {
        self.message_repo
            .find_by_id(message_id)
            .await?
            .filter(|m| m.thread_id == thread_id)
            .ok_or(ChatError::MessageNotFound)
    }

    async fn ensure_accounts_exist(&self, user_ids: &[i64]) -> Result<(), ChatError> {
        let found: HashSet<i64> = self
            .account_repo
            .find_by_ids(user_ids)
            .await?
            .into_iter()
            .map(|a| a.id)
            .collect();

        if user_ids.iter().all(|id| found.contains(id)) {
            Ok(())
        } else {
            Err(ChatError::ParticipantNotFound)
        }
    }

    async fn ensure_uploads_exist(&self, upload_ids: &[i64]) -> Result<(), ChatError> {
        if upload_ids.is_empty() {
            return Ok(());
        }

        let found: HashSet<i64> = self
            .upload_repo
            .find_by_ids(upload_ids)
            .await?
            .into_iter()
            .map(|u| u.id)
            .collect();

        if upload_ids.iter().all(|id| found.contains(id)) {
            Ok(())
        } else {
            Err(ChatError::AttachmentNotFound)
        }
    }

    /// Look up or create the direct thread of a pair.
    ///
    /// Creation races are settled by the store's uniqueness constraint on the
    /// pair: the loser sees a conflict and re-reads the winner's thread.
    async fn resolve_direct_thread(&self, pair: DirectPair, creator_id: i64) -> Result<Thread, ChatError> {
        for attempt in 1..=DIRECT_THREAD_ATTEMPTS {
            if let Some(thread) = self.thread_repo.find_direct(pair).await? {
                return Ok(thread);
            }

            let now = Utc::now();
            let thread_id = self.id_generator.generate();
            let thread = Thread {
                id: thread_id,
                is_direct: true,
                title: None,
                created_by_id: creator_id,
                direct_pair: Some(pair),
                created_at: now,
                updated_at: now,
                participants: pair
                    .members()
                    .into_iter()
                    .map(|user_id| Participant {
                        thread_id,
                        user_id,
                        joined_at: now,
                        active: true,
                    })
                    .collect(),
            };

            match self.thread_repo.create(&thread).await {
                Ok(created) => {
                    tracing::info!(thread_id = created.id, pair = %pair, "Direct thread created");
                    return Ok(created);
                }
                Err(AppError::Conflict(_)) => {
                    tracing::debug!(pair = %pair, attempt, "Direct thread created concurrently, re-reading");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(ChatError::Internal(format!(
            "direct thread for {} could not be resolved",
            pair
        )))
    }

    async fn find_existing_direct(&self, user_id: i64, other_user_id: i64) -> Result<Thread, ChatError> {
        let pair = DirectPair::new(user_id, other_user_id).ok_or(ChatError::SelfMessagingNotAllowed)?;
        self.thread_repo
            .find_direct(pair)
            .await?
            .ok_or(ChatError::ThreadNotFound)
    }

    /// Whether the requester may delete messages of the thread.
    ///
    /// Direct threads: either member. Group threads: the creator. A single
    /// message may additionally be deleted by its sender.
    fn can_delete(thread: &Thread, requester_id: i64, sender_id: Option<i64>) -> bool {
        if sender_id == Some(requester_id) {
            return true;
        }
        if thread.is_direct {
            thread.has_participant(requester_id)
        } else {
            thread.created_by_id == requester_id
        }
    }

    async fn usernames(&self, user_ids: Vec<i64>) -> Result<HashMap<i64, String>, ChatError> {
        let ids = dedup_ids(user_ids);
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        Ok(self
            .account_repo
            .find_by_ids(&ids)
            .await?
            .into_iter()
            .map(|Account { id, username }| (id, username))
            .collect())
    }

    async fn render_messages(&self, messages: Vec<Message>) -> Result<Vec<MessageDto>, ChatError> {
        let usernames = self
            .usernames(messages.iter().map(|m| m.sender_id).collect())
            .await?;

        let upload_ids = dedup_ids(messages.iter().flat_map(|m| m.upload_ids()));
        let uploads: HashMap<i64, Upload> = if upload_ids.is_empty() {
            HashMap::new()
        } else {
            self.upload_repo
                .find_by_ids(&upload_ids)
                .await?
                .into_iter()
                .map(|u| (u.id, u))
                .collect()
        };

        Ok(messages
            .into_iter()
            .map(|message| MessageDto {
                id: message.id.to_string(),
                thread_id: message.thread_id.to_string(),
                sender_id: message.sender_id.to_string(),
                sender_username: usernames.get(&message.sender_id).cloned(),
                attachments: message
                    .attachments
                    .iter()
                    .filter_map(|a| uploads.get(&a.upload_id))
                    .map(AttachmentDto::from)
                    .collect(),
                content: message.content,
                created_at: message.created_at,
                edited_at: message.edited_at,
            })
            .collect())
    }

    async fn render_message(&self, message: Message) -> Result<MessageDto, ChatError> {
        self.render_messages(vec![message])
            .await?
            .pop()
            .ok_or_else(|| ChatError::Internal("rendered message missing".into()))
    }

    async fn render_threads(&self, threads: Vec<Thread>, viewer_id: i64) -> Result<Vec<ThreadDto>, ChatError> {
        if threads.is_empty() {
            return Ok(Vec::new());
        }

        let usernames = self
            .usernames(
                threads
                    .iter()
                    .flat_map(|t| t.participants.iter().map(|p| p.user_id))
                    .collect(),
            )
            .await?;

        let thread_ids: Vec<i64> = threads.iter().map(|t| t.id).collect();
        let latest = self.message_repo.find_latest(&thread_ids).await?;
        let mut last_messages: HashMap<String, MessageDto> = self
            .render_messages(latest)
            .await?
            .into_iter()
            .map(|m| (m.thread_id.clone(), m))
            .collect();

        Ok(threads
            .into_iter()
            .map(|thread| {
                let id = thread.id.to_string();
                ThreadDto {
                    other_participant_id: thread
                        .other_participant_id(viewer_id)
                        .map(|id| id.to_string()),
                    last_message: last_messages.remove(&id),
                    participants: thread
                        .participants
                        .iter()
                        .map(|p| ParticipantDto {
                            user_id: p.user_id.to_string(),
                            username: usernames.get(&p.user_id).cloned(),
                            joined_at: p.joined_at,
                            active: p.active,
                        })
                        .collect(),
                    id,
                    is_direct: thread.is_direct,
                    title: thread.title,
                    created_by_id: thread.created_by_id.to_string(),
                    created_at: thread.created_at,
                    updated_at: thread.updated_at,
                }
            })
            .collect())
    }

    async fn render_thread(&self, thread: Thread, viewer_id: i64) -> Result<ThreadDto, ChatError> {
        self.render_threads(vec![thread], viewer_id)
            .await?
            .pop()
            .ok_or_else(|| ChatError::Internal("rendered thread missing".into()))
    }

    async fn post_message(&self, thread: &Thread, sender_id: i64, request: CreateMessageDto) -> Result<MessageDto, ChatError> {
        if !thread.has_active_participant(sender_id) {
            return Err(ChatError::ParticipantNotFound);
        }

        let upload_ids = dedup_ids(request.attachment_ids);
        self.ensure_uploads_exist(&upload_ids).await?;

        let message_id = self.id_generator.generate();
        let message = Message {
            id: message_id,
            thread_id: thread.id,
            sender_id,
            content: request.content,
            created_at: Utc::now(),
            edited_at: None,
            deleted_at: None,
            attachments: upload_ids
                .into_iter()
                .map(|upload_id| MessageAttachment { message_id, upload_id })
                .collect(),
        };

        let stored = self.message_repo.create(&message).await?;
        tracing::debug!(
            thread_id = thread.id,
            message_id = stored.id,
            sender_id,
            attachments = stored.attachments.len(),
            "Message created"
        );

        self.render_message(stored).await
    }

    async fn list_thread_messages(&self, thread: &Thread, viewer_id: i64, query: &MessageQueryDto) -> Result<MessagesPageDto, ChatError> {
        let messages = self
            .message_repo
            .find_by_thread(thread.id, query.before, query.limit())
            .await?;

        Ok(MessagesPageDto {
            thread_id: thread.id.to_string(),
            other_participant_id: thread
                .direct_pair
                .and_then(|pair| pair.other(viewer_id))
                .map(|id| id.to_string()),
            messages: self.render_messages(messages).await?,
        })
    }
}

#[async_trait]
impl<T, M, A, U> ChatService for ChatServiceImpl<T, M, A, U>
where
    T: ThreadRepository + 'static,
    M: MessageRepository + 'static,
    A: AccountRepository + 'static,
    U: UploadRepository + 'static,
{
    async fn create_thread(&self, creator_id: i64, request: CreateThreadDto) -> Result<ThreadDto, ChatError> {
        if request.is_direct {
            let others = dedup_ids(request.participant_ids.into_iter().filter(|id| *id != creator_id));
            let &[other_user_id] = others.as_slice() else {
                return Err(ChatError::NotAllowed(
                    "A direct thread needs exactly one other participant".into(),
                ));
            };
            return self.get_or_create_direct_thread(creator_id, other_user_id).await;
        }

        let member_ids = dedup_ids(std::iter::once(creator_id).chain(request.participant_ids));
        self.ensure_accounts_exist(&member_ids).await?;

        let now = Utc::now();
        let thread_id = self.id_generator.generate();
        let thread = Thread {
            id: thread_id,
            is_direct: false,
            title: request.title.filter(|t| !t.trim().is_empty()),
            created_by_id: creator_id,
            direct_pair: None,
            created_at: now,
            updated_at: now,
            participants: member_ids
                .into_iter()
                .map(|user_id| Participant {
                    thread_id,
                    user_id,
                    joined_at: now,
                    active: true,
                })
                .collect(),
        };

        let created = self.thread_repo.create(&thread).await?;
        tracing::info!(
            thread_id = created.id,
            creator_id,
            participants = created.participants.len(),
            "Thread created"
        );

        self.render_thread(created, creator_id).await
    }

    async fn add_participants(&self, thread_id: i64, actor_id: i64, user_ids: Vec<i64>) -> Result<ThreadDto, ChatError> {
        let thread = self.load_thread(thread_id).await?;

        if thread.is_direct {
            return Err(ChatError::NotAllowed(
                "Participants of a direct thread cannot change".into(),
            ));
        }
        let user_ids = dedup_ids(user_ids);
        self.ensure_accounts_exist(&user_ids).await?;

        let now = Utc::now();
        let pending: Vec<Participant> = user_ids
            .into_iter()
            .filter(|id| !thread.has_active_participant(*id))
            .map(|user_id| Participant {
                thread_id,
                user_id,
                joined_at: now,
                active: true,
            })
            .collect();

        if pending.is_empty() {
            return self.render_thread(thread, actor_id).await;
        }

        let updated = self
            .thread_repo
            .upsert_participants(thread_id, &pending)
            .await?;
        tracing::info!(thread_id, actor_id, added = pending.len(), "Participants added");

        self.render_thread(updated, actor_id).await
    }

    async fn get_thread(&self, thread_id: i64, user_id: i64) -> Result<ThreadDto, ChatError> {
        let thread = self.load_thread(thread_id).await?;
        if !thread.has_participant(user_id) {
            return Err(ChatError::ParticipantNotFound);
        }
        self.render_thread(thread, user_id).await
    }

    async fn leave_thread(&self, thread_id: i64, user_id: i64) -> Result<(), ChatError> {
        let thread = self.load_thread(thread_id).await?;

        if thread.is_direct {
            return Err(ChatError::NotAllowed("Direct threads cannot be left".into()));
        }
        if !thread.has_participant(user_id) {
            return Err(ChatError::ParticipantNotFound);
        }

        if !self
            .thread_repo
            .set_participant_active(thread_id, user_id, false)
            .await?
        {
            return Err(ChatError::ParticipantNotFound);
        }

        tracing::info!(thread_id, user_id, "Participant left thread");
        Ok(())
    }

    async fn list_threads(&self, user_id: i64, query: ThreadQueryDto) -> Result<Vec<ThreadDto>, ChatError> {
        let kind = if query.include_direct {
            ThreadKind::All
        } else {
            ThreadKind::Group
        };

        let threads = self
            .thread_repo
            .find_by_participant(user_id, kind, query.limit(), query.offset())
            .await?;
        self.render_threads(threads, user_id).await
    }

    async fn get_or_create_direct_thread(&self, user_id: i64, other_user_id: i64) -> Result<ThreadDto, ChatError> {
        let pair = DirectPair::new(user_id, other_user_id).ok_or(ChatError::SelfMessagingNotAllowed)?;
        self.ensure_accounts_exist(&pair.members()).await?;

        let thread = self.resolve_direct_thread(pair, user_id).await?;
        self.render_thread(thread, user_id).await
    }

    async fn get_direct_thread(&self, user_id: i64, other_user_id: i64) -> Result<ThreadDto, ChatError> {
        let thread = self.find_existing_direct(user_id, other_user_id).await?;
        self.render_thread(thread, user_id).await
    }

    async fn list_direct_conversations(&self, user_id: i64, query: ThreadQueryDto) -> Result<Vec<ThreadDto>, ChatError> {
        let threads = self
            .thread_repo
            .find_by_participant(user_id, ThreadKind::Direct, query.limit(), query.offset())
            .await?;
        self.render_threads(threads, user_id).await
    }

    async fn create_message(&self, thread_id: i64, sender_id: i64, request: CreateMessageDto) -> Result<MessageDto, ChatError> {
        let thread = self.load_thread(thread_id).await?;
        self.post_message(&thread, sender_id, request).await
    }

    async fn send_direct_message(&self, sender_id: i64, recipient_id: i64, request: CreateMessageDto) -> Result<DirectMessageDto, ChatError> {
        let pair = DirectPair::new(sender_id, recipient_id).ok_or(ChatError::SelfMessagingNotAllowed)?;
        self.ensure_accounts_exist(&pair.members()).await?;

        // Verify uploads before a thread is created for a message that would be rejected.
        let upload_ids = dedup_ids(request.attachment_ids.iter().copied());
        self.ensure_uploads_exist(&upload_ids).await?;

        let thread = self.resolve_direct_thread(pair, sender_id).await?;
        let message = self.post_message(&thread, sender_id, request).await?;

        // Re-read so recency and last_message reflect the new message.
        let thread = self.load_thread(thread.id).await?;
        let thread = self.render_thread(thread, sender_id).await?;

        Ok(DirectMessageDto { message, thread })
    }

    async fn list_messages(&self, thread_id: i64, user_id: i64, query: MessageQueryDto) -> Result<MessagesPageDto, ChatError> {
        let thread = self.load_thread(thread_id).await?;
        if !thread.has_participant(user_id) {
            return Err(ChatError::ParticipantNotFound);
        }
        self.list_thread_messages(&thread, user_id, &query).await
    }

    async fn list_direct_messages(&self, user_id: i64, other_user_id: i64, query: MessageQueryDto) -> Result<MessagesPageDto, ChatError> {
        let thread = self.find_existing_direct(user_id, other_user_id).await?;
        self.list_thread_messages(&thread, user_id, &query).await
    }

    async fn edit_message(&self, thread_id: i64, message_id: i64, requester_id: i64, content: String) -> Result<MessageDto, ChatError> {
        self.load_thread(thread_id).await?;
        let message = self.load_message(thread_id, message_id).await?;

        if message.is_deleted() {
            return Err(ChatError::NotAllowed("Deleted messages cannot be edited".into()));
        }
        if message.sender_id != requester_id {
            return Err(ChatError::NotAllowed("Only the sender can edit this message".into()));
        }

        let now = Utc::now();
        if !self.edit_window.permits(message.created_at, now) {
            return Err(ChatError::NotAllowed("The edit window for this message has closed".into()));
        }

        let updated = self
            .message_repo
            .update_content(message_id, &content, now)
            .await?
            .ok_or(ChatError::MessageNotFound)?;
        tracing::debug!(thread_id, message_id, "Message edited");

        self.render_message(updated).await
    }

    async fn soft_delete_message(&self, thread_id: i64, message_id: i64, requester_id: i64) -> Result<(), ChatError> {
        let thread = self.load_thread(thread_id).await?;
        let message = self.load_message(thread_id, message_id).await?;

        if message.is_deleted() {
            return Err(ChatError::MessageNotFound);
        }
        if !Self::can_delete(&thread, requester_id, Some(message.sender_id)) {
            return Err(ChatError::NotAllowed("You cannot delete this message".into()));
        }

        if !self.message_repo.soft_delete(message_id, Utc::now()).await? {
            return Err(ChatError::MessageNotFound);
        }

        tracing::debug!(thread_id, message_id, requester_id, "Message deleted");
        Ok(())
    }

    async fn soft_delete_all_messages(&self, thread_id: i64, requester_id: i64) -> Result<u64, ChatError> {
        let thread = self.load_thread(thread_id).await?;

        if !Self::can_delete(&thread, requester_id, None) {
            return Err(ChatError::NotAllowed(
                "You cannot delete the messages of this thread".into(),
            ));
        }

        let deleted = self
            .message_repo
            .soft_delete_by_thread(thread_id, Utc::now())
            .await?;
        tracing::info!(thread_id, requester_id, deleted, "Thread messages deleted");

        Ok(deleted)
    }
}
