//! Message rules: attachments, paging, edits and soft deletes

use chrono::{Duration, Utc};
use pretty_assertions::assert_eq;
use thread_chat::application::services::{
    ChatError, ChatService, CreateMessageDto, CreateThreadDto, MessageQueryDto, ThreadDto,
};

use crate::common::*;

fn text(content: &str) -> CreateMessageDto {
    CreateMessageDto {
        content: content.into(),
        attachment_ids: Vec::new(),
    }
}

async fn group(chat: &MemoryChatService, creator: i64, members: &[i64]) -> ThreadDto {
    chat.create_thread(
        creator,
        CreateThreadDto {
            title: Some("Launch".into()),
            participant_ids: members.to_vec(),
            is_direct: false,
        },
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn test_missing_attachment_persists_nothing() {
    let store = MemoryStore::seeded();
    let chat = chat_service(&store);
    let thread = group(&chat, ALICE, &[BOB]).await;

    let result = chat
        .create_message(
            id(&thread.id),
            ALICE,
            CreateMessageDto {
                content: "see attached".into(),
                attachment_ids: vec![UPLOAD_PHOTO, MISSING_UPLOAD],
            },
        )
        .await;

    assert_eq!(result.unwrap_err(), ChatError::AttachmentNotFound);
    assert_eq!(store.message_rows(), 0);
}

#[tokio::test]
async fn test_missing_attachment_on_first_direct_message_creates_no_thread() {
    let store = MemoryStore::seeded();
    let chat = chat_service(&store);

    let result = chat
        .send_direct_message(
            ALICE,
            BOB,
            CreateMessageDto {
                content: "file".into(),
                attachment_ids: vec![MISSING_UPLOAD],
            },
        )
        .await;

    assert_eq!(result.unwrap_err(), ChatError::AttachmentNotFound);
    assert_eq!(store.message_rows(), 0);
    assert_eq!(store.direct_thread_count(), 0);
}

#[tokio::test]
async fn test_attachments_are_rendered_in_order() {
    let store = MemoryStore::seeded();
    let chat = chat_service(&store);
    let thread = group(&chat, ALICE, &[BOB]).await;

    let message = chat
        .create_message(
            id(&thread.id),
            BOB,
            CreateMessageDto {
                content: "two files".into(),
                attachment_ids: vec![UPLOAD_REPORT, UPLOAD_PHOTO, UPLOAD_REPORT],
            },
        )
        .await
        .unwrap();

    let names: Vec<_> = message
        .attachments
        .iter()
        .map(|a| a.file_name.as_str())
        .collect();
    assert_eq!(names, vec!["report.pdf", "photo.png"]);
    assert_eq!(message.attachments[0].upload_id, UPLOAD_REPORT.to_string());
    assert!(message.attachments[0].file_url.ends_with("report.pdf"));
}

#[tokio::test]
async fn test_paging_returns_newest_first_with_before_cursor() {
    let store = MemoryStore::seeded();
    let chat = chat_service(&store);

    let mut sent = Vec::new();
    for content in ["m1", "m2", "m3"] {
        sent.push(chat.send_direct_message(ALICE, BOB, text(content)).await.unwrap());
    }
    let thread_id = id(&sent[0].thread.id);

    let page = chat
        .list_messages(
            thread_id,
            ALICE,
            MessageQueryDto {
                limit: Some(2),
                before: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(page.thread_id, sent[0].thread.id);
    assert_eq!(page.other_participant_id, Some(BOB.to_string()));
    let contents: Vec<_> = page.messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["m3", "m2"]);

    let older = chat
        .list_messages(
            thread_id,
            ALICE,
            MessageQueryDto {
                limit: Some(2),
                before: Some(id(&page.messages[1].id)),
            },
        )
        .await
        .unwrap();
    assert_eq!(older.messages.len(), 1);
    assert_eq!(older.messages[0].id, sent[0].message.id);
}

#[tokio::test]
async fn test_non_participant_cannot_read_or_post() {
    let store = MemoryStore::seeded();
    let chat = chat_service(&store);
    let thread = group(&chat, ALICE, &[BOB]).await;
    chat.create_message(id(&thread.id), BOB, text("private")).await.unwrap();

    assert_eq!(
        chat.list_messages(id(&thread.id), DAVE, Default::default())
            .await
            .unwrap_err(),
        ChatError::ParticipantNotFound
    );
    assert_eq!(
        chat.create_message(id(&thread.id), DAVE, text("let me in"))
            .await
            .unwrap_err(),
        ChatError::ParticipantNotFound
    );
    assert_eq!(
        chat.list_messages(424242, ALICE, Default::default())
            .await
            .unwrap_err(),
        ChatError::ThreadNotFound
    );
}

#[tokio::test]
async fn test_soft_deleted_message_disappears_immediately() {
    let store = MemoryStore::seeded();
    let chat = chat_service(&store);
    let thread = group(&chat, ALICE, &[BOB]).await;
    let thread_id = id(&thread.id);

    let keep = chat.create_message(thread_id, BOB, text("keep")).await.unwrap();
    let gone = chat.create_message(thread_id, BOB, text("gone")).await.unwrap();

    chat.soft_delete_message(thread_id, id(&gone.id), BOB).await.unwrap();

    let visible = chat.list_messages(thread_id, ALICE, Default::default()).await.unwrap();
    assert_eq!(visible.messages, vec![keep.clone()]);
    assert_eq!(visible.other_participant_id, None);
    assert_eq!(store.message_rows(), 2);

    // The thread summary falls back to the latest visible message.
    let summary = chat.get_thread(thread_id, ALICE).await.unwrap();
    assert_eq!(summary.last_message.map(|m| m.id), Some(keep.id));

    assert_eq!(
        chat.soft_delete_message(thread_id, id(&gone.id), BOB)
            .await
            .unwrap_err(),
        ChatError::MessageNotFound
    );
}

#[tokio::test]
async fn test_delete_permissions_in_group_thread() {
    let store = MemoryStore::seeded();
    let chat = chat_service(&store);
    let thread = group(&chat, ALICE, &[BOB, CAROL]).await;
    let thread_id = id(&thread.id);

    let by_bob = chat.create_message(thread_id, BOB, text("bob")).await.unwrap();
    let by_carol = chat.create_message(thread_id, CAROL, text("carol")).await.unwrap();

    // Neither sender nor creator.
    assert!(matches!(
        chat.soft_delete_message(thread_id, id(&by_carol.id), BOB).await,
        Err(ChatError::NotAllowed(_))
    ));
    // The creator may moderate.
    chat.soft_delete_message(thread_id, id(&by_carol.id), ALICE).await.unwrap();
    // Senders delete their own.
    chat.soft_delete_message(thread_id, id(&by_bob.id), BOB).await.unwrap();
}

#[tokio::test]
async fn test_either_direct_participant_may_delete() {
    let store = MemoryStore::seeded();
    let chat = chat_service(&store);

    let message = chat.send_direct_message(ALICE, BOB, text("oops")).await.unwrap().message;
    let thread_id = id(&message.thread_id);

    assert!(matches!(
        chat.soft_delete_message(thread_id, id(&message.id), CAROL).await,
        Err(ChatError::NotAllowed(_))
    ));
    chat.soft_delete_message(thread_id, id(&message.id), BOB).await.unwrap();
}

#[tokio::test]
async fn test_message_of_another_thread_is_not_found() {
    let store = MemoryStore::seeded();
    let chat = chat_service(&store);
    let first = group(&chat, ALICE, &[BOB]).await;
    let second = group(&chat, ALICE, &[BOB]).await;

    let message = chat.create_message(id(&first.id), ALICE, text("here")).await.unwrap();

    assert_eq!(
        chat.soft_delete_message(id(&second.id), id(&message.id), ALICE)
            .await
            .unwrap_err(),
        ChatError::MessageNotFound
    );
    assert_eq!(
        chat.edit_message(id(&second.id), id(&message.id), ALICE, "moved".into())
            .await
            .unwrap_err(),
        ChatError::MessageNotFound
    );
}

#[tokio::test]
async fn test_bulk_delete() {
    let store = MemoryStore::seeded();
    let chat = chat_service(&store);
    let thread = group(&chat, ALICE, &[BOB]).await;
    let thread_id = id(&thread.id);

    for content in ["a", "b", "c"] {
        chat.create_message(thread_id, BOB, text(content)).await.unwrap();
    }

    assert!(matches!(
        chat.soft_delete_all_messages(thread_id, BOB).await,
        Err(ChatError::NotAllowed(_))
    ));
    assert_eq!(chat.soft_delete_all_messages(thread_id, ALICE).await.unwrap(), 3);
    assert_eq!(chat.soft_delete_all_messages(thread_id, ALICE).await.unwrap(), 0);
    assert!(chat
        .list_messages(thread_id, BOB, Default::default())
        .await
        .unwrap()
        .messages
        .is_empty());
}

#[tokio::test]
async fn test_edit_rules() {
    let store = MemoryStore::seeded();
    let chat = chat_service(&store);
    let thread = group(&chat, ALICE, &[BOB]).await;
    let thread_id = id(&thread.id);

    let message = chat.create_message(thread_id, BOB, text("typo")).await.unwrap();
    let message_id = id(&message.id);

    let edited = chat
        .edit_message(thread_id, message_id, BOB, "fixed".into())
        .await
        .unwrap();
    assert_eq!(edited.content, "fixed");
    assert!(edited.edited_at.is_some());
    assert_eq!(edited.created_at, message.created_at);

    assert!(matches!(
        chat.edit_message(thread_id, message_id, ALICE, "not mine".into()).await,
        Err(ChatError::NotAllowed(_))
    ));

    chat.soft_delete_message(thread_id, message_id, BOB).await.unwrap();
    assert!(matches!(
        chat.edit_message(thread_id, message_id, BOB, "too late".into()).await,
        Err(ChatError::NotAllowed(_))
    ));
}

#[tokio::test]
async fn test_edit_after_window_closes() {
    let store = MemoryStore::seeded();
    // No weekday extension so the result does not depend on today's date.
    let chat = chat_service_with_window(
        &store,
        thread_chat::domain::EditWindow::new(15, 0, Vec::new(), 0).unwrap(),
    );
    let thread = group(&chat, ALICE, &[BOB]).await;
    let thread_id = id(&thread.id);

    let recent = chat.create_message(thread_id, BOB, text("recent")).await.unwrap();
    let old = chat.create_message(thread_id, BOB, text("old")).await.unwrap();
    store.backdate_message(id(&recent.id), Utc::now() - Duration::minutes(14));
    store.backdate_message(id(&old.id), Utc::now() - Duration::minutes(16));

    chat.edit_message(thread_id, id(&recent.id), BOB, "still ok".into())
        .await
        .unwrap();
    assert!(matches!(
        chat.edit_message(thread_id, id(&old.id), BOB, "closed".into()).await,
        Err(ChatError::NotAllowed(_))
    ));
}
