// SPDX-FileCopyrightText: 2026 Afterimage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests driving the mirror through the mock gateway.

use afterimage_config::model::DeletionConfig;
use afterimage_core::types::{
    MediaKind, MessageId, OutboundBody, OutboundMedia, OwnerCommand, Sender, UserId,
};
use afterimage_core::OwnerDirectory;
use afterimage_mirror::render::NOT_IN_CACHE;
use afterimage_mirror::{Classification, ClearReason, EventOutcome};
use afterimage_test_utils::{TestHarness, fixtures};
use tokio_util::sync::CancellationToken;

/// Stores `count` counterpart messages with ids starting at 1.
async fn seed(harness: &mut TestHarness, count: i64) {
    for id in 1..=count {
        harness
            .handle(fixtures::text_message(id, &format!("message {id}")))
            .await
            .unwrap();
    }
}

fn sent_texts(sent: &[afterimage_core::types::OutboundMessage]) -> Vec<String> {
    sent.iter()
        .filter_map(|m| m.caption_or_text().map(str::to_string))
        .collect()
}

#[tokio::test]
async fn inbound_message_is_stored_and_counted() {
    let mut harness = TestHarness::connected().await.unwrap();

    let outcome = harness
        .handle(fixtures::text_message(1, "hello"))
        .await
        .unwrap();
    let EventOutcome::Stored { message, recovered } = outcome else {
        panic!("expected a stored message");
    };
    assert_eq!(message.text, "hello");
    assert!(recovered.is_none());

    let row = harness
        .mirror
        .get_message(fixtures::OWNER, fixtures::CHAT, MessageId(1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.sender_id, Some(fixtures::COUNTERPART));
    assert!(!row.observed_at.is_empty());

    let stats = harness.mirror.stats(fixtures::OWNER).await.unwrap();
    assert_eq!(stats.messages, 1);
    assert_eq!(harness.gateway.sent_count().await, 0);
}

#[tokio::test]
async fn photo_is_downloaded_into_media_dir() {
    let mut harness = TestHarness::connected().await.unwrap();
    harness.gateway.add_download("photo-1", b"jpeg").await;

    harness
        .handle(fixtures::photo_message(3, "photo-1", Some("sunset")))
        .await
        .unwrap();

    let row = harness
        .mirror
        .get_message(fixtures::OWNER, fixtures::CHAT, MessageId(3))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.media_kind, MediaKind::Photo);
    assert_eq!(row.caption.as_deref(), Some("sunset"));
    let media_ref = row.media_ref.unwrap();
    assert!(media_ref.ends_with("2000_3_photo.jpg"));
    assert_eq!(std::fs::read(media_ref).unwrap(), b"jpeg".to_vec());
}

#[tokio::test]
async fn failed_download_still_stores_message() {
    let mut harness = TestHarness::connected().await.unwrap();

    harness
        .handle(fixtures::photo_message(3, "not-registered", Some("caption kept")))
        .await
        .unwrap();

    let row = harness
        .mirror
        .get_message(fixtures::OWNER, fixtures::CHAT, MessageId(3))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.media_kind, MediaKind::Photo);
    assert_eq!(row.media_ref, None);
    assert_eq!(row.caption.as_deref(), Some("caption kept"));
}

#[tokio::test]
async fn unknown_connection_is_skipped() {
    let mut harness = TestHarness::new().await.unwrap();
    let outcome = harness
        .handle(fixtures::text_message(1, "nobody home"))
        .await
        .unwrap();
    assert_eq!(outcome, EventOutcome::Skipped);
    assert!(
        harness
            .mirror
            .list_messages(fixtures::OWNER, fixtures::CHAT, None)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn edit_reports_old_and_new_text() {
    let mut harness = TestHarness::connected().await.unwrap();
    harness
        .handle(fixtures::text_message(1, "see you at 5"))
        .await
        .unwrap();

    let outcome = harness
        .handle(fixtures::edited(1, "see you at 6"))
        .await
        .unwrap();
    let EventOutcome::Edited(report) = outcome else {
        panic!("expected an edit report");
    };
    assert_eq!(report.old_text.as_deref(), Some("see you at 5"));
    assert_eq!(report.new_text, "see you at 6");
    assert!(report.notified);

    let sent = harness.gateway.sent_messages().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].chat.0, fixtures::OWNER.0);
    let text = sent[0].caption_or_text().unwrap();
    assert!(text.contains("see you at 5"));
    assert!(text.contains("see you at 6"));

    let row = harness
        .mirror
        .get_message(fixtures::OWNER, fixtures::CHAT, MessageId(1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.text, "see you at 6");
    assert_eq!(harness.mirror.stats(fixtures::OWNER).await.unwrap().edits, 1);
}

#[tokio::test]
async fn edit_of_unknown_message_reports_missing_old_text() {
    let mut harness = TestHarness::connected().await.unwrap();

    let outcome = harness.handle(fixtures::edited(42, "new")).await.unwrap();
    let EventOutcome::Edited(report) = outcome else {
        panic!("expected an edit report");
    };
    assert_eq!(report.old_text, None);

    let sent = harness.gateway.sent_messages().await;
    assert!(sent[0].caption_or_text().unwrap().contains(NOT_IN_CACHE));
}

#[tokio::test]
async fn edit_of_captionless_photo_reports_empty_old_text() {
    let mut harness = TestHarness::connected().await.unwrap();
    harness.gateway.add_download("p1", b"jpeg").await;
    harness
        .handle(fixtures::photo_message(3, "p1", None))
        .await
        .unwrap();

    let outcome = harness.handle(fixtures::edited(3, "added")).await.unwrap();
    let EventOutcome::Edited(report) = outcome else {
        panic!("expected an edit report");
    };
    assert_eq!(report.old_text.as_deref(), Some(""));
    assert_eq!(report.new_text, "added");

    let sent = harness.gateway.sent_messages().await;
    assert_eq!(sent.len(), 1);
    let text = sent[0].caption_or_text().unwrap();
    assert!(!text.contains(NOT_IN_CACHE));
    assert!(text.contains("added"));
}

#[tokio::test]
async fn owner_edit_is_stored_silently() {
    let mut harness = TestHarness::connected().await.unwrap();
    harness
        .handle(fixtures::owner_message(1, "draft"))
        .await
        .unwrap();

    let outcome = harness
        .handle(fixtures::owner_edited(1, "final"))
        .await
        .unwrap();
    let EventOutcome::Edited(report) = outcome else {
        panic!("expected an edit report");
    };
    assert!(!report.notified);
    assert_eq!(harness.gateway.sent_count().await, 0);
    assert_eq!(harness.mirror.stats(fixtures::OWNER).await.unwrap().edits, 0);

    let row = harness
        .mirror
        .get_message(fixtures::OWNER, fixtures::CHAT, MessageId(1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.text, "final");
}

#[tokio::test]
async fn single_deletion_in_busy_chat_is_reported_and_removed() {
    let mut harness = TestHarness::connected().await.unwrap();
    seed(&mut harness, 6).await;

    let outcome = harness.handle(fixtures::deleted(&[4])).await.unwrap();
    let EventOutcome::Deleted(report) = outcome else {
        panic!("expected a deletion report");
    };
    assert_eq!(report.classification, Classification::Ordinary);
    assert_eq!(report.total_before, 6);
    assert_eq!(report.notified, 1);
    assert!(!report.archived);

    let sent = harness.gateway.sent_messages().await;
    assert_eq!(sent.len(), 1);
    let text = sent[0].caption_or_text().unwrap();
    assert!(text.contains("deleted a message"));
    assert!(text.contains("message 4"));

    assert!(
        harness
            .mirror
            .get_message(fixtures::OWNER, fixtures::CHAT, MessageId(4))
            .await
            .unwrap()
            .is_none()
    );
    assert_eq!(harness.mirror.stats(fixtures::OWNER).await.unwrap().deletes, 1);
}

#[tokio::test]
async fn batch_deletion_sends_archive_before_notices() {
    let mut harness = TestHarness::connected().await.unwrap();
    seed(&mut harness, 4).await;
    harness
        .handle(fixtures::owner_message(5, "my reply"))
        .await
        .unwrap();

    let outcome = harness
        .handle(fixtures::deleted(&[1, 2, 5]))
        .await
        .unwrap();
    let EventOutcome::Deleted(report) = outcome else {
        panic!("expected a deletion report");
    };
    assert!(report.archived);
    assert_eq!(report.classification, Classification::ChatClear);
    assert_eq!(report.reason, Some(ClearReason::BatchSize));
    assert_eq!(report.notified, 2);
    assert_eq!(report.silent, 1);

    let sent = harness.gateway.sent_messages().await;
    assert_eq!(sent.len(), 3);
    match &sent[0].body {
        OutboundBody::Document {
            file_name,
            bytes,
            caption,
        } => {
            assert!(file_name.starts_with("chat_backup_2000_"));
            assert!(file_name.ends_with(".html"));
            let html = String::from_utf8(bytes.clone()).unwrap();
            assert!(html.contains("message 1"));
            assert!(html.contains("my reply"));
            assert!(html.contains("5 messages"));
            assert!(caption.as_deref().unwrap().contains("whole chat was cleared"));
        }
        other => panic!("expected the archive document first, got {other:?}"),
    }

    let remaining = harness
        .mirror
        .list_messages(fixtures::OWNER, fixtures::CHAT, None)
        .await
        .unwrap();
    let ids: Vec<i64> = remaining.iter().map(|m| m.message_id.0).collect();
    assert_eq!(ids, vec![3, 4]);
}

#[tokio::test]
async fn spaced_single_deletions_become_a_burst() {
    let mut harness = TestHarness::connected().await.unwrap();
    seed(&mut harness, 20).await;

    let mut reasons = Vec::new();
    for id in 1..=3 {
        let EventOutcome::Deleted(report) = harness.handle(fixtures::deleted(&[id])).await.unwrap()
        else {
            panic!("expected a deletion report");
        };
        reasons.push(report.reason);
    }
    assert_eq!(reasons, vec![None, None, Some(ClearReason::Burst)]);
    assert_eq!(harness.mirror.classifier().window().recent_total(fixtures::CHAT), 3);
}

#[tokio::test]
async fn configured_policy_is_honored() {
    let mut harness = TestHarness::builder()
        .with_deletion(DeletionConfig {
            min_batch: 10,
            clear_ratio: 1.0,
            burst_threshold: 100,
            ..DeletionConfig::default()
        })
        .build()
        .await
        .unwrap()
        .with_owner_connected()
        .await
        .unwrap();
    seed(&mut harness, 3).await;

    let EventOutcome::Deleted(report) = harness.handle(fixtures::deleted(&[1, 2])).await.unwrap()
    else {
        panic!("expected a deletion report");
    };
    assert_eq!(report.classification, Classification::Ordinary);
    assert_eq!(report.notified, 2);
    assert_eq!(harness.gateway.sent_count().await, 2);
}

#[tokio::test]
async fn missing_ids_are_skipped() {
    let mut harness = TestHarness::connected().await.unwrap();
    seed(&mut harness, 6).await;

    let EventOutcome::Deleted(report) = harness.handle(fixtures::deleted(&[99])).await.unwrap()
    else {
        panic!("expected a deletion report");
    };
    assert_eq!(report.skipped, 1);
    assert_eq!(report.notified, 0);
    assert_eq!(harness.gateway.sent_count().await, 0);
}

#[tokio::test]
async fn transient_failure_keeps_row_until_redelivered() {
    let mut harness = TestHarness::connected().await.unwrap();
    seed(&mut harness, 10).await;
    harness.gateway.fail_next_sends(1);

    let EventOutcome::Deleted(first) = harness.handle(fixtures::deleted(&[2])).await.unwrap()
    else {
        panic!("expected a deletion report");
    };
    assert_eq!(first.failed, 1);
    assert_eq!(first.notified, 0);
    let kept = harness
        .mirror
        .get_message(fixtures::OWNER, fixtures::CHAT, MessageId(2))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(kept.delivery_attempts, 1);

    let EventOutcome::Deleted(second) = harness.handle(fixtures::deleted(&[2])).await.unwrap()
    else {
        panic!("expected a deletion report");
    };
    assert_eq!(second.notified, 1);
    assert_eq!(harness.gateway.send_attempts(), 2);
    assert_eq!(harness.gateway.sent_count().await, 1);
    assert!(
        harness
            .mirror
            .get_message(fixtures::OWNER, fixtures::CHAT, MessageId(2))
            .await
            .unwrap()
            .is_none()
    );
    let stats = harness.mirror.stats(fixtures::OWNER).await.unwrap();
    assert_eq!(stats.deletes, 1);
}

#[tokio::test]
async fn undeliverable_notice_is_dropped_after_budget() {
    // Repeated single deletions must not add up to a burst here.
    let mut harness = TestHarness::builder()
        .with_max_delivery_attempts(3)
        .with_deletion(DeletionConfig {
            burst_threshold: 10,
            ..DeletionConfig::default()
        })
        .build()
        .await
        .unwrap()
        .with_owner_connected()
        .await
        .unwrap();
    seed(&mut harness, 20).await;
    harness.gateway.fail_all_sends(true);

    for attempt in 1..=3 {
        let EventOutcome::Deleted(report) =
            harness.handle(fixtures::deleted(&[2])).await.unwrap()
        else {
            panic!("expected a deletion report");
        };
        let still_stored = harness
            .mirror
            .get_message(fixtures::OWNER, fixtures::CHAT, MessageId(2))
            .await
            .unwrap()
            .is_some();
        if attempt < 3 {
            assert_eq!((report.failed, report.dropped), (1, 0));
            assert!(still_stored);
        } else {
            assert_eq!((report.failed, report.dropped), (0, 1));
            assert!(!still_stored);
        }
    }
    assert_eq!(harness.gateway.send_attempts(), 3);
}

#[tokio::test]
async fn owner_without_subscription_gets_redacted_notice() {
    let mut harness = TestHarness::builder()
        .with_trial_days(0)
        .build()
        .await
        .unwrap()
        .with_owner_connected()
        .await
        .unwrap();
    seed(&mut harness, 6).await;

    harness.handle(fixtures::deleted(&[1])).await.unwrap();

    let sent = harness.gateway.sent_messages().await;
    let text = sent[0].caption_or_text().unwrap();
    assert!(text.contains("Content hidden"));
    assert!(!text.contains("message 1"));
}

#[tokio::test]
async fn deleted_photo_is_delivered_as_photo() {
    let mut harness = TestHarness::connected().await.unwrap();
    seed(&mut harness, 5).await;
    harness.gateway.add_download("photo-9", b"jpeg").await;
    harness
        .handle(fixtures::photo_message(9, "photo-9", Some("beach")))
        .await
        .unwrap();

    harness.handle(fixtures::deleted(&[9])).await.unwrap();

    let sent = harness.gateway.sent_messages().await;
    assert_eq!(sent.len(), 1);
    match &sent[0].body {
        OutboundBody::File { media, caption, .. } => {
            assert_eq!(*media, OutboundMedia::Photo);
            assert!(caption.as_deref().unwrap().contains("beach"));
        }
        other => panic!("expected a photo, got {other:?}"),
    }
}

#[tokio::test]
async fn media_send_failure_falls_back_to_text() {
    let mut harness = TestHarness::connected().await.unwrap();
    seed(&mut harness, 5).await;
    harness.gateway.add_download("photo-9", b"jpeg").await;
    harness
        .handle(fixtures::photo_message(9, "photo-9", Some("beach")))
        .await
        .unwrap();
    harness.gateway.fail_next_sends(1);

    let EventOutcome::Deleted(report) = harness.handle(fixtures::deleted(&[9])).await.unwrap()
    else {
        panic!("expected a deletion report");
    };
    assert_eq!(report.notified, 1);
    let sent = harness.gateway.sent_messages().await;
    assert!(matches!(sent[0].body, OutboundBody::Text(_)));
}

#[tokio::test]
async fn reply_to_view_once_photo_recovers_it() {
    let mut harness = TestHarness::connected().await.unwrap();
    harness.gateway.add_download("secret", b"once").await;

    let outcome = harness
        .handle(fixtures::reply_to_view_once_photo(20, 19, "secret"))
        .await
        .unwrap();
    let EventOutcome::Stored { recovered, .. } = outcome else {
        panic!("expected a stored message");
    };
    let recovered = recovered.unwrap();
    assert_eq!(recovered.message_id, MessageId(19));
    assert_eq!(recovered.media_kind, MediaKind::PhotoReply);
    assert!(recovered.forwarded);
    assert!(recovered.path.ends_with("2000_19_photo_reply.jpg"));

    let original = harness
        .mirror
        .get_message(fixtures::OWNER, fixtures::CHAT, MessageId(19))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(original.media_kind, MediaKind::PhotoReply);
    assert_eq!(original.sender_id, Some(fixtures::COUNTERPART));

    let reply = harness
        .mirror
        .get_message(fixtures::OWNER, fixtures::CHAT, MessageId(20))
        .await
        .unwrap();
    assert!(reply.is_some());

    let sent = harness.gateway.sent_messages().await;
    assert_eq!(sent.len(), 1);
    assert!(matches!(
        sent[0].body,
        OutboundBody::File {
            media: OutboundMedia::Photo,
            ..
        }
    ));
    assert!(sent[0].caption_or_text().unwrap().contains("View-once photo"));
}

#[tokio::test]
async fn failed_recovery_still_stores_reply() {
    let mut harness = TestHarness::connected().await.unwrap();

    let outcome = harness
        .handle(fixtures::reply_to_view_once_photo(20, 19, "gone"))
        .await
        .unwrap();
    let EventOutcome::Stored { message, recovered } = outcome else {
        panic!("expected a stored message");
    };
    assert!(recovered.is_none());
    assert_eq!(message.message_id, MessageId(20));
    assert_eq!(harness.gateway.sent_count().await, 0);
}

#[tokio::test]
async fn connection_grants_trial_and_welcomes() {
    let mut harness = TestHarness::builder().with_welcome().build().await.unwrap();

    let EventOutcome::Connected(report) = harness.handle(fixtures::connected(true)).await.unwrap()
    else {
        panic!("expected a connection report");
    };
    assert!(report.new_owner);
    assert!(report.trial_granted);
    assert!(report.welcomed);

    let sub = harness
        .storage
        .subscription(fixtures::OWNER)
        .await
        .unwrap()
        .unwrap();
    assert!(sub.is_active(chrono::Utc::now()));

    let sent = sent_texts(&harness.gateway.sent_messages().await);
    assert!(sent[0].contains("is connected"));

    // Reconnecting keeps the existing trial.
    let EventOutcome::Connected(again) = harness.handle(fixtures::connected(true)).await.unwrap()
    else {
        panic!("expected a connection report");
    };
    assert!(!again.new_owner);
    assert!(!again.trial_granted);
}

#[tokio::test]
async fn disabled_connection_stops_mirroring() {
    let mut harness = TestHarness::connected().await.unwrap();
    harness.handle(fixtures::connected(false)).await.unwrap();

    let outcome = harness
        .handle(fixtures::text_message(1, "after disable"))
        .await
        .unwrap();
    assert_eq!(outcome, EventOutcome::Skipped);
}

#[tokio::test]
async fn stats_command_answers_registered_owner() {
    let mut harness = TestHarness::connected().await.unwrap();
    seed(&mut harness, 2).await;

    harness
        .handle(fixtures::command(fixtures::owner(), OwnerCommand::Stats))
        .await
        .unwrap();

    let sent = harness.gateway.sent_messages().await;
    assert_eq!(sent[0].chat.0, fixtures::OWNER.0);
    assert!(sent[0].caption_or_text().unwrap().contains("Messages saved: 2"));
}

#[tokio::test]
async fn commands_from_strangers_get_connection_help() {
    let mut harness = TestHarness::connected().await.unwrap();
    let stranger = Sender {
        id: UserId(31337),
        first_name: "Eve".into(),
        username: None,
    };

    harness
        .handle(fixtures::command(stranger, OwnerCommand::Start))
        .await
        .unwrap();

    let sent = harness.gateway.sent_messages().await;
    assert_eq!(sent[0].chat.0, 31337);
    assert!(sent[0].caption_or_text().unwrap().contains("Telegram Business"));
}

#[tokio::test]
async fn archive_marks_outgoing_bubbles_and_escapes_text() {
    let mut harness = TestHarness::connected().await.unwrap();
    harness
        .handle(fixtures::text_message(1, "<script>alert(1)</script>"))
        .await
        .unwrap();
    harness
        .handle(fixtures::owner_message(2, "fine"))
        .await
        .unwrap();

    let archive = harness
        .mirror
        .render_archive(fixtures::OWNER, fixtures::CHAT, "Carl", None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(archive.message_count, 2);
    assert!(archive.html.contains(r#"class="msg in""#));
    assert!(archive.html.contains(r#"class="msg out""#));
    assert!(archive.html.contains("&lt;script&gt;"));
    assert!(!archive.html.contains("<script>"));

    let limited = harness
        .mirror
        .render_archive(fixtures::OWNER, fixtures::CHAT, "Carl", Some(1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(limited.message_count, 1);
    assert!(limited.html.contains("fine"));
}

#[tokio::test]
async fn archive_embeds_stored_photos() {
    let mut harness = TestHarness::connected().await.unwrap();
    harness.gateway.add_download("p", b"jpeg").await;
    harness
        .handle(fixtures::photo_message(1, "p", None))
        .await
        .unwrap();

    let archive = harness
        .mirror
        .render_archive(fixtures::OWNER, fixtures::CHAT, "Carl", None)
        .await
        .unwrap()
        .unwrap();
    assert!(archive.html.contains("data:image/jpeg;base64,anBlZw=="));
}

#[tokio::test]
async fn empty_chat_has_no_archive() {
    let harness = TestHarness::connected().await.unwrap();
    let archive = harness
        .mirror
        .render_archive(fixtures::OWNER, fixtures::CHAT, "Carl", None)
        .await
        .unwrap();
    assert!(archive.is_none());
}

#[tokio::test]
async fn run_consumes_events_until_stream_closes() {
    let mut harness = TestHarness::connected().await.unwrap();
    harness
        .gateway
        .inject_event(fixtures::text_message(1, "queued"))
        .await;
    harness.gateway.inject_event(fixtures::edited(1, "changed")).await;
    harness.gateway.close();

    harness
        .mirror
        .run(CancellationToken::new())
        .await
        .unwrap();

    let sent = harness.gateway.sent_messages().await;
    assert_eq!(sent.len(), 1);
    assert!(sent[0].caption_or_text().unwrap().contains("changed"));
}

#[tokio::test]
async fn run_stops_on_cancellation() {
    let mut harness = TestHarness::connected().await.unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();

    tokio::time::timeout(
        std::time::Duration::from_secs(5),
        harness.mirror.run(cancel),
    )
    .await
    .expect("run did not stop")
    .unwrap();
}
