mod mocks;

use flyerbot::components::whatsapp::{InboundEvent, InboundKind};
use flyerbot::components::{CredentialStore, EventLedger};
use mocks::{
    expired_credential, sample_details, valid_credential, RefreshBehavior, Setup, TestBot, USER,
};

fn text(body: &str) -> InboundEvent {
    InboundEvent {
        sender: USER.to_string(),
        kind: InboundKind::Text {
            body: body.to_string(),
        },
    }
}

fn image() -> InboundEvent {
    InboundEvent {
        sender: USER.to_string(),
        kind: InboundKind::Image {
            media_id: "MEDIA_1".to_string(),
        },
    }
}

/// Registered user with one pending event, call log cleared of setup noise
async fn bot_with_pending(setup: Setup) -> TestBot {
    let bot = TestBot::with(setup);
    bot.register(valid_credential()).await;
    bot.controller.handle(image()).await;
    assert_eq!(bot.pending_count().await, 1);
    bot
}

#[tokio::test]
async fn test_image_without_credential_sends_authorization_link() {
    let bot = TestBot::new();

    bot.controller.handle(image()).await;

    assert_eq!(bot.log.count("extract"), 1);
    assert!(bot.store.all_events().await.is_empty());
    let sent = bot.messenger.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, USER);
    assert!(sent[0]
        .1
        .contains("https://bot.example/auth/google?phone=358401234567"));
}

#[tokio::test]
async fn test_image_from_known_user_stores_pending_event() {
    let bot = TestBot::new();
    bot.register(valid_credential()).await;

    bot.controller.handle(image()).await;

    let events = bot.store.all_events().await;
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert!(event.is_pending());
    assert_eq!(event.title, "Summer Party");
    assert_eq!(event.channel_address, USER);
    assert!(event.invitees.is_empty());

    let reply = bot.messenger.last_reply();
    assert!(reply.contains("Summer Party"));
    assert!(reply.contains("Rooftop"));
    assert!(reply.contains("90%"));
    assert!(reply.contains(&event.id[..8]));
    assert!(reply.contains("CONFIRM"));
    assert_eq!(bot.log.count("refresh"), 0);
}

#[tokio::test]
async fn test_image_with_expired_credential_refreshes_first() {
    let bot = TestBot::new();
    bot.register(expired_credential()).await;

    bot.controller.handle(image()).await;

    assert_eq!(bot.log.count("refresh"), 1);
    assert_eq!(bot.pending_count().await, 1);
    let user = bot.store.find_user(USER).await.unwrap().unwrap();
    assert_eq!(user.credential.access_token, "fresh-for-refresh-1");
}

#[tokio::test]
async fn test_image_failures_reply_without_ledger_write() {
    for setup in [
        Setup {
            fail_fetch: true,
            ..Setup::default()
        },
        Setup {
            fail_extract: true,
            ..Setup::default()
        },
    ] {
        let bot = TestBot::with(setup);
        bot.register(valid_credential()).await;

        bot.controller.handle(image()).await;

        assert!(bot.store.all_events().await.is_empty());
        assert_eq!(bot.messenger.sent().len(), 1);
        assert!(bot
            .messenger
            .last_reply()
            .contains("couldn't process the image"));
    }
}

#[tokio::test]
async fn test_confirm_publishes_and_marks_event() {
    let bot = bot_with_pending(Setup::default()).await;

    bot.controller.handle(text("confirm")).await;

    assert_eq!(bot.publisher.published().len(), 1);
    assert_eq!(bot.pending_count().await, 0);
    let events = bot.store.all_events().await;
    assert_eq!(events[0].calendar_event_id.as_deref(), Some("gcal-1"));
    let reply = bot.messenger.last_reply();
    assert!(reply.contains("Event created successfully"));
    assert!(reply.contains("gcal-1"));
}

#[tokio::test]
async fn test_uppercase_confirm_matches_lowercase() {
    let bot = bot_with_pending(Setup::default()).await;

    bot.controller.handle(text("  CONFIRM ")).await;

    assert_eq!(bot.publisher.published().len(), 1);
    assert_eq!(bot.pending_count().await, 0);
}

#[tokio::test]
async fn test_confirm_without_pending_never_publishes() {
    let bot = TestBot::new();
    bot.register(valid_credential()).await;

    bot.controller.handle(text("confirm")).await;

    assert_eq!(bot.log.count("publish"), 0);
    assert!(bot.messenger.last_reply().contains("No pending event found"));
}

#[tokio::test]
async fn test_confirm_without_credential_asks_to_authenticate() {
    let bot = TestBot::new();
    bot.store
        .insert(flyerbot::components::storage::NewPendingEvent {
            user_id: "orphan".to_string(),
            channel_address: USER.to_string(),
            title: "Orphan".to_string(),
            description: None,
            start_date: "2024-07-06T18:00:00Z".to_string(),
            end_date: "2024-07-06T20:00:00Z".to_string(),
            location: None,
            invitees: Vec::new(),
        })
        .await
        .unwrap();

    bot.controller.handle(text("confirm")).await;

    assert_eq!(bot.log.count("publish"), 0);
    assert_eq!(bot.pending_count().await, 1);
    let reply = bot.messenger.last_reply();
    assert!(reply.contains("authenticate first"));
    assert!(reply.contains("/auth/google?phone=358401234567"));
}

#[tokio::test]
async fn test_expired_credential_refreshes_exactly_once_before_publish() {
    let bot = TestBot::new();
    bot.register(valid_credential()).await;
    bot.controller.handle(image()).await;
    bot.register(expired_credential()).await;

    bot.controller.handle(text("confirm")).await;

    let calls: Vec<String> = bot
        .log
        .calls()
        .into_iter()
        .filter(|c| c == "refresh" || c == "publish")
        .collect();
    assert_eq!(calls, vec!["refresh", "publish"]);

    // Publisher received the refreshed token and the refresh token survived
    assert_eq!(bot.publisher.published()[0].0, "fresh-for-refresh-1");
    let user = bot.store.find_user(USER).await.unwrap().unwrap();
    assert_eq!(user.credential.refresh_token, "refresh-1");
    assert!(!user.credential.is_expired_at(chrono::Utc::now()));
}

#[tokio::test]
async fn test_sequential_double_confirm_publishes_once() {
    let bot = bot_with_pending(Setup::default()).await;

    bot.controller.handle(text("confirm")).await;
    bot.controller.handle(text("confirm")).await;

    assert_eq!(bot.log.count("publish"), 1);
    let sent = bot.messenger.sent();
    assert!(sent[sent.len() - 2].1.contains("Event created successfully"));
    assert!(sent[sent.len() - 1].1.contains("No pending event found"));
}

#[tokio::test]
async fn test_concurrent_confirms_both_publish() {
    // Lookup and mark are separate ledger calls, so overlapping confirms both
    // see the pending event before either marks it
    let bot = bot_with_pending(Setup {
        concurrent_publishes: Some(2),
        ..Setup::default()
    })
    .await;

    tokio::join!(
        bot.controller.handle(text("confirm")),
        bot.controller.handle(text("confirm"))
    );

    let published = bot.publisher.published();
    assert_eq!(published.len(), 2);
    assert_eq!(published[0].1, published[1].1);

    // The last mark wins; the event is no longer pending either way
    let events = bot.store.all_events().await;
    assert_eq!(events.len(), 1);
    let winner = events[0].calendar_event_id.clone().unwrap();
    assert!(winner == "gcal-1" || winner == "gcal-2");
    assert_eq!(bot.pending_count().await, 0);

    let created = bot
        .messenger
        .sent()
        .iter()
        .filter(|(_, body)| body.contains("Event created successfully"))
        .count();
    assert_eq!(created, 2);
}

#[tokio::test]
async fn test_publish_failure_keeps_event_pending_for_retry() {
    let bot = bot_with_pending(Setup::default()).await;
    bot.publisher.set_failing(true);

    bot.controller.handle(text("confirm")).await;

    assert_eq!(bot.pending_count().await, 1);
    assert!(bot
        .messenger
        .last_reply()
        .contains("couldn't create the calendar event"));

    bot.publisher.set_failing(false);
    bot.controller.handle(text("confirm")).await;

    assert_eq!(bot.pending_count().await, 0);
    assert_eq!(bot.publisher.published().len(), 1);
}

#[tokio::test]
async fn test_transient_refresh_failure_is_generic_error() {
    let bot = bot_with_pending(Setup {
        refresh: RefreshBehavior::Fail,
        ..Setup::default()
    })
    .await;
    bot.register(expired_credential()).await;

    bot.controller.handle(text("confirm")).await;

    assert_eq!(bot.log.count("publish"), 0);
    assert_eq!(bot.pending_count().await, 1);
    assert!(bot
        .messenger
        .last_reply()
        .contains("couldn't create the calendar event"));
}

#[tokio::test]
async fn test_revoked_refresh_token_asks_to_reconnect() {
    let bot = bot_with_pending(Setup {
        refresh: RefreshBehavior::Revoked,
        ..Setup::default()
    })
    .await;
    bot.register(expired_credential()).await;

    bot.controller.handle(text("confirm")).await;

    assert_eq!(bot.log.count("publish"), 0);
    assert_eq!(bot.pending_count().await, 1);
    let reply = bot.messenger.last_reply();
    assert!(reply.contains("expired or was revoked"));
    assert!(reply.contains("/auth/google?phone=358401234567"));
}

#[tokio::test]
async fn test_revoked_refresh_on_image_asks_to_reconnect() {
    let bot = TestBot::with(Setup {
        refresh: RefreshBehavior::Revoked,
        ..Setup::default()
    });
    bot.register(expired_credential()).await;

    bot.controller.handle(image()).await;

    assert!(bot.store.all_events().await.is_empty());
    let reply = bot.messenger.last_reply();
    assert!(reply.contains("expired or was revoked"));
    assert!(reply.contains("/auth/google?phone=358401234567"));
}

#[tokio::test]
async fn test_flyer_times_without_offset_stay_local() {
    let mut details = sample_details();
    details.start_date = "2024-06-01T18:00:00".to_string();
    details.end_date = "2024-06-01T20:00:00".to_string();
    let bot = TestBot::with(Setup {
        details,
        timezone: chrono_tz::Europe::Helsinki,
        ..Setup::default()
    });
    bot.register(valid_credential()).await;

    bot.controller.handle(image()).await;

    assert!(bot.messenger.last_reply().contains("*Time:* 18:00 - 20:00"));
    assert_eq!(bot.store.all_events().await[0].start_date, "2024-06-01T18:00:00");
}

#[tokio::test]
async fn test_cancel_is_idempotent() {
    let bot = TestBot::new();

    bot.controller.handle(text("cancel")).await;
    bot.controller.handle(text("CANCEL")).await;

    let sent = bot.messenger.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().all(|(_, body)| body.contains("Event cancelled")));
}

#[tokio::test]
async fn test_cancel_removes_pending_event() {
    let bot = bot_with_pending(Setup::default()).await;

    bot.controller.handle(text("❌ Cancel")).await;

    assert!(bot.store.all_events().await.is_empty());
    bot.controller.handle(text("confirm")).await;
    assert_eq!(bot.log.count("publish"), 0);
}

#[tokio::test]
async fn test_edit_messages_do_not_touch_pending_event() {
    let bot = bot_with_pending(Setup::default()).await;
    let before = bot.store.all_events().await;

    bot.controller.handle(text("edit")).await;
    assert!(bot.messenger.last_reply().contains("Editing is not supported yet"));

    bot.controller.handle(text("Change title to: Winter Party")).await;
    assert!(bot.messenger.last_reply().contains("Edit functionality coming soon"));

    let after = bot.store.all_events().await;
    assert_eq!(after.len(), before.len());
    assert_eq!(after[0].title, "Summer Party");
}

#[tokio::test]
async fn test_unknown_text_gets_help() {
    let bot = TestBot::new();

    bot.controller.handle(text("what can you do?")).await;

    let reply = bot.messenger.last_reply();
    assert!(reply.contains("*CONFIRM*"));
    assert!(reply.contains("*HELP*"));
    assert!(bot.store.all_events().await.is_empty());
}

#[tokio::test]
async fn test_every_event_gets_exactly_one_reply() {
    let bot = TestBot::new();
    bot.register(valid_credential()).await;

    for event in [image(), text("edit"), text("confirm"), text("confirm"), text("cancel")] {
        bot.controller.handle(event).await;
    }

    assert_eq!(bot.log.count("send"), 5);
}
