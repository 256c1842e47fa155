use super::commands::CommandBot;
use super::telegram::{Chat, Message, TelegramClient, Update};
use super::{Messenger, SendOptions};
use crate::config::TelegramConfig;
use crate::pipeline::media::{MediaAsset, MediaKind};
use crate::store::{ControlFlags, MemoryStore};
use anyhow::Result;
use httpmock::prelude::*;
use std::sync::Arc;

const TOKEN: &str = "123:token";
const CHAT_ID: i64 = -1001;

fn client_for(server: &MockServer) -> TelegramClient {
    TelegramClient::new(&TelegramConfig {
        bot_token: TOKEN.to_string(),
        chat_id: CHAT_ID,
        api_base: server.base_url(),
        ..TelegramConfig::default()
    })
    .unwrap()
}

fn path(method: &str) -> String {
    format!("/bot{}/{}", TOKEN, method)
}

const OK_BODY: &str = r#"{"ok": true, "result": {"message_id": 1}}"#;

#[tokio::test]
async fn test_send_text_silent() -> Result<()> {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path(path("sendMessage"))
            .body_includes(r#""disable_notification":true"#)
            .body_includes(r#""chat_id":-1001"#);
        then.status(200).body(OK_BODY);
    });

    client_for(&server)
        .send_text("hello", SendOptions { silent: true })
        .await?;
    mock.assert();
    Ok(())
}

#[tokio::test]
async fn test_send_text_api_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(path("sendMessage"));
        then.status(400)
            .body(r#"{"ok": false, "description": "Bad Request: chat not found"}"#);
    });

    let err = client_for(&server)
        .send_text("hello", SendOptions::default())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("chat not found"));
}

#[tokio::test]
async fn test_single_image_uses_send_photo() -> Result<()> {
    let server = MockServer::start();
    let photo = server.mock(|when, then| {
        when.method(POST)
            .path(path("sendPhoto"))
            .body_includes("caption text")
            .body_includes("thumbnail.jpg");
        then.status(200).body(OK_BODY);
    });
    let group = server.mock(|when, then| {
        when.method(POST).path(path("sendMediaGroup"));
        then.status(200).body(OK_BODY);
    });

    let media = vec![MediaAsset::from_bytes(MediaKind::Image, b"jpeg")];
    client_for(&server)
        .send_media(&media, "caption text", SendOptions::default())
        .await?;
    photo.assert();
    group.assert_calls(0);
    Ok(())
}

#[tokio::test]
async fn test_image_and_clip_use_media_group() -> Result<()> {
    let server = MockServer::start();
    let group = server.mock(|when, then| {
        when.method(POST)
            .path(path("sendMediaGroup"))
            .body_includes("attach://file0")
            .body_includes("attach://file1")
            .body_includes("clip.mp4");
        then.status(200).body(r#"{"ok": true, "result": [{"message_id": 1}, {"message_id": 2}]}"#);
    });

    let media = vec![
        MediaAsset::from_bytes(MediaKind::Image, b"jpeg"),
        MediaAsset::from_bytes(MediaKind::Video, b"mp4"),
    ];
    client_for(&server)
        .send_media(&media, "caption", SendOptions::default())
        .await?;
    group.assert();
    Ok(())
}

#[tokio::test]
async fn test_empty_media_sends_text() -> Result<()> {
    let server = MockServer::start();
    let text = server.mock(|when, then| {
        when.method(POST).path(path("sendMessage"));
        then.status(200).body(OK_BODY);
    });

    client_for(&server)
        .send_media(&[], "only text", SendOptions::default())
        .await?;
    text.assert();
    Ok(())
}

#[tokio::test]
async fn test_get_me_failure_is_fatal() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(path("getMe"));
        then.status(401).body(r#"{"ok": false, "description": "Unauthorized"}"#);
    });

    let err = client_for(&server).get_me().await.unwrap_err();
    assert!(crate::error::kind_of(&err) == crate::error::ErrorKind::FatalIntegration);
}

#[tokio::test]
async fn test_get_updates() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET)
            .path(path("getUpdates"))
            .query_param("offset", "7");
        then.status(200).body(
            r#"{"ok": true, "result": [
                {"update_id": 7, "message": {"chat": {"id": -1001}, "text": "/status"}},
                {"update_id": 8, "edited_message": {}}
            ]}"#,
        );
    });

    let updates = client_for(&server).get_updates(7, 0).await?;
    assert_eq!(updates.len(), 2);
    assert_eq!(
        updates[0].message.as_ref().and_then(|m| m.text.as_deref()),
        Some("/status")
    );
    assert!(updates[1].message.is_none());
    Ok(())
}

fn command_update(chat_id: i64, text: &str) -> Update {
    Update {
        update_id: 1,
        message: Some(Message {
            chat: Chat { id: chat_id },
            text: Some(text.to_string()),
        }),
    }
}

#[tokio::test]
async fn test_stop_command_sets_flag_and_replies() -> Result<()> {
    let server = MockServer::start();
    let reply = server.mock(|when, then| {
        when.method(POST)
            .path(path("sendMessage"))
            .body_includes("Stop send message.");
        then.status(200).body(OK_BODY);
    });

    let flags = ControlFlags::new(Arc::new(MemoryStore::new()));
    let bot = CommandBot::new(Arc::new(client_for(&server)), flags.clone(), 0);

    bot.handle_update(&command_update(CHAT_ID, "/stop")).await?;
    reply.assert();
    assert!(flags.is_suppressed().await?);
    Ok(())
}

#[tokio::test]
async fn test_commands_from_other_chats_are_ignored() -> Result<()> {
    let server = MockServer::start();
    let reply = server.mock(|when, then| {
        when.method(POST).path(path("sendMessage"));
        then.status(200).body(OK_BODY);
    });

    let flags = ControlFlags::new(Arc::new(MemoryStore::new()));
    let bot = CommandBot::new(Arc::new(client_for(&server)), flags.clone(), 0);

    bot.handle_update(&command_update(42, "/stop")).await?;
    bot.handle_update(&command_update(CHAT_ID, "just chatting")).await?;
    reply.assert_calls(0);
    assert!(!flags.is_suppressed().await?);
    Ok(())
}

#[tokio::test]
async fn test_command_replies() -> Result<()> {
    let server = MockServer::start();
    let flags = ControlFlags::new(Arc::new(MemoryStore::new()));
    let bot = CommandBot::new(Arc::new(client_for(&server)), flags.clone(), 0);

    assert_eq!(bot.reply_to("ping").await, "pong");
    assert_eq!(bot.reply_to("king").await, "kong");
    assert_eq!(bot.reply_to("selfdestruct").await, "I don't know that command");
    assert!(bot.reply_to("help").await.contains("/resume"));

    assert_eq!(bot.reply_to("mute").await, "Mute send message.");
    assert_eq!(
        bot.reply_to("status").await,
        "Send event: `true`\nMute event: `true`\n"
    );
    bot.reply_to("stop").await;
    bot.reply_to("unmute").await;
    assert_eq!(
        bot.reply_to("status").await,
        "Send event: `false`\nMute event: `false`\n"
    );
    Ok(())
}
