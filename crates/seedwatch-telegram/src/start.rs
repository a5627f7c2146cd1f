//! Waiting for the `/start` command that arms the monitor.

use std::time::Duration;

use seedwatch_torrent_core::{ChannelError, ChannelResult};
use tracing::{debug, info, warn};

use crate::api::{Message, TelegramBot};

const LONG_POLL_SECS: u64 = 30;
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Long-poll updates until `/start` (or `/start@<bot username>`) arrives from any chat.
///
/// Channel posts count as well as messages. The returned message identifies the chat to answer.
/// The matching update is acknowledged before returning so a restart does not see it again.
/// Transport failures are retried; refusals from the API are returned.
///
/// # Errors
///
/// Returns an error when the API refuses `getMe` or `getUpdates` (for example, an invalid token).
pub async fn wait_for_start_command(bot: &TelegramBot) -> ChannelResult<Message> {
    let username = bot.get_me().await?.username;
    info!("waiting for /start");

    let mut offset = None;
    loop {
        let updates = match bot.get_updates(offset, LONG_POLL_SECS).await {
            Ok(updates) => updates,
            Err(err @ ChannelError::Transport { .. }) => {
                warn!(error = %err, "getUpdates failed; retrying");
                tokio::time::sleep(RETRY_DELAY).await;
                continue;
            }
            Err(err) => return Err(err),
        };

        for update in updates {
            offset = Some(update.update_id + 1);
            let Some(message) = update.into_message() else {
                continue;
            };
            if message
                .text
                .as_deref()
                .is_some_and(|text| is_start_command(text, username.as_deref()))
            {
                bot.get_updates(offset, 0).await?;
                info!(chat = message.chat.id, "/start received");
                return Ok(message);
            }
            debug!(chat = message.chat.id, "ignoring update without /start");
        }
    }
}

fn is_start_command(text: &str, username: Option<&str>) -> bool {
    let Some(command) = text.split_whitespace().next() else {
        return false;
    };
    match command.split_once('@') {
        None => command == "/start",
        Some((name, target)) => {
            name == "/start" && username.is_some_and(|user| user.eq_ignore_ascii_case(target))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use seedwatch_config::{Secret, TelegramConfig};
    use serde_json::json;

    #[test]
    fn start_command_variants() {
        assert!(is_start_command("/start", None));
        assert!(is_start_command("/start now please", Some("seedbot")));
        assert!(is_start_command("/start@SeedBot", Some("seedbot")));
        assert!(!is_start_command("/start@otherbot", Some("seedbot")));
        assert!(!is_start_command("/stop", Some("seedbot")));
        assert!(!is_start_command("   ", None));
    }

    fn bot_for(server: &MockServer) -> anyhow::Result<TelegramBot> {
        let config = TelegramConfig {
            bot_token: Secret::new("123:abc"),
            status_chat_id: "@seedwatch_status".to_string(),
            file_chat_id: "-1001".to_string(),
            api_url: server.base_url().parse()?,
        };
        Ok(TelegramBot::new(&config, None)?)
    }

    fn mock_get_me(server: &MockServer) {
        server.mock(|when, then| {
            when.method(POST).path("/bot123:abc/getMe");
            then.status(200).json_body(json!({
                "ok": true,
                "result": {"id": 1, "username": "seedbot"}
            }));
        });
    }

    #[tokio::test]
    async fn private_chat_start_arms_a_channel_status_chat() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        mock_get_me(&server);
        let poll = server.mock(|when, then| {
            when.method(POST).path("/bot123:abc/getUpdates").json_body(json!({
                "timeout": 30,
                "allowed_updates": ["message", "channel_post"]
            }));
            then.status(200).json_body(json!({
                "ok": true,
                "result": [
                    {"update_id": 10, "message": {"message_id": 1, "chat": {"id": 4242}, "text": "hello"}},
                    {"update_id": 11, "message": {"message_id": 2, "chat": {"id": 4242}, "text": "/start@seedbot"}}
                ]
            }));
        });
        let ack = server.mock(|when, then| {
            when.method(POST).path("/bot123:abc/getUpdates").json_body(json!({
                "offset": 12,
                "timeout": 0,
                "allowed_updates": ["message", "channel_post"]
            }));
            then.status(200).json_body(json!({"ok": true, "result": []}));
        });
        let bot = bot_for(&server)?;

        let message = wait_for_start_command(&bot).await?;

        assert_eq!(message.message_id, 2);
        assert_eq!(message.chat.id, 4242);
        poll.assert();
        ack.assert();
        Ok(())
    }

    #[tokio::test]
    async fn channel_post_start_is_accepted() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        mock_get_me(&server);
        server.mock(|when, then| {
            when.method(POST).path("/bot123:abc/getUpdates").json_body(json!({
                "timeout": 30,
                "allowed_updates": ["message", "channel_post"]
            }));
            then.status(200).json_body(json!({
                "ok": true,
                "result": [
                    {"update_id": 7, "channel_post": {"message_id": 5, "chat": {"id": -1001}, "text": "/start"}}
                ]
            }));
        });
        server.mock(|when, then| {
            when.method(POST)
                .path("/bot123:abc/getUpdates")
                .json_body(json!({"offset": 8, "timeout": 0, "allowed_updates": ["message", "channel_post"]}));
            then.status(200).json_body(json!({"ok": true, "result": []}));
        });
        let bot = bot_for(&server)?;

        let message = wait_for_start_command(&bot).await?;

        assert_eq!(message.chat.id, -1001);
        Ok(())
    }

    #[tokio::test]
    async fn invalid_token_is_not_retried() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/bot123:abc/getMe");
            then.status(401)
                .json_body(json!({"ok": false, "error_code": 401, "description": "Unauthorized"}));
        });
        let bot = bot_for(&server)?;

        let result = wait_for_start_command(&bot).await;
        assert!(matches!(
            result,
            Err(ChannelError::Rejected { code: Some(401), .. })
        ));
        Ok(())
    }
}
