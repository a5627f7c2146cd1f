//! Thin client over the Bot API methods the application uses.
//!
//! # Design
//! - Every method goes through the `{ok, result, description, error_code}` envelope.
//! - Request URLs embed the bot token, so transport errors are stripped of their URL and the
//!   client has no `Debug` implementation.

use std::path::Path;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Response};
use seedwatch_config::TelegramConfig;
use seedwatch_torrent_core::{ChannelError, ChannelResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

const NOT_MODIFIED: &str = "message is not modified";

#[derive(Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
    error_code: Option<i64>,
}

/// Message returned by `sendMessage` and carried by updates.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Message {
    /// Message identifier within its chat.
    pub message_id: i64,
    /// Chat the message belongs to.
    pub chat: Chat,
    /// Text body, absent for media messages.
    #[serde(default)]
    pub text: Option<String>,
}

/// Chat reference.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Chat {
    /// Chat identifier.
    pub id: i64,
}

/// Bot account returned by `getMe`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct User {
    /// Account identifier.
    pub id: i64,
    /// Username without the leading `@`.
    #[serde(default)]
    pub username: Option<String>,
}

/// Incoming update returned by `getUpdates`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Update {
    /// Monotonic update identifier.
    pub update_id: i64,
    /// New incoming message, when the update carries one.
    #[serde(default)]
    pub message: Option<Message>,
    /// New post in a channel the bot administers.
    #[serde(default)]
    pub channel_post: Option<Message>,
}

impl Update {
    /// The message or channel post carried by this update.
    #[must_use]
    pub fn into_message(self) -> Option<Message> {
        self.message.or(self.channel_post)
    }
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

#[derive(Serialize)]
struct EditMessageText<'a> {
    chat_id: &'a str,
    message_id: i64,
    text: &'a str,
}

#[derive(Serialize)]
struct DeleteMessage<'a> {
    chat_id: &'a str,
    message_id: i64,
}

#[derive(Serialize)]
struct GetUpdates {
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<i64>,
    timeout: u64,
    allowed_updates: [&'static str; 2],
}

/// Telegram Bot API client bound to one bot token.
#[derive(Clone)]
pub struct TelegramBot {
    http: Client,
    base: Url,
}

impl TelegramBot {
    /// Build a client for the bot described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the API URL cannot carry a path.
    pub fn new(config: &TelegramConfig, timeout: Option<Duration>) -> ChannelResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(|err| transport("build_client", err))?;

        let mut base = config.api_url.clone();
        base.path_segments_mut()
            .map_err(|()| ChannelError::Rejected {
                operation: "build_endpoint",
                code: None,
                description: "api url cannot carry a path".to_string(),
            })?
            .pop_if_empty()
            .push(&format!("bot{}", config.bot_token.expose()))
            .push("");
        Ok(Self { http, base })
    }

    /// `getMe`: identify the bot account.
    ///
    /// # Errors
    ///
    /// Returns an error when the request fails or the API refuses it.
    pub async fn get_me(&self) -> ChannelResult<User> {
        self.call("get_me", "getMe", &serde_json::json!({})).await
    }

    /// `sendMessage`: post `text` to `chat_id`.
    ///
    /// # Errors
    ///
    /// Returns an error when the request fails or the API refuses it.
    pub async fn send_message(&self, chat_id: &str, text: &str) -> ChannelResult<Message> {
        self.call("send_message", "sendMessage", &SendMessage { chat_id, text })
            .await
    }

    /// `editMessageText`: replace the text of `message_id`.
    ///
    /// An edit with unchanged text is reported by the API as an error and treated as success.
    ///
    /// # Errors
    ///
    /// Returns an error when the request fails or the API refuses it.
    pub async fn edit_message_text(
        &self,
        chat_id: &str,
        message_id: i64,
        text: &str,
    ) -> ChannelResult<()> {
        let payload = EditMessageText {
            chat_id,
            message_id,
            text,
        };
        match self
            .call::<serde_json::Value, _>("edit_message", "editMessageText", &payload)
            .await
        {
            Ok(_) => Ok(()),
            Err(ChannelError::Rejected { description, .. })
                if description.contains(NOT_MODIFIED) =>
            {
                debug!(message_id, "message text unchanged");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// `deleteMessage`: remove `message_id` from `chat_id`.
    ///
    /// # Errors
    ///
    /// Returns an error when the request fails or the API refuses it.
    pub async fn delete_message(&self, chat_id: &str, message_id: i64) -> ChannelResult<()> {
        self.call::<serde_json::Value, _>(
            "delete_message",
            "deleteMessage",
            &DeleteMessage {
                chat_id,
                message_id,
            },
        )
        .await
        .map(|_| ())
    }

    /// `sendDocument`: upload the file at `path` with `caption`, streaming it from disk.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Attachment`] if the file cannot be opened, otherwise an error when
    /// the request fails or the API refuses it.
    pub async fn send_document(
        &self,
        chat_id: &str,
        path: &Path,
        caption: &str,
    ) -> ChannelResult<Message> {
        const OPERATION: &str = "send_document";
        let attachment = |source| ChannelError::Attachment {
            path: path.to_path_buf(),
            source,
        };
        let file = tokio::fs::File::open(path).await.map_err(attachment)?;
        let length = file.metadata().await.map_err(attachment)?.len();
        let file_name = path
            .file_name()
            .map_or_else(|| "document".to_string(), |name| name.to_string_lossy().into_owned());

        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", caption.to_string())
            .part(
                "document",
                Part::stream_with_length(Body::from(file), length).file_name(file_name),
            );
        let response = self
            .http
            .post(self.method_url(OPERATION, "sendDocument")?)
            .multipart(form)
            .send()
            .await
            .map_err(|err| transport(OPERATION, err))?;
        decode(OPERATION, response).await
    }

    /// `getUpdates`: long-poll for updates newer than `offset`.
    ///
    /// # Errors
    ///
    /// Returns an error when the request fails or the API refuses it.
    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout_secs: u64,
    ) -> ChannelResult<Vec<Update>> {
        const OPERATION: &str = "get_updates";
        let payload = GetUpdates {
            offset,
            timeout: timeout_secs,
            allowed_updates: ["message", "channel_post"],
        };
        let response = self
            .http
            .post(self.method_url(OPERATION, "getUpdates")?)
            .timeout(Duration::from_secs(timeout_secs + 10))
            .json(&payload)
            .send()
            .await
            .map_err(|err| transport(OPERATION, err))?;
        decode(OPERATION, response).await
    }

    async fn call<T, P>(&self, operation: &'static str, method: &str, payload: &P) -> ChannelResult<T>
    where
        T: DeserializeOwned,
        P: Serialize + Sync,
    {
        let response = self
            .http
            .post(self.method_url(operation, method)?)
            .json(payload)
            .send()
            .await
            .map_err(|err| transport(operation, err))?;
        decode(operation, response).await
    }

    fn method_url(&self, operation: &'static str, method: &str) -> ChannelResult<Url> {
        self.base.join(method).map_err(|err| ChannelError::Transport {
            operation,
            source: Box::new(err),
        })
    }
}

async fn decode<T>(operation: &'static str, response: Response) -> ChannelResult<T>
where
    T: DeserializeOwned,
{
    let status = response.status();
    let envelope = response
        .json::<ApiResponse<T>>()
        .await
        .map_err(|err| transport(operation, err))?;
    match envelope {
        ApiResponse {
            ok: true,
            result: Some(result),
            ..
        } => Ok(result),
        ApiResponse {
            description,
            error_code,
            ..
        } => Err(ChannelError::Rejected {
            operation,
            code: Some(error_code.unwrap_or_else(|| i64::from(status.as_u16()))),
            description: description.unwrap_or_default(),
        }),
    }
}

fn transport(operation: &'static str, err: reqwest::Error) -> ChannelError {
    ChannelError::Transport {
        operation,
        source: Box::new(err.without_url()),
    }
}
