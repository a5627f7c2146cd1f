#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(
    missing_docs,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]
#![allow(clippy::module_name_repetitions)]

//! Notification channel backed by the Telegram Bot API.
//! Layout: api.rs (bot methods and payloads), channel.rs (per-chat channel), start.rs (`/start`
//! listener).

pub mod api;
pub mod channel;
pub mod start;

pub use api::{Chat, Message, TelegramBot, Update, User};
pub use channel::TelegramChannel;
pub use start::wait_for_start_command;
