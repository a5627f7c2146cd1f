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

//! Job source backed by the qBittorrent Web API v2.
//! Layout: client.rs (session handling, requests), wire.rs (response payloads and mapping).

pub mod client;
mod wire;

pub use client::QbittorrentClient;
