//! Authenticated qBittorrent Web API client.
//!
//! # Design
//! - The session cookie obtained at login is replayed on every request.
//! - A `403` means the session expired; the client logs in again once and retries.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{COOKIE, REFERER, SET_COOKIE};
use reqwest::{Client, Response, StatusCode};
use seedwatch_config::QbittorrentConfig;
use seedwatch_torrent_core::{JobSnapshot, JobSource, SourceError, SourceResult};
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use url::Url;

use crate::wire::{MainData, TorrentInfo};

const SESSION_COOKIE: &str = "SID";
const LOGIN_ACCEPTED: &str = "Ok.";

/// Job source talking to a qBittorrent Web UI.
#[derive(Debug)]
pub struct QbittorrentClient {
    http: Client,
    base: Url,
    login_url: Url,
    torrents_url: Url,
    maindata_url: Url,
    config: QbittorrentConfig,
    session: RwLock<Option<String>>,
}

impl QbittorrentClient {
    /// Build a client without logging in.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the host URL cannot carry the
    /// API paths.
    pub fn new(config: QbittorrentConfig, timeout: Option<Duration>) -> SourceResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(|err| SourceError::Transport {
            operation: "build_client",
            source: Box::new(err),
        })?;

        let base = with_trailing_slash(&config.host);
        Ok(Self {
            login_url: endpoint(&base, "api/v2/auth/login")?,
            torrents_url: endpoint(&base, "api/v2/torrents/info")?,
            maindata_url: endpoint(&base, "api/v2/sync/maindata")?,
            base,
            http,
            config,
            session: RwLock::new(None),
        })
    }

    /// Build a client and log in.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be built or the login is refused.
    pub async fn connect(
        config: QbittorrentConfig,
        timeout: Option<Duration>,
    ) -> SourceResult<Self> {
        let client = Self::new(config, timeout)?;
        client.login().await?;
        Ok(client)
    }

    /// Log in and store the session cookie.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Authentication`] when the credentials are refused or no session
    /// cookie is issued, and a transport or status error when the Web UI cannot be reached.
    pub async fn login(&self) -> SourceResult<()> {
        info!(host = %self.base, "logging in to qBittorrent");
        let response = self
            .http
            .post(self.login_url.clone())
            .header(REFERER, self.base.as_str())
            .form(&[
                ("username", self.config.username.as_str()),
                ("password", self.config.password.expose()),
            ])
            .send()
            .await
            .map_err(|err| transport("login", err))?;

        let status = response.status();
        if status == StatusCode::FORBIDDEN {
            return Err(SourceError::Authentication {
                reason: "client_banned",
            });
        }
        if !status.is_success() {
            return Err(SourceError::Status {
                operation: "login",
                status: status.as_u16(),
            });
        }

        let cookie = session_cookie(&response);
        let body = response
            .text()
            .await
            .map_err(|err| transport("login", err))?;
        if body.trim() != LOGIN_ACCEPTED {
            return Err(SourceError::Authentication {
                reason: "credentials_rejected",
            });
        }
        let cookie = cookie.ok_or(SourceError::Authentication {
            reason: "missing_session_cookie",
        })?;

        *self.session.write().await = Some(cookie);
        info!("qBittorrent session established");
        Ok(())
    }

    async fn get_json<T>(&self, operation: &'static str, url: &Url) -> SourceResult<T>
    where
        T: DeserializeOwned,
    {
        let mut response = self.get(operation, url).await?;
        if response.status() == StatusCode::FORBIDDEN {
            warn!(operation, "qBittorrent session rejected; logging in again");
            self.login().await?;
            response = self.get(operation, url).await?;
        }

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                operation,
                status: status.as_u16(),
            });
        }
        response
            .json::<T>()
            .await
            .map_err(|err| SourceError::Decode {
                operation,
                source: Box::new(err.without_url()),
            })
    }

    async fn get(&self, operation: &'static str, url: &Url) -> SourceResult<Response> {
        let mut request = self.http.get(url.clone());
        if let Some(cookie) = self.session.read().await.as_deref() {
            request = request.header(COOKIE, cookie);
        }
        request.send().await.map_err(|err| transport(operation, err))
    }
}

#[async_trait]
impl JobSource for QbittorrentClient {
    async fn list_jobs(&self) -> SourceResult<Vec<JobSnapshot>> {
        let torrents: Vec<TorrentInfo> = self.get_json("torrents_info", &self.torrents_url).await?;
        debug!(count = torrents.len(), "fetched torrent list");
        Ok(torrents.into_iter().map(JobSnapshot::from).collect())
    }

    async fn free_disk_space(&self) -> SourceResult<Option<u64>> {
        let main: MainData = self.get_json("sync_maindata", &self.maindata_url).await?;
        Ok(main.free_space())
    }
}

fn transport(operation: &'static str, err: reqwest::Error) -> SourceError {
    SourceError::Transport {
        operation,
        source: Box::new(err.without_url()),
    }
}

fn with_trailing_slash(host: &Url) -> Url {
    let mut base = host.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base
}

fn endpoint(base: &Url, path: &str) -> SourceResult<Url> {
    base.join(path).map_err(|err| SourceError::Transport {
        operation: "build_endpoint",
        source: Box::new(err),
    })
}

/// `SID=<value>` pair from the login response's cookies, ready to be sent back.
fn session_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|cookie| cookie.split(';').next())
        .map(str::trim)
        .find(|pair| {
            pair.split_once('=')
                .is_some_and(|(name, value)| name == SESSION_COOKIE && !value.is_empty())
        })
        .map(str::to_string)
}
