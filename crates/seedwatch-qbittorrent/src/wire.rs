//! Response payloads of the qBittorrent Web API and their mapping into job snapshots.

use seedwatch_torrent_core::{JobSnapshot, JobState};
use serde::Deserialize;

/// ETA qBittorrent reports when it cannot estimate one (100 days).
const UNKNOWN_ETA: i64 = 8_640_000;

/// One entry of `GET /api/v2/torrents/info`.
#[derive(Debug, Deserialize)]
pub(crate) struct TorrentInfo {
    name: String,
    state: String,
    #[serde(default)]
    progress: f64,
    #[serde(default)]
    downloaded: u64,
    #[serde(default)]
    uploaded: u64,
    #[serde(default)]
    total_size: u64,
    #[serde(default)]
    dlspeed: u64,
    #[serde(default)]
    upspeed: u64,
    #[serde(default)]
    eta: i64,
    #[serde(default)]
    time_active: u64,
    #[serde(default)]
    tags: String,
    #[serde(default)]
    ratio: f64,
}

impl From<TorrentInfo> for JobSnapshot {
    fn from(info: TorrentInfo) -> Self {
        Self {
            state: JobState::from_label(&info.state),
            eta_secs: (info.eta < UNKNOWN_ETA).then_some(info.eta),
            name: info.name,
            progress: info.progress,
            downloaded: info.downloaded,
            uploaded: info.uploaded,
            total_size: info.total_size,
            dlspeed: info.dlspeed,
            upspeed: info.upspeed,
            time_active_secs: info.time_active,
            tags: info.tags,
            ratio: info.ratio,
        }
    }
}

/// Subset of `GET /api/v2/sync/maindata` the monitor reads.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct MainData {
    #[serde(default)]
    server_state: Option<ServerState>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerState {
    #[serde(default)]
    free_space_on_disk: Option<i64>,
}

impl MainData {
    pub(crate) fn free_space(&self) -> Option<u64> {
        self.server_state
            .as_ref()
            .and_then(|state| state.free_space_on_disk)
            .and_then(|bytes| u64::try_from(bytes).ok())
    }
}
