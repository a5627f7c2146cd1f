//! Status report layouts.
//!
//! # Design
//! - Pure functions of a job snapshot and host metrics; rendering twice yields identical text.
//! - Sizes use binary units: GB means bytes / 2^30 and MB/s means bytes per second / 2^20.
//! - Durations render as `HH:MM:SS`; hours do not wrap at 24.

use std::fmt::Write as _;

use seedwatch_torrent_core::{GIB, HostMetrics, JobSnapshot, MIB};

const BAR_CELLS: usize = 10;
const FILLED: char = '▰';
const EMPTY: char = '▱';
const NO_ETA: &str = "N/A";
const NO_FREE_SPACE: &str = "unavailable";

/// Render the report for `job`, picking the layout from its state.
///
/// Download states use the download layout; any other job with upload traffic uses the seeding
/// layout. Returns `None` when the job is not reported this pass.
#[must_use]
pub fn render(job: &JobSnapshot, metrics: &HostMetrics) -> Option<String> {
    if job.state.is_download_reportable() {
        Some(render_download(job, metrics))
    } else if job.upspeed > 0 {
        Some(render_seeding(job, metrics))
    } else {
        None
    }
}

/// Download layout: headline with speed, ETA and elapsed time, then the metrics block.
#[must_use]
pub fn render_download(job: &JobSnapshot, metrics: &HostMetrics) -> String {
    let mut text = headline(job, job.state.label());
    // Writing into a String cannot fail.
    let _ = writeln!(
        text,
        "Speed: {:.2} MB/s | ETA: {}",
        mib(job.dlspeed),
        eta(job.eta_secs)
    );
    let _ = writeln!(text, "Time Elapsed: {}", hms(job.time_active_secs));
    text.push('\n');
    metrics_block(&mut text, job, metrics);
    text
}

/// Seeding layout: fixed `seeding` status and no speed, ETA or elapsed line.
#[must_use]
pub fn render_seeding(job: &JobSnapshot, metrics: &HostMetrics) -> String {
    let mut text = headline(job, "seeding");
    text.push('\n');
    metrics_block(&mut text, job, metrics);
    text
}

fn headline(job: &JobSnapshot, status: &str) -> String {
    format!(
        "Name: {}\nStatus: {status}\n[{}] {:.2}%\nProcessed: {:.2}GB of {:.2}GB\n",
        job.name,
        progress_bar(job.progress),
        job.progress * 100.0,
        gib(job.downloaded),
        gib(job.total_size),
    )
}

fn metrics_block(text: &mut String, job: &JobSnapshot, metrics: &HostMetrics) {
    let host = metrics.host;
    let _ = writeln!(
        text,
        "CPU: {:.1}% | FREE: {}",
        host.cpu_percent,
        free_space(metrics.free_space_bytes)
    );
    let _ = writeln!(
        text,
        "RAM: {:.1}% | UPTIME: {}",
        host.ram_percent,
        hms(host.uptime.as_secs())
    );
    let _ = writeln!(
        text,
        "DL: {:.2} MB/s | UL: {:.2} MB/s",
        mib(job.dlspeed),
        mib(job.upspeed)
    );
    let _ = writeln!(text, "TAG: {} | RATIO: {:.2}", job.tags, job.ratio);
    let _ = write!(text, "UPLOADED: {:.2}GB", gib(job.uploaded));
}

/// Ten cells, `floor(progress * 10)` of them filled.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn progress_bar(progress: f64) -> String {
    let filled = ((progress * 10.0).floor().max(0.0) as usize).min(BAR_CELLS);
    let mut bar = String::with_capacity(BAR_CELLS * FILLED.len_utf8());
    bar.extend(std::iter::repeat_n(FILLED, filled));
    bar.extend(std::iter::repeat_n(EMPTY, BAR_CELLS - filled));
    bar
}

fn eta(eta_secs: Option<i64>) -> String {
    match eta_secs.and_then(|secs| u64::try_from(secs).ok()) {
        Some(secs) if secs > 0 => hms(secs),
        _ => NO_ETA.to_string(),
    }
}

fn free_space(bytes: Option<u64>) -> String {
    bytes.map_or_else(|| NO_FREE_SPACE.to_string(), |bytes| format!("{:.2}GB", gib(bytes)))
}

fn hms(secs: u64) -> String {
    format!("{:02}:{:02}:{:02}", secs / 3_600, (secs % 3_600) / 60, secs % 60)
}

#[allow(clippy::cast_precision_loss)]
fn gib(bytes: u64) -> f64 {
    bytes as f64 / GIB
}

#[allow(clippy::cast_precision_loss)]
fn mib(bytes: u64) -> f64 {
    bytes as f64 / MIB
}

#[cfg(test)]
mod tests {
    use super::*;
    use seedwatch_torrent_core::{HostSample, JobState};
    use std::time::Duration;

    fn metrics() -> HostMetrics {
        HostMetrics::new(
            HostSample {
                cpu_percent: 12.5,
                ram_percent: 48.0,
                uptime: Duration::from_secs(90_061),
            },
            Some(5 * 1_073_741_824),
        )
    }

    fn sample_download() -> JobSnapshot {
        JobSnapshot {
            name: "X".to_string(),
            state: JobState::Downloading,
            progress: 0.42,
            downloaded: 4_200_000_000,
            uploaded: 0,
            total_size: 10_000_000_000,
            dlspeed: 1_050_000,
            upspeed: 0,
            eta_secs: Some(120),
            time_active_secs: 300,
            tags: "linux".to_string(),
            ratio: 0.0,
        }
    }

    #[test]
    fn download_layout_matches_template() {
        let text = render_download(&sample_download(), &metrics());
        let expected = "\
Name: X
Status: downloading
[▰▰▰▰▱▱▱▱▱▱] 42.00%
Processed: 3.91GB of 9.31GB
Speed: 1.00 MB/s | ETA: 00:02:00
Time Elapsed: 00:05:00

CPU: 12.5% | FREE: 5.00GB
RAM: 48.0% | UPTIME: 25:01:01
DL: 1.00 MB/s | UL: 0.00 MB/s
TAG: linux | RATIO: 0.00
UPLOADED: 0.00GB";
        assert_eq!(text, expected);
    }

    #[test]
    fn seeding_layout_omits_speed_headline() {
        let mut job = sample_download();
        job.state = JobState::StalledSeeding;
        job.progress = 1.0;
        job.upspeed = 2 * 1_048_576;
        let text = render_seeding(&job, &metrics());
        assert!(text.starts_with("Name: X\nStatus: seeding\n[▰▰▰▰▰▰▰▰▰▰] 100.00%\n"));
        assert!(!text.contains("ETA"));
        assert!(!text.contains("Time Elapsed"));
        assert!(text.contains("DL: 1.00 MB/s | UL: 2.00 MB/s"));
    }

    #[test]
    fn missing_or_zero_eta_renders_sentinel() {
        let mut job = sample_download();
        job.eta_secs = Some(0);
        assert!(render_download(&job, &metrics()).contains("ETA: N/A"));
        job.eta_secs = None;
        assert!(render_download(&job, &metrics()).contains("ETA: N/A"));
        job.eta_secs = Some(-5);
        assert!(render_download(&job, &metrics()).contains("ETA: N/A"));
    }

    #[test]
    fn unknown_free_space_is_marked_unavailable() {
        let metrics = HostMetrics::new(HostSample::default(), None);
        assert!(render_download(&sample_download(), &metrics).contains("FREE: unavailable"));
    }

    #[test]
    fn progress_bar_always_has_ten_cells() {
        for step in 0..=100 {
            let progress = f64::from(step) / 100.0;
            let bar = progress_bar(progress);
            assert_eq!(bar.chars().count(), BAR_CELLS);
            let filled = bar.chars().filter(|cell| *cell == FILLED).count();
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let expected = (progress * 10.0).floor() as usize;
            assert_eq!(filled, expected);
        }
        assert_eq!(progress_bar(1.7), "▰".repeat(10));
        assert_eq!(progress_bar(-0.1), "▱".repeat(10));
    }

    #[test]
    fn rendering_is_idempotent() {
        let job = sample_download();
        assert_eq!(render_download(&job, &metrics()), render_download(&job, &metrics()));
    }

    #[test]
    fn layout_selection_follows_state_and_upload() {
        assert!(render(&sample_download(), &metrics()).is_some_and(|text| text.contains("ETA")));

        let mut seeding = sample_download();
        seeding.state = JobState::StalledSeeding;
        assert!(render(&seeding, &metrics()).is_none());

        seeding.upspeed = 1;
        assert!(render(&seeding, &metrics()).is_some_and(|text| text.contains("Status: seeding")));
    }

    #[test]
    fn paused_download_shows_the_received_label() {
        let mut job = sample_download();
        job.state = JobState::from_label("pausedDL");
        assert!(render(&job, &metrics()).is_some_and(|text| text.contains("Status: pausedDL\n")));
        job.state = JobState::from_label("stoppedDL");
        assert!(render(&job, &metrics()).is_some_and(|text| text.contains("Status: stoppedDL\n")));
    }
}
