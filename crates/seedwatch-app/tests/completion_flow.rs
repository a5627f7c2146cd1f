//! Monitor to pipeline flow: a finished job is archived, uploaded in parts and cleaned up.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use seedwatch_app::{ActivityMonitor, PipelineDispatcher};
use seedwatch_config::MonitorSettings;
use seedwatch_fsops::CompletionPipeline;
use seedwatch_telemetry::Metrics;
use seedwatch_test_support::fixtures::{noise, seeding, temp_dir, write_files};
use seedwatch_test_support::mocks::{FixedHostProbe, RecordingChannel, ScriptedJobSource};
use seedwatch_torrent_core::HostSample;

fn scratch_is_empty(path: &Path) -> anyhow::Result<bool> {
    Ok(std::fs::read_dir(path)?.next().is_none())
}

#[tokio::test]
async fn completed_job_is_uploaded_once_and_cleaned_up() -> anyhow::Result<()> {
    let downloads = temp_dir()?;
    let scratch = temp_dir()?;
    let episode = noise(6_000, 7);
    write_files(
        downloads.path(),
        &[
            ("Show One/episode.mkv", episode.as_slice()),
            ("Show One/notes.txt", b"subtitles pending".as_slice()),
            ("Show One/extras/skip.bin", b"nested files are not packaged".as_slice()),
        ],
    )?;

    let status = Arc::new(RecordingChannel::new());
    let files = Arc::new(RecordingChannel::new());
    let metrics = Metrics::new()?;
    let pipeline = CompletionPipeline::new(files.clone(), scratch.path(), 2_048, metrics.clone());
    let source = Arc::new(ScriptedJobSource::new());
    source.push_jobs(vec![seeding("Show One", 0)]);

    let settings = MonitorSettings {
        poll_interval: Duration::from_secs(7),
        idle_timeout: Duration::from_secs(15),
        downloads_root: downloads.path().to_path_buf(),
        require_start_command: false,
    };
    let mut monitor = ActivityMonitor::new(
        source,
        status.clone(),
        Arc::new(FixedHostProbe::new(HostSample::default())),
        Arc::new(PipelineDispatcher::new(pipeline)),
        metrics.clone(),
        &settings,
    );

    let start = Instant::now();
    monitor.poll_at(start).await;
    monitor.poll_at(start + Duration::from_secs(7)).await;

    let confirmation = "O torrent 'Show One' foi compactado e enviado com sucesso.".to_string();
    let deadline = Instant::now() + Duration::from_secs(10);
    while !(files.sent_texts().contains(&confirmation) && scratch_is_empty(scratch.path())?) {
        anyhow::ensure!(Instant::now() < deadline, "pipeline did not finish in time");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let documents = files.documents();
    assert!(documents.len() >= 2);
    for (index, (caption, bytes)) in documents.iter().enumerate() {
        assert_eq!(caption, &format!("Show One - Parte {}", index + 1));
        assert!(bytes.len() <= 2_048);
    }
    assert_eq!(files.sent_texts(), vec![confirmation]);
    assert!(status.calls().is_empty());
    assert_eq!(metrics.snapshot().completions_triggered, 1);
    Ok(())
}
