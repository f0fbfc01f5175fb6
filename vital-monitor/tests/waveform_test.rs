mod common;

use common::{fast_waveform, init_tracing, next_frame, steady_waveform};
use tokio::time::{timeout, Duration};
use vital_monitor::waveform::render_frame;
use vital_monitor::{frame_channel, FrameWatch, WaveformConfig, WaveformRenderer, WaveformStatus};

/// Skips frames left over from earlier loops.
async fn next_frame_of_epoch(frames: &mut FrameWatch, epoch: u64) -> vital_monitor::Frame {
    loop {
        let frame = next_frame(frames).await;
        if frame.epoch == epoch {
            return frame;
        }
    }
}

#[test]
fn test_waveform_stays_within_amplitude() {
    let config = WaveformConfig::default();
    let mid = config.height / 2.0;

    for bpm in 1..=300 {
        for phase in [0u64, 1, 59, 1_000, 86_400] {
            let frame = render_frame(&config, 1, bpm as f64, phase);
            assert_eq!(frame.points.len(), config.width);
            for point in &frame.points {
                assert!(
                    (point.y - mid).abs() <= config.amplitude + 1e-9,
                    "bpm {} phase {} x {} y {}",
                    bpm,
                    phase,
                    point.x,
                    point.y
                );
            }
        }
    }
}

#[test]
fn test_frame_matches_formula() {
    let config = WaveformConfig::default();
    let frame = render_frame(&config, 3, 80.0, 12);

    assert_eq!(frame.phase, 12);
    assert_eq!(frame.epoch, 3);
    assert_eq!(frame.points[0].x, 0.0);
    assert_eq!(frame.points[259].x, 259.0);
    let expected = 40.0 + 18.0 * ((5.0 + 12.0) * 80.0 / 400.0f64).sin();
    assert!((frame.points[5].y - expected).abs() < 1e-12);
}

#[test]
fn test_ascii_rendering() {
    let config = WaveformConfig::default();
    let frame = render_frame(&config, 1, 72.0, 0);
    let art = frame.to_ascii(40, 8, config.height);

    let lines: Vec<&str> = art.lines().collect();
    assert!(lines.len() <= 8);
    assert_eq!(art.chars().filter(|c| *c == '*').count(), 40);
    assert!(frame.to_ascii(0, 8, config.height).is_empty());
}

#[tokio::test]
async fn test_renderer_is_inert_until_bpm_arrives() {
    init_tracing();

    let (sender, frames) = frame_channel();
    let renderer = WaveformRenderer::new(fast_waveform(), sender);

    assert_eq!(renderer.status(), WaveformStatus::Stopped);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!frames.has_changed().unwrap());
    assert!(frames.borrow().is_none());
}

#[tokio::test]
async fn test_phase_advances_each_frame() {
    init_tracing();

    let (sender, mut frames) = frame_channel();
    let mut renderer = WaveformRenderer::new(steady_waveform(), sender);
    assert!(renderer.set_bpm(Some(80.0)));

    for expected in 0..4u64 {
        let frame = next_frame(&mut frames).await;
        assert_eq!(frame.phase, expected);
        assert_eq!(frame.bpm, 80.0);
    }
    assert!(matches!(renderer.status(), WaveformStatus::Running { bpm, .. } if bpm == 80.0));
}

#[tokio::test]
async fn test_unread_frames_do_not_pile_up() {
    init_tracing();

    let (sender, mut frames) = frame_channel();
    let mut renderer = WaveformRenderer::new(fast_waveform(), sender);
    renderer.set_bpm(Some(80.0));

    tokio::time::sleep(Duration::from_millis(200)).await;

    // Only the newest frame is held: one read drains the canvas.
    assert!(frames.has_changed().unwrap());
    let latest = frames.borrow_and_update().clone().expect("frame drawn");
    assert!(latest.phase > 0, "older frames were replaced");
    assert!(!frames.has_changed().unwrap());

    let after = next_frame(&mut frames).await;
    assert!(after.phase > latest.phase);
}

#[tokio::test]
async fn test_bpm_change_restarts_at_phase_zero() {
    init_tracing();

    let (sender, mut frames) = frame_channel();
    let mut renderer = WaveformRenderer::new(steady_waveform(), sender);

    renderer.set_bpm(Some(60.0));
    for _ in 0..3 {
        next_frame(&mut frames).await;
    }
    let WaveformStatus::Running { epoch: first_epoch, .. } = renderer.status() else {
        panic!("renderer should be running");
    };

    assert!(renderer.set_bpm(Some(120.0)));
    let WaveformStatus::Running { epoch, bpm } = renderer.status() else {
        panic!("renderer should be running");
    };
    assert_eq!(bpm, 120.0);
    assert!(epoch > first_epoch);

    let frame = next_frame_of_epoch(&mut frames, epoch).await;
    assert_eq!(frame.phase, 0);
    assert_eq!(frame.bpm, 120.0);
}

#[tokio::test]
async fn test_same_bpm_keeps_running_loop() {
    init_tracing();

    let (sender, _frames) = frame_channel();
    let mut renderer = WaveformRenderer::new(fast_waveform(), sender);

    assert!(renderer.set_bpm(Some(75.0)));
    let before = renderer.status();
    assert!(!renderer.set_bpm(Some(75.0)));
    assert_eq!(renderer.status(), before);
}

#[tokio::test]
async fn test_missing_bpm_uses_default() {
    init_tracing();

    let (sender, mut frames) = frame_channel();
    let mut renderer = WaveformRenderer::new(fast_waveform(), sender);

    renderer.set_bpm(None);
    assert_eq!(next_frame(&mut frames).await.bpm, 72.0);

    renderer.set_bpm(Some(f64::NAN));
    assert!(matches!(renderer.status(), WaveformStatus::Running { bpm, .. } if bpm == 72.0));
}

#[tokio::test]
async fn test_stop_cancels_scheduled_frames() {
    init_tracing();

    let (sender, mut frames) = frame_channel();
    let mut renderer = WaveformRenderer::new(fast_waveform(), sender);

    renderer.set_bpm(Some(90.0));
    next_frame(&mut frames).await;
    renderer.stop();
    assert_eq!(renderer.status(), WaveformStatus::Stopped);

    // Let the aborted task settle, then mark whatever it drew as seen.
    tokio::time::sleep(Duration::from_millis(10)).await;
    let _ = frames.borrow_and_update();

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!frames.has_changed().unwrap(), "no frames after stop");
}

#[tokio::test]
async fn test_dropping_renderer_ends_the_loop() {
    init_tracing();

    let (sender, mut frames) = frame_channel();
    {
        let mut renderer = WaveformRenderer::new(fast_waveform(), sender);
        renderer.set_bpm(Some(100.0));
        next_frame(&mut frames).await;
    }

    // The canvas closes once the aborted task releases its handle.
    let closed = timeout(Duration::from_secs(2), async {
        while frames.changed().await.is_ok() {}
    })
    .await;
    assert!(closed.is_ok());
}
