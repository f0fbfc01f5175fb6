#![allow(dead_code)]

use std::sync::{Arc, Once};
use vital_monitor::{
    frame_channel, ClientConfig, Frame, FrameWatch, MockTransport, Orchestrator, PredictionClient, VitalRecord,
    WaveformConfig, WaveformRenderer,
};

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub const TEST_API_BASE: &str = "http://vitals.test:5000";

/// Frames every millisecond so tests do not wait on a real display rate.
pub fn fast_waveform() -> WaveformConfig {
    WaveformConfig {
        refresh_interval: std::time::Duration::from_millis(1),
        ..WaveformConfig::default()
    }
}

/// Slow enough that a test reads every frame before the next tick.
pub fn steady_waveform() -> WaveformConfig {
    WaveformConfig {
        refresh_interval: std::time::Duration::from_millis(25),
        ..WaveformConfig::default()
    }
}

/// Waits for the canvas to be redrawn and returns what is on it now.
pub async fn next_frame(frames: &mut FrameWatch) -> Frame {
    tokio::time::timeout(std::time::Duration::from_secs(2), frames.changed())
        .await
        .expect("frame within two seconds")
        .expect("renderer still publishing");
    frames.borrow_and_update().clone().expect("a frame was drawn")
}

pub fn mock_client(transport: Arc<MockTransport>) -> PredictionClient {
    let config = ClientConfig::default().with_base_url(TEST_API_BASE);
    PredictionClient::with_transport(&config, transport).expect("valid test base URL")
}

pub fn mock_monitor(transport: Arc<MockTransport>) -> (Orchestrator, FrameWatch) {
    let client = Arc::new(mock_client(transport));
    let (sender, frames) = frame_channel();
    let renderer = WaveformRenderer::new(fast_waveform(), sender);
    (Orchestrator::new(client, renderer), frames)
}

/// The patient form values plus the fixed vitals used across scenarios.
pub fn scenario_record() -> VitalRecord {
    VitalRecord::from_pairs([
        ("Age", 45.0),
        ("Gender", 0.0),
        ("BMI", 24.5),
        ("Derived_HRV", 5.1),
        ("Derived_Pulse_Pressure", 40.0),
        ("Derived_MAP", 90.0),
        ("Heart Rate", 80.0),
        ("Respiratory Rate", 17.0),
        ("Body Temperature", 36.9),
        ("Oxygen Saturation", 98.0),
        ("Systolic Blood Pressure", 116.0),
        ("Diastolic Blood Pressure", 74.0),
    ])
    .expect("finite values")
}

pub fn window_records(count: usize) -> Vec<VitalRecord> {
    (0..count)
        .map(|i| {
            VitalRecord::from_pairs([
                ("Age", 45.0),
                ("Gender", 0.0),
                ("BMI", 24.5),
                ("Derived_HRV", 5.0 + i as f64 * 0.1),
                ("Derived_Pulse_Pressure", 40.0 + i as f64),
                ("Derived_MAP", 90.0),
            ])
            .expect("finite values")
        })
        .collect()
}
