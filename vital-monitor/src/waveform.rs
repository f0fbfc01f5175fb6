use crate::types::DEFAULT_BPM;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info};

/// Geometry and timing of the pulse trace.
#[derive(Debug, Clone)]
pub struct WaveformConfig {
    pub width: usize,
    pub height: f64,
    pub amplitude: f64,
    /// Scales bpm into angular frequency; 400 makes 40 to 180 bpm look right.
    pub frequency_divisor: f64,
    /// Time between frames; one display refresh.
    pub refresh_interval: Duration,
}

impl Default for WaveformConfig {
    fn default() -> Self {
        Self {
            width: 260,
            height: 80.0,
            amplitude: 18.0,
            frequency_divisor: 400.0,
            refresh_interval: Duration::from_micros(16_667),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// One complete redraw of the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Bumped every time the loop restarts.
    pub epoch: u64,
    pub phase: u64,
    pub bpm: f64,
    pub points: Vec<Point>,
}

impl Frame {
    /// Rasterizes the stroke onto a `cols` x `rows` character grid.
    pub fn to_ascii(&self, cols: usize, rows: usize, height: f64) -> String {
        if cols == 0 || rows == 0 || self.points.is_empty() {
            return String::new();
        }

        let mut grid = vec![vec![' '; cols]; rows];
        for col in 0..cols {
            let index = col * self.points.len() / cols;
            let y = self.points[index].y;
            let row = ((y / height) * rows as f64).floor().clamp(0.0, (rows - 1) as f64) as usize;
            grid[row][col] = '*';
        }

        grid.into_iter()
            .map(|line| line.into_iter().collect::<String>().trim_end().to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Computes the stroke for phase `t`: `y = H/2 + A * sin((x + t) * bpm / divisor)`.
pub fn render_frame(config: &WaveformConfig, epoch: u64, bpm: f64, phase: u64) -> Frame {
    let mid = config.height / 2.0;
    let points = (0..config.width)
        .map(|x| {
            let angle = (x as f64 + phase as f64) * bpm / config.frequency_divisor;
            Point {
                x: x as f64,
                y: mid + config.amplitude * angle.sin(),
            }
        })
        .collect();

    Frame {
        epoch,
        phase,
        bpm,
        points,
    }
}

/// Canvas end of the renderer: holds only the newest frame.
pub type FrameSink = watch::Sender<Option<Frame>>;
pub type FrameWatch = watch::Receiver<Option<Frame>>;

/// A canvas with nothing drawn yet.
pub fn frame_channel() -> (FrameSink, FrameWatch) {
    watch::channel(None)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WaveformStatus {
    Stopped,
    Running { bpm: f64, epoch: u64 },
}

struct AnimationLoop {
    bpm: f64,
    epoch: u64,
    handle: JoinHandle<()>,
}

/// Drives the animated pulse trace.
///
/// Each running loop is a spawned task bound to this renderer: changing the
/// bpm cancels it and starts a fresh one at phase 0, and dropping the
/// renderer cancels whatever is scheduled. Each frame replaces the previous
/// one on the canvas, so a slow host only ever sees the latest.
pub struct WaveformRenderer {
    config: WaveformConfig,
    sink: Arc<FrameSink>,
    running: Option<AnimationLoop>,
    epoch: u64,
}

impl WaveformRenderer {
    pub fn new(config: WaveformConfig, sink: FrameSink) -> Self {
        Self {
            config,
            sink: Arc::new(sink),
            running: None,
            epoch: 0,
        }
    }

    pub fn config(&self) -> &WaveformConfig {
        &self.config
    }

    pub fn status(&self) -> WaveformStatus {
        match &self.running {
            Some(running) => WaveformStatus::Running {
                bpm: running.bpm,
                epoch: running.epoch,
            },
            None => WaveformStatus::Stopped,
        }
    }

    /// Feeds a new pulse rate. Returns true when the loop was (re)started.
    ///
    /// Must be called from within a tokio runtime.
    pub fn set_bpm(&mut self, bpm: Option<f64>) -> bool {
        let bpm = bpm.filter(|b| b.is_finite() && *b > 0.0).unwrap_or(DEFAULT_BPM);
        if let Some(running) = &self.running {
            if running.bpm == bpm && !running.handle.is_finished() {
                return false;
            }
        }

        self.stop();
        self.epoch += 1;
        let epoch = self.epoch;
        let handle = tokio::spawn(animate(self.config.clone(), self.sink.clone(), epoch, bpm));
        self.running = Some(AnimationLoop { bpm, epoch, handle });

        info!("Waveform running at {} bpm (epoch {})", bpm, epoch);
        true
    }

    pub fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            running.handle.abort();
            debug!("Waveform epoch {} stopped", running.epoch);
        }
    }
}

impl Drop for WaveformRenderer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn animate(config: WaveformConfig, sink: Arc<FrameSink>, epoch: u64, bpm: f64) {
    let mut ticker = interval(config.refresh_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut phase: u64 = 0;
    loop {
        ticker.tick().await;
        let frame = render_frame(&config, epoch, bpm, phase);
        if sink.send(Some(frame)).is_err() {
            // Nobody is drawing anymore.
            break;
        }
        phase = phase.wrapping_add(1);
    }
}
