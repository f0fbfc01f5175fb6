pub mod types;
pub mod traits;
pub mod fetcher;
pub mod parser;
pub mod collector;
pub mod client;
pub mod waveform;
pub mod presenter;
pub mod state;
pub mod orchestrator;

pub use types::*;
pub use traits::PredictionTransport;
pub use fetcher::{HttpTransport, MockTransport, RecordedRequest};
pub use collector::FormCollector;
pub use client::PredictionClient;
pub use waveform::{frame_channel, Frame, FrameSink, FrameWatch, WaveformConfig, WaveformRenderer, WaveformStatus};
pub use presenter::{ResultGrid, ResultPresenter};
pub use state::{ErrorIndicator, ResultCell};
pub use orchestrator::{Orchestrator, Outcome, DiscardReason, RequestTicket};
