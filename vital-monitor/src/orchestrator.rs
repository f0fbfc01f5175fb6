use crate::client::PredictionClient;
use crate::collector::validate_window;
use crate::presenter::{ResultGrid, ResultPresenter};
use crate::state::{ErrorIndicator, ResultCell};
use crate::types::{ErrorKind, MonitorError, PredictionRequest, PredictionResult, Result};
use crate::waveform::{WaveformRenderer, WaveformStatus};
use interfaces::BaselineEstimator;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Identifies one user-triggered prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestTicket {
    /// Log correlation id.
    pub id: Uuid,
    pub generation: u64,
    pub kind: &'static str,
}

/// A finished client call travelling back to the orchestrator.
#[derive(Debug)]
pub struct Completion {
    pub ticket: RequestTicket,
    pub outcome: Result<PredictionResult>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// A newer request was submitted after this one.
    Superseded,
    /// The view was torn down before the response landed.
    TornDown,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Applied { ticket: RequestTicket },
    Failed { ticket: RequestTicket, kind: ErrorKind },
    Discarded { ticket: RequestTicket, reason: DiscardReason },
}

/// Everything a host needs to draw the current view.
#[derive(Debug)]
pub struct ViewSnapshot<'a> {
    pub result: Option<&'a PredictionResult>,
    pub grid: Option<&'a ResultGrid>,
    pub error: Option<&'a ErrorIndicator>,
    pub waveform: WaveformStatus,
}

/// Owns the shared prediction state and wires user actions to the client.
///
/// The orchestrator is the only writer of the result cell. Client calls run
/// as spawned tasks and report back over a channel; each submission bumps a
/// generation counter so that only the newest request's answer is applied,
/// and nothing is applied after `teardown`.
pub struct Orchestrator {
    client: Arc<PredictionClient>,
    state: ResultCell,
    presenter: ResultPresenter,
    grid: Option<ResultGrid>,
    renderer: WaveformRenderer,
    generation: u64,
    pending: usize,
    alive: bool,
    completion_sender: mpsc::UnboundedSender<Completion>,
    completion_receiver: mpsc::UnboundedReceiver<Completion>,
}

impl Orchestrator {
    pub fn new(client: Arc<PredictionClient>, renderer: WaveformRenderer) -> Self {
        let (completion_sender, completion_receiver) = mpsc::unbounded_channel();

        Self {
            client,
            state: ResultCell::new(),
            presenter: ResultPresenter::new(),
            grid: None,
            renderer,
            generation: 0,
            pending: 0,
            alive: true,
            completion_sender,
            completion_receiver,
        }
    }

    pub fn with_presenter(mut self, presenter: ResultPresenter) -> Self {
        self.presenter = presenter;
        self
    }

    /// Validates and dispatches a prediction without waiting for it.
    ///
    /// Invalid input is reported on the error indicator and never reaches the
    /// network. Must be called from within a tokio runtime.
    pub fn submit(&mut self, request: PredictionRequest) -> Result<RequestTicket> {
        if !self.alive {
            return Err(MonitorError::TornDown);
        }

        if let PredictionRequest::Window(payload) = &request {
            if let Err(e) = validate_window(payload) {
                let error = MonitorError::from(e);
                warn!("Rejected {} request before sending: {}", request.kind(), error);
                self.state.set_error(&error);
                return Err(error);
            }
        }

        self.generation += 1;
        self.pending += 1;
        let ticket = RequestTicket {
            id: Uuid::new_v4(),
            generation: self.generation,
            kind: request.kind(),
        };
        info!("Submitting {} prediction {} (generation {})", ticket.kind, ticket.id, ticket.generation);

        let client = self.client.clone();
        let sender = self.completion_sender.clone();
        let task_ticket = ticket.clone();
        tokio::spawn(async move {
            let outcome = client.predict(&request).await;
            // The receiver is gone once the view is torn down.
            let _ = sender.send(Completion {
                ticket: task_ticket,
                outcome,
            });
        });

        Ok(ticket)
    }

    /// Waits for the next in-flight prediction and applies it.
    ///
    /// Returns `None` when nothing is in flight.
    pub async fn next_outcome(&mut self) -> Option<Outcome> {
        if self.pending == 0 {
            return None;
        }
        let completion = self.completion_receiver.recv().await?;
        Some(self.apply(completion))
    }

    pub fn apply(&mut self, completion: Completion) -> Outcome {
        self.pending = self.pending.saturating_sub(1);
        let Completion { ticket, outcome } = completion;

        if !self.alive {
            debug!("Dropping {} after teardown", ticket.id);
            return Outcome::Discarded {
                ticket,
                reason: DiscardReason::TornDown,
            };
        }
        if ticket.generation != self.generation {
            debug!(
                "Dropping {} (generation {}, current {})",
                ticket.id, ticket.generation, self.generation
            );
            return Outcome::Discarded {
                ticket,
                reason: DiscardReason::Superseded,
            };
        }

        match outcome {
            Ok(result) => {
                self.on_predict(result);
                Outcome::Applied { ticket }
            }
            Err(e) => {
                warn!("Prediction {} failed: {}", ticket.id, e);
                self.state.set_error(&e);
                Outcome::Failed {
                    kind: e.kind(),
                    ticket,
                }
            }
        }
    }

    /// Stores a new result and pushes it to the presenter and the waveform.
    pub fn on_predict(&mut self, result: PredictionResult) {
        if !self.alive {
            return;
        }
        let bpm = result.heart_rate();
        let stored = self.state.set_result(result);
        self.grid = Some(self.presenter.render(stored));
        self.renderer.set_bpm(Some(bpm));
    }

    /// Degraded path: shows a locally synthesized result instead of asking
    /// the service. Supersedes anything still in flight.
    pub fn predict_offline(&mut self) -> Result<()> {
        if !self.alive {
            return Err(MonitorError::TornDown);
        }
        self.generation += 1;
        let result = BaselineEstimator::placeholder(&mut rand::thread_rng());
        info!("Using offline placeholder result at {} bpm", result.heart_rate());
        self.on_predict(result);
        Ok(())
    }

    /// Stops the waveform and makes any late response a no-op.
    pub fn teardown(&mut self) {
        if !self.alive {
            return;
        }
        self.alive = false;
        self.renderer.stop();
        self.state.clear();
        self.grid = None;
        self.completion_receiver.close();
        info!("Monitor torn down with {} request(s) in flight", self.pending);
    }

    pub fn snapshot(&self) -> ViewSnapshot<'_> {
        ViewSnapshot {
            result: self.state.result(),
            grid: self.grid.as_ref(),
            error: self.state.error(),
            waveform: self.renderer.status(),
        }
    }

    pub fn result(&self) -> Option<&PredictionResult> {
        self.state.result()
    }

    pub fn error(&self) -> Option<&ErrorIndicator> {
        self.state.error()
    }

    pub fn waveform_status(&self) -> WaveformStatus {
        self.renderer.status()
    }

    pub fn pending(&self) -> usize {
        self.pending
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }
}
