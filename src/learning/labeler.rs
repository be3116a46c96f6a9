//! Paper-trade outcome labeling.
//!
//! Every emitted directional detection opens a simulated position at
//! the detection's risk frame. New bars advance the open positions;
//! a touched stop or target (or the policy's bar cutoff) closes the
//! position and appends a labeled `Outcome`, which later becomes a
//! training sample.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::adapter::NotifierRegistry;
use crate::domain::{
    Bar, Direction, LabelingPolicy, Outcome, PaperPosition, PatternDetection, PositionExit,
};
use crate::port::{DetectionStore, Event, OutcomeEvent, OutcomeStore};

/// Tracks open paper positions and labels them as bars arrive.
pub struct OutcomeLabeler {
    detections: Arc<dyn DetectionStore>,
    outcomes: Arc<dyn OutcomeStore>,
    notifiers: Arc<NotifierRegistry>,
    policy: LabelingPolicy,
    open: Mutex<Vec<PaperPosition>>,
}

impl OutcomeLabeler {
    pub fn new(
        detections: Arc<dyn DetectionStore>,
        outcomes: Arc<dyn OutcomeStore>,
        notifiers: Arc<NotifierRegistry>,
        policy: LabelingPolicy,
    ) -> Self {
        Self {
            detections,
            outcomes,
            notifiers,
            policy,
            open: Mutex::new(Vec::new()),
        }
    }

    /// Open a paper position for a directional detection.
    ///
    /// Neutral detections have no directional exit to label and are
    /// skipped.
    pub fn track(&self, detection: &PatternDetection) {
        if detection.direction == Direction::Neutral {
            debug!(
                detection_id = %detection.id,
                pattern = %detection.pattern_name,
                "neutral detection not tracked for labeling"
            );
            return;
        }
        self.open
            .lock()
            .push(PaperPosition::open(detection, self.policy));
    }

    /// Number of currently open positions.
    #[must_use]
    pub fn open_positions(&self) -> usize {
        self.open.lock().len()
    }

    /// Advance open positions for the bar's symbol and label any that
    /// close. Returns the outcomes labeled by this bar.
    ///
    /// A position whose outcome fails to persist is reopened so a later
    /// bar retries the close; labeling must never drop a result.
    pub async fn on_bar(&self, bar: &Bar) -> Vec<Outcome> {
        let exits: Vec<(PaperPosition, PositionExit)> = {
            let mut open = self.open.lock();
            open.iter_mut()
                .filter(|p| p.symbol == bar.symbol && !p.closed)
                .filter_map(|p| p.advance(bar).map(|exit| (p.clone(), exit)))
                .collect()
        };

        let mut labeled = Vec::with_capacity(exits.len());
        for (position, exit) in exits {
            let detection_id = position.detection_id.clone();
            let outcome = position.into_outcome(exit);

            if let Err(error) = self.outcomes.append(&outcome).await {
                warn!(
                    detection_id = %detection_id,
                    %error,
                    "outcome persist failed, keeping position open"
                );
                let mut open = self.open.lock();
                if let Some(p) = open.iter_mut().find(|p| p.detection_id == detection_id) {
                    p.closed = false;
                }
                continue;
            }

            match self
                .detections
                .attach_outcome(&outcome.detection_id, &outcome.id)
                .await
            {
                Ok(true) => {}
                Ok(false) => debug!(
                    detection_id = %outcome.detection_id,
                    "labeled outcome for an unknown detection"
                ),
                Err(error) => warn!(
                    detection_id = %outcome.detection_id,
                    %error,
                    "failed to link outcome to its detection"
                ),
            }

            self.notifiers
                .notify_all(Event::OutcomeLabeled(OutcomeEvent::from(&outcome)));
            labeled.push(outcome);
        }

        self.open.lock().retain(|p| !p.closed);
        labeled
    }
}
