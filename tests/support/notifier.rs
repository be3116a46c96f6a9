use std::sync::{Arc, Mutex};

use chartist::port::{Event, Notifier};

/// Thread-safe event collector for notification assertions in tests.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    events: Arc<Mutex<Vec<Event>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.lock().expect("lock notifier events").len()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().expect("lock notifier events").clone()
    }

    pub fn count_raised_alerts(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, Event::AlertRaised(_)))
            .count()
    }

    pub fn count_detections(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, Event::DetectionEmitted(_)))
            .count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, event: Event) {
        self.events
            .lock()
            .expect("lock notifier events")
            .push(event);
    }
}
