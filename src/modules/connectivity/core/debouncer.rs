use serde::Serialize;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    WentOnline,
    WentOffline,
}

impl Transition {
    pub fn to(online: bool) -> Self {
        if online {
            Transition::WentOnline
        } else {
            Transition::WentOffline
        }
    }

    pub fn is_online(&self) -> bool {
        matches!(self, Transition::WentOnline)
    }
}

/// Turns raw reachability samples into stable transitions.
///
/// A value different from the reported one becomes a candidate; it is reported
/// only once it has been observed continuously for `hold`. Seeing the reported
/// value again drops the candidate.
#[derive(Debug, Clone)]
pub struct Debouncer {
    reported: bool,
    candidate_since: Option<Instant>,
    hold: Duration,
}

impl Debouncer {
    pub fn new(initial: bool, hold: Duration) -> Self {
        Self {
            reported: initial,
            candidate_since: None,
            hold,
        }
    }

    pub fn reported(&self) -> bool {
        self.reported
    }

    pub fn observe(&mut self, raw: bool, now: Instant) -> Option<Transition> {
        if raw == self.reported {
            if self.candidate_since.take().is_some() {
                tracing::trace!(online = raw, "connectivity flap ignored");
            }
            return None;
        }
        let since = *self.candidate_since.get_or_insert(now);
        if now.saturating_duration_since(since) < self.hold {
            return None;
        }
        self.reported = raw;
        self.candidate_since = None;
        Some(Transition::to(raw))
    }
}
