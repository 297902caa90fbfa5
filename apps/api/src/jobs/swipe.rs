//! Swipe Decision Engine: turns pointer drags over the candidate deck into
//! Apply / Bookmark / Dismiss decisions.
//!
//! The engine is input-device agnostic: callers feed absolute pointer positions
//! (mouse, touch, or synthetic), the engine derives the drag offset from the
//! pointer-down origin and classifies it on release.
//!
//! ```text
//! Closed ──open──▶ Presenting(i) ──down──▶ Dragging(i, offset)
//!                     ▲   │                   │  move: offset updated
//!                     │   │ decide            │  leave / up below threshold
//!                     │   ▼                   ▼
//!                     └── advance ◀── up past threshold
//! ```
//!
//! The deck is the visible list captured at open, so dismissing a card while
//! swiping never shifts the remaining cards under the index.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::jobs::store::JobCandidateStore;
use crate::models::job::JobPosting;

/// Distance (in pointer units) a drag must travel along an axis to count as a decision.
pub const DECISION_THRESHOLD: f64 = 80.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PointerPosition {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DragOffset {
    pub dx: f64,
    pub dy: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Apply,
    Bookmark,
    Dismiss,
}

impl DragOffset {
    pub const ZERO: DragOffset = DragOffset { dx: 0.0, dy: 0.0 };

    /// Up beats right beats left. Anything short of the threshold is no decision.
    pub fn classify(self) -> Option<Decision> {
        if self.dy <= -DECISION_THRESHOLD {
            Some(Decision::Apply)
        } else if self.dx >= DECISION_THRESHOLD {
            Some(Decision::Bookmark)
        } else if self.dx <= -DECISION_THRESHOLD {
            Some(Decision::Dismiss)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SwipeState {
    Closed,
    Presenting {
        index: usize,
    },
    Dragging {
        index: usize,
        origin: PointerPosition,
        offset: DragOffset,
    },
}

/// Receives the job when a card is swiped up, to open an apply session for it.
pub trait ApplyHandoff {
    fn hand_off(&self, job: &JobPosting);
}

/// A decision that fired, with the job it applied to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwipeDecision {
    pub decision: Decision,
    pub job: JobPosting,
}

/// Read model for the overlay: the current card, "n / total", and the drag offset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwipeView {
    pub state: SwipeState,
    pub position: Option<usize>,
    pub total: usize,
    pub current: Option<JobPosting>,
    pub offset: DragOffset,
}

#[derive(Debug)]
pub struct SwipeDecisionEngine {
    state: SwipeState,
    deck: Vec<JobPosting>,
}

impl Default for SwipeDecisionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SwipeDecisionEngine {
    pub fn new() -> Self {
        Self {
            state: SwipeState::Closed,
            deck: Vec::new(),
        }
    }

    pub fn state(&self) -> SwipeState {
        self.state
    }

    fn index(&self) -> Option<usize> {
        match self.state {
            SwipeState::Closed => None,
            SwipeState::Presenting { index } | SwipeState::Dragging { index, .. } => Some(index),
        }
    }

    pub fn current_job(&self) -> Option<&JobPosting> {
        self.index().and_then(|i| self.deck.get(i))
    }

    pub fn view(&self) -> SwipeView {
        let offset = match self.state {
            SwipeState::Dragging { offset, .. } => offset,
            _ => DragOffset::ZERO,
        };
        SwipeView {
            state: self.state,
            position: self.index().map(|i| i + 1),
            total: self.deck.len(),
            current: self.current_job().cloned(),
            offset,
        }
    }

    /// Captures the visible candidates and presents the first one. Stays closed
    /// when there is nothing to show.
    pub fn open(&mut self, store: &JobCandidateStore) -> SwipeState {
        self.deck = store.visible_candidates();
        if self.deck.is_empty() {
            self.state = SwipeState::Closed;
            store.set_overlay_open(false);
        } else {
            self.state = SwipeState::Presenting { index: 0 };
            store.set_overlay_open(true);
            info!("Swipe deck opened with {} cards", self.deck.len());
        }
        self.state
    }

    /// Closes the overlay, discarding any drag in progress.
    pub fn close(&mut self, store: &JobCandidateStore) {
        self.state = SwipeState::Closed;
        self.deck.clear();
        store.set_overlay_open(false);
    }

    pub fn pointer_down(&mut self, at: PointerPosition) -> SwipeState {
        if let SwipeState::Presenting { index } = self.state {
            self.state = SwipeState::Dragging {
                index,
                origin: at,
                offset: DragOffset::ZERO,
            };
        }
        self.state
    }

    pub fn pointer_move(&mut self, at: PointerPosition) -> SwipeState {
        if let SwipeState::Dragging { index, origin, .. } = self.state {
            self.state = SwipeState::Dragging {
                index,
                origin,
                offset: DragOffset {
                    dx: at.x - origin.x,
                    dy: at.y - origin.y,
                },
            };
        }
        self.state
    }

    /// Pointer left the card: the drag is abandoned without a decision.
    pub fn pointer_leave(&mut self) -> SwipeState {
        if let SwipeState::Dragging { index, .. } = self.state {
            self.state = SwipeState::Presenting { index };
        }
        self.state
    }

    pub fn pointer_up(
        &mut self,
        store: &JobCandidateStore,
        handoff: &dyn ApplyHandoff,
    ) -> Option<SwipeDecision> {
        let SwipeState::Dragging { index, offset, .. } = self.state else {
            return None;
        };
        match offset.classify() {
            Some(decision) => self.commit(decision, index, store, handoff),
            None => {
                debug!("Drag of ({}, {}) below threshold", offset.dx, offset.dy);
                self.state = SwipeState::Presenting { index };
                None
            }
        }
    }

    /// Decision from an explicit button rather than a drag.
    pub fn decide(
        &mut self,
        decision: Decision,
        store: &JobCandidateStore,
        handoff: &dyn ApplyHandoff,
    ) -> Option<SwipeDecision> {
        let index = self.index()?;
        self.commit(decision, index, store, handoff)
    }

    fn commit(
        &mut self,
        decision: Decision,
        index: usize,
        store: &JobCandidateStore,
        handoff: &dyn ApplyHandoff,
    ) -> Option<SwipeDecision> {
        let Some(job) = self.deck.get(index).cloned() else {
            self.close(store);
            return None;
        };

        match decision {
            Decision::Bookmark => {
                store.bookmark(&job.id);
            }
            Decision::Dismiss => {
                store.dismiss(&job.id);
            }
            Decision::Apply => handoff.hand_off(&job),
        }
        info!("Swipe decision {:?} on job {}", decision, job.id);

        let next = index + 1;
        if next >= self.deck.len() {
            self.close(store);
        } else {
            self.state = SwipeState::Presenting { index: next };
        }

        Some(SwipeDecision { decision, job })
    }
}
