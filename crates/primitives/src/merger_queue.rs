//! The merger event queue: mergers detected during the physics phases
//! of a sub-timestep are not applied immediately. They are recorded
//! here and drained, in the order they were queued, once the
//! sub-timestep's physics phases have all run — so a merger handler
//! never observes a galaxy mid-update from an earlier phase in the
//! same step.

use galform_core::{EvolutionError, EvolutionResult, MergeType};
use std::collections::VecDeque;

/// A deferred merger: `satellite_index` will merge into `central_index`
/// once drained and handled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergerEvent {
    /// Galaxy array index of the satellite being consumed.
    pub satellite_index: usize,
    /// Galaxy array index of the central absorbing it.
    pub central_index: usize,
    /// Classification of the merger.
    pub merge_type: MergeType,
    /// Simulation time at which the merger is scheduled to complete.
    pub scheduled_time: f64,
    /// Sub-timestep index at which the merger was detected.
    pub queued_at_step: u32,
}

/// FIFO queue of mergers detected but not yet applied.
///
/// Bounded so a runaway forest (or a bug that re-queues the same pair
/// every step) cannot grow the queue without limit; exceeding the
/// capacity is a [`EvolutionError::ResourceExhausted`], fatal to the
/// run.
#[derive(Debug)]
pub struct MergerEventQueue {
    events: VecDeque<MergerEvent>,
    capacity: usize,
}

impl MergerEventQueue {
    /// An empty queue with no more than `capacity` events outstanding
    /// at once.
    pub fn new(capacity: usize) -> Self {
        MergerEventQueue {
            events: VecDeque::new(),
            capacity,
        }
    }

    /// Queue `event` for later handling.
    pub fn push(&mut self, event: MergerEvent) -> EvolutionResult<()> {
        if self.events.len() >= self.capacity {
            return Err(EvolutionError::resource_exhausted(
                "merger event queue",
                self.capacity,
                self.events.len() + 1,
            ));
        }
        self.events.push_back(event);
        Ok(())
    }

    /// Remove and return the oldest queued event, if any.
    pub fn pop_front(&mut self) -> Option<MergerEvent> {
        self.events.pop_front()
    }

    /// Number of events currently queued.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True if no events are queued.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Drain every queued event in FIFO order, leaving the queue empty.
    pub fn drain(&mut self) -> Vec<MergerEvent> {
        self.events.drain(..).collect()
    }

    /// Clear every pending event without processing it, distinct from
    /// [`MergerEventQueue::drain`]. Called at the start of each
    /// sub-timestep so a step never sees events queued by a previous
    /// one.
    pub fn reset(&mut self) {
        self.events.clear();
    }
}
