//! Event-driven simulator: owns the clock and the event queue.

use super::event::{Event, EventKind, Target};
use super::scheduled_event::ScheduledEvent;
use super::time::SimTime;
use crate::error::SimError;
use crate::net::network::Network;
use std::collections::BinaryHeap;
use tracing::{debug, info, trace};

/// Why a call to [`Simulator::run`] stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every flow reported `done`.
    Completed { steps: u64 },
    /// `max_steps` was reached before completion.
    StepsExhausted { steps: u64 },
    /// The queue drained without every flow completing.
    QueueEmpty { steps: u64 },
}

impl RunOutcome {
    pub fn steps(&self) -> u64 {
        match self {
            RunOutcome::Completed { steps }
            | RunOutcome::StepsExhausted { steps }
            | RunOutcome::QueueEmpty { steps } => *steps,
        }
    }
}

#[derive(Default)]
pub struct Simulator {
    clock: SimTime,
    next_seq: u64,
    queue: BinaryHeap<ScheduledEvent>,
}

impl Simulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> SimTime {
        self.clock
    }

    /// Schedules `kind` to fire at `target` at `timestamp`. Fatal if
    /// `timestamp` precedes the clock — the spec treats this as an
    /// invariant violation, not a clamp.
    #[tracing::instrument(skip(self, kind), fields(?timestamp, %target))]
    pub fn enqueue(
        &mut self,
        timestamp: SimTime,
        target: Target,
        kind: EventKind,
    ) -> Result<(), SimError> {
        if timestamp < self.clock {
            return Err(SimError::TimeRegression {
                scheduled: timestamp,
                clock: self.clock,
            });
        }
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        trace!(seq, "enqueue");
        self.queue.push(ScheduledEvent(Event {
            timestamp,
            target,
            kind,
            seq,
        }));
        Ok(())
    }

    /// Pops and dispatches the earliest event, advancing the clock to its
    /// timestamp. Returns `Ok(None)` once the queue is empty.
    pub fn step(&mut self, network: &mut Network) -> Result<Option<Event>, SimError> {
        let Some(ScheduledEvent(event)) = self.queue.pop() else {
            return Ok(None);
        };
        if event.timestamp < self.clock {
            return Err(SimError::TimeRegression {
                scheduled: event.timestamp,
                clock: self.clock,
            });
        }
        self.clock = event.timestamp;
        debug!(target = %event.target, kind = event.kind.label(), at = ?self.clock, "dispatch");
        network.dispatch(&event, self)?;
        Ok(Some(event))
    }

    /// Drains the queue until every flow is done, the queue empties, or
    /// `max_steps` (0 = unbounded) is reached.
    #[tracing::instrument(skip(self, network))]
    pub fn run(&mut self, network: &mut Network, max_steps: u64) -> Result<RunOutcome, SimError> {
        info!(max_steps, "starting run");
        let mut steps = 0u64;
        loop {
            if network.all_flows_done() {
                info!(steps, "completed: all flows done");
                return Ok(RunOutcome::Completed { steps });
            }
            if max_steps != 0 && steps >= max_steps {
                info!(steps, "stopping: step budget exhausted");
                return Ok(RunOutcome::StepsExhausted { steps });
            }
            match self.step(network)? {
                Some(_) => steps += 1,
                None => {
                    info!(steps, "stopping: queue empty");
                    return Ok(RunOutcome::QueueEmpty { steps });
                }
            }
        }
    }
}
