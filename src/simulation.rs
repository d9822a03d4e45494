use std::rc::Rc;

use crate::{
    entities::{EntityDirectory, EntityHandle, NameResolver},
    error::{Error, Result},
    queue::{
        event::{EventList, EventRecord, Target},
        EventQueue,
    },
    time::{Clock, Delta, SimClock, Time},
};

pub type SimQueue = EventQueue<Rc<SimClock>>;

/// The per-tick host loop: advances simulation time and delivers due events.
///
/// Built through [`crate::driver::build`], which validates the configuration first.
#[derive(Debug, typed_builder::TypedBuilder)]
#[builder(builder_method(vis = "pub(crate)"))]
pub struct Simulation {
    clock: Rc<SimClock>,
    // Always on the same timeline as `clock`
    #[builder(setter(skip), default = EventQueue::new(Rc::clone(&clock)))]
    queue: SimQueue,
    #[builder(setter(into))]
    tick_interval: Delta,
    #[builder(default)]
    max_events_per_tick: Option<usize>,

    // Run-time
    #[builder(default, setter(skip))]
    tick: u64,
}

impl Simulation {
    pub fn now(&self) -> Time {
        self.clock.now()
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn queue(&self) -> &SimQueue {
        &self.queue
    }

    pub fn queue_mut(&mut self) -> &mut SimQueue {
        &mut self.queue
    }

    /// Advances one tick and services the queue at the new time.
    pub fn step<D, S>(&mut self, dir: &D, sink: &mut S) -> Result<ServiceStats>
    where
        D: EntityDirectory + NameResolver,
        S: InputSink,
    {
        self.clock.advance_by(self.tick_interval)?;
        self.tick += 1;
        Ok(self.service(dir, sink))
    }

    /// Steps until the next tick would pass `end`.
    pub fn run_until<D, S>(&mut self, end: Time, dir: &D, sink: &mut S) -> Result<ServiceStats>
    where
        D: EntityDirectory + NameResolver,
        S: InputSink,
    {
        if !(self.tick_interval.is_finite() && self.tick_interval > Delta::ZERO) {
            return Err(Error::InvalidConfig(format!(
                "tick_interval must be positive, got {}",
                self.tick_interval
            )));
        }
        let mut stats = ServiceStats::default();
        while self.now() + self.tick_interval <= end {
            stats += self.step(dir, sink)?;
        }
        Ok(stats)
    }

    /// Delivers every event due at the current time without advancing the clock.
    ///
    /// Due events are taken off the queue before any is delivered, so inputs that schedule
    /// follow-up events never see them fire in the same pass.
    pub fn service<D, S>(&mut self, dir: &D, sink: &mut S) -> ServiceStats
    where
        D: EntityDirectory + NameResolver,
        S: InputSink,
    {
        let now = self.now();
        let due = match self.max_events_per_tick {
            Some(cap) => {
                let mut due = EventList::new();
                while due.len() < cap {
                    match self.queue.pop_due(now) {
                        Some(record) => due.push(record),
                        None => break,
                    }
                }
                due
            }
            None => self.queue.drain_due(now),
        };

        let mut stats = ServiceStats::default();
        for record in due {
            stats += self.deliver(&record, dir, sink);
        }
        if stats != ServiceStats::default() {
            tracing::debug!(
                tick = self.tick,
                %now,
                delivered = stats.delivered,
                dropped = stats.dropped,
                pending = self.queue.len(),
                "serviced event queue"
            );
        }
        stats
    }

    fn deliver<D, S>(&mut self, record: &EventRecord, dir: &D, sink: &mut S) -> ServiceStats
    where
        D: EntityDirectory + NameResolver,
        S: InputSink,
    {
        let mut stats = ServiceStats::default();
        match record.target() {
            Target::Entity(handle) => {
                if dir.is_alive(*handle) {
                    sink.accept_input(Delivery::new(*handle, record), &mut self.queue);
                    stats.delivered += 1;
                } else {
                    tracing::debug!(id = %record.id(), target = %handle, "target no longer exists");
                    stats.dropped += 1;
                }
            }
            Target::Name(name) => {
                let targets = dir.find_by_name(name);
                if targets.is_empty() {
                    tracing::warn!(
                        id = %record.id(),
                        target = %name,
                        input = %record.input(),
                        "unhandled input: no entity matches target"
                    );
                    stats.dropped += 1;
                }
                for handle in targets {
                    sink.accept_input(Delivery::new(handle, record), &mut self.queue);
                    stats.delivered += 1;
                }
            }
        }
        stats
    }
}

/// One due event on its way to one resolved target.
#[derive(Debug, Clone, Copy, derive_new::new)]
pub struct Delivery<'a> {
    pub target: EntityHandle,
    pub event: &'a EventRecord,
}

/// Receives the inputs of due events.
///
/// The queue is handed back so an input can fire outputs of its own.
pub trait InputSink {
    fn accept_input(&mut self, delivery: Delivery<'_>, queue: &mut SimQueue);
}

#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, derive_more::Add, derive_more::AddAssign,
)]
pub struct ServiceStats {
    pub delivered: usize,
    pub dropped: usize,
}
