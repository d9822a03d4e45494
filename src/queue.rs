//! The deferred entity I/O event queue.
//!
//! Events are posted with a delay relative to the current simulation time and held, sorted by
//! fire time, until the host drains them. Events sharing a fire time drain in the order they
//! were added.

pub mod event;
mod schedule;

use crate::{
    entities::{EntityDirectory, EntityHandle},
    error::{Error, Result},
    ident::EventId,
    pattern::{self, Pattern},
    time::{Clock, Delta, Time},
    variant::Variant,
};

use self::{
    event::{EventDesc, EventList, EventRecord, Target},
    schedule::Schedule,
};

#[derive(Debug)]
pub struct EventQueue<C: Clock> {
    clock: C,
    schedule: Schedule,
    next_id: EventId,
}

impl<C: Clock> EventQueue<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            schedule: Schedule::default(),
            next_id: EventId::ZERO,
        }
    }

    delegate::delegate! {
        to self.schedule {
            /// Number of pending events.
            pub fn len(&self) -> usize;
            pub fn is_empty(&self) -> bool;
        }
    }

    /// Pending events, earliest first.
    pub fn iter(&self) -> impl Iterator<Item = &EventRecord> + '_ {
        self.schedule.iter()
    }

    pub fn next_fire_time(&self) -> Option<Time> {
        self.schedule.front().map(|r| r.fire_time)
    }

    /// Schedules an event to fire `desc.delay` after the current time.
    ///
    /// A zero or negative delay means the next drain, never inline delivery. On error nothing is
    /// queued.
    pub fn add_event(&mut self, desc: EventDesc<'_>) -> Result<EventId> {
        if !desc.delay.is_finite() {
            return Err(Error::InvalidDelay(desc.delay.into_secs()));
        }
        let fire_time = self.clock.now() + desc.delay;
        let id = self.next_id;
        let record = EventRecord::try_new(id, fire_time, desc)?;
        tracing::trace!(
            %id,
            %fire_time,
            target = ?record.target,
            input = %record.input,
            "event queued"
        );
        self.schedule.try_insert(record)?;
        self.next_id = id.next();
        Ok(id)
    }

    /// Schedules an event for every entity matching `target` at fire time.
    pub fn add_event_by_name(
        &mut self,
        target: &str,
        input: &str,
        value: impl Into<Variant>,
        delay: impl Into<Delta>,
        activator: Option<EntityHandle>,
        caller: Option<EntityHandle>,
    ) -> Result<EventId> {
        let desc = EventDesc::builder()
            .target(Target::Name(target))
            .input(input)
            .value(value)
            .delay(delay)
            .activator(activator)
            .caller(caller)
            .build();
        self.add_event(desc)
    }

    /// Schedules an event for one specific entity.
    pub fn add_event_to(
        &mut self,
        target: EntityHandle,
        input: &str,
        value: impl Into<Variant>,
        delay: impl Into<Delta>,
        activator: Option<EntityHandle>,
        caller: Option<EntityHandle>,
    ) -> Result<EventId> {
        let desc = EventDesc::builder()
            .target(target)
            .input(input)
            .value(value)
            .delay(delay)
            .activator(activator)
            .caller(caller)
            .build();
        self.add_event(desc)
    }

    /// Removes every pending event fired by `caller`.
    ///
    /// The stored caller must be the same handle and must still resolve to an entity with the
    /// same name and classname as `caller`. A dead or absent caller cancels nothing.
    pub fn cancel_events(
        &mut self,
        dir: &impl EntityDirectory,
        caller: Option<EntityHandle>,
    ) -> usize {
        let Some(caller) = caller else {
            return 0;
        };
        let Some(expected) = dir.resolve(caller) else {
            tracing::debug!(%caller, "cancel skipped: caller no longer exists");
            return 0;
        };
        let removed = self.schedule.remove_where(|r| {
            r.caller
                .filter(|&stored| stored == caller)
                .and_then(|stored| dir.resolve(stored))
                .is_some_and(|stored| stored.same_identity(&expected))
        });
        tracing::debug!(%caller, removed, "cancelled events by caller");
        removed
    }

    /// Removes every pending event aimed at `target` whose input matches `input`.
    ///
    /// `input` may be `None` or empty for any input, or end in `*` for a case-insensitive prefix.
    pub fn cancel_event_on(
        &mut self,
        dir: &impl EntityDirectory,
        target: Option<EntityHandle>,
        input: Option<&str>,
    ) -> usize {
        let Some(target) = target else {
            return 0;
        };
        let filter = TargetFilter::new(dir, target, input);
        let removed = self.schedule.remove_where(|r| filter.matches(r));
        tracing::debug!(%target, ?input, removed, "cancelled events on target");
        removed
    }

    /// Whether any pending event matches the same rule as [`EventQueue::cancel_event_on`].
    pub fn has_event_pending(
        &self,
        dir: &impl EntityDirectory,
        target: Option<EntityHandle>,
        input: Option<&str>,
    ) -> bool {
        let Some(target) = target else {
            return false;
        };
        let filter = TargetFilter::new(dir, target, input);
        self.schedule.iter().any(|r| filter.matches(r))
    }

    /// Pops the next event if it is due at `now`.
    pub fn pop_due(&mut self, now: Time) -> Option<EventRecord> {
        match self.schedule.front() {
            Some(front) if front.fire_time <= now => self.schedule.pop_front(),
            _ => None,
        }
    }

    /// Removes every event due at `now`, earliest first.
    ///
    /// The queue stays sorted, so the due events are exactly its leading run. Events added
    /// while the caller delivers these wait for the next drain.
    pub fn drain_due(&mut self, now: Time) -> EventList {
        let mut due = EventList::new();
        while let Some(record) = self.pop_due(now) {
            tracing::trace!(id = %record.id, fire_time = %record.fire_time, "event due");
            due.push(record);
        }
        due
    }

    /// Drops every pending event. Returns how many were purged.
    pub fn clear(&mut self) -> usize {
        let purged = self.schedule.clear();
        if purged > 0 {
            tracing::debug!(purged, "event queue purged");
        }
        purged
    }
}

impl<C: Clock> Drop for EventQueue<C> {
    fn drop(&mut self) {
        self.clear();
    }
}

/// The target/input predicate shared by cancellation and pending queries.
struct TargetFilter<'a> {
    target: EntityHandle,
    // `None` once the target entity is gone; only by-handle matches remain possible then
    identity: Option<(&'a str, &'a str)>,
    input: Option<Pattern<'a>>,
}

impl<'a> TargetFilter<'a> {
    fn new<D: EntityDirectory>(dir: &'a D, target: EntityHandle, input: Option<&'a str>) -> Self {
        Self {
            target,
            identity: dir.resolve(target).map(|info| (info.name, info.classname)),
            input: input.map(Pattern::parse),
        }
    }

    fn matches(&self, record: &EventRecord) -> bool {
        let aimed = match &record.target {
            Target::Entity(handle) => *handle == self.target,
            Target::Name(stored) => self
                .identity
                .is_some_and(|(name, classname)| pattern::target_matches(stored, name, classname)),
        };
        aimed && pattern::input_matches(self.input.as_ref(), &record.input)
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use crate::{entities::registry::EntityRegistry, time::SimClock};

    use super::*;

    fn inputs<C: Clock>(queue: &EventQueue<C>) -> Vec<&str> {
        queue.iter().map(|r| r.input()).collect()
    }

    #[test]
    fn fire_time_is_now_plus_delay() -> anyhow::Result<()> {
        let clock = SimClock::at(Time::new(10.0));
        let mut queue = EventQueue::new(&clock);
        queue.add_event_by_name("door1", "Close", Variant::Void, 2.0, None, None)?;
        queue.add_event_by_name("door1", "Lock", Variant::Void, -1.0, None, None)?;
        assert_eq!(queue.next_fire_time(), Some(Time::new(9.0)));
        let times: Vec<_> = queue.iter().map(|r| r.fire_time()).collect();
        assert_eq!(times, vec![Time::new(9.0), Time::new(12.0)]);
        Ok(())
    }

    #[test]
    fn rejects_non_finite_delay() {
        let clock = SimClock::new();
        let mut queue = EventQueue::new(&clock);
        let res = queue.add_event_by_name("a", "In", Variant::Void, f64::NAN, None, None);
        assert!(matches!(res, Err(Error::InvalidDelay(_))));
        let res = queue.add_event_by_name("a", "In", Variant::Void, f64::INFINITY, None, None);
        assert!(matches!(res, Err(Error::InvalidDelay(_))));
        assert!(queue.is_empty());
    }

    #[test]
    fn ids_follow_insertion() -> anyhow::Result<()> {
        let clock = SimClock::new();
        let mut queue = EventQueue::new(&clock);
        let a = queue.add_event_by_name("a", "In", Variant::Void, 1.0, None, None)?;
        let b = queue.add_event_by_name("b", "In", Variant::Void, 0.0, None, None)?;
        assert!(a < b);
        Ok(())
    }

    #[test]
    fn drain_stops_at_first_future_event() -> anyhow::Result<()> {
        let clock = SimClock::new();
        let mut queue = EventQueue::new(&clock);
        for (input, delay) in [("A", 1.0), ("B", 2.0), ("C", 2.0), ("D", 3.0)] {
            queue.add_event_by_name("t", input, Variant::Void, delay, None, None)?;
        }
        assert!(queue.drain_due(Time::new(0.5)).is_empty());
        let due = queue.drain_due(Time::new(2.0));
        let drained: Vec<_> = due.iter().map(|r| r.input()).collect();
        assert_eq!(drained, vec!["A", "B", "C"]);
        assert_eq!(inputs(&queue), vec!["D"]);
        Ok(())
    }

    #[test]
    fn cancel_events_by_caller() -> anyhow::Result<()> {
        let mut reg = EntityRegistry::new();
        let relay = reg.spawn("relay", "logic_relay");
        let timer = reg.spawn("timer", "logic_timer");
        let clock = SimClock::new();
        let mut queue = EventQueue::new(&clock);
        queue.add_event_by_name("door1", "Open", Variant::Void, 1.0, None, Some(relay))?;
        queue.add_event_by_name("door1", "Close", Variant::Void, 2.0, None, Some(timer))?;
        queue.add_event_by_name("door2", "Open", Variant::Void, 3.0, Some(timer), Some(relay))?;
        queue.add_event_by_name("door2", "Close", Variant::Void, 4.0, Some(relay), None)?;

        assert_eq!(queue.cancel_events(&reg, None), 0);
        assert_eq!(queue.cancel_events(&reg, Some(relay)), 2);
        assert_eq!(inputs(&queue), vec!["Close", "Close"]);
        Ok(())
    }

    #[test]
    fn cancel_events_ignores_dead_caller() -> anyhow::Result<()> {
        let mut reg = EntityRegistry::new();
        let relay = reg.spawn("relay", "logic_relay");
        let clock = SimClock::new();
        let mut queue = EventQueue::new(&clock);
        queue.add_event_by_name("door1", "Open", Variant::Void, 1.0, None, Some(relay))?;
        reg.despawn(relay);
        // Whatever now lives in the recycled slot is a different caller
        let other = reg.spawn("relay", "logic_relay");
        assert_eq!(queue.cancel_events(&reg, Some(relay)), 0);
        assert_eq!(queue.cancel_events(&reg, Some(other)), 0);
        assert_eq!(queue.len(), 1);
        Ok(())
    }

    #[test]
    fn cancel_on_target_by_handle_and_name() -> anyhow::Result<()> {
        let mut reg = EntityRegistry::new();
        let door = reg.spawn("door1", "func_door");
        let clock = SimClock::new();
        let mut queue = EventQueue::new(&clock);
        queue.add_event_to(door, "Open", Variant::Void, 1.0, None, None)?;
        queue.add_event_by_name("DOOR1", "Close", Variant::Void, 2.0, None, None)?;
        queue.add_event_by_name("func_door", "Lock", Variant::Void, 3.0, None, None)?;
        queue.add_event_by_name("door2", "Open", Variant::Void, 4.0, None, None)?;

        assert_eq!(queue.cancel_event_on(&reg, None, None), 0);
        assert_eq!(queue.cancel_event_on(&reg, Some(door), None), 3);
        assert_eq!(inputs(&queue), vec!["Open"]);
        Ok(())
    }

    #[test]
    fn cancel_on_input_pattern() -> anyhow::Result<()> {
        let mut reg = EntityRegistry::new();
        let door = reg.spawn("door1", "func_door");
        let clock = SimClock::new();
        let mut queue = EventQueue::new(&clock);
        for input in ["Open", "OpenFast", "Close", "open"] {
            queue.add_event_to(door, input, Variant::Void, 1.0, None, None)?;
        }
        assert_eq!(queue.cancel_event_on(&reg, Some(door), Some("OPEN")), 2);
        assert_eq!(inputs(&queue), vec!["OpenFast", "Close"]);
        assert_eq!(queue.cancel_event_on(&reg, Some(door), Some("op*")), 1);
        assert_eq!(inputs(&queue), vec!["Close"]);
        assert_eq!(queue.cancel_event_on(&reg, Some(door), Some("")), 1);
        assert!(queue.is_empty());
        Ok(())
    }

    #[test]
    fn pending_query_is_read_only() -> anyhow::Result<()> {
        let mut reg = EntityRegistry::new();
        let door = reg.spawn("door1", "func_door");
        let lamp = reg.spawn("lamp", "light");
        let clock = SimClock::new();
        let mut queue = EventQueue::new(&clock);
        queue.add_event_by_name("door1", "OnTrigger", Variant::Void, 1.0, None, None)?;

        assert!(queue.has_event_pending(&reg, Some(door), None));
        assert!(queue.has_event_pending(&reg, Some(door), Some("OnTr*")));
        assert!(!queue.has_event_pending(&reg, Some(door), Some("OnUse")));
        assert!(!queue.has_event_pending(&reg, Some(lamp), None));
        assert!(!queue.has_event_pending(&reg, None, None));
        assert_eq!(queue.len(), 1);
        Ok(())
    }

    #[test]
    fn vanished_target_only_matches_by_handle() -> anyhow::Result<()> {
        let mut reg = EntityRegistry::new();
        let door = reg.spawn("door1", "func_door");
        let clock = SimClock::new();
        let mut queue = EventQueue::new(&clock);
        queue.add_event_to(door, "Open", Variant::Void, 1.0, None, None)?;
        queue.add_event_by_name("door1", "Close", Variant::Void, 1.0, None, None)?;
        reg.despawn(door);

        assert!(!queue.has_event_pending(&reg, Some(door), Some("Close")));
        assert_eq!(queue.cancel_event_on(&reg, Some(door), None), 1);
        assert_eq!(inputs(&queue), vec!["Close"]);
        Ok(())
    }

    #[test]
    fn clear_and_drop_purge() -> anyhow::Result<()> {
        let clock = SimClock::new();
        let mut queue = EventQueue::new(&clock);
        assert_eq!(queue.clear(), 0);
        for i in 0..5 {
            queue.add_event_by_name("t", "In", format!("{i}").as_str(), 1.0, None, None)?;
        }
        assert_eq!(queue.clear(), 5);
        assert!(queue.is_empty());
        queue.add_event_by_name("t", "In", Variant::Void, 1.0, None, None)?;
        drop(queue);
        Ok(())
    }

    #[test]
    fn payloads_released_exactly_once() -> anyhow::Result<()> {
        let clock = SimClock::new();
        let mut reg = EntityRegistry::new();
        let door = reg.spawn("door1", "func_door");
        let payload: Rc<str> = Rc::from("kill");
        let value = || Variant::String(Rc::clone(&payload));

        let mut queue = EventQueue::new(&clock);
        queue.add_event_to(door, "Open", value(), 0.0, None, None)?;
        queue.add_event_to(door, "Close", value(), 1.0, None, None)?;
        queue.add_event_by_name("t", "In", value(), 2.0, None, None)?;
        queue.add_event_by_name("t", "In", value(), 3.0, None, None)?;
        assert_eq!(Rc::strong_count(&payload), 5);

        // Drained events belong to the caller until it drops them
        let due = queue.drain_due(Time::ZERO);
        assert_eq!(due.len(), 1);
        assert_eq!(Rc::strong_count(&payload), 5);
        drop(due);
        assert_eq!(Rc::strong_count(&payload), 4);

        assert_eq!(queue.cancel_event_on(&reg, Some(door), Some("Close")), 1);
        assert_eq!(Rc::strong_count(&payload), 3);

        assert_eq!(queue.clear(), 2);
        assert_eq!(Rc::strong_count(&payload), 1);
        assert_eq!(queue.clear(), 0);
        assert_eq!(Rc::strong_count(&payload), 1);

        queue.add_event_by_name("t", "In", value(), 1.0, None, None)?;
        queue.add_event_by_name("t", "In", value(), 1.0, None, None)?;
        assert_eq!(Rc::strong_count(&payload), 3);
        drop(queue);
        assert_eq!(Rc::strong_count(&payload), 1);
        Ok(())
    }
}
