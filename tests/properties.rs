use ioqueue::{EntityRegistry, EventQueue, SimClock, Time, Variant};
use proptest::prelude::*;

// Delays on a coarse grid so equal fire times are common
fn delays() -> impl Strategy<Value = Vec<i32>> {
    prop::collection::vec(-4i32..16, 0..64)
}

fn queue_with<'a>(clock: &'a SimClock, delays: &[i32]) -> EventQueue<&'a SimClock> {
    let mut queue = EventQueue::new(clock);
    for (i, &d) in delays.iter().enumerate() {
        queue
            .add_event_by_name("t", &format!("in{i}"), Variant::Void, f64::from(d) * 0.25, None, None)
            .unwrap();
    }
    queue
}

proptest! {
    /// Pending events are always sorted, with ties in insertion order.
    #[test]
    fn prop_sorted_and_stable(delays in delays()) {
        let clock = SimClock::new();
        let queue = queue_with(&clock, &delays);
        let keys: Vec<_> = queue.iter().map(|r| (r.fire_time(), r.id())).collect();
        prop_assert_eq!(keys.len(), delays.len());
        for w in keys.windows(2) {
            prop_assert!(w[0].0 < w[1].0 || (w[0].0 == w[1].0 && w[0].1 < w[1].1));
        }
    }

    /// Draining yields exactly the due prefix and leaves the rest sorted.
    #[test]
    fn prop_drain_prefix(delays in delays(), now in -2i32..20) {
        let clock = SimClock::new();
        let mut queue = queue_with(&clock, &delays);
        let now = Time::new(f64::from(now) * 0.25);
        let before: Vec<_> = queue.iter().map(|r| r.id()).collect();
        let due = queue.drain_due(now);
        let split = due.len();

        prop_assert!(due.iter().all(|r| r.fire_time() <= now));
        prop_assert!(queue.iter().all(|r| r.fire_time() > now));
        let drained: Vec<_> = due.iter().map(|r| r.id()).collect();
        let rest: Vec<_> = queue.iter().map(|r| r.id()).collect();
        prop_assert_eq!(&before[..split], &drained[..]);
        prop_assert_eq!(&before[split..], &rest[..]);
    }

    /// Cancelling by caller removes exactly that caller's events.
    #[test]
    fn prop_cancel_by_caller(callers in prop::collection::vec(0usize..3, 0..48)) {
        let mut reg = EntityRegistry::new();
        let ents = [
            reg.spawn("relay", "logic_relay"),
            reg.spawn("relay", "logic_relay"),
            reg.spawn("timer", "logic_timer"),
        ];
        let clock = SimClock::new();
        let mut queue = EventQueue::new(&clock);
        for (i, &c) in callers.iter().enumerate() {
            queue
                .add_event_by_name("t", "In", Variant::Void, i as f64, None, Some(ents[c]))
                .unwrap();
        }
        let removed = queue.cancel_events(&reg, Some(ents[0]));
        prop_assert_eq!(removed, callers.iter().filter(|&&c| c == 0).count());
        prop_assert!(queue.iter().all(|r| r.caller() != Some(ents[0])));
        prop_assert_eq!(queue.len(), callers.len() - removed);
    }
}
