use std::collections::TryReserveError;

use super::event::EventRecord;

/// Pending events as a doubly linked list sorted by fire time, stored in an arena.
///
/// Links are slot indices rather than pointers. Freed slots are recycled through a freelist, so
/// unlinking from a known slot is O(1) and the arena never shrinks while the queue is live.
#[derive(Debug, Default)]
pub(crate) struct Schedule {
    nodes: Vec<Node>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

#[derive(Debug)]
struct Node {
    record: Option<EventRecord>,
    prev: Option<usize>,
    next: Option<usize>,
}

impl Schedule {
    /// Inserts after every record whose fire time is not later than the new one, so records with
    /// equal fire times keep their insertion order.
    pub(crate) fn try_insert(&mut self, record: EventRecord) -> Result<usize, TryReserveError> {
        // Reserve up front so a failed allocation leaves the list untouched
        if self.free.is_empty() {
            self.nodes.try_reserve(1)?;
        }

        // New events usually fire after everything already queued, so scan from the back
        let mut prev = self.tail;
        while let Some(idx) = prev {
            if self.record(idx).fire_time <= record.fire_time {
                break;
            }
            prev = self.nodes[idx].prev;
        }
        let next = match prev {
            Some(idx) => self.nodes[idx].next,
            None => self.head,
        };

        let node = Node {
            record: Some(record),
            prev,
            next,
        };
        let slot = match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = node;
                slot
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        };

        match prev {
            Some(idx) => self.nodes[idx].next = Some(slot),
            None => self.head = Some(slot),
        }
        match next {
            Some(idx) => self.nodes[idx].prev = Some(slot),
            None => self.tail = Some(slot),
        }
        self.len += 1;
        Ok(slot)
    }

    /// Unlinks the record in `slot`, restoring both neighbors' links, and hands it back.
    pub(crate) fn unlink(&mut self, slot: usize) -> Option<EventRecord> {
        let node = self.nodes.get_mut(slot)?;
        let record = node.record.take()?;
        let (prev, next) = (node.prev.take(), node.next.take());
        match prev {
            Some(idx) => self.nodes[idx].next = next,
            None => self.head = next,
        }
        match next {
            Some(idx) => self.nodes[idx].prev = prev,
            None => self.tail = prev,
        }
        self.free.push(slot);
        self.len -= 1;
        Some(record)
    }

    pub(crate) fn front(&self) -> Option<&EventRecord> {
        self.head.map(|idx| self.record(idx))
    }

    pub(crate) fn pop_front(&mut self) -> Option<EventRecord> {
        self.head.and_then(|idx| self.unlink(idx))
    }

    /// Walks the whole list once, unlinking and dropping every record `pred` selects.
    pub(crate) fn remove_where(&mut self, mut pred: impl FnMut(&EventRecord) -> bool) -> usize {
        let mut removed = 0;
        let mut cur = self.head;
        while let Some(idx) = cur {
            // Save the successor before unlinking
            cur = self.nodes[idx].next;
            if pred(self.record(idx)) {
                let record = self.unlink(idx);
                tracing::trace!(id = ?record.as_ref().map(|r| r.id), "event cancelled");
                removed += 1;
            }
        }
        removed
    }

    /// Drops every record. Returns how many there were.
    pub(crate) fn clear(&mut self) -> usize {
        let purged = self.len;
        self.nodes.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
        self.len = 0;
        purged
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) fn iter(&self) -> Iter<'_> {
        Iter {
            schedule: self,
            cur: self.head,
        }
    }

    fn record(&self, idx: usize) -> &EventRecord {
        // Linked slots are always occupied
        match &self.nodes[idx].record {
            Some(record) => record,
            None => unreachable!("slot {idx} is linked but vacant"),
        }
    }
}

pub struct Iter<'a> {
    schedule: &'a Schedule,
    cur: Option<usize>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a EventRecord;

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.cur?;
        self.cur = self.schedule.nodes[idx].next;
        Some(self.schedule.record(idx))
    }
}
