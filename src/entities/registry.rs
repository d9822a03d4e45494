use rustc_hash::FxHashMap;

use crate::pattern::Pattern;

use super::{EntityDirectory, EntityHandle, EntityInfo, HandleList, NameResolver};

/// An in-memory entity directory with serial-checked slots.
///
/// Removing an entity frees its slot for reuse; the serial is bumped on every reuse so stale
/// handles to the old occupant stop resolving.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    slots: Vec<Slot>,
    free: Vec<u32>,
    // Keyed by lowercase name / classname
    by_name: FxHashMap<String, HandleList>,
    by_class: FxHashMap<String, HandleList>,
}

#[derive(Debug, Default)]
struct Slot {
    serial: u32,
    entity: Option<Entity>,
}

#[derive(Debug)]
struct Entity {
    name: String,
    classname: String,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, name: impl Into<String>, classname: impl Into<String>) -> EntityHandle {
        let entity = Entity {
            name: name.into(),
            classname: classname.into(),
        };
        let handle = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.serial = slot.serial.wrapping_add(1);
                slot.entity = Some(entity);
                EntityHandle::new(index, slot.serial)
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    serial: 0,
                    entity: Some(entity),
                });
                EntityHandle::new(index, 0)
            }
        };
        self.index(handle);
        tracing::trace!(%handle, "entity spawned");
        handle
    }

    /// Returns `false` if the handle was already stale.
    pub fn despawn(&mut self, handle: EntityHandle) -> bool {
        if self.get(handle).is_none() {
            return false;
        }
        self.unindex(handle);
        self.slots[handle.index() as usize].entity = None;
        self.free.push(handle.index());
        tracing::trace!(%handle, "entity removed");
        true
    }

    pub fn rename(&mut self, handle: EntityHandle, name: impl Into<String>) -> bool {
        if self.get(handle).is_none() {
            return false;
        }
        self.unindex(handle);
        if let Some(entity) = self.slots[handle.index() as usize].entity.as_mut() {
            entity.name = name.into();
        }
        self.index(handle);
        true
    }

    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, handle: EntityHandle) -> Option<&Entity> {
        self.slots
            .get(handle.index() as usize)
            .filter(|slot| slot.serial == handle.serial())
            .and_then(|slot| slot.entity.as_ref())
    }

    fn keys(&self, handle: EntityHandle) -> Option<(String, String)> {
        self.get(handle)
            .map(|e| (e.name.to_ascii_lowercase(), e.classname.to_ascii_lowercase()))
    }

    fn index(&mut self, handle: EntityHandle) {
        if let Some((name, class)) = self.keys(handle) {
            self.by_name.entry(name).or_default().push(handle);
            self.by_class.entry(class).or_default().push(handle);
        }
    }

    fn unindex(&mut self, handle: EntityHandle) {
        if let Some((name, class)) = self.keys(handle) {
            for (map, key) in [(&mut self.by_name, name), (&mut self.by_class, class)] {
                if let Some(list) = map.get_mut(&key) {
                    list.retain(|h| *h != handle);
                    if list.is_empty() {
                        map.remove(&key);
                    }
                }
            }
        }
    }

    fn live(&self) -> impl Iterator<Item = (EntityHandle, &Entity)> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            slot.entity
                .as_ref()
                .map(|e| (EntityHandle::new(i as u32, slot.serial), e))
        })
    }
}

impl EntityDirectory for EntityRegistry {
    fn resolve(&self, handle: EntityHandle) -> Option<EntityInfo<'_>> {
        self.get(handle)
            .map(|e| EntityInfo::new(&e.name, &e.classname))
    }
}

impl NameResolver for EntityRegistry {
    fn find_by_name(&self, target: &str) -> HandleList {
        match Pattern::parse(target) {
            p @ Pattern::Prefix(_) => self
                .live()
                .filter(|(_, e)| p.matches(&e.name))
                .map(|(h, _)| h)
                .collect(),
            Pattern::Exact(name) => {
                let key = name.to_ascii_lowercase();
                let mut found = HandleList::new();
                for map in [&self.by_name, &self.by_class] {
                    for &h in map.get(&key).into_iter().flatten() {
                        if !found.contains(&h) {
                            found.push(h);
                        }
                    }
                }
                // Slot order, regardless of which index matched
                found.sort_unstable();
                found
            }
        }
    }
}
