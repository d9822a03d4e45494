use smallvec::SmallVec;

pub mod registry;

/// A weak, generation-checked reference to a game entity.
///
/// The handle never keeps its entity alive. Once the entity is removed, or its slot is
/// reused by a newer entity with a different serial, the handle simply stops resolving.
#[derive(
    Debug,
    Default,
    Copy,
    Clone,
    PartialOrd,
    Ord,
    PartialEq,
    Eq,
    Hash,
    derive_more::Display,
    derive_new::new,
    serde::Serialize,
    serde::Deserialize,
)]
#[display(fmt = "#{}:{}", index, serial)]
pub struct EntityHandle {
    index: u32,
    serial: u32,
}

impl EntityHandle {
    pub const fn index(&self) -> u32 {
        self.index
    }

    pub const fn serial(&self) -> u32 {
        self.serial
    }
}

/// The identity of a live entity, as seen by name matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_new::new)]
pub struct EntityInfo<'a> {
    pub name: &'a str,
    pub classname: &'a str,
}

impl EntityInfo<'_> {
    /// Same name and classname, ignoring ASCII case.
    pub fn same_identity(&self, other: &EntityInfo<'_>) -> bool {
        self.name.eq_ignore_ascii_case(other.name)
            && self.classname.eq_ignore_ascii_case(other.classname)
    }
}

/// Resolves entity handles to live entities.
pub trait EntityDirectory {
    /// Returns `None` when the handle no longer refers to a live entity.
    fn resolve(&self, handle: EntityHandle) -> Option<EntityInfo<'_>>;

    fn is_alive(&self, handle: EntityHandle) -> bool {
        self.resolve(handle).is_some()
    }
}

impl<D: EntityDirectory + ?Sized> EntityDirectory for &D {
    fn resolve(&self, handle: EntityHandle) -> Option<EntityInfo<'_>> {
        (**self).resolve(handle)
    }
}

// Most names select a single entity
pub type HandleList = SmallVec<[EntityHandle; 4]>;

/// Reverse lookup from a target name to live entities, needed only when delivering by-name
/// events.
pub trait NameResolver {
    fn find_by_name(&self, target: &str) -> HandleList;
}

impl<R: NameResolver + ?Sized> NameResolver for &R {
    fn find_by_name(&self, target: &str) -> HandleList {
        (**self).find_by_name(target)
    }
}
