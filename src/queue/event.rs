use std::collections::TryReserveError;

use smallvec::SmallVec;

use crate::{
    entities::EntityHandle,
    ident::EventId,
    time::{Delta, Time},
    variant::Variant,
};

// Most ticks will not drain very many events
pub type EventList = SmallVec<[EventRecord; 4]>;

/// Where an event is delivered.
///
/// A by-name target is resolved when the event fires, so it may reach zero, one or many
/// entities. A by-entity target reaches at most the one entity, if it is still alive.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Target<S = String> {
    Name(S),
    Entity(EntityHandle),
}

impl<S: AsRef<str>> Target<S> {
    pub fn name(&self) -> Option<&str> {
        match self {
            Target::Name(name) => Some(name.as_ref()),
            Target::Entity(_) => None,
        }
    }

    pub fn entity(&self) -> Option<EntityHandle> {
        match self {
            Target::Name(_) => None,
            Target::Entity(handle) => Some(*handle),
        }
    }
}

impl<'a> From<&'a str> for Target<&'a str> {
    fn from(name: &'a str) -> Self {
        Target::Name(name)
    }
}

impl<S> From<EntityHandle> for Target<S> {
    fn from(handle: EntityHandle) -> Self {
        Target::Entity(handle)
    }
}

/// A request to schedule an event. Strings are borrowed; the queue makes its own copies.
#[derive(Debug, Clone, typed_builder::TypedBuilder)]
pub struct EventDesc<'a> {
    #[builder(setter(into))]
    pub target: Target<&'a str>,
    pub input: &'a str,
    #[builder(default, setter(into))]
    pub value: Variant,
    #[builder(default, setter(into))]
    pub delay: Delta,
    #[builder(default, setter(into))]
    pub activator: Option<EntityHandle>,
    #[builder(default, setter(into))]
    pub caller: Option<EntityHandle>,
    #[builder(default)]
    pub output_id: i32,
}

/// A pending event. Immutable once queued.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct EventRecord {
    pub(crate) id: EventId,
    pub(crate) fire_time: Time,
    pub(crate) target: Target,
    pub(crate) input: String,
    pub(crate) value: Variant,
    pub(crate) activator: Option<EntityHandle>,
    pub(crate) caller: Option<EntityHandle>,
    pub(crate) output_id: i32,
}

impl EventRecord {
    /// Builds a record that owns copies of every borrowed string in `desc`.
    pub(crate) fn try_new(
        id: EventId,
        fire_time: Time,
        desc: EventDesc<'_>,
    ) -> Result<Self, TryReserveError> {
        let target = match desc.target {
            Target::Name(name) => Target::Name(dup(name)?),
            Target::Entity(handle) => Target::Entity(handle),
        };
        Ok(Self {
            id,
            fire_time,
            target,
            input: dup(desc.input)?,
            value: desc.value,
            activator: desc.activator,
            caller: desc.caller,
            output_id: desc.output_id,
        })
    }

    pub fn id(&self) -> EventId {
        self.id
    }

    pub fn fire_time(&self) -> Time {
        self.fire_time
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn value(&self) -> &Variant {
        &self.value
    }

    pub fn activator(&self) -> Option<EntityHandle> {
        self.activator
    }

    pub fn caller(&self) -> Option<EntityHandle> {
        self.caller
    }

    pub fn output_id(&self) -> i32 {
        self.output_id
    }
}

fn dup(s: &str) -> Result<String, TryReserveError> {
    let mut owned = String::new();
    owned.try_reserve_exact(s.len())?;
    owned.push_str(s);
    Ok(owned)
}
