mod ident;

pub mod driver;
pub mod entities;
pub mod error;
pub mod pattern;
pub mod queue;
pub mod simulation;
pub mod time;
pub mod variant;

pub use driver::Config;
pub use entities::{registry::EntityRegistry, EntityDirectory, EntityHandle, EntityInfo};
pub use error::{Error, Result};
pub use ident::EventId;
pub use queue::{
    event::{EventDesc, EventList, EventRecord, Target},
    EventQueue,
};
pub use simulation::{Delivery, InputSink, ServiceStats, Simulation};
pub use time::{Clock, Delta, SimClock, Time};
pub use variant::{Color32, Variant};
