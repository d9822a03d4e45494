use std::rc::Rc;

use crate::entities::EntityHandle;

/// An RGBA color.
#[derive(
    Debug,
    Default,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    derive_new::new,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct Color32 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// The typed argument carried by an event to its target input.
#[derive(
    Debug,
    Clone,
    PartialEq,
    derivative::Derivative,
    derive_more::From,
    serde::Serialize,
    serde::Deserialize,
)]
#[derivative(Default)]
pub enum Variant {
    #[derivative(Default)]
    #[from(ignore)]
    Void,
    Bool(bool),
    Int(i32),
    Float(f32),
    Vector([f32; 3]),
    Color(Color32),
    String(Rc<str>),
    Entity(EntityHandle),
}

impl Variant {
    pub fn is_void(&self) -> bool {
        matches!(self, Variant::Void)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Variant::String(s) => Some(s.as_ref()),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<EntityHandle> {
        match self {
            Variant::Entity(h) => Some(*h),
            _ => None,
        }
    }
}

impl From<&str> for Variant {
    fn from(s: &str) -> Self {
        Variant::String(Rc::from(s))
    }
}

impl From<String> for Variant {
    fn from(s: String) -> Self {
        Variant::String(Rc::from(s))
    }
}
