use std::{
    cell::Cell,
    ops::{Add, AddAssign, Sub},
    rc::Rc,
};

use crate::error::{Error, Result};

macro_rules! time_unit {
    ($name: ident) => {
        #[derive(
            Debug,
            Default,
            Copy,
            Clone,
            PartialOrd,
            PartialEq,
            derive_more::Display,
            derive_more::From,
            serde::Serialize,
            serde::Deserialize,
        )]
        pub struct $name(f64);

        impl $name {
            pub const ZERO: $name = Self::new(0.0);
            pub const ONE: $name = Self::new(1.0);
            pub const MAX: $name = Self::new(f64::MAX);

            pub const fn new(secs: f64) -> Self {
                Self(secs)
            }

            pub const fn into_secs(self) -> f64 {
                self.0
            }

            pub fn is_finite(self) -> bool {
                self.0.is_finite()
            }
        }
    };
}

time_unit!(Time);
time_unit!(Delta);

impl Add<Delta> for Time {
    type Output = Time;

    fn add(self, rhs: Delta) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign<Delta> for Time {
    fn add_assign(&mut self, rhs: Delta) {
        *self = Self(self.0 + rhs.0)
    }
}

impl Sub<Time> for Time {
    type Output = Delta;

    fn sub(self, rhs: Time) -> Self::Output {
        Delta::new(self.0 - rhs.0)
    }
}

impl Add<Delta> for Delta {
    type Output = Delta;

    fn add(self, rhs: Delta) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

/// A source of the current simulation time.
///
/// The queue never reads a global clock; whoever builds it hands it one of these.
pub trait Clock {
    fn now(&self) -> Time;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Time {
        (**self).now()
    }
}

impl<C: Clock + ?Sized> Clock for Rc<C> {
    fn now(&self) -> Time {
        (**self).now()
    }
}

/// A manually advanced simulation clock.
///
/// Time only moves when told to, and never backwards. Interior mutability lets the host loop
/// advance a clock that the queue also holds a handle to.
#[derive(Debug, Default, Clone)]
pub struct SimClock {
    now: Cell<Time>,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(now: Time) -> Self {
        Self {
            now: Cell::new(now),
        }
    }

    pub fn advance_by(&self, delta: Delta) -> Result<Time> {
        self.advance_to(self.now() + delta)
    }

    pub fn advance_to(&self, target: Time) -> Result<Time> {
        let now = self.now();
        if !target.is_finite() || target < now {
            return Err(Error::TimeWentBackwards { now, target });
        }
        self.now.set(target);
        Ok(target)
    }
}

impl Clock for SimClock {
    fn now(&self) -> Time {
        self.now.get()
    }
}
