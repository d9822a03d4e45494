use std::{path::Path, rc::Rc};

use crate::{
    error::{Error, Result},
    simulation::Simulation,
    time::{Delta, SimClock, Time},
};

/// One frame at 66 ticks per second.
pub const DEFAULT_TICK_INTERVAL: Delta = Delta::new(0.015);

#[derive(Debug, Clone, typed_builder::TypedBuilder, serde::Serialize, serde::Deserialize)]
pub struct Config {
    #[builder(default, setter(into))]
    #[serde(default)]
    pub start_time: Time,
    #[builder(default = DEFAULT_TICK_INTERVAL, setter(into))]
    #[serde(default = "default_tick_interval")]
    pub tick_interval: Delta,
    // Due events beyond this stay queued for the next tick
    #[builder(default, setter(into, strip_option))]
    #[serde(default)]
    pub max_events_per_tick: Option<usize>,
}

fn default_tick_interval() -> Delta {
    DEFAULT_TICK_INTERVAL
}

impl Default for Config {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if !self.start_time.is_finite() {
            return Err(Error::InvalidConfig(format!(
                "start_time must be finite, got {}",
                self.start_time
            )));
        }
        if !(self.tick_interval.is_finite() && self.tick_interval > Delta::ZERO) {
            return Err(Error::InvalidConfig(format!(
                "tick_interval must be positive, got {}",
                self.tick_interval
            )));
        }
        if self.max_events_per_tick == Some(0) {
            return Err(Error::InvalidConfig(
                "max_events_per_tick must be at least 1".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Builds the clock, queue and host loop described by `cfg`.
pub fn build(cfg: Config) -> Result<Simulation> {
    cfg.validate()?;
    let sim = Simulation::builder()
        .clock(Rc::new(SimClock::at(cfg.start_time)))
        .tick_interval(cfg.tick_interval)
        .max_events_per_tick(cfg.max_events_per_tick)
        .build();
    tracing::debug!(?cfg, "simulation ready");
    Ok(sim)
}

pub fn read_config(path: impl AsRef<Path>) -> Result<Config> {
    let s = std::fs::read_to_string(path)?;
    parse_config(&s)
}

pub fn parse_config(s: &str) -> Result<Config> {
    let cfg: Config = serde_json::from_str(s)?;
    cfg.validate()?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use crate::variant::Variant;

    use super::*;

    #[test]
    fn defaults() -> anyhow::Result<()> {
        let cfg = parse_config("{}")?;
        assert_eq!(cfg.start_time, Time::ZERO);
        assert_eq!(cfg.tick_interval, DEFAULT_TICK_INTERVAL);
        assert_eq!(cfg.max_events_per_tick, None);
        Ok(())
    }

    #[test]
    fn parses_fields() -> anyhow::Result<()> {
        let cfg = parse_config(
            r#"{"start_time": 10.0, "tick_interval": 0.5, "max_events_per_tick": 64}"#,
        )?;
        assert_eq!(cfg.start_time, Time::new(10.0));
        assert_eq!(cfg.tick_interval, Delta::new(0.5));
        assert_eq!(cfg.max_events_per_tick, Some(64));
        let mut sim = build(cfg)?;
        assert_eq!(sim.now(), Time::new(10.0));
        // Fire times are taken from the same clock the loop advances
        sim.queue_mut()
            .add_event_by_name("door1", "Open", Variant::Void, 0.25, None, None)?;
        assert_eq!(sim.queue().next_fire_time(), Some(Time::new(10.25)));
        Ok(())
    }

    #[test]
    fn rejects_bad_values() {
        for bad in [
            r#"{"tick_interval": 0.0}"#,
            r#"{"tick_interval": -1.0}"#,
            r#"{"max_events_per_tick": 0}"#,
        ] {
            assert!(matches!(parse_config(bad), Err(Error::InvalidConfig(_))));
        }
        assert!(matches!(parse_config("not json"), Err(Error::Serde(_))));
        let cfg = Config::builder().tick_interval(0.0).build();
        assert!(build(cfg).is_err());
    }

    #[test]
    fn missing_file() {
        assert!(matches!(
            read_config("/definitely/not/here.json"),
            Err(Error::Io(_))
        ));
    }
}
