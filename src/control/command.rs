use anyhow::{anyhow, Result};
use serde::Serialize;
use std::fmt;

use super::offset::Offset;

/// Directional command emitted once per cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Command {
    Left,
    Right,
    Center,
    /// No qualifying target this cycle. Not an emergency halt.
    Stop,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Left => "LEFT",
            Command::Right => "RIGHT",
            Command::Center => "CENTER",
            Command::Stop => "STOP",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Half-width of the CENTER band in pixels. Always positive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Deadband(u32);

impl Deadband {
    pub const DEFAULT_PX: u32 = 50;

    pub fn new(pixels: u32) -> Result<Self> {
        if pixels == 0 {
            return Err(anyhow!("deadband must be a positive number of pixels"));
        }
        if pixels > i32::MAX as u32 {
            return Err(anyhow!("deadband {} exceeds the pixel range", pixels));
        }
        Ok(Self(pixels))
    }

    pub fn pixels(&self) -> u32 {
        self.0
    }
}

impl Default for Deadband {
    fn default() -> Self {
        Self(Self::DEFAULT_PX)
    }
}

/// Map this cycle's offset (or its absence) to a command.
///
/// `dx == ±deadband` stays CENTER; only strictly larger offsets steer.
pub fn decide(offset: Option<&Offset>, deadband: Deadband) -> Command {
    let Some(offset) = offset else {
        return Command::Stop;
    };
    let band = deadband.pixels() as i32;
    if offset.dx < -band {
        Command::Left
    } else if offset.dx > band {
        Command::Right
    } else {
        Command::Center
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::offset::Point;

    fn offset(dx: i32) -> Offset {
        Offset {
            dx,
            dy: 0,
            target_center: Point { x: 320 + dx, y: 240 },
            frame_center: Point { x: 320, y: 240 },
        }
    }

    #[test]
    fn absent_target_is_stop() {
        assert_eq!(decide(None, Deadband::default()), Command::Stop);
    }

    #[test]
    fn band_edges_are_center() {
        let band = Deadband::new(50).unwrap();
        assert_eq!(decide(Some(&offset(50)), band), Command::Center);
        assert_eq!(decide(Some(&offset(-50)), band), Command::Center);
        assert_eq!(decide(Some(&offset(0)), band), Command::Center);
        assert_eq!(decide(Some(&offset(51)), band), Command::Right);
        assert_eq!(decide(Some(&offset(-51)), band), Command::Left);
        assert_eq!(decide(Some(&offset(-195)), band), Command::Left);
    }

    #[test]
    fn decision_is_repeatable() {
        let band = Deadband::default();
        let o = offset(73);
        let first = decide(Some(&o), band);
        for _ in 0..10 {
            assert_eq!(decide(Some(&o), band), first);
        }
    }

    #[test]
    fn deadband_must_be_positive() {
        assert!(Deadband::new(0).is_err());
        assert_eq!(Deadband::new(1).unwrap().pixels(), 1);
        assert_eq!(Deadband::default().pixels(), 50);
    }

    #[test]
    fn wire_names_are_uppercase() {
        assert_eq!(Command::Center.to_string(), "CENTER");
        assert_eq!(serde_json::to_string(&Command::Stop).unwrap(), "\"STOP\"");
    }
}
