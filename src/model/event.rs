//! An event recorded as pins are claimed, driven, and released
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::gpio::bank::Level;

/// The kind of pin event being recorded
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
pub enum PinEventKind {
    Claimed,
    LevelChanged,
    Released,
}

impl fmt::Display for PinEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// One observable side effect on a GPIO line. The simulated bank journals
/// these so tests can count level changes and releases instead of watching
/// real voltages.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct PinEvent {
    /// The event type
    kind: PinEventKind,
    /// The BCM line the event happened on
    pin: u8,
    /// The driven level, only present for LevelChanged
    level: Option<Level>,
    /// Timestamp of event creation
    #[serde(skip_deserializing)]
    timestamp: u32,
}

impl PinEvent {
    pub fn new(kind: PinEventKind, pin: u8, level: Option<Level>) -> Self {
        let timestamp: u32 = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as u32;
        Self {
            kind,
            pin,
            level,
            timestamp,
        }
    }

    pub fn claimed(pin: u8) -> Self {
        Self::new(PinEventKind::Claimed, pin, None)
    }

    pub fn level_changed(pin: u8, level: Level) -> Self {
        Self::new(PinEventKind::LevelChanged, pin, Some(level))
    }

    pub fn released(pin: u8) -> Self {
        Self::new(PinEventKind::Released, pin, None)
    }

    pub fn kind(&self) -> PinEventKind {
        self.kind
    }

    pub fn pin(&self) -> u8 {
        self.pin
    }

    pub fn level(&self) -> Option<Level> {
        self.level
    }

    pub fn timestamp(&self) -> u32 {
        self.timestamp
    }

    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for PinEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t", Utc::now().format("%Y-%m-%d %H:%M:%S"))?;
        match self.level {
            Some(level) => write!(f, "Pin{}({}: {})", self.pin, self.kind, level),
            None => write!(f, "Pin{}({})", self.pin, self.kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_changed_event() {
        let event = PinEvent::level_changed(18, Level::High);
        assert_eq!(event.kind(), PinEventKind::LevelChanged);
        assert_eq!(event.pin(), 18);
        assert_eq!(event.level(), Some(Level::High));
    }

    #[test]
    fn test_event_to_json() {
        let event = PinEvent::released(25);
        let json = event.to_json().unwrap();
        assert!(json.contains("Released"));
        assert!(json.contains("25"));
    }

    #[test]
    fn test_event_display() {
        let event = PinEvent::level_changed(24, Level::Low);
        let out = format!("{}", event);
        assert!(out.contains("Pin24"));
        assert!(out.contains("LevelChanged"));
        assert!(out.contains("Low"));
    }
}
