// src/watch/mask.rs

//! Named filesystem event kinds and the mask algebra over them.
//!
//! Configuration expresses interest in events as named kinds (`"create"`,
//! `"modify"`, ...) rather than backend-specific flags. A mask is a set of
//! kinds; masks combine with union (`|`), intersection (`&`) and complement
//! (`!`), and the effective watch mask is `include & !exclude`.

use std::fmt;
use std::ops::{BitAnd, BitOr, Not};

use serde::Deserialize;

/// A single named event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventClass {
    Create,
    Modify,
    Remove,
    Rename,
    Access,
    Open,
    Close,
    Metadata,
    Other,
}

impl EventClass {
    const ALL: [EventClass; 9] = [
        EventClass::Create,
        EventClass::Modify,
        EventClass::Remove,
        EventClass::Rename,
        EventClass::Access,
        EventClass::Open,
        EventClass::Close,
        EventClass::Metadata,
        EventClass::Other,
    ];

    fn bit(self) -> u16 {
        match self {
            EventClass::Create => 1 << 0,
            EventClass::Modify => 1 << 1,
            EventClass::Remove => 1 << 2,
            EventClass::Rename => 1 << 3,
            EventClass::Access => 1 << 4,
            EventClass::Open => 1 << 5,
            EventClass::Close => 1 << 6,
            EventClass::Metadata => 1 << 7,
            EventClass::Other => 1 << 8,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            EventClass::Create => "create",
            EventClass::Modify => "modify",
            EventClass::Remove => "remove",
            EventClass::Rename => "rename",
            EventClass::Access => "access",
            EventClass::Open => "open",
            EventClass::Close => "close",
            EventClass::Metadata => "metadata",
            EventClass::Other => "other",
        }
    }

    pub fn mask(self) -> EventMask {
        EventMask(self.bit())
    }
}

/// A set of event kinds.
///
/// Deserializes from a kind name (or `"all"`), so config files can write
/// `EVENTS_INCLUDE = "all"` or `EVENTS_EXCLUDE = ["access", "open"]`.
#[derive(Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct EventMask(u16);

const ALL_BITS: u16 = (1 << 9) - 1;

impl EventMask {
    pub const EMPTY: EventMask = EventMask(0);
    pub const ALL: EventMask = EventMask(ALL_BITS);

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, class: EventClass) -> bool {
        self.0 & class.bit() != 0
    }

    pub fn intersects(self, other: EventMask) -> bool {
        self.0 & other.0 != 0
    }

    pub fn union(self, other: EventMask) -> EventMask {
        EventMask(self.0 | other.0)
    }

    pub fn difference(self, other: EventMask) -> EventMask {
        EventMask(self.0 & !other.0 & ALL_BITS)
    }

    /// Parse a kind name, or `"all"` for the full set.
    pub fn parse(name: &str) -> Option<EventMask> {
        let name = name.trim().to_lowercase();
        if name == "all" {
            return Some(EventMask::ALL);
        }
        EventClass::ALL
            .iter()
            .find(|c| c.name() == name)
            .map(|c| c.mask())
    }
}

impl BitOr for EventMask {
    type Output = EventMask;

    fn bitor(self, rhs: EventMask) -> EventMask {
        self.union(rhs)
    }
}

impl BitAnd for EventMask {
    type Output = EventMask;

    fn bitand(self, rhs: EventMask) -> EventMask {
        EventMask(self.0 & rhs.0)
    }
}

impl Not for EventMask {
    type Output = EventMask;

    fn not(self) -> EventMask {
        EventMask(!self.0 & ALL_BITS)
    }
}

impl TryFrom<String> for EventMask {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        EventMask::parse(&value).ok_or_else(|| format!("unknown event kind: {value:?}"))
    }
}

impl fmt::Debug for EventMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = EventClass::ALL
            .iter()
            .filter(|c| self.contains(**c))
            .map(|c| c.name())
            .collect();
        write!(f, "EventMask({})", names.join("|"))
    }
}
