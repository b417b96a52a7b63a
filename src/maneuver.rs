//! Maneuver kinds and their HUD glyphs.
//!
//! Directions steps carry an optional maneuver tag such as
//! `turn-slight-left` or `fork-right`. Anything not in the table below,
//! including a missing tag, is shown as going straight.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Maneuver categories with a dedicated glyph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ManeuverKind {
    #[default]
    Straight,
    TurnLeft,
    TurnSlightLeft,
    TurnSharpLeft,
    TurnRight,
    TurnSlightRight,
    TurnSharpRight,
    UTurnLeft,
    UTurnRight,
    Merge,
    RampLeft,
    RampRight,
    ForkLeft,
    ForkRight,
    KeepLeft,
    KeepRight,
}

impl ManeuverKind {
    /// Parse a directions maneuver tag. Unknown or absent tags map to
    /// `Straight`.
    pub fn from_tag(tag: Option<&str>) -> Self {
        match tag {
            Some("turn-left") => ManeuverKind::TurnLeft,
            Some("turn-slight-left") => ManeuverKind::TurnSlightLeft,
            Some("turn-sharp-left") => ManeuverKind::TurnSharpLeft,
            Some("turn-right") => ManeuverKind::TurnRight,
            Some("turn-slight-right") => ManeuverKind::TurnSlightRight,
            Some("turn-sharp-right") => ManeuverKind::TurnSharpRight,
            Some("uturn-left") => ManeuverKind::UTurnLeft,
            Some("uturn-right") => ManeuverKind::UTurnRight,
            Some("merge") => ManeuverKind::Merge,
            Some("ramp-left") => ManeuverKind::RampLeft,
            Some("ramp-right") => ManeuverKind::RampRight,
            Some("fork-left") => ManeuverKind::ForkLeft,
            Some("fork-right") => ManeuverKind::ForkRight,
            Some("keep-left") => ManeuverKind::KeepLeft,
            Some("keep-right") => ManeuverKind::KeepRight,
            _ => ManeuverKind::Straight,
        }
    }

    /// The directions tag for this kind.
    pub fn tag(self) -> &'static str {
        match self {
            ManeuverKind::Straight => "straight",
            ManeuverKind::TurnLeft => "turn-left",
            ManeuverKind::TurnSlightLeft => "turn-slight-left",
            ManeuverKind::TurnSharpLeft => "turn-sharp-left",
            ManeuverKind::TurnRight => "turn-right",
            ManeuverKind::TurnSlightRight => "turn-slight-right",
            ManeuverKind::TurnSharpRight => "turn-sharp-right",
            ManeuverKind::UTurnLeft => "uturn-left",
            ManeuverKind::UTurnRight => "uturn-right",
            ManeuverKind::Merge => "merge",
            ManeuverKind::RampLeft => "ramp-left",
            ManeuverKind::RampRight => "ramp-right",
            ManeuverKind::ForkLeft => "fork-left",
            ManeuverKind::ForkRight => "fork-right",
            ManeuverKind::KeepLeft => "keep-left",
            ManeuverKind::KeepRight => "keep-right",
        }
    }

    pub fn glyph(self) -> &'static str {
        match self {
            ManeuverKind::Straight => "↑",
            ManeuverKind::TurnLeft => "↰",
            ManeuverKind::TurnRight => "↱",
            ManeuverKind::TurnSlightLeft | ManeuverKind::TurnSlightRight => "➚",
            ManeuverKind::TurnSharpLeft | ManeuverKind::TurnSharpRight => "⤴",
            ManeuverKind::UTurnLeft | ManeuverKind::UTurnRight => "↩",
            ManeuverKind::Merge => "⇱",
            ManeuverKind::RampLeft => "↖",
            ManeuverKind::RampRight => "↗",
            ManeuverKind::ForkLeft => "⤶",
            ManeuverKind::ForkRight => "⤳",
            ManeuverKind::KeepLeft => "←",
            ManeuverKind::KeepRight => "→",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ManeuverKind::Straight => "Continue straight",
            ManeuverKind::TurnLeft => "Turn left",
            ManeuverKind::TurnSlightLeft => "Slight left",
            ManeuverKind::TurnSharpLeft => "Sharp left",
            ManeuverKind::TurnRight => "Turn right",
            ManeuverKind::TurnSlightRight => "Slight right",
            ManeuverKind::TurnSharpRight => "Sharp right",
            ManeuverKind::UTurnLeft | ManeuverKind::UTurnRight => "Make a U-turn",
            ManeuverKind::Merge => "Merge",
            ManeuverKind::RampLeft => "Take the ramp on the left",
            ManeuverKind::RampRight => "Take the ramp on the right",
            ManeuverKind::ForkLeft => "Keep left at the fork",
            ManeuverKind::ForkRight => "Keep right at the fork",
            ManeuverKind::KeepLeft => "Keep left",
            ManeuverKind::KeepRight => "Keep right",
        }
    }
}

impl Serialize for ManeuverKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.tag())
    }
}

impl<'de> Deserialize<'de> for ManeuverKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = Option::<String>::deserialize(deserializer)?;
        Ok(ManeuverKind::from_tag(tag.as_deref()))
    }
}
