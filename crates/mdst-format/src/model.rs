//! In-memory record model
//!
//! Pure data types for stations and the dictionaries embedded in the
//! database header. Wire codecs live in [`crate::wire`].

use serde::Serialize;
use std::collections::BTreeMap;

/// Multilingual name attached to stations, operators and lines.
///
/// The `other`/`other_short` maps are keyed by the small language ids from
/// the header's language table, so localized variants do not repeat string
/// keys per record.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Name {
    /// English name
    pub english: Option<String>,
    /// Abbreviated English name
    pub english_short: Option<String>,
    /// Name in the network's local language
    pub local: Option<String>,
    /// Abbreviated local-language name
    pub local_short: Option<String>,
    /// Additional localized names, keyed by language id
    pub other: BTreeMap<u32, String>,
    /// Additional abbreviated localized names, keyed by language id
    pub other_short: BTreeMap<u32, String>,
}

impl Name {
    /// Name with only an English form, the common case in practice.
    pub fn english(name: impl Into<String>) -> Self {
        Self {
            english: Some(name.into()),
            ..Self::default()
        }
    }

    /// True if no form of the name is present.
    pub fn is_empty(&self) -> bool {
        self.english.is_none()
            && self.english_short.is_none()
            && self.local.is_none()
            && self.local_short.is_none()
            && self.other.is_empty()
            && self.other_short.is_empty()
    }

    /// Select the best display form of this name.
    ///
    /// A missing full form falls back to the short form and vice versa.
    /// With `prefer_english` the English form wins when present, otherwise
    /// the local form does; either way the other language is the fallback.
    pub fn preferred(&self, short: bool, prefer_english: bool) -> Option<&str> {
        let english = Self::pick(self.english.as_deref(), self.english_short.as_deref(), short);
        let local = Self::pick(self.local.as_deref(), self.local_short.as_deref(), short);

        if prefer_english {
            english.or(local)
        } else {
            local.or(english)
        }
    }

    fn pick<'a>(full: Option<&'a str>, abbrev: Option<&'a str>, short: bool) -> Option<&'a str> {
        let full = full.filter(|s| !s.is_empty());
        let abbrev = abbrev.filter(|s| !s.is_empty());
        if short { abbrev.or(full) } else { full.or(abbrev) }
    }
}

/// Mode of transport served by an operator or line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum TransportMode {
    /// Mode not recorded
    #[default]
    Unknown,
    /// Bus
    Bus,
    /// Heavy rail
    Train,
    /// Tram / light rail
    Tram,
    /// Metro / subway
    Metro,
    /// Ferry
    Ferry,
    /// Trolleybus
    Trolleybus,
    /// Monorail
    Monorail,
    /// A mode outside this list
    Other,
}

impl TransportMode {
    /// Parse the on-disk mode byte.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Unknown),
            1 => Some(Self::Bus),
            2 => Some(Self::Train),
            3 => Some(Self::Tram),
            4 => Some(Self::Metro),
            5 => Some(Self::Ferry),
            6 => Some(Self::Trolleybus),
            7 => Some(Self::Monorail),
            8 => Some(Self::Other),
            _ => None,
        }
    }

    /// The on-disk mode byte.
    pub fn as_byte(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::Bus => 1,
            Self::Train => 2,
            Self::Tram => 3,
            Self::Metro => 4,
            Self::Ferry => 5,
            Self::Trolleybus => 6,
            Self::Monorail => 7,
            Self::Other => 8,
        }
    }
}

/// WGS84 coordinates; latitude and longitude are always both present.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Position {
    /// Latitude in degrees
    pub latitude: f32,
    /// Longitude in degrees
    pub longitude: f32,
}

/// One addressable record in the database.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Station {
    /// Identifier, unique within a database
    pub id: u32,
    /// Multilingual name
    pub name: Name,
    /// Location, if known
    pub position: Option<Position>,
    /// Foreign key into the header's operator dictionary
    pub operator_id: Option<u32>,
    /// Foreign keys into the header's line dictionary
    pub line_ids: Vec<u32>,
}

/// Operator dictionary entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Operator {
    /// Multilingual operator name
    pub name: Name,
    /// Default mode for trips on this operator
    pub default_mode: TransportMode,
}

/// Line dictionary entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Line {
    /// Multilingual line name
    pub name: Name,
    /// Mode override for this line
    pub mode: TransportMode,
}

/// File-level aggregate embedded at the start of every database.
///
/// Constructed once per build and immutable thereafter. The dictionaries
/// are small reference data resolved by direct lookup at read time; they
/// are not separately indexed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StationDb {
    /// Monotonically-increasing revision of the source data, distinct
    /// from the binary format version
    pub content_version: u64,
    /// BCP 47 language hint for pronouncing station names
    pub tts_hint_language: Option<String>,
    /// Languages for which the `local` name forms are preferred
    pub local_languages: Vec<String>,
    /// Language code → small id, compacting the `other` name maps
    pub languages: BTreeMap<String, u32>,
    /// Operator dictionary
    pub operators: BTreeMap<u32, Operator>,
    /// Line dictionary
    pub lines: BTreeMap<u32, Line>,
    /// Attribution text required by the data source's license
    pub license_notice: Option<String>,
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_name_preferred_full_and_short() {
        let name = Name {
            english: Some("Central Station".into()),
            english_short: Some("Central".into()),
            local: Some("中央駅".into()),
            local_short: Some("中央".into()),
            ..Name::default()
        };

        assert_eq!(name.preferred(false, true), Some("Central Station"));
        assert_eq!(name.preferred(true, true), Some("Central"));
        assert_eq!(name.preferred(false, false), Some("中央駅"));
        assert_eq!(name.preferred(true, false), Some("中央"));
    }

    #[test]
    fn test_name_preferred_falls_back_across_forms() {
        // Only a short English form: full requests fall back to it
        let name = Name {
            english_short: Some("Ctl".into()),
            ..Name::default()
        };
        assert_eq!(name.preferred(false, true), Some("Ctl"));
        assert_eq!(name.preferred(true, true), Some("Ctl"));

        // Only a full local form: short requests fall back to it, and an
        // English preference falls back to the local name
        let name = Name {
            local: Some("北駅".into()),
            ..Name::default()
        };
        assert_eq!(name.preferred(true, false), Some("北駅"));
        assert_eq!(name.preferred(false, true), Some("北駅"));
    }

    #[test]
    fn test_name_preferred_ignores_empty_strings() {
        let name = Name {
            english: Some(String::new()),
            local: Some("駅".into()),
            ..Name::default()
        };
        assert_eq!(name.preferred(false, true), Some("駅"));

        assert_eq!(Name::default().preferred(false, true), None);
    }

    #[test]
    fn test_name_is_empty() {
        assert!(Name::default().is_empty());
        assert!(!Name::english("Central").is_empty());

        let mut name = Name::default();
        name.other.insert(1, "central".into());
        assert!(!name.is_empty());
    }

    #[test]
    fn test_transport_mode_bytes() {
        for byte in 0..=8u8 {
            let mode = TransportMode::from_byte(byte).expect("mode byte should parse");
            assert_eq!(mode.as_byte(), byte);
        }
        assert_eq!(TransportMode::from_byte(9), None);
        assert_eq!(TransportMode::from_byte(0xFF), None);
    }
}
