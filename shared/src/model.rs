use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::{collections::BTreeSet, fmt};

use crate::geometry::LatLon;
use crate::DATE_TBA_LABEL;

macro_rules! typed_id {
    ($name:ident) => {
        #[derive(
            Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash,
        )]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

typed_id!(EventId);
typed_id!(UserId);

impl EventId {
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    Music,
    Art,
    Theater,
    Dance,
    Cinema,
    Literature,
    Workshop,
    Exhibition,
    Festival,
    #[default]
    Other,
}

impl EventType {
    pub const ALL: [EventType; 10] = [
        Self::Music,
        Self::Art,
        Self::Theater,
        Self::Dance,
        Self::Cinema,
        Self::Literature,
        Self::Workshop,
        Self::Exhibition,
        Self::Festival,
        Self::Other,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Music => "music",
            Self::Art => "art",
            Self::Theater => "theater",
            Self::Dance => "dance",
            Self::Cinema => "cinema",
            Self::Literature => "literature",
            Self::Workshop => "workshop",
            Self::Exhibition => "exhibition",
            Self::Festival => "festival",
            Self::Other => "other",
        }
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Music => "Music",
            Self::Art => "Art",
            Self::Theater => "Theater",
            Self::Dance => "Dance",
            Self::Cinema => "Cinema",
            Self::Literature => "Literature",
            Self::Workshop => "Workshop",
            Self::Exhibition => "Exhibition",
            Self::Festival => "Festival",
            Self::Other => "Other",
        }
    }

    /// Lenient parse; unknown tags become `Other`.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let tag = raw.trim().to_ascii_lowercase();
        match tag.as_str() {
            "music" | "concert" => Self::Music,
            "art" => Self::Art,
            "theater" | "theatre" => Self::Theater,
            "dance" => Self::Dance,
            "cinema" | "film" => Self::Cinema,
            "literature" => Self::Literature,
            "workshop" => Self::Workshop,
            "exhibition" => Self::Exhibition,
            "festival" => Self::Festival,
            _ => Self::Other,
        }
    }
}

impl From<String> for EventType {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<EventType> for String {
    fn from(t: EventType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessibilityFeature {
    WheelchairAccessible,
    AccessibleToilets,
    SignLanguage,
    AudioDescription,
    Subtitles,
    HearingLoop,
    QuietSpace,
    AssistanceDogs,
    ReservedSeating,
}

impl AccessibilityFeature {
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::WheelchairAccessible => "Wheelchair accessible",
            Self::AccessibleToilets => "Accessible toilets",
            Self::SignLanguage => "Sign language",
            Self::AudioDescription => "Audio description",
            Self::Subtitles => "Subtitles",
            Self::HearingLoop => "Hearing loop",
            Self::QuietSpace => "Quiet space",
            Self::AssistanceDogs => "Assistance dogs welcome",
            Self::ReservedSeating => "Reserved seating",
        }
    }
}

/// Parses the timestamp formats seen in backend records.
///
/// RFC 3339 first, then naive date-times (taken as UTC), then a bare date at
/// midnight, then epoch milliseconds. Anything else is `None`.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    const NAIVE_FORMATS: [&str; 3] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
    ];

    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|naive| Utc.from_utc_datetime(&naive));
    }

    if raw.bytes().all(|b| b.is_ascii_digit()) {
        return raw
            .parse::<i64>()
            .ok()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single());
    }

    None
}

/// Reads an explicit `null` as the field's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    #[serde(
        default,
        alias = "start",
        alias = "startDate",
        deserialize_with = "null_as_default"
    )]
    pub date: String,
    #[serde(default, alias = "end", alias = "endDate", skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

impl ScheduleEntry {
    pub fn new(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            end_date: None,
        }
    }

    #[must_use]
    pub fn with_end(mut self, end: impl Into<String>) -> Self {
        self.end_date = Some(end.into());
        self
    }

    #[must_use]
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.date)
    }

    #[must_use]
    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_date.as_deref().and_then(parse_timestamp)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organizer {
    #[serde(default)]
    pub id: UserId,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipationStatus {
    #[default]
    Pending,
    Accepted,
    Declined,
}

impl ParticipationStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedParticipant {
    pub id: UserId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: ParticipationStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TicketInfo {
    #[default]
    Free,
    Donation,
    Paid { price: f64, currency: String },
}

impl TicketInfo {
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Free => "Free".into(),
            Self::Donation => "Donation".into(),
            Self::Paid { price, currency } => format!("{price:.2} {currency}"),
        }
    }
}

/// An event record as served by the backend.
///
/// Deserialization is lenient: missing or `null` fields get defaults and an
/// unknown `type` tag becomes [`EventType::Other`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CulturalEvent {
    #[serde(deserialize_with = "null_as_default")]
    pub id: EventId,
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(rename = "type", deserialize_with = "null_as_default")]
    pub event_type: EventType,
    #[serde(deserialize_with = "null_as_default")]
    pub schedule: Vec<ScheduleEntry>,
    #[serde(alias = "location")]
    pub coordinates: Option<LatLon>,
    #[serde(deserialize_with = "null_as_default")]
    pub city: String,
    #[serde(deserialize_with = "null_as_default")]
    pub country: String,
    #[serde(deserialize_with = "null_as_default")]
    pub organizer: Organizer,
    #[serde(alias = "taggedParticipants", deserialize_with = "null_as_default")]
    pub participants: Vec<TaggedParticipant>,
    #[serde(deserialize_with = "null_as_default")]
    pub accessibility: BTreeSet<AccessibilityFeature>,
    #[serde(deserialize_with = "null_as_default")]
    pub ticket: TicketInfo,
    #[serde(deserialize_with = "null_as_default")]
    pub images: Vec<String>,
}

impl CulturalEvent {
    /// Earliest parseable start across all schedule entries.
    #[must_use]
    pub fn earliest_start(&self) -> Option<DateTime<Utc>> {
        self.schedule.iter().filter_map(ScheduleEntry::start_time).min()
    }

    /// Sort key with unresolvable schedules pinned to `now`.
    #[must_use]
    pub fn sort_key(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.earliest_start().unwrap_or(now)
    }

    /// TBA events count as upcoming. Otherwise an event is upcoming while any
    /// entry has not yet ended (or started, when no end is given).
    #[must_use]
    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        let mut any_dated = false;
        for entry in &self.schedule {
            let Some(start) = entry.start_time() else {
                continue;
            };
            any_dated = true;
            let last = entry.end_time().filter(|end| *end >= start).unwrap_or(start);
            if last >= now {
                return true;
            }
        }
        !any_dated
    }

    #[must_use]
    pub fn is_tba(&self) -> bool {
        self.earliest_start().is_none()
    }

    #[must_use]
    pub fn is_organized_by(&self, user: &UserId) -> bool {
        !user.as_str().is_empty() && &self.organizer.id == user
    }

    #[must_use]
    pub fn schedule_label(&self) -> String {
        self.earliest_start().map_or_else(
            || DATE_TBA_LABEL.to_string(),
            |start| start.format("%a %d %b %Y, %H:%M").to_string(),
        )
    }

    #[must_use]
    pub fn participant(&self, user: &UserId) -> Option<&TaggedParticipant> {
        self.participants.iter().find(|p| &p.id == user)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub email: Option<String>,
}
