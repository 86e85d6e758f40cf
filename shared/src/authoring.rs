use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

use crate::error::{AppError, AppResult, ErrorKind};
use crate::geometry::{CoordinateError, LatLon};
use crate::model::{
    AccessibilityFeature, CulturalEvent, CurrentUser, EventId, EventType, Organizer,
    ScheduleEntry, TicketInfo,
};
use crate::{MAX_DESCRIPTION_LENGTH, MAX_TITLE_LENGTH};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum EventValidationError {
    #[error("Title is required")]
    EmptyTitle,
    #[error("Title must be at most {max} characters")]
    TitleTooLong { max: usize },
    #[error("Description must be at most {max} characters")]
    DescriptionTooLong { max: usize },
    #[error("Add at least one date")]
    EmptySchedule,
    #[error("Date {index} is not valid: {value}")]
    InvalidDate { index: usize, value: String },
    #[error("Date {index} ends before it starts")]
    EndBeforeStart { index: usize },
    #[error("Location is not valid: {0}")]
    InvalidCoordinate(#[from] CoordinateError),
    #[error("Price must be a positive amount with a currency")]
    InvalidPrice,
}

/// Form contents for creating or editing an event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventDraft {
    pub title: String,
    pub description: String,
    pub event_type: EventType,
    pub schedule: Vec<ScheduleEntry>,
    pub coordinates: Option<LatLon>,
    pub city: String,
    pub country: String,
    pub ticket: TicketInfo,
    pub accessibility: BTreeSet<AccessibilityFeature>,
    pub images: Vec<String>,
}

impl EventDraft {
    pub fn validate(&self) -> Result<(), EventValidationError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(EventValidationError::EmptyTitle);
        }
        if title.chars().count() > MAX_TITLE_LENGTH {
            return Err(EventValidationError::TitleTooLong {
                max: MAX_TITLE_LENGTH,
            });
        }
        if self.description.chars().count() > MAX_DESCRIPTION_LENGTH {
            return Err(EventValidationError::DescriptionTooLong {
                max: MAX_DESCRIPTION_LENGTH,
            });
        }

        if self.schedule.is_empty() {
            return Err(EventValidationError::EmptySchedule);
        }
        for (index, entry) in self.schedule.iter().enumerate() {
            let start = entry
                .start_time()
                .ok_or_else(|| EventValidationError::InvalidDate {
                    index,
                    value: entry.date.clone(),
                })?;
            if let Some(raw_end) = &entry.end_date {
                let end = entry
                    .end_time()
                    .ok_or_else(|| EventValidationError::InvalidDate {
                        index,
                        value: raw_end.clone(),
                    })?;
                if end < start {
                    return Err(EventValidationError::EndBeforeStart { index });
                }
            }
        }

        if let Some(coordinates) = self.coordinates {
            coordinates.validate()?;
        }

        if let TicketInfo::Paid { price, currency } = &self.ticket {
            if !price.is_finite() || *price <= 0.0 || currency.trim().is_empty() {
                return Err(EventValidationError::InvalidPrice);
            }
        }

        Ok(())
    }

    /// Builds the record to send. Call [`Self::validate`] first.
    #[must_use]
    pub fn into_event(self, id: EventId, organizer: &CurrentUser) -> CulturalEvent {
        CulturalEvent {
            id,
            title: self.title.trim().to_string(),
            description: self.description,
            event_type: self.event_type,
            schedule: self.schedule,
            coordinates: self.coordinates,
            city: self.city.trim().to_string(),
            country: self.country.trim().to_string(),
            organizer: Organizer {
                id: organizer.id.clone(),
                name: organizer.display_name.clone(),
            },
            participants: Vec::new(),
            accessibility: self.accessibility,
            ticket: self.ticket,
            images: self.images,
        }
    }

    /// Applies the draft to an existing event, keeping id, organizer and
    /// tagged participants.
    #[must_use]
    pub fn apply_to(self, existing: &CulturalEvent) -> CulturalEvent {
        let organizer = CurrentUser {
            id: existing.organizer.id.clone(),
            display_name: existing.organizer.name.clone(),
            email: None,
        };
        let mut updated = self.into_event(existing.id.clone(), &organizer);
        updated.participants = existing.participants.clone();
        updated
    }

    #[must_use]
    pub fn from_event(event: &CulturalEvent) -> Self {
        Self {
            title: event.title.clone(),
            description: event.description.clone(),
            event_type: event.event_type,
            schedule: event.schedule.clone(),
            coordinates: event.coordinates,
            city: event.city.clone(),
            country: event.country.clone(),
            ticket: event.ticket.clone(),
            accessibility: event.accessibility.clone(),
            images: event.images.clone(),
        }
    }
}

/// Only the organizer may edit or delete an event.
pub fn ensure_organizer(event: &CulturalEvent, user: &CurrentUser) -> AppResult<()> {
    if event.is_organized_by(&user.id) {
        Ok(())
    } else {
        Err(
            AppError::new(ErrorKind::Authorization, "only the organizer can modify this event")
                .with_context("event_id", event.id.as_str())
                .with_context("user_id", user.id.as_str()),
        )
    }
}
