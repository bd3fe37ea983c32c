//! Incident report
//!
//! Ordered collection of events produced by scanning one request. Totals are
//! recomputed on demand; iteration never mutates, so consumers may walk the
//! events any number of times.
//!
//! The text rendering is meant for operators and logs. It echoes attacker
//! supplied values verbatim and must be escaped by the caller before being
//! embedded in HTML.

use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::fmt;

use crate::event::Event;

/// Events from one scanned request, in scan order
#[derive(Debug, Clone, Default)]
pub struct Report {
    events: Vec<Event>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event
    pub fn add_event(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Total impact across all events, saturating at `u32::MAX`
    pub fn impact(&self) -> u32 {
        self.events
            .iter()
            .map(Event::impact)
            .fold(0, u32::saturating_add)
    }

    /// Union of all events' tags, first-seen order
    pub fn tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = Vec::new();
        for event in &self.events {
            for tag in event.tags() {
                if !tags.contains(&tag) {
                    tags.push(tag);
                }
            }
        }
        tags
    }

    /// First event recorded for the given parameter name
    pub fn get_event(&self, name: &str) -> Option<&Event> {
        self.events.iter().find(|e| e.name() == name)
    }

    pub fn has_event(&self, name: &str) -> bool {
        self.get_event(name).is_some()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.events.iter()
    }
}

impl<'a> IntoIterator for &'a Report {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Extend<Event> for Report {
    fn extend<I: IntoIterator<Item = Event>>(&mut self, iter: I) {
        self.events.extend(iter);
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return writeln!(f, "No attack detected");
        }

        writeln!(f, "Total impact: {}", self.impact())?;
        writeln!(f, "Affected tags: {}", self.tags().join(", "))?;

        for event in &self.events {
            writeln!(f)?;
            writeln!(f, "Variable: {} | Value: {}", event.name(), event.value())?;
            writeln!(
                f,
                "Impact: {} | Tags: {}",
                event.impact(),
                event.tags().join(", ")
            )?;

            for sig in event {
                writeln!(
                    f,
                    "  Description: {} | Tags: {} | ID {}",
                    sig.description(),
                    sig.tags().join(", "),
                    sig.id()
                )?;
            }
        }

        Ok(())
    }
}

impl Serialize for Report {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Report", 3)?;
        state.serialize_field("impact", &self.impact())?;
        state.serialize_field("tags", &self.tags())?;
        state.serialize_field("events", &self.events)?;
        state.end()
    }
}
