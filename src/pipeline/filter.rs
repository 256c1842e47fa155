use crate::config::{FilterConfig, EXCLUDE_NOTHING, INCLUDE_EVERYTHING};
use crate::frigate::Event;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeSet, HashSet};

static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9]+").unwrap());

/// Strip everything outside `[A-Za-z0-9]` so the value renders as a hashtag
pub fn normalize_tag(value: &str) -> String {
    NON_ALNUM.replace_all(value, "").into_owned()
}

/// Normalized, de-duplicated zone tags of an event
pub fn zone_tags(event: &Event) -> BTreeSet<String> {
    event
        .zones
        .iter()
        .map(|zone| normalize_tag(zone))
        .filter(|zone| !zone.is_empty())
        .collect()
}

/// An exclude-list; `Nothing` is the "exclude nothing" default
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exclusion {
    Nothing,
    Listed(HashSet<String>),
}

impl Exclusion {
    pub fn from_list(items: &[String], normalize: fn(&str) -> String) -> Self {
        match clean(items, EXCLUDE_NOTHING, normalize) {
            Some(set) => Self::Listed(set),
            None => Self::Nothing,
        }
    }

    pub fn excludes(&self, value: &str) -> bool {
        match self {
            Self::Nothing => false,
            Self::Listed(set) => set.contains(value),
        }
    }
}

/// An include-list; `Everything` is the "include all" default
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inclusion {
    Everything,
    Listed(HashSet<String>),
}

impl Inclusion {
    pub fn from_list(items: &[String], normalize: fn(&str) -> String) -> Self {
        match clean(items, INCLUDE_EVERYTHING, normalize) {
            Some(set) => Self::Listed(set),
            None => Self::Everything,
        }
    }

    pub fn includes(&self, value: &str) -> bool {
        match self {
            Self::Everything => true,
            Self::Listed(set) => set.contains(value),
        }
    }
}

/// `None` when the list is empty or holds only the sentinel
fn clean(items: &[String], sentinel: &str, normalize: fn(&str) -> String) -> Option<HashSet<String>> {
    let set: HashSet<String> = items
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty() && !item.eq_ignore_ascii_case(sentinel))
        .map(normalize)
        .filter(|item| !item.is_empty())
        .collect();
    if set.is_empty() {
        None
    } else {
        Some(set)
    }
}

fn verbatim(value: &str) -> String {
    value.to_string()
}

/// Camera, label and zone include/exclude lists, read-only after load
#[derive(Debug, Clone)]
pub struct EventFilter {
    exclude_cameras: Exclusion,
    include_cameras: Inclusion,
    exclude_labels: Exclusion,
    include_labels: Inclusion,
    exclude_zones: Exclusion,
    include_zones: Inclusion,
}

impl Default for EventFilter {
    fn default() -> Self {
        Self::new(&FilterConfig::default())
    }
}

impl EventFilter {
    pub fn new(config: &FilterConfig) -> Self {
        Self {
            exclude_cameras: Exclusion::from_list(&config.exclude_cameras, verbatim),
            include_cameras: Inclusion::from_list(&config.include_cameras, verbatim),
            exclude_labels: Exclusion::from_list(&config.exclude_labels, verbatim),
            include_labels: Inclusion::from_list(&config.include_labels, verbatim),
            exclude_zones: Exclusion::from_list(&config.exclude_zones, normalize_tag),
            include_zones: Inclusion::from_list(&config.include_zones, normalize_tag),
        }
    }

    /// Whether a single event passes every list. Exclusions are checked
    /// before inclusions, so an excluded event is dropped even if included.
    pub fn admits(&self, event: &Event) -> bool {
        if self.exclude_cameras.excludes(&event.camera) {
            debug!("Event {} dropped: camera {} excluded", event.id, event.camera);
            return false;
        }
        if !self.include_cameras.includes(&event.camera) {
            debug!("Event {} dropped: camera {} not included", event.id, event.camera);
            return false;
        }

        if self.exclude_labels.excludes(&event.label) {
            debug!("Event {} dropped: label {} excluded", event.id, event.label);
            return false;
        }
        if !self.include_labels.includes(&event.label) {
            debug!("Event {} dropped: label {} not included", event.id, event.label);
            return false;
        }

        let zones = zone_tags(event);
        if zones.iter().any(|zone| self.exclude_zones.excludes(zone)) {
            debug!("Event {} dropped: zone excluded {:?}", event.id, zones);
            return false;
        }
        if let Inclusion::Listed(_) = self.include_zones {
            if zones.is_empty() || zones.iter().any(|zone| !self.include_zones.includes(zone)) {
                debug!("Event {} dropped: zones not included {:?}", event.id, zones);
                return false;
            }
        }

        true
    }

    /// Keep the events eligible for notification, preserving order
    pub fn apply(&self, events: Vec<Event>) -> Vec<Event> {
        events.into_iter().filter(|event| self.admits(event)).collect()
    }
}
