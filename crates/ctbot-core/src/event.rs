//! Typed stream events and the frame decoder.
//!
//! A frame is classified before it is decoded: an explicit `type` (or
//! `event`) tag wins when present, otherwise the raw text is scanned for the
//! marker of each kind in [`EventKind::CHECK_ORDER`]. The frame is then
//! deserialized into that kind's payload only. A frame that matches no kind,
//! or whose payload does not fit the matched kind, is a [`DecodeError`].

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Longest slice of a rejected frame kept in the error.
const PREVIEW_CHARS: usize = 80;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    pub owner: Owner,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: Option<String>,
}

impl Module {
    /// The image URL, if one was set and is not blank.
    pub fn image_url(&self) -> Option<&str> {
        self.image.as_deref().filter(|url| !url.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    pub release_version: String,
    pub mod_version: String,
    #[serde(default)]
    pub changelog: String,
}

/// A decoded stream event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    ModuleCreated { module: Module },
    ReleaseCreated { module: Module, release: Release },
    ModuleDeleted { module: Module },
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::ModuleCreated { .. } => EventKind::ModuleCreated,
            Event::ReleaseCreated { .. } => EventKind::ReleaseCreated,
            Event::ModuleDeleted { .. } => EventKind::ModuleDeleted,
        }
    }

    pub fn module(&self) -> &Module {
        match self {
            Event::ModuleCreated { module }
            | Event::ReleaseCreated { module, .. }
            | Event::ModuleDeleted { module } => module,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ModuleCreated,
    ReleaseCreated,
    ModuleDeleted,
}

impl EventKind {
    /// Marker scan order for untagged frames.
    pub const CHECK_ORDER: [EventKind; 3] = [
        EventKind::ReleaseCreated,
        EventKind::ModuleCreated,
        EventKind::ModuleDeleted,
    ];

    pub fn marker(self) -> &'static str {
        match self {
            EventKind::ModuleCreated => "module_created",
            EventKind::ReleaseCreated => "release_created",
            EventKind::ModuleDeleted => "module_deleted",
        }
    }

    fn from_marker(marker: &str) -> Option<Self> {
        Self::CHECK_ORDER
            .into_iter()
            .find(|kind| kind.marker() == marker)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.marker())
    }
}

/// A frame that could not be turned into an [`Event`].
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("unrecognized frame: {preview}")]
    Unrecognized { preview: String },

    #[error("malformed {kind} frame: {source}")]
    Malformed {
        kind: EventKind,
        source: serde_json::Error,
    },
}

#[derive(Deserialize)]
struct ModulePayload {
    module: Module,
}

#[derive(Deserialize)]
struct ReleasePayload {
    module: Module,
    release: Release,
}

/// Only the discriminator fields; everything else is ignored.
#[derive(Deserialize)]
struct TagProbe {
    #[serde(rename = "type")]
    kind: Option<String>,
    event: Option<String>,
}

/// Classify a raw frame without decoding its payload.
pub fn classify(text: &str) -> Option<EventKind> {
    if let Ok(probe) = serde_json::from_str::<TagProbe>(text) {
        let tagged = probe
            .kind
            .as_deref()
            .or(probe.event.as_deref())
            .and_then(EventKind::from_marker);
        if tagged.is_some() {
            return tagged;
        }
    }
    EventKind::CHECK_ORDER
        .into_iter()
        .find(|kind| text.contains(kind.marker()))
}

/// Decode one text frame into an [`Event`].
pub fn decode_frame(text: &str) -> Result<Event, DecodeError> {
    let kind = classify(text).ok_or_else(|| DecodeError::Unrecognized {
        preview: preview(text),
    })?;
    let malformed = |source| DecodeError::Malformed { kind, source };

    let event = match kind {
        EventKind::ModuleCreated => {
            let payload: ModulePayload = serde_json::from_str(text).map_err(malformed)?;
            Event::ModuleCreated {
                module: payload.module,
            }
        }
        EventKind::ReleaseCreated => {
            let payload: ReleasePayload = serde_json::from_str(text).map_err(malformed)?;
            Event::ReleaseCreated {
                module: payload.module,
                release: payload.release,
            }
        }
        EventKind::ModuleDeleted => {
            let payload: ModulePayload = serde_json::from_str(text).map_err(malformed)?;
            Event::ModuleDeleted {
                module: payload.module,
            }
        }
    };
    Ok(event)
}

fn preview(text: &str) -> String {
    let mut out: String = text.chars().take(PREVIEW_CHARS).collect();
    if text.chars().nth(PREVIEW_CHARS).is_some() {
        out.push_str("...");
    }
    out
}
