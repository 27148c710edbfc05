use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Declared (or sniffed) media type of an uploaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Pdf,
    Docx,
    Unknown,
}

impl MediaType {
    /// Sniff a media type from a MIME string and/or file name.
    ///
    /// Browsers and upload clients are inconsistent about DOCX MIME types
    /// ("application/vnd.openxmlformats-..." vs "application/msword"), so the
    /// match is a substring check, with the file extension as a tie-breaker.
    pub fn sniff(content_type: Option<&str>, file_name: Option<&str>) -> Self {
        let ct = content_type.unwrap_or_default().to_ascii_lowercase();
        if ct.contains("pdf") {
            return Self::Pdf;
        }
        if ct.contains("word") || ct.contains("docx") {
            return Self::Docx;
        }
        let name = file_name.unwrap_or_default().to_ascii_lowercase();
        if name.ends_with(".pdf") {
            Self::Pdf
        } else if name.ends_with(".docx") || name.ends_with(".doc") {
            Self::Docx
        } else {
            Self::Unknown
        }
    }
}

/// Raw uploaded bytes plus their declared media type. Created per request and
/// discarded after extraction.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub bytes: Vec<u8>,
    pub media_type: MediaType,
}

impl RawDocument {
    pub fn new(bytes: Vec<u8>, media_type: MediaType) -> Self {
        Self { bytes, media_type }
    }
}

/// One visual block within a screen. `component` names the kind
/// (e.g. `gradient_banner`, `filter_chips`); everything else is an open
/// attribute set the rendering collaborator interprets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutSection {
    pub component: String,
    #[serde(flatten)]
    pub attributes: BTreeMap<String, Value>,
}

impl LayoutSection {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }
}

/// A single screen: name, ordered layout sections, free-text description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Screen {
    pub name: String,
    pub layout: Vec<LayoutSection>,
    pub description: String,
}

/// Shared style sheet: color roles, typography roles, and the set of
/// component kinds referenced across all screens.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleSheet {
    pub colors: BTreeMap<String, String>,
    pub typography: BTreeMap<String, String>,
    pub components: Vec<String>,
}

/// The sole artifact crossing the pipeline boundary: a canonical,
/// guaranteed-complete description of a set of UI screens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UIReport {
    pub project_name: String,
    pub summary: String,
    pub screens: Vec<Screen>,
    pub styles: StyleSheet,
}
