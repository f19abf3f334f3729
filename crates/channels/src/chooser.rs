//! Button and list choosers.
//!
//! Callers describe the choice once with a [`ChooserSpec`]; [`render_chooser`]
//! shapes it for the configured [`ChooserMode`].

use {
    helpline_common::types::ChooserMode,
    serde::{Deserialize, Serialize},
};

/// One selectable entry. `id` comes back as the event's selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChooserEntry {
    pub id: String,
    pub label: String,
}

impl ChooserEntry {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Chooser {
    Buttons {
        body: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        footer: Option<String>,
        buttons: Vec<ChooserEntry>,
    },
    List {
        title: String,
        body: String,
        /// Label of the button that opens the list; also the section title.
        button_text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        footer: Option<String>,
        rows: Vec<ChooserEntry>,
    },
}

impl Chooser {
    #[must_use]
    pub fn entries(&self) -> &[ChooserEntry] {
        match self {
            Self::Buttons { buttons, .. } => buttons,
            Self::List { rows, .. } => rows,
        }
    }

    #[must_use]
    pub fn body(&self) -> &str {
        match self {
            Self::Buttons { body, .. } | Self::List { body, .. } => body,
        }
    }

    /// Plain-text rendition stored as the message body.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut out = self.body().to_string();
        for entry in self.entries() {
            out.push_str(&format!("\n[{}] {}", entry.id, entry.label));
        }
        out
    }
}

/// Mode-independent description of a chooser.
#[derive(Debug, Clone, Default)]
pub struct ChooserSpec {
    /// List heading. Ignored by buttons.
    pub title: String,
    pub body: String,
    pub footer: Option<String>,
    /// List button/section label. Ignored by buttons.
    pub section_title: String,
    pub entries: Vec<ChooserEntry>,
}

#[must_use]
pub fn render_chooser(mode: ChooserMode, spec: ChooserSpec) -> Chooser {
    let footer = spec.footer.filter(|f| !f.is_empty());
    match mode {
        ChooserMode::Buttons => Chooser::Buttons {
            body: spec.body,
            footer,
            buttons: spec.entries,
        },
        ChooserMode::List => Chooser::List {
            title: spec.title,
            body: spec.body,
            button_text: spec.section_title,
            footer,
            rows: spec.entries,
        },
    }
}
