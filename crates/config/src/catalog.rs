//! Catalog file: connections, queues with their option forest, and settings.
//!
//! The file is only read by `helpline catalog check|apply`; at runtime the
//! catalog lives in the store.

use std::path::Path;

use {
    helpline_common::types::{
        Catalog, ChooserMode, Connection, ConnectionEntry, ConnectionId, MediaRef, OptionId,
        Queue, QueueId, QueueOption, ScheduleEntry, setting_keys,
    },
    serde::{Deserialize, Serialize},
};

use crate::{Result, env_subst::substitute_env, loader::parse_by_extension};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogFile {
    pub connections: Vec<ConnectionSpec>,
    pub queues: Vec<QueueSpec>,
    pub settings: SettingsSpec,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSpec {
    pub id: ConnectionId,
    pub name: String,
    /// Sent to unassigned contacts, and used as the queue chooser body.
    pub greeting: Option<String>,
    pub farewell: Option<String>,
    /// When set, closing an open ticket asks for a 1..3 rating first.
    pub rating_prompt: Option<String>,
    pub out_of_hours: Option<String>,
    /// Queue ids in the order they are offered.
    pub queues: Vec<QueueId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueSpec {
    pub id: QueueId,
    pub name: String,
    pub color: String,
    pub greeting: Option<String>,
    /// How the root options are presented.
    pub chooser: ChooserMode,
    pub media: Option<MediaRef>,
    pub options: Vec<OptionSpec>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionSpec {
    pub id: OptionId,
    /// Parent option id; absent for root options.
    pub parent: Option<OptionId>,
    pub ordinal: String,
    pub title: String,
    pub message: Option<String>,
    pub chooser: ChooserMode,
    pub media: Option<MediaRef>,
    pub finalize: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsSpec {
    pub schedules: Vec<ScheduleEntry>,
    /// Presentation of the queue chooser.
    pub queues_option_type: Option<ChooserMode>,
}

impl CatalogFile {
    /// Flatten into the store representation. Options take their queue from
    /// the enclosing queue entry; blank optional texts become `None`.
    pub fn into_catalog(self) -> Result<Catalog> {
        let connections = self
            .connections
            .into_iter()
            .map(|c| ConnectionEntry {
                connection: Connection {
                    id: c.id,
                    name: c.name,
                    greeting: non_blank(c.greeting),
                    farewell: non_blank(c.farewell),
                    rating_prompt: non_blank(c.rating_prompt),
                    out_of_hours: non_blank(c.out_of_hours),
                },
                queue_ids: c.queues,
            })
            .collect();

        let mut queues = Vec::with_capacity(self.queues.len());
        let mut options = Vec::new();
        for q in self.queues {
            options.extend(q.options.into_iter().map(|o| QueueOption {
                id: o.id,
                queue_id: q.id,
                parent_id: o.parent,
                ordinal: o.ordinal.trim().to_string(),
                title: o.title,
                message: non_blank(o.message),
                chooser: o.chooser,
                media: o.media,
                finalize: o.finalize,
            }));
            queues.push(Queue {
                id: q.id,
                name: q.name,
                color: q.color,
                greeting: non_blank(q.greeting),
                chooser: q.chooser,
                media: q.media,
            });
        }

        let mut settings = Vec::new();
        if !self.settings.schedules.is_empty() {
            settings.push((
                setting_keys::SCHEDULES.to_string(),
                serde_json::to_string(&self.settings.schedules)?,
            ));
        }
        if let Some(mode) = self.settings.queues_option_type {
            settings.push((
                setting_keys::QUEUES_OPTION_TYPE.to_string(),
                mode.as_str().to_string(),
            ));
        }

        Ok(Catalog {
            connections,
            queues,
            options,
            settings,
        })
    }
}

/// Read a catalog file (TOML, YAML or JSON by extension) with `${ENV}` substitution.
pub fn load_catalog(path: &Path) -> Result<CatalogFile> {
    let raw = std::fs::read_to_string(path).map_err(|source| crate::Error::Read {
        path: path.display().to_string(),
        source,
    })?;
    parse_by_extension(&substitute_env(&raw), path)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
