//! Validation for the process config file and for catalogs.
//!
//! Config checks detect unknown/misspelled fields and bad values. Catalog
//! checks enforce the rules a catalog must satisfy before it is written to
//! the store; any error diagnostic rejects the write.

use std::{
    collections::{HashMap, HashSet},
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use {
    helpline_common::types::{Catalog, ChooserMode, OptionId, ScheduleEntry, setting_keys},
    regex::Regex,
};

use crate::{Error, Result, schema::HelplineConfig};

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    /// "syntax", "unknown-field", "type-error", "value", "queue", "connection",
    /// "option", "setting"
    pub category: &'static str,
    /// Dotted path, e.g. "queues[1].color"
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    fn error(category: &'static str, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            category,
            path: path.into(),
            message: message.into(),
        }
    }

    fn warning(
        category: &'static str,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(category, path, message)
        }
    }

    fn info(category: &'static str, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            ..Self::error(category, path, message)
        }
    }
}

/// Result of a validation run.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<PathBuf>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    /// `Err(Error::Validation)` when any error diagnostic is present.
    pub fn into_result(self) -> Result<()> {
        if self.has_errors() {
            return Err(Error::validation(self.diagnostics));
        }
        Ok(())
    }
}

// ── Config schema tree ──────────────────────────────────────────────────────

enum KnownKeys {
    Struct(HashMap<&'static str, KnownKeys>),
    Leaf,
}

fn build_schema_map() -> KnownKeys {
    use KnownKeys::{Leaf, Struct};

    let leaves = |keys: &[&'static str]| Struct(keys.iter().map(|k| (*k, Leaf)).collect());

    Struct(HashMap::from([
        ("database", leaves(&["url"])),
        ("media", leaves(&["dir"])),
        (
            "automation",
            leaves(&["debounce_ms", "timezone", "max_option_depth"]),
        ),
        (
            "replies",
            leaves(&[
                "menu_placeholder",
                "list_title",
                "list_text",
                "list_section",
                "more_options",
                "other_options",
                "home_label",
                "back_label",
                "agent_label",
                "please_wait",
                "transferred",
                "rating_scale",
            ]),
        ),
        ("metrics", leaves(&["enabled", "listen"])),
    ]))
}

// ── Levenshtein distance ────────────────────────────────────────────────────

fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b_chars.len()]
}

/// Closest candidate within `max_distance` edits, if any.
fn suggest<'a>(needle: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    candidates
        .iter()
        .map(|c| (*c, levenshtein(needle, c)))
        .filter(|(_, d)| *d > 0 && *d <= max_distance)
        .min_by_key(|(_, d)| *d)
        .map(|(c, _)| c)
}

// ── Config validation ───────────────────────────────────────────────────────

/// Validate a config file at the given path, or the discovered one if `None`.
#[must_use]
pub fn validate(path: Option<&Path>) -> ValidationResult {
    let config_path = path
        .map(Path::to_path_buf)
        .or_else(crate::loader::find_config_file);

    let Some(actual_path) = config_path else {
        return ValidationResult {
            diagnostics: vec![Diagnostic::info(
                "file-ref",
                "",
                "no config file found; using defaults",
            )],
            config_path: None,
        };
    };

    let mut result = match std::fs::read_to_string(&actual_path) {
        Ok(content) if actual_path.extension().is_some_and(|e| e == "toml") => {
            validate_toml_str(&content)
        },
        Ok(_) => match crate::loader::load_config(&actual_path) {
            Ok(config) => {
                let mut diagnostics = Vec::new();
                check_config_values(&config, &mut diagnostics);
                ValidationResult {
                    diagnostics,
                    config_path: None,
                }
            },
            Err(e) => ValidationResult {
                diagnostics: vec![Diagnostic::error("type-error", "", e.to_string())],
                config_path: None,
            },
        },
        Err(e) => ValidationResult {
            diagnostics: vec![Diagnostic::error(
                "syntax",
                "",
                format!("failed to read config file: {e}"),
            )],
            config_path: None,
        },
    };
    result.config_path = Some(actual_path);
    result
}

/// Validate a TOML config string without touching the filesystem.
#[must_use]
pub fn validate_toml_str(toml_str: &str) -> ValidationResult {
    let mut diagnostics = Vec::new();

    let toml_value: toml::Value = match toml::from_str(toml_str) {
        Ok(v) => v,
        Err(e) => {
            diagnostics.push(Diagnostic::error(
                "syntax",
                "",
                format!("TOML syntax error: {e}"),
            ));
            return ValidationResult {
                diagnostics,
                config_path: None,
            };
        },
    };

    check_unknown_fields(&toml_value, &build_schema_map(), "", &mut diagnostics);

    match toml::from_str::<HelplineConfig>(toml_str) {
        Ok(config) => check_config_values(&config, &mut diagnostics),
        Err(e) => diagnostics.push(Diagnostic::error(
            "type-error",
            "",
            format!("type error: {e}"),
        )),
    }

    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

fn check_unknown_fields(
    value: &toml::Value,
    schema: &KnownKeys,
    prefix: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let (toml::Value::Table(table), KnownKeys::Struct(fields)) = (value, schema) else {
        return;
    };
    let known: Vec<&str> = fields.keys().copied().collect();
    for (key, child) in table {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match fields.get(key.as_str()) {
            Some(child_schema) => check_unknown_fields(child, child_schema, &path, diagnostics),
            None => {
                let message = match suggest(key, &known, 3) {
                    Some(s) => format!("unknown field (did you mean \"{s}\"?)"),
                    None => "unknown field".to_string(),
                };
                diagnostics.push(Diagnostic::error("unknown-field", path, message));
            },
        }
    }
}

fn check_config_values(config: &HelplineConfig, diagnostics: &mut Vec<Diagnostic>) {
    let tz = config.automation.timezone.trim();
    if !tz.is_empty() && tz != "local" && tz.parse::<chrono_tz::Tz>().is_err() {
        diagnostics.push(Diagnostic::error(
            "value",
            "automation.timezone",
            format!("unknown timezone \"{tz}\""),
        ));
    }

    if config.automation.debounce_ms == 0 {
        diagnostics.push(Diagnostic::warning(
            "value",
            "automation.debounce_ms",
            "0 disables coalescing; every out-of-hours event sends a reply",
        ));
    }

    if config.automation.max_option_depth == 0 {
        diagnostics.push(Diagnostic::error(
            "value",
            "automation.max_option_depth",
            "must be at least 1",
        ));
    }

    match config.metrics.listen.as_deref() {
        Some(addr) if addr.parse::<SocketAddr>().is_err() => {
            diagnostics.push(Diagnostic::error(
                "value",
                "metrics.listen",
                format!("\"{addr}\" is not a socket address"),
            ));
        },
        None if config.metrics.enabled => diagnostics.push(Diagnostic::info(
            "value",
            "metrics.listen",
            "metrics enabled without a listen address; nothing is exported",
        )),
        _ => {},
    }
}

// ── Catalog validation ──────────────────────────────────────────────────────

static COLOR_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^#[0-9a-fA-F]{3,6}$").ok());

const WEEKDAYS: &[&str] = &[
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

/// Check a catalog before it is written.
#[must_use]
pub fn validate_catalog(catalog: &Catalog, max_depth: usize) -> ValidationResult {
    let mut diagnostics = Vec::new();
    check_queues(catalog, &mut diagnostics);
    check_connections(catalog, &mut diagnostics);
    check_options(catalog, max_depth, &mut diagnostics);
    check_settings(catalog, &mut diagnostics);
    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

/// Reject the catalog with [`Error::Validation`] if it has any error.
pub fn ensure_valid_catalog(catalog: &Catalog, max_depth: usize) -> Result<()> {
    validate_catalog(catalog, max_depth).into_result()
}

fn check_queues(catalog: &Catalog, diagnostics: &mut Vec<Diagnostic>) {
    let mut ids = HashSet::new();
    let mut names = HashSet::new();
    let mut colors = HashSet::new();

    for (i, queue) in catalog.queues.iter().enumerate() {
        let path = format!("queues[{i}]");
        if !ids.insert(queue.id) {
            diagnostics.push(Diagnostic::error(
                "queue",
                format!("{path}.id"),
                format!("duplicate queue id {}", queue.id),
            ));
        }

        let name = queue.name.trim();
        if name.chars().count() < 2 {
            diagnostics.push(Diagnostic::error(
                "queue",
                format!("{path}.name"),
                "name must have at least 2 characters",
            ));
        } else if !names.insert(name.to_lowercase()) {
            diagnostics.push(Diagnostic::error(
                "queue",
                format!("{path}.name"),
                format!("queue name \"{name}\" is already used"),
            ));
        }

        let color = queue.color.trim();
        let well_formed = COLOR_RE.as_ref().is_some_and(|re| re.is_match(color));
        if !well_formed {
            diagnostics.push(Diagnostic::error(
                "queue",
                format!("{path}.color"),
                format!("\"{color}\" is not a hex color like #a1b2c3"),
            ));
        } else if !colors.insert(color.to_lowercase()) {
            diagnostics.push(Diagnostic::error(
                "queue",
                format!("{path}.color"),
                format!("color {color} is already used by another queue"),
            ));
        }
    }
}

fn check_connections(catalog: &Catalog, diagnostics: &mut Vec<Diagnostic>) {
    let queue_ids: HashSet<_> = catalog.queues.iter().map(|q| q.id).collect();
    let mut ids = HashSet::new();

    for (i, entry) in catalog.connections.iter().enumerate() {
        let path = format!("connections[{i}]");
        let connection = &entry.connection;
        if !ids.insert(connection.id) {
            diagnostics.push(Diagnostic::error(
                "connection",
                format!("{path}.id"),
                format!("duplicate connection id {}", connection.id),
            ));
        }
        if connection.name.trim().is_empty() {
            diagnostics.push(Diagnostic::warning(
                "connection",
                format!("{path}.name"),
                "connection has no name",
            ));
        }

        let mut seen = HashSet::new();
        for queue_id in &entry.queue_ids {
            if !queue_ids.contains(queue_id) {
                diagnostics.push(Diagnostic::error(
                    "connection",
                    format!("{path}.queues"),
                    format!("unknown queue id {queue_id}"),
                ));
            }
            if !seen.insert(*queue_id) {
                diagnostics.push(Diagnostic::error(
                    "connection",
                    format!("{path}.queues"),
                    format!("queue {queue_id} is listed twice"),
                ));
            }
        }

        match entry.queue_ids.len() {
            0 => diagnostics.push(Diagnostic::info(
                "connection",
                format!("{path}.queues"),
                "no queues; tickets stay unassigned",
            )),
            1 => {},
            _ if connection.greeting.is_none() => diagnostics.push(Diagnostic::error(
                "connection",
                format!("{path}.greeting"),
                "a greeting is required when more than one queue is offered",
            )),
            _ => {},
        }
    }
}

fn check_options(catalog: &Catalog, max_depth: usize, diagnostics: &mut Vec<Diagnostic>) {
    let queue_ids: HashSet<_> = catalog.queues.iter().map(|q| q.id).collect();
    let mut by_id = HashMap::new();
    for (i, option) in catalog.options.iter().enumerate() {
        if by_id.insert(option.id, option).is_some() {
            diagnostics.push(Diagnostic::error(
                "option",
                format!("options[{i}].id"),
                format!("duplicate option id {}", option.id),
            ));
        }
    }

    let mut siblings = HashSet::new();
    for (i, option) in catalog.options.iter().enumerate() {
        let path = format!("options[{i}]");
        if !queue_ids.contains(&option.queue_id) {
            diagnostics.push(Diagnostic::error(
                "option",
                format!("{path}.queue"),
                format!("unknown queue id {}", option.queue_id),
            ));
        }
        if option.title.trim().is_empty() {
            diagnostics.push(Diagnostic::error(
                "option",
                format!("{path}.title"),
                "title is required",
            ));
        }
        if option.ordinal.is_empty() {
            diagnostics.push(Diagnostic::error(
                "option",
                format!("{path}.ordinal"),
                "ordinal is required",
            ));
        } else if !siblings.insert((option.queue_id, option.parent_id, option.ordinal.as_str())) {
            diagnostics.push(Diagnostic::error(
                "option",
                format!("{path}.ordinal"),
                format!("ordinal \"{}\" is used by a sibling", option.ordinal),
            ));
        }

        if let Some(parent_id) = option.parent_id {
            match by_id.get(&parent_id) {
                None => diagnostics.push(Diagnostic::error(
                    "option",
                    format!("{path}.parent"),
                    format!("unknown parent option {parent_id}"),
                )),
                Some(parent) if parent.queue_id != option.queue_id => {
                    diagnostics.push(Diagnostic::error(
                        "option",
                        format!("{path}.parent"),
                        format!(
                            "parent option {parent_id} belongs to queue {}, not {}",
                            parent.queue_id, option.queue_id
                        ),
                    ));
                },
                Some(_) => {},
            }
        }

        if !parent_chain_terminates(option.id, &by_id, max_depth) {
            diagnostics.push(Diagnostic::error(
                "option",
                format!("{path}.parent"),
                format!("parent chain is cyclic or deeper than {max_depth}"),
            ));
        }
    }
}

/// Walk parents with a depth counter. Dangling parents end the walk; they are
/// reported separately.
fn parent_chain_terminates(
    start: OptionId,
    by_id: &HashMap<OptionId, &helpline_common::types::QueueOption>,
    max_depth: usize,
) -> bool {
    let mut current = by_id.get(&start).and_then(|o| o.parent_id);
    let mut depth = 0;
    while let Some(id) = current {
        depth += 1;
        if id == start || depth > max_depth {
            return false;
        }
        current = by_id.get(&id).and_then(|o| o.parent_id);
    }
    true
}

fn check_settings(catalog: &Catalog, diagnostics: &mut Vec<Diagnostic>) {
    for (key, value) in &catalog.settings {
        match key.as_str() {
            setting_keys::SCHEDULES => check_schedules(value, diagnostics),
            setting_keys::QUEUES_OPTION_TYPE => {
                if value.parse::<ChooserMode>().is_err() {
                    diagnostics.push(Diagnostic::error(
                        "setting",
                        "settings.queues_option_type",
                        format!("\"{value}\" is neither buttons nor list"),
                    ));
                }
            },
            _ => {},
        }
    }
}

fn check_schedules(raw: &str, diagnostics: &mut Vec<Diagnostic>) {
    let entries: Vec<ScheduleEntry> = match serde_json::from_str(raw) {
        Ok(entries) => entries,
        Err(e) => {
            diagnostics.push(Diagnostic::error(
                "setting",
                "settings.schedules",
                format!("not a schedule list: {e}"),
            ));
            return;
        },
    };

    let mut days = HashSet::new();
    for (i, entry) in entries.iter().enumerate() {
        let path = format!("settings.schedules[{i}]");
        let day = entry.weekday_en.trim().to_lowercase();
        if !WEEKDAYS.contains(&day.as_str()) {
            let message = match suggest(&day, WEEKDAYS, 2) {
                Some(s) => format!("unknown weekday \"{day}\" (did you mean \"{s}\"?)"),
                None => format!("unknown weekday \"{day}\""),
            };
            diagnostics.push(Diagnostic::error("setting", path, message));
            continue;
        }
        if !days.insert(day.clone()) {
            diagnostics.push(Diagnostic::warning(
                "setting",
                path.clone(),
                format!("{day} is listed more than once; the first entry wins"),
            ));
        }
        if entry.window_minutes().is_none() {
            diagnostics.push(Diagnostic::error(
                "setting",
                path,
                "start_time and end_time must be HH:MM",
            ));
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        helpline_common::types::{Connection, ConnectionEntry, Queue, QueueOption},
        rstest::rstest,
    };

    fn queue(id: i64, name: &str, color: &str) -> Queue {
        Queue {
            id,
            name: name.into(),
            color: color.into(),
            greeting: None,
            chooser: ChooserMode::Buttons,
            media: None,
        }
    }

    fn option(id: i64, queue_id: i64, parent_id: Option<i64>, ordinal: &str) -> QueueOption {
        QueueOption {
            id,
            queue_id,
            parent_id,
            ordinal: ordinal.into(),
            title: format!("Option {id}"),
            message: None,
            chooser: ChooserMode::Buttons,
            media: None,
            finalize: false,
        }
    }

    fn connection(queue_ids: Vec<i64>, greeting: Option<&str>) -> ConnectionEntry {
        ConnectionEntry {
            connection: Connection {
                id: 1,
                name: "Main".into(),
                greeting: greeting.map(Into::into),
                ..Default::default()
            },
            queue_ids,
        }
    }

    fn valid_catalog() -> Catalog {
        Catalog {
            connections: vec![connection(vec![1, 2], Some("Hi"))],
            queues: vec![queue(1, "Sales", "#f00"), queue(2, "Support", "#00ff00")],
            options: vec![
                option(10, 1, None, "1"),
                option(11, 1, None, "2"),
                option(12, 1, Some(10), "1"),
            ],
            settings: vec![(
                setting_keys::SCHEDULES.into(),
                r#"[{"weekdayEn":"monday","startTime":"08:00","endTime":"24:00"}]"#.into(),
            )],
        }
    }

    fn errors_at(result: &ValidationResult, path: &str) -> usize {
        result
            .diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error && d.path == path)
            .count()
    }

    #[test]
    fn valid_catalog_has_no_errors() {
        let result = validate_catalog(&valid_catalog(), 32);
        assert!(!result.has_errors(), "{:?}", result.diagnostics);
    }

    #[test]
    fn greeting_required_for_multiple_queues() {
        let mut catalog = valid_catalog();
        catalog.connections = vec![connection(vec![1, 2], None)];
        let err = ensure_valid_catalog(&catalog, 32).unwrap_err();
        assert!(err.to_string().contains("greeting is required"), "{err}");
        assert!(matches!(err, Error::Validation { .. }));

        catalog.connections = vec![connection(vec![1], None)];
        assert!(ensure_valid_catalog(&catalog, 32).is_ok());
    }

    #[rstest]
    #[case("#abc", 0)]
    #[case("#A1B2C3", 0)]
    #[case("red", 1)]
    #[case("#abcdefg", 1)]
    #[case("#ab", 1)]
    fn queue_color_must_be_hex(#[case] color: &str, #[case] expected: usize) {
        let mut catalog = valid_catalog();
        catalog.queues[0].color = color.into();
        let result = validate_catalog(&catalog, 32);
        assert_eq!(errors_at(&result, "queues[0].color"), expected);
    }

    #[test]
    fn queue_names_and_colors_are_unique() {
        let mut catalog = valid_catalog();
        catalog.queues[1].name = "sales".into();
        catalog.queues[1].color = "#F00".into();
        let result = validate_catalog(&catalog, 32);
        assert_eq!(errors_at(&result, "queues[1].name"), 1);
        assert_eq!(errors_at(&result, "queues[1].color"), 1);

        catalog.queues[1].name = "X".into();
        let result = validate_catalog(&catalog, 32);
        assert!(
            result.diagnostics[..]
                .iter()
                .any(|d| d.message.contains("at least 2"))
        );
    }

    #[test]
    fn cyclic_parent_chain_is_rejected() {
        let mut catalog = valid_catalog();
        catalog.options = vec![
            option(10, 1, Some(12), "1"),
            option(11, 1, Some(10), "1"),
            option(12, 1, Some(11), "1"),
        ];
        let result = validate_catalog(&catalog, 32);
        let cyclic = result
            .diagnostics
            .iter()
            .filter(|d| d.message.contains("cyclic"))
            .count();
        assert_eq!(cyclic, 3);
    }

    #[test]
    fn depth_guard_limits_long_chains() {
        let mut catalog = valid_catalog();
        catalog.options = (0..5)
            .map(|i| option(100 + i, 1, (i > 0).then(|| 99 + i), "1"))
            .collect();
        assert!(!validate_catalog(&catalog, 4).has_errors());
        assert!(validate_catalog(&catalog, 3).has_errors());
    }

    #[test]
    fn parent_must_share_queue() {
        let mut catalog = valid_catalog();
        catalog.options.push(option(13, 2, Some(10), "1"));
        let result = validate_catalog(&catalog, 32);
        assert_eq!(errors_at(&result, "options[3].parent"), 1);
    }

    #[test]
    fn sibling_ordinals_are_unique() {
        let mut catalog = valid_catalog();
        catalog.options.push(option(13, 1, None, "2"));
        let result = validate_catalog(&catalog, 32);
        assert_eq!(errors_at(&result, "options[3].ordinal"), 1);
    }

    #[test]
    fn schedule_typos_get_suggestions() {
        let mut catalog = valid_catalog();
        catalog.settings = vec![(
            setting_keys::SCHEDULES.into(),
            r#"[{"weekdayEn":"mondy","startTime":"08:00","endTime":"18:00"},
                {"weekdayEn":"friday","startTime":"8am","endTime":"18:00"}]"#
                .into(),
        )];
        let result = validate_catalog(&catalog, 32);
        let day = result
            .diagnostics
            .iter()
            .find(|d| d.path == "settings.schedules[0]")
            .unwrap();
        assert!(day.message.contains("did you mean \"monday\""));
        assert_eq!(errors_at(&result, "settings.schedules[1]"), 1);
    }

    #[test]
    fn unknown_config_key_suggests_fix() {
        let result = validate_toml_str("[automation]\ndebounce = 10\n");
        let d = result
            .diagnostics
            .iter()
            .find(|d| d.category == "unknown-field")
            .unwrap();
        assert_eq!(d.path, "automation.debounce");
        assert!(d.message.contains("debounce_ms"));
    }

    #[test]
    fn bad_timezone_and_listen_address_are_errors() {
        let result = validate_toml_str(
            "[automation]\ntimezone = \"Mars/Olympus\"\n[metrics]\nlisten = \"nope\"\n",
        );
        assert_eq!(result.count(Severity::Error), 2);
    }

    #[test]
    fn empty_config_is_valid() {
        assert!(validate_toml_str("").diagnostics.is_empty());
    }

    #[test]
    fn levenshtein_counts_edits() {
        assert_eq!(levenshtein("friday", "friday"), 0);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("tuesdy", "tuesday"), 1);
    }
}
