//! Process configuration schema (database, media, automation, reply texts, metrics).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HelplineConfig {
    pub database: DatabaseConfig,
    pub media: MediaConfig,
    pub automation: AutomationConfig,
    pub replies: ReplyTexts,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// sqlx connection URL. Defaults to `<data_dir>/helpline.db`.
    pub url: Option<String>,
}

impl DatabaseConfig {
    /// The configured URL, or a create-if-missing SQLite file under `data_dir`.
    #[must_use]
    pub fn resolved_url(&self, data_dir: &Path) -> String {
        match self.url.as_deref() {
            Some(url) if !url.trim().is_empty() => url.to_string(),
            _ => format!("sqlite:{}?mode=rwc", data_dir.join("helpline.db").display()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Where inbound media is written. Defaults to `<data_dir>/media`.
    pub dir: Option<PathBuf>,
}

impl MediaConfig {
    #[must_use]
    pub fn resolved_dir(&self, data_dir: &Path) -> PathBuf {
        self.dir.clone().unwrap_or_else(|| data_dir.join("media"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationConfig {
    /// Coalescing window for out-of-hours replies, per ticket.
    pub debounce_ms: u64,
    /// IANA timezone for business hours, or "local".
    pub timezone: String,
    /// Longest parent chain accepted when validating option trees.
    pub max_option_depth: usize,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 3_000,
            timezone: "local".into(),
            max_option_depth: 32,
        }
    }
}

/// Fixed phrases sent by the automation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplyTexts {
    /// Chooser body when a queue or option has no message of its own.
    pub menu_placeholder: String,
    pub list_title: String,
    pub list_text: String,
    pub list_section: String,
    /// Header of the single-button chooser sent after the root menu.
    pub more_options: String,
    /// Header of the navigation chooser sent after a node's menu.
    pub other_options: String,
    pub home_label: String,
    pub back_label: String,
    pub agent_label: String,
    /// Sent on hand-off to a human.
    pub please_wait: String,
    /// Sent when an open ticket moves between queues.
    pub transferred: String,
    /// Appended to the connection's rating prompt.
    pub rating_scale: String,
}

impl Default for ReplyTexts {
    fn default() -> Self {
        Self {
            menu_placeholder: "Escolha uma opção".into(),
            list_title: "Atendimento".into(),
            list_text: "Opções disponíveis".into(),
            list_section: "Escolha uma das opções".into(),
            more_options: "Mais Opções".into(),
            other_options: "Outras Opções".into(),
            home_label: "Menu inicial".into(),
            back_label: "Voltar".into(),
            agent_label: "Falar com o atendente".into(),
            please_wait: "Aguarde, você será atendido em instantes.".into(),
            transferred: "Você foi transferido, em breve iremos iniciar seu atendimento.".into(),
            rating_scale: "Digite de 1 à 3 para qualificar nosso atendimento:\n\
                           *1* - _Insatisfeito_\n*2* - _Satisfeito_\n*3* - _Muito Satisfeito_"
                .into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    /// Scrape endpoint address, e.g. "127.0.0.1:9464".
    pub listen: Option<String>,
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let cfg: HelplineConfig = toml::from_str(
            r#"
[automation]
timezone = "America/Sao_Paulo"

[replies]
please_wait = "Hold on"
"#,
        )
        .unwrap();
        assert_eq!(cfg.automation.timezone, "America/Sao_Paulo");
        assert_eq!(cfg.automation.debounce_ms, 3_000);
        assert_eq!(cfg.replies.please_wait, "Hold on");
        assert_eq!(cfg.replies.back_label, "Voltar");
    }

    #[test]
    fn database_url_defaults_under_data_dir() {
        let db = DatabaseConfig::default();
        let url = db.resolved_url(Path::new("/var/lib/helpline"));
        assert_eq!(url, "sqlite:/var/lib/helpline/helpline.db?mode=rwc");

        let db = DatabaseConfig {
            url: Some("sqlite::memory:".into()),
        };
        assert_eq!(db.resolved_url(Path::new("/x")), "sqlite::memory:");
    }

    #[test]
    fn rating_scale_lists_three_scores() {
        let scale = ReplyTexts::default().rating_scale;
        assert!(scale.starts_with("Digite de 1 à 3"));
        assert!(scale.contains("\n*1* - _Insatisfeito_\n*2*"));
        assert!(scale.ends_with("*3* - _Muito Satisfeito_"));
    }
}
