use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, de::DeserializeOwned};

use crate::fetcher::PollPolicy;

const DEFAULT_URL: &str = "https://sports.sportingbet.com/pt-br/sports/futebol-4";

/// The env vars needed for scraping.
#[derive(Debug, Clone, Deserialize)]
pub struct ScrapingConfig {
    #[serde(default = "default_urls")]
    pub scrape_urls: Vec<String>,
    #[serde(default = "default_event_selector")]
    pub event_selector: String,
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    #[serde(default = "default_poll_max_attempts")]
    pub poll_max_attempts: u32,
    #[serde(default = "default_poll_initial_backoff_ms")]
    pub poll_initial_backoff_ms: u64,
    #[serde(default = "default_poll_max_backoff_ms")]
    pub poll_max_backoff_ms: u64,
    #[serde(default = "default_poll_deadline_secs")]
    pub poll_deadline_secs: u64,
    #[serde(default = "default_page_load_timeout_secs")]
    pub page_load_timeout_secs: u64,
    #[serde(default = "default_element_wait_secs")]
    pub element_wait_secs: u64,
    #[serde(default = "default_browser_headless")]
    pub browser_headless: bool,
}

impl ScrapingConfig {
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            max_attempts: self.poll_max_attempts.max(1),
            initial_backoff: Duration::from_millis(self.poll_initial_backoff_ms),
            max_backoff: Duration::from_millis(self.poll_max_backoff_ms),
            deadline: Duration::from_secs(self.poll_deadline_secs),
        }
    }

    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_secs(self.page_load_timeout_secs)
    }

    /// How long one read of the page waits for the event selector to appear.
    pub fn element_wait(&self) -> Duration {
        Duration::from_secs(self.element_wait_secs)
    }

    /// Pool capacity; never zero, otherwise no fetch would ever be polled.
    pub fn worker_count(&self) -> usize {
        self.max_workers.max(1)
    }
}

/// Where the rendered table image goes.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_report_image_path")]
    pub report_image_path: PathBuf,
}

/// The env vars needed for mailing the report. Credentials and recipient
/// have no defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct MailingConfig {
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub mail_from: Option<String>,
    pub mail_to: String,
    #[serde(default = "default_mail_subject")]
    pub mail_subject: String,
    #[serde(default = "default_mail_body")]
    pub mail_body: String,
}

impl MailingConfig {
    /// Sender address, falling back to the SMTP login.
    pub fn sender(&self) -> &str {
        self.mail_from
            .as_deref()
            .filter(|from| !from.trim().is_empty())
            .unwrap_or(&self.smtp_username)
    }
}

fn default_urls() -> Vec<String> {
    vec![DEFAULT_URL.to_string()]
}

fn default_event_selector() -> String {
    "ms-event".to_string()
}

fn default_max_workers() -> usize {
    5
}

fn default_poll_max_attempts() -> u32 {
    10
}

fn default_poll_initial_backoff_ms() -> u64 {
    500
}

fn default_poll_max_backoff_ms() -> u64 {
    8_000
}

fn default_poll_deadline_secs() -> u64 {
    120
}

fn default_page_load_timeout_secs() -> u64 {
    30
}

fn default_element_wait_secs() -> u64 {
    10
}

fn default_browser_headless() -> bool {
    true
}

fn default_report_image_path() -> PathBuf {
    PathBuf::from("table_image.png")
}

fn default_smtp_host() -> String {
    "smtp.office365.com".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_mail_subject() -> String {
    "Dados dos Jogos de Futebol".to_string()
}

fn default_mail_body() -> String {
    "Por favor, encontre em anexo os dados dos jogos de futebol.".to_string()
}

/// Fills any of the config structs above from `KEY=value` pairs.
pub trait LoadFromEnv: DeserializeOwned {
    fn load_from_vars<I>(vars: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter::<_, Self>(vars).with_context(|| {
            format!("failed to read {} from env", std::any::type_name::<Self>())
        })
    }

    /// Process environment, with `.env` layered underneath when present.
    fn load_from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();
        Self::load_from_vars(std::env::vars())
    }
}

impl<T: DeserializeOwned> LoadFromEnv for T {}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn scraping_config_defaults() {
        let config: ScrapingConfig = LoadFromEnv::load_from_vars(vars(&[])).unwrap();
        assert_eq!(config.scrape_urls, vec![DEFAULT_URL.to_string()]);
        assert_eq!(config.event_selector, "ms-event");
        assert_eq!(config.worker_count(), 5);
        assert!(config.browser_headless);
        assert_eq!(config.element_wait(), Duration::from_secs(10));

        let policy = config.poll_policy();
        assert_eq!(policy.max_attempts, 10);
        assert_eq!(policy.initial_backoff, Duration::from_millis(500));
        assert_eq!(policy.deadline, Duration::from_secs(120));
    }

    #[test]
    fn scraping_urls_are_comma_separated() {
        let config: ScrapingConfig = LoadFromEnv::load_from_vars(vars(&[
            ("SCRAPE_URLS", "https://a.example/odds,https://b.example/odds"),
            ("MAX_WORKERS", "0"),
        ]))
        .unwrap();
        assert_eq!(
            config.scrape_urls,
            vec!["https://a.example/odds", "https://b.example/odds"]
        );
        assert_eq!(config.worker_count(), 1);
    }

    #[test]
    fn element_wait_is_independent_of_backoff() {
        let config = ScrapingConfig::load_from_vars(vars(&[
            ("POLL_MAX_BACKOFF_MS", "0"),
            ("ELEMENT_WAIT_SECS", "4"),
        ]))
        .unwrap();
        assert_eq!(config.poll_policy().max_backoff, Duration::ZERO);
        assert_eq!(config.element_wait(), Duration::from_secs(4));
    }

    #[test]
    fn mailing_config_requires_credentials() {
        let missing = MailingConfig::load_from_vars(vars(&[("MAIL_TO", "a@b.com")])).unwrap_err();
        assert!(format!("{missing:#}").contains("MailingConfig"));

        let config: MailingConfig = LoadFromEnv::load_from_vars(vars(&[
            ("SMTP_USERNAME", "bot@hotmail.com"),
            ("SMTP_PASSWORD", "hunter2"),
            ("MAIL_TO", "me@gmail.com"),
        ]))
        .unwrap();
        assert_eq!(config.smtp_host, "smtp.office365.com");
        assert_eq!(config.smtp_port, 587);
        assert_eq!(config.sender(), "bot@hotmail.com");

        let blank_from = MailingConfig {
            mail_from: Some(String::new()),
            ..config
        };
        assert_eq!(blank_from.sender(), "bot@hotmail.com");
    }

    #[test]
    fn report_path_default() {
        let config: ReportConfig = LoadFromEnv::load_from_vars(vars(&[])).unwrap();
        assert_eq!(config.report_image_path, PathBuf::from("table_image.png"));
    }
}
