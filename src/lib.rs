pub mod browser;
pub mod config;
pub mod fetcher;
pub mod mailer;
pub mod match_record;
pub mod pipeline;
pub mod render;
pub mod scrape_error;
pub mod text_manipulators;

pub use browser::{ChromeSource, PageSession, PageSource};
pub use config::{LoadFromEnv, MailingConfig, ReportConfig, ScrapingConfig};
pub use fetcher::{PollPolicy, ScrapeOutcome, fetch_url, scrape_all};
pub use mailer::{MailTransport, SmtpMailer, send_report};
pub use match_record::{COLUMNS, MatchRecord, MatchTable};
pub use pipeline::run;
pub use scrape_error::ScrapeError;
