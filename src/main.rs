use std::sync::Arc;

use dotenv::dotenv;
use log::{LevelFilter, info};
use odds_mailer::{
    ChromeSource, LoadFromEnv, MailingConfig, ReportConfig, ScrapingConfig, SmtpMailer,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let scraping = ScrapingConfig::load_from_env()?;
    let report = ReportConfig::load_from_env()?;
    let mailing = MailingConfig::load_from_env()?;

    let source = Arc::new(ChromeSource::new(&scraping));
    let mailer = SmtpMailer::new(&mailing)?;

    let outcome = odds_mailer::run(source, &mailer, &scraping, &report, &mailing).await?;
    info!(
        "Done: {} matches, {} failed url(s)",
        outcome.table.len(),
        outcome.failed_urls.len()
    );
    Ok(())
}
