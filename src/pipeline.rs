use std::sync::Arc;

use log::{info, warn};

use crate::{
    browser::PageSource,
    config::{MailingConfig, ReportConfig, ScrapingConfig},
    fetcher::{ScrapeOutcome, scrape_all},
    mailer::{MailTransport, send_report},
    render::render_report,
};

/// One full run: scrape every configured URL, draw the table, mail it.
/// Fetch failures only shrink the table; rendering and mailing errors abort.
pub async fn run<S: PageSource, T: MailTransport>(
    source: Arc<S>,
    transport: &T,
    scraping: &ScrapingConfig,
    report: &ReportConfig,
    mailing: &MailingConfig,
) -> anyhow::Result<ScrapeOutcome> {
    info!("Scraping {} url(s)", scraping.scrape_urls.len());
    let outcome = scrape_all(source, &scraping.scrape_urls, scraping).await;
    if !outcome.failed_urls.is_empty() {
        warn!(
            "{} url(s) contributed no rows: {:?}",
            outcome.failed_urls.len(),
            outcome.failed_urls
        );
    }

    render_report(&outcome.table, &report.report_image_path)?;
    send_report(transport, mailing, &report.report_image_path).await?;

    print!("{}", outcome.table);
    Ok(outcome)
}
