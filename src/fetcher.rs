use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::anyhow;
use futures::stream::{self, StreamExt};
use log::{debug, error, info, warn};
use scraper::{Html, Selector};

use crate::{
    browser::{PageSession, PageSource},
    config::ScrapingConfig,
    match_record::{MatchTable, parse_events},
    scrape_error::ScrapeError,
    text_manipulators::extract_text,
};

/// Bounds on how long we keep waiting for the odds widget to show up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub deadline: Duration,
}

impl PollPolicy {
    /// Delay before retrying after `attempt` (1-based) came back empty.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// Text of every element matching `selector`, in document order.
pub fn extract_event_texts(html: &str, selector: &str) -> anyhow::Result<Vec<String>> {
    let selector =
        Selector::parse(selector).map_err(|e| anyhow!("bad selector {selector:?}: {e}"))?;
    let document = Html::parse_document(html);
    Ok(document
        .select(&selector)
        .map(extract_text)
        .filter(|text| !text.is_empty())
        .collect())
}

fn deadline_exceeded(url: &str, elapsed: Duration) -> anyhow::Error {
    ScrapeError::DeadlineExceeded {
        url: url.to_string(),
        elapsed,
    }
    .into()
}

/// Re-reads the page until at least one event block is found or the policy
/// runs out.
pub fn poll_event_texts<S: PageSession>(
    session: &S,
    url: &str,
    selector: &str,
    policy: &PollPolicy,
) -> anyhow::Result<Vec<String>> {
    let started = Instant::now();
    for attempt in 1..=policy.max_attempts {
        let html = session.rendered_html()?;
        let texts = extract_event_texts(&html, selector)?;
        if !texts.is_empty() {
            debug!("{url}: {} events on attempt {attempt}", texts.len());
            return Ok(texts);
        }

        // Reads can block on the browser, so the deadline counts them too.
        let elapsed = started.elapsed();
        if elapsed >= policy.deadline {
            return Err(deadline_exceeded(url, elapsed));
        }
        if attempt == policy.max_attempts {
            break;
        }
        let delay = policy.backoff(attempt);
        if elapsed + delay > policy.deadline {
            return Err(deadline_exceeded(url, elapsed));
        }
        debug!("{url}: no events yet, retrying in {delay:?}");
        std::thread::sleep(delay);
    }
    Err(ScrapeError::NoEvents {
        url: url.to_string(),
        attempts: policy.max_attempts,
    }
    .into())
}

/// Scrapes a single page. Blocks; the browser lives for the duration of the
/// call.
pub fn fetch_url<S: PageSource>(
    source: &S,
    url: &str,
    config: &ScrapingConfig,
) -> anyhow::Result<MatchTable> {
    let session = source.open(url)?;
    let texts = poll_event_texts(&session, url, &config.event_selector, &config.poll_policy())?;
    let table = parse_events(&texts);
    if table.len() < texts.len() {
        warn!(
            "{url}: kept {} of {} events, the rest did not look like match rows",
            table.len(),
            texts.len()
        );
    }
    Ok(table)
}

#[derive(Debug, Default)]
pub struct ScrapeOutcome {
    pub table: MatchTable,
    pub failed_urls: Vec<String>,
}

/// Fetches every URL with at most `config.worker_count()` browsers alive at
/// once. Rows are appended in completion order; a failed URL only shows up in
/// `failed_urls`.
pub async fn scrape_all<S: PageSource>(
    source: Arc<S>,
    urls: &[String],
    config: &ScrapingConfig,
) -> ScrapeOutcome {
    let mut tasks = stream::iter(urls.iter().cloned())
        .map(|url| {
            let source = Arc::clone(&source);
            let config = config.clone();
            async move {
                let task_url = url.clone();
                let joined = tokio::task::spawn_blocking(move || {
                    fetch_url(source.as_ref(), &task_url, &config)
                })
                .await;
                (url, joined)
            }
        })
        .buffer_unordered(config.worker_count());

    let mut outcome = ScrapeOutcome::default();
    while let Some((url, joined)) = tasks.next().await {
        match joined {
            Ok(Ok(table)) => {
                info!("{url}: {} matches", table.len());
                outcome.table.append(table);
            }
            Ok(Err(e)) => {
                error!("{url} generated an exception: {e:#}");
                outcome.failed_urls.push(url);
            }
            Err(e) => {
                error!("{url} worker died: {e}");
                outcome.failed_urls.push(url);
            }
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Scripted {
        pages: Vec<&'static str>,
        calls: Cell<usize>,
    }

    impl PageSession for Scripted {
        fn rendered_html(&self) -> anyhow::Result<String> {
            let i = self.calls.get();
            self.calls.set(i + 1);
            Ok(self.pages[i.min(self.pages.len() - 1)].to_string())
        }
    }

    fn quick_policy(max_attempts: u32) -> PollPolicy {
        PollPolicy {
            max_attempts,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            deadline: Duration::from_secs(5),
        }
    }

    const LOADING: &str = "<html><body><div class='spinner'></div></body></html>";
    const RENDERED: &str = "<html><body><ms-event><div>Bahia</div><div>Vitória</div></ms-event></body></html>";

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = PollPolicy {
            max_attempts: 10,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(3),
            deadline: Duration::from_secs(60),
        };
        assert_eq!(policy.backoff(1), Duration::from_millis(500));
        assert_eq!(policy.backoff(2), Duration::from_secs(1));
        assert_eq!(policy.backoff(3), Duration::from_secs(2));
        assert_eq!(policy.backoff(4), Duration::from_secs(3));
        assert_eq!(policy.backoff(40), Duration::from_secs(3));
    }

    #[test]
    fn extracts_each_event_block() {
        let texts = extract_event_texts(RENDERED, "ms-event").unwrap();
        assert_eq!(texts, vec!["Bahia\nVitória".to_string()]);
        assert!(extract_event_texts(LOADING, "ms-event").unwrap().is_empty());
        assert!(extract_event_texts(LOADING, "[[").is_err());
    }

    #[test]
    fn polls_until_events_render() {
        let session = Scripted {
            pages: vec![LOADING, LOADING, RENDERED],
            calls: Cell::new(0),
        };
        let texts = poll_event_texts(&session, "u", "ms-event", &quick_policy(5)).unwrap();
        assert_eq!(texts.len(), 1);
        assert_eq!(session.calls.get(), 3);
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let session = Scripted {
            pages: vec![LOADING],
            calls: Cell::new(0),
        };
        let err = poll_event_texts(&session, "u", "ms-event", &quick_policy(4)).unwrap_err();
        assert_eq!(session.calls.get(), 4);
        assert!(matches!(
            err.downcast_ref::<ScrapeError>(),
            Some(ScrapeError::NoEvents { attempts: 4, .. })
        ));
    }

    struct SlowPage;

    impl PageSession for SlowPage {
        fn rendered_html(&self) -> anyhow::Result<String> {
            std::thread::sleep(Duration::from_millis(30));
            Ok(LOADING.to_string())
        }
    }

    #[test]
    fn slow_reads_count_against_the_deadline() {
        let policy = PollPolicy {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            deadline: Duration::from_millis(20),
        };
        let err = poll_event_texts(&SlowPage, "u", "ms-event", &policy).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ScrapeError>(),
            Some(ScrapeError::DeadlineExceeded { elapsed, .. }) if *elapsed >= policy.deadline
        ));
    }

    #[test]
    fn gives_up_at_deadline() {
        let session = Scripted {
            pages: vec![LOADING],
            calls: Cell::new(0),
        };
        let policy = PollPolicy {
            max_attempts: 100,
            initial_backoff: Duration::from_secs(10),
            max_backoff: Duration::from_secs(10),
            deadline: Duration::from_secs(1),
        };
        let err = poll_event_texts(&session, "u", "ms-event", &policy).unwrap_err();
        assert_eq!(session.calls.get(), 1);
        assert!(matches!(
            err.downcast_ref::<ScrapeError>(),
            Some(ScrapeError::DeadlineExceeded { .. })
        ));
    }
}
