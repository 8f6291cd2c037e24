use std::time::Duration;

/// Why a page never produced any event blocks.
#[derive(Debug)]
pub enum ScrapeError {
    NoEvents { url: String, attempts: u32 },
    DeadlineExceeded { url: String, elapsed: Duration },
}

impl std::fmt::Display for ScrapeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScrapeError::NoEvents { url, attempts } => {
                write!(f, "no events found on {url} after {attempts} attempts")
            }
            ScrapeError::DeadlineExceeded { url, elapsed } => {
                write!(f, "gave up on {url} after {:.1}s", elapsed.as_secs_f64())
            }
        }
    }
}

impl std::error::Error for ScrapeError {}
