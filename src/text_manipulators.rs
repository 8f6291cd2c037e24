use std::sync::LazyLock;

use regex::Regex;
use scraper::ElementRef;

static LINE_BREAK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\n\r]").unwrap());
static COUNTER_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+$").unwrap());

/// Text content of an element, one non-blank text node per line.
pub fn extract_text(node: ElementRef) -> String {
    node.text()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Splits a raw event block into its usable lines. Blank lines and bare
/// integers (index and market counters) are dropped.
pub fn split_event_lines(text: &str) -> Vec<&str> {
    LINE_BREAK
        .split(text)
        .map(str::trim)
        .filter(|line| !line.is_empty() && !COUNTER_LINE.is_match(line))
        .collect()
}

/// "1,85" -> 1.85. Anything that isn't a plain number is `None`.
pub fn normalize_decimal(raw: &str) -> Option<f64> {
    raw.trim().replace(',', ".").parse::<f64>().ok()
}
