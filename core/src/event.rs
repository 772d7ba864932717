//! Calendar event record

use hal_abstractions::UtcInstant;
use heapless::String;

use crate::config::MAX_SUMMARY_LEN;

/// Bounded summary text
pub type Summary = String<MAX_SUMMARY_LEN>;

/// A future calendar event, immutable once built
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalendarEvent {
    start: UtcInstant,
    summary: Summary,
}

impl CalendarEvent {
    pub fn new(start: UtcInstant, summary: Summary) -> Self {
        Self { start, summary }
    }

    /// Start of the event
    pub fn start(&self) -> UtcInstant {
        self.start
    }

    pub fn summary(&self) -> &str {
        self.summary.as_str()
    }
}

/// Build a summary from raw field bytes
///
/// Invalid UTF-8 is cut at the last complete character. The text is
/// trimmed, then truncated on a character boundary to fit.
pub fn summary_from_bytes(raw: &[u8]) -> Summary {
    let text = match core::str::from_utf8(raw) {
        Ok(text) => text,
        // The prefix up to `valid_up_to` is valid by definition
        Err(e) => core::str::from_utf8(&raw[..e.valid_up_to()]).unwrap_or_default(),
    };
    let text = text.trim();

    let mut end = text.len().min(MAX_SUMMARY_LEN);
    while !text.is_char_boundary(end) {
        end -= 1;
    }

    let mut summary = Summary::new();
    // Cannot fail: `end <= MAX_SUMMARY_LEN`
    let _ = summary.push_str(text[..end].trim_end());
    summary
}
