//! Reading time estimation
//!
//! Headings and body text of every section are joined into one word stream;
//! the estimate is the word count divided by the reading rate, rounded up.
//! A post with no words still reads as one minute.

use serde::Serialize;
use std::fmt;

use super::post::Section;
use super::rich_text::as_text;

/// Average reading rate used when none is configured
pub const DEFAULT_WORDS_PER_MINUTE: usize = 200;

/// Smallest estimate ever reported, including for empty posts
pub const MIN_MINUTES: usize = 1;

/// Word count and the rounded-up minutes it takes to read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReadingTime {
    pub words: usize,
    pub minutes: usize,
}

impl fmt::Display for ReadingTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} min", self.minutes)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadingTimeEstimator {
    words_per_minute: usize,
}

impl Default for ReadingTimeEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_WORDS_PER_MINUTE)
    }
}

impl ReadingTimeEstimator {
    pub fn new(words_per_minute: usize) -> Self {
        Self {
            words_per_minute: words_per_minute.max(1),
        }
    }

    pub fn words_per_minute(&self) -> usize {
        self.words_per_minute
    }

    /// Estimate for the sections of a post
    pub fn estimate(&self, sections: &[Section]) -> ReadingTime {
        self.estimate_text(&word_stream(sections))
    }

    /// Estimate for arbitrary text
    pub fn estimate_text(&self, text: &str) -> ReadingTime {
        let words = text.split_whitespace().count();
        ReadingTime {
            words,
            minutes: self.minutes_for(words),
        }
    }

    pub fn minutes_for(&self, words: usize) -> usize {
        words.div_ceil(self.words_per_minute).max(MIN_MINUTES)
    }
}

/// Each heading followed by its flattened body, across all sections
pub fn word_stream(sections: &[Section]) -> String {
    let mut stream = String::new();
    for section in sections {
        stream.push_str(&section.heading);
        stream.push(' ');
        stream.push_str(&as_text(&section.body));
        stream.push(' ');
    }
    stream
}
