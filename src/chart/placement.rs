//! Queue of rendered charts waiting for their anchor paragraph.

use super::{Anchor, AnchorMode};
use std::path::PathBuf;

/// Punctuation that ends a paragraph segment. The mark stays with the
/// segment before it.
const SEGMENT_MARKS: &[char] = &['，', '。', '；', '：', '！', '？', '、'];

/// A rendered chart waiting to be placed.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingChart {
    pub anchor: Anchor,
    /// Rendered image file
    pub image: PathBuf,
    pub title: String,
}

impl PendingChart {
    pub fn new(anchor: Anchor, image: impl Into<PathBuf>, title: impl Into<String>) -> Self {
        Self {
            anchor,
            image: image.into(),
            title: title.into(),
        }
    }

    pub fn is_before(&self) -> bool {
        self.anchor.mode == AnchorMode::Before
    }
}

/// How an anchor matched a paragraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// Anchor text found in the whole paragraph
    Full,
    /// Anchor text found in one punctuation-delimited segment
    Segment,
}

/// Ordered queue of pending charts.
///
/// Entries leave the queue exactly once: either through
/// [`take_matches`](Self::take_matches) or [`drain_remaining`](Self::drain_remaining).
#[derive(Debug, Clone, Default)]
pub struct PendingCharts {
    entries: Vec<PendingChart>,
}

impl PendingCharts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chart: PendingChart) {
        self.entries.push(chart);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingChart> {
        self.entries.iter()
    }

    /// Remove and return, in queue order, every entry whose anchor matches
    /// the paragraph text.
    pub fn take_matches(&mut self, paragraph: &str) -> Vec<PendingChart> {
        if self.entries.is_empty() || paragraph.trim().is_empty() {
            return Vec::new();
        }

        let matched: Vec<usize> = self
            .entries
            .iter()
            .enumerate()
            .filter_map(|(i, entry)| {
                let kind = match_anchor(&entry.anchor.text, paragraph)?;
                log::debug!("Chart {:?} matched ({:?})", entry.title, kind);
                Some(i)
            })
            .collect();

        // Remove back to front so earlier indices stay valid.
        let mut taken: Vec<PendingChart> = matched
            .iter()
            .rev()
            .map(|&i| self.entries.remove(i))
            .collect();
        taken.reverse();
        taken
    }

    /// Remove and return every remaining entry.
    pub fn drain_remaining(&mut self) -> Vec<PendingChart> {
        std::mem::take(&mut self.entries)
    }
}

impl FromIterator<PendingChart> for PendingCharts {
    fn from_iter<I: IntoIterator<Item = PendingChart>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Two-tier match of anchor text against a paragraph.
pub fn match_anchor(target: &str, paragraph: &str) -> Option<MatchKind> {
    let target = target.trim();
    if target.is_empty() {
        return None;
    }
    if paragraph.contains(target) {
        return Some(MatchKind::Full);
    }
    segments(paragraph)
        .iter()
        .any(|segment| segment.trim().contains(target))
        .then_some(MatchKind::Segment)
}

/// Split text after each segment mark, keeping the mark.
pub fn segments(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    for (i, c) in text.char_indices() {
        if SEGMENT_MARKS.contains(&c) {
            let end = i + c.len_utf8();
            out.push(&text[start..end]);
            start = end;
        }
    }
    if start < text.len() {
        out.push(&text[start..]);
    }
    out
}
