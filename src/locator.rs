//! Active-span lookup over a set of lines.
//!
//! The locator keeps a copy of each line's span sorted by start time along with
//! the line's original index, so lookups are a binary search no matter how the
//! caller orders its lines. Spans are start-inclusive and end-exclusive.

use crate::model::Line;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Span {
    start: f64,
    end: f64,
    index: usize,
}

/// Sorted view of line spans for time lookups.
#[derive(Debug, Clone, Default)]
pub struct LineLocator {
    spans: Vec<Span>,
}

impl LineLocator {
    pub fn new(lines: &[Line]) -> Self {
        let mut spans: Vec<Span> = lines
            .iter()
            .enumerate()
            .map(|(index, line)| Span {
                start: line.start_time,
                end: line.end_time,
                index,
            })
            .collect();
        spans.sort_by(|a, b| a.start.total_cmp(&b.start).then(a.index.cmp(&b.index)));
        Self { spans }
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Original index of the line with `start <= t < end`, `None` in a gap.
    ///
    /// # Example
    /// ```
    /// use kara::{Line, LineLocator};
    ///
    /// let lines = vec![Line::new("a", 0.0, 5.0), Line::new("b", 5.0, 10.0)];
    /// let locator = LineLocator::new(&lines);
    /// assert_eq!(locator.active_line_index(5.0), Some(1));
    /// assert_eq!(locator.active_line_index(-1.0), None);
    /// ```
    pub fn active_line_index(&self, t: f64) -> Option<usize> {
        // Number of spans starting at or before t; the candidate is the last one.
        let upto = self.spans.partition_point(|s| s.start <= t);
        let span = self.spans.get(upto.checked_sub(1)?)?;
        (t < span.end).then_some(span.index)
    }

    /// Original indices of up to `n` lines starting after `t`, in time order.
    pub fn upcoming_lines(&self, t: f64, n: usize) -> Vec<usize> {
        self.spans
            .iter()
            .filter(|s| s.start > t)
            .take(n)
            .map(|s| s.index)
            .collect()
    }

    /// Seconds until the next line starts, `None` when no line starts after `t`.
    pub fn time_until_next_line(&self, t: f64) -> Option<f64> {
        self.spans.iter().find(|s| s.start > t).map(|s| s.start - t)
    }
}

/// One-off lookup without keeping a locator around.
pub fn active_line_index(lines: &[Line], t: f64) -> Option<usize> {
    LineLocator::new(lines).active_line_index(t)
}
