//! Slice-style page selections.
//!
//! A range is written like a slice: `":3"` is the first three pages, `"3:5"`
//! the fourth and fifth, `"0"` the first page, `"-1"` the last and `"::2"`
//! every other page. Indices are 0-based and the stop bound is exclusive.
//! Out-of-range bounds are clamped, so a range never fails on a short
//! document; it just selects fewer pages.

use crate::error::{CombineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PageRange {
    /// One page by index; negative counts from the end.
    Single(i64),
    Slice {
        start: Option<i64>,
        stop: Option<i64>,
        step: i64,
    },
}

impl PageRange {
    pub fn all() -> Self {
        PageRange::Slice {
            start: None,
            stop: None,
            step: 1,
        }
    }

    pub fn first(count: i64) -> Self {
        PageRange::Slice {
            start: None,
            stop: Some(count),
            step: 1,
        }
    }

    /// Resolve to 0-based page indices for a document of `len` pages.
    pub fn indices(&self, len: usize) -> Vec<usize> {
        let len = len as i64;

        match *self {
            PageRange::Single(index) => {
                let resolved = if index < 0 { index + len } else { index };
                if (0..len).contains(&resolved) {
                    vec![resolved as usize]
                } else {
                    Vec::new()
                }
            }
            PageRange::Slice { start, stop, step } => {
                let (lower, upper) = if step < 0 { (-1, len - 1) } else { (0, len) };

                let clamp = |bound: i64| {
                    if bound < 0 {
                        (bound + len).max(lower)
                    } else {
                        bound.min(upper)
                    }
                };

                let start = start.map(clamp).unwrap_or(if step < 0 { upper } else { lower });
                let stop = stop.map(clamp).unwrap_or(if step < 0 { lower } else { upper });

                let mut indices = Vec::new();
                let mut i = start;
                while (step > 0 && i < stop) || (step < 0 && i > stop) {
                    indices.push(i as usize);
                    match i.checked_add(step) {
                        Some(next) => i = next,
                        None => break,
                    }
                }
                indices
            }
        }
    }
}

impl FromStr for PageRange {
    type Err = CombineError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let invalid = |message: &str| CombineError::PageRange {
            range: s.to_string(),
            message: message.to_string(),
        };

        if trimmed.is_empty() {
            return Err(invalid("range is empty"));
        }

        let parse_bound = |part: &str| -> Result<Option<i64>> {
            let part = part.trim();
            if part.is_empty() {
                Ok(None)
            } else {
                part.parse::<i64>()
                    .map(Some)
                    .map_err(|_| invalid(&format!("'{}' is not an integer", part)))
            }
        };

        let parts: Vec<&str> = trimmed.split(':').collect();
        match parts.as_slice() {
            [single] => match parse_bound(single)? {
                Some(index) => Ok(PageRange::Single(index)),
                None => Err(invalid("range is empty")),
            },
            [start, stop] => Ok(PageRange::Slice {
                start: parse_bound(start)?,
                stop: parse_bound(stop)?,
                step: 1,
            }),
            [start, stop, step] => {
                let step = parse_bound(step)?.unwrap_or(1);
                if step == 0 {
                    return Err(invalid("step cannot be zero"));
                }
                Ok(PageRange::Slice {
                    start: parse_bound(start)?,
                    stop: parse_bound(stop)?,
                    step,
                })
            }
            _ => Err(invalid("expected at most three ':' separated parts")),
        }
    }
}

impl TryFrom<String> for PageRange {
    type Error = CombineError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<PageRange> for String {
    fn from(range: PageRange) -> Self {
        range.to_string()
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bound = |b: Option<i64>| b.map(|v| v.to_string()).unwrap_or_default();

        match *self {
            PageRange::Single(index) => write!(f, "{}", index),
            PageRange::Slice { start, stop, step: 1 } => {
                write!(f, "{}:{}", bound(start), bound(stop))
            }
            PageRange::Slice { start, stop, step } => {
                write!(f, "{}:{}:{}", bound(start), bound(stop), step)
            }
        }
    }
}

/// Pages to take from one document. No ranges means every page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageSelection(pub Vec<PageRange>);

impl PageSelection {
    pub fn all() -> Self {
        Self(Vec::new())
    }

    pub fn new(ranges: Vec<PageRange>) -> Self {
        Self(ranges)
    }

    pub fn parse_list(ranges: &[&str]) -> Result<Self> {
        ranges
            .iter()
            .map(|r| r.parse())
            .collect::<Result<Vec<_>>>()
            .map(Self)
    }

    pub fn is_all(&self) -> bool {
        self.0.is_empty()
    }

    /// Page indices in selection order; ranges are applied one after another.
    pub fn indices(&self, len: usize) -> Vec<usize> {
        if self.is_all() {
            return (0..len).collect();
        }

        self.0.iter().flat_map(|range| range.indices(len)).collect()
    }
}

impl fmt::Display for PageSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_all() {
            return write!(f, "all pages");
        }

        let ranges: Vec<String> = self.0.iter().map(|r| r.to_string()).collect();
        write!(f, "{}", ranges.join(", "))
    }
}
