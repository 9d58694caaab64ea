//! Peak detection over a single numeric buffer.
//!
//! Three stages, each preserving ascending frame order: a local-maxima scan
//! with plateau collapsing, optional filters (height, distance, prominence,
//! width, applied in that order), and optional sequence classification that
//! relabels peaks by normalized height and keeps only those matching given
//! positions of a label pattern.

use serde::{Deserialize, Serialize};

use crate::error::{ProcessingError, Result};

/// One detected peak. Prominence and width are filled in only when the
/// corresponding filters ran.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    /// 0-based sample index; plateaus collapse to their rounded midpoint.
    pub frame: usize,
    pub height: f32,
    pub prominence: Option<f32>,
    pub width: Option<f32>,
}

/// Height bucket for sequence classification: a peak whose normalized
/// height is at or below `upper` gets `label`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelBucket {
    pub upper: f32,
    pub label: char,
}

/// Sequence-classification options: bucket the peaks, build a label string,
/// match `pattern` at every alignment (partial matches off either end
/// count), and keep only peaks tagged with a pattern position in `keep`.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceOptions {
    pub buckets: Vec<LabelBucket>,
    pub pattern: String,
    pub keep: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PeakOptions {
    pub min_height: Option<f32>,
    pub max_height: Option<f32>,
    /// Minimum frame separation between surviving peaks.
    pub distance: Option<usize>,
    pub min_prominence: Option<f32>,
    pub max_prominence: Option<f32>,
    pub min_width: Option<f32>,
    pub max_width: Option<f32>,
    /// Fraction of prominence at which width is measured. Defaults to 0.5.
    pub rel_height: Option<f32>,
    /// Bounded window for the prominence walk, in frames.
    pub window: Option<usize>,
    pub sequence: Option<SequenceOptions>,
}

impl PeakOptions {
    fn needs_prominence(&self) -> bool {
        self.min_prominence.is_some()
            || self.max_prominence.is_some()
            || self.needs_width()
    }

    fn needs_width(&self) -> bool {
        self.min_width.is_some() || self.max_width.is_some()
    }
}

/// Detect peaks in `values` and run the configured filters.
///
/// NaN samples never compare greater, so they cannot form or border a peak.
pub fn find_peaks(values: &[f32], options: &PeakOptions) -> Result<Vec<Peak>> {
    let rel_height = options.rel_height.unwrap_or(0.5);
    if !(0.0..=1.0).contains(&rel_height) {
        return Err(ProcessingError::invalid_option(
            "rel_height",
            "must be between 0 and 1",
        ));
    }

    let mut peaks = local_maxima(values);

    if options.min_height.is_some() || options.max_height.is_some() {
        let lo = options.min_height.unwrap_or(f32::NEG_INFINITY);
        let hi = options.max_height.unwrap_or(f32::INFINITY);
        peaks.retain(|p| p.height >= lo && p.height <= hi);
    }

    if let Some(distance) = options.distance {
        filter_by_distance(&mut peaks, distance);
    }

    if options.needs_prominence() {
        for peak in &mut peaks {
            let (prominence, left_base, right_base) =
                prominence(values, peak.frame, options.window);
            peak.prominence = Some(prominence);
            if options.needs_width() {
                peak.width = Some(width_at(
                    values,
                    peak.frame,
                    prominence,
                    rel_height,
                    left_base,
                    right_base,
                ));
            }
        }
        let lo = options.min_prominence.unwrap_or(f32::NEG_INFINITY);
        let hi = options.max_prominence.unwrap_or(f32::INFINITY);
        peaks.retain(|p| p.prominence.is_some_and(|v| v >= lo && v <= hi));

        if options.needs_width() {
            let lo = options.min_width.unwrap_or(f32::NEG_INFINITY);
            let hi = options.max_width.unwrap_or(f32::INFINITY);
            peaks.retain(|p| p.width.is_some_and(|v| v >= lo && v <= hi));
        }
    }

    if let Some(sequence) = &options.sequence {
        peaks = classify_sequence(peaks, sequence)?;
    }

    Ok(peaks)
}

/// Stage 1: strictly greater than the left neighbor, and the run of equal
/// values to the right ends in a strictly smaller one. Plateaus collapse to
/// their rounded midpoint.
fn local_maxima(values: &[f32]) -> Vec<Peak> {
    let mut peaks = Vec::new();
    let n = values.len();
    let mut i = 1;
    while n >= 2 && i < n - 1 {
        if values[i - 1] < values[i] {
            let mut ahead = i + 1;
            while ahead < n && values[ahead] == values[i] {
                ahead += 1;
            }
            if ahead < n && values[ahead] < values[i] {
                let left = i;
                let right = ahead - 1;
                let frame = ((left + right) as f32 / 2.0).round() as usize;
                peaks.push(Peak {
                    frame,
                    height: values[i],
                    prominence: None,
                    width: None,
                });
                i = ahead;
                continue;
            }
        }
        i += 1;
    }
    peaks
}

/// Distance filter: candidates are walked from highest to lowest value; a
/// still-live candidate removes every other live candidate within
/// `distance` frames. Higher peaks survive nearby lower ones regardless of
/// scan order; value ties resolve in favor of the later frame.
fn filter_by_distance(peaks: &mut Vec<Peak>, distance: usize) {
    if distance == 0 || peaks.len() < 2 {
        return;
    }
    let mut priority: Vec<usize> = (0..peaks.len()).collect();
    priority.sort_by(|&a, &b| {
        peaks[a]
            .height
            .partial_cmp(&peaks[b].height)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = vec![true; peaks.len()];
    for &j in priority.iter().rev() {
        if !keep[j] {
            continue;
        }
        let mut k = j;
        while k > 0 {
            k -= 1;
            if peaks[j].frame - peaks[k].frame >= distance {
                break;
            }
            keep[k] = false;
        }
        let mut k = j + 1;
        while k < peaks.len() {
            if peaks[k].frame - peaks[j].frame >= distance {
                break;
            }
            keep[k] = false;
            k += 1;
        }
    }

    let mut it = keep.iter();
    peaks.retain(|_| *it.next().unwrap_or(&false));
}

/// Walk outward from a peak until the signal exceeds the peak's own height
/// (or the window/buffer ends), tracking the lowest sample on each side.
/// Returns the prominence and the index of each side's base.
fn prominence(values: &[f32], peak: usize, window: Option<usize>) -> (f32, usize, usize) {
    let n = values.len();
    let half = window.map_or(n, |w| w / 2);
    let i_min = peak.saturating_sub(half);
    let i_max = (peak + half).min(n - 1);
    let height = values[peak];

    let mut left_min = height;
    let mut left_base = peak;
    let mut i = peak;
    loop {
        if values[i] > height {
            break;
        }
        if values[i] < left_min {
            left_min = values[i];
            left_base = i;
        }
        if i == i_min {
            break;
        }
        i -= 1;
    }

    let mut right_min = height;
    let mut right_base = peak;
    let mut i = peak;
    loop {
        if values[i] > height {
            break;
        }
        if values[i] < right_min {
            right_min = values[i];
            right_base = i;
        }
        if i == i_max {
            break;
        }
        i += 1;
    }

    (height - left_min.max(right_min), left_base, right_base)
}

/// Horizontal extent at `height - prominence * rel_height`, interpolating
/// linearly between samples when the measurement height falls between them.
fn width_at(
    values: &[f32],
    peak: usize,
    prominence: f32,
    rel_height: f32,
    left_base: usize,
    right_base: usize,
) -> f32 {
    let target = values[peak] - prominence * rel_height;

    let mut i = peak;
    while i > left_base && values[i] > target {
        i -= 1;
    }
    let mut left_ip = i as f32;
    if values[i] < target {
        left_ip += (target - values[i]) / (values[i + 1] - values[i]);
    }

    let mut i = peak;
    while i < right_base && values[i] > target {
        i += 1;
    }
    let mut right_ip = i as f32;
    if values[i] < target {
        right_ip -= (target - values[i]) / (values[i - 1] - values[i]);
    }

    right_ip - left_ip
}

/// Stage 3: bucket peaks by normalized height, build a label string, slide
/// the pattern across it (alignments running off either end still count on
/// the overlap), tag matched peaks with their pattern position, and keep
/// only peaks tagged with a position in the keep list.
fn classify_sequence(peaks: Vec<Peak>, options: &SequenceOptions) -> Result<Vec<Peak>> {
    if options.buckets.is_empty() || options.pattern.is_empty() {
        return Err(ProcessingError::invalid_option(
            "sequence",
            "classification requires at least one bucket and a non-empty pattern",
        ));
    }
    if peaks.is_empty() {
        return Ok(peaks);
    }

    let min = peaks.iter().map(|p| p.height).fold(f32::INFINITY, f32::min);
    let max = peaks
        .iter()
        .map(|p| p.height)
        .fold(f32::NEG_INFINITY, f32::max);
    let span = if max > min { max - min } else { 1.0 };

    let labels: Vec<char> = peaks
        .iter()
        .map(|p| {
            let normalized = (p.height - min) / span;
            options
                .buckets
                .iter()
                .find(|b| normalized <= b.upper)
                .or_else(|| options.buckets.last())
                .map(|b| b.label)
                .unwrap_or_default()
        })
        .collect();

    let pattern: Vec<char> = options.pattern.chars().collect();
    let slen = labels.len() as i64;
    let plen = pattern.len() as i64;

    let mut kept = vec![false; labels.len()];
    for align in (1 - plen)..slen {
        let start = align.max(0);
        let end = (align + plen).min(slen);
        if start >= end {
            continue;
        }
        let matched = (start..end).all(|i| labels[i as usize] == pattern[(i - align) as usize]);
        if !matched {
            continue;
        }
        for i in start..end {
            let position = (i - align) as usize;
            if options.keep.contains(&position) {
                kept[i as usize] = true;
            }
        }
    }

    let mut it = kept.iter();
    Ok(peaks
        .into_iter()
        .filter(|_| *it.next().unwrap_or(&false))
        .collect())
}
