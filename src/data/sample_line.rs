use std::sync::OnceLock;

use crate::camera::Frame;
use crate::error::{Result, SpectrumError};

// ---------------------------------------------------------------------------
// ChannelReduction – how the channels of one pixel become one intensity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelReduction {
    /// Mean of all channels.
    #[default]
    Average,
    /// Brightest channel.
    Max,
}

impl ChannelReduction {
    pub fn apply(self, channels: &[f64]) -> f64 {
        match self {
            ChannelReduction::Average => {
                if channels.is_empty() {
                    0.0
                } else {
                    channels.iter().sum::<f64>() / channels.len() as f64
                }
            }
            ChannelReduction::Max => channels.iter().copied().fold(0.0, f64::max),
        }
    }
}

// ---------------------------------------------------------------------------
// SampleLine – immutable intensity vector
// ---------------------------------------------------------------------------

/// One line of intensity samples with optional per-sample over-exposure flags.
///
/// Immutable; every processing stage produces a new line. Min and max are
/// computed on first use.
#[derive(Debug, Clone)]
pub struct SampleLine {
    values: Vec<f64>,
    over_exposed: Option<Vec<bool>>,
    min_value: OnceLock<f64>,
    max_value: OnceLock<f64>,
}

impl PartialEq for SampleLine {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values && self.over_exposed == other.over_exposed
    }
}

impl SampleLine {
    pub fn new(values: Vec<f64>) -> Self {
        Self {
            values,
            over_exposed: None,
            min_value: OnceLock::new(),
            max_value: OnceLock::new(),
        }
    }

    pub fn with_over_exposed(values: Vec<f64>, over_exposed: Option<Vec<bool>>) -> Result<Self> {
        if let Some(flags) = &over_exposed {
            if flags.len() != values.len() {
                return Err(SpectrumError::DimensionMismatch {
                    values: values.len(),
                    over_exposed: flags.len(),
                });
            }
        }
        Ok(Self {
            over_exposed,
            ..Self::new(values)
        })
    }

    /// New line with other values but the over-exposure flags of `self`.
    /// Only for transforms that keep the length.
    pub(crate) fn derive(&self, values: Vec<f64>) -> Self {
        debug_assert_eq!(values.len(), self.values.len(), "derived line changes length");
        Self {
            over_exposed: self.over_exposed.clone(),
            ..Self::new(values)
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn value(&self, index: usize) -> f64 {
        self.values[index]
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn over_exposed(&self) -> Option<&[bool]> {
        self.over_exposed.as_deref()
    }

    pub fn is_over_exposed(&self, index: usize) -> bool {
        self.over_exposed
            .as_ref()
            .is_some_and(|flags| flags[index])
    }

    pub fn min_value(&self) -> f64 {
        *self.min_value.get_or_init(|| {
            if self.values.is_empty() {
                0.0
            } else {
                self.values.iter().copied().fold(f64::INFINITY, f64::min)
            }
        })
    }

    pub fn max_value(&self) -> f64 {
        *self.max_value.get_or_init(|| {
            if self.values.is_empty() {
                0.0
            } else {
                self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
            }
        })
    }

    // -----------------------------------------------------------------------
    // Extraction from a camera frame
    // -----------------------------------------------------------------------

    /// Reduce a horizontal strip of `rows` pixel rows centered on `center_row`
    /// to one value per column.
    ///
    /// Channel bytes are normalized to `[0, 1]` and averaged over the strip.
    /// Rows outside the frame are skipped but the sum is still divided by
    /// `rows`, so strips hanging over the frame edge come out darker. A column
    /// is flagged over-exposed if any of its strip pixels has a saturated
    /// channel.
    pub fn from_frame(
        frame: &Frame,
        center_row: usize,
        rows: usize,
        reduction: ChannelReduction,
    ) -> Self {
        let cols = frame.cols();
        let mut values = vec![0.0; cols];
        let mut over_exposed = vec![false; cols];
        let mut norm_pixel = vec![0.0; frame.channels()];

        let first_row = center_row as i64 - (rows / 2) as i64;

        for col in 0..cols {
            norm_pixel.fill(0.0);
            for row_offset in 0..rows {
                let row = first_row + row_offset as i64;
                if row < 0 || row >= frame.rows() as i64 {
                    continue;
                }
                for (acc, &channel) in norm_pixel.iter_mut().zip(frame.get(row as usize, col)) {
                    *acc += channel as f64 / 255.0 / rows as f64;
                    if channel == u8::MAX {
                        over_exposed[col] = true;
                    }
                }
            }
            values[col] = reduction.apply(&norm_pixel).clamp(0.0, 1.0);
        }

        Self {
            over_exposed: Some(over_exposed),
            ..Self::new(values)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_mismatched_flags() {
        let err = SampleLine::with_over_exposed(vec![0.1, 0.2], Some(vec![false])).unwrap_err();
        assert_eq!(
            err,
            SpectrumError::DimensionMismatch {
                values: 2,
                over_exposed: 1
            }
        );
        assert!(SampleLine::with_over_exposed(vec![0.1, 0.2], None).is_ok());
    }

    #[test]
    fn min_max_cached() {
        let line = SampleLine::new(vec![0.3, -0.2, 0.9, 0.1]);
        assert_eq!(-0.2, line.min_value());
        assert_eq!(0.9, line.max_value());
        assert_eq!(0.9, line.max_value());

        let empty = SampleLine::new(vec![]);
        assert_eq!(0.0, empty.min_value());
        assert_eq!(0.0, empty.max_value());
    }

    #[test]
    fn equality_ignores_cache() {
        let a = SampleLine::new(vec![0.5, 0.25]);
        let b = SampleLine::new(vec![0.5, 0.25]);
        let _ = a.max_value();
        assert_eq!(a, b);
    }

    #[test]
    fn channel_reductions() {
        assert_eq!(0.5, ChannelReduction::Average.apply(&[0.25, 0.75]));
        assert_eq!(0.75, ChannelReduction::Max.apply(&[0.25, 0.75]));
        assert_eq!(0.0, ChannelReduction::Average.apply(&[]));
    }

    fn frame_3x2() -> Frame {
        // rows × cols × channels = 3 × 2 × 2
        Frame::from_bytes(
            3,
            2,
            2,
            vec![
                0, 0, 255, 255, //
                102, 204, 51, 51, //
                51, 51, 0, 0,
            ],
        )
        .unwrap()
    }

    #[test]
    fn strip_average_and_over_exposure() {
        let frame = frame_3x2();
        let line = SampleLine::from_frame(&frame, 1, 3, ChannelReduction::Average);
        assert_eq!(2, line.len());
        // col 0: channel sums (0+102+51, 0+204+51) / 255 / 3
        let expected = ((153.0 + 255.0) / 2.0) / 255.0 / 3.0;
        assert!((line.value(0) - expected).abs() < 1e-12);
        assert!(!line.is_over_exposed(0));
        assert!(line.is_over_exposed(1));
    }

    #[test]
    fn strip_beyond_edge_divides_by_nominal_rows() {
        let frame = frame_3x2();
        // rows -1..=0 of which only row 0 exists
        let line = SampleLine::from_frame(&frame, 0, 2, ChannelReduction::Max);
        // col 1: row 0 is 255 in both channels but divided by 2 rows
        assert!((line.value(1) - 0.5).abs() < 1e-12);
        assert!(line.is_over_exposed(1));
        assert_eq!(0.0, line.value(0));
    }
}
