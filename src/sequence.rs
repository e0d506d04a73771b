use crate::{
    core::{FrameIndex, Fps, Rgb8},
    data::{ConsumptionRecord, Dataset},
    error::{BarlapseError, BarlapseResult},
};

/// Main-animation timing: every record's bar starts growing at an offset
/// proportional to its rank, and all bars share the same growth slice
/// `duration / n`.
#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct Timing {
    pub duration_secs: f64,
    pub fps: Fps,
    pub total_frames: u64, // frames in the growth phase, excluding hold
}

impl Timing {
    pub fn new(duration_secs: f64, fps: Fps) -> BarlapseResult<Self> {
        if !duration_secs.is_finite() || duration_secs <= 0.0 {
            return Err(BarlapseError::config(
                "animation duration must be a positive number of seconds",
            ));
        }
        let total_frames = fps.secs_to_frames_floor(duration_secs);
        if total_frames == 0 {
            return Err(BarlapseError::config(format!(
                "duration {duration_secs}s at {}fps produces zero frames",
                fps.as_f64()
            )));
        }
        Ok(Self {
            duration_secs,
            fps,
            total_frames,
        })
    }
}

/// How each bar gets its color.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub enum ColorScheme {
    /// The last `highlight_count` records in sort order (the largest
    /// values) get the highlight color, everything else the base color.
    TwoTier {
        highlight_count: usize,
        highlight: Rgb8,
        base: Rgb8,
    },
    /// Each record carries its own display color; `fallback` covers
    /// records without one.
    PerRecord { fallback: Rgb8 },
}

impl ColorScheme {
    pub fn color_for(&self, index: usize, len: usize, record: &ConsumptionRecord) -> Rgb8 {
        match self {
            ColorScheme::TwoTier {
                highlight_count,
                highlight,
                base,
            } => {
                // Saturating so an oversized highlight_count from a config
                // file highlights everything instead of overflowing.
                if index >= len.saturating_sub(*highlight_count) {
                    *highlight
                } else {
                    *base
                }
            }
            ColorScheme::PerRecord { fallback } => record.color.unwrap_or(*fallback),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BarState {
    pub length: f64, // 0 <= length <= record value
    pub color: Rgb8,
}

/// Full visual state for one frame. Recomputed from scratch every frame,
/// never carried over.
#[derive(Clone, Debug)]
pub struct FrameState {
    pub frame: FrameIndex,
    pub elapsed_secs: f64,
    pub bars: Vec<BarState>,
    /// Longest bar in this frame; 0 for an empty dataset.
    pub value_max: f64,
}

impl FrameState {
    /// Value-axis upper bound: 1.1x the current longest bar.
    pub fn value_axis_end(&self) -> f64 {
        self.value_max * 1.1
    }

    /// Category-axis bounds span [-1, n].
    pub fn category_axis_bounds(&self) -> (f64, f64) {
        (-1.0, self.bars.len() as f64)
    }
}

pub struct FrameSequencer<'a> {
    dataset: &'a Dataset,
    timing: Timing,
    colors: ColorScheme,
}

impl<'a> FrameSequencer<'a> {
    pub fn new(dataset: &'a Dataset, timing: Timing, colors: ColorScheme) -> Self {
        Self {
            dataset,
            timing,
            colors,
        }
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    /// Computes the visual state for `frame`. Indices past the main
    /// animation clamp to `total_frames`, producing the held final frame.
    /// The boundary frame itself is computed, not clamped; every growth
    /// phase is already saturated there, so the two agree.
    #[tracing::instrument(skip(self))]
    pub fn frame_state(&self, frame: FrameIndex) -> FrameState {
        let total = self.timing.total_frames;
        let effective = if frame.0 > total { total } else { frame.0 };
        let elapsed = self.timing.fps.frames_to_secs(effective);

        let n = self.dataset.len();
        let mut bars = Vec::with_capacity(n);
        let mut value_max = 0.0f64;

        if n > 0 {
            // Start spacing and growth duration are the same slice T/n.
            let slot_secs = self.timing.duration_secs / n as f64;
            for (i, rec) in self.dataset.records().iter().enumerate() {
                let start_time = slot_secs * i as f64;
                let length = if elapsed < start_time {
                    0.0
                } else {
                    let growth_phase = ((elapsed - start_time) / slot_secs).min(1.0);
                    rec.value * growth_phase
                };
                value_max = value_max.max(length);
                bars.push(BarState {
                    length,
                    color: self.colors.color_for(i, n, rec),
                });
            }
        }

        FrameState {
            frame: FrameIndex(effective),
            elapsed_secs: elapsed,
            bars,
            value_max,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ConsumptionRecord;

    const RED: Rgb8 = Rgb8::new(255, 0, 0);
    const BLUE: Rgb8 = Rgb8::new(135, 206, 235);

    fn dataset(values: &[f64]) -> Dataset {
        Dataset::from_records(
            values
                .iter()
                .enumerate()
                .map(|(i, v)| ConsumptionRecord::new(format!("r{i}"), *v))
                .collect(),
        )
        .unwrap()
    }

    fn two_tier(k: usize) -> ColorScheme {
        ColorScheme::TwoTier {
            highlight_count: k,
            highlight: RED,
            base: BLUE,
        }
    }

    #[test]
    fn bars_are_zero_before_their_start_time() {
        let ds = dataset(&[10.0, 20.0, 30.0]);
        let timing = Timing::new(30.0, Fps::new(1, 1).unwrap()).unwrap();
        let seq = FrameSequencer::new(&ds, timing, two_tier(0));

        // start times are 0s, 10s, 20s
        let state = seq.frame_state(FrameIndex(5));
        assert!(state.bars[0].length > 0.0);
        assert_eq!(state.bars[1].length, 0.0);
        assert_eq!(state.bars[2].length, 0.0);
    }

    #[test]
    fn growth_saturates_at_full_value() {
        let ds = dataset(&[10.0, 20.0]);
        let timing = Timing::new(10.0, Fps::new(2, 1).unwrap()).unwrap();
        let seq = FrameSequencer::new(&ds, timing, two_tier(0));

        let state = seq.frame_state(FrameIndex(timing.total_frames));
        assert_eq!(state.bars[0].length, 10.0);
        assert_eq!(state.bars[1].length, 20.0);
        assert_eq!(state.value_max, 20.0);
    }

    #[test]
    fn growth_is_monotonic_per_bar() {
        let ds = dataset(&[5.0, 12.0, 40.0, 7.0]);
        let timing = Timing::new(8.0, Fps::new(25, 1).unwrap()).unwrap();
        let seq = FrameSequencer::new(&ds, timing, two_tier(1));

        let mut prev = vec![0.0f64; ds.len()];
        for f in 0..=timing.total_frames + 10 {
            let state = seq.frame_state(FrameIndex(f));
            for (i, bar) in state.bars.iter().enumerate() {
                assert!(
                    bar.length >= prev[i],
                    "bar {i} shrank at frame {f}: {} -> {}",
                    prev[i],
                    bar.length
                );
                prev[i] = bar.length;
            }
        }
    }

    #[test]
    fn frames_past_total_clamp_to_held_state() {
        let ds = dataset(&[10.0, 20.0, 30.0]);
        let timing = Timing::new(6.0, Fps::new(10, 1).unwrap()).unwrap();
        let seq = FrameSequencer::new(&ds, timing, two_tier(1));

        let held = seq.frame_state(FrameIndex(timing.total_frames));
        let later = seq.frame_state(FrameIndex(timing.total_frames + 37));
        assert_eq!(later.frame, FrameIndex(timing.total_frames));
        assert_eq!(later.bars, held.bars);
        assert_eq!(later.elapsed_secs, held.elapsed_secs);
    }

    #[test]
    fn two_tier_highlights_exactly_the_top_k() {
        let ds = dataset(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let timing = Timing::new(1.0, Fps::new(1, 1).unwrap()).unwrap();
        let seq = FrameSequencer::new(&ds, timing, two_tier(2));

        let state = seq.frame_state(FrameIndex(0));
        let reds = state.bars.iter().filter(|b| b.color == RED).count();
        assert_eq!(reds, 2);
        assert_eq!(state.bars[3].color, RED);
        assert_eq!(state.bars[4].color, RED);
        assert_eq!(state.bars[0].color, BLUE);
    }

    #[test]
    fn two_tier_highlight_count_saturates_at_dataset_size() {
        let ds = dataset(&[1.0, 2.0]);
        let timing = Timing::new(1.0, Fps::new(1, 1).unwrap()).unwrap();
        let seq = FrameSequencer::new(&ds, timing, two_tier(10));

        let state = seq.frame_state(FrameIndex(0));
        assert!(state.bars.iter().all(|b| b.color == RED));

        // Unvalidated config input; must not overflow.
        let seq = FrameSequencer::new(&ds, timing, two_tier(usize::MAX));
        let state = seq.frame_state(FrameIndex(0));
        assert!(state.bars.iter().all(|b| b.color == RED));
    }

    #[test]
    fn per_record_colors_with_fallback() {
        let mut recs = vec![
            ConsumptionRecord::new("colored", 1.0),
            ConsumptionRecord::new("plain", 2.0),
        ];
        recs[0].color = Some(Rgb8::new(1, 2, 3));
        let ds = Dataset::from_records(recs).unwrap();
        let timing = Timing::new(1.0, Fps::new(1, 1).unwrap()).unwrap();
        let seq = FrameSequencer::new(&ds, timing, ColorScheme::PerRecord { fallback: BLUE });

        let state = seq.frame_state(FrameIndex(0));
        assert_eq!(state.bars[0].color, Rgb8::new(1, 2, 3));
        assert_eq!(state.bars[1].color, BLUE);
    }

    #[test]
    fn empty_dataset_yields_no_bars_and_zero_axis_max() {
        let ds = dataset(&[]);
        let timing = Timing::new(5.0, Fps::new(10, 1).unwrap()).unwrap();
        let seq = FrameSequencer::new(&ds, timing, two_tier(3));

        let state = seq.frame_state(FrameIndex(0));
        assert!(state.bars.is_empty());
        assert_eq!(state.value_max, 0.0);
        assert_eq!(state.value_axis_end(), 0.0);
        assert_eq!(state.category_axis_bounds(), (-1.0, 0.0));
    }

    #[test]
    fn timing_rejects_degenerate_configs() {
        let fps = Fps::new(50, 1).unwrap();
        assert!(Timing::new(0.0, fps).is_err());
        assert!(Timing::new(-1.0, fps).is_err());
        assert!(Timing::new(f64::NAN, fps).is_err());
        // Sub-frame duration floors to zero frames.
        assert!(Timing::new(0.001, Fps::new(1, 1).unwrap()).is_err());
    }
}
