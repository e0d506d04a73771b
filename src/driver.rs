use std::path::PathBuf;

use crate::{
    config::AnimationConfig,
    core::{FrameIndex, FrameRange},
    data::Dataset,
    encode::{EncodeConfig, FfmpegEncoder},
    error::{BarlapseError, BarlapseResult},
    sequence::{FrameSequencer, Timing},
    surface::{FrameRgb, Surface, Theme},
};

/// Driver progression: bars animate, the final frame is repeated, the
/// encoder is finalized. Strictly forward, no re-entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Growing,
    Held,
    Done,
}

impl Phase {
    pub fn of(frame: u64, total_frames: u64, grand_total: u64) -> Self {
        if frame <= total_frames {
            Phase::Growing
        } else if frame < grand_total {
            Phase::Held
        } else {
            Phase::Done
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub frames_total: u64,
    pub growth_frames: u64,
    pub hold_frames: u64,
}

struct RenderPlan {
    timing: Timing,
    hold_frames: u64,
    grand_total: u64,
}

fn plan(cfg: &AnimationConfig) -> BarlapseResult<RenderPlan> {
    cfg.validate()?;
    let timing = Timing::new(cfg.duration_secs, cfg.fps)?;
    let hold_frames = cfg.fps.secs_to_frames_floor(cfg.hold_secs);
    Ok(RenderPlan {
        timing,
        hold_frames,
        grand_total: timing.total_frames + hold_frames,
    })
}

fn integer_fps(cfg: &AnimationConfig) -> BarlapseResult<u32> {
    if cfg.fps.den == 1 {
        Ok(cfg.fps.num)
    } else {
        Err(BarlapseError::config(
            "mp4 output currently requires integer fps (fps.den == 1)",
        ))
    }
}

/// Renders the whole animation and encodes it by piping frames to the
/// system `ffmpeg` binary, in strictly increasing frame order. Returns the
/// output path on success. Any failure aborts the run; a mid-encode
/// failure may leave a truncated output file behind.
pub fn render_to_mp4(
    dataset: &Dataset,
    cfg: &AnimationConfig,
    out_path: impl Into<PathBuf>,
) -> BarlapseResult<PathBuf> {
    render_to_mp4_with_stats(dataset, cfg, out_path).map(|(path, _)| path)
}

pub fn render_to_mp4_with_stats(
    dataset: &Dataset,
    cfg: &AnimationConfig,
    out_path: impl Into<PathBuf>,
) -> BarlapseResult<(PathBuf, RenderStats)> {
    let plan = plan(cfg)?;
    let fps = integer_fps(cfg)?;
    let canvas = cfg.canvas();
    let out_path = out_path.into();

    let mut encoder = FfmpegEncoder::new(EncodeConfig {
        width: canvas.width,
        height: canvas.height,
        fps,
        out_path: out_path.clone(),
        overwrite: true,
    })?;

    let sequencer = FrameSequencer::new(dataset, plan.timing, cfg.color_scheme.clone());
    let mut surface = Surface::new(canvas, Theme::default())?;
    let labels: Vec<&str> = dataset.names().collect();
    let credits = cfg.credit_lines();

    tracing::info!(
        frames = plan.grand_total,
        width = canvas.width,
        height = canvas.height,
        fps,
        records = dataset.len(),
        "starting render"
    );

    let mut phase = Phase::Growing;
    for f in 0..plan.grand_total {
        let next = Phase::of(f, plan.timing.total_frames, plan.grand_total);
        if next != phase {
            tracing::info!(frame = f, ?next, "phase transition");
            phase = next;
        }

        let state = sequencer.frame_state(FrameIndex(f));
        surface.clear()?;
        surface.draw_bars(&state, &labels)?;
        surface.annotate(&cfg.title, &cfg.value_label, &credits)?;
        encoder.encode_frame(surface.frame())?;
    }

    encoder.finish()?;
    tracing::info!(out = %out_path.display(), "encode finished");

    Ok((
        out_path,
        RenderStats {
            frames_total: plan.grand_total,
            growth_frames: plan.timing.total_frames,
            hold_frames: plan.hold_frames,
        },
    ))
}

/// Renders a single frame's pixels without touching the encoder. Used by
/// the `frame` subcommand and by tests.
pub fn render_frame(
    dataset: &Dataset,
    cfg: &AnimationConfig,
    frame: FrameIndex,
) -> BarlapseResult<FrameRgb> {
    let plan = plan(cfg)?;
    let range = FrameRange::new(FrameIndex(0), FrameIndex(plan.grand_total))?;
    if !range.contains(frame) {
        return Err(BarlapseError::render(format!(
            "frame {} is out of bounds (animation has {} frames)",
            frame.0,
            range.len_frames()
        )));
    }

    let sequencer = FrameSequencer::new(dataset, plan.timing, cfg.color_scheme.clone());
    let mut surface = Surface::new(cfg.canvas(), Theme::default())?;
    let labels: Vec<&str> = dataset.names().collect();
    let credits = cfg.credit_lines();

    let state = sequencer.frame_state(frame);
    surface.clear()?;
    surface.draw_bars(&state, &labels)?;
    surface.annotate(&cfg.title, &cfg.value_label, &credits)?;
    Ok(surface.frame().clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_boundaries_follow_the_state_machine() {
        // total_frames = 10, grand_total = 15
        assert_eq!(Phase::of(0, 10, 15), Phase::Growing);
        assert_eq!(Phase::of(10, 10, 15), Phase::Growing); // boundary frame still animates
        assert_eq!(Phase::of(11, 10, 15), Phase::Held);
        assert_eq!(Phase::of(14, 10, 15), Phase::Held);
        assert_eq!(Phase::of(15, 10, 15), Phase::Done);
    }

    #[test]
    fn phases_never_move_backward() {
        let mut last = Phase::Growing;
        for f in 0..=20u64 {
            let phase = Phase::of(f, 10, 15);
            let rank = |p: Phase| match p {
                Phase::Growing => 0,
                Phase::Held => 1,
                Phase::Done => 2,
            };
            assert!(rank(phase) >= rank(last));
            last = phase;
        }
    }
}
