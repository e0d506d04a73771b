#![forbid(unsafe_code)]

pub mod config;
pub mod core;
pub mod data;
pub mod driver;
pub mod encode;
pub mod error;
pub mod sequence;
pub mod surface;

pub use config::AnimationConfig;
pub use core::{Canvas, Fps, FrameIndex, FrameRange, Rgb8};
pub use data::{Columns, ConsumptionRecord, DataSourceConfig, Dataset, load_dataset};
pub use driver::{Phase, RenderStats, render_frame, render_to_mp4, render_to_mp4_with_stats};
pub use encode::{EncodeConfig, FfmpegEncoder, is_ffmpeg_on_path};
pub use error::{BarlapseError, BarlapseResult};
pub use sequence::{BarState, ColorScheme, FrameSequencer, FrameState, Timing};
pub use surface::{FrameRgb, Surface, Theme};
