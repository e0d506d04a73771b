use std::path::PathBuf;

use crate::{
    core::{Canvas, Fps, Rgb8},
    data::{Columns, DataSourceConfig},
    error::{BarlapseError, BarlapseResult},
    sequence::{ColorScheme, Timing},
};

/// Everything a run needs, fixed up front. The defaults reproduce the
/// original Grenland electricity animation; a JSON file can override any
/// subset of fields.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    pub title: String,
    /// Static credit lines drawn near the bottom of the chart.
    pub credits: Vec<String>,
    /// Append a generation-date line after the static credits.
    pub stamp_date: bool,
    /// Main animation length in seconds, excluding the hold.
    pub duration_secs: f64,
    /// How long the fully-grown final frame is held.
    pub hold_secs: f64,
    pub fps: Fps,
    /// Multiplier on the 400x300 base canvas.
    pub fig_scale: u32,
    /// Label on the value axis.
    pub value_label: String,
    pub color_scheme: ColorScheme,
    pub data: DataSourceConfig,
    pub out_path: PathBuf,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            title: "Forbruk av elektrisk energi for bedrifter i Grenland".to_string(),
            credits: vec![
                "Creative Commons BY-SA : Rune Mathisen (2024)".to_string(),
                "Hoveddatakilde: Miljødirektoratet (Norske utslipp)".to_string(),
                "Musikk: lesfm-22579021 (Pixabay License)".to_string(),
            ],
            stamp_date: true,
            duration_secs: 60.0,
            hold_secs: 3.0,
            fps: Fps { num: 50, den: 1 },
            fig_scale: 4,
            value_label: "MWh".to_string(),
            color_scheme: ColorScheme::TwoTier {
                highlight_count: 3,
                highlight: Rgb8::new(220, 20, 20),
                base: Rgb8::new(135, 206, 235),
            },
            data: DataSourceConfig {
                path: PathBuf::from("data/el-forbruk.xlsx"),
                sheet: "liste-over-forbrukere".to_string(),
                header_row: 0,
                columns: Columns::Positional {
                    range: "A:B".to_string(),
                },
            },
            out_path: PathBuf::from("anim/anim.mp4"),
        }
    }
}

impl AnimationConfig {
    pub fn validate(&self) -> BarlapseResult<()> {
        Fps::new(self.fps.num, self.fps.den)?;
        Timing::new(self.duration_secs, self.fps)?;
        if !self.hold_secs.is_finite() || self.hold_secs < 0.0 {
            return Err(BarlapseError::config(
                "hold duration must be a non-negative number of seconds",
            ));
        }
        if self.fig_scale == 0 {
            return Err(BarlapseError::config("fig_scale must be >= 1"));
        }
        self.data.columns.validate()?;
        Ok(())
    }

    /// Output canvas in pixels. The 400x300 base keeps both dimensions
    /// even for any scale, which yuv420p output requires.
    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.fig_scale * 400,
            height: self.fig_scale * 300,
        }
    }

    /// Credit lines in draw order, with the generation date appended when
    /// `stamp_date` is set.
    pub fn credit_lines(&self) -> Vec<String> {
        let mut lines = self.credits.clone();
        if self.stamp_date {
            let today = chrono::Local::now().date_naive();
            lines.push(format!("Animasjon laget den {today}"));
        }
        lines
    }
}
