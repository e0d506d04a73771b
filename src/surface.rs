use plotters::coord::Shift;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::{FontDesc, FontFamily, FontStyle, TextStyle};
use plotters_bitmap::BitMapBackendError;

use crate::{
    core::{Canvas, Rgb8},
    error::{BarlapseError, BarlapseResult},
    sequence::FrameState,
};

/// One finished frame of opaque rgb24 pixels, row-major.
#[derive(Clone, Debug)]
pub struct FrameRgb {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl FrameRgb {
    fn new(canvas: Canvas) -> Self {
        Self {
            width: canvas.width,
            height: canvas.height,
            data: vec![0u8; (canvas.width * canvas.height * 3) as usize],
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Theme {
    pub background: Rgb8,
    pub axis: Rgb8,
    pub grid: Rgb8,
    pub text: Rgb8,
    pub credit: Rgb8,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background: Rgb8::new(255, 255, 255),
            axis: Rgb8::new(60, 60, 60),
            grid: Rgb8::new(214, 218, 224),
            text: Rgb8::new(40, 40, 40),
            credit: Rgb8::new(168, 168, 168),
        }
    }
}

/// The one mutable drawing resource. Owned by the driver, redrawn from
/// scratch every frame: `clear`, then `draw_bars`, then `annotate`.
///
/// Bars, axes and grid lines never touch fonts. All text goes through a
/// lenient path: if glyph resolution fails (headless host without system
/// fonts), the failure is logged once and the frame is still produced.
pub struct Surface {
    canvas: Canvas,
    theme: Theme,
    scale: u32,
    frame: FrameRgb,
    font_warned: bool,
}

impl Surface {
    pub fn new(canvas: Canvas, theme: Theme) -> BarlapseResult<Self> {
        if canvas.width == 0 || canvas.height == 0 {
            return Err(BarlapseError::render(
                "surface width/height must be non-zero",
            ));
        }
        Ok(Self {
            canvas,
            theme,
            scale: (canvas.width / 400).max(1),
            frame: FrameRgb::new(canvas),
            font_warned: false,
        })
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// The most recently drawn frame.
    pub fn frame(&self) -> &FrameRgb {
        &self.frame
    }

    pub fn clear(&mut self) -> BarlapseResult<()> {
        let background = rgb(self.theme.background);
        let root = self.root();
        root.fill(&background).map_err(draw_err)?;
        Ok(())
    }

    /// Draws the chart for one frame: value axis spanning `0..1.1*max`,
    /// category axis spanning `[-1, n]`, one horizontal bar per record,
    /// record names left of the axis, tick labels along the bottom.
    pub fn draw_bars(&mut self, state: &FrameState, labels: &[&str]) -> BarlapseResult<()> {
        if labels.len() != state.bars.len() {
            return Err(BarlapseError::render(format!(
                "label count {} does not match bar count {}",
                labels.len(),
                state.bars.len()
            )));
        }

        let theme = self.theme;
        let scale = self.scale;
        let mut font_warned = self.font_warned;
        {
            let root = BitMapBackend::with_buffer(
                &mut self.frame.data,
                (self.canvas.width, self.canvas.height),
            )
            .into_drawing_area();

            // Degenerate ranges (all bars still zero) get a unit axis so the
            // frame still shows the empty chart.
            let x_end = if state.value_axis_end() > 0.0 {
                state.value_axis_end()
            } else {
                1.0
            };
            let (y_start, y_end) = state.category_axis_bounds();

            let mut chart = ChartBuilder::on(&root)
                .margin((6 * scale) as i32)
                .x_label_area_size((14 * scale) as i32)
                .y_label_area_size((92 * scale) as i32)
                .build_cartesian_2d(0.0..x_end, y_start..y_end)
                .map_err(draw_err)?;

            let axis_color = rgb(theme.axis);
            let grid_color = rgb(theme.grid);
            chart
                .configure_mesh()
                .x_labels(0)
                .y_labels(0)
                .disable_y_mesh()
                .axis_style(&axis_color)
                .light_line_style(&grid_color)
                .draw()
                .map_err(draw_err)?;

            chart
                .draw_series(state.bars.iter().enumerate().map(|(i, bar)| {
                    Rectangle::new(
                        [(0.0, i as f64 - 0.4), (bar.length, i as f64 + 0.4)],
                        rgb(bar.color).filled(),
                    )
                }))
                .map_err(draw_err)?;

            let label_style = font(9 * scale)
                .color(&rgb(theme.text))
                .pos(Pos::new(HPos::Right, VPos::Center));
            for (i, label) in labels.iter().enumerate() {
                let (x_px, y_px) = chart.backend_coord(&(0.0, i as f64));
                draw_text_lenient(
                    &root,
                    label,
                    (x_px - 2 * scale as i32, y_px),
                    label_style.clone(),
                    &mut font_warned,
                );
            }

            let tick_style = font(8 * scale)
                .color(&rgb(theme.text))
                .pos(Pos::new(HPos::Center, VPos::Top));
            if state.value_max > 0.0 {
                for step in 0..=4 {
                    let value = x_end * f64::from(step) / 4.0;
                    let (x_px, y_px) = chart.backend_coord(&(value, y_start));
                    draw_text_lenient(
                        &root,
                        &format!("{value:.0}"),
                        (x_px, y_px + scale as i32),
                        tick_style.clone(),
                        &mut font_warned,
                    );
                }
            }
        }
        self.font_warned = font_warned;
        Ok(())
    }

    /// Title, value-axis label and credit lines at fixed positions.
    pub fn annotate(
        &mut self,
        title: &str,
        axis_label: &str,
        credits: &[String],
    ) -> BarlapseResult<()> {
        let theme = self.theme;
        let scale = self.scale;
        let width = self.canvas.width as i32;
        let height = self.canvas.height as i32;
        let mut font_warned = self.font_warned;
        {
            let root = self.root();
            let center = Pos::new(HPos::Center, VPos::Center);

            draw_text_lenient(
                &root,
                title,
                (width / 2, 8 * scale as i32),
                font(14 * scale).color(&rgb(theme.text)).pos(center),
                &mut font_warned,
            );

            draw_text_lenient(
                &root,
                axis_label,
                (width / 2, height - 4 * scale as i32),
                font(12 * scale).color(&rgb(theme.text)).pos(center),
                &mut font_warned,
            );

            for (i, line) in credits.iter().enumerate() {
                let frac = 0.12 - 0.02 * i as f64;
                let y = height - (frac * f64::from(height)) as i32;
                let size = if i < 2 { 10 } else { 8 };
                draw_text_lenient(
                    &root,
                    line,
                    (width / 2, y),
                    font(size * scale).color(&rgb(theme.credit)).pos(center),
                    &mut font_warned,
                );
            }
        }
        self.font_warned = font_warned;
        Ok(())
    }

    fn root(&mut self) -> DrawingArea<BitMapBackend<'_>, Shift> {
        BitMapBackend::with_buffer(
            &mut self.frame.data,
            (self.canvas.width, self.canvas.height),
        )
        .into_drawing_area()
    }
}

fn rgb(c: Rgb8) -> RGBColor {
    RGBColor(c.r, c.g, c.b)
}

fn font(px: u32) -> FontDesc<'static> {
    FontDesc::new(FontFamily::SansSerif, f64::from(px), FontStyle::Normal)
}

fn draw_err(e: impl std::fmt::Display) -> BarlapseError {
    BarlapseError::render(format!("chart drawing failed: {e}"))
}

type TextResult = Result<(), DrawingAreaErrorKind<BitMapBackendError>>;

fn draw_text_lenient(
    root: &DrawingArea<BitMapBackend<'_>, Shift>,
    text: &str,
    pos: (i32, i32),
    style: TextStyle<'_>,
    font_warned: &mut bool,
) {
    let result: TextResult = root.draw(&Text::new(text.to_string(), pos, style));
    if let Err(e) = result
        && !*font_warned
    {
        *font_warned = true;
        tracing::warn!("text drawing failed, frames will lack annotations: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Fps, FrameIndex};
    use crate::data::{ConsumptionRecord, Dataset};
    use crate::sequence::{ColorScheme, FrameSequencer, Timing};

    fn small_canvas() -> Canvas {
        Canvas {
            width: 400,
            height: 300,
        }
    }

    fn bar_state(values: &[f64], frame: u64) -> (Dataset, FrameState) {
        let ds = Dataset::from_records(
            values
                .iter()
                .enumerate()
                .map(|(i, v)| ConsumptionRecord::new(format!("r{i}"), *v))
                .collect(),
        )
        .unwrap();
        let timing = Timing::new(2.0, Fps::new(10, 1).unwrap()).unwrap();
        let state = FrameSequencer::new(
            &ds,
            timing,
            ColorScheme::TwoTier {
                highlight_count: 1,
                highlight: Rgb8::new(200, 30, 30),
                base: Rgb8::new(135, 206, 235),
            },
        )
        .frame_state(FrameIndex(frame));
        (ds, state)
    }

    #[test]
    fn clear_fills_with_background() {
        let mut surface = Surface::new(small_canvas(), Theme::default()).unwrap();
        surface.clear().unwrap();
        let frame = surface.frame();
        assert_eq!(frame.data.len(), 400 * 300 * 3);
        assert!(frame.data.iter().all(|&b| b == 255));
    }

    #[test]
    fn fully_grown_bars_leave_non_background_pixels() {
        let (ds, state) = bar_state(&[10.0, 30.0, 20.0], 20);
        let labels: Vec<&str> = ds.names().collect();

        let mut surface = Surface::new(small_canvas(), Theme::default()).unwrap();
        surface.clear().unwrap();
        surface.draw_bars(&state, &labels).unwrap();

        let frame = surface.frame();
        assert!(frame.data.iter().any(|&b| b != 255));
    }

    #[test]
    fn empty_dataset_draws_an_empty_chart() {
        let (_, state) = bar_state(&[], 0);
        let mut surface = Surface::new(small_canvas(), Theme::default()).unwrap();
        surface.clear().unwrap();
        surface.draw_bars(&state, &[]).unwrap();
    }

    #[test]
    fn label_count_mismatch_is_an_error() {
        let (_, state) = bar_state(&[10.0, 20.0], 0);
        let mut surface = Surface::new(small_canvas(), Theme::default()).unwrap();
        surface.clear().unwrap();
        assert!(surface.draw_bars(&state, &["only-one"]).is_err());
    }

    #[test]
    fn zero_sized_canvas_is_rejected() {
        assert!(
            Surface::new(
                Canvas {
                    width: 0,
                    height: 300
                },
                Theme::default()
            )
            .is_err()
        );
    }
}
