//! Revenue trend line chart rendered to PNG
//!
//! Drawn with plotters onto an in-memory RGB bitmap, then PNG-encoded so the
//! same bytes can be written to disk or returned over HTTP.

use anyhow::{anyhow, Context, Result};
use plotters::prelude::*;
use plotters::style::FontTransform;
use std::collections::BTreeMap;
use std::path::Path;

pub const CHART_WIDTH: u32 = 1000;
pub const CHART_HEIGHT: u32 = 500;

pub const CHART_TITLE: &str = "Monthly Revenue Trends";
pub const X_AXIS_LABEL: &str = "Month";
pub const Y_AXIS_LABEL: &str = "Total Revenue (ADR)";

const FONT: &str = "sans-serif";
const LINE_COLOR: RGBColor = RGBColor(31, 119, 180);

/// Render monthly revenue (keyed by `YYYY-MM`) as a PNG line chart
pub fn render_revenue_chart(series: &BTreeMap<String, f64>) -> Result<Vec<u8>> {
  let months: Vec<&str> = series.keys().map(String::as_str).collect();
  let values: Vec<f64> = series.values().copied().filter(|value| value.is_finite()).collect();

  let y_min = values.iter().copied().fold(0.0f64, f64::min);
  let mut y_max = values.iter().copied().fold(0.0f64, f64::max) * 1.1;
  if y_max - y_min < f64::EPSILON {
    y_max = y_min + 1.0;
  }
  let x_max = (months.len() as i32 - 1).max(1);

  let mut pixels = vec![0u8; CHART_WIDTH as usize * CHART_HEIGHT as usize * 3];
  {
    let root = BitMapBackend::with_buffer(&mut pixels, (CHART_WIDTH, CHART_HEIGHT))
      .into_drawing_area();
    root.fill(&WHITE).map_err(|e| anyhow!("Failed to clear chart: {e}"))?;

    let mut chart = ChartBuilder::on(&root)
      .caption(CHART_TITLE, (FONT, 28))
      .margin(15)
      .x_label_area_size(90)
      .y_label_area_size(90)
      .build_cartesian_2d(0i32..x_max, y_min..y_max)
      .map_err(|e| anyhow!("Failed to lay out chart: {e}"))?;

    let month_label = |index: &i32| -> String {
      let month = usize::try_from(*index).ok().and_then(|i| months.get(i));
      month.map(|m| m.to_string()).unwrap_or_default()
    };
    let revenue_label = |value: &f64| format!("{value:.0}");

    chart
      .configure_mesh()
      .x_labels(months.len().max(1))
      .x_label_formatter(&month_label)
      .x_label_style((FONT, 14).into_font().transform(FontTransform::Rotate90))
      .y_label_formatter(&revenue_label)
      .x_desc(X_AXIS_LABEL)
      .y_desc(Y_AXIS_LABEL)
      .axis_desc_style((FONT, 16))
      .draw()
      .map_err(|e| anyhow!("Failed to draw chart axes: {e}"))?;

    let points: Vec<(i32, f64)> = series
      .values()
      .enumerate()
      .filter(|(_, value)| value.is_finite())
      .map(|(index, value)| (index as i32, *value))
      .collect();

    chart
      .draw_series(LineSeries::new(points.iter().copied(), LINE_COLOR.stroke_width(3)))
      .map_err(|e| anyhow!("Failed to draw revenue line: {e}"))?;
    chart
      .draw_series(points.iter().map(|&point| Circle::new(point, 4, LINE_COLOR.filled())))
      .map_err(|e| anyhow!("Failed to draw revenue markers: {e}"))?;

    root.present().map_err(|e| anyhow!("Failed to finish chart: {e}"))?;
  }

  encode_png(&pixels)
}

fn encode_png(pixels: &[u8]) -> Result<Vec<u8>> {
  let mut buffer = Vec::new();
  {
    let mut encoder = png::Encoder::new(&mut buffer, CHART_WIDTH, CHART_HEIGHT);
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header().context("Failed to write PNG header")?;
    writer.write_image_data(pixels).context("Failed to write PNG image data")?;
    writer.finish().context("Failed to finish PNG stream")?;
  }
  Ok(buffer)
}

/// Render the chart and write it to `path`, creating parent directories
pub fn save_revenue_chart(series: &BTreeMap<String, f64>, path: &Path) -> Result<()> {
  let png = render_revenue_chart(series)?;
  if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("Failed to create directory {}", parent.display()))?;
  }
  std::fs::write(path, png).with_context(|| format!("Failed to write chart {}", path.display()))
}
