//! SVG charts of analysis results.
//!
//! Every chart is rendered into a `String` through plotters' SVG backend and
//! can then be written with [`write_svg`].

use chrono::{Duration, NaiveDate};
use log::debug;
use ltk_analysis::{
    correlation::{Correlation, SeasonalProfile, MONTH_NAMES},
    TrendLine,
};
use ltk_core::variable::VariableInfo;
use ltk_utils::dates::to_ordinal;
use plotters::prelude::*;
use std::ops::Range;
use std::path::Path;
use thiserror::Error;

pub const CHART_SIZE: (u32, u32) = (1000, 600);

const FONT: &str = "sans-serif";

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("Nothing to plot: {0}")]
    Empty(String),

    #[error("Failed to draw chart: {0}")]
    Drawing(String),

    #[error("Failed to write chart: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ChartError>;

fn drawing<E: std::fmt::Display>(e: E) -> ChartError {
    ChartError::Drawing(e.to_string())
}

fn color_of(info: &VariableInfo) -> RGBColor {
    let (r, g, b) = info.color;
    RGBColor(r, g, b)
}

/// Range covering all `values` with a 5% margin, or +-1 around a single value.
fn value_range<I: IntoIterator<Item = f64>>(values: I) -> Option<Range<f64>> {
    let (min, max) = values
        .into_iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if !min.is_finite() || !max.is_finite() {
        return None;
    }
    let pad = if max > min { (max - min) * 0.05 } else { 1.0 };
    Some(min - pad..max + pad)
}

/// Resampled series of one variable with its trend line.
pub fn render_trend_chart(
    variable: &str,
    points: &[(NaiveDate, f64)],
    trend: Option<&TrendLine>,
) -> Result<String> {
    let info = VariableInfo::describe(variable);
    let (first, last) = match (points.first(), points.last()) {
        (Some(first), Some(last)) => (first.0, last.0),
        _ => return Err(ChartError::Empty(format!("no values for '{variable}'"))),
    };
    let last = if last > first {
        last
    } else {
        first + Duration::days(1)
    };
    let trend_points: Vec<(NaiveDate, f64)> = trend
        .map(|t| {
            vec![
                (first, t.evaluate(to_ordinal(&first))),
                (last, t.evaluate(to_ordinal(&last))),
            ]
        })
        .unwrap_or_default();
    let y_range = value_range(
        points
            .iter()
            .chain(trend_points.iter())
            .map(|(_, v)| *v),
    )
    .ok_or_else(|| ChartError::Empty(format!("no finite values for '{variable}'")))?;

    let color = color_of(&info);
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, CHART_SIZE).into_drawing_area();
        root.fill(&WHITE).map_err(drawing)?;
        let x_range: RangedDate<NaiveDate> = (first..last).into();
        let mut chart = ChartBuilder::on(&root)
            .caption(format!("{} over time", info.label), (FONT, 24))
            .margin(20)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(x_range, y_range)
            .map_err(drawing)?;
        chart
            .configure_mesh()
            .x_labels(10)
            .x_desc("Date")
            .y_desc(info.axis_label())
            .draw()
            .map_err(drawing)?;

        chart
            .draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(2)))
            .map_err(drawing)?
            .label(info.label.clone())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
        if !trend_points.is_empty() {
            chart
                .draw_series(LineSeries::new(trend_points, RED.stroke_width(2)))
                .map_err(drawing)?
                .label("Trend")
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));
        }
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(drawing)?;
        root.present().map_err(drawing)?;
    }
    debug!("chart: trend of '{}' with {} points", variable, points.len());
    Ok(svg)
}

/// Scatter of the target against a covariate with the fitted line.
pub fn render_correlation_chart(correlation: &Correlation) -> Result<String> {
    if correlation.pairs.is_empty() {
        return Err(ChartError::Empty(format!(
            "no pairs for '{}'",
            correlation.variable
        )));
    }
    let x_info = VariableInfo::describe(&correlation.variable);
    let y_info = VariableInfo::describe(&correlation.target);
    let x_range = value_range(correlation.pairs.iter().map(|p| p.x))
        .ok_or_else(|| ChartError::Empty(correlation.variable.clone()))?;
    let trend = &correlation.trend;
    let line = vec![
        (x_range.start, trend.evaluate(x_range.start)),
        (x_range.end, trend.evaluate(x_range.end)),
    ];
    let y_range = value_range(
        correlation
            .pairs
            .iter()
            .map(|p| p.y)
            .chain(line.iter().map(|(_, y)| *y)),
    )
    .ok_or_else(|| ChartError::Empty(correlation.target.clone()))?;

    let color = color_of(&x_info);
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, CHART_SIZE).into_drawing_area();
        root.fill(&WHITE).map_err(drawing)?;
        let mut chart = ChartBuilder::on(&root)
            .caption(
                format!(
                    "{} vs {} ({})",
                    y_info.label, x_info.label, correlation.scale
                ),
                (FONT, 24),
            )
            .margin(20)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(x_range, y_range)
            .map_err(drawing)?;
        chart
            .configure_mesh()
            .x_desc(x_info.axis_label())
            .y_desc(y_info.axis_label())
            .draw()
            .map_err(drawing)?;
        chart
            .draw_series(
                correlation
                    .pairs
                    .iter()
                    .map(|p| Circle::new((p.x, p.y), 3, color.mix(0.6).filled())),
            )
            .map_err(drawing)?;
        chart
            .draw_series(LineSeries::new(line, RED.stroke_width(2)))
            .map_err(drawing)?;
        root.present().map_err(drawing)?;
    }
    debug!(
        "chart: correlation of '{}' with {} pairs",
        correlation.variable,
        correlation.pairs.len()
    );
    Ok(svg)
}

fn month_label(month: &u32) -> String {
    month
        .checked_sub(1)
        .and_then(|i| MONTH_NAMES.get(i as usize))
        .map(|name| name.to_string())
        .unwrap_or_default()
}

/// Mean value per calendar month.
pub fn render_seasonal_chart(profile: &SeasonalProfile) -> Result<String> {
    let points = profile.points();
    let info = VariableInfo::describe(&profile.variable);
    let y_range = value_range(points.iter().map(|(_, v)| *v))
        .ok_or_else(|| ChartError::Empty(format!("no monthly means for '{}'", profile.variable)))?;

    let color = color_of(&info);
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, CHART_SIZE).into_drawing_area();
        root.fill(&WHITE).map_err(drawing)?;
        let mut chart = ChartBuilder::on(&root)
            .caption(format!("Seasonal pattern of {}", info.label), (FONT, 24))
            .margin(20)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(1u32..12u32, y_range)
            .map_err(drawing)?;
        chart
            .configure_mesh()
            .x_labels(12)
            .x_label_formatter(&month_label)
            .x_desc("Month")
            .y_desc(info.axis_label())
            .draw()
            .map_err(drawing)?;
        chart
            .draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(2)))
            .map_err(drawing)?;
        chart
            .draw_series(
                points
                    .iter()
                    .map(|(m, v)| Circle::new((*m, *v), 4, color.filled())),
            )
            .map_err(drawing)?;
        root.present().map_err(drawing)?;
    }
    Ok(svg)
}

/// Write a rendered chart, creating missing parent directories.
pub fn write_svg<P: AsRef<Path>>(path: P, svg: &str) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, svg)?;
    debug!("chart: wrote {}", path.display());
    Ok(())
}
