use std::fmt::Write;

use base64::Engine as _;
use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};

use crate::error::ExportError;
use crate::models::{ForecastPoint, SurveyRecord, MAX_SUB_SCORE};

const WIDTH: u32 = 720;
const HEIGHT: u32 = 300;
const MARGIN: u32 = 24;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const GRID: Rgb<u8> = Rgb([241, 245, 249]);
const LINE: Rgb<u8> = Rgb([16, 185, 129]);
const FILL: Rgb<u8> = Rgb([209, 250, 229]);

const BAR_WIDTH: usize = 25;

/// Raster snapshot of the AIRS trend line, PNG-encoded.
pub fn render_airs_png(survey: &SurveyRecord) -> Result<Vec<u8>, ExportError> {
    let scores: Vec<u8> = survey.airs_scores().iter().map(|(_, v)| *v).collect();
    let mut img = RgbImage::from_pixel(WIDTH, HEIGHT, BACKGROUND);

    let plot_h = HEIGHT - 2 * MARGIN;
    let plot_w = WIDTH - 2 * MARGIN;
    let y_of = |score: u8| -> u32 {
        let clamped = u32::from(score.min(MAX_SUB_SCORE));
        MARGIN + plot_h - clamped * plot_h / u32::from(MAX_SUB_SCORE)
    };
    let x_of = |index: usize| -> u32 {
        MARGIN + (index as u32) * plot_w / (scores.len() as u32 - 1)
    };

    for tick in 0..=MAX_SUB_SCORE {
        let y = y_of(tick);
        for x in MARGIN..=(MARGIN + plot_w) {
            img.put_pixel(x, y, GRID);
        }
    }

    // Area under the line first so the line stays on top.
    for pair in 0..scores.len() - 1 {
        let (x0, y0) = (x_of(pair), y_of(scores[pair]));
        let (x1, y1) = (x_of(pair + 1), y_of(scores[pair + 1]));
        for x in x0..=x1 {
            let y = interpolate(x, x0, y0, x1, y1);
            for fill_y in y..=(MARGIN + plot_h) {
                img.put_pixel(x, fill_y, FILL);
            }
        }
    }

    for pair in 0..scores.len() - 1 {
        let (x0, y0) = (x_of(pair), y_of(scores[pair]));
        let (x1, y1) = (x_of(pair + 1), y_of(scores[pair + 1]));
        draw_segment(&mut img, (x0, y0), (x1, y1));
    }

    for (index, score) in scores.iter().enumerate() {
        draw_marker(&mut img, x_of(index), y_of(*score));
    }

    let mut png = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut png, ImageOutputFormat::Png)
        .map_err(|e| ExportError::Chart(e.to_string()))?;
    Ok(png)
}

fn interpolate(x: u32, x0: u32, y0: u32, x1: u32, y1: u32) -> u32 {
    if x1 == x0 {
        return y0;
    }
    let t = f64::from(x - x0) / f64::from(x1 - x0);
    (f64::from(y0) + t * (f64::from(y1) - f64::from(y0))).round() as u32
}

fn draw_segment(img: &mut RgbImage, from: (u32, u32), to: (u32, u32)) {
    let dx = (i64::from(to.0) - i64::from(from.0)).abs();
    let dy = (i64::from(to.1) - i64::from(from.1)).abs();
    let steps = dx.max(dy).max(1);
    for step in 0..=steps {
        let t = step as f64 / steps as f64;
        let x = f64::from(from.0) + t * (f64::from(to.0) - f64::from(from.0));
        let y = f64::from(from.1) + t * (f64::from(to.1) - f64::from(from.1));
        let (x, y) = (x.round() as u32, y.round() as u32);
        img.put_pixel(x, y, LINE);
        if y + 1 < img.height() {
            img.put_pixel(x, y + 1, LINE);
        }
    }
}

fn draw_marker(img: &mut RgbImage, cx: u32, cy: u32) {
    for x in cx.saturating_sub(3)..=(cx + 3).min(img.width() - 1) {
        for y in cy.saturating_sub(3)..=(cy + 3).min(img.height() - 1) {
            img.put_pixel(x, y, LINE);
        }
    }
}

pub fn to_data_url(png: &[u8]) -> String {
    format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(png)
    )
}

/// Text bars for the forecast section of the rendered page, scaled to the
/// 0-5 severity range.
pub fn forecast_bars(points: &[ForecastPoint]) -> String {
    let mut output = String::new();
    let label_width = points.iter().map(|p| p.label.len()).max().unwrap_or(0);
    for point in points {
        let filled = ((point.score.clamp(0.0, f64::from(MAX_SUB_SCORE))
            / f64::from(MAX_SUB_SCORE))
            * BAR_WIDTH as f64)
            .round() as usize;
        let _ = writeln!(
            output,
            "{:<width$} | {}{} {}",
            point.label,
            "#".repeat(filled),
            " ".repeat(BAR_WIDTH - filled),
            point.score,
            width = label_width
        );
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::sample_survey;
    use crate::models::ForecastHorizon;

    #[test]
    fn snapshot_is_a_png() {
        let png = render_airs_png(&sample_survey()).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn out_of_range_scores_are_clamped_when_drawing() {
        let mut survey = sample_survey();
        survey.global_rating = 9;
        assert!(render_airs_png(&survey).is_ok());
    }

    #[test]
    fn data_url_carries_png_prefix() {
        let url = to_data_url(b"abc");
        assert_eq!(url, "data:image/png;base64,YWJj");
    }

    #[test]
    fn bars_scale_to_severity_range() {
        let points = vec![
            ForecastPoint::new(ForecastHorizon::Current, 0.0),
            ForecastPoint::new(ForecastHorizon::SixMonths, 5.0),
        ];
        let rendered = forecast_bars(&points);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Current | "));
        assert!(lines[0].ends_with(" 0"));
        assert!(lines[1].contains(&"#".repeat(BAR_WIDTH)));
        assert!(lines[1].starts_with("6 mo    | "));
    }
}
