//! PNG chart of method size against fix ratio.
//!
//! Four panels on a 2x2 grid: a size/fix-ratio scatter, mean fix ratio per
//! size tier, a size histogram, and mean fix ratio per repository. The chart
//! carries no text; the Markdown report holds the labels and numbers.

use std::path::Path;

use fixscope_core::{AggregatedMethod, FixscopeError};
use image::{Rgb, RgbImage};

use crate::stats::{Statistics, Tier};

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const PANEL: Rgb<u8> = Rgb([248, 248, 250]);
const GRID: Rgb<u8> = Rgb([222, 222, 228]);
const AXIS: Rgb<u8> = Rgb([90, 90, 100]);
const POINT: Rgb<u8> = Rgb([31, 119, 180]);
const HISTOGRAM: Rgb<u8> = Rgb([120, 120, 200]);
const REPOSITORY: Rgb<u8> = Rgb([140, 86, 75]);

/// Number of histogram bins.
const BINS: usize = 30;
/// Most repositories drawn in the per-repository panel.
const MAX_REPOSITORIES: usize = 40;
/// Padding between a panel edge and its plot area.
const MARGIN: u32 = 24;

fn tier_color(tier: Tier) -> Rgb<u8> {
    match tier {
        Tier::Small => Rgb([44, 160, 44]),
        Tier::Medium => Rgb([255, 127, 14]),
        Tier::Large => Rgb([214, 39, 40]),
    }
}

/// Plot area inside one panel, in pixels.
#[derive(Debug, Clone, Copy)]
struct Area {
    x: u32,
    y: u32,
    w: u32,
    h: u32,
}

impl Area {
    /// Pixel for a point in unit coordinates, `(0, 0)` at bottom left.
    fn point(&self, fx: f64, fy: f64) -> (u32, u32) {
        let fx = fx.clamp(0.0, 1.0);
        let fy = fy.clamp(0.0, 1.0);
        let px = self.x + (fx * f64::from(self.w.saturating_sub(1))).round() as u32;
        let py = self.y + self.h.saturating_sub(1) - (fy * f64::from(self.h.saturating_sub(1))).round() as u32;
        (px, py)
    }

    /// Vertical bar `index` of `count` reaching height `fy`.
    fn bar(&self, index: usize, count: usize, fy: f64) -> (u32, u32, u32, u32) {
        let slot = self.w / count.max(1) as u32;
        let gap = (slot / 5).max(1).min(slot.saturating_sub(1));
        let x = self.x + slot * index as u32 + gap / 2;
        let width = slot.saturating_sub(gap).max(1);
        let height = (fy.clamp(0.0, 1.0) * f64::from(self.h)).round() as u32;
        (x, self.y + self.h - height, width, height)
    }
}

fn fill(image: &mut RgbImage, x: u32, y: u32, w: u32, h: u32, color: Rgb<u8>) {
    let x_end = (x + w).min(image.width());
    let y_end = (y + h).min(image.height());
    for py in y..y_end {
        for px in x..x_end {
            image.put_pixel(px, py, color);
        }
    }
}

/// Panel background, quarter grid lines and the two axes.
fn frame(image: &mut RgbImage, x: u32, y: u32, w: u32, h: u32) -> Area {
    fill(image, x, y, w, h, PANEL);
    let area = Area {
        x: x + MARGIN,
        y: y + MARGIN,
        w: w.saturating_sub(2 * MARGIN).max(1),
        h: h.saturating_sub(2 * MARGIN).max(1),
    };
    for step in 1..4 {
        let (_, gy) = area.point(0.0, f64::from(step) / 4.0);
        fill(image, area.x, gy, area.w, 1, GRID);
    }
    fill(image, area.x, area.y, 1, area.h, AXIS);
    fill(image, area.x, area.y + area.h - 1, area.w, 1, AXIS);
    area
}

/// Draw the chart for `methods`, or `None` when there is nothing to plot.
///
/// # Examples
///
/// ```
/// use fixscope_report::chart::render_chart;
/// use fixscope_report::{compute, SizeTiers};
///
/// let stats = compute(&[], SizeTiers::default(), 10);
/// assert!(render_chart(&[], &stats, 800, 600).is_none());
/// ```
pub fn render_chart(
    methods: &[AggregatedMethod],
    stats: &Statistics,
    width: u32,
    height: u32,
) -> Option<RgbImage> {
    if methods.is_empty() {
        return None;
    }
    let width = width.max(4 * MARGIN + 8);
    let height = height.max(4 * MARGIN + 8);
    let mut image = RgbImage::from_pixel(width, height, BACKGROUND);
    let (half_w, half_h) = (width / 2, height / 2);

    let max_size = methods.iter().map(|m| m.size_lines).max().unwrap_or(1).max(1);

    // Size vs fix ratio.
    let scatter = frame(&mut image, 0, 0, half_w, half_h);
    for m in methods {
        let (px, py) = scatter.point(f64::from(m.size_lines) / f64::from(max_size), m.fix_ratio);
        let color = tier_color(stats.tiers.tier(m.size_lines));
        fill(&mut image, px.saturating_sub(1), py.saturating_sub(1), 3, 3, color);
    }

    // Mean fix ratio per tier.
    let tiers = frame(&mut image, half_w, 0, width - half_w, half_h);
    for (i, tier) in Tier::ALL.iter().enumerate() {
        let mean = stats.tier(*tier).and_then(|t| t.mean_fix_ratio).unwrap_or(0.0);
        let (x, y, w, h) = tiers.bar(i, Tier::ALL.len(), mean);
        fill(&mut image, x, y, w, h, tier_color(*tier));
    }

    // Size histogram.
    let histogram = frame(&mut image, 0, half_h, half_w, height - half_h);
    let counts = histogram_counts(methods, max_size);
    let peak = counts.iter().copied().max().unwrap_or(1).max(1);
    for (i, count) in counts.iter().enumerate() {
        let (x, y, w, h) = histogram.bar(i, BINS, *count as f64 / peak as f64);
        fill(&mut image, x, y, w, h, HISTOGRAM);
    }

    // Mean fix ratio per repository.
    let repos = frame(&mut image, half_w, half_h, width - half_w, height - half_h);
    let shown = stats.per_repository.len().min(MAX_REPOSITORIES);
    for (i, repo) in stats.per_repository.iter().take(shown).enumerate() {
        let (x, y, w, h) = repos.bar(i, shown, repo.mean_fix_ratio);
        fill(&mut image, x, y, w, h, REPOSITORY);
    }

    Some(image)
}

/// Counts of method sizes over [`BINS`] equal-width bins from 1 to `max_size`.
fn histogram_counts(methods: &[AggregatedMethod], max_size: u32) -> Vec<usize> {
    let mut counts = vec![0usize; BINS];
    let span = f64::from(max_size.max(1));
    for m in methods {
        let fraction = f64::from(m.size_lines.saturating_sub(1)) / span;
        let bin = ((fraction * BINS as f64) as usize).min(BINS - 1);
        counts[bin] += 1;
    }
    counts
}

/// Render and save the chart as PNG at `path`.
///
/// Returns `false` without writing anything when `methods` is empty.
///
/// # Errors
///
/// Returns [`FixscopeError::Io`] if the image cannot be encoded or written.
pub fn write_chart(
    path: &Path,
    methods: &[AggregatedMethod],
    stats: &Statistics,
    width: u32,
    height: u32,
) -> Result<bool, FixscopeError> {
    let Some(image) = render_chart(methods, stats, width, height) else {
        tracing::warn!("no methods to chart");
        return Ok(false);
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    image
        .save(path)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    tracing::info!(path = %path.display(), "chart written");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::{compute, SizeTiers};

    fn method(size: u32, ratio: f64, repo: &str) -> AggregatedMethod {
        AggregatedMethod {
            name: format!("m{size}"),
            file_path: "A.java".into(),
            start_line: 1,
            end_line: size,
            size_lines: size,
            repository: repo.into(),
            commit_count: 4,
            fix_commit_count: (ratio * 4.0) as u32,
            fix_ratio: ratio,
            fix_commit_ids: vec![],
        }
    }

    #[test]
    fn chart_has_requested_size_and_tier_colors() {
        let methods = vec![method(5, 0.5, "a"), method(30, 1.0, "a"), method(80, 0.25, "b")];
        let stats = compute(&methods, SizeTiers::default(), 10);
        let image = render_chart(&methods, &stats, 800, 600).unwrap();
        assert_eq!(image.dimensions(), (800, 600));

        let colors: Vec<Rgb<u8>> = image.pixels().copied().collect();
        for tier in Tier::ALL {
            assert!(colors.contains(&tier_color(tier)), "missing {tier} color");
        }
        assert!(colors.contains(&HISTOGRAM));
        assert!(colors.contains(&REPOSITORY));
    }

    #[test]
    fn histogram_puts_extremes_in_first_and_last_bins() {
        let methods = vec![method(1, 0.0, "a"), method(100, 0.0, "a"), method(100, 0.0, "a")];
        let counts = histogram_counts(&methods, 100);
        assert_eq!(counts[0], 1);
        assert_eq!(counts[BINS - 1], 2);
        assert_eq!(counts.iter().sum::<usize>(), 3);
    }

    #[test]
    fn write_chart_skips_empty_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.png");
        let stats = compute(&[], SizeTiers::default(), 10);
        assert!(!write_chart(&path, &[], &stats, 800, 600).unwrap());
        assert!(!path.exists());
    }

    #[test]
    fn write_chart_produces_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/chart.png");
        let methods = vec![method(12, 0.5, "a")];
        let stats = compute(&methods, SizeTiers::default(), 10);
        assert!(write_chart(&path, &methods, &stats, 400, 300).unwrap());

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }
}
