// src/renderer.rs

use crate::error::Result;
use crate::model::RepositoryStatistics;
use image::{Rgb, RgbImage};
use palette::{FromColor, Lch, LinSrgb, Srgb};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

const BACKGROUND: Rgb<u8> = Rgb([8, 8, 12]);
const AXIS: Rgb<u8> = Rgb([110, 110, 120]);

#[derive(Debug, Clone)]
pub struct PlotOptions {
    pub dir: PathBuf,
    pub width: u32,
    pub height: u32,
    /// Largest bucket of the restricted histogram
    pub cap: usize,
}

/// One histogram to draw
struct Chart {
    file_name: &'static str,
    values: Vec<u64>,
    colors: Vec<Rgb<u8>>,
}

/// Render the range histograms as PNG files and return their paths.
///
/// - `function_commits.png`: commits per number of touched functions
/// - `function_commits_restricted.png`: the same for 1..=cap functions
/// - `extension_commits.png`: commits per touched file extension
pub fn render_plots(stats: &RepositoryStatistics, options: &PlotOptions) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(&options.dir)?;

    let max_functions = stats.commits_by_function_count.keys().max().copied().unwrap_or(0);
    let full = function_buckets(stats, 0, max_functions);
    let restricted = function_buckets(stats, 1, options.cap.min(max_functions));
    let extensions: Vec<u64> = stats.extension_counts.values().map(|&c| c as u64).collect();

    let charts = vec![
        Chart {
            file_name: "function_commits.png",
            colors: gradient_colors(full.len()),
            values: full,
        },
        Chart {
            file_name: "function_commits_restricted.png",
            colors: gradient_colors(restricted.len()),
            values: restricted,
        },
        Chart {
            file_name: "extension_commits.png",
            colors: generate_extension_colors(extensions.len()),
            values: extensions,
        },
    ];

    charts
        .par_iter()
        .map(|chart| -> Result<PathBuf> {
            let path = options.dir.join(chart.file_name);
            let image = draw_bar_chart(&chart.values, &chart.colors, options.width, options.height);
            save(&image, &path)?;
            Ok(path)
        })
        .collect()
}

fn save(image: &RgbImage, path: &Path) -> Result<()> {
    image.save(path)?;
    log::info!("Saved {}", path.display());
    Ok(())
}

/// Commit counts for every function count in `from..=to`, zero where absent
fn function_buckets(stats: &RepositoryStatistics, from: usize, to: usize) -> Vec<u64> {
    if from > to {
        return Vec::new();
    }
    (from..=to)
        .map(|k| stats.commits_by_function_count.get(&k).copied().unwrap_or(0) as u64)
        .collect()
}

/// Draw one bar per value, scaled to the largest value.
pub fn draw_bar_chart(values: &[u64], colors: &[Rgb<u8>], width: u32, height: u32) -> RgbImage {
    let mut image = RgbImage::from_pixel(width, height, BACKGROUND);
    let margin = (width.min(height) / 20).max(1);
    if width <= 2 * margin || height <= 2 * margin {
        return image;
    }
    let (left, right) = (margin, width - margin);
    let (top, bottom) = (margin, height - margin);

    for x in left..right {
        image.put_pixel(x, bottom, AXIS);
    }
    for y in top..=bottom {
        image.put_pixel(left, y, AXIS);
    }

    let max = values.iter().copied().max().unwrap_or(0);
    if max == 0 {
        return image;
    }

    let plot_width = (right - left - 1) as f32;
    let plot_height = (bottom - top) as f32;
    let slot = plot_width / values.len() as f32;

    for (i, &value) in values.iter().enumerate() {
        if value == 0 {
            continue;
        }
        let bar_height = ((value as f32 / max as f32) * plot_height).round().max(1.0) as u32;
        let x0 = left + 1 + (i as f32 * slot + slot * 0.1) as u32;
        let x1 = (left + 1 + ((i + 1) as f32 * slot - slot * 0.1) as u32)
            .max(x0 + 1)
            .min(right);
        let color = colors.get(i).copied().unwrap_or(AXIS);
        for x in x0..x1 {
            for y in (bottom - bar_height)..bottom {
                image.put_pixel(x, y, color);
            }
        }
    }
    image
}

/// Dark-to-light green along the x axis
fn gradient_colors(count: usize) -> Vec<Rgb<u8>> {
    let dark: LinSrgb<f32> = LinSrgb::from_color(Lch::new(45.0f32, 55.0f32, 140.0f32));
    let light: LinSrgb<f32> = LinSrgb::from_color(Lch::new(85.0f32, 70.0f32, 125.0f32));

    (0..count)
        .map(|i| {
            let t = if count > 1 { i as f32 / (count - 1) as f32 } else { 0.0 };
            let mixed = LinSrgb::new(
                dark.red + (light.red - dark.red) * t,
                dark.green + (light.green - dark.green) * t,
                dark.blue + (light.blue - dark.blue) * t,
            );
            to_rgb(Srgb::from_linear(mixed))
        })
        .collect()
}

fn generate_extension_colors(count: usize) -> Vec<Rgb<u8>> {
    let mut rng = StdRng::seed_from_u64(42); // Seed for stable colors between runs
    (0..count)
        .map(|_| {
            let hue = rng.gen_range(0.0f32..360.0f32);
            let srgb: Srgb<f32> = Srgb::from_color(Lch::new(70.0f32, 80.0f32, hue));
            to_rgb(srgb)
        })
        .collect()
}

fn to_rgb(color: Srgb<f32>) -> Rgb<u8> {
    let (r, g, b) = color.into_components();
    let channel = |c: f32| (c.clamp(0.0, 1.0) * 255.0f32) as u8;
    Rgb([channel(r), channel(g), channel(b)])
}
