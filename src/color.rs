use std::collections::{BTreeMap, BTreeSet};

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

use crate::data::model::{Category, Record};

/// Number of depth bands the gradient is split into.
pub const DEPTH_BANDS: usize = 8;

const NO_VALUE: Color32 = Color32::GRAY;

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

fn hsl_to_color32(hue: f32, saturation: f32, lightness: f32) -> Color32 {
    let rgb: Srgb = Hsl::new(hue, saturation, lightness).into_color();
    Color32::from_rgb(
        (rgb.red * 255.0) as u8,
        (rgb.green * 255.0) as u8,
        (rgb.blue * 255.0) as u8,
    )
}

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    (0..n)
        .map(|i| hsl_to_color32((i as f32 / n as f32) * 360.0, 0.75, 0.55))
        .collect()
}

// ---------------------------------------------------------------------------
// Depth gradient: shallow (warm) → deep (dark blue)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct DepthGradient {
    min: f64,
    max: f64,
}

impl DepthGradient {
    pub fn new(range: Option<(f64, f64)>) -> Self {
        let (min, max) = range.unwrap_or((0.0, 0.0));
        Self { min, max }
    }

    /// Band index for a depth; `None` when the depth is missing.
    pub fn band(&self, depth: Option<f64>) -> Option<usize> {
        let depth = depth?;
        let span = self.max - self.min;
        if span <= f64::EPSILON {
            return Some(0);
        }
        let t = ((depth - self.min) / span).clamp(0.0, 1.0);
        Some(((t * DEPTH_BANDS as f64) as usize).min(DEPTH_BANDS - 1))
    }

    pub fn band_color(&self, band: usize) -> Color32 {
        let t = (band as f32 + 0.5) / DEPTH_BANDS as f32;
        hsl_to_color32(45.0 + t * 195.0, 0.8, 0.6 - t * 0.25)
    }

    pub fn band_label(&self, band: usize) -> String {
        let step = (self.max - self.min) / DEPTH_BANDS as f64;
        let lo = self.min + step * band as f64;
        format!("{:.0}–{:.0} m", lo, lo + step)
    }
}

// ---------------------------------------------------------------------------
// Color mapping: category value → Color32
// ---------------------------------------------------------------------------

/// Maps the distinct values of a text column to distinct colours.
#[derive(Debug, Clone)]
pub struct ColorMap {
    pub category: Category,
    mapping: BTreeMap<Option<String>, Color32>,
}

impl ColorMap {
    /// Build a colour map for the given column from its unique values.
    pub fn new(category: Category, unique_values: &BTreeSet<Option<String>>) -> Self {
        let palette = generate_palette(unique_values.len());
        let mapping = unique_values
            .iter()
            .cloned()
            .zip(palette)
            .map(|(v, c)| {
                let color = if v.is_none() { NO_VALUE } else { c };
                (v, color)
            })
            .collect();

        ColorMap { category, mapping }
    }

    /// Look up the colour for a given value.
    pub fn color_for(&self, value: Option<&str>) -> Color32 {
        self.mapping
            .get(&value.map(str::to_string))
            .copied()
            .unwrap_or(NO_VALUE)
    }

    fn position(&self, value: Option<&str>) -> usize {
        let key = value.map(str::to_string);
        self.mapping
            .keys()
            .position(|k| *k == key)
            .unwrap_or(self.mapping.len())
    }
}

// ---------------------------------------------------------------------------
// Coloring: how plot points are grouped into coloured series
// ---------------------------------------------------------------------------

/// What the user picked in the "Color by" box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorBy {
    #[default]
    Depth,
    Category(Category),
}

/// One plot series: a legend label and its colour.  `order` sorts series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesKey {
    pub order: usize,
    pub label: String,
    pub color: Color32,
}

#[derive(Debug, Clone)]
pub enum Coloring {
    Depth(DepthGradient),
    Category(ColorMap),
}

impl Coloring {
    pub fn series_for(&self, record: &Record) -> SeriesKey {
        match self {
            Coloring::Depth(gradient) => match gradient.band(record.depth) {
                Some(band) => SeriesKey {
                    order: band,
                    label: gradient.band_label(band),
                    color: gradient.band_color(band),
                },
                None => SeriesKey {
                    order: DEPTH_BANDS,
                    label: "no depth".to_string(),
                    color: NO_VALUE,
                },
            },
            Coloring::Category(map) => {
                let value = record.category(map.category);
                SeriesKey {
                    order: map.position(value),
                    label: value.unwrap_or("<blank>").to_string(),
                    color: map.color_for(value),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_has_requested_size() {
        assert!(generate_palette(0).is_empty());
        let colors = generate_palette(5);
        assert_eq!(colors.len(), 5);
        assert_ne!(colors[0], colors[1]);
    }

    #[test]
    fn depth_bands_cover_the_range() {
        let g = DepthGradient::new(Some((0.0, 800.0)));
        assert_eq!(g.band(Some(0.0)), Some(0));
        assert_eq!(g.band(Some(800.0)), Some(DEPTH_BANDS - 1));
        assert_eq!(g.band(Some(150.0)), Some(1));
        assert_eq!(g.band(None), None);
        assert_eq!(g.band_label(1), "100–200 m");
    }

    #[test]
    fn flat_depth_range_uses_one_band() {
        let g = DepthGradient::new(Some((5.0, 5.0)));
        assert_eq!(g.band(Some(5.0)), Some(0));
    }

    #[test]
    fn category_series_follow_sorted_values() {
        let values: BTreeSet<Option<String>> =
            [None, Some("AR-2".to_string()), Some("AR-1".to_string())].into();
        let coloring = Coloring::Category(ColorMap::new(Category::Cruise, &values));

        let mut record = Record {
            cruise: Some("AR-2".to_string()),
            ..Record::default()
        };
        let key = coloring.series_for(&record);
        assert_eq!(key.order, 2);
        assert_eq!(key.label, "AR-2");

        record.cruise = None;
        let key = coloring.series_for(&record);
        assert_eq!(key.order, 0);
        assert_eq!(key.color, NO_VALUE);
    }
}
