//! Plate region isolation from edge/contour geometry

use image::GrayImage;
use imageproc::contours::find_contours;
use imageproc::edges::canny;
use imageproc::geometry::{approximate_polygon_dp, arc_length, contour_area};
use imageproc::point::Point;

/// Canny hysteresis thresholds
const CANNY_LOW: f32 = 30.0;
const CANNY_HIGH: f32 = 200.0;
/// Only the largest contours by enclosed area are considered
const MAX_CONTOURS: usize = 10;
/// Polygon approximation tolerance as a fraction of the perimeter
const APPROX_EPSILON_RATIO: f64 = 0.018;
/// Accepted width/height band for a plate, inclusive
pub const MIN_ASPECT: f64 = 2.0;
pub const MAX_ASPECT: f64 = 5.0;

/// Axis-aligned rectangle in image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

/// Sub-window of the grayscale frame hypothesized to contain the plate
#[derive(Debug, Clone)]
pub struct PlateRegion {
    pub rect: Rect,
    pub image: GrayImage,
    /// True when no contour qualified and the region is the whole frame
    pub fallback: bool,
}

impl PlateRegion {
    pub fn full(image: GrayImage) -> Self {
        let rect = Rect {
            x: 0,
            y: 0,
            width: image.width(),
            height: image.height(),
        };
        Self {
            rect,
            image,
            fallback: true,
        }
    }
}

/// Locate the plate in an already smoothed grayscale image, falling back to
/// the whole image.
pub fn isolate(smoothed: &GrayImage) -> PlateRegion {
    let edges = canny(smoothed, CANNY_LOW, CANNY_HIGH);
    let contours = find_contours::<i32>(&edges);
    tracing::debug!(contours = contours.len(), "Extracted contours from edge map");

    match select_plate_rect(contours.iter().map(|c| c.points.as_slice())) {
        Some(rect) => {
            tracing::debug!(?rect, aspect = rect.aspect_ratio(), "Plate-shaped contour found");
            let image =
                image::imageops::crop_imm(smoothed, rect.x, rect.y, rect.width, rect.height)
                    .to_image();
            PlateRegion {
                rect,
                image,
                fallback: false,
            }
        }
        None => {
            tracing::debug!("No plate-shaped contour, using the full frame");
            PlateRegion::full(smoothed.clone())
        }
    }
}

/// Rank contours by enclosed area and return the bounding rectangle of the
/// first one that approximates to a quadrilateral inside the aspect band.
pub fn select_plate_rect<'a, I>(contours: I) -> Option<Rect>
where
    I: IntoIterator<Item = &'a [Point<i32>]>,
{
    let mut ranked: Vec<(f64, &[Point<i32>])> = contours
        .into_iter()
        .filter(|points| !points.is_empty())
        .map(|points| (contour_area(points), points))
        .collect();
    // Stable sort keeps discovery order among equal areas
    ranked.sort_by(|a, b| b.0.total_cmp(&a.0));

    ranked
        .into_iter()
        .take(MAX_CONTOURS)
        .find_map(|(_, points)| {
            let epsilon = APPROX_EPSILON_RATIO * arc_length(points, true);
            // Single points and coincident runs have no perimeter to simplify
            if epsilon <= 0.0 {
                return None;
            }
            let approx = approximate_polygon_dp(points, epsilon, true);
            if approx.len() != 4 {
                return None;
            }
            let rect = bounding_rect(&approx);
            is_plate_aspect(&rect).then_some(rect)
        })
}

/// True when the rectangle's width/height lies in [MIN_ASPECT, MAX_ASPECT]
pub fn is_plate_aspect(rect: &Rect) -> bool {
    if rect.height == 0 {
        return false;
    }
    (MIN_ASPECT..=MAX_ASPECT).contains(&rect.aspect_ratio())
}

/// Bounding rectangle with inclusive pixel extents
pub fn bounding_rect(points: &[Point<i32>]) -> Rect {
    let min_x = points.iter().map(|p| p.x).min().unwrap_or(0).max(0);
    let max_x = points.iter().map(|p| p.x).max().unwrap_or(0).max(0);
    let min_y = points.iter().map(|p| p.y).min().unwrap_or(0).max(0);
    let max_y = points.iter().map(|p| p.y).max().unwrap_or(0).max(0);
    Rect {
        x: min_x as u32,
        y: min_y as u32,
        width: (max_x - min_x + 1) as u32,
        height: (max_y - min_y + 1) as u32,
    }
}
