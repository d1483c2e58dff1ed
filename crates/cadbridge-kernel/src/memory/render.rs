//! Flat-shaded view captures
//!
//! Every visible shape is drawn as the silhouette of its projected bounding
//! box, back to front, in its shape color. Good enough for an agent to see
//! what is where.

use cadbridge_core::model::Document;
use glam::DVec2;
use image::{ImageEncoder, Rgba, RgbaImage};

use crate::error::{KernelError, Result};
use crate::view::ViewName;

/// Largest accepted capture edge in pixels
pub(crate) const MAX_EDGE: u32 = 4096;

/// Fraction of the image the fitted scene may cover
const FIT_MARGIN: f64 = 0.9;

const BACKGROUND_TOP: [f32; 3] = [0.59, 0.69, 0.82];
const BACKGROUND_BOTTOM: [f32; 3] = [0.95, 0.96, 0.98];

struct Silhouette {
    hull: Vec<DVec2>,
    depth: f64,
    color: [f32; 4],
}

pub(crate) fn render(doc: &Document, view: ViewName, width: u32, height: u32) -> Result<Vec<u8>> {
    if width == 0 || height == 0 || width > MAX_EDGE || height > MAX_EDGE {
        return Err(KernelError::Capture(format!(
            "image size {width}x{height} outside 1..={MAX_EDGE}"
        )));
    }

    let (right, up, forward) = view.basis();

    let mut silhouettes: Vec<Silhouette> = doc
        .objects
        .iter()
        .filter_map(|obj| {
            let shape = obj.shape.as_ref()?;
            let look = obj.view.as_ref().filter(|v| v.visibility && v.transparency < 100)?;
            let points: Vec<DVec2> = shape
                .bound_box
                .corners()
                .iter()
                .map(|p| DVec2::new(p.dot(right), p.dot(up)))
                .collect();
            let mut color = look.shape_color.to_array();
            color[3] *= 1.0 - f32::from(look.transparency) / 100.0;
            Some(Silhouette {
                hull: convex_hull(points),
                depth: shape.bound_box.center().dot(forward),
                color,
            })
        })
        .collect();

    if silhouettes.is_empty() {
        return Err(KernelError::Capture(format!(
            "nothing visible in document '{}'",
            doc.name
        )));
    }

    // Fit all
    let (min, max) = silhouettes
        .iter()
        .flat_map(|s| s.hull.iter())
        .fold((DVec2::splat(f64::MAX), DVec2::splat(f64::MIN)), |(lo, hi), p| {
            (lo.min(*p), hi.max(*p))
        });
    let span = (max - min).max(DVec2::splat(1e-9));
    let size = DVec2::new(f64::from(width), f64::from(height));
    let scale = FIT_MARGIN * (size.x / span.x).min(size.y / span.y);
    let center = (min + max) * 0.5;
    for s in &mut silhouettes {
        for p in &mut s.hull {
            let offset = (*p - center) * scale;
            *p = DVec2::new(size.x * 0.5 + offset.x, size.y * 0.5 - offset.y);
        }
    }

    // Farthest first
    silhouettes.sort_by(|a, b| b.depth.total_cmp(&a.depth));

    let mut image = RgbaImage::from_fn(width, height, |_, y| {
        let t = y as f32 / height.max(2) as f32;
        let mix = |i: usize| BACKGROUND_TOP[i] + (BACKGROUND_BOTTOM[i] - BACKGROUND_TOP[i]) * t;
        Rgba(to_rgba8([mix(0), mix(1), mix(2), 1.0]))
    });

    for s in &silhouettes {
        fill_convex(&mut image, &s.hull, s.color);
        let [r, g, b, a] = s.color;
        outline(&mut image, &s.hull, [r * 0.4, g * 0.4, b * 0.4, a.max(0.5)]);
    }

    let mut png = Vec::new();
    image::codecs::png::PngEncoder::new(&mut png).write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        image::ExtendedColorType::Rgba8,
    )?;
    Ok(png)
}

/// Andrew's monotone chain; returns the hull counter-clockwise
fn convex_hull(mut points: Vec<DVec2>) -> Vec<DVec2> {
    points.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    points.dedup();
    if points.len() < 3 {
        return points;
    }

    let cross = |o: DVec2, a: DVec2, b: DVec2| (a - o).perp_dot(b - o);
    let mut hull: Vec<DVec2> = Vec::with_capacity(points.len() * 2);

    for pass in [points.clone(), points.into_iter().rev().collect()] {
        let start = hull.len();
        for p in pass {
            while hull.len() >= start + 2 && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0 {
                hull.pop();
            }
            hull.push(p);
        }
        hull.pop();
    }
    hull
}

fn fill_convex(image: &mut RgbaImage, hull: &[DVec2], color: [f32; 4]) {
    if hull.len() < 3 {
        return;
    }
    let (lo, hi) = hull
        .iter()
        .fold((DVec2::splat(f64::MAX), DVec2::splat(f64::MIN)), |(lo, hi), p| (lo.min(*p), hi.max(*p)));
    let x0 = lo.x.floor().max(0.0) as u32;
    let y0 = lo.y.floor().max(0.0) as u32;
    let x1 = (hi.x.ceil() as u32).min(image.width());
    let y1 = (hi.y.ceil() as u32).min(image.height());

    for y in y0..y1 {
        for x in x0..x1 {
            let p = DVec2::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
            let inside = hull
                .iter()
                .zip(hull.iter().cycle().skip(1))
                .all(|(a, b)| (*b - *a).perp_dot(p - *a) >= 0.0);
            if inside {
                blend(image, x, y, color);
            }
        }
    }
}

fn outline(image: &mut RgbaImage, hull: &[DVec2], color: [f32; 4]) {
    for (a, b) in hull.iter().zip(hull.iter().cycle().skip(1)) {
        let steps = a.distance(*b).ceil().max(1.0) as usize;
        for i in 0..=steps {
            let p = a.lerp(*b, i as f64 / steps as f64);
            if p.x >= 0.0 && p.y >= 0.0 && (p.x as u32) < image.width() && (p.y as u32) < image.height() {
                blend(image, p.x as u32, p.y as u32, color);
            }
        }
    }
}

fn blend(image: &mut RgbaImage, x: u32, y: u32, [r, g, b, a]: [f32; 4]) {
    let dst = image.get_pixel_mut(x, y);
    let under = dst.0.map(|c| f32::from(c) / 255.0);
    let mix = |src: f32, i: usize| src * a + under[i] * (1.0 - a);
    *dst = Rgba(to_rgba8([mix(r, 0), mix(g, 1), mix(b, 2), 1.0]));
}

fn to_rgba8(c: [f32; 4]) -> [u8; 4] {
    c.map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hull_of_square_with_interior_point() {
        let hull = convex_hull(vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(1.0, 0.0),
            DVec2::new(1.0, 1.0),
            DVec2::new(0.0, 1.0),
            DVec2::new(0.5, 0.5),
        ]);
        assert_eq!(hull.len(), 4);
        assert!(!hull.contains(&DVec2::new(0.5, 0.5)));
    }

    #[test]
    fn test_fill_covers_interior() {
        let mut image = RgbaImage::new(10, 10);
        let hull = convex_hull(vec![
            DVec2::new(2.0, 2.0),
            DVec2::new(8.0, 2.0),
            DVec2::new(8.0, 8.0),
            DVec2::new(2.0, 8.0),
        ]);
        fill_convex(&mut image, &hull, [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(image.get_pixel(5, 5).0, [255, 0, 0, 255]);
        assert_eq!(image.get_pixel(0, 0).0, [0, 0, 0, 0]);
    }
}
