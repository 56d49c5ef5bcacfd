//! Background removal seam and a local corner-keyed implementation.
//!
//! Badge art is drawn on a flat backdrop, so the colour found in the corners
//! is treated as the key. Pixels close to the key that are connected to the
//! image border are made transparent. Key-coloured pixels fully enclosed by
//! artwork are kept.

use std::collections::VecDeque;
use std::io::Cursor;

use image::{ImageFormat, Rgba, RgbaImage};

use crate::error::Result;

/// Default per-channel distance from the key still counted as background.
pub const DEFAULT_TOLERANCE: u8 = 30;

/// Anything that turns encoded image bytes into encoded image bytes with the
/// background removed.
pub trait BackgroundRemover {
    /// Remove the background from `input`, returning the new encoded image.
    ///
    /// # Errors
    ///
    /// Implementations fail when the input cannot be decoded or the backend
    /// rejects it.
    fn remove_background(&self, input: &[u8]) -> Result<Vec<u8>>;
}

impl<F> BackgroundRemover for F
where
    F: Fn(&[u8]) -> Result<Vec<u8>>,
{
    fn remove_background(&self, input: &[u8]) -> Result<Vec<u8>> {
        self(input)
    }
}

/// Local remover keyed on the corner colour. Always emits PNG.
#[derive(Debug, Clone, Copy)]
pub struct CornerKeyRemover {
    tolerance: u8,
}

impl Default for CornerKeyRemover {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl CornerKeyRemover {
    /// Create a remover with a custom per-channel tolerance.
    #[must_use]
    pub fn new(tolerance: u8) -> Self {
        Self { tolerance }
    }

    /// Per-channel tolerance in use.
    #[must_use]
    pub fn tolerance(&self) -> u8 {
        self.tolerance
    }
}

impl BackgroundRemover for CornerKeyRemover {
    fn remove_background(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut img = image::load_from_memory(input)?.to_rgba8();
        let cleared = strip_background(&mut img, self.tolerance);
        let total = u64::from(img.width()) * u64::from(img.height());
        if cleared == 0 {
            log::warn!("No background pixels matched the corner key; image left opaque");
        } else {
            log::debug!("Cleared {cleared} of {total} pixels");
        }

        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png)?;
        Ok(buf.into_inner())
    }
}

/// Backdrop colour taken from the four corner pixels, or `None` for an empty
/// image.
///
/// The corner agreeing with the most other corners (within `tolerance`) wins,
/// and the key is the average of that group. A corner covered by artwork is
/// outvoted instead of skewing the key.
#[must_use]
pub fn background_key(img: &RgbaImage, tolerance: u8) -> Option<Rgba<u8>> {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return None;
    }
    let corners =
        [(0, 0), (w - 1, 0), (0, h - 1), (w - 1, h - 1)].map(|(x, y)| *img.get_pixel(x, y));
    let close = |a: &Rgba<u8>, b: &Rgba<u8>| (0..4).all(|ch| a[ch].abs_diff(b[ch]) <= tolerance);

    // max_by_key keeps the last maximum; reverse so the earliest corner wins ties.
    let anchor = corners
        .iter()
        .rev()
        .max_by_key(|&c| corners.iter().filter(|&o| close(c, o)).count())?;
    let group: Vec<&Rgba<u8>> = corners.iter().filter(|&o| close(anchor, o)).collect();

    let mut sum = [0u32; 4];
    for px in &group {
        for (acc, v) in sum.iter_mut().zip(px.0) {
            *acc += u32::from(v);
        }
    }
    #[allow(clippy::cast_possible_truncation)]
    let avg = sum.map(|s| (s / group.len() as u32) as u8);
    Some(Rgba(avg))
}

fn is_background(px: &Rgba<u8>, key: &Rgba<u8>, tolerance: u8) -> bool {
    if px[3] == 0 {
        return true;
    }
    (0..3).all(|ch| px[ch].abs_diff(key[ch]) <= tolerance)
}

/// Flood-fill from the border, clearing every reachable pixel within
/// `tolerance` of the corner key. Returns the number of pixels cleared.
pub fn strip_background(img: &mut RgbaImage, tolerance: u8) -> u32 {
    let Some(key) = background_key(img, tolerance) else {
        return 0;
    };
    let (w, h) = img.dimensions();
    let idx = |x: u32, y: u32| (y as usize) * (w as usize) + x as usize;

    let mut visited = vec![false; (w as usize) * (h as usize)];
    let mut queue = VecDeque::new();

    let border = (0..w)
        .flat_map(|x| [(x, 0), (x, h - 1)])
        .chain((0..h).flat_map(|y| [(0, y), (w - 1, y)]));
    for (x, y) in border {
        if !visited[idx(x, y)] && is_background(img.get_pixel(x, y), &key, tolerance) {
            visited[idx(x, y)] = true;
            queue.push_back((x, y));
        }
    }

    let mut cleared = 0u32;
    while let Some((x, y)) = queue.pop_front() {
        img.put_pixel(x, y, Rgba([0, 0, 0, 0]));
        cleared += 1;

        let neighbours = [
            (x.wrapping_sub(1), y),
            (x + 1, y),
            (x, y.wrapping_sub(1)),
            (x, y + 1),
        ];
        for (nx, ny) in neighbours {
            if nx >= w || ny >= h || visited[idx(nx, ny)] {
                continue;
            }
            if is_background(img.get_pixel(nx, ny), &key, tolerance) {
                visited[idx(nx, ny)] = true;
                queue.push_back((nx, ny));
            }
        }
    }

    cleared
}
