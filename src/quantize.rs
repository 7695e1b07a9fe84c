//! Turns a monochrome glyph bitmap into a sequence of observation symbols.
//!
//! The bitmap is cut into horizontal bands; each band yields one symbol
//! describing how much ink its three densest row segments carry.

use std::{fmt::Display, str::FromStr};

use crate::{Error, Result};

/// Number of distinct symbols produced by [`observations`].
pub const NUM_SYMBOLS: usize = 12;

/// Ink count below which a segment is [`Class::Small`].
pub const DEFAULT_THRESHOLD: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Class {
    None,
    Small,
    Large,
}

impl Class {
    pub fn of(ink: usize, threshold: usize) -> Self {
        match ink {
            0 => Class::None,
            n if n < threshold => Class::Small,
            _ => Class::Large,
        }
    }
}

/// Symbol id of a descending class triple.
pub fn class_id(triple: [Class; 3]) -> Option<usize> {
    use Class::*;
    let id = match triple {
        [None, None, None] => 0,
        [Small, None, None] => 1,
        [Small, Small, None] => 2,
        [Small, Small, Small] => 3,
        [None, Small, None] => 4,
        [None, None, Small] => 5,
        [Large, None, None] => 6,
        [Large, Large, None] => 7,
        [Large, Small, None] => 8,
        [Large, Small, Small] => 9,
        [Large, Large, Small] => 10,
        [Large, Large, Large] => 11,
        _ => return Option::None,
    };
    Some(id)
}

/// A rectangular grid of ink (`true`) and blank (`false`) pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: usize,
    height: usize,
    pixels: Vec<bool>,
}

impl Bitmap {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![false; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, x: usize, y: usize) -> bool {
        self.pixels[self.width * y + x]
    }

    pub fn set(&mut self, x: usize, y: usize, ink: bool) {
        self.pixels[self.width * y + x] = ink;
    }

    pub fn row(&self, y: usize) -> &[bool] {
        &self.pixels[self.width * y..self.width * (y + 1)]
    }

    /// Bounding box of the ink as `(min_x, min_y, max_x, max_y)`.
    pub fn ink_bounds(&self) -> Option<(usize, usize, usize, usize)> {
        let mut bounds: Option<(usize, usize, usize, usize)> = None;
        for y in 0..self.height {
            for x in (0..self.width).filter(|&x| self.get(x, y)) {
                bounds = Some(match bounds {
                    Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
                    None => (x, y, x, y),
                });
            }
        }
        bounds
    }

    /// Moves the ink bounding box to the top-left corner; the dimensions
    /// are kept and the rest is blank. A blank bitmap is returned as is.
    pub fn crop(&self) -> Self {
        let Some((x0, y0, x1, y1)) = self.ink_bounds() else {
            return self.clone();
        };
        let mut out = Bitmap::new(self.width, self.height);
        for y in y0..=y1 {
            for x in x0..=x1 {
                out.set(x - x0, y - y0, self.get(x, y));
            }
        }
        out
    }
}

impl FromStr for Bitmap {
    type Err = Error;

    /// Parses rows of `#` (ink) and `.` (blank); blank lines are ignored.
    fn from_str(s: &str) -> Result<Self> {
        let mut width = None;
        let mut pixels = Vec::new();
        let mut height = 0;
        for (lineno, line) in s.lines().map(str::trim).enumerate() {
            if line.is_empty() {
                continue;
            }
            let n = line.chars().count();
            match width {
                None => width = Some(n),
                Some(w) if w != n => {
                    return Err(Error::InvalidInput(format!(
                        "line {}: expected {w} pixels, got {n}",
                        lineno + 1
                    )))
                }
                Some(_) => {}
            }
            for c in line.chars() {
                pixels.push(match c {
                    '#' => true,
                    '.' => false,
                    _ => {
                        return Err(Error::InvalidInput(format!(
                            "line {}: invalid pixel '{c}'",
                            lineno + 1
                        )))
                    }
                });
            }
            height += 1;
        }
        let width =
            width.ok_or_else(|| Error::InvalidInput("bitmap has no pixels".to_string()))?;
        Ok(Self {
            width,
            height,
            pixels,
        })
    }
}

impl Display for Bitmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for y in 0..self.height {
            for &ink in self.row(y) {
                write!(f, "{}", if ink { '#' } else { '.' })?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Quantizes `bitmap` into one symbol per band of `band_height` rows.
///
/// Every row of a band is cut into segments of `segment_width` pixels.
/// Segments do not overlap, so every pixel is counted once; slicing each
/// segment one pixel wider (overlapping the next) gives different counts
/// and thus different symbols on the same glyph.
/// The ink counts of all segments of the band are sorted in descending
/// order, the top three (padded with zeros) are classed against
/// `threshold`, and the class triple is mapped by [`class_id`].
pub fn observations(
    bitmap: &Bitmap,
    band_height: usize,
    segment_width: usize,
    threshold: usize,
) -> Result<Vec<usize>> {
    if band_height == 0 || segment_width == 0 {
        return Err(Error::InvalidInput(format!(
            "band height and segment width must be positive, got {band_height} and {segment_width}"
        )));
    }
    let mut symbols = Vec::with_capacity((bitmap.height() + band_height - 1) / band_height);
    for band in (0..bitmap.height()).step_by(band_height) {
        let mut counts: Vec<usize> = (band..bitmap.height().min(band + band_height))
            .flat_map(|y| {
                bitmap
                    .row(y)
                    .chunks(segment_width)
                    .map(|seg| seg.iter().filter(|&&ink| ink).count())
            })
            .collect();
        counts.sort_unstable_by(|a, b| b.cmp(a));
        counts.resize(counts.len().max(3), 0);
        let triple = [
            Class::of(counts[0], threshold),
            Class::of(counts[1], threshold),
            Class::of(counts[2], threshold),
        ];
        let id = class_id(triple).ok_or_else(|| {
            Error::InvalidInput(format!("no symbol for class triple {triple:?}"))
        })?;
        symbols.push(id);
    }
    Ok(symbols)
}
