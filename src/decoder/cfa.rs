//! Reconstruction of camera RAW data behind a color filter array.
//!
//! The mosaic is normalized between the black and white level, white balanced with the inverse of
//! the as-shot neutral and demosaiced bilinearly. Camera RGB is then mapped to XYZ with the sRGB
//! (D65) primaries.

use log::warn;

use super::image::Block;
use super::stream::ByteOrder;
use crate::raster::{RasterSink, Xyz};
use crate::tags::Tag;
use crate::{Directory, TiffError, TiffFormatError, TiffResult, TiffUnsupportedError};

/// Linear sRGB with a D65 white point to CIE XYZ.
const SRGB_TO_XYZ: [[f64; 3]; 3] = [
    [0.4124564, 0.3575761, 0.1804375],
    [0.2126729, 0.7151522, 0.0721750],
    [0.0193339, 0.1191920, 0.9503041],
];

/// Filter color of one photosite. Only red, green and blue filters are decoded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CfaColor {
    Red = 0,
    Green = 1,
    Blue = 2,
}

impl CfaColor {
    fn from_index(index: u64) -> Option<Self> {
        match index {
            0 => Some(CfaColor::Red),
            1 => Some(CfaColor::Green),
            2 => Some(CfaColor::Blue),
            _ => None,
        }
    }

    fn letter(self) -> char {
        match self {
            CfaColor::Red => 'R',
            CfaColor::Green => 'G',
            CfaColor::Blue => 'B',
        }
    }
}

/// The repeating tile of filter colors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CfaPattern {
    rows: usize,
    cols: usize,
    colors: Vec<CfaColor>,
}

impl CfaPattern {
    /// Resolves a pattern from the `CfaPattern` color indices and the optional
    /// `CfaRepeatPatternDim` rows and columns, which default to a 2x2 Bayer tile.
    ///
    /// Every color must appear at least once and only red, green and blue are accepted.
    pub fn resolve(values: &[u64], dims: Option<&[u64]>) -> TiffResult<Self> {
        let unrecognized = || {
            TiffError::UnsupportedError(TiffUnsupportedError::UnrecognizedCfaPattern(
                values
                    .iter()
                    .map(|&v| u8::try_from(v).unwrap_or(u8::MAX))
                    .collect(),
            ))
        };

        let (rows, cols) = match dims {
            Some([rows, cols, ..]) => (
                usize::try_from(*rows).map_err(|_| unrecognized())?,
                usize::try_from(*cols).map_err(|_| unrecognized())?,
            ),
            _ => (2, 2),
        };

        if rows == 0 || cols == 0 || rows.checked_mul(cols) != Some(values.len()) {
            return Err(unrecognized());
        }

        let colors = values
            .iter()
            .map(|&v| CfaColor::from_index(v))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(unrecognized)?;

        let complete = [CfaColor::Red, CfaColor::Green, CfaColor::Blue]
            .iter()
            .all(|c| colors.contains(c));
        if !complete {
            return Err(unrecognized());
        }

        Ok(CfaPattern { rows, cols, colors })
    }

    /// A 2x2 pattern given row by row.
    pub fn bayer(colors: [CfaColor; 4]) -> Self {
        CfaPattern {
            rows: 2,
            cols: 2,
            colors: colors.to_vec(),
        }
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    fn cell(&self, x: u32, y: u32) -> usize {
        (y as usize % self.rows) * self.cols + x as usize % self.cols
    }

    /// Filter color of the photosite at image position `(x, y)`.
    pub fn color_at(&self, x: u32, y: u32) -> CfaColor {
        self.colors[self.cell(x, y)]
    }

    /// The colors as letters, e.g. `RGGB`.
    pub fn name(&self) -> String {
        self.colors.iter().map(|c| c.letter()).collect()
    }
}

/// Calibration of a RAW image, derived once per decode.
#[derive(Debug)]
pub(crate) struct CfaContext {
    pattern: CfaPattern,
    /// One level for the whole mosaic or one per pattern cell.
    black_level: Vec<f64>,
    white_level: f64,
    white_balance: [f64; 3],
    bits_per_sample: u32,
    byte_order: ByteOrder,
}

impl CfaContext {
    pub fn from_directory(
        ifd: &Directory,
        bits_per_sample: u32,
        byte_order: ByteOrder,
    ) -> TiffResult<Self> {
        let pattern = CfaPattern::resolve(
            ifd.get(Tag::CfaPattern).map_or(&[][..], |e| e.words()),
            ifd.get(Tag::CfaRepeatPatternDim).map(|e| e.words()),
        )?;

        if let Some(table) = ifd.get(Tag::LinearizationTable) {
            warn!(
                "LinearizationTable with {} entries is not applied",
                table.count()
            );
        }
        if ifd.contains(Tag::ColorMatrix1) || ifd.contains(Tag::ColorMatrix2) {
            warn!("camera color matrices are ignored, converting with the sRGB (D65) primaries");
        }

        let cells = pattern.rows * pattern.cols;
        let black_level = match ifd.get(Tag::BlackLevel) {
            Some(entry) if entry.count() == cells => {
                (0..cells).map(|i| entry.as_float(i)).collect()
            }
            Some(entry) => vec![entry.as_float(0)],
            None => vec![0.0],
        };

        let white_level = match ifd.get(Tag::WhiteLevel) {
            Some(entry) => entry.as_float(0),
            None => 2f64.powi(bits_per_sample as i32) - 1.0,
        };

        let white_balance = match ifd.get(Tag::AsShotNeutral) {
            Some(entry) => {
                let neutral = [entry.as_float(0), entry.as_float(1), entry.as_float(2)];
                if entry.count() < 3 || neutral.iter().any(|&n| !(n > 0.0)) {
                    return Err(TiffFormatError::InvalidTagValueType(Tag::AsShotNeutral).into());
                }
                white_balance_gains(neutral)
            }
            None => [1.0; 3],
        };

        Ok(CfaContext {
            pattern,
            black_level,
            white_level,
            white_balance,
            bits_per_sample,
            byte_order,
        })
    }

    pub fn pattern(&self) -> &CfaPattern {
        &self.pattern
    }

    pub fn white_balance(&self) -> [f64; 3] {
        self.white_balance
    }

    fn normalize(&self, raw: f64, x: u32, y: u32) -> f32 {
        let black = match self.black_level.as_slice() {
            [level] => *level,
            levels => levels[self.pattern.cell(x, y)],
        };

        let range = self.white_level - black;
        if range > 0.0 {
            ((raw - black) / range).clamp(0.0, 1.0) as f32
        } else {
            0.0
        }
    }

    /// Demosaics one block and writes the pixels within `limit` (exclusive image bounds).
    ///
    /// `data` holds the block's photosites row by row with `block.width` samples per row.
    /// Interpolation only looks at photosites of the same block. A color without a photosite in
    /// the block is zero, as blue is on the red and green rows of a one row strip.
    pub fn decode_block<S: RasterSink + ?Sized>(
        &self,
        data: &[u8],
        block: &Block,
        limit: (u32, u32),
        sink: &mut S,
    ) -> TiffResult<()> {
        let width = limit.0.min(block.x.saturating_add(block.width)).saturating_sub(block.x);
        let height = limit.1.min(block.y.saturating_add(block.height)).saturating_sub(block.y);
        if width == 0 || height == 0 {
            return Ok(());
        }

        let (w, h) = (width as usize, height as usize);
        let sample_len = if self.bits_per_sample == 16 { 2 } else { 1 };
        let (stride, required) = block.byte_layout(width, height, sample_len)?;
        if data.len() < required {
            return Err(TiffError::FormatError(TiffFormatError::Format(format!(
                "mosaic block holds {} bytes, {} are needed",
                data.len(),
                required
            ))));
        }

        let mut plane = Vec::with_capacity(w * h);
        for row in 0..h {
            let line = &data[row * stride..];
            for col in 0..w {
                let raw = match sample_len {
                    2 => self
                        .byte_order
                        .u16([line[2 * col], line[2 * col + 1]])
                        .into(),
                    _ => line[col].into(),
                };
                let (x, y) = (block.x + col as u32, block.y + row as u32);
                plane.push(self.normalize(raw, x, y));
            }
        }

        let mosaic = Mosaic {
            plane: &plane,
            width: w,
            height: h,
            origin: (block.x, block.y),
            pattern: &self.pattern,
        };

        for row in 0..h {
            for col in 0..w {
                let rgb = mosaic.bilinear(col, row);
                let balanced = [
                    rgb[0] * self.white_balance[0],
                    rgb[1] * self.white_balance[1],
                    rgb[2] * self.white_balance[2],
                ];
                let [x, y, z] = camera_to_xyz(balanced);

                sink.set_xyz(
                    block.x + col as u32,
                    block.y + row as u32,
                    Xyz {
                        x: x as f32,
                        y: y as f32,
                        z: z as f32,
                    },
                );
            }
        }

        Ok(())
    }
}

/// Per channel gains from the as-shot neutral, scaled so that green is exactly one.
fn white_balance_gains(neutral: [f64; 3]) -> [f64; 3] {
    let gains = neutral.map(|n| 1.0 / n);
    let green = gains[1];
    gains.map(|g| g / green)
}

fn camera_to_xyz(rgb: [f64; 3]) -> [f64; 3] {
    SRGB_TO_XYZ.map(|row| row[0] * rgb[0] + row[1] * rgb[1] + row[2] * rgb[2])
}

/// Normalized photosites of one block.
struct Mosaic<'a> {
    plane: &'a [f32],
    width: usize,
    height: usize,
    /// Image position of the first photosite, which fixes the pattern phase.
    origin: (u32, u32),
    pattern: &'a CfaPattern,
}

impl Mosaic<'_> {
    fn color(&self, col: usize, row: usize) -> CfaColor {
        self.pattern
            .color_at(self.origin.0 + col as u32, self.origin.1 + row as u32)
    }

    /// Camera RGB at a photosite. The measured channel is taken as is, the others are averaged
    /// from the 3x3 neighborhood or, where that has no photosite of the color, the 5x5 one.
    fn bilinear(&self, col: usize, row: usize) -> [f64; 3] {
        let own = self.color(col, row);
        let mut rgb = [0.0; 3];

        for color in [CfaColor::Red, CfaColor::Green, CfaColor::Blue] {
            rgb[color as usize] = if color == own {
                f64::from(self.plane[row * self.width + col])
            } else {
                self.mean(col, row, color, 1)
                    .or_else(|| self.mean(col, row, color, 2))
                    .unwrap_or(0.0)
            };
        }

        rgb
    }

    fn mean(&self, col: usize, row: usize, color: CfaColor, radius: usize) -> Option<f64> {
        let mut sum = 0.0;
        let mut count = 0usize;

        for y in row.saturating_sub(radius)..(row + radius + 1).min(self.height) {
            for x in col.saturating_sub(radius)..(col + radius + 1).min(self.width) {
                if self.color(x, y) == color {
                    sum += f64::from(self.plane[y * self.width + x]);
                    count += 1;
                }
            }
        }

        if count > 0 {
            Some(sum / count as f64)
        } else {
            None
        }
    }
}
