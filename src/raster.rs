//! Destination of decoded pixels.
//!
//! The decoder writes calibrated linear samples through [`RasterSink`]. [`HdrImage`] is a plain
//! owned implementation for callers that do not bring their own container.

use crate::decoder::Limits;
use crate::error::{TiffError, TiffResult};

/// Linear RGB sample.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

/// CIE 1931 XYZ tristimulus sample.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Xyz {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Color model of a decoded raster.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColorModel {
    /// Linear RGB, used for 32-bit floating point RGB files.
    Rgb,
    /// XYZ tristimulus, used for LogL, LogLuv and camera RAW files.
    Xyz,
}

/// A pixel container the decoder can write into.
pub trait RasterSink {
    /// Width and height of the writable area. Writes outside are never issued.
    fn dimensions(&self) -> (u32, u32);

    fn set_rgb(&mut self, x: u32, y: u32, color: Rgb);

    fn set_xyz(&mut self, x: u32, y: u32, color: Xyz);
}

/// An owned raster of three channel floating point pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct HdrImage {
    width: u32,
    height: u32,
    color_model: ColorModel,
    pixels: Vec<[f32; 3]>,
}

impl HdrImage {
    pub fn new(width: u32, height: u32, color_model: ColorModel) -> Self {
        HdrImage {
            width,
            height,
            color_model,
            pixels: vec![[0.0; 3]; width as usize * height as usize],
        }
    }

    /// Allocates a raster, checking the pixel buffer against the decoding limits first.
    pub(crate) fn with_limits(
        width: u32,
        height: u32,
        color_model: ColorModel,
        limits: &Limits,
    ) -> TiffResult<Self> {
        let bytes = usize::try_from(width)?
            .checked_mul(usize::try_from(height)?)
            .and_then(|n| n.checked_mul(std::mem::size_of::<[f32; 3]>()))
            .ok_or(TiffError::LimitsExceeded)?;

        if bytes > limits.decoding_buffer_size {
            return Err(TiffError::LimitsExceeded);
        }

        Ok(Self::new(width, height, color_model))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn color_model(&self) -> ColorModel {
        self.color_model
    }

    /// Raw channel triples in row-major order.
    pub fn pixels(&self) -> &[[f32; 3]] {
        &self.pixels
    }

    pub fn get(&self, x: u32, y: u32) -> Option<[f32; 3]> {
        self.index(x, y).map(|i| self.pixels[i])
    }

    pub fn rgb(&self, x: u32, y: u32) -> Option<Rgb> {
        self.get(x, y).map(|[r, g, b]| Rgb { r, g, b })
    }

    pub fn xyz(&self, x: u32, y: u32) -> Option<Xyz> {
        self.get(x, y).map(|[x, y, z]| Xyz { x, y, z })
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }

        Some(y as usize * self.width as usize + x as usize)
    }
}

impl RasterSink for HdrImage {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn set_rgb(&mut self, x: u32, y: u32, color: Rgb) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = [color.r, color.g, color.b];
        }
    }

    fn set_xyz(&mut self, x: u32, y: u32, color: Xyz) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = [color.x, color.y, color.z];
        }
    }
}
