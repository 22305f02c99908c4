//! Turning decompressed blocks into calibrated pixels.

use super::cfa::CfaContext;
use super::image::{Block, Image, ImageMode};
use super::logluv;
use super::stream::ByteOrder;
use crate::raster::{RasterSink, Rgb, Xyz};
use crate::tags::{Predictor, Tag};
use crate::{Directory, TiffError, TiffFormatError, TiffResult, TiffUnsupportedError};

/// Writes the pixels of decompressed blocks into a sink, according to the image mode.
#[derive(Debug)]
pub(crate) struct RasterDecoder {
    mode: ImageMode,
    byte_order: ByteOrder,
    predictor: u16,
    /// Scale from stored luminance to nits, for LogL and LogLuv.
    sto_nits: f64,
    bytes_per_pixel: usize,
    cfa: Option<CfaContext>,
}

impl RasterDecoder {
    pub fn new(image: &Image, ifd: &Directory) -> TiffResult<Self> {
        let sto_nits = match ifd.get(Tag::StoNits).map(|e| e.as_float(0)) {
            Some(scale) if scale != 0.0 => scale,
            _ => 1.0,
        };

        let cfa = match image.mode {
            ImageMode::ColorFilterArray => Some(CfaContext::from_directory(
                ifd,
                image.bits_per_sample,
                image.byte_order,
            )?),
            _ => None,
        };

        Ok(RasterDecoder {
            mode: image.mode,
            byte_order: image.byte_order,
            predictor: image.predictor,
            sto_nits,
            bytes_per_pixel: image.mode.bytes_per_pixel(image.bits_per_sample),
            cfa,
        })
    }

    pub fn cfa(&self) -> Option<&CfaContext> {
        self.cfa.as_ref()
    }

    /// Decodes one block. `limit` is the exclusive bound of pixels that are written, edge blocks
    /// may reach beyond it.
    pub fn decode_block<S: RasterSink + ?Sized>(
        &self,
        data: &[u8],
        block: &Block,
        limit: (u32, u32),
        sink: &mut S,
    ) -> TiffResult<()> {
        if self.predictor > Predictor::None.to_u16() {
            return Err(TiffError::UnsupportedError(
                TiffUnsupportedError::Predictor(self.predictor),
            ));
        }

        match (&self.cfa, self.mode) {
            (Some(cfa), _) => return cfa.decode_block(data, block, limit, sink),
            (None, ImageMode::ColorFilterArray) => {
                return Err(TiffError::InternalError(
                    "mosaic block without calibration".to_string(),
                ))
            }
            _ => {}
        }

        let width = limit.0.min(block.x.saturating_add(block.width)).saturating_sub(block.x);
        let height = limit.1.min(block.y.saturating_add(block.height)).saturating_sub(block.y);
        if width == 0 || height == 0 {
            return Ok(());
        }

        let bpp = self.bytes_per_pixel;
        let (stride, required) = block.byte_layout(width, height, bpp)?;
        if data.len() < required {
            return Err(TiffError::FormatError(TiffFormatError::Format(format!(
                "block holds {} bytes, {} are needed",
                data.len(),
                required
            ))));
        }

        for row in 0..height {
            let line = &data[row as usize * stride..];
            let y = block.y + row;

            for (col, pixel) in line.chunks_exact(bpp).take(width as usize).enumerate() {
                let x = block.x + col as u32;
                match self.mode {
                    ImageMode::Rgb => sink.set_rgb(x, y, self.rgb(pixel)),
                    ImageMode::LogL => {
                        let lum = logluv::logl_to_y([pixel[0], pixel[1]]) * self.sto_nits;
                        let lum = lum as f32;
                        sink.set_xyz(x, y, Xyz { x: lum, y: lum, z: lum })
                    }
                    ImageMode::LogLuv => {
                        let [cx, cy, cz] =
                            logluv::logluv_to_xyz([pixel[0], pixel[1], pixel[2], pixel[3]]);
                        sink.set_xyz(
                            x,
                            y,
                            Xyz {
                                x: (cx * self.sto_nits) as f32,
                                y: (cy * self.sto_nits) as f32,
                                z: (cz * self.sto_nits) as f32,
                            },
                        )
                    }
                    // Rejected above.
                    ImageMode::ColorFilterArray => {}
                }
            }
        }

        Ok(())
    }

    fn rgb(&self, pixel: &[u8]) -> Rgb {
        let sample = |i: usize| {
            self.byte_order
                .f32([pixel[i], pixel[i + 1], pixel[i + 2], pixel[i + 3]])
        };

        Rgb {
            r: sample(0),
            g: sample(4),
            b: sample(8),
        }
    }
}
