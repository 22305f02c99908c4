use super::stream::ByteOrder;
use crate::raster::ColorModel;
use crate::tags::{CompressionMethod, PhotometricInterpretation, Tag};
use crate::{Directory, TiffError, TiffFormatError, TiffResult, TiffUnsupportedError};

/// Pixel encodings the decoder reconstructs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ImageMode {
    /// Three 32-bit floats per pixel.
    Rgb,
    /// 16-bit log luminance.
    LogL,
    /// 16-bit log luminance followed by 8-bit u and v chromaticity.
    LogLuv,
    /// Single channel sensor mosaic.
    ColorFilterArray,
}

impl ImageMode {
    fn from_interpretation(interpretation: PhotometricInterpretation) -> TiffResult<Self> {
        match interpretation {
            PhotometricInterpretation::RGB => Ok(ImageMode::Rgb),
            PhotometricInterpretation::LogL => Ok(ImageMode::LogL),
            PhotometricInterpretation::LogLuv => Ok(ImageMode::LogLuv),
            PhotometricInterpretation::ColorFilterArray => Ok(ImageMode::ColorFilterArray),
            ldr if ldr.is_low_dynamic_range() => Err(TiffError::UnsupportedError(
                TiffUnsupportedError::LowDynamicRangeInterpretation(ldr),
            )),
            other => Err(TiffError::UnsupportedError(
                TiffUnsupportedError::UnknownInterpretation(other.to_u16()),
            )),
        }
    }

    pub(crate) fn color_model(self) -> ColorModel {
        match self {
            ImageMode::Rgb => ColorModel::Rgb,
            ImageMode::LogL | ImageMode::LogLuv | ImageMode::ColorFilterArray => ColorModel::Xyz,
        }
    }

    /// Fails unless `bits_per_sample` is the sample width of this encoding.
    pub(crate) fn check_bits_per_sample(self, bits_per_sample: u32) -> TiffResult<()> {
        let (valid, expected) = match self {
            ImageMode::Rgb => (bits_per_sample == 32, "32"),
            ImageMode::LogL | ImageMode::LogLuv => (bits_per_sample == 16, "16"),
            ImageMode::ColorFilterArray => (matches!(bits_per_sample, 8 | 16), "8 or 16"),
        };

        if valid {
            Ok(())
        } else {
            Err(TiffError::FormatError(TiffFormatError::InvalidBitsPerSample {
                expected,
                found: bits_per_sample,
            }))
        }
    }

    /// Bytes of one pixel in a decompressed block. Mosaic pixels depend on the bit depth.
    pub(crate) fn bytes_per_pixel(self, bits_per_sample: u32) -> usize {
        match self {
            ImageMode::Rgb => 12,
            ImageMode::LogL => 2,
            ImageMode::LogLuv => 4,
            ImageMode::ColorFilterArray => (bits_per_sample as usize + 7) / 8,
        }
    }
}

/// Everything about the image that is fixed for one decode, derived from the feature map.
#[derive(Debug)]
pub(crate) struct Image {
    pub width: u32,
    pub height: u32,
    pub bits_per_sample: u32,
    pub photometric_interpretation: PhotometricInterpretation,
    pub mode: ImageMode,
    /// Raw compression value, `compression_method` is `None` when it does not fit a `u16`.
    pub compression: u64,
    pub compression_method: Option<CompressionMethod>,
    pub predictor: u16,
    pub byte_order: ByteOrder,
}

impl Image {
    pub fn from_directory(ifd: &Directory, byte_order: ByteOrder) -> TiffResult<Image> {
        let width = u32::try_from(ifd.value_or_zero(Tag::ImageWidth))?;
        let height = u32::try_from(ifd.value_or_zero(Tag::ImageLength))?;

        let bits_per_sample = match ifd.first_value(Tag::BitsPerSample) {
            Some(bps) => u32::try_from(bps)?,
            None => {
                return Err(TiffError::FormatError(
                    TiffFormatError::RequiredTagNotFound(Tag::BitsPerSample),
                ))
            }
        };

        let photometric_interpretation = PhotometricInterpretation::from_u16_exhaustive(
            u16::try_from(ifd.value_or_zero(Tag::PhotometricInterpretation))?,
        );
        let mode = ImageMode::from_interpretation(photometric_interpretation)?;

        let compression = ifd.value_or_zero(Tag::Compression);
        let compression_method = CompressionMethod::from_tag_value(compression);
        let predictor = u16::try_from(ifd.value_or_zero(Tag::Predictor)).unwrap_or(u16::MAX);

        Ok(Image {
            width,
            height,
            bits_per_sample,
            photometric_interpretation,
            mode,
            compression,
            compression_method,
            predictor,
            byte_order,
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
/// Chunk type of the internal representation
pub enum ChunkType {
    Strip,
    Tile,
}

/// Location of one strip or tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Block {
    pub offset: u64,
    pub byte_count: u64,
    /// Position of the top left pixel in the image.
    pub x: u32,
    pub y: u32,
    /// Pixel size of the stored block. For tiles this includes the padding beyond the image.
    pub width: u32,
    pub height: u32,
}

impl Block {
    /// Row stride of the stored block and the bytes needed to reach its top left
    /// `width`x`height` pixels, for pixels of `pixel_len` bytes.
    pub fn byte_layout(
        &self,
        width: u32,
        height: u32,
        pixel_len: usize,
    ) -> TiffResult<(usize, usize)> {
        let stride = usize::try_from(self.width)?
            .checked_mul(pixel_len)
            .ok_or(TiffError::LimitsExceeded)?;
        let row_len = usize::try_from(width)?
            .checked_mul(pixel_len)
            .ok_or(TiffError::LimitsExceeded)?;
        let required = usize::try_from(height.saturating_sub(1))?
            .checked_mul(stride)
            .and_then(|n| n.checked_add(row_len))
            .ok_or(TiffError::LimitsExceeded)?;
        Ok((stride, required))
    }
}

/// The grid of strips or tiles an image is stored in.
#[derive(Debug)]
pub(crate) struct BlockGeometry {
    pub chunk_type: ChunkType,
    pub block_width: u32,
    pub block_height: u32,
    pub blocks_across: u32,
    pub blocks_down: u32,
    offsets: Vec<u64>,
    byte_counts: Vec<u64>,
    image_height: u32,
}

impl BlockGeometry {
    /// Computes the block grid and checks that there is an offset and byte count for each block.
    ///
    /// An image with a width or height of zero has no blocks.
    pub fn from_directory(ifd: &Directory, width: u32, height: u32) -> TiffResult<Self> {
        let words = |tag| {
            ifd.get(tag)
                .map(|entry| entry.words().to_vec())
                .unwrap_or_default()
        };

        let (chunk_type, block_width, block_height, offsets, byte_counts) =
            if ifd.value_or_zero(Tag::TileWidth) != 0 {
                let tile_width = u32::try_from(ifd.value_or_zero(Tag::TileWidth))?;
                let tile_length = u32::try_from(ifd.value_or_zero(Tag::TileLength))?;
                if tile_length == 0 {
                    return Err(TiffFormatError::InvalidTagValueType(Tag::TileLength).into());
                }

                (
                    ChunkType::Tile,
                    tile_width,
                    tile_length,
                    words(Tag::TileOffsets),
                    words(Tag::TileByteCounts),
                )
            } else {
                let rows_per_strip = match u32::try_from(ifd.value_or_zero(Tag::RowsPerStrip)) {
                    Ok(0) | Err(_) => height,
                    Ok(rows) => rows,
                };

                (
                    ChunkType::Strip,
                    width,
                    rows_per_strip,
                    words(Tag::StripOffsets),
                    words(Tag::StripByteCounts),
                )
            };

        let blocks_across = if width == 0 {
            0
        } else {
            width.div_ceil(block_width)
        };
        let blocks_down = if height == 0 {
            0
        } else {
            height.div_ceil(block_height)
        };

        let n = usize::try_from(u64::from(blocks_across) * u64::from(blocks_down))?;
        if offsets.len() < n || byte_counts.len() < n {
            return Err(TiffError::FormatError(
                TiffFormatError::InconsistentSizesEncountered,
            ));
        }

        Ok(BlockGeometry {
            chunk_type,
            block_width,
            block_height,
            blocks_across,
            blocks_down,
            offsets,
            byte_counts,
            image_height: height,
        })
    }

    pub fn block_count(&self) -> usize {
        self.blocks_across as usize * self.blocks_down as usize
    }

    /// The block at grid position `(i, j)`, `i` counting across and `j` counting down.
    ///
    /// The last strip only holds the remaining rows of the image, tiles always have their full
    /// size.
    pub fn block(&self, i: u32, j: u32) -> Block {
        let index = j as usize * self.blocks_across as usize + i as usize;
        let y = j * self.block_height;

        let remainder = self.image_height % self.block_height;
        let height = match self.chunk_type {
            ChunkType::Strip if j == self.blocks_down - 1 && remainder != 0 => remainder,
            _ => self.block_height,
        };

        Block {
            offset: self.offsets[index],
            byte_count: self.byte_counts[index],
            x: i * self.block_width,
            y,
            width: self.block_width,
            height,
        }
    }

    /// All blocks in row-major grid order.
    pub fn blocks(&self) -> impl Iterator<Item = Block> + '_ {
        (0..self.blocks_down)
            .flat_map(move |j| (0..self.blocks_across).map(move |i| self.block(i, j)))
    }
}
