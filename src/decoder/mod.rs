use std::fmt::Write as _;
use std::io::{self, Read, Seek};

use log::{debug, trace};

use crate::raster::{ColorModel, HdrImage, RasterSink};
use crate::tags::{CompressionMethod, PhotometricInterpretation};
use crate::{Directory, TiffError, TiffResult, TiffUnsupportedError};

use self::image::{Block, BlockGeometry, Image, ImageMode};
use self::raster::RasterDecoder;
#[cfg(feature = "deflate")]
use self::stream::deflate_reader;
#[cfg(feature = "lzw")]
use self::stream::LZWReader;
use self::stream::{PackBitsReader, SmartReader};

pub use self::cfa::{CfaColor, CfaPattern};
pub use self::image::ChunkType;
pub use self::stream::ByteOrder;
pub use self::tree::{IfdTree, TiffKind};

mod cfa;
pub mod ifd;
mod image;
mod logluv;
mod raster;
mod stream;
mod tree;

/// Decoding limits
#[derive(Clone, Debug)]
pub struct Limits {
    /// The maximum size of the decoded raster in bytes, the default is 256MiB.
    pub decoding_buffer_size: usize,
    /// The maximum size of any ifd value in bytes, the default is
    /// 1MiB.
    pub ifd_value_size: usize,
    /// Maximum size of one decompressed strip or tile in bytes, the default is 128MiB.
    pub intermediate_buffer_size: usize,
    /// The purpose of this is to prevent all the fields of the struct from
    /// being public, as this would make adding new fields a major version
    /// bump.
    _non_exhaustive: (),
}

impl Limits {
    /// A configuration that does not impose any limits.
    ///
    /// This is a good start if the caller only wants to impose selective limits, contrary to the
    /// default limits which allows selectively disabling limits.
    ///
    /// Note that this configuration is likely to crash on excessively large images since,
    /// naturally, the machine running the program does not have infinite memory.
    pub fn unlimited() -> Limits {
        Limits {
            decoding_buffer_size: usize::MAX,
            ifd_value_size: usize::MAX,
            intermediate_buffer_size: usize::MAX,
            _non_exhaustive: (),
        }
    }
}

impl Default for Limits {
    fn default() -> Limits {
        Limits {
            decoding_buffer_size: 256 * 1024 * 1024,
            intermediate_buffer_size: 128 * 1024 * 1024,
            ifd_value_size: 1024 * 1024,
            _non_exhaustive: (),
        }
    }
}

/// Color model and size of an image, available without decoding any pixel data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageConfig {
    pub color_model: ColorModel,
    pub width: u32,
    pub height: u32,
}

/// The representation of a HDR TIFF decoder
///
/// Decoding is synchronous and reads the byte source with positioned reads. A decoder keeps one
/// block buffer that is reused for every strip or tile.
#[derive(Debug)]
pub struct Decoder<R>
where
    R: Read + Seek,
{
    reader: SmartReader<R>,
    limits: Limits,
    tree: IfdTree,
    image: Image,
    /// Decompressed bytes of the current block.
    buffer: Vec<u8>,
}

/// What one decode needs beyond the image description.
struct DecodePlan {
    geometry: BlockGeometry,
    raster: RasterDecoder,
}

impl<R: Read + Seek> Decoder<R> {
    /// Create a new decoder that decodes from the stream ```r```
    ///
    /// This reads the header and the directories. It fails for files without `BitsPerSample` and
    /// for low dynamic range color models.
    pub fn new(r: R) -> TiffResult<Decoder<R>> {
        Self::new_with_limits(r, Limits::default())
    }

    /// Like [`Decoder::new`], applying `limits` to the directories as well.
    pub fn new_with_limits(r: R, limits: Limits) -> TiffResult<Decoder<R>> {
        let mut reader = SmartReader::wrap(r, ByteOrder::LittleEndian);
        let tree = IfdTree::read(&mut reader, &limits)?;
        let image = Image::from_directory(tree.feature_map(), tree.byte_order())?;

        debug!(
            "{:?} {:?} image of {}x{}, {} bits per sample, compression {}",
            tree.kind(),
            image.photometric_interpretation,
            image.width,
            image.height,
            image.bits_per_sample,
            image.compression
        );

        Ok(Decoder {
            reader,
            limits,
            tree,
            image,
            buffer: Vec::new(),
        })
    }

    pub fn with_limits(mut self, limits: Limits) -> Decoder<R> {
        self.limits = limits;
        self
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width, self.image.height)
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.tree.byte_order()
    }

    pub fn kind(&self) -> TiffKind {
        self.tree.kind()
    }

    pub fn color_model(&self) -> ColorModel {
        self.image.mode.color_model()
    }

    pub fn photometric_interpretation(&self) -> PhotometricInterpretation {
        self.image.photometric_interpretation
    }

    /// The compression of the image blocks, `None` for values beyond `u16`.
    pub fn compression_method(&self) -> Option<CompressionMethod> {
        self.image.compression_method
    }

    pub fn bits_per_sample(&self) -> u32 {
        self.image.bits_per_sample
    }

    /// Color model and dimensions, without touching pixel data.
    pub fn config(&self) -> ImageConfig {
        ImageConfig {
            color_model: self.color_model(),
            width: self.image.width,
            height: self.image.height,
        }
    }

    /// The directory the image is decoded from.
    pub fn feature_map(&self) -> &Directory {
        self.tree.feature_map()
    }

    pub fn ifd_tree(&self) -> &IfdTree {
        &self.tree
    }

    /// The strips or tiles the image is stored in.
    pub fn chunk_type(&self) -> TiffResult<ChunkType> {
        Ok(self.plan_geometry()?.chunk_type)
    }

    /// A listing of the feature map followed by the byte order, bit depth and bounds.
    pub fn describe(&self) -> String {
        let mut out = self.feature_map().to_string();
        // Writing to a `String` does not fail.
        let _ = writeln!(out, "ByteOrder: {:?}", self.byte_order());
        let _ = writeln!(out, "BPP: {}", self.image.bits_per_sample);
        let _ = writeln!(out, "Bounds: {}x{}", self.image.width, self.image.height);
        out
    }

    /// Decodes the whole image.
    pub fn read_image(&mut self) -> TiffResult<HdrImage> {
        let plan = self.plan()?;
        let mut image = HdrImage::with_limits(
            self.image.width,
            self.image.height,
            self.color_model(),
            &self.limits,
        )?;

        self.decode_blocks(&plan, &mut image)?;
        Ok(image)
    }

    /// Decodes the whole image into `sink`. Pixels outside of the sink's dimensions are skipped.
    ///
    /// On error the sink may hold the pixels of the blocks decoded so far.
    pub fn decode_into<S: RasterSink + ?Sized>(&mut self, sink: &mut S) -> TiffResult<()> {
        let plan = self.plan()?;
        self.decode_blocks(&plan, sink)
    }

    fn plan_geometry(&self) -> TiffResult<BlockGeometry> {
        BlockGeometry::from_directory(self.feature_map(), self.image.width, self.image.height)
    }

    /// Validates the block layout and bit depth before any pixel data is read.
    fn plan(&self) -> TiffResult<DecodePlan> {
        let geometry = self.plan_geometry()?;
        self.image
            .mode
            .check_bits_per_sample(self.image.bits_per_sample)?;
        let raster = RasterDecoder::new(&self.image, self.feature_map())?;

        if let Some(cfa) = raster.cfa() {
            debug!(
                "{} mosaic, white balance {:?}",
                cfa.pattern().name(),
                cfa.white_balance()
            );
        }

        Ok(DecodePlan { geometry, raster })
    }

    fn decode_blocks<S: RasterSink + ?Sized>(
        &mut self,
        plan: &DecodePlan,
        sink: &mut S,
    ) -> TiffResult<()> {
        let (sink_width, sink_height) = sink.dimensions();
        let limit = (
            self.image.width.min(sink_width),
            self.image.height.min(sink_height),
        );

        for block in plan.geometry.blocks() {
            trace!(
                "block at {}x{}, {} bytes at offset {}",
                block.x,
                block.y,
                block.byte_count,
                block.offset
            );

            self.decompress(&block)?;
            plan.raster.decode_block(&self.buffer, &block, limit, sink)?;
        }

        Ok(())
    }

    fn create_reader<'r>(
        reader: &'r mut SmartReader<R>,
        compression_method: CompressionMethod,
        compressed_length: u64,
    ) -> TiffResult<Box<dyn Read + 'r>> {
        Ok(match compression_method {
            #[cfg(feature = "lzw")]
            CompressionMethod::LZW => Box::new(LZWReader::new(reader, compressed_length)),
            #[cfg(feature = "deflate")]
            CompressionMethod::Deflate | CompressionMethod::OldDeflate => {
                Box::new(deflate_reader(reader, compressed_length))
            }
            CompressionMethod::PackBits => {
                Box::new(PackBitsReader::new(reader, compressed_length))
            }
            method => {
                return Err(TiffError::UnsupportedError(
                    TiffUnsupportedError::UnsupportedCompressionMethod(u64::from(
                        method.to_u16(),
                    )),
                ))
            }
        })
    }

    /// Fills the block buffer with the decompressed bytes of `block`.
    fn decompress(&mut self, block: &Block) -> TiffResult<()> {
        let Decoder {
            reader,
            limits,
            image,
            buffer,
            ..
        } = self;
        let max_len = limits.intermediate_buffer_size;

        let Some(compression_method) = image.compression_method else {
            return Err(TiffError::UnsupportedError(
                TiffUnsupportedError::UnsupportedCompressionMethod(image.compression),
            ));
        };

        match compression_method {
            CompressionMethod::None => {
                let len = usize::try_from(block.byte_count)?;
                if len > max_len {
                    return Err(TiffError::LimitsExceeded);
                }

                buffer.clear();
                buffer.resize(len, 0);
                reader.read_exact_at(block.offset, buffer)?;
            }
            CompressionMethod::SGILogRLE => {
                let bytes_per_pixel = match image.mode {
                    ImageMode::LogL => 2,
                    _ => 4,
                };
                let width = usize::try_from(block.width)?;
                let height = usize::try_from(block.height)?;
                let len = width
                    .checked_mul(height)
                    .and_then(|n| n.checked_mul(bytes_per_pixel))
                    .ok_or(TiffError::LimitsExceeded)?;
                if len > max_len {
                    return Err(TiffError::LimitsExceeded);
                }

                reader.goto_offset(block.offset)?;
                let source = io::BufReader::new(reader.by_ref().take(block.byte_count));
                logluv::unpack_sgi_rle(source, bytes_per_pixel, width, height, buffer)?;
            }
            method => {
                reader.goto_offset(block.offset)?;
                let stream = Self::create_reader(reader, method, block.byte_count)?;

                buffer.clear();
                let limit = u64::try_from(max_len).unwrap_or(u64::MAX);
                stream.take(limit.saturating_add(1)).read_to_end(buffer)?;
                if buffer.len() > max_len {
                    return Err(TiffError::LimitsExceeded);
                }
            }
        }

        Ok(())
    }
}
