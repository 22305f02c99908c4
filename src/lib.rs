//! Decoding of High Dynamic Range TIFF Images
//!
//! Reads TIFF files storing scene referred data, 32-bit floating point RGB and the SGI LogL and
//! LogLuv encodings, as well as camera RAW data in the DNG (Digital Negative) extension. All
//! pixels are produced as linear floating point samples, RGB or XYZ tristimulus values.
//! Low dynamic range color models are rejected.
//!
//! # Related Links
//! * <https://web.archive.org/web/20210108073850/https://www.adobe.io/open/standards/TIFF.html> - The TIFF specification
//! * <http://www.anyhere.com/gward/pixformat/tiffluv.html> - LogL and LogLuv encodings
//! * <https://helpx.adobe.com/camera-raw/digital-negative.html> - The DNG specification

pub mod decoder;
mod directory;
mod error;
pub mod raster;
pub mod tags;

use std::io::{Read, Seek};

pub use self::directory::Directory;
pub use self::error::{TiffError, TiffFormatError, TiffResult, TiffUnsupportedError};
pub use self::raster::{ColorModel, HdrImage, RasterSink, Rgb, Xyz};

/// Header magic of little endian files.
pub const LITTLE_ENDIAN_MAGIC: [u8; 4] = *b"II\x2A\x00";
/// Header magic of big endian files.
pub const BIG_ENDIAN_MAGIC: [u8; 4] = *b"MM\x00\x2A";

/// Check whether a file starts with one of the two magics handled by this crate.
///
/// This is the hook for format dispatch: it only inspects the first four bytes.
pub fn is_hdr_tiff(header: &[u8]) -> bool {
    header.starts_with(&LITTLE_ENDIAN_MAGIC) || header.starts_with(&BIG_ENDIAN_MAGIC)
}

/// Decode a whole image from a reader.
pub fn decode<R: Read + Seek>(reader: R) -> TiffResult<HdrImage> {
    decoder::Decoder::new(reader)?.read_image()
}

/// Read the color model and dimensions of an image without decoding pixel data.
pub fn decode_config<R: Read + Seek>(reader: R) -> TiffResult<decoder::ImageConfig> {
    Ok(decoder::Decoder::new(reader)?.config())
}
