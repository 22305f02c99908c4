use std::error::Error;
use std::fmt;
use std::io;
use std::num::TryFromIntError;

use crate::tags::{PhotometricInterpretation, Tag};

/// Tiff error kinds.
#[derive(Debug)]
pub enum TiffError {
    /// The Image is not formatted properly.
    FormatError(TiffFormatError),

    /// The Decoder does not support features required by the image.
    UnsupportedError(TiffUnsupportedError),

    /// An I/O Error occurred while decoding the image.
    IoError(io::Error),

    /// An invariant of the decoder itself was violated.
    InternalError(String),

    /// The Limits of the Decoder is exceeded.
    LimitsExceeded,

    /// An integer conversion to or from a platform size failed, either due to
    /// limits of the platform size or limits of the format.
    IntSizeError,
}

/// The image is not formatted properly.
///
/// This indicates that the encoder producing the image might behave incorrectly or that the input
/// file has been corrupted.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum TiffFormatError {
    TiffSignatureNotFound,
    InconsistentSizesEncountered,
    RequiredTagNotFound(Tag),
    InvalidTagValueType(Tag),
    InvalidBitsPerSample { expected: &'static str, found: u32 },
    InvalidDimensions(u32, u32),
    Format(String),
}

impl fmt::Display for TiffFormatError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        use self::TiffFormatError::*;
        match *self {
            TiffSignatureNotFound => write!(fmt, "malformed header"),
            InconsistentSizesEncountered => write!(fmt, "inconsistent header"),
            RequiredTagNotFound(ref tag) => write!(fmt, "Required tag `{:?}` not found.", tag),
            InvalidTagValueType(ref tag) => {
                write!(fmt, "Tag `{:?}` did not have the expected value type.", tag)
            }
            InvalidBitsPerSample {
                expected,
                found,
            } => write!(
                fmt,
                "Invalid BitsPerSample {}, expected {} bits per sample.",
                found, expected
            ),
            InvalidDimensions(width, height) => {
                write!(fmt, "Invalid dimensions: {}x{}.", width, height)
            }
            Format(ref val) => write!(fmt, "Invalid format: {:?}.", val),
        }
    }
}

/// The Decoder does not support features required by the image.
///
/// This only captures known failures for which the standard either does not require support or an
/// implementation has been planned but not yet completed. Some variants may become unused over
/// time and will then get deprecated before being removed.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TiffUnsupportedError {
    Predictor(u16),
    UnsupportedCompressionMethod(u64),
    UnsupportedDataType(Tag, u16),
    SampleFormat(Vec<u16>),
    LowDynamicRangeInterpretation(PhotometricInterpretation),
    UnknownInterpretation(u16),
    UnrecognizedCfaPattern(Vec<u8>),
}

impl fmt::Display for TiffUnsupportedError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        use self::TiffUnsupportedError::*;
        match *self {
            Predictor(predictor) => {
                write!(fmt, "Predictor {} is unsupported, only no predictor is.", predictor)
            }
            UnsupportedCompressionMethod(method) => {
                write!(fmt, "Compression value {} is unsupported.", method)
            }
            UnsupportedDataType(ref tag, type_) => {
                write!(fmt, "Data type {} of tag `{:?}` is unsupported.", type_, tag)
            }
            SampleFormat(ref formats) => {
                write!(fmt, "Sample format {:?} is unsupported.", formats)
            }
            LowDynamicRangeInterpretation(interpretation) => write!(
                fmt,
                "Low dynamic range color model {:?} is unsupported.",
                interpretation
            ),
            UnknownInterpretation(interpretation) => write!(
                fmt,
                "Photometric interpretation {} is unsupported.",
                interpretation
            ),
            UnrecognizedCfaPattern(ref pattern) => {
                write!(fmt, "CFA pattern {:?} is not recognized.", pattern)
            }
        }
    }
}

impl fmt::Display for TiffError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            TiffError::FormatError(ref e) => write!(fmt, "Format error: {}", e),
            TiffError::UnsupportedError(ref f) => write!(
                fmt,
                "The Decoder does not support the \
                 image format `{}`",
                f
            ),
            TiffError::IoError(ref e) => e.fmt(fmt),
            TiffError::InternalError(ref e) => write!(fmt, "Internal error: {}", e),
            TiffError::LimitsExceeded => write!(fmt, "The Decoder limits are exceeded"),
            TiffError::IntSizeError => write!(fmt, "Platform or format size limits exceeded"),
        }
    }
}

impl Error for TiffError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match *self {
            TiffError::IoError(ref e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for TiffError {
    fn from(err: io::Error) -> TiffError {
        TiffError::IoError(err)
    }
}

impl From<TiffFormatError> for TiffError {
    fn from(err: TiffFormatError) -> TiffError {
        TiffError::FormatError(err)
    }
}

impl From<TiffUnsupportedError> for TiffError {
    fn from(err: TiffUnsupportedError) -> TiffError {
        TiffError::UnsupportedError(err)
    }
}

impl From<TryFromIntError> for TiffError {
    fn from(_err: TryFromIntError) -> TiffError {
        TiffError::IntSizeError
    }
}

/// Result of an image decoding process
pub type TiffResult<T> = Result<T, TiffError>;
