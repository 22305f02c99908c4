macro_rules! tags {
    {
        // Permit arbitrary meta items, which include documentation.
        $( #[$enum_attr:meta] )*
        $vis:vis enum $name:ident($ty:tt) $(unknown(#[$unknown_meta:meta] $unknown_doc:ident))* {
            // Each of the `Name = Val,` permitting documentation.
            $($(#[$ident_attr:meta])* $tag:ident = $val:expr,)*
        }
    } => {
        $( #[$enum_attr] )*
        #[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
        #[non_exhaustive]
        pub enum $name {
            $($(#[$ident_attr])* $tag,)*
            $(
                #[$unknown_meta]
                Unknown($ty),
            )*
        }

        impl $name {
            #[inline(always)]
            const fn __from_inner_type(n: $ty) -> Result<Self, $ty> {
                match n {
                    $( $val => Ok($name::$tag), )*
                    n => Err(n),
                }
            }

            #[inline(always)]
            const fn __to_inner_type(&self) -> $ty {
                match *self {
                    $( $name::$tag => $val, )*
                    $( $name::Unknown($unknown_doc) => { $unknown_doc }, )*
                }
            }

            /// The name of a known value, `None` for unknown values.
            pub const fn name(&self) -> Option<&'static str> {
                match *self {
                    $( $name::$tag => Some(stringify!($tag)), )*
                    #[allow(unreachable_patterns)]
                    _ => None,
                }
            }
        }

        tags!($name, $ty, $($unknown_doc)*);
    };
    // For u16 tags, provide direct inherent primitive conversion methods.
    ($name:tt, u16, $($unknown_doc:ident)*) => {
        impl $name {
            #[inline(always)]
            pub const fn from_u16(val: u16) -> Option<Self> {
                match Self::__from_inner_type(val) {
                    Ok(v) => Some(v),
                    Err(_) => None,
                }
            }

            $(
            #[inline(always)]
            pub const fn from_u16_exhaustive($unknown_doc: u16) -> Self {
                match Self::__from_inner_type($unknown_doc) {
                    Ok(v) => v,
                    Err(_) => $name::Unknown($unknown_doc),
                }
            }
            )*

            #[inline(always)]
            pub const fn to_u16(&self) -> u16 {
                Self::__to_inner_type(self)
            }
        }
    };
    // `LONG` valued tags such as the subfile type bit field.
    ($name:tt, u32, $($unknown_doc:ident)*) => {
        impl $name {
            #[inline(always)]
            pub const fn from_u32(val: u32) -> Option<Self> {
                match Self::__from_inner_type(val) {
                    Ok(v) => Some(v),
                    Err(_) => None,
                }
            }

            #[inline(always)]
            pub const fn to_u32(&self) -> u32 {
                Self::__to_inner_type(self)
            }
        }
    };
}

// Only tags listed here are decoded into a directory, everything else is skipped while parsing.
tags! {
/// TIFF and DNG tags understood by the decoder
pub enum Tag(u16) unknown(
    /// A private or extension tag
    unknown
) {
    // Baseline tags:
    NewSubfileType = 254,
    ImageWidth = 256,
    ImageLength = 257,
    BitsPerSample = 258,
    Compression = 259,
    PhotometricInterpretation = 262,
    StripOffsets = 273,
    SamplesPerPixel = 277,
    RowsPerStrip = 278,
    StripByteCounts = 279,
    PlanarConfiguration = 284,
    // Advanced tags
    Predictor = 317,
    TileWidth = 322,
    TileLength = 323,
    TileOffsets = 324,
    TileByteCounts = 325,
    SubIfd = 330,
    ExtraSamples = 338,
    // Data Sample Format
    SampleFormat = 339,
    // TIFF/EP
    CfaRepeatPatternDim = 33421,
    CfaPattern = 33422,
    // <http://www.anyhere.com/gward/pixformat/tiffluv.html>
    StoNits = 37439,
    // DNG 1.4
    DngVersion = 50706,
    DngBackwardVersion = 50707,
    CfaPlaneColor = 50710,
    CfaLayout = 50711,
    LinearizationTable = 50712,
    BlackLevel = 50714,
    WhiteLevel = 50717,
    ColorMatrix1 = 50721,
    ColorMatrix2 = 50722,
    AsShotNeutral = 50728,
    BaselineExposure = 50730,
}
}

impl Tag {
    /// Human readable name of the tag, falling back to its numeric id.
    pub fn display_name(&self) -> String {
        match self {
            Tag::StoNits => "StoNits".to_string(),
            Tag::DngVersion => "DNG Version".to_string(),
            Tag::DngBackwardVersion => "DNG Backward Version".to_string(),
            Tag::Unknown(n) => format!("Unknown({})", n),
            tag => tag.name().unwrap_or("Unknown").to_string(),
        }
    }
}

tags! {
/// The type of an IFD entry (a 2 byte field).
pub enum Type(u16) {
    /// 8-bit unsigned integer
    BYTE = 1,
    /// 8-bit byte that contains a 7-bit ASCII code; the last byte must be zero
    ASCII = 2,
    /// 16-bit unsigned integer
    SHORT = 3,
    /// 32-bit unsigned integer
    LONG = 4,
    /// Fraction stored as two 32-bit unsigned integers
    RATIONAL = 5,
    /// 8-bit signed integer
    SBYTE = 6,
    /// 8-bit byte that may contain anything, depending on the field
    UNDEFINED = 7,
    /// 16-bit signed integer
    SSHORT = 8,
    /// 32-bit signed integer
    SLONG = 9,
    /// Fraction stored as two 32-bit signed integers
    SRATIONAL = 10,
    /// 32-bit IEEE floating point
    FLOAT = 11,
    /// 64-bit IEEE floating point
    DOUBLE = 12,
    /// 32-bit unsigned integer (offset)
    IFD = 13,
}
}

impl Type {
    pub(crate) fn byte_len(&self) -> u8 {
        match *self {
            Type::BYTE | Type::SBYTE | Type::ASCII | Type::UNDEFINED => 1,
            Type::SHORT | Type::SSHORT => 2,
            Type::LONG | Type::SLONG | Type::FLOAT | Type::IFD => 4,
            Type::DOUBLE | Type::RATIONAL | Type::SRATIONAL => 8,
        }
    }

    pub(crate) fn value_bytes(&self, count: u32) -> Result<u64, crate::error::TiffError> {
        let tag_size = u64::from(self.byte_len());

        match u64::from(count).checked_mul(tag_size) {
            Some(n) => Ok(n),
            None => Err(crate::error::TiffError::LimitsExceeded),
        }
    }

    /// Types that have a normalized word representation in a decoded entry of `tag`.
    ///
    /// `IFD` offsets are read like `LONG`, but only for `SubIfd`.
    pub(crate) fn is_decodable_for(&self, tag: Tag) -> bool {
        match self {
            Type::BYTE
            | Type::SHORT
            | Type::LONG
            | Type::RATIONAL
            | Type::SRATIONAL
            | Type::DOUBLE => true,
            Type::IFD => tag == Tag::SubIfd,
            _ => false,
        }
    }
}

tags! {
/// See [TIFF compression tags](https://www.awaresystems.be/imaging/tiff/tifftags/compression.html)
/// for reference.
pub enum CompressionMethod(u16) unknown(
    /// A custom compression method
    unknown
) {
    None = 1,
    Huffman = 2,
    Fax3 = 3,
    Fax4 = 4,
    LZW = 5,
    JPEG = 6,
    // "Extended JPEG" or "new JPEG" style
    ModernJPEG = 7,
    Deflate = 8,
    OldDeflate = 0x80B2,
    PackBits = 0x8005,
    // LogL and LogLuv run-length encoding
    SGILogRLE = 34676,
    SGILog24Packed = 34677,
    LossyJPEG = 34892,
}
}

impl CompressionMethod {
    /// Compression value for a feature map. Absence and `0` both mean no compression, some tools
    /// write files without the tag.
    /// Gives `Option::None` for values that do not fit a `u16`.
    pub fn from_tag_value(val: u64) -> Option<Self> {
        match u16::try_from(val) {
            Ok(0) => Some(CompressionMethod::None),
            Ok(n) => Some(CompressionMethod::from_u16_exhaustive(n)),
            Err(_) => None,
        }
    }

    fn description(&self) -> Option<&'static str> {
        Some(match self {
            CompressionMethod::None => "None",
            CompressionMethod::Huffman => "CCITT",
            CompressionMethod::Fax3 => "Group 3 Fax",
            CompressionMethod::Fax4 => "Group 4 Fax",
            CompressionMethod::LZW => "LZW",
            CompressionMethod::JPEG => "Old JPEG",
            CompressionMethod::ModernJPEG => "JPEG",
            CompressionMethod::Deflate => "Deflate (zlib compression)",
            CompressionMethod::OldDeflate => "Old Deflate",
            CompressionMethod::PackBits => "PackBits",
            CompressionMethod::SGILogRLE => "SGI Log Luminance RLE",
            CompressionMethod::SGILog24Packed => "SGI Log 24-bits packed",
            CompressionMethod::LossyJPEG => "Lossy JPEG",
            CompressionMethod::Unknown(_) => return None,
        })
    }
}

tags! {
pub enum PhotometricInterpretation(u16) unknown(
    /// An interpretation this crate has no name for
    unknown
) {
    WhiteIsZero = 0,
    BlackIsZero = 1,
    RGB = 2,
    RGBPalette = 3,
    TransparencyMask = 4,
    CMYK = 5,
    YCbCr = 6,
    CIELab = 8,
    /// Camera sensor data behind a color filter array
    ColorFilterArray = 32803,
    /// GrayScale - CIE Log2(L)
    LogL = 32844,
    /// Color - CIE Log2(L) (u',v')
    LogLuv = 32845,
    LinearRaw = 34892,
}
}

impl PhotometricInterpretation {
    /// Display referred interpretations, which are rejected by this decoder.
    pub fn is_low_dynamic_range(&self) -> bool {
        matches!(
            self,
            PhotometricInterpretation::WhiteIsZero
                | PhotometricInterpretation::BlackIsZero
                | PhotometricInterpretation::RGBPalette
                | PhotometricInterpretation::TransparencyMask
                | PhotometricInterpretation::CMYK
                | PhotometricInterpretation::YCbCr
                | PhotometricInterpretation::CIELab
        )
    }

    fn description(&self) -> Option<&'static str> {
        Some(match self {
            PhotometricInterpretation::RGBPalette => "Paletted",
            PhotometricInterpretation::TransparencyMask => "TransMask",
            PhotometricInterpretation::CIELab => "CIE-Lab",
            PhotometricInterpretation::ColorFilterArray => "Color Filter Array",
            PhotometricInterpretation::LogL => "LogL (GrayScale)",
            PhotometricInterpretation::LogLuv => "SGI LogLuv (Color)",
            other => return other.name(),
        })
    }
}

tags! {
pub enum PlanarConfiguration(u16) {
    Chunky = 1,
    Planar = 2,
}
}

tags! {
pub enum Predictor(u16) unknown(
    /// A predictor this crate has no name for
    unknown
) {
    /// No changes were made to the data
    None = 1,
    /// The images' rows were processed to contain the difference of each pixel from the previous one.
    ///
    /// Not supported by this decoder.
    Horizontal = 2,
    /// Not supported by this decoder.
    FloatingPoint = 3,
}
}

tags! {
pub enum SampleFormat(u16) unknown(
    /// An unknown extension sample format
    unknown
) {
    Uint = 1,
    Int = 2,
    IEEEFP = 3,
    Void = 4,
}
}

tags! {
/// Values of the `NewSubfileType` tag relevant to DNG files.
pub enum NewSubfileType(u32) {
    /// The full resolution main image
    PrimaryImage = 0,
    /// A reduced resolution preview
    Thumbnail = 1,
}
}

tags! {
/// Spatial layout of the color filter array.
pub enum CfaLayout(u16) {
    Rectangular = 1,
    StaggeredA = 2,
    StaggeredB = 3,
    StaggeredC = 4,
    StaggeredD = 5,
}
}

/// Human readable description of a tag's enumerated value, if it has one.
pub(crate) fn describe_value(tag: Tag, value: u64) -> Option<String> {
    let short = u16::try_from(value).ok();
    let text = match tag {
        Tag::NewSubfileType => match u32::try_from(value).ok().and_then(NewSubfileType::from_u32)
        {
            Some(NewSubfileType::PrimaryImage) => "Primary image",
            Some(NewSubfileType::Thumbnail) => "Thumbnail/Preview image",
            None => return None,
        },
        Tag::PhotometricInterpretation => {
            PhotometricInterpretation::from_u16_exhaustive(short?).description()?
        }
        Tag::Compression => CompressionMethod::from_u16_exhaustive(short?).description()?,
        Tag::PlanarConfiguration => match PlanarConfiguration::from_u16(short?)? {
            PlanarConfiguration::Chunky => "Contiguous (aka RGBRGBRGBRGB)",
            PlanarConfiguration::Planar => "Separate (aka RRRRGGGGBBBB)",
        },
        Tag::CfaLayout => match CfaLayout::from_u16(short?)? {
            CfaLayout::Rectangular => "Rectangular (or square) layout",
            CfaLayout::StaggeredA => "Staggered layout A: even columns are offset down by 1/2 row",
            CfaLayout::StaggeredB => "Staggered layout B: even columns are offset up by 1/2 row",
            CfaLayout::StaggeredC => "Staggered layout C: even rows are offset right by 1/2 column",
            CfaLayout::StaggeredD => "Staggered layout D: even rows are offset left by 1/2 column",
        },
        _ => return None,
    };

    Some(text.to_string())
}

/// Byte order of the TIFF file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ByteOrder {
    /// little endian byte order
    LittleEndian,
    /// big endian byte order
    BigEndian,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_tags_are_not_recognized() {
        assert_eq!(Tag::from_u16(273), Some(Tag::StripOffsets));
        assert_eq!(Tag::from_u16(50714), Some(Tag::BlackLevel));
        // Artist
        assert_eq!(Tag::from_u16(315), None);
        assert_eq!(Tag::from_u16_exhaustive(315), Tag::Unknown(315));
    }

    #[test]
    fn missing_compression_is_uncompressed() {
        assert_eq!(CompressionMethod::from_tag_value(0), Some(CompressionMethod::None));
        assert_eq!(CompressionMethod::from_tag_value(1), Some(CompressionMethod::None));
        assert_eq!(
            CompressionMethod::from_tag_value(34676),
            Some(CompressionMethod::SGILogRLE)
        );
        assert_eq!(
            CompressionMethod::from_tag_value(7),
            Some(CompressionMethod::ModernJPEG)
        );
        assert_eq!(CompressionMethod::from_tag_value(70000), None);
    }

    #[test]
    fn ldr_interpretations() {
        assert!(PhotometricInterpretation::BlackIsZero.is_low_dynamic_range());
        assert!(PhotometricInterpretation::YCbCr.is_low_dynamic_range());
        assert!(!PhotometricInterpretation::RGB.is_low_dynamic_range());
        assert!(!PhotometricInterpretation::LogLuv.is_low_dynamic_range());
    }

    #[test]
    fn value_descriptions() {
        assert_eq!(
            describe_value(Tag::PhotometricInterpretation, 32845).as_deref(),
            Some("SGI LogLuv (Color)")
        );
        assert_eq!(
            describe_value(Tag::NewSubfileType, 0).as_deref(),
            Some("Primary image")
        );
        assert_eq!(describe_value(Tag::ImageWidth, 12), None);
    }
}
