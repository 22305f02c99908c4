//! Function for reading TIFF tags

use std::fmt;
use std::io::{Read, Seek};

use super::stream::{ByteOrder, SmartReader};
use super::Limits;
use crate::tags::{self, Tag, Type};
use crate::{TiffError, TiffResult, TiffUnsupportedError};

/// Length of an IFD entry in bytes.
pub(crate) const IFD_ENTRY_LEN: usize = 12;

/// An unsigned fraction as stored in a `RATIONAL` value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rational {
    pub numerator: u32,
    pub denominator: u32,
}

/// A signed fraction as stored in a `SRATIONAL` value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SRational {
    pub numerator: i32,
    pub denominator: i32,
}

impl Rational {
    pub fn to_f64(self) -> f64 {
        f64::from(self.numerator) / f64::from(self.denominator)
    }
}

impl SRational {
    pub fn to_f64(self) -> f64 {
        f64::from(self.numerator) / f64::from(self.denominator)
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

impl fmt::Display for SRational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// One decoded directory entry.
///
/// The values are kept as 64-bit words: integers are zero extended, rationals are packed with the
/// numerator in the low and the denominator in the high half, doubles keep their bit pattern. The
/// accessors interpret the words according to the entry's type.
#[derive(Clone, Debug, PartialEq)]
pub struct Entry {
    tag: Tag,
    type_: Type,
    values: Vec<u64>,
}

impl Entry {
    pub fn new(tag: Tag, type_: Type, values: Vec<u64>) -> Entry {
        Entry { tag, type_, values }
    }

    /// An entry holding unsigned integers of type `LONG`.
    pub fn from_u32s(tag: Tag, values: &[u32]) -> Entry {
        let words = values.iter().copied().map(u64::from).collect();
        Entry::new(tag, Type::LONG, words)
    }

    /// An entry holding a single `DOUBLE`.
    pub fn from_f64(tag: Tag, value: f64) -> Entry {
        Entry::new(tag, Type::DOUBLE, vec![value.to_bits()])
    }

    /// An entry holding `RATIONAL` values.
    pub fn from_rationals(tag: Tag, values: &[Rational]) -> Entry {
        let words = values
            .iter()
            .map(|r| u64::from(r.numerator) | u64::from(r.denominator) << 32)
            .collect();
        Entry::new(tag, Type::RATIONAL, words)
    }

    /// An entry holding `SRATIONAL` values.
    pub fn from_srationals(tag: Tag, values: &[SRational]) -> Entry {
        let words = values
            .iter()
            .map(|r| u64::from(r.numerator as u32) | u64::from(r.denominator as u32) << 32)
            .collect();
        Entry::new(tag, Type::SRATIONAL, words)
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn field_type(&self) -> Type {
        self.type_
    }

    pub fn count(&self) -> usize {
        self.values.len()
    }

    /// The normalized words.
    pub fn words(&self) -> &[u64] {
        &self.values
    }

    /// The first word as an unsigned integer, `0` if there is none.
    pub fn first_value(&self) -> u64 {
        self.values.first().copied().unwrap_or(0)
    }

    /// Word `index` as an unsigned rational, `0/0` if out of range.
    pub fn rational(&self, index: usize) -> Rational {
        let word = self.values.get(index).copied().unwrap_or(0);
        Rational {
            numerator: word as u32,
            denominator: (word >> 32) as u32,
        }
    }

    /// Word `index` as a signed rational, `0/0` if out of range.
    pub fn srational(&self, index: usize) -> SRational {
        let word = self.values.get(index).copied().unwrap_or(0);
        SRational {
            numerator: word as u32 as i32,
            denominator: (word >> 32) as u32 as i32,
        }
    }

    /// Word `index` reinterpreted as an IEEE 754 double, `0.0` if out of range.
    pub fn double(&self, index: usize) -> f64 {
        self.values
            .get(index)
            .map_or(0.0, |&word| f64::from_bits(word))
    }

    /// Word `index` coerced to a float according to the entry's type, `0.0` if out of range.
    pub fn as_float(&self, index: usize) -> f64 {
        let Some(&word) = self.values.get(index) else {
            return 0.0;
        };

        match self.type_ {
            Type::RATIONAL => self.rational(index).to_f64(),
            Type::SRATIONAL => self.srational(index).to_f64(),
            Type::DOUBLE => f64::from_bits(word),
            _ => word as f64,
        }
    }

    /// Decode the 12 byte representation of an entry.
    ///
    /// Returns `Ok(None)` for tags that are not decoded by this crate. Values of up to four bytes
    /// are stored in the entry itself, longer values are read from the offset it holds.
    pub(crate) fn read<R: Read + Seek>(
        raw: &[u8; IFD_ENTRY_LEN],
        limits: &Limits,
        reader: &mut SmartReader<R>,
    ) -> TiffResult<Option<Entry>> {
        let bo = reader.byte_order;
        let Some(tag) = Tag::from_u16(bo.u16([raw[0], raw[1]])) else {
            return Ok(None);
        };

        let type_id = bo.u16([raw[2], raw[3]]);
        let type_ = match Type::from_u16(type_id) {
            Some(type_) if type_.is_decodable_for(tag) => type_,
            _ => {
                return Err(TiffError::UnsupportedError(
                    TiffUnsupportedError::UnsupportedDataType(tag, type_id),
                ))
            }
        };

        let count = bo.u32([raw[4], raw[5], raw[6], raw[7]]);
        let value_field = [raw[8], raw[9], raw[10], raw[11]];
        let value_bytes = type_.value_bytes(count)?;

        let values = if value_bytes <= 4 {
            decode_words(type_, count, &value_field[..value_bytes as usize], bo)
        } else {
            let v_bytes = usize::try_from(value_bytes)?;
            if v_bytes > limits.ifd_value_size {
                return Err(TiffError::LimitsExceeded);
            }

            let mut buf = vec![0; v_bytes];
            reader.read_exact_at(u64::from(bo.u32(value_field)), &mut buf)?;
            decode_words(type_, count, &buf, bo)
        };

        Ok(Some(Entry::new(tag, type_, values)))
    }

    fn pretty_value(&self) -> String {
        let colors = |values: &[u64]| -> String {
            values
                .iter()
                .map(|&v| match v {
                    0 => 'R',
                    1 => 'G',
                    2 => 'B',
                    3 => 'C',
                    4 => 'M',
                    5 => 'Y',
                    6 => 'W',
                    _ => '?',
                })
                .collect()
        };

        match self.tag {
            Tag::NewSubfileType
            | Tag::PhotometricInterpretation
            | Tag::Compression
            | Tag::PlanarConfiguration
            | Tag::CfaLayout => tags::describe_value(self.tag, self.first_value())
                .unwrap_or_else(|| self.first_value().to_string()),
            Tag::StripOffsets => format!("contains {} offset entries", self.count()),
            Tag::StripByteCounts => format!("contains {} byte-count entries", self.count()),
            Tag::StoNits => self.double(0).to_string(),
            Tag::CfaRepeatPatternDim if self.count() >= 2 => format!(
                "{} CFARepeatRows, {} CFARepeatCols",
                self.values[0], self.values[1]
            ),
            Tag::CfaPattern | Tag::CfaPlaneColor => {
                format!("{:?} ({})", self.values, colors(&self.values))
            }
            Tag::DngVersion | Tag::DngBackwardVersion => self
                .values
                .iter()
                .map(u64::to_string)
                .collect::<Vec<_>>()
                .join("."),
            Tag::BaselineExposure => self.srational(0).to_string(),
            _ => self.format_by_type(),
        }
    }

    fn format_by_type(&self) -> String {
        let items: Vec<String> = (0..self.count())
            .map(|i| match self.type_ {
                Type::RATIONAL => self.rational(i).to_string(),
                Type::SRATIONAL => self.srational(i).to_string(),
                Type::DOUBLE => self.double(i).to_string(),
                _ => self.values[i].to_string(),
            })
            .collect();

        format!("[{}]", items.join(" "))
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.tag.display_name(), self.pretty_value())
    }
}

fn decode_words(type_: Type, count: u32, raw: &[u8], bo: ByteOrder) -> Vec<u64> {
    let width = usize::from(type_.byte_len());
    let count = count as usize;

    raw.chunks_exact(width)
        .take(count)
        .map(|chunk| match type_ {
            Type::BYTE => u64::from(chunk[0]),
            Type::SHORT => u64::from(bo.u16([chunk[0], chunk[1]])),
            Type::LONG | Type::IFD => {
                u64::from(bo.u32([chunk[0], chunk[1], chunk[2], chunk[3]]))
            }
            Type::RATIONAL | Type::SRATIONAL => {
                let numerator = bo.u32([chunk[0], chunk[1], chunk[2], chunk[3]]);
                let denominator = bo.u32([chunk[4], chunk[5], chunk[6], chunk[7]]);
                u64::from(numerator) | u64::from(denominator) << 32
            }
            Type::DOUBLE => {
                let mut word = [0; 8];
                word.copy_from_slice(chunk);
                bo.u64(word)
            }
            // Filtered by `Type::is_decodable_for`.
            _ => 0,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn entry_bytes(bo: ByteOrder, tag: u16, type_: u16, count: u32, value: [u8; 4]) -> [u8; 12] {
        let mut raw = [0; 12];
        let (t, ty, c) = match bo {
            ByteOrder::LittleEndian => {
                (tag.to_le_bytes(), type_.to_le_bytes(), count.to_le_bytes())
            }
            ByteOrder::BigEndian => (tag.to_be_bytes(), type_.to_be_bytes(), count.to_be_bytes()),
        };
        raw[0..2].copy_from_slice(&t);
        raw[2..4].copy_from_slice(&ty);
        raw[4..8].copy_from_slice(&c);
        raw[8..12].copy_from_slice(&value);
        raw
    }

    fn read(raw: &[u8; 12], file: Vec<u8>, bo: ByteOrder) -> TiffResult<Option<Entry>> {
        let mut reader = SmartReader::wrap(Cursor::new(file), bo);
        Entry::read(raw, &Limits::default(), &mut reader)
    }

    #[test]
    fn inline_values_never_follow_the_offset() {
        // Two shorts fit in the value field. The file itself is empty, any dereference fails.
        let raw = entry_bytes(ByteOrder::BigEndian, 258, 3, 2, [0, 16, 0, 32]);
        let entry = read(&raw, vec![], ByteOrder::BigEndian).unwrap().unwrap();
        assert_eq!(entry.words(), &[16, 32]);

        let raw = entry_bytes(ByteOrder::LittleEndian, 33422, 1, 4, [0, 1, 1, 2]);
        let entry = read(&raw, vec![], ByteOrder::LittleEndian)
            .unwrap()
            .unwrap();
        assert_eq!(entry.words(), &[0, 1, 1, 2]);
    }

    #[test]
    fn longer_values_follow_the_offset() {
        let mut file = vec![0u8; 8];
        file.extend_from_slice(&1u32.to_le_bytes());
        file.extend_from_slice(&2u32.to_le_bytes());
        let raw = entry_bytes(ByteOrder::LittleEndian, 50728, 5, 1, 8u32.to_le_bytes());
        let entry = read(&raw, file, ByteOrder::LittleEndian).unwrap().unwrap();

        assert_eq!(
            entry.rational(0),
            Rational {
                numerator: 1,
                denominator: 2
            }
        );
        assert_eq!(entry.as_float(0), 0.5);
    }

    #[test]
    fn unknown_tags_are_skipped() {
        // Artist, an ASCII tag.
        let raw = entry_bytes(ByteOrder::LittleEndian, 315, 2, 4, *b"abc\0");
        assert_eq!(read(&raw, vec![], ByteOrder::LittleEndian).unwrap(), None);
    }

    #[test]
    fn unsupported_type_on_known_tag() {
        // ImageWidth as SSHORT.
        let raw = entry_bytes(ByteOrder::LittleEndian, 256, 8, 1, [1, 0, 0, 0]);
        match read(&raw, vec![], ByteOrder::LittleEndian) {
            Err(TiffError::UnsupportedError(TiffUnsupportedError::UnsupportedDataType(
                Tag::ImageWidth,
                8,
            ))) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn accessors() {
        let entry = Entry::from_srationals(
            Tag::BaselineExposure,
            &[SRational {
                numerator: -3,
                denominator: 4,
            }],
        );
        assert_eq!(entry.srational(0).numerator, -3);
        assert_eq!(entry.as_float(0), -0.75);
        assert_eq!(entry.rational(5), Rational { numerator: 0, denominator: 0 });
        assert_eq!(entry.as_float(5), 0.0);

        let entry = Entry::from_f64(Tag::StoNits, 179.0);
        assert_eq!(entry.double(0), 179.0);
        assert_eq!(entry.as_float(0), 179.0);

        let entry = Entry::from_u32s(Tag::WhiteLevel, &[4095]);
        assert_eq!(entry.first_value(), 4095);
        assert_eq!(entry.as_float(0), 4095.0);

        let empty = Entry::from_u32s(Tag::Predictor, &[]);
        assert_eq!(empty.first_value(), 0);
    }

    #[test]
    fn pretty_printing() {
        let entry = Entry::new(Tag::CfaPattern, Type::BYTE, vec![0, 1, 1, 2]);
        assert_eq!(entry.to_string(), "CfaPattern: [0, 1, 1, 2] (RGGB)");

        let entry = Entry::new(Tag::DngVersion, Type::BYTE, vec![1, 4, 0, 0]);
        assert_eq!(entry.to_string(), "DNG Version: 1.4.0.0");

        let entry = Entry::new(Tag::Compression, Type::SHORT, vec![34676]);
        assert_eq!(entry.to_string(), "Compression: SGI Log Luminance RLE");

        let entry = Entry::from_u32s(Tag::StripOffsets, &[8, 16, 24]);
        assert_eq!(entry.to_string(), "StripOffsets: contains 3 offset entries");
    }
}
