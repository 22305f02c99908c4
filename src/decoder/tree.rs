//! Reading the header and the tree of image file directories.

use std::io::{Read, Seek};

use log::debug;

use super::ifd::{Entry, IFD_ENTRY_LEN};
use super::stream::{ByteOrder, EndianReader, SmartReader};
use super::Limits;
use crate::tags::{NewSubfileType, SampleFormat, Tag};
use crate::{
    Directory, TiffError, TiffFormatError, TiffResult, TiffUnsupportedError, BIG_ENDIAN_MAGIC,
    LITTLE_ENDIAN_MAGIC,
};

/// The container variant of a file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TiffKind {
    /// A plain TIFF file.
    Tiff,
    /// A Digital Negative, recognized by the `DngVersion` tag in the first directory.
    Dng,
}

/// All directories of a file that the decoder looks at.
///
/// Slot 0 holds the main directory the header points to, the following slots hold the directories
/// listed by its `SubIfd` tag, in the listed order. Directories never refer back to earlier ones
/// so the tree is stored flat.
#[derive(Clone, Debug)]
pub struct IfdTree {
    byte_order: ByteOrder,
    kind: TiffKind,
    ifds: Vec<Directory>,
    /// Index of the directory describing the image to decode.
    primary: usize,
}

impl IfdTree {
    /// Read the header and all directories.
    pub(crate) fn read<R: Read + Seek>(
        reader: &mut SmartReader<R>,
        limits: &Limits,
    ) -> TiffResult<IfdTree> {
        let first_ifd = read_header(reader)?;
        let byte_order = reader.byte_order;

        let main = read_ifd(reader, first_ifd, limits)?;
        debug!("main IFD at {} has {} entries", first_ifd, main.len());

        let kind = if main.contains(Tag::DngVersion) {
            TiffKind::Dng
        } else {
            TiffKind::Tiff
        };

        let sub_ifd_offsets = main
            .get(Tag::SubIfd)
            .map(|entry| entry.words().to_vec())
            .unwrap_or_default();

        let mut ifds = vec![main];
        for offset in sub_ifd_offsets {
            let sub = read_ifd(reader, offset, limits)?;
            debug!(
                "SubIFD {} at {} has {} entries",
                ifds.len(),
                offset,
                sub.len()
            );
            ifds.push(sub);
        }

        let primary = match kind {
            TiffKind::Dng => find_primary_image(&ifds).unwrap_or(0),
            TiffKind::Tiff => 0,
        };
        if primary != 0 {
            debug!("primary image of DNG file is in IFD {}", primary);
        }

        Ok(IfdTree {
            byte_order,
            kind,
            ifds,
            primary,
        })
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub fn kind(&self) -> TiffKind {
        self.kind
    }

    /// The directories in file order, the main directory first.
    pub fn ifds(&self) -> &[Directory] {
        &self.ifds
    }

    /// Position of the directory the feature map was taken from.
    pub fn primary_index(&self) -> usize {
        self.primary
    }

    /// The directory describing the image to decode.
    ///
    /// This is the main directory, unless the file is a DNG and one of its directories is marked
    /// as the primary image. That directory then replaces the main directory entirely.
    pub fn feature_map(&self) -> &Directory {
        &self.ifds[self.primary]
    }
}

/// Checks the magic and returns the offset of the first directory.
fn read_header<R: Read + Seek>(reader: &mut SmartReader<R>) -> TiffResult<u64> {
    let mut header = [0u8; 8];
    reader.read_exact_at(0, &mut header)?;

    let byte_order = match [header[0], header[1], header[2], header[3]] {
        LITTLE_ENDIAN_MAGIC => ByteOrder::LittleEndian,
        BIG_ENDIAN_MAGIC => ByteOrder::BigEndian,
        _ => {
            return Err(TiffError::FormatError(
                TiffFormatError::TiffSignatureNotFound,
            ))
        }
    };

    reader.byte_order = byte_order;
    Ok(u64::from(byte_order.u32([
        header[4], header[5], header[6], header[7],
    ])))
}

/// Reads the directory at `offset`.
///
/// The entries are stored contiguously after a 2 byte count. Tags this crate does not know are
/// skipped, the next-IFD pointer after the entries is not followed.
fn read_ifd<R: Read + Seek>(
    reader: &mut SmartReader<R>,
    offset: u64,
    limits: &Limits,
) -> TiffResult<Directory> {
    reader.goto_offset(offset)?;
    let num_tags = usize::from(reader.read_u16()?);

    let mut raw = vec![0u8; num_tags * IFD_ENTRY_LEN];
    reader.read_exact(&mut raw)?;

    let mut dir = Directory::empty();
    for chunk in raw.chunks_exact(IFD_ENTRY_LEN) {
        let mut bytes = [0u8; IFD_ENTRY_LEN];
        bytes.copy_from_slice(chunk);

        let Some(entry) = Entry::read(&bytes, limits, reader)? else {
            continue;
        };

        check_sample_format(&entry)?;
        dir.insert(entry);
    }

    Ok(dir)
}

/// Any `SampleFormat` value of `1` rejects the file.
///
/// `1` denotes unsigned integer samples, the TIFF default. Files that write it out are refused,
/// files without the tag are not.
fn check_sample_format(entry: &Entry) -> TiffResult<()> {
    let uint = u64::from(SampleFormat::Uint.to_u16());
    if entry.tag() != Tag::SampleFormat || !entry.words().contains(&uint) {
        return Ok(());
    }

    let values = entry
        .words()
        .iter()
        .map(|&v| u16::try_from(v).unwrap_or(u16::MAX))
        .collect();

    Err(TiffError::UnsupportedError(
        TiffUnsupportedError::SampleFormat(values),
    ))
}

/// The first directory that is explicitly marked as the full resolution image.
fn find_primary_image(ifds: &[Directory]) -> Option<usize> {
    let primary = u64::from(NewSubfileType::PrimaryImage.to_u32());
    ifds.iter()
        .position(|ifd| ifd.first_value(Tag::NewSubfileType) == Some(primary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Little endian file with the main directory at 8 and `entries` given as (tag, type, count,
    /// inline value).
    fn file_with_entries(entries: &[(u16, u16, u32, [u8; 4])]) -> Vec<u8> {
        let mut file = LITTLE_ENDIAN_MAGIC.to_vec();
        file.extend_from_slice(&8u32.to_le_bytes());
        file.extend_from_slice(&(entries.len() as u16).to_le_bytes());
        for (tag, type_, count, value) in entries {
            file.extend_from_slice(&tag.to_le_bytes());
            file.extend_from_slice(&type_.to_le_bytes());
            file.extend_from_slice(&count.to_le_bytes());
            file.extend_from_slice(value);
        }
        file.extend_from_slice(&0u32.to_le_bytes());
        file
    }

    fn read(file: Vec<u8>) -> TiffResult<IfdTree> {
        let mut reader = SmartReader::wrap(Cursor::new(file), ByteOrder::LittleEndian);
        IfdTree::read(&mut reader, &Limits::default())
    }

    #[test]
    fn bad_magic() {
        let mut file = file_with_entries(&[(256, 3, 1, [1, 0, 0, 0])]);
        file[2] = 0x2B;
        match read(file) {
            Err(TiffError::FormatError(TiffFormatError::TiffSignatureNotFound)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn plain_tiff() {
        let tree = read(file_with_entries(&[
            (256, 3, 1, [7, 0, 0, 0]),
            (257, 4, 1, [9, 0, 0, 0]),
        ]))
        .unwrap();

        assert_eq!(tree.kind(), TiffKind::Tiff);
        assert_eq!(tree.byte_order(), ByteOrder::LittleEndian);
        assert_eq!(tree.ifds().len(), 1);
        assert_eq!(tree.feature_map().first_value(Tag::ImageWidth), Some(7));
        assert_eq!(tree.feature_map().first_value(Tag::ImageLength), Some(9));
    }

    #[test]
    fn dng_version_marks_dng() {
        let tree = read(file_with_entries(&[(50706, 1, 4, [1, 4, 0, 0])])).unwrap();
        assert_eq!(tree.kind(), TiffKind::Dng);
    }

    #[test]
    fn unsigned_sample_format_is_refused() {
        let err = read(file_with_entries(&[(339, 3, 2, [3, 0, 1, 0])])).unwrap_err();
        match err {
            TiffError::UnsupportedError(TiffUnsupportedError::SampleFormat(values)) => {
                assert_eq!(values, vec![3, 1])
            }
            other => panic!("unexpected {:?}", other),
        }

        assert!(read(file_with_entries(&[(339, 3, 1, [3, 0, 0, 0])])).is_ok());
    }

    #[test]
    fn primary_image_lookup() {
        let thumb = Directory::from_iter([Entry::from_u32s(Tag::NewSubfileType, &[1])]);
        let primary = Directory::from_iter([Entry::from_u32s(Tag::NewSubfileType, &[0])]);
        let unmarked = Directory::empty();

        assert_eq!(
            find_primary_image(&[thumb.clone(), unmarked.clone(), primary]),
            Some(2)
        );
        assert_eq!(find_primary_image(&[thumb, unmarked]), None);
    }
}
