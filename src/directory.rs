use core::fmt;
use std::collections::BTreeMap;

use crate::{decoder::ifd::Entry, tags::Tag};

/// An Image File Directory (IFD).
///
/// A directory maps [`Tag`]s to their decoded [`Entry`]. Only tags known to this crate are kept,
/// the decoder skips everything else while reading the file. The directory selected as the image
/// to decode is also called the feature map.
#[doc(alias = "IFD")]
#[derive(Clone, Default, PartialEq)]
pub struct Directory {
    /// The order in the file is implied to be ascending by tag value (the decoder does not mind
    /// unordered entries).
    pub(crate) entries: BTreeMap<u16, Entry>,
}

impl Directory {
    /// Create a directory without entries.
    pub fn empty() -> Self {
        Directory {
            entries: BTreeMap::new(),
        }
    }

    /// Retrieve the entry of a tag.
    pub fn get(&self, tag: Tag) -> Option<&Entry> {
        self.entries.get(&tag.to_u16())
    }

    /// Check if the directory contains a specified tag.
    pub fn contains(&self, tag: Tag) -> bool {
        self.entries.contains_key(&tag.to_u16())
    }

    /// Iterate over all entries in ascending tag order.
    pub fn iter(&self) -> impl Iterator<Item = (Tag, &Entry)> + '_ {
        self.entries
            .iter()
            .map(|(k, v)| (Tag::from_u16_exhaustive(*k), v))
    }

    /// Insert an entry. An entry with the same tag is overwritten, the last occurrence in a file
    /// wins.
    pub fn insert(&mut self, entry: Entry) {
        self.entries.insert(entry.tag().to_u16(), entry);
    }

    /// Get the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First word of a tag's value, `None` if the tag is absent.
    pub(crate) fn first_value(&self, tag: Tag) -> Option<u64> {
        self.get(tag).map(Entry::first_value)
    }

    /// First word of a tag's value, `0` if the tag is absent.
    pub(crate) fn value_or_zero(&self, tag: Tag) -> u64 {
        self.first_value(tag).unwrap_or(0)
    }
}

impl fmt::Debug for Directory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Directory")
            .field("entries", &self.entries.values().collect::<Vec<_>>())
            .finish()
    }
}

/// One `Name: value` line per entry.
impl fmt::Display for Directory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for entry in self.entries.values() {
            writeln!(f, "{}", entry)?;
        }

        Ok(())
    }
}

impl FromIterator<Entry> for Directory {
    fn from_iter<I: IntoIterator<Item = Entry>>(iter: I) -> Self {
        let mut dir = Directory::empty();
        for entry in iter {
            dir.insert(entry);
        }
        dir
    }
}
