use std::collections::HashMap;

use super::{Entry, Error, Identity};

/// The character opening a comment line in `authorized_keys` files.
const COMMENT_PREFIX: char = '#';

/// An insertion-ordered collection of [`Entry`], unique by [`Identity`].
///
/// Entries are only ever appended: inserting a key whose identity is already
/// present is a no-op, so the first occurrence of a key always wins
/// and keeps it's position.
#[derive(Debug, Default, Clone)]
pub struct KeyTable {
    entries: Vec<Entry>,
    index: HashMap<Identity, usize>,
}

impl KeyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, identity: &Identity) -> bool {
        self.index.contains_key(identity)
    }

    pub fn get(&self, identity: &Identity) -> Option<&Entry> {
        self.index.get(identity).map(|&position| &self.entries[position])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }

    /// Parse `authorized_keys` formatted `data` and append it's keys to the table.
    ///
    /// Either every line of `data` parses and the new keys are committed,
    /// or the first malformed line is reported and the table is left as it was.
    pub fn parse(&mut self, data: &[u8]) -> Result<(), Error> {
        self.parse_with(data, |entry| entry)
    }

    /// Same as [`KeyTable::parse`], mapping each new [`Entry`] through `f`
    /// before it is inserted in the table.
    pub fn parse_with(
        &mut self,
        data: &[u8],
        mut f: impl FnMut(Entry) -> Entry,
    ) -> Result<(), Error> {
        let mut staged = Self::new();

        for (number, line) in data.split(|&b| b == b'\n').enumerate() {
            let text = String::from_utf8_lossy(line);
            let text = text.trim();

            if text.is_empty() || text.starts_with(COMMENT_PREFIX) {
                continue;
            }

            let entry = Entry::from_bytes(line).map_err(|kind| Error::new(number + 1, kind))?;

            if !self.contains(entry.identity()) {
                staged.insert(f(entry));
            }
        }

        tracing::debug!("Parsed {} new key(s)", staged.len());

        self.extend(staged);

        Ok(())
    }

    /// Append the keys of `other` that aren't already in the table, in `other`'s order,
    /// returning how many were added.
    ///
    /// When `warn` is set, every key that is already present is reported
    /// with the entry that already authorizes it.
    pub fn merge(&mut self, other: KeyTable, warn: bool) -> usize {
        let before = self.len();

        for entry in other {
            match self.get(entry.identity()) {
                Some(existing) => {
                    if warn {
                        tracing::warn!(
                            fingerprint = %existing.fingerprint(),
                            "Already authorized: {existing}"
                        );
                    }
                }
                None => self.insert(entry),
            }
        }

        self.len() - before
    }

    /// Write the table to `writer` in the `authorized_keys` format, one key per line.
    pub fn write_to(&self, mut writer: impl std::io::Write) -> std::io::Result<()> {
        for entry in &self.entries {
            writeln!(writer, "{entry}")?;
        }

        writer.flush()
    }

    fn insert(&mut self, entry: Entry) {
        if !self.index.contains_key(entry.identity()) {
            self.index.insert(entry.identity().clone(), self.entries.len());
            self.entries.push(entry);
        }
    }
}

impl Extend<Entry> for KeyTable {
    fn extend<T: IntoIterator<Item = Entry>>(&mut self, iter: T) {
        for entry in iter {
            self.insert(entry);
        }
    }
}

impl FromIterator<Entry> for KeyTable {
    fn from_iter<T: IntoIterator<Item = Entry>>(iter: T) -> Self {
        let mut table = Self::new();
        table.extend(iter);
        table
    }
}

impl IntoIterator for KeyTable {
    type Item = Entry;
    type IntoIter = std::vec::IntoIter<Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a KeyTable {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
