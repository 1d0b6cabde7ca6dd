use parse_display::Display;
use ssh_key::{Algorithm, Fingerprint, HashAlg, PublicKey};

use super::ErrorKind;

/// The canonical identity of a key, its `<algorithm> <base64>` encoding,
/// regardless of the comment or options it was declared with.
#[derive(Debug, Display, Clone, PartialEq, Eq, Hash)]
#[display("{0}")]
pub struct Identity(String);

impl std::ops::Deref for Identity {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// A single parsed `authorized_keys` line.
#[derive(Debug, Clone)]
pub struct Entry {
    key: PublicKey,
    identity: Identity,
    comment: String,
    options: Vec<String>,
}

impl Entry {
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.key
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    /// The options preceding the key, verbatim and in declaration order.
    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn fingerprint(&self) -> Fingerprint {
        self.key.fingerprint(HashAlg::Sha256)
    }

    /// Replace the comment of a freshly parsed [`Entry`],
    /// the key and its options are left untouched.
    pub fn with_comment(self, comment: impl Into<String>) -> Self {
        Self {
            comment: comment.into(),
            ..self
        }
    }
}

impl std::fmt::Display for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.options.is_empty() {
            write!(f, "{} ", self.options.join(","))?;
        }

        f.write_str(&self.identity)?;

        if !self.comment.is_empty() {
            write!(f, " {}", self.comment)?;
        }

        Ok(())
    }
}

impl std::str::FromStr for Entry {
    type Err = ErrorKind;

    /// Parse a single non-empty, non-comment `authorized_keys` line,
    /// formatted as `[options] <algorithm> <base64> [comment]`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_line(s).map(|(entry, _)| entry)
    }
}

impl Entry {
    /// Parse a single `authorized_keys` line from raw bytes.
    ///
    /// Only the comment may hold invalid _UTF-8_, it is then decoded lossily.
    pub fn from_bytes(line: &[u8]) -> Result<Self, ErrorKind> {
        let err = match std::str::from_utf8(line) {
            Ok(line) => return line.parse(),
            Err(err) => err,
        };

        // Offsets of the decoded line match the raw ones up to the first invalid byte
        let decoded = String::from_utf8_lossy(line);
        match Self::parse_line(&decoded) {
            Ok((entry, comment_at)) if comment_at <= err.valid_up_to() => Ok(entry),
            _ => Err(err.into()),
        }
    }

    /// Parse the line into an [`Entry`] and the byte offset of it's comment in `s`.
    fn parse_line(s: &str) -> Result<(Self, usize), ErrorKind> {
        let leading = s.len() - s.trim_start().len();
        let s = s.trim();
        let (head, rest) = split_field(s)?;

        // Anything that isn't a key type in front of the key is the option list
        let (options, rest) = if is_key_type(head) {
            (Vec::new(), s)
        } else {
            (split_options(head), rest)
        };

        let (algorithm, rest) = split_token(rest);
        let (material, comment) = split_token(rest);

        if algorithm.is_empty() {
            return Err(ErrorKind::MissingKey(head.into()));
        }
        if !is_key_type(algorithm) {
            // Without a key type after it, `head` was a mistyped key type rather than options
            return Err(ErrorKind::UnknownAlgorithm(head.into()));
        }
        if material.is_empty() {
            return Err(ErrorKind::MissingKey(algorithm.into()));
        }

        let key = PublicKey::from_openssh(&format!("{algorithm} {material}"))?;
        let identity = Identity(key.to_openssh()?.trim_end().to_owned());

        let entry = Self {
            key,
            identity,
            comment: comment.trim().into(),
            options,
        };

        Ok((entry, leading + s.len() - comment.len()))
    }
}

/// Whether `token` names a key type this parser knows how to decode.
fn is_key_type(token: &str) -> bool {
    matches!(Algorithm::new(token), Ok(algorithm) if !matches!(algorithm, Algorithm::Other(_)))
}

/// Split the first whitespace-delimited field from `s`, honoring
/// double-quoted sections and `\"` escapes inside of them.
fn split_field(s: &str) -> Result<(&str, &str), ErrorKind> {
    let mut quoted = false;
    let mut escaped = false;

    for (i, c) in s.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            ' ' | '\t' if !quoted => return Ok((&s[..i], s[i..].trim_start())),
            _ => (),
        }
    }

    if quoted {
        Err(ErrorKind::UnterminatedQuote)
    } else {
        Ok((s, ""))
    }
}

/// Split an option list on the commas outside of quoted sections.
fn split_options(field: &str) -> Vec<String> {
    let mut options = Vec::new();
    let mut quoted = false;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in field.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            ',' if !quoted => {
                options.push(field[start..i].to_owned());
                start = i + 1;
            }
            _ => (),
        }
    }
    options.push(field[start..].to_owned());

    options
}

fn split_token(s: &str) -> (&str, &str) {
    match s.find(|c: char| c == ' ' || c == '\t') {
        Some(i) => (&s[..i], s[i..].trim_start()),
        None => (s, ""),
    }
}
