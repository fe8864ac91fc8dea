//! Four-byte chunk and format identifiers

use std::fmt;
use std::io::Read;

/// A four-byte ASCII tag, as used by CAF chunk types and format IDs.
///
/// Comparison is byte-wise; no case folding or padding is applied.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCc(pub [u8; 4]);

impl FourCc {
    /// Build a tag from an ASCII string.
    ///
    /// Anything other than exactly four ASCII bytes yields the `\0\0\0\0`
    /// sentinel, which compares unequal to every real tag.
    pub fn from_ascii(s: &str) -> Self {
        let bytes = s.as_bytes();
        if bytes.len() != 4 || !s.is_ascii() {
            return FourCc([0; 4]);
        }
        FourCc([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    /// Read a tag from the stream.
    pub fn read<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        let mut bytes = [0u8; 4];
        reader.read_exact(&mut bytes)?;
        Ok(FourCc(bytes))
    }

    /// The raw tag bytes.
    pub const fn as_bytes(&self) -> [u8; 4] {
        self.0
    }
}

impl From<[u8; 4]> for FourCc {
    fn from(bytes: [u8; 4]) -> Self {
        FourCc(bytes)
    }
}

impl fmt::Display for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            if b.is_ascii_graphic() || b == b' ' {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{b:02x}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FourCc({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_from_ascii() {
        assert_eq!(FourCc::from_ascii("test").0, [0x74, 0x65, 0x73, 0x74]);
        assert_eq!(FourCc::from_ascii("opus"), FourCc(*b"opus"));
    }

    #[test]
    fn test_bad_input_yields_sentinel() {
        assert_eq!(FourCc::from_ascii("").0, [0; 4]);
        assert_eq!(FourCc::from_ascii("abc").0, [0; 4]);
        assert_eq!(FourCc::from_ascii("toolong").0, [0; 4]);
        assert_eq!(FourCc::from_ascii("dat\u{e9}").0, [0; 4]);

        // The sentinel never matches a real tag.
        assert_ne!(FourCc::from_ascii("abc"), FourCc(*b"desc"));
    }

    #[test]
    fn test_read() {
        let mut cursor = Cursor::new(b"paktrest");
        assert_eq!(FourCc::read(&mut cursor).unwrap(), FourCc(*b"pakt"));
        assert_eq!(FourCc::read(&mut cursor).unwrap(), FourCc(*b"rest"));
        assert!(FourCc::read(&mut cursor).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(FourCc(*b"desc").to_string(), "desc");
        assert_eq!(FourCc([0x64, 0x61, 0x74, 0x01]).to_string(), "dat\\x01");
    }
}
