//! Canonical digests for variant identity.

use sha2::{Digest, Sha256};

/// Line terminator appended after every component. It cannot occur inside a
/// namespace, feature or value, so the encoding is unambiguous.
const LINE_SEPARATOR: &[u8] = b"\n";

/// A hasher for building a digest from ordered textual components.
#[derive(Default)]
pub struct Fingerprint {
    hasher: Sha256,
}

impl Fingerprint {
    /// Create a new fingerprint builder.
    pub fn new() -> Self {
        Fingerprint {
            hasher: Sha256::new(),
        }
    }

    /// Add one line to the fingerprint.
    pub fn update_line(&mut self, line: &str) -> &mut Self {
        self.hasher.update(line.as_bytes());
        self.hasher.update(LINE_SEPARATOR);
        self
    }

    /// Add multiple lines, in order.
    pub fn update_lines<'a>(&mut self, lines: impl IntoIterator<Item = &'a str>) -> &mut Self {
        for line in lines {
            self.update_line(line);
        }
        self
    }

    /// Finalize and return the leading `N` bytes of the digest.
    pub fn finish_prefix<const N: usize>(self) -> [u8; N] {
        let digest = self.hasher.finalize();
        let mut prefix = [0u8; N];
        prefix.copy_from_slice(&digest[..N]);
        prefix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_line_framing() {
        let mut fp = Fingerprint::new();
        fp.update_line("hello");
        // sha256("hello\n")
        assert_eq!(
            hex::encode(fp.finish_prefix::<32>()),
            "5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03"
        );
    }

    #[test]
    fn test_fingerprint_prefix() {
        let mut fp = Fingerprint::new();
        fp.update_line("hello");
        assert_eq!(fp.finish_prefix::<4>(), [0x58, 0x91, 0xb5, 0xb5]);
    }

    #[test]
    fn test_fingerprint_framing_is_unambiguous() {
        let mut joined = Fingerprint::new();
        joined.update_lines(["ab", "c"]);

        let mut split = Fingerprint::new();
        split.update_lines(["a", "bc"]);

        assert_ne!(joined.finish_prefix::<32>(), split.finish_prefix::<32>());
    }
}
