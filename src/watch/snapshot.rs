// src/watch/snapshot.rs

use std::fmt;
use std::path::Path;

use blake3::Hasher;

/// Number of hex digits of the digest shown in logs.
const SHORT_DIGEST_LEN: usize = 12;

/// Last observed content of a watched file.
///
/// Change detection compares the raw bytes. The `blake3` digest is only
/// there to tell versions apart in log lines.
#[derive(Clone, PartialEq, Eq)]
pub struct Snapshot {
    bytes: Vec<u8>,
}

impl Snapshot {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Read `path` asynchronously.
    pub async fn read(path: &Path) -> std::io::Result<Self> {
        tokio::fs::read(path).await.map(Self::new)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// True unless `other` is byte-for-byte identical to this snapshot.
    pub fn differs_from(&self, other: &[u8]) -> bool {
        self.bytes.as_slice() != other
    }

    /// Shortened hex digest of the content.
    pub fn digest(&self) -> String {
        let mut hasher = Hasher::new();
        hasher.update(&self.bytes);
        let hex = hasher.finalize().to_hex();
        hex.as_str()[..SHORT_DIGEST_LEN].to_string()
    }
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("len", &self.bytes.len())
            .field("digest", &self.digest())
            .finish()
    }
}
