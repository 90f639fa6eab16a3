//! Content fingerprints
//!
//! Files are hashed with BLAKE3 while streaming them in fixed-size chunks,
//! so memory use does not depend on file size.

use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use tokio::fs as afs;
use tokio::io::AsyncReadExt;

use crate::error::MirrorError;

/// Default read buffer for hashing and copying
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// 256-bit content digest
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest([u8; 32]);

impl Digest {
	pub fn from_bytes(bytes: [u8; 32]) -> Self {
		Digest(bytes)
	}

	pub fn as_bytes(&self) -> &[u8; 32] {
		&self.0
	}

	pub fn to_hex(&self) -> String {
		hex::encode(self.0)
	}
}

impl fmt::Display for Digest {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.to_hex())
	}
}

impl fmt::Debug for Digest {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Digest({})", &self.to_hex()[..16])
	}
}

/// Computes a content fingerprint for a file
#[async_trait]
pub trait Fingerprinter: Send + Sync {
	/// Read the whole file at `path` and return its digest.
	///
	/// Fails with `MirrorError::Read` when the file cannot be opened or a
	/// read fails part way through.
	async fn fingerprint(&self, path: &Path) -> Result<Digest, MirrorError>;
}

/// BLAKE3 fingerprinter reading `buffer_size` bytes at a time
#[derive(Debug, Clone)]
pub struct Blake3Fingerprinter {
	buffer_size: usize,
}

impl Blake3Fingerprinter {
	pub fn new(buffer_size: usize) -> Self {
		Blake3Fingerprinter { buffer_size: buffer_size.max(1) }
	}
}

impl Default for Blake3Fingerprinter {
	fn default() -> Self {
		Self::new(DEFAULT_BUFFER_SIZE)
	}
}

#[async_trait]
impl Fingerprinter for Blake3Fingerprinter {
	async fn fingerprint(&self, path: &Path) -> Result<Digest, MirrorError> {
		let read_err = |source| MirrorError::Read { path: path.to_path_buf(), source };

		let mut f = afs::File::open(path).await.map_err(read_err)?;
		let mut hasher = blake3::Hasher::new();
		let mut buf = vec![0u8; self.buffer_size];

		loop {
			let n = f.read(&mut buf).await.map_err(read_err)?;
			if n == 0 {
				break;
			}
			hasher.update(&buf[..n]);
		}

		Ok(Digest(*hasher.finalize().as_bytes()))
	}
}


// vim: ts=4
