//! Optional decryption of object streams.
//!
//! Sealed objects are a sequence of ChaCha20-Poly1305 records:
//!
//! ```text
//! +---------------------------+-------------------------------+
//! | Length (4 bytes, BE, u32) | Ciphertext || Tag (16 bytes) |
//! +---------------------------+-------------------------------+
//! ```
//!
//! The nonce of record `n` (starting at 0) is four zero bytes followed by
//! `n` as a big-endian u64. Records are authenticated individually; a
//! stream that ends mid-record is truncated and reported as an error.

use crate::storage::ObjectReader;
use bytes::Bytes;
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, CHACHA20_POLY1305, NONCE_LEN};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::io::StreamReader;

/// Key length for ChaCha20-Poly1305.
pub const KEY_LEN: usize = 32;

/// Authentication tag appended to every record.
pub const TAG_LEN: usize = 16;

/// Largest plaintext carried by one record.
pub const MAX_RECORD_LEN: usize = 1 << 20;

const RECORD_PREFIX_LEN: usize = 4;

pub type CryptoResult<T> = Result<T, CryptoError>;

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("invalid key: expected 32 bytes, got {0}")]
    InvalidKey(usize),

    #[error("failed to read key file {path}: {source}")]
    KeyFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("record length {0} out of range")]
    RecordLength(usize),

    #[error("sealed stream truncated")]
    Truncated,

    #[error("record {0} failed authentication")]
    Authentication(u64),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<CryptoError> for std::io::Error {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::Io(e) => e,
            other => std::io::Error::new(std::io::ErrorKind::InvalidData, other),
        }
    }
}

/// Transform applied to an object stream before it reaches the client.
pub trait Decrypter: Send + Sync {
    fn decrypt(&self, reader: ObjectReader) -> ObjectReader;
}

fn nonce_for(counter: u64) -> Nonce {
    let mut nonce = [0u8; NONCE_LEN];
    nonce[NONCE_LEN - 8..].copy_from_slice(&counter.to_be_bytes());
    Nonce::assume_unique_for_key(nonce)
}

fn load_key(key: &[u8]) -> CryptoResult<LessSafeKey> {
    let unbound =
        UnboundKey::new(&CHACHA20_POLY1305, key).map_err(|_| CryptoError::InvalidKey(key.len()))?;
    Ok(LessSafeKey::new(unbound))
}

/// Decrypter for the sealed record format.
pub struct SealedStreamDecrypter {
    key: Arc<LessSafeKey>,
}

impl SealedStreamDecrypter {
    pub fn new(key: &[u8]) -> CryptoResult<Self> {
        Ok(Self {
            key: Arc::new(load_key(key)?),
        })
    }

    /// Load a raw 32-byte key from disk.
    pub fn from_key_file(path: &Path) -> CryptoResult<Self> {
        let key = std::fs::read(path).map_err(|source| CryptoError::KeyFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::new(&key)
    }
}

impl Decrypter for SealedStreamDecrypter {
    fn decrypt(&self, reader: ObjectReader) -> ObjectReader {
        let key = Arc::clone(&self.key);

        let records = async_stream::stream! {
            let mut reader = reader;
            let mut counter: u64 = 0;
            loop {
                let len = match read_record_len(&mut reader).await {
                    Ok(Some(len)) => len,
                    Ok(None) => break,
                    Err(e) => {
                        yield Err(std::io::Error::from(e));
                        return;
                    }
                };
                if !(TAG_LEN..=MAX_RECORD_LEN + TAG_LEN).contains(&len) {
                    yield Err(std::io::Error::from(CryptoError::RecordLength(len)));
                    return;
                }

                let mut record = vec![0u8; len];
                if let Err(e) = reader.read_exact(&mut record).await {
                    let err = if e.kind() == std::io::ErrorKind::UnexpectedEof {
                        CryptoError::Truncated
                    } else {
                        CryptoError::Io(e)
                    };
                    yield Err(std::io::Error::from(err));
                    return;
                }

                let plain_len = match key.open_in_place(nonce_for(counter), Aad::empty(), &mut record) {
                    Ok(plain) => plain.len(),
                    Err(_) => {
                        yield Err(std::io::Error::from(CryptoError::Authentication(counter)));
                        return;
                    }
                };
                record.truncate(plain_len);
                counter += 1;

                if !record.is_empty() {
                    yield Ok(Bytes::from(record));
                }
            }
        };

        Box::new(StreamReader::new(Box::pin(records)))
    }
}

/// Read a record length prefix. `None` on a clean end of stream.
async fn read_record_len<R>(reader: &mut R) -> CryptoResult<Option<usize>>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut prefix = [0u8; RECORD_PREFIX_LEN];
    let mut filled = 0;
    while filled < RECORD_PREFIX_LEN {
        let n = reader.read(&mut prefix[filled..]).await?;
        if n == 0 {
            return if filled == 0 {
                Ok(None)
            } else {
                Err(CryptoError::Truncated)
            };
        }
        filled += n;
    }
    Ok(Some(u32::from_be_bytes(prefix) as usize))
}

/// Seal `plaintext` into the record format, `record_len` plaintext bytes
/// per record.
pub fn seal(key: &[u8], plaintext: &[u8], record_len: usize) -> CryptoResult<Vec<u8>> {
    if record_len == 0 || record_len > MAX_RECORD_LEN {
        return Err(CryptoError::RecordLength(record_len));
    }
    let key = load_key(key)?;

    let mut out = Vec::with_capacity(plaintext.len() + plaintext.len() / record_len * 20 + 20);
    for (counter, chunk) in plaintext.chunks(record_len).enumerate() {
        let mut record = chunk.to_vec();
        key.seal_in_place_append_tag(nonce_for(counter as u64), Aad::empty(), &mut record)
            .map_err(|_| CryptoError::RecordLength(chunk.len()))?;
        out.extend_from_slice(&(record.len() as u32).to_be_bytes());
        out.extend_from_slice(&record);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    const KEY: [u8; KEY_LEN] = [7u8; KEY_LEN];

    async fn decrypt_all(sealed: Vec<u8>) -> std::io::Result<Vec<u8>> {
        let decrypter = SealedStreamDecrypter::new(&KEY).unwrap();
        let mut reader = decrypter.decrypt(Box::new(Cursor::new(sealed)));
        let mut out = Vec::new();
        reader.read_to_end(&mut out).await?;
        Ok(out)
    }

    #[tokio::test]
    async fn test_decrypts_multiple_records() {
        let plaintext: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let sealed = seal(&KEY, &plaintext, 4096).unwrap();
        assert_eq!(decrypt_all(sealed).await.unwrap(), plaintext);
    }

    #[tokio::test]
    async fn test_empty_stream_decrypts_to_empty() {
        let sealed = seal(&KEY, b"", 16).unwrap();
        assert!(sealed.is_empty());
        assert!(decrypt_all(sealed).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tampered_record_fails() {
        let mut sealed = seal(&KEY, b"ABCDE", 16).unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0xff;

        let err = decrypt_all(sealed).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn test_wrong_key_fails() {
        let sealed = seal(&[1u8; KEY_LEN], b"ABCDE", 16).unwrap();
        assert!(decrypt_all(sealed).await.is_err());
    }

    #[tokio::test]
    async fn test_truncated_record_fails() {
        let sealed = seal(&KEY, b"ABCDEFGH", 4).unwrap();
        let cut = sealed[..sealed.len() - 3].to_vec();
        let err = decrypt_all(cut).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn test_truncated_prefix_fails() {
        let mut sealed = seal(&KEY, b"ABCD", 4).unwrap();
        sealed.extend_from_slice(&[0, 0]);
        assert!(decrypt_all(sealed).await.is_err());
    }

    #[tokio::test]
    async fn test_reordered_records_fail() {
        let sealed = seal(&KEY, b"AAAABBBB", 4).unwrap();
        let record = sealed.len() / 2;
        let mut swapped = sealed[record..].to_vec();
        swapped.extend_from_slice(&sealed[..record]);
        assert!(decrypt_all(swapped).await.is_err());
    }

    #[test]
    fn test_invalid_key_length() {
        assert!(matches!(
            SealedStreamDecrypter::new(&[0u8; 5]),
            Err(CryptoError::InvalidKey(5))
        ));
    }

    #[test]
    fn test_from_key_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("key");
        std::fs::write(&path, KEY).unwrap();
        assert!(SealedStreamDecrypter::from_key_file(&path).is_ok());
        assert!(matches!(
            SealedStreamDecrypter::from_key_file(&tmp.path().join("absent")),
            Err(CryptoError::KeyFile { .. })
        ));
    }
}
