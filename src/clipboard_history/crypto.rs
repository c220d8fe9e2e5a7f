//! Key management and authenticated encryption of the history blob
//!
//! AES-256-GCM with a fresh random nonce per call.
//! Blob layout: `version (1) || nonce (12) || ciphertext + tag`.
//!
//! The key lives in a user-scoped file as base64 text and is never rotated.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use rand::rngs::OsRng;
use rand::RngCore;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;
use tracing::{debug, info};

use crate::error::{DecryptError, KeyIoError};

pub const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const BLOB_VERSION: u8 = 0x01;

/// Symmetric key material. Debug output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct Key([u8; KEY_LEN]);

impl Key {
    /// Generate a fresh key from the OS RNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    fn to_file_contents(&self) -> String {
        format!("{}\n", STANDARD.encode(self.0))
    }

    fn from_file_contents(path: &Path, contents: &[u8]) -> Result<Self, KeyIoError> {
        let malformed = |reason: String| KeyIoError::Malformed {
            path: path.to_path_buf(),
            reason,
        };

        let text = std::str::from_utf8(contents)
            .map_err(|_| malformed("not UTF-8 text".to_string()))?;
        let decoded = STANDARD
            .decode(text.trim())
            .map_err(|e| malformed(format!("invalid base64: {}", e)))?;
        let bytes: [u8; KEY_LEN] = decoded.try_into().map_err(|v: Vec<u8>| {
            malformed(format!("expected {} key bytes, found {}", KEY_LEN, v.len()))
        })?;
        Ok(Self(bytes))
    }
}

impl std::fmt::Debug for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Key(<redacted>)")
    }
}

/// Load the key at `path`, creating it on first use.
///
/// A new key file is written with owner-only permissions on Unix. If another
/// process wins the race to create it, that process's key is read back.
pub fn load_or_create_key(path: &Path) -> Result<Key, KeyIoError> {
    match fs::read(path) {
        Ok(contents) => {
            debug!(path = %path.display(), "Loaded existing key file");
            Key::from_file_contents(path, &contents)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => create_key_file(path),
        Err(source) => Err(KeyIoError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn create_key_file(path: &Path) -> Result<Key, KeyIoError> {
    let write_err = |source| KeyIoError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
    }

    let key = Key::generate();
    let mut file = match owner_only_options().create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            let contents = fs::read(path).map_err(|source| KeyIoError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            return Key::from_file_contents(path, &contents);
        }
        Err(e) => return Err(write_err(e)),
    };

    file.write_all(key.to_file_contents().as_bytes())
        .and_then(|_| file.sync_all())
        .map_err(write_err)?;

    info!(path = %path.display(), "Generated new history key");
    Ok(key)
}

/// Open options for files holding key or history material.
pub(crate) fn owner_only_options() -> fs::OpenOptions {
    let mut options = fs::OpenOptions::new();
    options.write(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options
}

fn cipher(key: &Key) -> Aes256Gcm {
    Aes256Gcm::new(aes_gcm::Key::<Aes256Gcm>::from_slice(&key.0))
}

/// Encrypt `plaintext`. Output differs between calls on identical input.
///
/// Only fails for inputs beyond GCM's plaintext size limit.
pub fn encrypt(plaintext: &[u8], key: &Key) -> Result<Vec<u8>, aes_gcm::Error> {
    let cipher = cipher(key);

    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let sealed = cipher.encrypt(nonce, plaintext)?;

    let mut blob = Vec::with_capacity(1 + NONCE_LEN + sealed.len());
    blob.push(BLOB_VERSION);
    blob.extend_from_slice(&nonce_bytes);
    blob.extend_from_slice(&sealed);
    Ok(blob)
}

/// Decrypt and authenticate a blob produced by [`encrypt`].
pub fn decrypt(ciphertext: &[u8], key: &Key) -> Result<Vec<u8>, DecryptError> {
    if ciphertext.len() < 1 + NONCE_LEN + TAG_LEN {
        return Err(DecryptError::Truncated {
            len: ciphertext.len(),
        });
    }

    let (version, rest) = ciphertext.split_at(1);
    if version[0] != BLOB_VERSION {
        return Err(DecryptError::UnsupportedVersion(version[0]));
    }

    let (nonce_bytes, sealed) = rest.split_at(NONCE_LEN);
    cipher(key)
        .decrypt(Nonce::from_slice(nonce_bytes), sealed)
        .map_err(|_| DecryptError::Authentication)
}
