//! Scoped handling of secret byte material.
//!
//! # Responsibilities
//! - Load key material and passphrases referenced by path
//! - Guarantee the backing buffer is erased once a secret leaves scope,
//!   on success and failure paths alike
//!
//! # Design Decisions
//! - Erasure happens in `Drop` with volatile writes, so every exit path is
//!   covered, including panics inside the borrowing closure
//! - `use_secret` consumes the secret: once the callback returns, nothing
//!   can read the material again

use std::fs;
use std::io;
use std::path::Path;
use std::sync::atomic::{compiler_fence, Ordering};

/// Secret byte material with guaranteed erasure on drop.
pub struct Secret {
    bytes: Vec<u8>,
}

impl Secret {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Read secret material from a file, trimming a trailing newline.
    pub fn from_file(path: &Path) -> io::Result<Self> {
        let mut bytes = fs::read(path)?;
        while bytes.last().is_some_and(|b| *b == b'\n' || *b == b'\r') {
            bytes.pop();
        }
        Ok(Self { bytes })
    }

    /// Compare against candidate material without exposing the secret.
    pub fn matches(&self, candidate: &[u8]) -> bool {
        // length leak is acceptable; avoid early-exit on content
        if self.bytes.len() != candidate.len() {
            return false;
        }
        self.bytes
            .iter()
            .zip(candidate)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl Drop for Secret {
    fn drop(&mut self) {
        for byte in self.bytes.iter_mut() {
            // volatile so the wipe is not optimized away
            unsafe { std::ptr::write_volatile(byte, 0) };
        }
        compiler_fence(Ordering::SeqCst);
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Secret({} bytes)", self.bytes.len())
    }
}

/// Expose a secret to a single callback, then erase it.
///
/// The secret is consumed; its buffer is wiped when this function returns,
/// whether the callback succeeded or failed.
pub fn use_secret<T, E>(secret: Secret, f: impl FnOnce(&[u8]) -> Result<T, E>) -> Result<T, E> {
    let result = f(&secret.bytes);
    drop(secret);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn use_secret_exposes_the_material_once() {
        let secret = Secret::new(b"hunter2".to_vec());
        let length = use_secret(secret, |bytes| {
            assert_eq!(bytes, b"hunter2");
            Ok::<_, ()>(bytes.len())
        })
        .unwrap();
        assert_eq!(length, 7);
    }

    #[test]
    fn use_secret_propagates_callback_errors() {
        let secret = Secret::new(b"key".to_vec());
        let result: Result<(), &str> = use_secret(secret, |_| Err("bad store"));
        assert_eq!(result, Err("bad store"));
    }

    #[test]
    fn matches_compares_exact_content() {
        let secret = Secret::new(b"expected".to_vec());
        assert!(secret.matches(b"expected"));
        assert!(!secret.matches(b"expectes"));
        assert!(!secret.matches(b"short"));
    }

    #[test]
    fn from_file_trims_trailing_newline() {
        let dir = std::env::temp_dir().join("node-gateway-secret-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("key");
        std::fs::write(&path, "s3cret\n").unwrap();
        let secret = Secret::from_file(&path).unwrap();
        assert!(secret.matches(b"s3cret"));
    }
}
