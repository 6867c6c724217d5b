//! Streaming MD5 checksum calculation for file verification.
//!
//! The manifest carries MD5 hex digests; comparisons are case-insensitive.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use md5::{Digest, Md5};

/// Buffer size for streaming file I/O (64KB).
pub(super) const BUFFER_SIZE: usize = 64 * 1024;

/// Calculate the MD5 checksum of a file.
///
/// Returns the lowercase hexadecimal digest of the file contents.
pub fn file_md5_hex(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Md5::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Compare a computed digest against an expected one, case-insensitively.
pub fn checksum_matches(actual: &str, expected: &str) -> bool {
    actual.eq_ignore_ascii_case(expected)
}
