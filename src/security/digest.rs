//! Fast fixed-output digests.

use md5::{Digest, Md5};

/// Lower-case hex MD5 of `input`.
///
/// Used as the pre-digest for password checks and as the one-way reference
/// for token secrets. Both forms are what existing rows were written with.
pub fn md5_hex(input: &[u8]) -> String {
    format!("{:x}", Md5::digest(input))
}
