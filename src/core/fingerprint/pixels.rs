//! Decoded-pixel content hashing.
//!
//! The image is decoded, resized to 8x8, converted to grayscale and
//! reduced to one bit per pixel against the average brightness. Two
//! files holding the same picture in different containers produce the
//! same 64-bit value, which is what makes cross-format duplicate
//! detection work.

use super::ContentHash;
use crate::error::FingerprintError;
use image::imageops::FilterType;
use std::path::Path;

/// Edge length of the thumbnail the hash is computed from
const HASH_SIZE: u32 = 8;

/// Decode an image and compute its average-threshold pixel hash
pub fn decoded_pixel_hash(path: &Path) -> Result<ContentHash, FingerprintError> {
    let image = image::open(path).map_err(|e| FingerprintError::Decode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let resized = image.resize_exact(HASH_SIZE, HASH_SIZE, FilterType::Lanczos3);
    let gray = resized.to_luma8();

    let total: u64 = gray.pixels().map(|p| p[0] as u64).sum();
    let count = (HASH_SIZE * HASH_SIZE) as u64;
    let average = (total / count) as u8;

    // One bit per pixel, row-major, MSB first
    let mut bits: u64 = 0;
    for y in 0..HASH_SIZE {
        for x in 0..HASH_SIZE {
            bits <<= 1;
            if gray.get_pixel(x, y)[0] > average {
                bits |= 1;
            }
        }
    }

    Ok(ContentHash(bits))
}
