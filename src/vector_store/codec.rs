//! Binary encoding for embedding vectors.
//!
//! Vectors are stored as packed little-endian `f32` values with no header;
//! the component count is `bytes.len() / 4`. Values are copied bit-for-bit,
//! so NaN and infinities survive a round trip untouched.

/// Bytes per encoded component.
pub const BYTES_PER_COMPONENT: usize = 4;

/// Serialize a vector to bytes.
pub fn encode(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Deserialize a vector from bytes. Trailing bytes that do not form a whole
/// component are ignored.
pub fn decode(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(BYTES_PER_COMPONENT)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}
