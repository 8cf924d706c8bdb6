//! Fixed-width string blocks: left-justified and space padded.

/// A string or buffer larger than the room it was given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overflow {
    pub len: usize,
    pub max: usize,
}

/// Encode `values` into slots of `slot` bytes each. Every string must fit in
/// `width` bytes and the whole block in `capacity` bytes.
pub fn encode<S: AsRef<str>>(
    values: &[S],
    width: usize,
    slot: usize,
    capacity: usize,
) -> Result<Vec<u8>, Overflow> {
    let needed = values.len() * slot;
    if needed > capacity {
        return Err(Overflow {
            len: needed,
            max: capacity,
        });
    }
    let width = width.min(slot);
    let mut out = Vec::with_capacity(needed);
    for v in values {
        let bytes = v.as_ref().as_bytes();
        if bytes.len() > width {
            return Err(Overflow {
                len: bytes.len(),
                max: width,
            });
        }
        out.extend_from_slice(bytes);
        out.resize(out.len() + slot - bytes.len(), b' ');
    }
    Ok(out)
}

/// Recover one logical string, dropping trailing spaces and NULs.
pub fn trim(bytes: &[u8]) -> String {
    let end = bytes
        .iter()
        .rposition(|&b| b != b' ' && b != 0)
        .map_or(0, |i| i + 1);
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Split a block into `width`-byte strings.
pub fn decode(bytes: &[u8], width: usize) -> Vec<String> {
    if width == 0 {
        return Vec::new();
    }
    bytes.chunks(width).map(trim).collect()
}
