//! Leading-zero-bit difficulty checks over hex digests.
//!
//! Each hex character contributes four bits, so the target can be tuned one
//! bit at a time rather than one character at a time.

/// Whether the first `difficulty_bits` bits of `hex_digest` are all zero.
///
/// Zero bits is always satisfied, even by an empty digest. A target wider than
/// the digest (`4 * len`) never is. A non-hex character inside the examined
/// prefix fails the check.
pub fn satisfies(hex_digest: &str, difficulty_bits: u32) -> bool {
    if difficulty_bits == 0 {
        return true;
    }
    if u64::from(difficulty_bits) > hex_digest.len() as u64 * 4 {
        return false;
    }

    let mut remaining = difficulty_bits;
    for c in hex_digest.chars() {
        let Some(nibble) = c.to_digit(16) else {
            return false;
        };
        if remaining >= 4 {
            if nibble != 0 {
                return false;
            }
            remaining -= 4;
            if remaining == 0 {
                return true;
            }
        } else {
            return nibble >> (4 - remaining) == 0;
        }
    }
    remaining == 0
}

/// Count of leading zero bits in `hex_digest`, stopping at the first non-hex character.
pub fn leading_zero_bits(hex_digest: &str) -> u32 {
    let mut count = 0u32;
    for c in hex_digest.chars() {
        let Some(nibble) = c.to_digit(16) else {
            break;
        };
        if nibble == 0 {
            count += 4;
            continue;
        }
        count += nibble.leading_zeros() - 28;
        break;
    }
    count
}
