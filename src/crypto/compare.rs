use sha2::{Digest, Sha256};

/// Compare two secrets without leaking where they differ.
///
/// Both sides are hashed first so the loop always runs over 32 bytes, whatever
/// the input lengths.
#[must_use]
pub fn secrets_match(left: &[u8], right: &[u8]) -> bool {
    let left = Sha256::digest(left);
    let right = Sha256::digest(right);

    left.iter()
        .zip(right.iter())
        .fold(0u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}
