use rand::Rng;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
pub const REFERENCE_LEN: usize = 6;

pub fn random_reference<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..REFERENCE_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Draws candidates from `next` until one is not taken.
pub fn unique_reference<N, T>(mut next: N, mut is_taken: T) -> String
where
    N: FnMut() -> String,
    T: FnMut(&str) -> bool,
{
    loop {
        let candidate = next();
        if !is_taken(&candidate) {
            return candidate;
        }
    }
}

/// Six ASCII letters or digits; lookups upper-case the reference first.
pub fn is_valid_reference(reference: &str) -> bool {
    reference.len() == REFERENCE_LEN && reference.bytes().all(|b| b.is_ascii_alphanumeric())
}
