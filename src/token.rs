use rand::distributions::Alphanumeric;
use rand::Rng;

pub const DEFAULT_SHORT_URL_LENGTH: usize = 6;

/// Draws a candidate short token from `[A-Za-z0-9]`. Uniqueness is not checked here.
pub fn generate_short_url(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

#[cfg(test)]
pub fn is_short_url(candidate: &str, length: usize) -> bool {
    candidate.len() == length && candidate.chars().all(|c| c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generates_requested_length() {
        for length in [4, DEFAULT_SHORT_URL_LENGTH, 32] {
            assert_eq!(generate_short_url(length).len(), length);
        }
    }

    #[test]
    fn uses_alphanumeric_alphabet() {
        for _ in 0..200 {
            let token = generate_short_url(DEFAULT_SHORT_URL_LENGTH);
            assert!(is_short_url(&token, DEFAULT_SHORT_URL_LENGTH), "{token}");
        }
    }

    #[test]
    fn candidates_vary() {
        let tokens: HashSet<_> = (0..100).map(|_| generate_short_url(12)).collect();
        assert!(tokens.len() > 95);
    }

    #[test]
    fn rejects_wrong_shape() {
        assert!(!is_short_url("abc", DEFAULT_SHORT_URL_LENGTH));
        assert!(!is_short_url("abc-ef", DEFAULT_SHORT_URL_LENGTH));
        assert!(is_short_url("a1B2c3", DEFAULT_SHORT_URL_LENGTH));
    }
}
