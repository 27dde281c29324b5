//! Content-derived identifiers

use sha2::{Digest, Sha256};

/// First 8 bytes of the SHA-256 of `text`, big-endian
pub fn stable_hash(text: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = hasher.finalize();
    hash[..8].iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
}

/// `feedback_<n>` with `n < 100000`; identical text gives the same id
pub fn feedback_id(text: &str) -> String {
    format!("feedback_{}", stable_hash(text) % 100_000)
}

pub fn rule_id(rule: &str) -> String {
    format!("rule_{:016x}", stable_hash(rule.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feedback_id_is_stable_and_bounded() {
        let a = feedback_id("Minors need a guardian.");
        assert_eq!(a, feedback_id("Minors need a guardian."));
        assert_ne!(a, feedback_id("Minors need a guardian!"));

        let n: u64 = a.trim_start_matches("feedback_").parse().unwrap();
        assert!(n < 100_000);
    }

    #[test]
    fn test_rule_id_ignores_surrounding_whitespace() {
        assert_eq!(rule_id(" p(X). "), rule_id("p(X)."));
        assert_eq!(rule_id("p(X).").len(), "rule_".len() + 16);
    }
}
