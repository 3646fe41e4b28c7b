//! ENS name handling: label validation, hashing and suggestions

use ethers::utils::keccak256;

use crate::error::{EnsError, Result};

pub const ETH_SUFFIX: &str = ".eth";

const MIN_LABEL_LEN: usize = 3;
const MAX_LABEL_LEN: usize = 63;
const MAX_SUGGESTIONS: usize = 8;

/// Validate a bare label (no `.eth` suffix).
///
/// Accepts 3-63 characters of lowercase ASCII letters, digits and hyphens,
/// not starting or ending with a hyphen.
pub fn validate_name(name: &str) -> Result<()> {
    if name.len() < MIN_LABEL_LEN {
        return Err(EnsError::Validation(
            "Name must be at least 3 characters".to_string(),
        ));
    }

    if name.len() > MAX_LABEL_LEN {
        return Err(EnsError::Validation(
            "Name must be less than 64 characters".to_string(),
        ));
    }

    if !name
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
    {
        return Err(EnsError::Validation(
            "Name can only contain lowercase letters, numbers, and hyphens".to_string(),
        ));
    }

    if name.starts_with('-') || name.ends_with('-') {
        return Err(EnsError::Validation(
            "Name cannot start or end with a hyphen".to_string(),
        ));
    }

    Ok(())
}

/// Strip an optional `.eth` suffix and validate what is left.
pub fn normalize_label(input: &str) -> Result<String> {
    let trimmed = input.trim();
    let label = trimmed.strip_suffix(ETH_SUFFIX).unwrap_or(trimmed);
    validate_name(label)?;
    Ok(label.to_string())
}

/// e.g., format_name("alice") -> "alice.eth"
pub fn format_name(name: &str) -> String {
    if name.ends_with(ETH_SUFFIX) {
        name.to_string()
    } else {
        format!("{}{}", name, ETH_SUFFIX)
    }
}

/// Calculate the namehash of an ENS name (EIP-137)
/// e.g., namehash("alice.eth") -> bytes32
pub fn namehash(name: &str) -> [u8; 32] {
    let mut node = [0u8; 32];

    if name.is_empty() {
        return node;
    }

    for label in name.rsplit('.') {
        let label_hash = keccak256(label.as_bytes());
        let mut combined = [0u8; 64];
        combined[..32].copy_from_slice(&node);
        combined[32..].copy_from_slice(&label_hash);
        node = keccak256(combined);
    }

    node
}

/// keccak256 of a single label
pub fn labelhash(label: &str) -> [u8; 32] {
    keccak256(label.as_bytes())
}

/// Propose registrable labels for a replica from its display name and
/// expertise tags.
pub fn suggest_names(base: &str, expertise: &[String]) -> Vec<String> {
    let clean = clean_label(base);
    if clean.is_empty() {
        return Vec::new();
    }

    let mut candidates = vec![
        clean.clone(),
        format!("{}ai", clean),
        format!("{}sensei", clean),
    ];

    for skill in expertise {
        let skill = clean_label(skill);
        if skill.is_empty() {
            continue;
        }
        candidates.push(format!("{}{}", clean, skill));
        candidates.push(format!("{}{}", skill, clean));
    }

    let mut suggestions: Vec<String> = Vec::new();
    for candidate in candidates {
        if validate_name(&candidate).is_ok() && !suggestions.contains(&candidate) {
            suggestions.push(candidate);
        }
        if suggestions.len() == MAX_SUGGESTIONS {
            break;
        }
    }
    suggestions
}

fn clean_label(input: &str) -> String {
    input
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name_length_bounds() {
        assert!(validate_name("ab").is_err());
        assert!(validate_name("abc").is_ok());
        assert!(validate_name(&"a".repeat(63)).is_ok());
        assert!(validate_name(&"a".repeat(64)).is_err());
        assert!(matches!(validate_name(""), Err(EnsError::Validation(_))));
    }

    #[test]
    fn test_validate_name_charset() {
        assert!(validate_name("alice-sensei-42").is_ok());
        assert!(validate_name("Alice").is_err());
        assert!(validate_name("alice_bob").is_err());
        assert!(validate_name("alice.eth").is_err());
        assert!(validate_name("ålice").is_err());
    }

    #[test]
    fn test_validate_name_hyphen_edges() {
        assert!(validate_name("-alice").is_err());
        assert!(validate_name("alice-").is_err());
        assert!(validate_name("a-b").is_ok());
    }

    #[test]
    fn test_normalize_label() {
        assert_eq!(normalize_label("alicesensei.eth").unwrap(), "alicesensei");
        assert_eq!(normalize_label(" alicesensei ").unwrap(), "alicesensei");
        assert!(normalize_label("ab.eth").is_err());
    }

    #[test]
    fn test_format_name() {
        assert_eq!(format_name("alice"), "alice.eth");
        assert_eq!(format_name("alice.eth"), "alice.eth");
    }

    #[test]
    fn test_namehash_eth() {
        let hash = namehash("eth");
        let expected =
            hex::decode("93cdeb708b7545dc668eb9280176169d1c33cfd8ed6f04690a0bcc88a93fc4ae").unwrap();
        assert_eq!(hash.to_vec(), expected);
    }

    #[test]
    fn test_namehash_vitalik_eth() {
        let hash = namehash("vitalik.eth");
        let expected =
            hex::decode("ee6c4522aab0003e8d14cd40a6af439055fd2577951148c14b6cea9a53475835").unwrap();
        assert_eq!(hash.to_vec(), expected);
    }

    #[test]
    fn test_namehash_empty_is_zero() {
        assert_eq!(namehash(""), [0u8; 32]);
    }

    #[test]
    fn test_labelhash() {
        let hash = labelhash("vitalik");
        let expected =
            hex::decode("af2caa1c2ca1d027f1ac823b529d0a67cd144264b2789fa2ea4d63a67c7103cc").unwrap();
        assert_eq!(hash.to_vec(), expected);
    }

    #[test]
    fn test_suggest_names() {
        let suggestions = suggest_names("Alice Smith!", &["Rust".to_string(), "ML".to_string()]);
        assert_eq!(suggestions[0], "alicesmith");
        assert_eq!(suggestions[1], "alicesmithai");
        assert_eq!(suggestions[2], "alicesmithsensei");
        assert!(suggestions.contains(&"alicesmithrust".to_string()));
        assert!(suggestions.contains(&"mlalicesmith".to_string()));
        assert!(suggestions.len() <= 8);
        assert!(suggestions.iter().all(|s| validate_name(s).is_ok()));
    }

    #[test]
    fn test_suggest_names_caps_and_dedupes() {
        let skills: Vec<String> = (0..10).map(|i| format!("s{}", i)).collect();
        let suggestions = suggest_names("bob", &skills);
        assert_eq!(suggestions.len(), 8);

        let suggestions = suggest_names("bob", &["bob".to_string()]);
        assert_eq!(suggestions, vec!["bob", "bobai", "bobsensei", "bobbob"]);
    }

    #[test]
    fn test_suggest_names_empty_base() {
        assert!(suggest_names("!!!", &[]).is_empty());
    }
}
