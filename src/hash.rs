pub const FINGERPRINT_HEX_LEN: usize = 16;

/// Short blake3 fingerprint used to detect concurrent modification of a source file.
pub fn source_fingerprint(text: &str) -> String {
    let full_hex = blake3::hash(text.as_bytes()).to_hex();
    full_hex[..FINGERPRINT_HEX_LEN].to_string()
}

#[cfg(test)]
mod tests {
    use super::{FINGERPRINT_HEX_LEN, source_fingerprint};

    #[test]
    fn fingerprint_is_stable_and_fixed_width() {
        let first = source_fingerprint("class FooTest {}");
        let second = source_fingerprint("class FooTest {}");
        assert_eq!(first, second);
        assert_eq!(first.len(), FINGERPRINT_HEX_LEN);
        assert!(first.chars().all(|character| character.is_ascii_hexdigit()));
    }

    #[test]
    fn fingerprint_changes_with_whitespace() {
        assert_ne!(
            source_fingerprint("class FooTest {}"),
            source_fingerprint("class FooTest {}\n"),
            "whitespace-only edits must still be detected"
        );
    }
}
