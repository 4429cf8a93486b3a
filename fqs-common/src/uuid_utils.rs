//! Scan identifier utilities

use uuid::Uuid;

/// Generate a new scan identifier (UUIDv4)
pub fn generate() -> Uuid {
    Uuid::new_v4()
}

/// Parse a scan identifier from a path segment
///
/// Accepts hyphenated and simple forms; rejects anything else so that
/// arbitrary strings never reach a query.
pub fn parse(s: &str) -> Result<Uuid, uuid::Error> {
    Uuid::parse_str(s.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_v4() {
        let id = generate();
        assert_eq!(id.get_version_num(), 4);
    }

    #[test]
    fn test_parse_roundtrip_and_reject() {
        let id = generate();
        assert_eq!(parse(&id.to_string()).unwrap(), id);
        assert!(parse("not-a-uuid").is_err());
        assert!(parse("../etc/passwd").is_err());
    }
}
