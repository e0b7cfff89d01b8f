//! Typed release event parsed from the hook's positional arguments.

use url::Url;

use crate::error::{NotifyError, Result};

/// Number of positional arguments the hook contract requires.
pub const EVENT_ARG_COUNT: usize = 5;

/// Event class label attached to every release event.
pub const EVENT_KIND: &str = "Torrent";

/// One completed download, validated field by field before any sink I/O.
///
/// Construction is all-or-nothing: a value of this type always satisfies
/// every field constraint.
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseEvent {
    /// Release display name as reported by the daemon.
    pub name: String,
    /// 40 lowercase hex characters.
    pub info_hash: String,
    /// Download category label.
    pub category: String,
    /// Release size in bytes, strictly positive.
    pub size_bytes: u64,
    /// Announce URL of the source indexer.
    pub indexer: Url,
    /// Fixed event class, see [`EVENT_KIND`].
    pub kind: &'static str,
}

impl ReleaseEvent {
    /// Parse and validate the raw positional arguments
    /// `name info_hash category size indexer`.
    ///
    /// An argument-count mismatch is reported before any field is looked at.
    pub fn from_args(args: &[String]) -> Result<Self> {
        if args.len() != EVENT_ARG_COUNT {
            return Err(NotifyError::ArgumentCount {
                expected: EVENT_ARG_COUNT,
                got: args.len(),
            });
        }

        let name = args[0].trim();
        if name.is_empty() {
            return Err(NotifyError::validation("name", "must not be empty"));
        }

        let info_hash = parse_info_hash(&args[1])?;

        let category = args[2].trim();
        if category.is_empty() {
            return Err(NotifyError::validation("category", "must not be empty"));
        }

        let size_bytes = parse_size(args[3].trim())?;
        let indexer = parse_indexer(args[4].trim())?;

        Ok(Self {
            name: name.to_string(),
            info_hash,
            category: category.to_string(),
            size_bytes,
            indexer,
            kind: EVENT_KIND,
        })
    }

    /// Display name with the trailing `.torrent` suffix stripped.
    pub fn display_name(&self) -> &str {
        self.name.strip_suffix(".torrent").unwrap_or(&self.name)
    }

    /// Hostname of the indexer URL.
    pub fn indexer_host(&self) -> &str {
        self.indexer.host_str().unwrap_or_default()
    }
}

fn parse_info_hash(raw: &str) -> Result<String> {
    let hash = raw.trim().to_ascii_lowercase();
    if hash.len() != 40 {
        return Err(NotifyError::validation(
            "info_hash",
            format!("expected 40 characters, got {}", hash.len()),
        ));
    }
    if !hash.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(NotifyError::validation(
            "info_hash",
            "contains non-hexadecimal characters",
        ));
    }
    Ok(hash)
}

fn parse_size(raw: &str) -> Result<u64> {
    let size: i64 = raw
        .parse()
        .map_err(|_| NotifyError::validation("size", format!("not a base-10 integer: `{raw}`")))?;
    if size <= 0 {
        return Err(NotifyError::validation(
            "size",
            format!("must be positive, got {size}"),
        ));
    }
    Ok(size as u64)
}

fn parse_indexer(raw: &str) -> Result<Url> {
    let url =
        Url::parse(raw).map_err(|e| NotifyError::invalid_url(raw, e.to_string()))?;
    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(NotifyError::invalid_url(
                raw,
                format!("unsupported scheme `{other}`"),
            ));
        }
    }
    if url.host_str().is_none() {
        return Err(NotifyError::invalid_url(raw, "missing host"));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_args() -> Vec<String> {
        vec![
            "Show.S01E01.mkv.torrent".to_string(),
            "AABBCCDDEEFF00112233445566778899AABBCCDD".to_string(),
            "tv".to_string(),
            "1073741824".to_string(),
            "https://indexer.example/ann".to_string(),
        ]
    }

    #[test]
    fn valid_event_is_normalized() {
        let event = ReleaseEvent::from_args(&valid_args()).unwrap();
        assert_eq!(event.info_hash, "aabbccddeeff00112233445566778899aabbccdd");
        assert_eq!(event.display_name(), "Show.S01E01.mkv");
        assert_eq!(event.indexer_host(), "indexer.example");
        assert_eq!(event.size_bytes, 1_073_741_824);
        assert_eq!(event.kind, "Torrent");
    }

    #[test]
    fn fields_are_trimmed() {
        let mut args = valid_args();
        args[0] = "  name  ".to_string();
        args[2] = " tv ".to_string();
        let event = ReleaseEvent::from_args(&args).unwrap();
        assert_eq!(event.name, "name");
        assert_eq!(event.category, "tv");
    }

    #[test]
    fn argument_count_is_checked_first() {
        let err = ReleaseEvent::from_args(&valid_args()[..3]).unwrap_err();
        assert!(matches!(
            err,
            NotifyError::ArgumentCount {
                expected: 5,
                got: 3
            }
        ));
    }

    #[test]
    fn info_hash_length_and_alphabet() {
        let mut args = valid_args();
        args[1] = "abc123".to_string();
        assert!(ReleaseEvent::from_args(&args).is_err());

        args[1] = "g".repeat(40);
        assert!(ReleaseEvent::from_args(&args).is_err());

        args[1] = "0123456789abcdefABCDEF0123456789abcdef01".to_string();
        let event = ReleaseEvent::from_args(&args).unwrap();
        assert_eq!(event.info_hash, "0123456789abcdefabcdef0123456789abcdef01");
    }

    #[test]
    fn size_rejects_zero_negative_and_garbage() {
        for bad in ["0", "-5", "abc"] {
            let mut args = valid_args();
            args[3] = bad.to_string();
            let err = ReleaseEvent::from_args(&args).unwrap_err();
            assert!(
                matches!(err, NotifyError::Validation { field: "size", .. }),
                "`{bad}` should fail size validation, got {err}"
            );
        }
    }

    #[test]
    fn size_failure_reasons_are_distinguishable() {
        let malformed = parse_size("abc").unwrap_err().to_string();
        let non_positive = parse_size("-5").unwrap_err().to_string();
        assert!(malformed.contains("base-10"));
        assert!(non_positive.contains("positive"));
    }

    #[test]
    fn indexer_requires_http_scheme_and_host() {
        let mut args = valid_args();
        args[4] = "ftp://indexer.example/ann".to_string();
        assert!(ReleaseEvent::from_args(&args).is_err());

        args[4] = "not a url".to_string();
        assert!(ReleaseEvent::from_args(&args).is_err());

        args[4] = "http://indexer.example".to_string();
        assert!(ReleaseEvent::from_args(&args).is_ok());
    }

    #[test]
    fn display_name_only_strips_torrent_suffix() {
        let mut args = valid_args();
        args[0] = "archive.tar.gz".to_string();
        let event = ReleaseEvent::from_args(&args).unwrap();
        assert_eq!(event.display_name(), "archive.tar.gz");
        assert_eq!(event.name, "archive.tar.gz");
    }
}
