//! Object key generation and key formatting helpers.

use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};

/// Issues upload keys of the form `{millis}-{filename}`.
///
/// The millisecond prefix is strictly increasing for a given generator, so two
/// uploads with the same filename never share a key even inside one millisecond.
#[derive(Debug, Default)]
pub struct KeyGenerator {
    last: AtomicI64,
}

impl KeyGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next key for `filename`, or `None` if nothing usable is left of the name.
    pub fn next_key(&self, filename: &str) -> Option<String> {
        let name = sanitize_filename(filename)?;
        Some(format!("{}-{name}", self.next_stamp()))
    }

    fn next_stamp(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let previous = self
            .last
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        now.max(previous + 1)
    }
}

/// Reduce a user-supplied filename to a single safe key segment.
pub fn sanitize_filename(filename: &str) -> Option<String> {
    let last = filename
        .rsplit(['/', '\\'])
        .find(|part| !part.trim().is_empty())?
        .trim();
    if last == "." || last == ".." {
        return None;
    }
    let cleaned: String = last
        .chars()
        .map(|c| if c.is_control() { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() { None } else { Some(cleaned) }
}

/// Original filename of an upload key (`1718000000000-invoice.pdf` -> `invoice.pdf`).
/// Keys that were not produced by [`KeyGenerator`] are returned unchanged.
pub fn display_name(key: &str) -> &str {
    match key.split_once('-') {
        Some((stamp, rest))
            if !stamp.is_empty() && !rest.is_empty() && stamp.bytes().all(|b| b.is_ascii_digit()) =>
        {
            rest
        }
        _ => key,
    }
}

/// Percent-encode a key for use in a URL path, keeping `/` separators.
pub fn encode_key_path(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

/// Join a base URL and a key without doubling slashes.
pub fn join_url(base: &str, key: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        encode_key_path(key.trim_start_matches('/'))
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn same_filename_gets_distinct_keys() {
        let keys = KeyGenerator::new();
        let a = keys.next_key("invoice.pdf").unwrap();
        let b = keys.next_key("invoice.pdf").unwrap();
        assert_ne!(a, b);
        assert!(a.ends_with("-invoice.pdf"));
        assert!(b.ends_with("-invoice.pdf"));
    }

    #[test]
    fn stamps_strictly_increase() {
        let keys = KeyGenerator::new();
        let stamps: Vec<i64> = (0..1000).map(|_| keys.next_stamp()).collect();
        assert!(stamps.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn concurrent_generation_never_collides() {
        let keys = std::sync::Arc::new(KeyGenerator::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let keys = keys.clone();
                std::thread::spawn(move || {
                    (0..250)
                        .map(|_| keys.next_key("scan.png").unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        let mut seen = HashSet::new();
        for handle in handles {
            for key in handle.join().unwrap() {
                assert!(seen.insert(key));
            }
        }
        assert_eq!(seen.len(), 1000);
    }

    #[test]
    fn sanitize_keeps_last_component() {
        assert_eq!(sanitize_filename("C:\\scans\\bill.pdf").as_deref(), Some("bill.pdf"));
        assert_eq!(sanitize_filename("../../etc/passwd").as_deref(), Some("passwd"));
        assert_eq!(sanitize_filename("tab\there.pdf").as_deref(), Some("tab_here.pdf"));
        assert_eq!(sanitize_filename(".hidden.pdf").as_deref(), Some("hidden.pdf"));
        assert_eq!(sanitize_filename(".."), None);
        assert_eq!(sanitize_filename("  "), None);
    }

    #[test]
    fn display_name_strips_stamp() {
        assert_eq!(display_name("1718000000000-invoice.pdf"), "invoice.pdf");
        assert_eq!(display_name("1718000000000-INV-2024-001.pdf"), "INV-2024-001.pdf");
        assert_eq!(display_name("INV-2024-001.pdf"), "INV-2024-001.pdf");
        assert_eq!(display_name("plain.pdf"), "plain.pdf");
    }

    #[test]
    fn url_encoding() {
        assert_eq!(encode_key_path("1-My Invoice#2.pdf"), "1-My%20Invoice%232.pdf");
        assert_eq!(
            join_url("https://cdn.example.com/docs/", "a/b c.pdf"),
            "https://cdn.example.com/docs/a/b%20c.pdf"
        );
    }
}
