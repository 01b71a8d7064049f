use chrono::{DateTime, Utc};

pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

/// Coarse relative time, e.g. `3 mins ago`.
pub fn format_age(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - at).num_seconds();
    if secs < 0 {
        return "just now".to_string();
    }

    let (value, unit) = match secs {
        0..60 => return "just now".to_string(),
        60..3_600 => (secs / 60, "min"),
        3_600..86_400 => (secs / 3_600, "hour"),
        _ => (secs / 86_400, "day"),
    };
    let plural = if value == 1 { "" } else { "s" };
    format!("{value} {unit}{plural} ago")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(5 * 1024), "5.0 KB");
        assert_eq!(format_bytes(10 * 1024 * 1024), "10.0 MB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024 / 2), "1.5 GB");
    }

    #[test]
    fn ages() {
        let now = Utc::now();
        assert_eq!(format_age(now - Duration::seconds(5), now), "just now");
        assert_eq!(format_age(now + Duration::seconds(5), now), "just now");
        assert_eq!(format_age(now - Duration::seconds(60), now), "1 min ago");
        assert_eq!(format_age(now - Duration::minutes(59), now), "59 mins ago");
        assert_eq!(format_age(now - Duration::hours(2), now), "2 hours ago");
        assert_eq!(format_age(now - Duration::days(1), now), "1 day ago");
    }
}
