use chrono::Utc;

/// Current Unix time in seconds.
pub fn unix_now() -> i64 {
    Utc::now().timestamp()
}

/// Split a comma-separated list, dropping blanks.
pub fn parse_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .map(|p| p.to_string())
        .collect()
}

/// Loose check used to route `get_user_info` to `users.lookupByEmail`.
pub fn looks_like_email(s: &str) -> bool {
    match s.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.'),
        None => false,
    }
}

/// Strip Slack mention wrapping (`<@U123>`, `<#C123|name>`).
pub fn normalize_id(s: &str) -> String {
    let t = s.trim();
    let t = t
        .strip_prefix("<@")
        .or_else(|| t.strip_prefix("<#"))
        .and_then(|rest| rest.strip_suffix('>'))
        .map(|inner| inner.split('|').next().unwrap_or(inner))
        .unwrap_or(t);
    t.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_drops_blanks() {
        assert_eq!(parse_csv(" a, ,b ,"), vec!["a".to_string(), "b".to_string()]);
        assert!(parse_csv(" , ").is_empty());
    }

    #[test]
    fn email_detection() {
        assert!(looks_like_email("ann@example.com"));
        assert!(!looks_like_email("U123"));
        assert!(!looks_like_email("@ann"));
    }

    #[test]
    fn normalizes_mentions() {
        assert_eq!(normalize_id("<@U123>"), "U123");
        assert_eq!(normalize_id("<#C1|general>"), "C1");
        assert_eq!(normalize_id(" C9 "), "C9");
        assert_eq!(normalize_id("#general"), "#general");
    }
}
