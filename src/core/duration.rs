use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unrecognized duration text: {text:?}")]
pub struct ValidationError {
    pub text: String,
}

/// Hours and/or minutes separated by spaces or tabs only, so a record
/// always stays on one log line.
static DURATION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:(\d+)[ \t]*(?:hours?|hrs?))?[ \t]*(?:(\d+)[ \t]*mins?)?$").unwrap()
});

/// Parses provider duration text such as "23 mins" or "1 hour 5 mins" into
/// whole minutes.
pub fn parse_minutes(text: &str) -> Result<u32, ValidationError> {
    let invalid = || ValidationError {
        text: text.to_string(),
    };

    let trimmed = text.trim();
    let captures = DURATION_REGEX.captures(trimmed).ok_or_else(invalid)?;

    let hours = captures.get(1).map(|m| m.as_str().parse::<u32>());
    let minutes = captures.get(2).map(|m| m.as_str().parse::<u32>());

    match (hours, minutes) {
        (None, None) => Err(invalid()),
        (hours, minutes) => {
            let hours = hours.transpose().map_err(|_| invalid())?.unwrap_or(0);
            let minutes = minutes.transpose().map_err(|_| invalid())?.unwrap_or(0);
            hours
                .checked_mul(60)
                .and_then(|h| h.checked_add(minutes))
                .ok_or_else(invalid)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minutes() {
        assert_eq!(parse_minutes("23 mins"), Ok(23));
        assert_eq!(parse_minutes("1 min"), Ok(1));
        assert_eq!(parse_minutes("  45 mins "), Ok(45));
    }

    #[test]
    fn test_parse_hours_and_minutes() {
        assert_eq!(parse_minutes("1 hour 5 mins"), Ok(65));
        assert_eq!(parse_minutes("2 hours"), Ok(120));
        assert_eq!(parse_minutes("1 Hour 1 Min"), Ok(61));
    }

    #[test]
    fn test_rejects_malformed_text() {
        for text in ["N/A", "", "mins", "23", "Unavailable", "23 secs"] {
            let err = parse_minutes(text).unwrap_err();
            assert_eq!(err.text, text);
        }
    }

    #[test]
    fn test_rejects_embedded_line_breaks() {
        for text in ["23\nmins", "23\r\nmins", "1 hour\n5 mins"] {
            assert!(parse_minutes(text).is_err(), "{text:?}");
        }
        assert_eq!(parse_minutes("1 hour\t5 mins"), Ok(65));
        assert_eq!(parse_minutes("23 mins\n"), Ok(23));
    }

    #[test]
    fn test_rejects_overflow() {
        assert!(parse_minutes("99999999999 mins").is_err());
    }
}
