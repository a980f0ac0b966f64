use once_cell::sync::Lazy;
use regex::Regex;

pub fn is_valid_hex_color(string: &str) -> Result<(), String> {
    static RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").unwrap());
    match RE.is_match(string) {
        true => Ok(()),
        false => Err("color must look like #1e3a5f".to_string()),
    }
}

/// Times are stored as display strings, e.g. "6:00 PM".
pub fn is_valid_game_time(string: &str) -> Result<(), String> {
    static RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^(1[0-2]|[1-9]):[0-5][0-9] (AM|PM)$").unwrap());
    match RE.is_match(string) {
        true => Ok(()),
        false => Err("time should look like 6:00 PM".to_string()),
    }
}

pub fn is_valid_pin(string: &str) -> Result<(), String> {
    match string.len() >= 4 && string.chars().all(|c| c.is_ascii_digit()) {
        true => Ok(()),
        false => Err("PIN must be at least 4 digits".to_string()),
    }
}

pub fn is_valid_short_code(string: &str) -> Result<(), String> {
    let cmp = !string.is_empty()
        && string.chars().count() <= 3
        && string.chars().all(|c| c.is_ascii_alphanumeric());

    match cmp {
        true => Ok(()),
        false => Err("short code must be 1-3 letters or digits".to_string()),
    }
}

#[cfg(test)]
#[test]
fn test_game_time() {
    assert!(is_valid_game_time("6:00 PM").is_ok());
    assert!(is_valid_game_time("11:45 AM").is_ok());
    assert!(is_valid_game_time("13:00 PM").is_err());
    assert!(is_valid_game_time("6pm").is_err());
}

#[cfg(test)]
#[test]
fn test_hex_color() {
    assert!(is_valid_hex_color("#1e3a5f").is_ok());
    assert!(is_valid_hex_color("1e3a5f").is_err());
    assert!(is_valid_hex_color("#1e3a5").is_err());
}

#[cfg(test)]
#[test]
fn test_pin() {
    assert!(is_valid_pin("1234").is_ok());
    assert!(is_valid_pin("24680").is_ok());
    assert!(is_valid_pin("123").is_err());
    assert!(is_valid_pin("abcd").is_err());
}
