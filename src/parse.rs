use regex::Regex;
use tracing::warn;

/// Parse a bedroom count from strings like "2 BR" or "3 Bedroom".
/// Defaults to 1 when the leading token is not an integer.
pub fn parse_bedrooms(text: &str) -> u32 {
    text.split_whitespace()
        .next()
        .and_then(|token| token.parse::<u32>().ok())
        .unwrap_or(1)
}

/// Parse a bathroom count from strings like "2", "2.5" or "1.5-2".
/// Takes the integer-or-decimal token before a range separator and
/// truncates it. Defaults to 1 on any failure.
pub fn parse_bathrooms(text: &str) -> u32 {
    text.split('-')
        .next()
        .and_then(|token| token.trim().parse::<f64>().ok())
        .map(|n| n as u32)
        .unwrap_or(1)
}

/// Parse a dollar price from strings like "$1,234-$1,500" or "$760".
/// Strips thousands separators and a leading currency symbol, then takes
/// the token before a range separator. Defaults to 0 on any failure; a 0
/// price is a present value downstream, not an unset field.
pub fn parse_price(text: &str) -> i64 {
    let cleaned = text.replace(',', "");
    let cleaned = cleaned.strip_prefix('$').unwrap_or(&cleaned);
    cleaned
        .split('-')
        .next()
        .and_then(|token| token.trim().parse::<i64>().ok())
        .unwrap_or(0)
}

/// Parse a JSM size string of the form "Size: {bed-spec}/{bath-spec}",
/// e.g. "Size: 4 Bedrooms/ 2 Baths" or "Size: Efficiency/ 1 Baths".
/// Returns (bedrooms, bathrooms).
pub fn parse_size(text: &str) -> (u32, u32) {
    let re = Regex::new(r"^Size:\s*(.+?)/\s*(.+)$").unwrap();
    let text = text.trim();

    if let Some(captures) = re.captures(text) {
        let bed_spec = captures.get(1).map_or("", |m| m.as_str()).trim();
        let bath_spec = captures.get(2).map_or("", |m| m.as_str()).trim();

        let bedrooms = if bed_spec == "Efficiency" {
            1
        } else {
            leading_int_before(bed_spec, "Bedrooms").unwrap_or(1)
        };
        let bathrooms = leading_int_before(bath_spec, "Baths").unwrap_or(1);
        return (bedrooms, bathrooms);
    }

    // The two-part pattern did not match at all.
    if text.contains("Efficiency") {
        return (1, 1);
    }
    warn!(size = text, "failed to parse size string");
    (1, 1)
}

/// Leading integer of a string like "4 Bedrooms" or "2 Baths", checked
/// against the expected suffix word.
fn leading_int_before(text: &str, suffix: &str) -> Option<u32> {
    let re = Regex::new(&format!(r"^(\d+)\s*{}", regex::escape(suffix))).unwrap();
    re.captures(text)?.get(1)?.as_str().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bedrooms_from_br_string() {
        assert_eq!(parse_bedrooms("2 BR"), 2);
        assert_eq!(parse_bedrooms("abc BR"), 1);
        // Idempotent on canonical input.
        assert_eq!(parse_bedrooms("2"), 2);
    }

    #[test]
    fn bathrooms_take_token_before_range() {
        assert_eq!(parse_bathrooms("2"), 2);
        assert_eq!(parse_bathrooms("2.5-3"), 2);
        assert_eq!(parse_bathrooms("1.5"), 1);
        assert_eq!(parse_bathrooms("shared"), 1);
    }

    #[test]
    fn price_strips_separators_and_range() {
        assert_eq!(parse_price("$1,234-$1,500"), 1234);
        assert_eq!(parse_price("$760"), 760);
        assert_eq!(parse_price("$bad"), 0);
        assert_eq!(parse_price("1234"), 1234);
        assert_eq!(parse_price("$0"), 0);
    }

    #[test]
    fn size_two_part_pattern() {
        assert_eq!(parse_size("Size: 4 Bedrooms/ 2 Baths"), (4, 2));
        assert_eq!(parse_size("Size: Efficiency/ 1 Baths"), (1, 1));
        assert_eq!(parse_size("Size: lofted Bedrooms/ 1 Baths"), (1, 1));
    }

    #[test]
    fn size_fallback_paths() {
        assert_eq!(parse_size("Size: Efficiency"), (1, 1));
        assert_eq!(parse_size("garbage"), (1, 1));
    }
}
