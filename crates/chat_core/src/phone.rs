/// Country calling codes recognized by the display-name policy, keyed by
/// E.164 prefix. Longest prefix wins.
const CALLING_CODES: &[(&str, &str)] = &[
    ("1", "US"),
    ("7", "RU"),
    ("20", "EG"),
    ("27", "ZA"),
    ("30", "GR"),
    ("31", "NL"),
    ("33", "FR"),
    ("34", "ES"),
    ("39", "IT"),
    ("44", "GB"),
    ("49", "DE"),
    ("52", "MX"),
    ("55", "BR"),
    ("61", "AU"),
    ("62", "ID"),
    ("63", "PH"),
    ("65", "SG"),
    ("66", "TH"),
    ("81", "JP"),
    ("82", "KR"),
    ("84", "VN"),
    ("86", "CN"),
    ("90", "TR"),
    ("91", "IN"),
    ("852", "HK"),
    ("886", "TW"),
    ("971", "AE"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedNumber {
    pub national: String,
    pub region: &'static str,
}

/// Normalizes a phone-number-shaped author identity into a national-format
/// display string plus its region code. Returns `None` for anything that is
/// not a plausible E.164 number, in which case callers fall back to the raw
/// author string.
pub fn format_author(raw: &str) -> Option<FormattedNumber> {
    let digits = raw.trim().strip_prefix('+')?;
    if digits.len() < 8 || digits.len() > 15 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let (code, region) = CALLING_CODES
        .iter()
        .filter(|(code, _)| digits.starts_with(code))
        .max_by_key(|(code, _)| code.len())
        .copied()?;
    let subscriber = &digits[code.len()..];
    if subscriber.is_empty() {
        return None;
    }

    // NANP numbers carry no trunk prefix; everywhere else the national
    // form re-adds the leading zero dropped by E.164.
    let national = if code == "1" {
        hyphenate(subscriber)
    } else {
        hyphenate(&format!("0{subscriber}"))
    };

    Some(FormattedNumber { national, region })
}

fn hyphenate(digits: &str) -> String {
    match digits.len() {
        11 => format!("{}-{}-{}", &digits[..3], &digits[3..7], &digits[7..]),
        10 => format!("{}-{}-{}", &digits[..3], &digits[3..6], &digits[6..]),
        9 => format!("{}-{}-{}", &digits[..2], &digits[2..5], &digits[5..]),
        _ => digits.to_string(),
    }
}

#[cfg(test)]
#[path = "tests/phone_tests.rs"]
mod tests;
