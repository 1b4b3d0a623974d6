use chrono::NaiveDate;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%B %d, %Y", "%b %d, %Y"];

const EMPTY_LIST_MARKERS: &[&str] = &["", "none", "n/a", "-"];

/// Upper bound of every number found in a token estimate.
///
/// `~2550`, `2,550`, `2000-3000`, `1.5k`, `about 1200 tokens` are all
/// accepted. Fractions round up. Returns `None` when no number is present.
pub(crate) fn token_budget(value: &str) -> Option<usize> {
    let bytes = value.as_bytes();
    let mut i = 0;
    let mut upper: Option<usize> = None;

    while i < bytes.len() {
        if !bytes[i].is_ascii_digit() {
            i += 1;
            continue;
        }

        let mut literal = String::new();
        while i < bytes.len() {
            let b = bytes[i];
            if b.is_ascii_digit() {
                literal.push(b as char);
                i += 1;
            } else if b == b',' && is_thousands_group(bytes, i + 1) {
                i += 1;
            } else {
                break;
            }
        }

        if i + 1 < bytes.len() && bytes[i] == b'.' && bytes[i + 1].is_ascii_digit() {
            literal.push('.');
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                literal.push(bytes[i] as char);
                i += 1;
            }
        }

        let mut thousands = false;
        if i < bytes.len()
            && (bytes[i] == b'k' || bytes[i] == b'K')
            && bytes.get(i + 1).map_or(true, |b| !b.is_ascii_alphabetic())
        {
            thousands = true;
            i += 1;
        }

        let tokens = if !thousands && !literal.contains('.') {
            // Plain integers are exact; out of range is unusable
            literal.parse::<usize>().ok()?
        } else {
            let Ok(number) = literal.parse::<f64>() else {
                continue;
            };
            let multiplier = if thousands { 1000.0 } else { 1.0 };
            let scaled = (number * multiplier).ceil();
            if !scaled.is_finite() || scaled >= usize::MAX as f64 {
                return None;
            }
            scaled as usize
        };
        upper = Some(upper.map_or(tokens, |u| u.max(tokens)));
    }

    upper
}

// `,` followed by exactly three digits
fn is_thousands_group(bytes: &[u8], start: usize) -> bool {
    let group = bytes.get(start..start + 3);
    let after = bytes.get(start + 3);
    matches!(group, Some(g) if g.iter().all(u8::is_ascii_digit))
        && after.map_or(true, |b| !b.is_ascii_digit())
}

pub(crate) fn date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}

/// True when a list value spells out "nothing".
pub(crate) fn is_empty_list(value: &str) -> bool {
    let lowered = value.trim().to_lowercase();
    EMPTY_LIST_MARKERS.contains(&lowered.as_str())
}

/// Comma-separated entries with any parenthetical note dropped.
/// `"a (for scripts), b"` yields `["a", "b"]`. Empty entries are kept.
pub(crate) fn id_list(value: &str) -> Vec<&str> {
    value
        .split(',')
        .map(|entry| match entry.find('(') {
            Some(paren) => entry[..paren].trim(),
            None => entry.trim(),
        })
        .collect()
}

pub(crate) fn keyword_list(value: &str) -> impl Iterator<Item = String> + '_ {
    value
        .split(',')
        .map(|k| k.trim().trim_matches('`').trim().to_lowercase())
        .filter(|k| !k.is_empty())
}
