// Splits a rule document into its metadata header lines and its body.
// Nothing here interprets field values; see parser.rs.

const BREAK: &str = "---";
const MAX_KEY_WORDS: usize = 4;

pub(crate) struct SplitDocument<'a> {
    pub header: Vec<&'a str>,
    pub body: &'a str,
}

/// A `Key: value` line from the header, with the key normalized.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct FieldLine<'a> {
    pub key: String,
    pub label: &'a str,
    pub value: &'a str,
}

pub(crate) fn split(text: &str) -> SplitDocument<'_> {
    // (line without terminator, byte offset just past the line)
    let mut lines: Vec<(&str, usize)> = Vec::new();
    let mut offset = 0;
    for raw in text.split_inclusive('\n') {
        offset += raw.len();
        lines.push((raw.trim_end_matches(['\n', '\r']), offset));
    }

    let is_break = |line: &str| line.trim() == BREAK;

    let first = lines.iter().position(|(l, _)| !l.trim().is_empty());

    // Front matter: the document opens with `---`
    if let Some(first) = first {
        if is_break(lines[first].0) {
            let close = lines
                .iter()
                .enumerate()
                .skip(first + 1)
                .find(|(_, (l, _))| is_break(l))
                .map(|(i, _)| i);

            return match close {
                Some(close) => SplitDocument {
                    header: lines[first + 1..close].iter().map(|(l, _)| *l).collect(),
                    body: trim_body(&text[lines[close].1..]),
                },
                None => SplitDocument {
                    header: lines[first + 1..].iter().map(|(l, _)| *l).collect(),
                    body: "",
                },
            };
        }
    }

    // Header ends at the first thematic break
    if let Some(brk) = lines.iter().position(|(l, _)| is_break(l)) {
        return SplitDocument {
            header: lines[..brk].iter().map(|(l, _)| *l).collect(),
            body: trim_body(&text[lines[brk].1..]),
        };
    }

    // No break: the leading run of blank, heading, and field lines
    let end = lines
        .iter()
        .position(|(l, _)| {
            let t = l.trim();
            !(t.is_empty() || t.starts_with('#') || parse_field(l).is_some())
        })
        .unwrap_or(lines.len());

    let body_start = if end == 0 { 0 } else { lines[end - 1].1 };

    SplitDocument {
        header: lines[..end].iter().map(|(l, _)| *l).collect(),
        body: trim_body(&text[body_start..]),
    }
}

fn trim_body(body: &str) -> &str {
    body.trim_matches(['\n', '\r'])
}

/// Recognizes `**Key:** value`, `**Key**: value`, and `Key: value`,
/// optionally behind a `-` or `*` list marker.
pub(crate) fn parse_field(line: &str) -> Option<FieldLine<'_>> {
    let mut s = line.trim();
    if let Some(rest) = s.strip_prefix("- ").or_else(|| s.strip_prefix("* ")) {
        s = rest.trim_start();
    }
    if s.starts_with('#') {
        return None;
    }

    let colon = s.find(':')?;
    let label = s[..colon].trim().trim_matches('*').trim();

    if label.is_empty()
        || label.split_whitespace().count() > MAX_KEY_WORDS
        || !label
            .chars()
            .all(|c| c.is_alphanumeric() || c == ' ' || c == '_' || c == '-')
    {
        return None;
    }

    let value = s[colon + 1..].trim_start().trim_start_matches('*').trim();

    Some(FieldLine {
        key: normalize_key(label),
        label,
        value,
    })
}

fn normalize_key(label: &str) -> String {
    label
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}
