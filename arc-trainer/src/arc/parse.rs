//! Pull a grid out of a free-text model reply

use super::grid::Grid;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static RE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[a-zA-Z]*\s*(.*?)```").expect("valid fence pattern"));

// One row of digits, optionally bracketed and separated by spaces or commas
static RE_DIGIT_ROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\[?\s*([0-9](?:[\s,]*[0-9])*)\s*\]?,?\s*$").expect("valid digit row pattern")
});

/// Find a grid in a reply
///
/// Fenced blocks are tried first, then the whole text. Within each candidate
/// a JSON array of arrays (or an object carrying `output`/`grid`) wins; rows
/// of digits are the fallback.
pub fn parse_grid_reply(text: &str) -> Option<Grid> {
    let fenced = RE_FENCE
        .captures_iter(text)
        .filter_map(|c| c.get(1).map(|m| m.as_str()));

    for candidate in fenced.chain(std::iter::once(text)) {
        if let Some(grid) = find_json_grid(candidate) {
            return Some(grid);
        }
    }
    find_digit_rows(text)
}

fn grid_from_value(value: &Value) -> Option<Grid> {
    match value {
        Value::Array(_) => serde_json::from_value(value.clone()).ok(),
        Value::Object(map) => ["output", "grid"]
            .iter()
            .find_map(|key| map.get(*key))
            .and_then(grid_from_value),
        _ => None,
    }
}

/// Scan for balanced `[[..]]` or `{..}` spans that decode to a grid
fn find_json_grid(text: &str) -> Option<Grid> {
    let bytes = text.as_bytes();
    for (start, &b) in bytes.iter().enumerate() {
        let is_grid_start = b == b'['
            && text[start + 1..].trim_start().starts_with('[');
        if !(is_grid_start || b == b'{') {
            continue;
        }
        if let Some(end) = matching_close(bytes, start) {
            if let Ok(value) = serde_json::from_str::<Value>(&text[start..=end]) {
                if let Some(grid) = grid_from_value(&value) {
                    return Some(grid);
                }
            }
        }
    }
    None
}

fn matching_close(bytes: &[u8], start: usize) -> Option<usize> {
    let (open, close) = match bytes[start] {
        b'[' => (b'[', b']'),
        _ => (b'{', b'}'),
    };
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            _ if b == open => depth += 1,
            _ if b == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Longest run of consecutive digit lines with equal width
fn find_digit_rows(text: &str) -> Option<Grid> {
    let mut best: Option<Vec<Vec<u8>>> = None;
    let mut current: Vec<Vec<u8>> = Vec::new();

    let flush = |current: &mut Vec<Vec<u8>>, best: &mut Option<Vec<Vec<u8>>>| {
        if !current.is_empty() && best.as_ref().map_or(true, |b| current.len() > b.len()) {
            *best = Some(std::mem::take(current));
        }
        current.clear();
    };

    for line in text.lines() {
        let row = RE_DIGIT_ROW.captures(line).and_then(|c| c.get(1)).map(|m| {
            m.as_str()
                .bytes()
                .filter(u8::is_ascii_digit)
                .map(|b| b - b'0')
                .collect::<Vec<u8>>()
        });

        match row {
            Some(row) if current.first().map_or(true, |first| first.len() == row.len()) => {
                current.push(row)
            }
            Some(row) => {
                flush(&mut current, &mut best);
                current.push(row);
            }
            None => flush(&mut current, &mut best),
        }
    }
    flush(&mut current, &mut best);

    best.and_then(|rows| Grid::new(rows).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_grid_in_prose() {
        let reply = "Applying the pattern, the answer is [[1, 0], [0, 1]] as shown.";
        assert_eq!(parse_grid_reply(reply).unwrap().to_json(), "[[1,0],[0,1]]");
    }

    #[test]
    fn test_fenced_object_with_output_key() {
        let reply = "Here you go:\n```json\n{\"output\": [[3, 3], [3, 4]]}\n```\nDone.";
        assert_eq!(parse_grid_reply(reply).unwrap().to_json(), "[[3,3],[3,4]]");
    }

    #[test]
    fn test_fence_wins_over_earlier_prose_grid() {
        let reply = "Input was [[0]].\n```\n[[5, 5]]\n```";
        assert_eq!(parse_grid_reply(reply).unwrap().to_json(), "[[5,5]]");
    }

    #[test]
    fn test_invalid_json_grid_skipped() {
        let reply = "Not this [[1, 2], [3]] but this [[7]]";
        assert_eq!(parse_grid_reply(reply).unwrap().to_json(), "[[7]]");
    }

    #[test]
    fn test_digit_rows_fallback() {
        let reply = "Output grid:\n1 2 3\n4,5,6\n\nThanks";
        assert_eq!(parse_grid_reply(reply).unwrap().to_json(), "[[1,2,3],[4,5,6]]");

        let contiguous = "Answer:\n012\n340";
        assert_eq!(parse_grid_reply(contiguous).unwrap().to_json(), "[[0,1,2],[3,4,0]]");
    }

    #[test]
    fn test_non_ascii_digits_are_not_a_row() {
        assert!(parse_grid_reply("Output:\n1 \u{0662} 3").is_none());
        assert!(parse_grid_reply("Output:\n\u{0661}\u{0662}").is_none());
    }

    #[test]
    fn test_no_grid() {
        assert!(parse_grid_reply("I cannot determine the pattern.").is_none());
        assert!(parse_grid_reply("").is_none());
    }
}
