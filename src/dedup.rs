//! Whitespace and duplicate-line cleanup for presentation output.

/// Normalize zonefile text for export.
///
/// Runs of spaces collapse to one and repeated lines are dropped, keeping
/// the first occurrence. The result ends in a newline unless it is empty.
pub fn dedup_lines<'a>(lines: impl Iterator<Item = &'a str>) -> String {
    let mut seen = std::collections::HashSet::new();
    let mut out = String::new();
    for line in lines {
        let line = collapse_spaces(line);
        if seen.insert(line.clone()) {
            out.push_str(&line);
            out.push('\n');
        }
    }
    out
}

fn collapse_spaces(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut last_was_space = false;
    for ch in line.chars() {
        if ch == ' ' {
            if !last_was_space {
                out.push(ch);
            }
            last_was_space = true;
        } else {
            out.push(ch);
            last_was_space = false;
        }
    }
    out
}

//============ Tests =========================================================
