use crate::sidecar::types::Token;

/// Tokens closer than this to the current line's top join that line.
const LINE_MERGE_TOLERANCE: f64 = 2.5;

/// Letterhead strings repeated on every page; never part of an item.
pub const HEADER_LINES: &[&str] = &[
    "\u{5d1}\u{5e1}\"\u{5d3}",
    "Bloom Packaging Corp.",
    "244 Dukes Street / Kearny N.J. 07032",
    "Tel # 718 768-1919 - Fax # 718 768-2551",
    "www.bloomskosher.com",
];

pub fn is_header_line(text: &str) -> bool {
    HEADER_LINES.contains(&text)
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Groups the tokens of one cell into visual lines, top to bottom and left to right.
pub fn assemble_lines(tokens: &[&Token]) -> Vec<String> {
    let mut ordered: Vec<&Token> = tokens.to_vec();
    ordered.sort_by(|a, b| {
        round_to(a.bbox.top, 1)
            .total_cmp(&round_to(b.bbox.top, 1))
            .then(a.bbox.x0.total_cmp(&b.bbox.x0))
    });

    let mut lines: Vec<(f64, Vec<&str>)> = Vec::new();
    for token in ordered {
        if is_header_line(&token.text) {
            continue;
        }
        let joins_current = lines
            .last()
            .is_some_and(|(line_top, _)| (token.bbox.top - line_top).abs() <= LINE_MERGE_TOLERANCE);
        if !joins_current {
            lines.push((token.bbox.top, Vec::new()));
        }
        if let Some((_, parts)) = lines.last_mut() {
            parts.push(token.text.as_str());
        }
    }

    lines
        .into_iter()
        .map(|(_, parts)| parts.join(" ").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}
