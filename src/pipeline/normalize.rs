//! Whitespace normalisation of extracted text.
//!
//! Column detection only understands the ASCII space. PDF text layers are
//! full of look-alikes (non-breaking spaces between currency and amount,
//! narrow no-break spaces as thousands separators, tabs from form fields)
//! that would otherwise hide a column gap or invent a token boundary. This
//! module maps them all to `' '` before any line reaches [`crate::table`].
//!
//! Rules (applied in order):
//! 1. Split on `\n`, `\r\n` or lone `\r`
//! 2. Remove invisible characters (zero-width spaces, BOM, soft hyphen)
//! 3. Map every other Unicode whitespace char (tab, NBSP, U+202F, U+2007,
//!    em/en spaces, …) to one ASCII space
//!
//! Each line keeps its length in chars apart from removed invisibles, so
//! alignment survives.

/// Characters removed outright.
const INVISIBLE: [char; 6] = [
    '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
];

/// Split page text into lines and normalise each one.
pub fn normalize_text(text: &str) -> Vec<String> {
    split_lines(text).iter().map(|l| normalize_line(l)).collect()
}

/// Split page text into raw lines without touching their content.
pub fn split_lines(text: &str) -> Vec<String> {
    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        .lines()
        .map(str::to_string)
        .collect()
}

/// Normalise a single line.
pub fn normalize_line(line: &str) -> String {
    line.chars()
        .filter(|c| !INVISIBLE.contains(c))
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .collect()
}
