use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

/// Substituted for characters with no plain-text equivalent.
const REPLACEMENT: char = '?';

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s").expect("static regex"));

/// Degrades `text` to printable ASCII for the report fonts.
///
/// Typographic punctuation maps to its ASCII look-alike, accented letters
/// lose their marks (`é` → `e`), and anything left outside printable ASCII
/// becomes `?`.
pub fn to_plain_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\u{2010}'..='\u{2015}' | '\u{2212}' => out.push('-'),
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{2032}' => out.push('\''),
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{2033}' => out.push('"'),
            '\u{2026}' => out.push_str("..."),
            '\u{00A0}' | '\t' => out.push(' '),
            c if c.is_ascii_graphic() || c == ' ' => out.push(c),
            c => {
                let decomposed: String = c
                    .nfkd()
                    .filter(|d| d.is_ascii_graphic() || *d == ' ')
                    .collect();
                if decomposed.is_empty() {
                    if !c.is_control() && !is_combining_mark(c) {
                        out.push(REPLACEMENT);
                    }
                } else {
                    out.push_str(&decomposed);
                }
            }
        }
    }
    out
}

fn is_combining_mark(c: char) -> bool {
    matches!(c, '\u{0300}'..='\u{036F}')
}

/// File stem for a student's report: whitespace and path separators in the
/// name become `_`, followed by `_<roll number>`.
///
/// `("Jane Doe", "12")` → `Jane_Doe_12`.
pub fn artifact_stem(student_name: &str, roll_number: &str) -> String {
    let name = WHITESPACE
        .replace_all(student_name.trim(), "_")
        .replace(['/', '\\'], "_");
    format!("{}_{}", name, roll_number.trim())
}
