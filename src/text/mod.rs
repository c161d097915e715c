//! 文本清洗：把任意输入收敛到引擎可以接受的字符子集。
//!
//! `sanitize` 处理通用的 Unicode 噪声，`safe_text` 在其之上再走一遍引擎代码页，
//! 二者都是幂等的。

mod codepage;

/// Characters removed outright: BOM, soft hyphen, zero-width and bidi controls.
const STRIPPED: &[char] = &[
    '\u{FEFF}', '\u{00AD}', '\u{200B}', '\u{200C}', '\u{200D}', '\u{200E}', '\u{200F}',
    '\u{202A}', '\u{202B}', '\u{202C}', '\u{202D}', '\u{202E}', '\u{2066}', '\u{2067}',
    '\u{2068}', '\u{2069}',
];

/// The engine mishandles this character, so it is spoken as a pause instead.
const ENGINE_HOSTILE: char = '?';

fn translate_punctuation(ch: char) -> Option<&'static str> {
    match ch {
        '\u{2019}' | '\u{2018}' => Some("'"),
        '\u{201C}' | '\u{201D}' => Some("\""),
        '\u{2013}' | '\u{2014}' => Some("-"),
        '\u{2026}' => Some("..."),
        '\u{00A0}' => Some(" "),
        _ => None,
    }
}

fn is_control(ch: char) -> bool {
    matches!(
        ch,
        '\u{0000}'..='\u{0008}'
            | '\u{000B}'
            | '\u{000C}'
            | '\u{000E}'..='\u{001F}'
            | '\u{007F}'..='\u{009F}'
    )
}

fn is_outside_bmp(ch: char) -> bool {
    u32::from(ch) > 0xFFFF
}

/// Collapses every whitespace run to one space and trims both ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalises punctuation, strips invisible code points and replaces control
/// and astral characters with spaces.
pub fn sanitize(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if let Some(replacement) = translate_punctuation(ch) {
            out.push_str(replacement);
        } else if STRIPPED.contains(&ch) {
            continue;
        } else if is_control(ch) || is_outside_bmp(ch) {
            out.push(' ');
        } else {
            out.push(ch);
        }
    }

    collapse_whitespace(&out)
}

/// `sanitize` followed by a round trip through the engine code page.
/// Characters the code page cannot carry end up as spaces.
pub fn safe_text(text: &str) -> String {
    let sanitized = sanitize(text);
    if sanitized.is_empty() {
        return sanitized;
    }

    let round_trip = codepage::decode(&codepage::encode(&sanitized));
    let spaced: String = round_trip
        .chars()
        .map(|ch| if ch == ENGINE_HOSTILE { ' ' } else { ch })
        .collect();
    collapse_whitespace(&spaced)
}

/// Last-resort variant of a segment for an engine that choked on it.
pub fn ascii_fallback(text: &str) -> String {
    let ascii: String = text
        .chars()
        .map(|ch| if ch.is_ascii() { ch } else { ' ' })
        .collect();
    collapse_whitespace(&ascii)
}

/// Splits `text` into consecutive pieces of at most `max_chars` characters.
pub fn split_segments(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(max_chars)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: &[&str] = &[
        "",
        "   ",
        "plain ascii text",
        "\u{2019}Hello\u{2014}world\u{2026}",
        "tab\tand\nnewline\r\nmixed",
        "zero\u{200B}width\u{FEFF}bom\u{00AD}shy",
        "bidi \u{202E}override\u{202C} and \u{2066}isolate\u{2069}",
        "control\u{0001}\u{0007}chars\u{0085}here\u{009F}",
        "emoji \u{1F600} and \u{1D11E} clef",
        "why? really?? yes?",
        "Příliš žluťoučký kůň",
        "日本語のテキスト",
        "nbsp\u{00A0}\u{00A0}between",
        "\u{201C}quoted\u{201D} \u{2018}single\u{2019} \u{2013} dash",
        "  leading and trailing  ",
    ];

    #[test]
    fn sanitizes_smart_punctuation() {
        assert_eq!(sanitize("\u{2019}Hello\u{2014}world\u{2026}"), "'Hello-world...");
        assert_eq!(sanitize("\u{201C}a\u{201D} \u{2018}b\u{2019}"), "\"a\" 'b'");
    }

    #[test]
    fn strips_invisible_code_points() {
        assert_eq!(sanitize("zero\u{200B}width\u{FEFF}"), "zerowidth");
        assert_eq!(sanitize("soft\u{00AD}hyphen"), "softhyphen");
        assert_eq!(sanitize("\u{202A}rtl\u{202C}"), "rtl");
    }

    #[test]
    fn replaces_control_and_astral_characters_with_spaces() {
        assert_eq!(sanitize("a\u{0001}b"), "a b");
        assert_eq!(sanitize("a\u{0090}\u{0091}b"), "a b");
        assert_eq!(sanitize("smile\u{1F600}now"), "smile now");
    }

    #[test]
    fn collapses_and_trims_whitespace() {
        assert_eq!(sanitize("  one \t two\n\nthree  "), "one two three");
        assert_eq!(sanitize("\u{00A0}\u{00A0}"), "");
    }

    #[test]
    fn sanitize_is_idempotent() {
        for sample in SAMPLES {
            let once = sanitize(sample);
            assert_eq!(sanitize(&once), once, "sample {sample:?}");
        }
    }

    #[test]
    fn safe_text_is_idempotent() {
        for sample in SAMPLES {
            let once = safe_text(sample);
            assert_eq!(safe_text(&once), once, "sample {sample:?}");
        }
    }

    #[test]
    fn safe_text_replaces_question_marks() {
        assert_eq!(safe_text("why? really?? yes?"), "why really yes");
    }

    #[test]
    fn safe_text_keeps_code_page_letters_and_drops_the_rest() {
        assert_eq!(safe_text("Příliš žluťoučký"), "Příliš žluťoučký");
        assert_eq!(safe_text("日本語"), "");
        assert_eq!(safe_text("abc 日本 def"), "abc def");
    }

    #[test]
    fn ascii_fallback_blanks_non_ascii() {
        assert_eq!(ascii_fallback("kůň a pes"), "k a pes");
        assert_eq!(ascii_fallback("plain"), "plain");
    }

    #[test]
    fn segments_respect_bound_and_concatenate_back() {
        let text: String = "abcdefghij".repeat(100);
        let segments = split_segments(&text, 450);
        assert_eq!(segments.len(), 3);
        assert!(segments.iter().all(|segment| segment.chars().count() <= 450));
        assert_eq!(segments.concat(), text);
    }

    #[test]
    fn segments_count_characters_not_bytes() {
        let text = "ž".repeat(5);
        let segments = split_segments(&text, 2);
        assert_eq!(segments, vec!["žž", "žž", "ž"]);
    }

    #[test]
    fn short_text_is_a_single_segment() {
        assert_eq!(split_segments("hello", 450), vec!["hello"]);
        assert!(split_segments("", 450).is_empty());
    }
}
