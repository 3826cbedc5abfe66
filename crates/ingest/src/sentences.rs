//! Heuristic sentence boundaries.
//!
//! A boundary is a whitespace character preceded by `.` or `?`, unless
//! the text before it looks like an abbreviation:
//! - `e.g.` / `U.S.` (word char, dot, word char, terminator)
//! - `Mr.` / `Co.` (upper, lower, dot)
//! - `J.` (a lone capital letter and a dot)
//!
//! This is deliberately not a full tokenizer.

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '?')
}

/// `window[3]` is the char right before the candidate boundary,
/// `window[0]` the one four positions back. Missing chars are `None`.
fn is_abbreviation(window: &[Option<char>; 4]) -> bool {
    let [c4, c3, c2, c1] = *window;

    // e.g. / U.S.
    if let (Some(a), Some('.'), Some(b), Some(_)) = (c4, c3, c2, c1) {
        if is_word(a) && is_word(b) {
            return true;
        }
    }

    if c1 != Some('.') {
        return false;
    }

    // Mr. / Dr. / Co.
    if let (Some(a), Some(b)) = (c3, c2) {
        if a.is_ascii_uppercase() && b.is_ascii_lowercase() {
            return true;
        }
    }

    // J. Smith
    matches!(c2, Some(c) if c.is_ascii_uppercase()) && !matches!(c3, Some(c) if is_word(c))
}

/// Split `text` into trimmed, non-empty sentences.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut window: [Option<char>; 4] = [None; 4];
    let mut start = 0;

    for (idx, c) in text.char_indices() {
        if c.is_whitespace()
            && matches!(window[3], Some(t) if is_terminator(t))
            && !is_abbreviation(&window)
        {
            push_trimmed(&mut sentences, &text[start..idx]);
            start = idx + c.len_utf8();
        }
        window = [window[1], window[2], window[3], Some(c)];
    }
    push_trimmed(&mut sentences, &text[start..]);

    sentences
}

fn push_trimmed<'a>(out: &mut Vec<&'a str>, piece: &'a str) {
    let piece = piece.trim();
    if !piece.is_empty() {
        out.push(piece);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_split() {
        let text = "Revenue increased by 10%. Acme acquired Widgets? Yes. Done";
        assert_eq!(
            split_sentences(text),
            vec!["Revenue increased by 10%.", "Acme acquired Widgets?", "Yes.", "Done"]
        );
    }

    #[test]
    fn test_exclamation_is_not_a_boundary() {
        assert_eq!(
            split_sentences("Record quarter! Acme acquired Widgets."),
            vec!["Record quarter! Acme acquired Widgets."]
        );
    }

    #[test]
    fn test_abbreviations_do_not_split() {
        let text = "Shares of Acme Co. rose in the U.S. market. J. Smith said so, e.g. today.";
        assert_eq!(
            split_sentences(text),
            vec![
                "Shares of Acme Co. rose in the U.S. market.",
                "J. Smith said so, e.g. today."
            ]
        );
    }

    #[test]
    fn test_newlines_are_boundaries() {
        let text = "First page ends here.\nSecond page starts.\n";
        assert_eq!(
            split_sentences(text),
            vec!["First page ends here.", "Second page starts."]
        );
    }

    #[test]
    fn test_empty_and_whitespace() {
        assert!(split_sentences("").is_empty());
        assert!(split_sentences("   \n  ").is_empty());
    }

    #[test]
    fn test_decimal_is_not_a_boundary() {
        assert_eq!(
            split_sentences("Margin was 4.5 percent this year."),
            vec!["Margin was 4.5 percent this year."]
        );
    }
}
