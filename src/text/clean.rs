//! Token clean-up applied before analysis.

/// Fragments whose long runs are collapsed inside overlong tokens.
const REPEAT_FRAGMENTS: [&str; 16] = [
    "EE", "AA", "HA", "OO", "II", "UU", "ee", "aa", "ha", "oo", "ii", "uu", "!!", "?!", "??", "..",
];

const MAX_REPEATS: usize = 16;

/// Shorten overlong tokens ("HAHAHAHA...", "REEEEEE...", keyboard mashes).
///
/// Tokens longer than `max_len` characters first have repeated fragments
/// collapsed, then whatever is still too long is split into `max_len`-sized
/// pieces. Line structure is kept; the result is trimmed.
pub fn chop_long_tokens(text: &str, max_len: usize) -> String {
    let max_len = max_len.max(1);

    text.split('\n')
        .map(|line| {
            line.split(' ')
                .flat_map(|word| split_word(word, max_len))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn split_word(word: &str, max_len: usize) -> Vec<String> {
    if word.chars().count() <= max_len {
        return vec![word.to_string()];
    }

    let collapsed = REPEAT_FRAGMENTS
        .iter()
        .fold(word.to_string(), |acc, fragment| {
            collapse_repeats(&acc, fragment, MAX_REPEATS)
        });

    let chars: Vec<char> = collapsed.chars().collect();
    if chars.len() <= max_len {
        return vec![collapsed];
    }
    chars.chunks(max_len).map(|chunk| chunk.iter().collect()).collect()
}

/// Replace every run of more than `max_repeats` consecutive `fragment`s
/// with exactly `max_repeats` of them.
pub fn collapse_repeats(text: &str, fragment: &str, max_repeats: usize) -> String {
    if fragment.is_empty() {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while !rest.is_empty() {
        if rest.starts_with(fragment) {
            let mut run = 0;
            while let Some(tail) = rest.strip_prefix(fragment) {
                rest = tail;
                run += 1;
            }
            for _ in 0..run.min(max_repeats) {
                out.push_str(fragment);
            }
        } else {
            let mut chars = rest.chars();
            if let Some(c) = chars.next() {
                out.push(c);
            }
            rest = chars.as_str();
        }
    }
    out
}

/// Lower-cased word tokens for term counting.
///
/// Punctuation and symbols become separators; tokens carrying digits or
/// lacking any letter are dropped.
pub fn term_tokens(text: &str) -> Vec<String> {
    let spaced: String = text
        .chars()
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect();

    spaced
        .to_lowercase()
        .split_whitespace()
        .filter(|token| {
            token.chars().any(char::is_alphabetic) && !token.chars().any(|c| c.is_ascii_digit())
        })
        .map(String::from)
        .collect()
}

/// Strip numbers, symbols and emoji, keeping letters, whitespace and the
/// sentence marks readability scoring relies on.
pub fn denoise(text: &str) -> String {
    let kept: String = text
        .chars()
        .map(|c| {
            if c.is_alphabetic() || c == '.' || c == ',' {
                c
            } else {
                ' '
            }
        })
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_tokens_untouched() {
        assert_eq!(chop_long_tokens("  hello there\nfriend ", 32), "hello there\nfriend");
    }

    #[test]
    fn test_repeats_collapsed() {
        let laugh = "HA".repeat(30);
        let out = chop_long_tokens(&laugh, 32);
        assert_eq!(out, "HA".repeat(16));
    }

    #[test]
    fn test_gibberish_is_split() {
        let mash = "x".repeat(70);
        let out = chop_long_tokens(&format!("ok {}", mash), 32);
        let pieces: Vec<&str> = out.split(' ').collect();
        assert_eq!(pieces.len(), 4);
        assert_eq!(pieces[0], "ok");
        assert_eq!(pieces[1].len(), 32);
        assert_eq!(pieces[3].len(), 6);
    }

    #[test]
    fn test_collapse_repeats() {
        assert_eq!(collapse_repeats("aaaaab", "a", 2), "aab");
        assert_eq!(collapse_repeats("abab", "ab", 5), "abab");
        assert_eq!(collapse_repeats("xyz", "", 1), "xyz");
    }

    #[test]
    fn test_term_tokens() {
        let tokens = term_tokens("Hello, WORLD! Call 555-1234 or see r2d2 :) über");
        assert_eq!(tokens, vec!["hello", "world", "call", "or", "see", "über"]);
    }

    #[test]
    fn test_denoise() {
        assert_eq!(denoise("I paid $20!!! for this :( ok."), "I paid for this ok.");
    }
}
