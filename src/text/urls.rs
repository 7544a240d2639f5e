//! URL scanning: hostname counts, news headlines and URL-free text.

use once_cell::sync::Lazy;
use regex::Regex;

static URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"https?://(?:[a-zA-Z0-9$-_@.&+!*(),]|%[0-9a-fA-F]{2})+")
        .expect("URL pattern is valid")
});

static DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]+-[0-9]+-[0-9]+$").expect("date pattern is valid"));

const GOOGLE_HOST: &str = "www.google.com";

/// What a text's URLs contributed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UrlScan {
    /// One hostname per URL found, in order.
    pub hosts: Vec<String>,
    /// Headlines recovered from news-article links.
    pub headlines: Vec<String>,
    /// The text with every URL removed, trimmed.
    pub text: String,
}

/// Scan a text for URLs.
pub fn scan_urls(text: &str) -> UrlScan {
    let mut scan = UrlScan {
        text: text.to_string(),
        ..Default::default()
    };

    for found in URL_RE.find_iter(text) {
        let url = found.as_str();
        let bare = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))
            .unwrap_or(url);

        let mut segments = bare.split('/');
        let mut host = segments.next().unwrap_or_default().to_string();
        let path: Vec<&str> = segments.collect();

        if let Some(headline) = headline_from_path(&path) {
            scan.headlines.push(headline);
        }

        // Google redirects carry the real host somewhere in the path.
        if host == GOOGLE_HOST {
            if let Some(real) = path.iter().find(|segment| segment.ends_with(".com")) {
                host = real.to_string();
            }
        }
        scan.hosts.push(host);

        scan.text = scan.text.replace(url, "").trim().to_string();
    }

    scan
}

fn headline_from_path(path: &[&str]) -> Option<String> {
    let mut parts: Vec<&str> = path
        .iter()
        .filter(|segment| is_slug(segment))
        .flat_map(|segment| segment.split(".html"))
        .flat_map(|piece| piece.split('?'))
        .filter(|piece| is_clean_slug(piece))
        .collect();

    if parts.is_empty() {
        return None;
    }

    // With several slugs the first one names the section or topic.
    let mut topic = String::new();
    if parts.len() > 1 {
        topic = parts[0]
            .split('-')
            .filter(|w| {
                !w.is_empty()
                    && (w.chars().all(char::is_alphabetic) || w.chars().all(|c| c.is_ascii_digit()))
            })
            .collect::<Vec<_>>()
            .join(" ");
        parts.remove(0);
    }

    let words: Vec<&str> = parts
        .iter()
        .flat_map(|part| part.split('-'))
        .filter(|word| valid_headline_word(word))
        .collect();
    let headline = words.join(" ");

    if topic.is_empty() {
        Some(headline)
    } else {
        Some(format!("{}: {}", topic, headline))
    }
}

/// A dash-separated path segment of at least three parts that is not a date.
fn is_slug(segment: &str) -> bool {
    !segment.is_empty()
        && !segment.chars().all(char::is_alphanumeric)
        && segment.split('-').count() > 2
        && !DATE_RE.is_match(segment)
}

/// A slug with query metadata and extensions already cut off.
fn is_clean_slug(piece: &str) -> bool {
    !piece.is_empty()
        && piece.split('-').count() > 2
        && !piece.contains(['=', '_', ','])
}

/// Headline words are lower case and carry no ids, long numbers or hashes.
fn valid_headline_word(word: &str) -> bool {
    if word.is_empty() {
        return false;
    }
    if is_digits(word) && number_exceeds(word, 1_000_000) {
        return false;
    }
    let tail = &word[word.chars().next().map_or(0, char::len_utf8)..];
    if is_digits(tail) && number_exceeds(tail, 100_000) {
        return false;
    }
    if !is_digits(word) {
        let embedded: String = word.chars().filter(|c| c.is_ascii_digit()).collect();
        if !embedded.is_empty() && number_exceeds(&embedded, 1_000) {
            return false;
        }
    }
    word == word.to_lowercase()
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

fn number_exceeds(digits: &str, limit: u64) -> bool {
    match digits.parse::<u64>() {
        Ok(n) => n > limit,
        Err(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_urls() {
        let scan = scan_urls("  just words  ");
        assert!(scan.hosts.is_empty());
        assert!(scan.headlines.is_empty());
        assert_eq!(scan.text, "  just words  ");
    }

    #[test]
    fn test_hosts_and_stripped_text() {
        let scan = scan_urls("look https://github.com/rust-lang and http://example.org/a");
        assert_eq!(scan.hosts, vec!["github.com", "example.org"]);
        assert_eq!(scan.text, "look  and");
    }

    #[test]
    fn test_url_only_text_becomes_empty() {
        let scan = scan_urls("https://example.com/page");
        assert_eq!(scan.text, "");
        assert_eq!(scan.hosts.len(), 1);
    }

    #[test]
    fn test_headline_with_topic() {
        let scan = scan_urls(
            "https://www.news.com/science/2021-05-04/mars-rover-finds-water-ice.html?utm=x",
        );
        assert_eq!(scan.headlines, vec!["mars rover finds water ice"]);

        let scan = scan_urls("https://www.news.com/world-news-today/big-storm-hits-coast-a1234567");
        assert_eq!(scan.headlines, vec!["world news today: big storm hits coast"]);
    }

    #[test]
    fn test_plain_paths_have_no_headline() {
        let scan = scan_urls("https://www.youtube.com/watch?v=abc123");
        assert!(scan.headlines.is_empty());
    }

    #[test]
    fn test_google_redirect_host() {
        let scan = scan_urls("https://www.google.com/amp/www.example.com/story");
        assert_eq!(scan.hosts, vec!["www.example.com"]);
    }

    #[test]
    fn test_headline_words() {
        assert!(valid_headline_word("storm"));
        assert!(valid_headline_word("2021"));
        assert!(!valid_headline_word("12345678"));
        assert!(!valid_headline_word("n1234567"));
        assert!(!valid_headline_word("70e400adf209cbf52dccef47c46f9b0e"));
        assert!(!valid_headline_word("Storm"));
    }
}
