use reelcore_store::Record;

/// Query text trimmed and lowercased once, up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedQuery {
    text: String,
    ascii: bool,
}

impl NormalizedQuery {
    pub fn new(raw: &str) -> Self {
        let text = raw.trim().to_lowercase();
        let ascii = text.is_ascii();
        Self { text, ascii }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

pub fn record_matches(query: &NormalizedQuery, record: &Record) -> bool {
    contains_case_insensitive(&record.title, query)
        || contains_case_insensitive(record.category.label(), query)
}

pub fn contains_case_insensitive(haystack: &str, query: &NormalizedQuery) -> bool {
    if query.ascii && haystack.is_ascii() {
        contains_ascii_case_insensitive(haystack, &query.text)
    } else {
        haystack.to_lowercase().contains(query.text.as_str())
    }
}

fn contains_ascii_case_insensitive(haystack: &str, needle_lower_ascii: &str) -> bool {
    if needle_lower_ascii.is_empty() {
        return true;
    }

    let h = haystack.as_bytes();
    let n = needle_lower_ascii.as_bytes();
    if n.len() > h.len() {
        return false;
    }

    if n.len() == 1 {
        let b = n[0];
        return h.iter().any(|ch| ch.to_ascii_lowercase() == b);
    }

    h.windows(n.len()).any(|window| {
        window
            .iter()
            .zip(n)
            .all(|(hc, nc)| hc.to_ascii_lowercase() == *nc)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_fast_path() {
        let q = NormalizedQuery::new("Hello");
        assert!(contains_case_insensitive("say HelloWorld", &q));
        assert!(!contains_case_insensitive("HellWorld", &q));
        assert!(!contains_case_insensitive("hel", &q));
    }

    #[test]
    fn single_byte_needle() {
        let q = NormalizedQuery::new("X");
        assert!(contains_case_insensitive("box", &q));
        assert!(!contains_case_insensitive("bob", &q));
    }

    #[test]
    fn unicode_falls_back_to_full_lowercase() {
        let q = NormalizedQuery::new("ÉTÉ");
        assert_eq!(q.as_str(), "été");
        assert!(contains_case_insensitive("Un Été Chaud", &q));
        assert!(!contains_case_insensitive("Un Hiver", &q));
    }
}
