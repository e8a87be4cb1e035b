//! Keyword matching on posting titles.
//!
//! Matching is a case-insensitive, unanchored substring test. There is no
//! stemming and no word-boundary check, so `"Deployment"` also matches
//! `"Redeployment Specialist"`.

/// True if any keyword appears in `title`, ignoring case.
pub fn matches<S: AsRef<str>>(title: &str, keywords: &[S]) -> bool {
    let title = title.to_lowercase();
    keywords
        .iter()
        .any(|keyword| title.contains(&keyword.as_ref().to_lowercase()))
}

/// A keyword list lower-cased once up front.
///
/// Blank keywords are dropped: an empty needle would match every title.
#[derive(Debug, Clone, Default)]
pub struct KeywordFilter {
    keywords: Vec<String>,
}

impl KeywordFilter {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { keywords }
    }

    pub fn matches(&self, title: &str) -> bool {
        matches(title, &self.keywords)
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }
}
