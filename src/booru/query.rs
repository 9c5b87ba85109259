use itertools::Itertools as _;

/// Tags hidden from `/random` and `/fav` unless the user asks for them by name.
pub const DEFAULT_EXCLUDES: [&str; 6] = ["vore", "gore", "scat", "watersports", "loli", "shota"];

/// A post search. `tags` is passed through untouched so the booru's own
/// syntax (`OR`, `ordfav:`, metatags) works; `exclude` becomes `-tag` terms.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PostQuery {
    pub tags: String,
    pub exclude: Vec<String>,
    pub limit: u32,
    pub random: bool,
}

impl PostQuery {
    #[must_use]
    pub fn new(tags: impl Into<String>, limit: u32) -> Self {
        Self {
            tags: tags.into(),
            limit,
            ..Self::default()
        }
    }

    /// Posts matching any of `tags`.
    #[must_use]
    pub fn any_of(tags: &[&str], limit: u32) -> Self {
        Self::new(tags.join(" OR "), limit)
    }

    #[must_use]
    pub fn random(mut self) -> Self {
        self.random = true;
        self
    }

    /// Hides [`DEFAULT_EXCLUDES`] except those the query already names.
    #[must_use]
    pub fn with_default_excludes(mut self) -> Self {
        let named: Vec<&str> = self.tags.split_whitespace().collect();
        self.exclude = DEFAULT_EXCLUDES
            .iter()
            .filter(|tag| !named.contains(*tag))
            .map(|tag| (*tag).to_owned())
            .collect();

        self
    }

    #[must_use]
    pub fn tags_param(&self) -> String {
        let mut terms: Vec<String> = self.tags.split_whitespace().map(str::to_owned).collect();
        terms.extend(self.exclude.iter().map(|tag| format!("-{tag}")));
        terms.join(" ")
    }

    #[must_use]
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("tags", self.tags_param()), ("limit", self.limit.to_string())];
        if self.random {
            params.push(("random", String::from("true")));
        }

        params
    }
}

/// Query string for a post page link, `a b` becomes `a+b`.
#[must_use]
pub fn search_suffix(tags: &str) -> String {
    tags.split_whitespace().join("+")
}
