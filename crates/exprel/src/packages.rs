//! Namespace resolution.

use std::fmt;

/// The container expressions are checked in. Unqualified names are looked
/// up from the innermost namespace outwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Package {
    name: String,
}

impl Package {
    pub fn new(name: impl Into<String>) -> Self {
        Package {
            name: name.into().trim_matches('.').to_string(),
        }
    }

    pub fn root() -> Self {
        Package::default()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether every dotted segment is a non-empty identifier.
    pub fn is_valid(&self) -> bool {
        self.name.is_empty()
            || self.name.split('.').all(|segment| {
                let mut chars = segment.chars();
                chars
                    .next()
                    .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
                    && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            })
    }

    /// Fully qualified names `name` may refer to, most specific first.
    ///
    /// In package `a.b`, `c` may mean `a.b.c`, `a.c` or `c`. A leading dot
    /// makes the name absolute.
    pub fn candidates(&self, name: &str) -> Vec<String> {
        if let Some(absolute) = name.strip_prefix('.') {
            return vec![absolute.to_string()];
        }
        let mut candidates = Vec::new();
        let mut prefix = self.name.as_str();
        while !prefix.is_empty() {
            candidates.push(format!("{prefix}.{name}"));
            prefix = match prefix.rfind('.') {
                Some(index) => &prefix[..index],
                None => "",
            };
        }
        candidates.push(name.to_string());
        candidates
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidates() {
        let package = Package::new("a.b");
        assert_eq!(package.candidates("c"), vec!["a.b.c", "a.c", "c"]);
        assert_eq!(package.candidates(".c"), vec!["c"]);
        assert_eq!(Package::root().candidates("x.y"), vec!["x.y"]);
    }

    #[test]
    fn test_validity() {
        assert!(Package::root().is_valid());
        assert!(Package::new("com.example_1").is_valid());
        assert!(!Package::new("a..b").is_valid());
        assert!(!Package::new("1a").is_valid());
    }
}
