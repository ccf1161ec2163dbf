use crate::{Result, RigError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Element-finding strategy. Locator values without an explicit prefix are
/// treated as XPath expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Id,
    Name,
    Css,
    Xpath,
}

impl std::str::FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "id" => Ok(Self::Id),
            "name" => Ok(Self::Name),
            "css" => Ok(Self::Css),
            "xpath" => Ok(Self::Xpath),
            _ => Err(format!("Invalid strategy: {}", s)),
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Css => "css",
            Self::Xpath => "xpath",
        };
        f.write_str(s)
    }
}

/// Concrete selector the engine layer can act on. Id and name strategies
/// render to CSS so only two find paths exist downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Css(String),
    Xpath(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocatorEntry {
    pub key: String,
    pub strategy: Strategy,
    pub value: String,
}

impl LocatorEntry {
    pub fn selector(&self) -> Selector {
        match self.strategy {
            Strategy::Id => Selector::Css(format!("#{}", self.value)),
            Strategy::Name => Selector::Css(format!("[name='{}']", self.value)),
            Strategy::Css => Selector::Css(self.value.clone()),
            Strategy::Xpath => Selector::Xpath(self.value.clone()),
        }
    }
}

/// Immutable key → locator mapping, loaded once before the suite runs.
/// Safe for concurrent reads without locking.
#[derive(Debug, Default)]
pub struct LocatorRegistry {
    entries: HashMap<String, LocatorEntry>,
}

impl LocatorRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parses `key = [strategy:]value` lines. Blank lines and `#`/`!`
    /// comments are skipped. A head before `:` counts as a strategy prefix
    /// only when it is purely alphabetic; anything else is part of an
    /// unprefixed XPath value.
    pub fn parse(source: &str) -> Result<Self> {
        let mut entries = HashMap::new();

        for (idx, raw) in source.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }

            let (key, rest) = line.split_once('=').ok_or_else(|| RigError::RegistryLoad {
                line: line_no,
                reason: "missing '='".into(),
            })?;
            let key = key.trim();
            let rest = rest.trim();

            if key.is_empty() {
                return Err(RigError::RegistryLoad {
                    line: line_no,
                    reason: "empty key".into(),
                });
            }
            if rest.is_empty() {
                return Err(RigError::RegistryLoad {
                    line: line_no,
                    reason: format!("missing locator value for '{}'", key),
                });
            }

            let (strategy, value) = match rest.split_once(':') {
                Some((head, tail))
                    if !head.is_empty() && head.chars().all(|c| c.is_ascii_alphabetic()) =>
                {
                    let strategy =
                        head.parse::<Strategy>()
                            .map_err(|_| RigError::RegistryLoad {
                                line: line_no,
                                reason: format!("unknown strategy prefix '{}'", head),
                            })?;
                    (strategy, tail.trim())
                }
                _ => (Strategy::Xpath, rest),
            };

            if value.is_empty() {
                return Err(RigError::RegistryLoad {
                    line: line_no,
                    reason: format!("missing value after strategy prefix for '{}'", key),
                });
            }

            let entry = LocatorEntry {
                key: key.to_string(),
                strategy,
                value: value.to_string(),
            };

            if entries.insert(key.to_string(), entry).is_some() {
                return Err(RigError::RegistryLoad {
                    line: line_no,
                    reason: format!("duplicate key '{}'", key),
                });
            }
        }

        Ok(Self { entries })
    }

    pub fn resolve(&self, key: &str) -> Result<&LocatorEntry> {
        self.entries
            .get(key)
            .ok_or_else(|| RigError::UnknownLocator(key.to_string()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn entries(&self) -> impl Iterator<Item = &LocatorEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_prefixed_strategies() {
        let registry = LocatorRegistry::parse(
            "submitBtn=id:go\nuserField=name:username\nheader=css:.site-header\nrow=xpath://tr[1]",
        )
        .unwrap();

        let entry = registry.resolve("submitBtn").unwrap();
        assert_eq!(entry.strategy, Strategy::Id);
        assert_eq!(entry.value, "go");

        assert_eq!(
            registry.resolve("userField").unwrap().strategy,
            Strategy::Name
        );
        assert_eq!(registry.resolve("header").unwrap().strategy, Strategy::Css);
        assert_eq!(registry.resolve("row").unwrap().value, "//tr[1]");
    }

    #[test]
    fn test_parse_defaults_to_xpath() {
        let registry = LocatorRegistry::parse("loginLink=//a[@href='/login']").unwrap();
        let entry = registry.resolve("loginLink").unwrap();
        assert_eq!(entry.strategy, Strategy::Xpath);
        assert_eq!(entry.value, "//a[@href='/login']");
    }

    #[test]
    fn test_parse_xpath_with_colon_in_value() {
        // The head before ':' is not alphabetic, so no prefix is assumed.
        let registry = LocatorRegistry::parse("extLink=//a[@href='http://example.com']").unwrap();
        let entry = registry.resolve("extLink").unwrap();
        assert_eq!(entry.strategy, Strategy::Xpath);
        assert_eq!(entry.value, "//a[@href='http://example.com']");
    }

    #[test]
    fn test_parse_skips_comments_and_blanks() {
        let registry =
            LocatorRegistry::parse("# locators\n\n! legacy comment\nsubmitBtn=id:go\n").unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_parse_unknown_strategy_prefix() {
        let err = LocatorRegistry::parse("bad=data:stuff").unwrap_err();
        match err {
            RigError::RegistryLoad { line, reason } => {
                assert_eq!(line, 1);
                assert!(reason.contains("data"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_parse_missing_value() {
        assert!(LocatorRegistry::parse("empty=").is_err());
        assert!(LocatorRegistry::parse("prefixOnly=id:").is_err());
        assert!(LocatorRegistry::parse("no-equals-here").is_err());
    }

    #[test]
    fn test_parse_duplicate_key() {
        let err = LocatorRegistry::parse("a=id:one\na=id:two").unwrap_err();
        match err {
            RigError::RegistryLoad { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_resolve_unknown_key() {
        let registry = LocatorRegistry::parse("submitBtn=id:go").unwrap();
        match registry.resolve("missing").unwrap_err() {
            RigError::UnknownLocator(key) => assert_eq!(key, "missing"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let registry = LocatorRegistry::parse("submitBtn=id:go").unwrap();
        let first = registry.resolve("submitBtn").unwrap().clone();
        for _ in 0..10 {
            assert_eq!(registry.resolve("submitBtn").unwrap(), &first);
        }
    }

    #[test]
    fn test_selector_rendering() {
        let registry =
            LocatorRegistry::parse("a=id:go\nb=name:user\nc=css:.btn\nd=//div").unwrap();
        assert_eq!(
            registry.resolve("a").unwrap().selector(),
            Selector::Css("#go".into())
        );
        assert_eq!(
            registry.resolve("b").unwrap().selector(),
            Selector::Css("[name='user']".into())
        );
        assert_eq!(
            registry.resolve("c").unwrap().selector(),
            Selector::Css(".btn".into())
        );
        assert_eq!(
            registry.resolve("d").unwrap().selector(),
            Selector::Xpath("//div".into())
        );
    }
}
