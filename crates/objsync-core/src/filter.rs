//! Exclude/include path rules and per-path object attributes.

use regex::{Regex, RegexBuilder};

use crate::config::ContentTypeRule;
use crate::store::ObjectAttributes;

fn compile(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .unicode(true)
        .build()
}

/// A path is excluded when it matches `exclude` and does not match `include`.
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    exclude: Option<Regex>,
    include: Option<Regex>,
}

impl PathFilter {
    pub fn new(exclude: Option<&str>, include: Option<&str>) -> Result<Self, regex::Error> {
        Ok(Self {
            exclude: exclude.map(compile).transpose()?,
            include: include.map(compile).transpose()?,
        })
    }

    /// Match against a relative path (remote root already stripped for keys).
    pub fn is_excluded(&self, relative: &str) -> bool {
        let Some(exclude) = &self.exclude else {
            return false;
        };
        exclude.is_match(relative)
            && !self
                .include
                .as_ref()
                .is_some_and(|include| include.is_match(relative))
    }
}

/// Builds the [`ObjectAttributes`] attached to each uploaded object.
/// Content-type patterns are case-sensitive, unlike [`PathFilter`].
#[derive(Debug, Clone, Default)]
pub struct AttributeRules {
    content_types: Vec<(Regex, String)>,
    cache_control: Option<String>,
}

impl AttributeRules {
    pub fn new(rules: &[ContentTypeRule], cache_control: Option<String>) -> Result<Self, regex::Error> {
        let content_types = rules
            .iter()
            .map(|r| Ok((Regex::new(&r.pattern)?, r.content_type.clone())))
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(Self {
            content_types,
            cache_control,
        })
    }

    /// First matching content-type rule wins.
    pub fn attributes_for(&self, relative: &str) -> ObjectAttributes {
        ObjectAttributes {
            content_type: self
                .content_types
                .iter()
                .find(|(re, _)| re.is_match(relative))
                .map(|(_, ct)| ct.clone()),
            cache_control: self.cache_control.clone(),
            ..ObjectAttributes::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn include_overrides_exclude() {
        let f = PathFilter::new(Some(r".*\.tmp$"), Some(".*important.*")).unwrap();
        assert!(!f.is_excluded("a.important.tmp"));
        assert!(f.is_excluded("b.tmp"));
        assert!(!f.is_excluded("c.txt"));
    }

    #[test]
    fn matching_is_case_insensitive() {
        let f = PathFilter::new(Some(r"\.TMP$"), None).unwrap();
        assert!(f.is_excluded("dir/x.tmp"));
        assert!(f.is_excluded("dir/Ä.Tmp"));
    }

    #[test]
    fn include_alone_excludes_nothing() {
        let f = PathFilter::new(None, Some("keep")).unwrap();
        assert!(!f.is_excluded("anything"));
        assert!(!PathFilter::default().is_excluded("x"));
    }

    #[test]
    fn bad_pattern_is_an_error() {
        assert!(PathFilter::new(Some("("), None).is_err());
    }

    #[test]
    fn first_content_type_rule_wins() {
        let rules = vec![
            ContentTypeRule {
                pattern: r"\.html$".into(),
                content_type: "text/html".into(),
            },
            ContentTypeRule {
                pattern: r"index".into(),
                content_type: "application/octet-stream".into(),
            },
        ];
        let attrs = AttributeRules::new(&rules, Some("max-age=60".into())).unwrap();
        let a = attrs.attributes_for("site/index.html");
        assert_eq!(a.content_type.as_deref(), Some("text/html"));
        assert_eq!(a.cache_control.as_deref(), Some("max-age=60"));
        assert_eq!(
            attrs.attributes_for("site/index.htm").content_type.as_deref(),
            Some("application/octet-stream")
        );
        assert_eq!(attrs.attributes_for("img.png").content_type, None);
    }

    #[test]
    fn content_type_rules_are_case_sensitive() {
        let rules = vec![ContentTypeRule {
            pattern: r"\.html$".into(),
            content_type: "text/html".into(),
        }];
        let attrs = AttributeRules::new(&rules, None).unwrap();
        assert_eq!(attrs.attributes_for("site/INDEX.HTML").content_type, None);
        assert_eq!(
            attrs.attributes_for("site/index.html").content_type.as_deref(),
            Some("text/html")
        );
    }
}
