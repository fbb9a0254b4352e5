//! Inclusion paths: which relationships the walker expands.
//!
//! An inclusion path is a dotted sequence of relationship field names
//! (member names, not wire keys), e.g. `countries.cities`. Callers either
//! write the string directly or describe the traversal with a [`Selector`].

use std::fmt;
use std::str::FromStr;

use crate::error::InclusionError;

/// Decides whether the relationship at `current` should be expanded for the
/// declared `inclusion` path.
///
/// `current` may be shorter than `inclusion` (intermediate nodes on the way
/// to a deep inclusion are expanded) but never longer.
///
/// ```
/// use jsonapi_codec::should_expand;
///
/// assert!(should_expand("countries", "countries.cities"));
/// assert!(should_expand("countries.cities", "countries.cities"));
/// assert!(!should_expand("countries.cities", "countries"));
/// assert!(!should_expand("continent", "countries"));
/// ```
pub fn should_expand(current: &str, inclusion: &str) -> bool {
    if current.is_empty() || inclusion.is_empty() {
        return false;
    }
    let mut declared = inclusion.split('.');
    for segment in current.split('.') {
        match declared.next() {
            Some(expected) if expected == segment => {}
            _ => return false,
        }
    }
    true
}

/// A validated, dotted inclusion path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InclusionPath {
    path: String,
}

impl InclusionPath {
    /// Parses a dotted path. Every segment must be non-empty.
    pub fn parse(path: &str) -> Result<Self, InclusionError> {
        if path.is_empty() {
            return Err(InclusionError::Empty);
        }
        if path.split('.').any(str::is_empty) {
            return Err(InclusionError::EmptySegment {
                path: path.to_owned(),
            });
        }
        Ok(Self {
            path: path.to_owned(),
        })
    }

    /// Builds a path from a selector.
    ///
    /// Field accesses contribute their name, a select over a collection
    /// contributes its source path followed by its body. Any method call
    /// other than a select is rejected.
    pub fn from_selector(selector: &Selector) -> Result<Self, InclusionError> {
        let mut segments = Vec::new();
        collect_segments(selector, &mut segments)?;
        if segments.is_empty() {
            return Err(InclusionError::Empty);
        }
        Ok(Self {
            path: segments.join("."),
        })
    }

    /// The dotted form.
    pub fn as_str(&self) -> &str {
        &self.path
    }

    /// Iterates the field names from root to leaf.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.path.split('.')
    }

    /// Returns true if the relationship at `current` should be expanded.
    pub fn matches(&self, current: &str) -> bool {
        should_expand(current, &self.path)
    }
}

fn collect_segments<'a>(
    selector: &'a Selector,
    segments: &mut Vec<&'a str>,
) -> Result<(), InclusionError> {
    match selector {
        Selector::Parameter => Ok(()),
        Selector::Field { target, name } => {
            collect_segments(target, segments)?;
            segments.push(name);
            Ok(())
        }
        Selector::Select { source, body } => {
            collect_segments(source, segments)?;
            collect_segments(body, segments)
        }
        Selector::Call { method, .. } => Err(InclusionError::InvalidExpression {
            construct: method.clone(),
        }),
    }
}

impl fmt::Display for InclusionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

impl FromStr for InclusionPath {
    type Err = InclusionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&Selector> for InclusionPath {
    type Error = InclusionError;

    fn try_from(selector: &Selector) -> Result<Self, Self::Error> {
        Self::from_selector(selector)
    }
}

/// A traversal over relationship fields, starting from the resource itself.
///
/// ```
/// use jsonapi_codec::{InclusionPath, Selector};
///
/// // continent => continent.countries.select(|country| country.cities)
/// let selector = Selector::root()
///     .field("countries")
///     .select(|country| country.field("cities"));
/// let path = InclusionPath::from_selector(&selector).unwrap();
/// assert_eq!(path.as_str(), "countries.cities");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// The value the traversal starts from.
    Parameter,
    /// Member access on `target`.
    Field { target: Box<Selector>, name: String },
    /// Projection of each element of the collection `source` through `body`.
    /// `body` starts from its own [`Selector::Parameter`].
    Select {
        source: Box<Selector>,
        body: Box<Selector>,
    },
    /// Any other method call (filtering, ordering, ...). Never a valid path.
    Call { target: Box<Selector>, method: String },
}

impl Selector {
    /// The traversal root.
    pub fn root() -> Self {
        Selector::Parameter
    }

    /// Follows field `name`.
    pub fn field(self, name: impl Into<String>) -> Self {
        Selector::Field {
            target: Box::new(self),
            name: name.into(),
        }
    }

    /// Projects each element of this collection.
    pub fn select(self, body: impl FnOnce(Selector) -> Selector) -> Self {
        Selector::Select {
            source: Box::new(self),
            body: Box::new(body(Selector::Parameter)),
        }
    }

    /// Calls an arbitrary method.
    pub fn call(self, method: impl Into<String>) -> Self {
        Selector::Call {
            target: Box::new(self),
            method: method.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_expand_laws() {
        assert!(should_expand("a", "a"));
        assert!(should_expand("a.b", "a.b.c"));
        assert!(!should_expand("a.b.c", "a.b"));
        assert!(!should_expand("a", ""));
        assert!(!should_expand("", "a"));
        assert!(!should_expand("a.c", "a.b.c"));
    }

    #[test]
    fn test_should_expand_compares_whole_segments() {
        assert!(!should_expand("country", "countries"));
        assert!(!should_expand("countries", "country.cities"));
    }

    #[test]
    fn test_parse_rejects_empty_segments() {
        assert_eq!(InclusionPath::parse(""), Err(InclusionError::Empty));
        assert!(matches!(
            InclusionPath::parse("countries..cities"),
            Err(InclusionError::EmptySegment { .. })
        ));
        assert!(matches!(
            InclusionPath::parse("countries."),
            Err(InclusionError::EmptySegment { .. })
        ));
        let path: InclusionPath = "countries.cities".parse().unwrap();
        assert_eq!(path.segments().collect::<Vec<_>>(), ["countries", "cities"]);
    }

    #[test]
    fn test_from_selector_direct_fields() {
        let selector = Selector::root().field("country").field("continent");
        let path = InclusionPath::from_selector(&selector).unwrap();
        assert_eq!(path.as_str(), "country.continent");
    }

    #[test]
    fn test_from_selector_nested_select() {
        let selector = Selector::root().field("countries").select(|country| {
            country
                .field("cities")
                .select(|city| city.field("country"))
        });
        let path = InclusionPath::try_from(&selector).unwrap();
        assert_eq!(path.to_string(), "countries.cities.country");
    }

    #[test]
    fn test_from_selector_rejects_calls() {
        let selector = Selector::root().field("countries").call("where");
        assert_eq!(
            InclusionPath::from_selector(&selector),
            Err(InclusionError::InvalidExpression {
                construct: "where".into()
            })
        );

        let inside = Selector::root()
            .field("countries")
            .select(|country| country.call("first"));
        assert!(InclusionPath::from_selector(&inside).is_err());
    }

    #[test]
    fn test_from_selector_root_only_is_empty() {
        assert_eq!(
            InclusionPath::from_selector(&Selector::root()),
            Err(InclusionError::Empty)
        );
    }
}
