//! Version specifications for parent references.
//!
//! A parent version is either a soft requirement (a literal like `1.5`) or
//! a bracket range like `[1.0,2.0)`. Soft requirements carry no
//! restrictions; ranges restrict which resolved parent versions are
//! acceptable.

use semver::Version;
use thiserror::Error;

/// Error parsing a version specification.
#[derive(Debug, Error)]
#[error("invalid version specification `{spec}`: {reason}")]
pub struct VersionSpecError {
    pub spec: String,
    pub reason: String,
}

impl VersionSpecError {
    fn new(spec: &str, reason: impl Into<String>) -> Self {
        VersionSpecError {
            spec: spec.to_string(),
            reason: reason.into(),
        }
    }
}

/// One bound of a range restriction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bound {
    pub version: Version,
    pub inclusive: bool,
}

/// A single `[lower,upper]`-style restriction. Either bound may be open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Restriction {
    pub lower: Option<Bound>,
    pub upper: Option<Bound>,
}

impl Restriction {
    fn contains(&self, version: &Version) -> bool {
        if let Some(lower) = &self.lower {
            let ok = if lower.inclusive {
                *version >= lower.version
            } else {
                *version > lower.version
            };
            if !ok {
                return false;
            }
        }
        if let Some(upper) = &self.upper {
            let ok = if upper.inclusive {
                *version <= upper.version
            } else {
                *version < upper.version
            };
            if !ok {
                return false;
            }
        }
        true
    }
}

/// A parsed version specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSpec {
    /// A literal recommended version, e.g. `1.5`. Matches anything; version
    /// skew against a soft requirement is the caller's policy.
    Soft(String),

    /// One or more bracket ranges, e.g. `[1.0,2.0)` or `[1.0],[2.0,)`.
    Range(Vec<Restriction>),
}

impl VersionSpec {
    /// Parse a version specification string.
    pub fn parse(spec: &str) -> Result<Self, VersionSpecError> {
        let trimmed = spec.trim();
        if !trimmed.starts_with('[') && !trimmed.starts_with('(') {
            return Ok(VersionSpec::Soft(trimmed.to_string()));
        }

        let mut restrictions = Vec::new();
        let mut rest = trimmed;
        while !rest.is_empty() {
            let open = rest.chars().next().filter(|c| *c == '[' || *c == '(');
            let open = match open {
                Some(c) => c,
                None => return Err(VersionSpecError::new(spec, "expected `[` or `(`")),
            };
            let close = rest
                .find([']', ')'])
                .ok_or_else(|| VersionSpecError::new(spec, "unbalanced range bracket"))?;
            let close_char = rest.as_bytes()[close] as char;
            let body = &rest[1..close];
            restrictions.push(parse_restriction(spec, body, open == '[', close_char == ']')?);

            rest = rest[close + 1..].trim_start();
            if let Some(tail) = rest.strip_prefix(',') {
                rest = tail.trim_start();
                if rest.is_empty() {
                    return Err(VersionSpecError::new(spec, "trailing comma"));
                }
            } else if !rest.is_empty() {
                return Err(VersionSpecError::new(spec, "expected `,` between ranges"));
            }
        }

        if restrictions.is_empty() {
            return Err(VersionSpecError::new(spec, "empty specification"));
        }

        Ok(VersionSpec::Range(restrictions))
    }

    /// Whether this specification restricts acceptable versions at all.
    pub fn has_restrictions(&self) -> bool {
        matches!(self, VersionSpec::Range(_))
    }

    /// Whether a concrete version satisfies this specification.
    ///
    /// Soft requirements accept any version; ranges accept a version iff
    /// some restriction contains it.
    pub fn contains(&self, version: &Version) -> bool {
        match self {
            VersionSpec::Soft(_) => true,
            VersionSpec::Range(restrictions) => restrictions.iter().any(|r| r.contains(version)),
        }
    }

    /// Parse a version string and test it against this specification.
    /// Unparseable versions never match a range.
    pub fn contains_str(&self, version: &str) -> bool {
        match self {
            VersionSpec::Soft(_) => true,
            VersionSpec::Range(_) => match parse_version_lenient(version) {
                Some(v) => self.contains(&v),
                None => false,
            },
        }
    }
}

fn parse_restriction(
    spec: &str,
    body: &str,
    lower_inclusive: bool,
    upper_inclusive: bool,
) -> Result<Restriction, VersionSpecError> {
    if let Some(comma) = body.find(',') {
        let (low, high) = (body[..comma].trim(), body[comma + 1..].trim());
        let lower = parse_bound(spec, low, lower_inclusive)?;
        let upper = parse_bound(spec, high, upper_inclusive)?;
        if let (Some(l), Some(u)) = (&lower, &upper) {
            if l.version > u.version {
                return Err(VersionSpecError::new(spec, "lower bound exceeds upper bound"));
            }
        }
        Ok(Restriction { lower, upper })
    } else {
        // exact range like [1.0]
        let exact = body.trim();
        if exact.is_empty() {
            return Err(VersionSpecError::new(spec, "empty range"));
        }
        if !(lower_inclusive && upper_inclusive) {
            return Err(VersionSpecError::new(
                spec,
                "single-version range must be inclusive",
            ));
        }
        let version = parse_version_lenient(exact)
            .ok_or_else(|| VersionSpecError::new(spec, format!("unparseable version `{exact}`")))?;
        let bound = Bound {
            version,
            inclusive: true,
        };
        Ok(Restriction {
            lower: Some(bound.clone()),
            upper: Some(bound),
        })
    }
}

fn parse_bound(
    spec: &str,
    text: &str,
    inclusive: bool,
) -> Result<Option<Bound>, VersionSpecError> {
    if text.is_empty() {
        return Ok(None);
    }
    let version = parse_version_lenient(text)
        .ok_or_else(|| VersionSpecError::new(spec, format!("unparseable version `{text}`")))?;
    Ok(Some(Bound { version, inclusive }))
}

/// Parse a version string, allowing for incomplete versions like `1` or
/// `1.2`.
pub fn parse_version_lenient(s: &str) -> Option<Version> {
    if let Ok(v) = s.parse() {
        return Some(v);
    }

    let parts: Vec<&str> = s.split('.').collect();
    match parts.len() {
        1 => {
            let major: u64 = parts[0].parse().ok()?;
            Some(Version::new(major, 0, 0))
        }
        2 => {
            let major: u64 = parts[0].parse().ok()?;
            let minor: u64 = parts[1].parse().ok()?;
            Some(Version::new(major, minor, 0))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_soft_spec() {
        let spec = VersionSpec::parse("1.5").unwrap();
        assert!(!spec.has_restrictions());
        assert!(spec.contains(&Version::new(1, 5, 0)));
        assert!(spec.contains(&Version::new(9, 9, 9)));
    }

    #[test]
    fn test_half_open_range() {
        let spec = VersionSpec::parse("[1.0,2.0)").unwrap();
        assert!(spec.has_restrictions());
        assert!(spec.contains(&Version::new(1, 0, 0)));
        assert!(spec.contains(&Version::new(1, 5, 0)));
        assert!(!spec.contains(&Version::new(2, 0, 0)));
        assert!(!spec.contains(&Version::new(0, 9, 0)));
    }

    #[test]
    fn test_unbounded_ranges() {
        let spec = VersionSpec::parse("[1.5,)").unwrap();
        assert!(spec.contains(&Version::new(1, 5, 0)));
        assert!(spec.contains(&Version::new(100, 0, 0)));
        assert!(!spec.contains(&Version::new(1, 4, 9)));

        let spec = VersionSpec::parse("(,1.0]").unwrap();
        assert!(spec.contains(&Version::new(0, 1, 0)));
        assert!(spec.contains(&Version::new(1, 0, 0)));
        assert!(!spec.contains(&Version::new(1, 0, 1)));
    }

    #[test]
    fn test_exact_range() {
        let spec = VersionSpec::parse("[1.2]").unwrap();
        assert!(spec.contains(&Version::new(1, 2, 0)));
        assert!(!spec.contains(&Version::new(1, 2, 1)));
    }

    #[test]
    fn test_multiple_ranges() {
        let spec = VersionSpec::parse("[1.0,2.0),[3.0,4.0)").unwrap();
        assert!(spec.contains(&Version::new(1, 5, 0)));
        assert!(!spec.contains(&Version::new(2, 5, 0)));
        assert!(spec.contains(&Version::new(3, 5, 0)));
    }

    #[test]
    fn test_invalid_specs() {
        assert!(VersionSpec::parse("[1.0,2.0").is_err());
        assert!(VersionSpec::parse("[2.0,1.0]").is_err());
        assert!(VersionSpec::parse("[abc,2.0]").is_err());
        assert!(VersionSpec::parse("(1.0)").is_err());
    }

    #[test]
    fn test_contains_str() {
        let spec = VersionSpec::parse("[1.0,2.0)").unwrap();
        assert!(spec.contains_str("1.5"));
        assert!(!spec.contains_str("2.0"));
        assert!(!spec.contains_str("not-a-version"));
    }

    #[test]
    fn test_parse_version_lenient() {
        assert_eq!(parse_version_lenient("1"), Some(Version::new(1, 0, 0)));
        assert_eq!(parse_version_lenient("1.2"), Some(Version::new(1, 2, 0)));
        assert_eq!(parse_version_lenient("1.2.3"), Some(Version::new(1, 2, 3)));
        assert_eq!(parse_version_lenient("x"), None);
    }
}
