//! npm-style version range matching.
//!
//! A range is a `||` union of comparator sets. Each set is a whitespace
//! separated list of comparators, a hyphen range (`1.2.3 - 2.0.0`), or sugar
//! (`^1.2`, `~1.2.3`, `1.x`) that desugars to comparators. `*` matches any
//! well-formed version, prereleases included.

use std::{cmp::Ordering, fmt::Display, str::FromStr};

use semver::{BuildMetadata, Prerelease, Version};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid version range {range:?}: {reason}")]
pub struct RangeError {
    range: String,
    reason: String,
}

impl RangeError {
    fn new(range: &str, reason: impl Into<String>) -> Self {
        Self {
            range: range.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Lt,
    Lte,
    Gt,
    Gte,
    Eq,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Comparator {
    op: Op,
    version: Version,
}

impl Comparator {
    fn new(op: Op, version: Version) -> Self {
        Self { op, version }
    }

    fn matches(&self, version: &Version) -> bool {
        let ordering = cmp_precedence(version, &self.version);
        match self.op {
            Op::Lt => ordering == Ordering::Less,
            Op::Lte => ordering != Ordering::Greater,
            Op::Gt => ordering == Ordering::Greater,
            Op::Gte => ordering != Ordering::Less,
            Op::Eq => ordering == Ordering::Equal,
        }
    }
}

/// A set of comparators that must all hold. `None` can never match.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ComparatorSet(Option<Vec<Comparator>>);

impl ComparatorSet {
    fn any() -> Self {
        Self(Some(Vec::new()))
    }

    fn none() -> Self {
        Self(None)
    }

    fn matches(&self, version: &Version) -> bool {
        let Some(comparators) = &self.0 else {
            return false;
        };
        if !comparators.iter().all(|comparator| comparator.matches(version)) {
            return false;
        }
        if version.pre.is_empty() || comparators.is_empty() {
            return true;
        }

        // A prerelease only satisfies a set that opts into prereleases of the
        // same release tuple.
        comparators.iter().any(|comparator| {
            !comparator.version.pre.is_empty()
                && comparator.version.major == version.major
                && comparator.version.minor == version.minor
                && comparator.version.patch == version.patch
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    sets: Vec<ComparatorSet>,
}

impl VersionRange {
    pub fn parse(range: &str) -> Result<Self, RangeError> {
        let sets = range
            .split("||")
            .map(|set| parse_set(range, set))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { sets })
    }

    pub fn matches(&self, version: &Version) -> bool {
        self.sets.iter().any(|set| set.matches(version))
    }

    /// Matches a raw version string; malformed versions never match.
    pub fn matches_str(&self, version: &str) -> bool {
        parse_version(version).is_some_and(|version| self.matches(&version))
    }
}

impl FromStr for VersionRange {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Does `installed` satisfy `range`? Malformed input on either side is a miss.
pub fn matches(installed: &str, range: &str) -> bool {
    VersionRange::parse(range).is_ok_and(|range| range.matches_str(installed))
}

/// Lenient version parsing: surrounding whitespace and a leading `v` or `=`
/// are tolerated.
pub fn parse_version(version: &str) -> Option<Version> {
    let version = version.trim();
    let version = version
        .strip_prefix('v')
        .or_else(|| version.strip_prefix('='))
        .unwrap_or(version);

    Version::parse(version.trim()).ok()
}

fn cmp_precedence(a: &Version, b: &Version) -> Ordering {
    a.major
        .cmp(&b.major)
        .then(a.minor.cmp(&b.minor))
        .then(a.patch.cmp(&b.patch))
        .then_with(|| a.pre.cmp(&b.pre))
}

fn parse_set(range: &str, set: &str) -> Result<ComparatorSet, RangeError> {
    let tokens = tokenize(set);

    if tokens.is_empty() {
        return Ok(ComparatorSet::any());
    }

    if tokens.len() == 3 && tokens[1] == "-" {
        let lower = Partial::parse(range, &tokens[0])?;
        let upper = Partial::parse(range, &tokens[2])?;
        return hyphen_range(range, &lower, &upper);
    }
    if tokens.iter().any(|token| *token == "-") {
        return Err(RangeError::new(range, "malformed hyphen range"));
    }

    let mut comparators = Vec::new();
    for token in &tokens {
        match desugar(range, token)? {
            Some(mut desugared) => comparators.append(&mut desugared),
            None => return Ok(ComparatorSet::none()),
        }
    }

    Ok(ComparatorSet(Some(comparators)))
}

/// Splits on whitespace, gluing a bare operator to the version after it so
/// `>= 1.2.3` reads like `>=1.2.3`.
fn tokenize(set: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    let mut pending: Option<String> = None;

    for word in set.split_whitespace() {
        if let Some(operator) = pending.take() {
            tokens.push(format!("{}{}", operator, word));
            continue;
        }
        if matches!(word, ">" | ">=" | "<" | "<=" | "=" | "~" | "^" | "~>") {
            pending = Some(word.to_string());
            continue;
        }
        tokens.push(word.to_string());
    }
    if let Some(operator) = pending {
        tokens.push(operator);
    }

    tokens
}

/// Turns one token into comparators. `None` means the token can never match.
fn desugar(range: &str, token: &str) -> Result<Option<Vec<Comparator>>, RangeError> {
    if let Some(rest) = token.strip_prefix("~>").or_else(|| token.strip_prefix('~')) {
        return tilde(range, &Partial::parse(range, rest)?).map(Some);
    }
    if let Some(rest) = token.strip_prefix('^') {
        return caret(range, &Partial::parse(range, rest)?).map(Some);
    }

    let (op, rest) = if let Some(rest) = token.strip_prefix(">=") {
        (Some(Op::Gte), rest)
    } else if let Some(rest) = token.strip_prefix("<=") {
        (Some(Op::Lte), rest)
    } else if let Some(rest) = token.strip_prefix('>') {
        (Some(Op::Gt), rest)
    } else if let Some(rest) = token.strip_prefix('<') {
        (Some(Op::Lt), rest)
    } else if let Some(rest) = token.strip_prefix('=') {
        (None, rest)
    } else {
        (None, token)
    };

    let partial = Partial::parse(range, rest)?;
    match op {
        None => x_range(range, &partial).map(Some),
        Some(op) => primitive(range, op, &partial),
    }
}

/// A version with optional trailing components, as written in a range.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Partial {
    major: Option<u64>,
    minor: Option<u64>,
    patch: Option<u64>,
    pre: Prerelease,
}

impl Partial {
    fn parse(range: &str, text: &str) -> Result<Self, RangeError> {
        let text = text.trim();
        let text = text.strip_prefix('v').unwrap_or(text);
        if text.is_empty() {
            return Err(RangeError::new(range, "missing version"));
        }

        let text = text.split_once('+').map_or(text, |(version, _)| version);
        let (core, pre) = match text.split_once('-') {
            Some((core, pre)) => {
                let pre = Prerelease::new(pre)
                    .map_err(|err| RangeError::new(range, err.to_string()))?;
                (core, pre)
            }
            None => (text, Prerelease::EMPTY),
        };

        let mut parts = core.split('.');
        let major = parse_component(range, parts.next())?;
        let minor = parse_component(range, parts.next())?;
        let patch = parse_component(range, parts.next())?;
        if parts.next().is_some() {
            return Err(RangeError::new(range, "too many version components"));
        }

        // Wildcards swallow everything after them.
        let (minor, patch) = match (major, minor) {
            (None, _) => (None, None),
            (_, None) => (None, None),
            _ => (minor, patch),
        };
        if patch.is_none() && !pre.is_empty() {
            return Err(RangeError::new(range, "prerelease on a partial version"));
        }

        Ok(Self {
            major,
            minor,
            patch,
            pre,
        })
    }

    fn floor(&self) -> Version {
        Version {
            major: self.major.unwrap_or(0),
            minor: self.minor.unwrap_or(0),
            patch: self.patch.unwrap_or(0),
            pre: self.pre.clone(),
            build: BuildMetadata::EMPTY,
        }
    }
}

fn parse_component(range: &str, part: Option<&str>) -> Result<Option<u64>, RangeError> {
    match part {
        None | Some("x") | Some("X") | Some("*") => Ok(None),
        Some(digits) => digits
            .parse::<u64>()
            .map(Some)
            .map_err(|_| RangeError::new(range, format!("invalid component {:?}", digits))),
    }
}

fn release(major: u64, minor: u64, patch: u64) -> Version {
    Version::new(major, minor, patch)
}

/// Next value of a component, for exclusive upper bounds.
fn bump(range: &str, component: u64) -> Result<u64, RangeError> {
    component
        .checked_add(1)
        .ok_or_else(|| RangeError::new(range, "version component too large"))
}

fn x_range(range: &str, partial: &Partial) -> Result<Vec<Comparator>, RangeError> {
    let comparators = match (partial.major, partial.minor, partial.patch) {
        (None, _, _) => Vec::new(),
        (Some(major), None, _) => vec![
            Comparator::new(Op::Gte, release(major, 0, 0)),
            Comparator::new(Op::Lt, release(bump(range, major)?, 0, 0)),
        ],
        (Some(major), Some(minor), None) => vec![
            Comparator::new(Op::Gte, release(major, minor, 0)),
            Comparator::new(Op::Lt, release(major, bump(range, minor)?, 0)),
        ],
        (Some(_), Some(_), Some(_)) => vec![Comparator::new(Op::Eq, partial.floor())],
    };

    Ok(comparators)
}

fn tilde(range: &str, partial: &Partial) -> Result<Vec<Comparator>, RangeError> {
    let comparators = match (partial.major, partial.minor) {
        (None, _) => Vec::new(),
        (Some(major), None) => vec![
            Comparator::new(Op::Gte, release(major, 0, 0)),
            Comparator::new(Op::Lt, release(bump(range, major)?, 0, 0)),
        ],
        (Some(major), Some(minor)) => vec![
            Comparator::new(Op::Gte, partial.floor()),
            Comparator::new(Op::Lt, release(major, bump(range, minor)?, 0)),
        ],
    };

    Ok(comparators)
}

fn caret(range: &str, partial: &Partial) -> Result<Vec<Comparator>, RangeError> {
    let Some(major) = partial.major else {
        return Ok(Vec::new());
    };
    let upper = match (major, partial.minor, partial.patch) {
        (0, None, _) => release(1, 0, 0),
        (0, Some(0), None) => release(0, 1, 0),
        (0, Some(0), Some(patch)) => release(0, 0, bump(range, patch)?),
        (0, Some(minor), _) => release(0, bump(range, minor)?, 0),
        (major, _, _) => release(bump(range, major)?, 0, 0),
    };

    Ok(vec![
        Comparator::new(Op::Gte, partial.floor()),
        Comparator::new(Op::Lt, upper),
    ])
}

fn primitive(
    range: &str,
    op: Op,
    partial: &Partial,
) -> Result<Option<Vec<Comparator>>, RangeError> {
    let Some(major) = partial.major else {
        return Ok(match op {
            Op::Gte | Op::Lte => Some(Vec::new()),
            _ => None,
        });
    };

    let comparator = match (op, partial.minor, partial.patch) {
        (_, Some(_), Some(_)) => Comparator::new(op, partial.floor()),
        (Op::Gt, None, _) => Comparator::new(Op::Gte, release(bump(range, major)?, 0, 0)),
        (Op::Gt, Some(minor), None) => {
            Comparator::new(Op::Gte, release(major, bump(range, minor)?, 0))
        }
        (Op::Lte, None, _) => Comparator::new(Op::Lt, release(bump(range, major)?, 0, 0)),
        (Op::Lte, Some(minor), None) => {
            Comparator::new(Op::Lt, release(major, bump(range, minor)?, 0))
        }
        (op, _, _) => Comparator::new(op, partial.floor()),
    };

    Ok(Some(vec![comparator]))
}

fn hyphen_range(
    range: &str,
    lower: &Partial,
    upper: &Partial,
) -> Result<ComparatorSet, RangeError> {
    let mut comparators = Vec::new();

    if lower.major.is_some() {
        comparators.push(Comparator::new(Op::Gte, lower.floor()));
    }

    match (upper.major, upper.minor, upper.patch) {
        (None, _, _) => {}
        (Some(major), None, _) => {
            comparators.push(Comparator::new(Op::Lt, release(bump(range, major)?, 0, 0)));
        }
        (Some(major), Some(minor), None) => {
            comparators.push(Comparator::new(Op::Lt, release(major, bump(range, minor)?, 0)));
        }
        (Some(_), Some(_), Some(_)) => {
            comparators.push(Comparator::new(Op::Lte, upper.floor()));
        }
    }

    Ok(ComparatorSet(Some(comparators)))
}

impl Display for VersionRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sets: Vec<String> = self
            .sets
            .iter()
            .map(|set| match &set.0 {
                None => "<0.0.0-0".to_string(),
                Some(comparators) if comparators.is_empty() => "*".to_string(),
                Some(comparators) => comparators
                    .iter()
                    .map(|comparator| {
                        let op = match comparator.op {
                            Op::Lt => "<",
                            Op::Lte => "<=",
                            Op::Gt => ">",
                            Op::Gte => ">=",
                            Op::Eq => "",
                        };
                        format!("{}{}", op, comparator.version)
                    })
                    .collect::<Vec<_>>()
                    .join(" "),
            })
            .collect();

        write!(f, "{}", sets.join(" || "))
    }
}
