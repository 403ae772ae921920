use regex::Regex;

/// Something an import matcher found on a line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportMatch {
    /// A literal module specifier, e.g. `lodash/fp` or `./utils`
    Static(String),
    /// An import whose target is computed at runtime
    Dynamic(String),
}

/// Extracts module references from one line of source.
///
/// The scanner only depends on this trait, so a parser-backed matcher can
/// replace the regex one without touching analysis or transactions.
pub trait ImportMatcher: Send + Sync {
    fn match_line(&self, line: &str) -> Vec<ImportMatch>;
}

/// Regex-based matcher for ES module and CommonJS syntax.
///
/// Recognised: `... from 'x'`, `import 'x'`, `require('x')`,
/// `require.resolve('x')` and `import('x')`. Arguments built at runtime
/// (`require(name)`, `` import(`./${x}`) ``) are reported as dynamic and
/// never resolved.
pub struct RegexImportMatcher {
    static_patterns: Vec<Regex>,
    dynamic_pattern: Regex,
}

const STATIC_PATTERNS: &[&str] = &[
    r#"\bfrom\s*['"`]([^'"`\s$]+)['"`]"#,
    r#"^\s*import\s*['"`]([^'"`\s$]+)['"`]"#,
    r#"\brequire(?:\.resolve)?\s*\(\s*['"`]([^'"`\s$]+)['"`]\s*\)"#,
    r#"\bimport\s*\(\s*['"`]([^'"`\s$]+)['"`]\s*\)"#,
];

const DYNAMIC_PATTERN: &str = r#"\b(?:require|import)\s*\(\s*(?:[^'"`\s)]|`[^`]*\$\{)"#;

impl RegexImportMatcher {
    pub fn new() -> Self {
        Self::with_patterns(STATIC_PATTERNS, DYNAMIC_PATTERN)
            .expect("built-in import patterns are valid")
    }

    /// Build from custom patterns; each static pattern captures the specifier in group 1
    pub fn with_patterns(static_patterns: &[&str], dynamic_pattern: &str) -> Result<Self, regex::Error> {
        let static_patterns = static_patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            static_patterns,
            dynamic_pattern: Regex::new(dynamic_pattern)?,
        })
    }
}

impl Default for RegexImportMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ImportMatcher for RegexImportMatcher {
    fn match_line(&self, line: &str) -> Vec<ImportMatch> {
        let mut matches = Vec::new();

        for pattern in &self.static_patterns {
            for caps in pattern.captures_iter(line) {
                if let Some(specifier) = caps.get(1) {
                    matches.push(ImportMatch::Static(specifier.as_str().to_string()));
                }
            }
        }

        for m in self.dynamic_pattern.find_iter(line) {
            matches.push(ImportMatch::Dynamic(m.as_str().to_string()));
        }

        matches
    }
}

/// Reduce a module specifier to the package that provides it.
///
/// `lodash/fp` -> `lodash`, `@scope/pkg/sub` -> `@scope/pkg`. Relative and
/// absolute paths, `node:`-style URLs and bundler aliases (`~/x`, `@/x`)
/// are not packages and yield `None`.
pub fn package_name(specifier: &str) -> Option<String> {
    if specifier.is_empty()
        || specifier.starts_with('.')
        || specifier.starts_with('/')
        || specifier.starts_with('~')
        || specifier.contains(':')
    {
        return None;
    }

    let mut segments = specifier.split('/');
    let first = segments.next()?;

    if let Some(scope) = first.strip_prefix('@') {
        let name = segments.next()?;
        if scope.is_empty() || name.is_empty() {
            return None;
        }
        return Some(format!("{}/{}", first, name));
    }

    Some(first.to_string())
}
