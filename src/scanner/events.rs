use super::matcher::{package_name, ImportMatch, ImportMatcher};
use crate::usage::{DynamicImport, UsageEvent};
use std::collections::VecDeque;
use std::iter::Enumerate;
use std::path::Path;
use std::str::Lines;

/// One item produced while walking a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    Usage(UsageEvent),
    Dynamic(DynamicImport),
}

/// Lazily yields findings for one file, line by line
pub struct UsageEvents<'a> {
    lines: Enumerate<Lines<'a>>,
    matcher: &'a dyn ImportMatcher,
    path: &'a Path,
    pending: VecDeque<Finding>,
}

impl<'a> UsageEvents<'a> {
    pub fn new(path: &'a Path, contents: &'a str, matcher: &'a dyn ImportMatcher) -> Self {
        Self {
            lines: contents.lines().enumerate(),
            matcher,
            path,
            pending: VecDeque::new(),
        }
    }

    /// Only the usage events, dropping dynamic import sites
    pub fn usages(self) -> impl Iterator<Item = UsageEvent> + 'a {
        self.filter_map(|finding| match finding {
            Finding::Usage(event) => Some(event),
            Finding::Dynamic(_) => None,
        })
    }
}

impl Iterator for UsageEvents<'_> {
    type Item = Finding;

    fn next(&mut self) -> Option<Finding> {
        loop {
            if let Some(finding) = self.pending.pop_front() {
                return Some(finding);
            }

            let (index, line) = self.lines.next()?;
            let line_number = index + 1;

            for m in self.matcher.match_line(line) {
                match m {
                    ImportMatch::Static(specifier) => {
                        if let Some(name) = package_name(&specifier) {
                            self.pending.push_back(Finding::Usage(UsageEvent {
                                dependency_name: name,
                                source_file: self.path.to_path_buf(),
                                line_number,
                            }));
                        }
                    }
                    ImportMatch::Dynamic(expression) => {
                        self.pending.push_back(Finding::Dynamic(DynamicImport {
                            source_file: self.path.to_path_buf(),
                            line_number,
                            expression,
                        }));
                    }
                }
            }
        }
    }
}
