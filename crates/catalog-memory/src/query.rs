use std::collections::BTreeSet;

/// Running set of marketplace codes surviving the structural filters.
///
/// Unfilled until the first filter applies; that filter's matches replace
/// it and every later filter intersects.
#[derive(Debug, Default)]
pub struct CandidateSet {
    codes: Option<BTreeSet<String>>,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, matches: BTreeSet<String>) {
        self.codes = Some(match self.codes.take() {
            None => matches,
            Some(current) => current.intersection(&matches).cloned().collect(),
        });
    }

    pub fn is_filled(&self) -> bool {
        self.codes.is_some()
    }

    /// The surviving codes, or `all` when no filter ever applied.
    pub fn resolve<'a, I>(self, all: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        match self.codes {
            Some(codes) => codes,
            None => all.into_iter().map(str::to_string).collect(),
        }
    }
}
