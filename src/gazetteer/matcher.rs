//! Fuzzy lookup of free-text resort names against the gazetteer.

use super::normalize::normalize;
use crate::db::Resort;

/// Minimum similarity for a fuzzy match to be accepted.
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.85;

/// Score given when the candidate's words are a subset of a resort's.
const ABBREVIATION_SCORE: f64 = 0.9;

const SCORE_EPSILON: f64 = 1e-9;

/// Outcome of matching one candidate string.
#[derive(Debug, Clone, PartialEq)]
pub enum ResortMatch {
    Matched { resort: Resort, score: f64 },
    /// Several resorts matched the same abbreviated name equally well.
    Ambiguous { resorts: Vec<Resort> },
    Unmatched,
}

impl ResortMatch {
    pub fn resort(&self) -> Option<&Resort> {
        match self {
            ResortMatch::Matched { resort, .. } => Some(resort),
            ResortMatch::Ambiguous { .. } | ResortMatch::Unmatched => None,
        }
    }

    pub fn is_matched(&self) -> bool {
        self.resort().is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchKind {
    Exact,
    Abbreviation,
    Fuzzy,
}

struct Entry {
    resort: Resort,
    normalized: String,
    tokens: Vec<String>,
}

/// Matches candidate strings against a fixed resort set.
///
/// Resorts are normalized once up front; gazetteer order is the order of the
/// slice passed to [`ResortMatcher::new`].
pub struct ResortMatcher {
    entries: Vec<Entry>,
    threshold: f64,
}

impl ResortMatcher {
    pub fn new(resorts: Vec<Resort>, threshold: f64) -> Self {
        let entries = resorts
            .into_iter()
            .map(|resort| {
                let normalized = normalize(&resort.name);
                let tokens = sorted_tokens(&normalized);
                Entry {
                    resort,
                    normalized,
                    tokens,
                }
            })
            .collect();
        Self { entries, threshold }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Match a candidate as a whole name.
    pub fn match_candidate(&self, candidate: &str) -> ResortMatch {
        self.match_normalized(&normalize(candidate))
    }

    /// Match the longest run of words in `candidate` that names a resort.
    ///
    /// Free text carries words around the name ("Aspen Highlands powder
    /// day"), so word windows are tried from longest to shortest. At the first
    /// length with any match, one resort wins and several distinct resorts are
    /// ambiguous.
    pub fn match_within(&self, candidate: &str) -> ResortMatch {
        let normalized = normalize(candidate);
        let words: Vec<&str> = normalized.split_whitespace().collect();

        for size in (1..=words.len()).rev() {
            let mut matched: Vec<(Resort, f64)> = Vec::new();
            let mut ambiguous = None;
            for window in words.windows(size) {
                match self.match_normalized(&window.join(" ")) {
                    ResortMatch::Matched { resort, score } => {
                        if !matched.iter().any(|(seen, _)| seen.id == resort.id) {
                            matched.push((resort, score));
                        }
                    }
                    found @ ResortMatch::Ambiguous { .. } => {
                        ambiguous.get_or_insert(found);
                    }
                    ResortMatch::Unmatched => {}
                }
            }

            match matched.len() {
                0 => {
                    if let Some(found) = ambiguous {
                        return found;
                    }
                }
                1 => {
                    let (resort, score) = matched.remove(0);
                    return ResortMatch::Matched { resort, score };
                }
                _ => {
                    return ResortMatch::Ambiguous {
                        resorts: matched.into_iter().map(|(resort, _)| resort).collect(),
                    }
                }
            }
        }
        ResortMatch::Unmatched
    }

    fn match_normalized(&self, normalized: &str) -> ResortMatch {
        if normalized.is_empty() {
            return ResortMatch::Unmatched;
        }
        let tokens = sorted_tokens(normalized);

        let scored: Vec<(&Entry, f64, MatchKind)> = self
            .entries
            .iter()
            .filter_map(|entry| {
                let (score, kind) = score_entry(normalized, &tokens, entry)?;
                (score >= self.threshold).then_some((entry, score, kind))
            })
            .collect();

        if let Some((entry, _, _)) = scored.iter().find(|(_, _, kind)| *kind == MatchKind::Exact) {
            return ResortMatch::Matched {
                resort: entry.resort.clone(),
                score: 1.0,
            };
        }

        let best = scored.iter().map(|(_, score, _)| *score).fold(f64::MIN, f64::max);
        let top: Vec<&(&Entry, f64, MatchKind)> = scored
            .iter()
            .filter(|(_, score, _)| (best - score).abs() < SCORE_EPSILON)
            .collect();

        match top.as_slice() {
            [] => ResortMatch::Unmatched,
            [(entry, score, _)] => ResortMatch::Matched {
                resort: entry.resort.clone(),
                score: *score,
            },
            [first, ..] if top.iter().all(|(_, _, kind)| *kind == MatchKind::Fuzzy) => {
                ResortMatch::Matched {
                    resort: first.0.resort.clone(),
                    score: first.1,
                }
            }
            _ => ResortMatch::Ambiguous {
                resorts: top.iter().map(|(entry, _, _)| entry.resort.clone()).collect(),
            },
        }
    }

    /// Match candidates in order with [`ResortMatcher::match_within`]; the
    /// first confident match wins.
    ///
    /// Falls back to the first ambiguity seen so callers can report it.
    pub fn match_any(&self, candidates: &[String]) -> ResortMatch {
        let mut ambiguous = None;
        for candidate in candidates {
            match self.match_within(candidate) {
                matched @ ResortMatch::Matched { .. } => return matched,
                found @ ResortMatch::Ambiguous { .. } => {
                    ambiguous.get_or_insert(found);
                }
                ResortMatch::Unmatched => {}
            }
        }
        ambiguous.unwrap_or(ResortMatch::Unmatched)
    }
}

fn score_entry(normalized: &str, tokens: &[String], entry: &Entry) -> Option<(f64, MatchKind)> {
    if entry.normalized.is_empty() {
        return None;
    }
    if entry.normalized == normalized {
        return Some((1.0, MatchKind::Exact));
    }

    if tokens.iter().all(|t| entry.tokens.contains(t)) {
        return Some((ABBREVIATION_SCORE, MatchKind::Abbreviation));
    }

    let similarity = strsim::normalized_levenshtein(&tokens.join(" "), &entry.tokens.join(" "));
    Some((similarity, MatchKind::Fuzzy))
}

fn sorted_tokens(normalized: &str) -> Vec<String> {
    let mut tokens: Vec<String> = normalized.split_whitespace().map(str::to_string).collect();
    tokens.sort();
    tokens.dedup();
    tokens
}
