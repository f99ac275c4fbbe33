//! Text to phoneme conversion backends.

use anyhow::Result;
use regex::Regex;
use std::sync::LazyLock;

use crate::phoneme_ids::Phoneme;

/// Text to phonemes, one inner vector per sentence.
///
/// Implementations wrap process-wide resources and are driven from one thread at a
/// time; the boundary layer serialises access.
pub trait Phonemizer: Send {
    /// One-time setup. `data_path` is forwarded verbatim from the host; an empty
    /// path selects the backend's built-in default.
    fn initialize(&mut self, data_path: &str) -> Result<()>;

    fn phonemize(&mut self, text: &str, voice: &str) -> Result<Vec<Vec<Phoneme>>>;
}

/// Uses the lowercased text itself as the phoneme sequence, one code point per
/// phoneme. Needs no data files, so `initialize` always succeeds.
#[derive(Debug, Default, Clone)]
pub struct CodepointPhonemizer;

impl Phonemizer for CodepointPhonemizer {
    fn initialize(&mut self, _data_path: &str) -> Result<()> {
        Ok(())
    }

    fn phonemize(&mut self, text: &str, _voice: &str) -> Result<Vec<Vec<Phoneme>>> {
        Ok(split_sentences(text)
            .into_iter()
            .map(|sentence| sentence.chars().flat_map(char::to_lowercase).collect())
            .collect())
    }
}

static SENTENCE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.?!]\s+").expect("sentence break pattern is a valid regex"));

const CLAUSE_PUNCTUATION: &[char] = &[',', ';', ':', '.', '?', '!'];

/// Split after `.`, `?` or `!` when followed by whitespace (or the end of the text).
/// Sentences are trimmed and empty ones dropped; the terminator stays with its sentence.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    for found in SENTENCE_BREAK.find_iter(text) {
        // the terminator is a single ASCII byte
        sentences.push(&text[start..found.start() + 1]);
        start = found.end();
    }
    sentences.push(&text[start..]);

    sentences
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Phonemes of one clause plus the punctuation that ended it in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    pub phonemes: String,
    pub terminator: Option<char>,
}

/// Clause punctuation at the end of a consumed span of source text.
pub fn clause_terminator(consumed: &str) -> Option<char> {
    consumed
        .trim_end()
        .chars()
        .last()
        .filter(|c| CLAUSE_PUNCTUATION.contains(c))
}

/// Walk `sentence` one clause at a time.
///
/// `step` receives the byte offset of the unread text and returns that clause's
/// phonemes (if any) with the offset after it, or `None` once the text is used up.
/// A step that yields no phonemes and leaves the offset unchanged ends the walk.
pub fn collect_clauses<F>(sentence: &str, mut step: F) -> Result<Vec<Clause>>
where
    F: FnMut(usize) -> Result<(Option<String>, Option<usize>)>,
{
    let mut clauses = Vec::new();
    let mut offset = Some(0);
    let mut consumed = 0;
    while let Some(start) = offset {
        let (phonemes, next) = step(start)?;
        let end = next.map_or(sentence.len(), |n| n.min(sentence.len()));
        match phonemes {
            Some(phonemes) => clauses.push(Clause {
                phonemes,
                terminator: sentence.get(consumed..end).and_then(clause_terminator),
            }),
            None if next == Some(start) => break,
            None => {}
        }
        consumed = end;
        offset = next;
    }
    Ok(clauses)
}

/// Join the clauses of one sentence into a phoneme sequence.
///
/// With `keep_punctuation` each clause is followed by its terminator; a pause
/// (`,` `;` `:`) or a clause break without punctuation is followed by a space.
pub fn assemble_clauses(clauses: &[Clause], keep_punctuation: bool) -> Vec<Phoneme> {
    let mut phonemes = Vec::new();
    for clause in clauses {
        let text = clause.phonemes.trim();
        let terminator = clause.terminator.filter(|_| keep_punctuation);
        if text.is_empty() && terminator.is_none() {
            continue;
        }
        phonemes.extend(text.chars());
        match terminator {
            Some(end @ ('.' | '?' | '!')) => phonemes.push(end),
            Some(pause) => phonemes.extend([pause, ' ']),
            None => phonemes.push(' '),
        }
    }
    while phonemes.last() == Some(&' ') {
        phonemes.pop();
    }
    phonemes
}
