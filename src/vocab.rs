//! Fixed character tables shared by the tashkeel tokenizer and decoder.
//!
//! Input ids are assigned in table order after the two reserved ids, output ids
//! index [`OUTPUT_VOCAB`] directly. Both must agree with the model the engine loads.

use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

pub const PAD_ID: i64 = 0;
pub const UNK_ID: i64 = 1;

/// Positional capacity of the tashkeel model, in characters.
pub const MAX_INPUT_CHARS: usize = 315;

const FATHATAN: char = '\u{064b}';
const DAMMATAN: char = '\u{064c}';
const KASRATAN: char = '\u{064d}';
const FATHA: char = '\u{064e}';
const DAMMA: char = '\u{064f}';
const KASRA: char = '\u{0650}';
const SHADDA: char = '\u{0651}';
const SUKUN: char = '\u{0652}';

pub static HARAKAT_CHARS: LazyLock<BTreeSet<char>> = LazyLock::new(|| {
    [FATHATAN, DAMMATAN, KASRATAN, FATHA, DAMMA, KASRA, SHADDA, SUKUN]
        .into_iter()
        .collect()
});

/// Output ids that must never be turned into inserted text.
pub static INVALID_HARAKA_IDS: LazyLock<BTreeSet<i64>> =
    LazyLock::new(|| [PAD_ID, UNK_ID].into_iter().collect());

/// Ids 0 and 1 are PAD and UNK, 2 is "no diacritic".
pub const OUTPUT_VOCAB: &[&[char]] = &[
    &[],
    &[],
    &[],
    &[FATHA],
    &[FATHATAN],
    &[DAMMA],
    &[DAMMATAN],
    &[KASRA],
    &[KASRATAN],
    &[SUKUN],
    &[SHADDA],
    &[SHADDA, FATHA],
    &[SHADDA, FATHATAN],
    &[SHADDA, DAMMA],
    &[SHADDA, DAMMATAN],
    &[SHADDA, KASRA],
    &[SHADDA, KASRATAN],
];

const PUNCTUATION: &str = " !\"'(),-.:;?«»،؛؟\u{0640}";
const DIGITS: &str = "0123456789٠١٢٣٤٥٦٧٨٩";

fn input_chars() -> impl Iterator<Item = char> {
    PUNCTUATION
        .chars()
        .chain(DIGITS.chars())
        .chain('\u{0621}'..='\u{063a}')
        .chain('\u{0641}'..='\u{064a}')
}

pub static INPUT_VOCAB: LazyLock<HashMap<char, i64>> = LazyLock::new(|| {
    input_chars()
        .enumerate()
        .map(|(i, c)| (c, i as i64 + UNK_ID + 1))
        .collect()
});

static INPUT_CHARS_BY_ID: LazyLock<HashMap<i64, char>> =
    LazyLock::new(|| INPUT_VOCAB.iter().map(|(&c, &id)| (id, c)).collect());

pub fn input_id(c: char) -> Option<i64> {
    INPUT_VOCAB.get(&c).copied()
}

/// Reverse of [`input_id`]. Reserved ids have no character.
pub fn input_char(id: i64) -> Option<char> {
    INPUT_CHARS_BY_ID.get(&id).copied()
}

/// Diacritics for an output id, or `None` when the id is reserved or out of range.
pub fn output_diacritics(id: i64) -> Option<&'static [char]> {
    if INVALID_HARAKA_IDS.contains(&id) {
        return None;
    }
    usize::try_from(id)
        .ok()
        .and_then(|i| OUTPUT_VOCAB.get(i))
        .copied()
}

pub fn is_haraka(c: char) -> bool {
    HARAKAT_CHARS.contains(&c)
}

/// Only Arabic letters carry harakat; digits, punctuation and tatweel never do.
pub fn accepts_harakat(c: char) -> bool {
    matches!(c, '\u{0621}'..='\u{063a}' | '\u{0641}'..='\u{064a}')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_ids_are_not_assigned_to_characters() {
        assert!(INPUT_VOCAB.values().all(|&id| id > UNK_ID));
        assert_eq!(input_char(PAD_ID), None);
        assert_eq!(input_char(UNK_ID), None);
    }

    #[test]
    fn input_ids_are_unique() {
        let ids: BTreeSet<i64> = INPUT_VOCAB.values().copied().collect();
        assert_eq!(ids.len(), INPUT_VOCAB.len());
        assert_eq!(INPUT_VOCAB.len(), input_chars().count());
    }

    #[test]
    fn harakat_are_not_input_characters() {
        for c in HARAKAT_CHARS.iter() {
            assert_eq!(input_id(*c), None, "{c:?}");
        }
    }

    #[test]
    fn invalid_ids_have_no_diacritics() {
        for id in INVALID_HARAKA_IDS.iter() {
            assert_eq!(output_diacritics(*id), None);
        }
        assert_eq!(output_diacritics(-3), None);
        assert_eq!(output_diacritics(OUTPUT_VOCAB.len() as i64), None);
        assert_eq!(output_diacritics(2), Some(&[][..]));
        assert_eq!(output_diacritics(11), Some(&[SHADDA, FATHA][..]));
    }

    #[test]
    fn output_vocab_only_contains_harakat() {
        assert!(OUTPUT_VOCAB.iter().flat_map(|d| d.iter()).all(|c| is_haraka(*c)));
    }

    #[test]
    fn only_letters_accept_harakat() {
        assert!(accepts_harakat('ب'));
        assert!(accepts_harakat('ي'));
        assert!(!accepts_harakat('\u{0640}'));
        assert!(!accepts_harakat('٣'));
        assert!(!accepts_harakat(' '));
        assert!(!accepts_harakat('a'));
    }
}
