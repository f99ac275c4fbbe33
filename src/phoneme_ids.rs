//! Phoneme to id encoding for piper-style acoustic models.

use log::warn;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use crate::error::{Error, Result};

/// A single phoneme is one Unicode code point.
pub type Phoneme = char;
pub type PhonemeId = i64;

/// espeak-ng IPA inventory used by piper voices.
const DEFAULT_PHONEME_IDS: &[(Phoneme, PhonemeId)] = &[
    ('_', 0), ('^', 1), ('$', 2), (' ', 3), ('!', 4), ('\'', 5), ('(', 6), (')', 7),
    (',', 8), ('-', 9), ('.', 10), (':', 11), (';', 12), ('?', 13), ('a', 14), ('b', 15),
    ('c', 16), ('d', 17), ('e', 18), ('f', 19), ('h', 20), ('i', 21), ('j', 22), ('k', 23),
    ('l', 24), ('m', 25), ('n', 26), ('o', 27), ('p', 28), ('q', 29), ('r', 30), ('s', 31),
    ('t', 32), ('u', 33), ('v', 34), ('w', 35), ('x', 36), ('y', 37), ('z', 38), ('æ', 39),
    ('ç', 40), ('ð', 41), ('ø', 42), ('ħ', 43), ('ŋ', 44), ('œ', 45), ('ǀ', 46), ('ǁ', 47),
    ('ǂ', 48), ('ǃ', 49), ('ɐ', 50), ('ɑ', 51), ('ɒ', 52), ('ɓ', 53), ('ɔ', 54), ('ɕ', 55),
    ('ɖ', 56), ('ɗ', 57), ('ɘ', 58), ('ə', 59), ('ɚ', 60), ('ɛ', 61), ('ɜ', 62), ('ɞ', 63),
    ('ɟ', 64), ('ɠ', 65), ('ɡ', 66), ('ɢ', 67), ('ɣ', 68), ('ɤ', 69), ('ɥ', 70), ('ɦ', 71),
    ('ɧ', 72), ('ɨ', 73), ('ɪ', 74), ('ɫ', 75), ('ɬ', 76), ('ɭ', 77), ('ɮ', 78), ('ɯ', 79),
    ('ɰ', 80), ('ɱ', 81), ('ɲ', 82), ('ɳ', 83), ('ɴ', 84), ('ɵ', 85), ('ɶ', 86), ('ɸ', 87),
    ('ɹ', 88), ('ɺ', 89), ('ɻ', 90), ('ɽ', 91), ('ɾ', 92), ('ʀ', 93), ('ʁ', 94), ('ʂ', 95),
    ('ʃ', 96), ('ʄ', 97), ('ʈ', 98), ('ʉ', 99), ('ʊ', 100), ('ʋ', 101), ('ʌ', 102),
    ('ʍ', 103), ('ʎ', 104), ('ʏ', 105), ('ʐ', 106), ('ʑ', 107), ('ʒ', 108), ('ʔ', 109),
    ('ʕ', 110), ('ʘ', 111), ('ʙ', 112), ('ʛ', 113), ('ʜ', 114), ('ʝ', 115), ('ʟ', 116),
    ('ʡ', 117), ('ʢ', 118), ('ʲ', 119), ('ˈ', 120), ('ˌ', 121), ('ː', 122), ('ˑ', 123),
    ('˞', 124), ('β', 125), ('θ', 126), ('χ', 127), ('ᵻ', 128), ('ⱱ', 129), ('0', 130),
    ('1', 131), ('2', 132), ('3', 133), ('4', 134), ('5', 135), ('6', 136), ('7', 137),
    ('8', 138), ('9', 139), ('\u{0327}', 140), ('\u{0303}', 141), ('\u{032a}', 142),
    ('\u{032f}', 143), ('\u{0329}', 144), ('ʰ', 145), ('ˤ', 146), ('ε', 147), ('↓', 148),
    ('#', 149), ('"', 150), ('↑', 151), ('\u{033a}', 152), ('\u{033b}', 153),
];

static DEFAULT_MAP: LazyLock<PhonemeIdMap> = LazyLock::new(|| PhonemeIdMap {
    ids: DEFAULT_PHONEME_IDS
        .iter()
        .map(|&(phoneme, id)| (phoneme, vec![id]))
        .collect(),
});

/// Symbol table from phoneme to one or more ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhonemeIdMap {
    ids: HashMap<Phoneme, Vec<PhonemeId>>,
}

impl Default for PhonemeIdMap {
    fn default() -> Self {
        DEFAULT_MAP.clone()
    }
}

#[derive(Deserialize)]
struct VoiceConfig {
    phoneme_id_map: HashMap<String, Vec<PhonemeId>>,
}

impl PhonemeIdMap {
    pub fn new(ids: HashMap<Phoneme, Vec<PhonemeId>>) -> Self {
        Self { ids }
    }

    /// Read the `phoneme_id_map` section of a piper voice config (`*.onnx.json`).
    pub fn from_voice_config_json(json: &str) -> Result<Self> {
        let config: VoiceConfig = serde_json::from_str(json)?;
        let mut ids = HashMap::with_capacity(config.phoneme_id_map.len());
        for (key, value) in config.phoneme_id_map {
            let mut chars = key.chars();
            match (chars.next(), chars.next()) {
                (Some(phoneme), None) => {
                    ids.insert(phoneme, value);
                }
                _ => {
                    return Err(Error::InvalidArgument(format!(
                        "phoneme id map key {key:?} is not a single code point"
                    )));
                }
            }
        }
        Ok(Self { ids })
    }

    pub fn get(&self, phoneme: Phoneme) -> Option<&[PhonemeId]> {
        self.ids.get(&phoneme).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// What to do with a phoneme that has no entry in the map.
/// Every miss is counted in [`EncodedPhonemes::missing`] whatever the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingPhonemePolicy {
    #[default]
    Skip,
    Substitute(PhonemeId),
    Abort,
}

#[derive(Debug, Clone)]
pub struct PhonemeIdConfig {
    pub pad: Phoneme,
    pub bos: Phoneme,
    pub eos: Phoneme,
    /// Insert the pad id after every phoneme (and after BOS).
    pub intersperse_pad: bool,
    pub add_bos: bool,
    pub add_eos: bool,
    pub missing_policy: MissingPhonemePolicy,
}

impl Default for PhonemeIdConfig {
    fn default() -> Self {
        Self {
            pad: '_',
            bos: '^',
            eos: '$',
            intersperse_pad: true,
            add_bos: true,
            add_eos: true,
            missing_policy: MissingPhonemePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodedPhonemes {
    pub ids: Vec<PhonemeId>,
    /// Number of input phonemes found in the map.
    pub mapped: usize,
    pub missing: BTreeMap<Phoneme, usize>,
}

impl EncodedPhonemes {
    pub fn missing_count(&self) -> usize {
        self.missing.values().sum()
    }
}

/// Concatenate per-sentence phonemes. Sentence boundaries are not kept; callers
/// that need sentence alignment must encode each sentence separately.
pub fn flatten_sentences(sentences: Vec<Vec<Phoneme>>) -> Vec<Phoneme> {
    sentences.into_iter().flatten().collect()
}

fn special_ids(map: &PhonemeIdMap, phoneme: Phoneme) -> Result<&[PhonemeId]> {
    map.get(phoneme).ok_or_else(|| {
        Error::InvalidArgument(format!("phoneme id map has no entry for {phoneme:?}"))
    })
}

/// Encode phonemes into ids, framed with BOS/EOS and interspersed padding.
///
/// An empty phoneme sequence encodes to no ids at all, without framing.
pub fn phonemes_to_ids(
    phonemes: &[Phoneme],
    config: &PhonemeIdConfig,
    map: &PhonemeIdMap,
) -> Result<EncodedPhonemes> {
    let mut encoded = EncodedPhonemes::default();
    if phonemes.is_empty() {
        return Ok(encoded);
    }

    let pad: &[PhonemeId] = if config.intersperse_pad {
        special_ids(map, config.pad)?
    } else {
        &[]
    };

    if config.add_bos {
        encoded.ids.extend_from_slice(special_ids(map, config.bos)?);
        encoded.ids.extend_from_slice(pad);
    }

    for &phoneme in phonemes {
        match map.get(phoneme) {
            Some(ids) => {
                encoded.ids.extend_from_slice(ids);
                encoded.ids.extend_from_slice(pad);
                encoded.mapped += 1;
            }
            None => {
                *encoded.missing.entry(phoneme).or_default() += 1;
                match config.missing_policy {
                    MissingPhonemePolicy::Skip => {}
                    MissingPhonemePolicy::Substitute(id) => {
                        encoded.ids.push(id);
                        encoded.ids.extend_from_slice(pad);
                    }
                    MissingPhonemePolicy::Abort => return Err(Error::MissingPhoneme(phoneme)),
                }
            }
        }
    }

    if config.add_eos {
        encoded.ids.extend_from_slice(special_ids(map, config.eos)?);
    }

    if !encoded.missing.is_empty() {
        warn!(
            "{} phoneme(s) missing from the id map: {:?}",
            encoded.missing_count(),
            encoded.missing
        );
    }
    Ok(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(text: &str, config: &PhonemeIdConfig) -> Result<EncodedPhonemes> {
        let phonemes: Vec<Phoneme> = text.chars().collect();
        phonemes_to_ids(&phonemes, config, &PhonemeIdMap::default())
    }

    #[test]
    fn test_default_framing() {
        let encoded = encode("hi", &PhonemeIdConfig::default()).unwrap();
        assert_eq!(encoded.ids, vec![1, 0, 20, 0, 21, 0, 2]);
        assert_eq!(encoded.mapped, 2);
        assert!(encoded.missing.is_empty());
    }

    #[test]
    fn test_no_framing() {
        let config = PhonemeIdConfig {
            intersperse_pad: false,
            add_bos: false,
            add_eos: false,
            ..Default::default()
        };
        assert_eq!(encode("həˈloʊ", &config).unwrap().ids, vec![20, 59, 120, 24, 27, 100]);
    }

    #[test]
    fn test_empty_input_has_no_ids() {
        let encoded = encode("", &PhonemeIdConfig::default()).unwrap();
        assert!(encoded.ids.is_empty());
        assert_eq!(encoded.mapped, 0);
    }

    #[test]
    fn test_missing_phonemes_are_skipped_and_counted() {
        let encoded = encode("aЖbЖ", &PhonemeIdConfig::default()).unwrap();
        assert_eq!(encoded.ids, vec![1, 0, 14, 0, 15, 0, 2]);
        assert_eq!(encoded.missing, BTreeMap::from([('Ж', 2)]));
    }

    #[test]
    fn test_missing_phonemes_substituted() {
        let config = PhonemeIdConfig {
            missing_policy: MissingPhonemePolicy::Substitute(3),
            ..Default::default()
        };
        let encoded = encode("aЖ", &config).unwrap();
        assert_eq!(encoded.ids, vec![1, 0, 14, 0, 3, 0, 2]);
        assert_eq!(encoded.missing_count(), 1);
    }

    #[test]
    fn test_missing_phoneme_aborts() {
        let config = PhonemeIdConfig {
            missing_policy: MissingPhonemePolicy::Abort,
            ..Default::default()
        };
        assert!(matches!(encode("aЖ", &config), Err(Error::MissingPhoneme('Ж'))));
    }

    #[test]
    fn test_every_phoneme_is_accounted_for() {
        for text in ["", "a", "ЖЖЖ", "hello wörld ☃", "ˈʃɪp ʃɑp!"] {
            let encoded = encode(text, &PhonemeIdConfig::default()).unwrap();
            assert_eq!(
                encoded.mapped + encoded.missing_count(),
                text.chars().count(),
                "{text:?}"
            );
        }
    }

    #[test]
    fn test_multi_id_phonemes() {
        let map = PhonemeIdMap::new(HashMap::from([
            ('_', vec![0]),
            ('^', vec![1]),
            ('$', vec![2]),
            ('a', vec![7, 8]),
        ]));
        let encoded = phonemes_to_ids(&['a'], &PhonemeIdConfig::default(), &map).unwrap();
        assert_eq!(encoded.ids, vec![1, 0, 7, 8, 0, 2]);
    }

    #[test]
    fn test_framing_symbol_missing_from_map() {
        let map = PhonemeIdMap::new(HashMap::from([('a', vec![7])]));
        let err = phonemes_to_ids(&['a'], &PhonemeIdConfig::default(), &map).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_flatten_drops_sentence_boundaries() {
        let flat = flatten_sentences(vec![vec!['a', '.'], vec![], vec!['b']]);
        assert_eq!(flat, vec!['a', '.', 'b']);
    }

    #[test]
    fn test_voice_config() {
        let json = r#"{
            "audio": {"sample_rate": 22050},
            "phoneme_id_map": {"_": [0], "^": [1], "$": [2], "ə": [59, 60]}
        }"#;
        let map = PhonemeIdMap::from_voice_config_json(json).unwrap();
        assert_eq!(map.len(), 4);
        assert_eq!(map.get('ə'), Some(&[59, 60][..]));

        let bad = r#"{"phoneme_id_map": {"ab": [3]}}"#;
        assert!(matches!(
            PhonemeIdMap::from_voice_config_json(bad),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            PhonemeIdMap::from_voice_config_json("{}"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_default_map_has_unique_entries() {
        assert_eq!(PhonemeIdMap::default().len(), DEFAULT_PHONEME_IDS.len());
    }
}
