//! Arabic diacritization (tashkeel) on top of a character-level sequence model.
//!
//! Existing harakat are always stripped: the model is the only source of the
//! diacritics in the output. Each remaining character becomes one input id and
//! receives exactly one predicted output id.

use log::{debug, warn};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{Error, Result};
use crate::model::{InferenceBackend, OrtBackend};
use crate::vocab::{self, MAX_INPUT_CHARS, PAD_ID, UNK_ID};

/// What to do with stripped text longer than [`MAX_INPUT_CHARS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LengthPolicy {
    /// Fail with [`Error::InputTooLong`].
    Reject,
    /// Run the model once per window of at most `MAX_INPUT_CHARS` characters.
    /// A window ends after its last whitespace when it has one, otherwise at the bound.
    #[default]
    Chunk,
}

#[derive(Debug, Clone, Default)]
pub struct TashkeelOptions {
    pub length_policy: LengthPolicy,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tokenized {
    pub ids: Vec<i64>,
    /// Characters replaced by `UNK_ID`, with occurrence counts.
    pub unknown: BTreeMap<char, usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diacritized {
    pub text: String,
    pub unknown: BTreeMap<char, usize>,
}

pub struct Tashkeel {
    backend: Box<dyn InferenceBackend>,
    options: TashkeelOptions,
}

impl Tashkeel {
    /// Open an ONNX model with default options.
    pub fn load(model_path: impl AsRef<Path>) -> Result<Self> {
        let model_path = model_path.as_ref();
        let backend = OrtBackend::new(model_path).map_err(|source| Error::Load {
            path: model_path.to_path_buf(),
            source,
        })?;
        debug!("loaded tashkeel model from {}", model_path.display());
        Ok(Self::with_backend(Box::new(backend), TashkeelOptions::default()))
    }

    pub fn with_backend(backend: Box<dyn InferenceBackend>, options: TashkeelOptions) -> Self {
        Self { backend, options }
    }

    pub fn options(&self) -> &TashkeelOptions {
        &self.options
    }

    pub fn diacritize(&mut self, text: &str) -> Result<String> {
        Ok(self.run(text)?.text)
    }

    pub fn run(&mut self, text: &str) -> Result<Diacritized> {
        let stripped: Vec<char> = strip_harakat(text).chars().collect();
        let mut result = Diacritized::default();
        if stripped.is_empty() {
            return Ok(result);
        }

        let windows = match self.options.length_policy {
            LengthPolicy::Reject if stripped.len() > MAX_INPUT_CHARS => {
                return Err(Error::InputTooLong {
                    len: stripped.len(),
                    max: MAX_INPUT_CHARS,
                });
            }
            LengthPolicy::Reject => vec![&stripped[..]],
            LengthPolicy::Chunk => split_windows(&stripped, MAX_INPUT_CHARS),
        };
        if windows.len() > 1 {
            debug!(
                "splitting {} characters into {} windows",
                stripped.len(),
                windows.len()
            );
        }

        for window in windows {
            let tokens = tokenize(window);
            for (c, n) in tokens.unknown {
                *result.unknown.entry(c).or_default() += n;
            }

            let mut input = tokens.ids;
            input.resize(MAX_INPUT_CHARS, PAD_ID);

            let predicted = self.backend.predict(&input).map_err(Error::Inference)?;
            if predicted.len() < window.len() {
                return Err(Error::ShapeMismatch {
                    expected: window.len(),
                    actual: predicted.len(),
                });
            }
            result.text.push_str(&decode(window, &predicted[..window.len()]));
        }

        if !result.unknown.is_empty() {
            warn!("characters outside the tashkeel vocabulary: {:?}", result.unknown);
        }
        Ok(result)
    }
}

pub fn strip_harakat(text: &str) -> String {
    text.chars().filter(|c| !vocab::is_haraka(*c)).collect()
}

pub fn tokenize(chars: &[char]) -> Tokenized {
    let mut tokens = Tokenized {
        ids: Vec::with_capacity(chars.len()),
        ..Default::default()
    };
    for &c in chars {
        match vocab::input_id(c) {
            Some(id) => tokens.ids.push(id),
            None => {
                tokens.ids.push(UNK_ID);
                *tokens.unknown.entry(c).or_default() += 1;
            }
        }
    }
    tokens
}

/// Re-insert predicted diacritics after each base character.
///
/// `predicted` is aligned with `chars`; surplus predictions (padding) are ignored.
pub fn decode(chars: &[char], predicted: &[i64]) -> String {
    let mut out = String::with_capacity(chars.len() * 4);
    for (&c, &id) in chars.iter().zip(predicted) {
        out.push(c);
        if !vocab::accepts_harakat(c) {
            continue;
        }
        match vocab::output_diacritics(id) {
            Some(diacritics) => out.extend(diacritics),
            None => debug!("dropping unusable haraka id {id} after {c:?}"),
        }
    }
    out
}

fn split_windows(chars: &[char], max: usize) -> Vec<&[char]> {
    let mut windows = Vec::with_capacity(chars.len() / max + 1);
    let mut rest = chars;
    while rest.len() > max {
        let cut = rest[..max]
            .iter()
            .rposition(|c| c.is_whitespace())
            .map_or(max, |i| i + 1);
        windows.push(&rest[..cut]);
        rest = &rest[cut..];
    }
    if !rest.is_empty() {
        windows.push(rest);
    }
    windows
}
