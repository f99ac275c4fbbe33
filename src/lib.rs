mod error;
pub mod ffi;
mod frontend;
mod model;
pub mod phoneme_ids;
pub mod phonemize;
pub mod tashkeel;
pub mod vocab;

#[cfg(feature = "espeak")]
pub mod espeak;

pub use error::{Error, Result};
pub use frontend::Frontend;
pub use model::{InferenceBackend, OrtBackend};
pub use phoneme_ids::{EncodedPhonemes, MissingPhonemePolicy, PhonemeIdConfig, PhonemeIdMap};
pub use phonemize::{CodepointPhonemizer, Phonemizer};
pub use tashkeel::{Diacritized, LengthPolicy, Tashkeel, TashkeelOptions};
