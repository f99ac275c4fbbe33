use log::{debug, info};
use std::path::Path;

use crate::error::{Error, Result};
use crate::phoneme_ids::{self, EncodedPhonemes, PhonemeIdConfig, PhonemeIdMap};
use crate::phonemize::Phonemizer;
use crate::tashkeel::Tashkeel;

/// Text to phoneme ids: optional diacritization, phonemization, flattening, encoding.
///
/// Starts uninitialized; after a successful [`Frontend::initialize`] it stays
/// initialized for its whole lifetime.
pub struct Frontend {
    phonemizer: Box<dyn Phonemizer>,
    tashkeel: Option<Tashkeel>,
    id_map: PhonemeIdMap,
    id_config: PhonemeIdConfig,
    initialized: bool,
}

impl Frontend {
    pub fn new(phonemizer: Box<dyn Phonemizer>) -> Self {
        Self {
            phonemizer,
            tashkeel: None,
            id_map: PhonemeIdMap::default(),
            id_config: PhonemeIdConfig::default(),
            initialized: false,
        }
    }

    pub fn with_id_map(mut self, id_map: PhonemeIdMap) -> Self {
        self.id_map = id_map;
        self
    }

    pub fn with_id_config(mut self, id_config: PhonemeIdConfig) -> Self {
        self.id_config = id_config;
        self
    }

    pub fn with_tashkeel(mut self, tashkeel: Tashkeel) -> Self {
        self.tashkeel = Some(tashkeel);
        self
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Set up the phonemizer. Calling again after success does nothing.
    pub fn initialize(&mut self, data_path: &str) -> Result<()> {
        if self.initialized {
            debug!("phonemizer already initialized");
            return Ok(());
        }
        self.phonemizer
            .initialize(data_path)
            .map_err(|source| Error::Load {
                path: data_path.into(),
                source,
            })?;
        self.initialized = true;
        info!("phonemizer initialized");
        Ok(())
    }

    /// Load a tashkeel model used for Arabic voices. On failure the
    /// previously loaded model, if any, is kept.
    pub fn load_tashkeel(&mut self, model_path: impl AsRef<Path>) -> Result<()> {
        self.tashkeel = Some(Tashkeel::load(model_path)?);
        Ok(())
    }

    pub fn phonemize_and_encode(&mut self, text: &str, voice: &str) -> Result<EncodedPhonemes> {
        if !self.initialized {
            return Err(Error::NotInitialized);
        }

        let diacritized;
        let text = match self.tashkeel.as_mut() {
            Some(tashkeel) if is_arabic_voice(voice) => {
                diacritized = tashkeel.diacritize(text)?;
                diacritized.as_str()
            }
            _ => text,
        };

        let sentences = self
            .phonemizer
            .phonemize(text, voice)
            .map_err(Error::Phonemizer)?;
        let phonemes = phoneme_ids::flatten_sentences(sentences);
        phoneme_ids::phonemes_to_ids(&phonemes, &self.id_config, &self.id_map)
    }
}

/// `ar` itself or a regional variant such as `ar-eg`.
fn is_arabic_voice(voice: &str) -> bool {
    voice == "ar" || voice.starts_with("ar-")
}
