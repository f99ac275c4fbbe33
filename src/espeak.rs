//! Phonemisation through the `libespeak-ng` C library.
//!
//! espeak-ng keeps global state and is not thread-safe; every call goes through
//! [`LOCK`].

use anyhow::{Result, anyhow};
use log::{debug, info};
use std::{
    ffi::{CStr, CString},
    os::raw::{c_char, c_int, c_void},
    ptr,
    sync::Mutex,
};

use crate::phoneme_ids::Phoneme;
use crate::phonemize::{
    Clause, Phonemizer, assemble_clauses, collect_clauses, split_sentences,
};

#[link(name = "espeak-ng")]
unsafe extern "C" {
    /// Returns the sample rate on success, a negative value on failure.
    fn espeak_Initialize(output: c_int, buflength: c_int, path: *const c_char, options: c_int)
    -> c_int;

    /// Returns EE_OK (0) on success.
    fn espeak_SetVoiceByName(name: *const c_char) -> c_int;

    /// Advances `textptr` past one clause (or sets it to null at the end) and
    /// returns that clause's phonemes in an internal buffer, or null.
    fn espeak_TextToPhonemes(
        textptr: *mut *const c_void,
        textmode: c_int,
        phonememode: c_int,
    ) -> *const c_char;
}

const AUDIO_OUTPUT_SYNCHRONOUS: c_int = 2;
const CHARS_UTF8: c_int = 1;
const PHONEMES_IPA: c_int = 0x02;

static LOCK: Mutex<()> = Mutex::new(());

#[derive(Debug, Clone)]
pub struct EspeakConfig {
    /// Append clause punctuation (`, ; : . ? !`) as phonemes.
    pub keep_punctuation: bool,
}

impl Default for EspeakConfig {
    fn default() -> Self {
        Self {
            keep_punctuation: true,
        }
    }
}

#[derive(Debug, Default)]
pub struct EspeakPhonemizer {
    config: EspeakConfig,
    initialized: bool,
    voice: Option<String>,
}

impl EspeakPhonemizer {
    pub fn new(config: EspeakConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    fn set_voice(&mut self, voice: &str) -> Result<()> {
        if self.voice.as_deref() == Some(voice) {
            return Ok(());
        }
        let name = CString::new(voice).map_err(|_| anyhow!("voice contains a null byte"))?;
        let rc = unsafe { espeak_SetVoiceByName(name.as_ptr()) };
        if rc != 0 {
            return Err(anyhow!("espeak_SetVoiceByName({voice:?}) failed (rc {rc})"));
        }
        debug!("espeak voice set to {voice}");
        self.voice = Some(voice.to_owned());
        Ok(())
    }

    /// Run espeak-ng over one sentence clause by clause.
    fn sentence_clauses(&self, sentence: &str) -> Result<Vec<Clause>> {
        let text = CString::new(sentence).map_err(|_| anyhow!("text contains a null byte"))?;
        let base = text.as_ptr();

        collect_clauses(sentence, |offset| {
            let mut current = unsafe { base.add(offset) } as *const c_void;
            let phonemes = unsafe { espeak_TextToPhonemes(&mut current, CHARS_UTF8, PHONEMES_IPA) };
            let next = (!current.is_null()).then(|| current as usize - base as usize);
            if phonemes.is_null() {
                return Ok((None, next));
            }
            // Copy out before the next call overwrites the buffer.
            let clause = unsafe { CStr::from_ptr(phonemes) }
                .to_str()
                .map_err(|_| anyhow!("espeak-ng returned non-UTF-8 phonemes"))?
                .to_owned();
            Ok((Some(clause), next))
        })
    }
}

impl Phonemizer for EspeakPhonemizer {
    fn initialize(&mut self, data_path: &str) -> Result<()> {
        let _guard = LOCK.lock().unwrap_or_else(|p| p.into_inner());
        if self.initialized {
            return Ok(());
        }

        let path = if data_path.is_empty() {
            None
        } else {
            Some(CString::new(data_path).map_err(|_| anyhow!("data path contains a null byte"))?)
        };
        let path_ptr = path.as_ref().map_or(ptr::null(), |p| p.as_ptr());

        let rc = unsafe { espeak_Initialize(AUDIO_OUTPUT_SYNCHRONOUS, 0, path_ptr, 0) };
        if rc < 0 {
            return Err(anyhow!("espeak_Initialize failed (rc {rc})"));
        }
        info!("espeak-ng initialized (data path {data_path:?})");
        self.initialized = true;
        Ok(())
    }

    fn phonemize(&mut self, text: &str, voice: &str) -> Result<Vec<Vec<Phoneme>>> {
        let _guard = LOCK.lock().unwrap_or_else(|p| p.into_inner());
        if !self.initialized {
            return Err(anyhow!("espeak-ng is not initialized"));
        }
        self.set_voice(voice)?;

        let mut sentences = Vec::new();
        for sentence in split_sentences(text) {
            let clauses = self.sentence_clauses(sentence)?;
            let phonemes = assemble_clauses(&clauses, self.config.keep_punctuation);
            if !phonemes.is_empty() {
                sentences.push(phonemes);
            }
        }
        Ok(sentences)
    }
}
