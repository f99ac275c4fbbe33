/*
Run with:
    cargo run --example phoneme_ids -- "Some text. Another sentence!"
*/

use piper_phonemize_rs::{CodepointPhonemizer, Frontend};

fn main() -> anyhow::Result<()> {
    let text = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "Hello world. How are you?".to_string());

    let mut frontend = Frontend::new(Box::new(CodepointPhonemizer));
    frontend.initialize("")?;

    let encoded = frontend.phonemize_and_encode(&text, "en-us")?;

    println!("Input: {}", text);
    println!("Ids: {:?}", encoded.ids);
    if !encoded.missing.is_empty() {
        println!("Missing phonemes: {:?}", encoded.missing);
    }

    Ok(())
}
