/*
Run with:
    cargo run --example usage -- path/to/tashkeel.onnx

The model must take a [1, 315] int64 input of character ids and produce one
haraka id (or one row of haraka scores) per position.
*/

use piper_phonemize_rs::Tashkeel;

fn main() -> anyhow::Result<()> {
    let model_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "tashkeel.onnx".to_string());

    let mut tashkeel = Tashkeel::load(&model_path)?;

    let text = "ذهب الولد إلى المدرسة صباحا.";
    let result = tashkeel.run(text)?;

    println!("Input: {}", text);
    println!("Output: {}", result.text);
    if !result.unknown.is_empty() {
        println!("Unknown characters: {:?}", result.unknown);
    }

    Ok(())
}
