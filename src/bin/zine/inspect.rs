//! Human-readable dumps of a loaded storyboard.

use anyhow::Result;

use zinedoc::{Value, ZineStoryboard};

fn describe(value: &Value) -> String {
    match value {
        Value::Document(doc) => format!("document ({} entries)", doc.len()),
        Value::Datum(datum) => {
            let len = datum
                .as_floats()
                .map(Vec::len)
                .or_else(|| datum.as_bytes().map(Vec::len))
                .or_else(|| datum.as_packed().map(Vec::len));
            match len {
                Some(len) => format!("{} [{}]", datum.kind(), len),
                None => datum.kind().to_string(),
            }
        }
    }
}

pub fn print_tree(storyboard: &ZineStoryboard) {
    println!("Storyboard: {} panels", storyboard.len());
    for panel in storyboard.panels() {
        println!("  panel {}", panel.id());
        for (index, slot) in panel.layers().iter().enumerate() {
            let Some(layer) = slot else {
                println!("    [{}] <empty>", index);
                continue;
            };
            println!("    [{}] layer {}", index, layer.id());
            for field in layer.keys() {
                if let Some(value) = layer.get_data(&field) {
                    println!("        {:<20} {}", field, describe(&value));
                }
            }
        }
    }
}

pub fn print_stats(storyboard: &ZineStoryboard, blob_len: usize) -> Result<()> {
    let plain = storyboard.export_uncompressed()?;
    let layers: usize = storyboard.panels().iter().map(|p| p.layer_count()).sum();

    println!();
    println!("Statistics:");
    println!("  Blob:          {:>10} bytes", blob_len);
    println!("  Uncompressed:  {:>10} bytes", plain.len());
    println!(
        "  Compression:   {:>10.2}x",
        plain.len() as f64 / blob_len.max(1) as f64
    );
    println!();
    println!("  Panels: {}", storyboard.len());
    println!("  Layers: {}", layers);
    Ok(())
}

/// Fails if panel or per-panel layer counts differ.
pub fn compare_counts(expected: &ZineStoryboard, actual: &ZineStoryboard) -> Result<()> {
    if expected.len() != actual.len() {
        anyhow::bail!(
            "Validation failed: panel count mismatch (expected {}, got {})",
            expected.len(),
            actual.len()
        );
    }
    for (want, got) in expected.panels().iter().zip(actual.panels()) {
        if want.id() != got.id() || want.layer_count() != got.layer_count() {
            anyhow::bail!(
                "Validation failed: panel {} has {} layers (expected {})",
                got.id(),
                got.layer_count(),
                want.layer_count()
            );
        }
    }
    Ok(())
}
