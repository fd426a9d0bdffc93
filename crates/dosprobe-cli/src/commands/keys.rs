//! `dosprobe keys STROKES...` -- preview what a stroke script types.

use std::fmt::Write as _;

use anyhow::{Context, Result};

use dosprobe_harness::{translate, KeyCode, Stroke};

/// Run `dosprobe keys STROKES...`.
pub fn run(strokes: &[String]) -> Result<()> {
    print!("{}", render(strokes)?);
    Ok(())
}

/// One line per token, then the full code sequence.
fn render(strokes: &[String]) -> Result<String> {
    // Validate the whole script first so a bad token reports before any output.
    let all = translate(strokes).context("invalid stroke script")?;

    let mut out = String::new();
    for token in strokes {
        let codes = Stroke::parse(token)?.key_codes();
        let _ = writeln!(out, "{token:<16} {}", join(&codes));
    }
    let _ = writeln!(out, "sequence: {} ({} presses)", join(&all), all.len());
    Ok(out)
}

fn join(codes: &[KeyCode]) -> String {
    codes
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}
