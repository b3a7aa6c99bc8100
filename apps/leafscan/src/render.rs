//! Text rendering of controller state for the terminal.

use std::fmt::Write as _;

use client_core::{advisory_for, SelectedFile};
use shared::{domain::DiagnosisResult, error::ErrorDescriptor};

const BAR_WIDTH: usize = 20;

fn percent(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

fn bar(value: f64) -> String {
    let filled = ((value * BAR_WIDTH as f64).round() as usize).min(BAR_WIDTH);
    format!("{}{}", "#".repeat(filled), ".".repeat(BAR_WIDTH - filled))
}

pub fn render_diagnosis(file: Option<&SelectedFile>, result: &DiagnosisResult) -> String {
    let advisory = advisory_for(&result.prediction);
    let mut out = String::new();

    if let Some(file) = file {
        let _ = writeln!(
            out,
            "Image: {} ({}, {} bytes)",
            file.name(),
            file.media_type(),
            file.size_bytes()
        );
    }
    let _ = write!(out, "Diagnosis: {}", result.prediction);
    if !advisory.tag.as_str().is_empty() {
        let _ = write!(out, " [{}]", advisory.tag.as_str());
    }
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Confidence: {} {}",
        bar(result.confidence),
        percent(result.confidence)
    );

    let ranked = result.ranked_probabilities();
    if !ranked.is_empty() {
        let _ = writeln!(out, "\nDetailed analysis:");
        let width = ranked.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
        for (label, probability) in ranked {
            let _ = writeln!(
                out,
                "  {label:<width$}  {} {:>6}",
                bar(probability),
                percent(probability)
            );
        }
    }

    let _ = writeln!(out, "\nRecommended action:\n  {}", advisory.advice);
    out
}

pub fn render_error(error: &ErrorDescriptor) -> String {
    match error.status {
        Some(status) => format!(
            "Error ({}, HTTP {status}): {}",
            error.kind.as_str(),
            error.message
        ),
        None => format!("Error ({}): {}", error.kind.as_str(), error.message),
    }
}
