//! Text and JSON rendering of analysis output.
//!
//! Both representations derive verdicts through [`Verdict::from_score`], so a
//! face is labelled identically whichever format the caller asks for.

use std::fmt::Write as _;

use serde::Deserialize;
use serde_json::{json, Value};

use deepfake_analysis::{AnalysisResult, Face, StatusSnapshot, Verdict};

use crate::types::ToolCallResult;

/// Output representation requested by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

pub fn render_analysis(result: &AnalysisResult, base_url: &str, format: OutputFormat) -> ToolCallResult {
    match format {
        OutputFormat::Text => ToolCallResult::text(analysis_text(result, base_url)),
        OutputFormat::Json => ToolCallResult::json(&analysis_json(result, base_url)),
    }
}

pub fn render_status(snapshot: &StatusSnapshot, base_url: &str, format: OutputFormat) -> ToolCallResult {
    match format {
        OutputFormat::Text => ToolCallResult::text(status_text(snapshot, base_url)),
        OutputFormat::Json => ToolCallResult::json(&status_json(snapshot, base_url)),
    }
}

pub fn render_face(
    session_id: &str,
    index: usize,
    face: &Face,
    base_url: &str,
    format: OutputFormat,
) -> ToolCallResult {
    match format {
        OutputFormat::Text => {
            let mut out = format!("Session: {session_id}\n");
            write_face(&mut out, index, face, base_url);
            ToolCallResult::text(out)
        }
        OutputFormat::Json => {
            let mut value = face_json(index, face, base_url);
            value["session_id"] = json!(session_id);
            ToolCallResult::json(&value)
        }
    }
}

pub fn analysis_json(result: &AnalysisResult, base_url: &str) -> Value {
    json!({
        "session_id": result.session_id,
        "status": result.status.as_str(),
        "sha256": result.sha256,
        "message": result.message,
        "total_faces": result.face_count(),
        "faces": result
            .faces
            .iter()
            .enumerate()
            .map(|(i, face)| face_json(i, face, base_url))
            .collect::<Vec<_>>(),
    })
}

pub fn analysis_text(result: &AnalysisResult, base_url: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Deepfake analysis for session {}", result.session_id);
    let _ = writeln!(out, "Status: {}", result.status);
    if let Some(sha) = &result.sha256 {
        let _ = writeln!(out, "SHA-256: {sha}");
    }
    let _ = writeln!(out, "Faces detected: {}", result.face_count());

    if let Some(message) = &result.message {
        let _ = writeln!(out, "\n{message}");
    }

    for (i, face) in result.faces.iter().enumerate() {
        out.push('\n');
        write_face(&mut out, i, face, base_url);
    }
    out
}

fn status_json(snapshot: &StatusSnapshot, base_url: &str) -> Value {
    json!({
        "session_id": snapshot.session_id,
        "status": snapshot.status.as_str(),
        "terminal": snapshot.status.is_terminal(),
        "message": snapshot.message,
        "result": snapshot.result.as_ref().map(|r| analysis_json(r, base_url)),
    })
}

fn status_text(snapshot: &StatusSnapshot, base_url: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Session: {}", snapshot.session_id);
    let _ = writeln!(
        out,
        "Status: {}{}",
        snapshot.status,
        if snapshot.status.is_terminal() { "" } else { " (still running)" }
    );
    if let Some(message) = &snapshot.message {
        let _ = writeln!(out, "Message: {message}");
    }
    if let Some(result) = &snapshot.result {
        out.push('\n');
        out.push_str(&analysis_text(result, base_url));
    }
    out
}

fn face_json(index: usize, face: &Face, base_url: &str) -> Value {
    json!({
        "index": index,
        "verdict": Verdict::from_score(face.real_probability).label(),
        "real_probability": face.real_probability,
        "model_scores": face.model_scores,
        "face_path": face.face_path,
        "face_image_url": face.image_url(base_url),
    })
}

fn write_face(out: &mut String, index: usize, face: &Face, base_url: &str) {
    let verdict = Verdict::from_score(face.real_probability);
    let _ = writeln!(out, "Face {index}: {verdict}");
    match face.real_probability {
        Some(p) => {
            let _ = writeln!(out, "  Real probability: {}", percent(p));
        }
        None => {
            let _ = writeln!(out, "  Real probability: n/a");
        }
    }
    for (model, score) in &face.model_scores {
        let _ = writeln!(out, "  {model}: {}", percent(*score));
    }
    if let Some(url) = face.image_url(base_url) {
        let _ = writeln!(out, "  Face image: {url}");
    }
}

fn percent(p: f64) -> String {
    format!("{:.1}%", p * 100.0)
}
