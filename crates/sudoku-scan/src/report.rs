//! JSON run report for the solver CLI.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::pipeline::SolvedPuzzle;

#[derive(thiserror::Error, Debug)]
pub enum ReportError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// What one pipeline run saw and produced, for tooling and debugging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub input_path: String,
    #[serde(default)]
    pub corners: Option<[[f32; 2]; 4]>,
    /// 81-character line of the recognized clues, '.' for empty.
    #[serde(default)]
    pub clues: Option<String>,
    /// 81-character line of the full solution.
    #[serde(default)]
    pub solution: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ScanReport {
    pub fn new(input_path: impl Into<String>) -> Self {
        Self {
            input_path: input_path.into(),
            corners: None,
            clues: None,
            solution: None,
            error: None,
        }
    }

    /// Populate the report from a successful run.
    pub fn set_solved(&mut self, solved: &SolvedPuzzle) {
        self.corners = Some(solved.quad.corners.map(|p| [p.x, p.y]));

        let mut clues = String::with_capacity(81);
        let mut solution = String::with_capacity(81);
        for r in 0..9 {
            for c in 0..9 {
                let d = solved.board.get(r, c);
                solution.push((b'0' + d) as char);
                if solved.board.is_fixed(r, c) {
                    clues.push((b'0' + d) as char);
                } else {
                    clues.push('.');
                }
            }
        }
        self.clues = Some(clues);
        self.solution = Some(solution);
        self.error = None;
    }

    /// Record a failed run.
    pub fn set_error(&mut self, err: impl std::fmt::Display) {
        self.error = Some(err.to_string());
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ReportError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ReportError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
