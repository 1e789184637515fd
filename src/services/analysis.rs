//! Simulated deepfake analysis.
//!
//! There is no model behind this: verdicts and scores are random and only
//! shaped like a real detector's output so the frontend has something to
//! render.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;

const INCONSISTENCY_KINDS: [&str; 3] = ["texture", "edges", "blinking"];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub is_deepfake: bool,
    pub confidence: f64,
    pub detection_time: DateTime<Utc>,
    pub analysis: AnalysisDetails,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisDetails {
    pub face_detected: bool,
    pub inconsistencies: Vec<Inconsistency>,
    pub metadata: ImageMetadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct Inconsistency {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMetadata {
    pub dimensions: String,
    pub format: String,
    pub processing_time: String,
}

/// Extracts the image format from a `data:image/<fmt>;base64,` prefix.
#[must_use]
pub fn sniff_format(image: &str) -> &str {
    image
        .strip_prefix("data:image/")
        .and_then(|rest| rest.split([';', ',']).next())
        .filter(|fmt| !fmt.is_empty())
        .unwrap_or("jpeg")
}

fn two_decimals(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Default, Clone, Copy)]
pub struct MockAnalyzer;

impl MockAnalyzer {
    #[must_use]
    pub fn analyze(&self, image: &str) -> AnalysisResult {
        let mut rng = rand::rng();
        let is_deepfake = rng.random_bool(0.5);

        let inconsistencies = if is_deepfake {
            INCONSISTENCY_KINDS
                .iter()
                .map(|&kind| Inconsistency {
                    kind,
                    score: two_decimals(rng.random::<f64>()),
                })
                .collect()
        } else {
            Vec::new()
        };

        AnalysisResult {
            is_deepfake,
            confidence: two_decimals(rng.random::<f64>()),
            detection_time: Utc::now(),
            analysis: AnalysisDetails {
                face_detected: true,
                inconsistencies,
                metadata: ImageMetadata {
                    dimensions: "1024x768".to_string(),
                    format: sniff_format(image).to_string(),
                    processing_time: format!("{}ms", rng.random_range(100..600)),
                },
            },
        }
    }
}
