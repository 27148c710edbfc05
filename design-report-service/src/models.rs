use report_flow::UIReport;
use serde::{Deserialize, Serialize};

/// Response for a processed upload: the canonical report plus the shareable
/// design-file URL (real duplicate or deterministic fallback).
#[derive(Debug, Serialize, Deserialize)]
pub struct ReportResponse {
    pub design_url: String,
    pub report: UIReport,
}
