use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QrScanSummary {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub short_code: String,
    #[serde(default)]
    pub scan_count: i64,
}

/// Aggregate scan numbers for the signed-in user's QR codes.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserAnalytics {
    #[serde(default)]
    pub total_qr_codes: i64,
    #[serde(default)]
    pub total_scans: i64,
    #[serde(default)]
    pub active_qr_codes: i64,
    #[serde(default)]
    pub paused_qr_codes: i64,
    #[serde(default)]
    pub qr_codes: Vec<QrScanSummary>,
}

impl UserAnalytics {
    /// Most scanned codes first.
    pub fn top(&self, n: usize) -> Vec<&QrScanSummary> {
        let mut codes: Vec<&QrScanSummary> = self.qr_codes.iter().collect();
        codes.sort_by(|a, b| b.scan_count.cmp(&a.scan_count));
        codes.truncate(n);
        codes
    }

    pub fn scans_for(&self, id: &str) -> Option<i64> {
        self.qr_codes
            .iter()
            .find(|code| code.id == id)
            .map(|code| code.scan_count)
    }
}
