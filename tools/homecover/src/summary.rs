use crate::record_store::sha256_hex;
use crate::types::PolicyRecord;

pub const SUMMARY_MIME_TYPE: &str = "text/plain";

/// Downloadable policy summary handed back to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryArtifact {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
    pub sha256: String,
}

impl SummaryArtifact {
    pub fn for_record(record: &PolicyRecord) -> Self {
        let bytes = render_summary(record).into_bytes();
        Self {
            file_name: format!("policy-summary-{}.txt", file_safe(&record.policy_number)),
            mime_type: SUMMARY_MIME_TYPE,
            sha256: sha256_hex(&bytes),
            bytes,
        }
    }
}

pub fn render_summary(record: &PolicyRecord) -> String {
    let mut out = String::new();
    out.push_str("POLICY SUMMARY\n");
    out.push_str(&format!("Policy: {}\n", record.policy_number));
    out.push_str(&format!("Name: {}\n", record.full_name));
    out.push_str(&format!("Status: {}\n", record.status.as_str()));
    if record.cover_details.is_empty() {
        out.push_str("Cover: none\n");
        return out;
    }
    out.push_str("Cover:\n");
    let mut cover = record.cover_details.iter().collect::<Vec<_>>();
    cover.sort_by(|a, b| a.0.cmp(b.0));
    for (key, limit) in cover {
        out.push_str(&format!("  {key}: {limit}\n"));
    }
    out
}

fn file_safe(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
