//! Plain-text certificate report

use chrono::{DateTime, SecondsFormat, Utc};
use sslsaas_core::CertificateInfo;
use sslsaas_core::traits::SslStatus;
use std::fmt::Write;

const RULE_WIDTH: usize = 70;

fn timestamp(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Render certificate details as the operator-facing table
pub fn certificate_report(info: &CertificateInfo) -> String {
    let rule = "-".repeat(RULE_WIDTH);
    let mut out = String::new();

    let rows = [
        ("Serial Number", info.serial_number.clone()),
        ("Signature Algorithm", info.signature_algorithm.clone()),
        ("Issue Date", timestamp(&info.not_before)),
        ("Expiration Date", timestamp(&info.not_after)),
        (
            "Common Name",
            info.common_name.clone().unwrap_or_else(|| "(none)".to_string()),
        ),
        (
            "Issuer",
            info.issuer.clone().unwrap_or_else(|| "(none)".to_string()),
        ),
        ("Subject Alt. Name(s)", info.subject_alt_names.join(", ")),
    ];

    let _ = writeln!(out, "Certificate Details:");
    let _ = writeln!(out, "{}", rule);
    for (label, value) in rows {
        let _ = writeln!(out, "{:<20} {:<20}", label, value);
    }
    let _ = writeln!(out, "{}", rule);
    out
}

/// One line listing the distinct statuses seen, in order
pub fn status_progression(statuses: &[SslStatus]) -> String {
    let mut seen: Vec<&str> = Vec::new();
    for status in statuses {
        if seen.last() != Some(&status.as_str()) {
            seen.push(status.as_str());
        }
    }
    seen.join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> CertificateInfo {
        CertificateInfo {
            serial_number: "0a:1b:2c".to_string(),
            signature_algorithm: "ecdsa-with-SHA256".to_string(),
            not_before: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            not_after: Utc.with_ymd_and_hms(2024, 3, 31, 23, 59, 59).unwrap(),
            common_name: Some("a.example.com".to_string()),
            issuer: Some("Test CA".to_string()),
            subject_alt_names: vec!["a.example.com".to_string(), "b.example.com".to_string()],
        }
    }

    #[test]
    fn test_report_layout() {
        let report = certificate_report(&sample());
        let lines: Vec<&str> = report.lines().collect();

        assert_eq!(lines[0], "Certificate Details:");
        assert_eq!(lines[1], "-".repeat(70));
        assert_eq!(lines[2], "Serial Number        0a:1b:2c            ");
        assert_eq!(lines[4], "Issue Date           2024-01-01T00:00:00Z");
        assert_eq!(lines[5], "Expiration Date      2024-03-31T23:59:59Z");
        assert!(lines[6].starts_with("Common Name          a.example.com"));
        assert!(lines[8].ends_with("a.example.com, b.example.com"));
        assert_eq!(lines.last().copied(), Some("-".repeat(70).as_str()));
    }

    #[test]
    fn test_missing_common_name_shown_as_none() {
        let mut info = sample();
        info.common_name = None;
        assert!(certificate_report(&info).contains("Common Name          (none)"));
    }

    #[test]
    fn test_status_progression_collapses_repeats() {
        let statuses = vec![
            SslStatus::Initializing,
            SslStatus::PendingValidation,
            SslStatus::PendingValidation,
            SslStatus::Active,
        ];
        assert_eq!(
            status_progression(&statuses),
            "initializing -> pending_validation -> active"
        );
        assert_eq!(status_progression(&[]), "");
    }
}
