// 📋 ASA-100 Part Classes - what receipt paperwork a part class calls for
//
// Informational only: the class and its findings are reported next to the
// verdict, but compliance is decided by source traceability alone.

use crate::certificate::{CertificateRecord, CertificateType};
use serde::{Deserialize, Serialize};

/// Part classes from ASA-100 Appendix A
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PartClass {
    Consumable,
    RawMaterial,
    StandardParts,
    /// New part from the type certificate holder
    NewTcHolder,
    /// New part from a production approval holder, with airworthiness approval
    NewPahWithApproval,
    /// Used part approved for return to service under 14 CFR part 43
    #[serde(rename = "USED_14CFR_PART43")]
    UsedWithApproval,
    Unknown,
}

/// Documentation an accredited distributor needs for one part class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requirements {
    pub on_receipt: &'static str,
    pub for_shipment: &'static str,
}

impl PartClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartClass::Consumable => "CONSUMABLE",
            PartClass::RawMaterial => "RAW_MATERIAL",
            PartClass::StandardParts => "STANDARD_PARTS",
            PartClass::NewTcHolder => "NEW_TC_HOLDER",
            PartClass::NewPahWithApproval => "NEW_PAH_WITH_APPROVAL",
            PartClass::UsedWithApproval => "USED_14CFR_PART43",
            PartClass::Unknown => "UNKNOWN",
        }
    }

    pub fn requirements(&self) -> Option<Requirements> {
        let requirements = match self {
            PartClass::Consumable => Requirements {
                on_receipt: "Statement from seller as to identity",
                for_shipment: "Statement as to identity and that original seller's statement is on file",
            },
            PartClass::RawMaterial => Requirements {
                on_receipt: "Physical and chemical properties reports traceable to heat code or lot number",
                for_shipment: "Certified true copy of the physical and chemical properties reports",
            },
            PartClass::StandardParts => Requirements {
                on_receipt: "Certificate of Conformity (C of C) from producer or seller",
                for_shipment: "Certified true copy of the received C of C",
            },
            PartClass::NewTcHolder => Requirements {
                on_receipt: "Manufacturer's certificate of conformity or release document",
                for_shipment: "Certified true copy of the manufacturer's release document",
            },
            PartClass::NewPahWithApproval => Requirements {
                on_receipt: "FAA Form 8130-3 or part marking required by 14 CFR part 45",
                for_shipment: "Certified true copy of regulatory airworthiness approval document",
            },
            PartClass::UsedWithApproval => Requirements {
                on_receipt: "Approval for return to service meeting provisions of 14 CFR §§ 43.9, 43.11, or 43.17",
                for_shipment: "Approval for return to service",
            },
            PartClass::Unknown => return None,
        };
        Some(requirements)
    }
}

const CONSUMABLE_WORDS: &[&str] = &["consumable", "tape", "grease", "sealant", "adhesive", "lubricant"];
const STANDARD_PART_PREFIXES: &[&str] = &["NAS", "MS", "AN"];
const USED_CONDITIONS: &[&str] = &["oh", "overhauled", "used", "sv", "serviceable", "rp", "repaired", "ar"];
const NEW_CONDITIONS: &[&str] = &["ns", "new surplus", "ne", "new", "fn", "factory new"];

/// Infer the part class from one certificate
pub fn classify_certificate(cert: &CertificateRecord) -> PartClass {
    let description = cert.description.as_deref().unwrap_or("").to_lowercase();
    let condition = cert.condition_code.as_deref().unwrap_or("").trim().to_lowercase();
    let part_number = cert.part_number.trim().to_uppercase();

    if CONSUMABLE_WORDS.iter().any(|word| description.contains(word)) {
        PartClass::Consumable
    } else if description.contains("raw material") || cert.certificate_type == CertificateType::MaterialCert {
        PartClass::RawMaterial
    } else if description.contains("standard")
        || STANDARD_PART_PREFIXES.iter().any(|prefix| {
            part_number
                .strip_prefix(prefix)
                .map(|rest| rest.starts_with(|c: char| c.is_ascii_digit()))
                .unwrap_or(false)
        })
    {
        PartClass::StandardParts
    } else if cert.certificate_type == CertificateType::Faa8130_3
        && !USED_CONDITIONS.contains(&condition.as_str())
    {
        PartClass::NewPahWithApproval
    } else if USED_CONDITIONS.contains(&condition.as_str()) {
        PartClass::UsedWithApproval
    } else if NEW_CONDITIONS.contains(&condition.as_str()) || cert.certificate_type == CertificateType::OemCert {
        PartClass::NewTcHolder
    } else {
        PartClass::Unknown
    }
}

/// First definite class across a part's certificates (input order)
pub fn classify_part(certificates: &[CertificateRecord]) -> PartClass {
    certificates
        .iter()
        .map(classify_certificate)
        .find(|class| *class != PartClass::Unknown)
        .unwrap_or(PartClass::Unknown)
}

/// Receipt documentation the class calls for but the certificate set lacks
pub fn documentation_findings(class: PartClass, certificates: &[CertificateRecord]) -> Vec<String> {
    let has = |wanted: &[CertificateType]| {
        certificates
            .iter()
            .any(|cert| wanted.contains(&cert.certificate_type))
    };

    let mut findings = Vec::new();
    match class {
        PartClass::StandardParts => {
            if !has(&[CertificateType::Coc, CertificateType::EuropeanCoc]) {
                findings.push("Missing Certificate of Conformity for standard parts".to_string());
            }
        }
        PartClass::RawMaterial => {
            if !has(&[CertificateType::MaterialCert]) {
                findings.push("Missing material certification (physical and chemical properties report)".to_string());
            }
        }
        PartClass::NewPahWithApproval => {
            if !has(&[CertificateType::Faa8130_3]) {
                findings.push("Missing FAA Form 8130-3 for new parts with approval".to_string());
            }
        }
        PartClass::UsedWithApproval => {
            if !has(&[CertificateType::Faa8130_3, CertificateType::Ata106]) {
                findings.push("Missing return to service approval for used parts".to_string());
            }
        }
        PartClass::NewTcHolder => {
            if !has(&[CertificateType::OemCert, CertificateType::Coc, CertificateType::Faa8130_3]) {
                findings.push("Missing manufacturer release document for new parts".to_string());
            }
        }
        PartClass::Consumable => {}
        PartClass::Unknown => {
            findings.push("Part class could not be determined from the certificates".to_string());
        }
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cert(kind: CertificateType, pn: &str) -> CertificateRecord {
        CertificateRecord::new(kind, pn, "doc")
    }

    #[test]
    fn test_classify_by_description_and_type() {
        assert_eq!(
            classify_certificate(&cert(CertificateType::Coc, "T-100").with_description("Aluminium tape")),
            PartClass::Consumable
        );
        assert_eq!(
            classify_certificate(&cert(CertificateType::MaterialCert, "2024-T3")),
            PartClass::RawMaterial
        );
        assert_eq!(classify_certificate(&cert(CertificateType::Coc, "NAS1149F0363P")), PartClass::StandardParts);
        assert_eq!(classify_certificate(&cert(CertificateType::Coc, "MS20470AD4")), PartClass::StandardParts);
        assert_eq!(classify_certificate(&cert(CertificateType::Coc, "ANILLO-7")), PartClass::Unknown);
    }

    #[test]
    fn test_classify_by_condition() {
        assert_eq!(
            classify_certificate(&cert(CertificateType::Faa8130_3, "4100-01")),
            PartClass::NewPahWithApproval
        );
        assert_eq!(
            classify_certificate(&cert(CertificateType::Faa8130_3, "4100-01").with_condition("OH")),
            PartClass::UsedWithApproval
        );
        assert_eq!(
            classify_certificate(&cert(CertificateType::Ata106, "4100-01").with_condition("NS")),
            PartClass::NewTcHolder
        );
    }

    #[test]
    fn test_classify_part_takes_first_definite_class() {
        let certs = vec![
            cert(CertificateType::Other, "4100-01"),
            cert(CertificateType::Faa8130_3, "4100-01").with_condition("SV"),
        ];
        assert_eq!(classify_part(&certs), PartClass::UsedWithApproval);
        assert_eq!(classify_part(&[]), PartClass::Unknown);
    }

    #[test]
    fn test_documentation_findings() {
        let coc_only = vec![cert(CertificateType::Coc, "NAS1149")];
        assert!(documentation_findings(PartClass::StandardParts, &coc_only).is_empty());

        let findings = documentation_findings(PartClass::NewPahWithApproval, &coc_only);
        assert_eq!(findings, vec!["Missing FAA Form 8130-3 for new parts with approval".to_string()]);

        assert_eq!(documentation_findings(PartClass::Unknown, &coc_only).len(), 1);
        assert!(documentation_findings(PartClass::Consumable, &[]).is_empty());
    }

    #[test]
    fn test_requirements_table() {
        assert!(PartClass::Unknown.requirements().is_none());
        assert!(PartClass::StandardParts
            .requirements()
            .unwrap()
            .on_receipt
            .contains("Certificate of Conformity"));
        assert_eq!(serde_json::to_string(&PartClass::UsedWithApproval).unwrap(), "\"USED_14CFR_PART43\"");
    }
}
