// 🏷️ Entity Category - the trust class a custody holder belongs to
//
// Categories come from registry membership only. A certificate that *says*
// its issuer is a 145 repair station proves nothing: the paperwork is the
// thing under audit.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityCategory {
    /// Original Equipment Manufacturer / production approval holder
    #[serde(rename = "OEM")]
    Oem,

    /// 14 CFR Part 121 domestic air carrier
    Airline121,

    /// 14 CFR Part 129 foreign air carrier operating in the US
    Airline129,

    /// 14 CFR Part 135 charter / cargo operator
    Operator135,

    /// 14 CFR Part 145 FAA-approved repair station
    RepairStation145,

    /// Pass-through link: acceptable in custody, never sufficient on its own
    PartsDistributor,

    /// Falsely presents itself as regulated. Only knowable via registry override.
    Fraudulent,

    /// Not regulated (also the default for unknown names)
    Unregulated,
}

impl EntityCategory {
    pub const ALL: [EntityCategory; 8] = [
        EntityCategory::Oem,
        EntityCategory::Airline121,
        EntityCategory::Airline129,
        EntityCategory::Operator135,
        EntityCategory::RepairStation145,
        EntityCategory::PartsDistributor,
        EntityCategory::Fraudulent,
        EntityCategory::Unregulated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityCategory::Oem => "OEM",
            EntityCategory::Airline121 => "Airline121",
            EntityCategory::Airline129 => "Airline129",
            EntityCategory::Operator135 => "Operator135",
            EntityCategory::RepairStation145 => "RepairStation145",
            EntityCategory::PartsDistributor => "PartsDistributor",
            EntityCategory::Fraudulent => "Fraudulent",
            EntityCategory::Unregulated => "Unregulated",
        }
    }

    /// Short regulatory code used in verdicts and reports ("OEM", "121", ...)
    pub fn source_code(&self) -> &'static str {
        match self {
            EntityCategory::Oem => "OEM",
            EntityCategory::Airline121 => "121",
            EntityCategory::Airline129 => "129",
            EntityCategory::Operator135 => "135",
            EntityCategory::RepairStation145 => "145",
            EntityCategory::PartsDistributor => "PARTS_DISTRIBUTOR",
            EntityCategory::Fraudulent => "FRAUDULENT",
            EntityCategory::Unregulated => "UNREGULATED",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            EntityCategory::Oem => "Original Equipment Manufacturer",
            EntityCategory::Airline121 => "Domestic Airline (Part 121)",
            EntityCategory::Airline129 => "Foreign Airline Operating in USA (Part 129)",
            EntityCategory::Operator135 => "Charter and Cargo Operator (Part 135)",
            EntityCategory::RepairStation145 => "FAA-Approved Repair Station (Part 145)",
            EntityCategory::PartsDistributor => "Parts Distributor",
            EntityCategory::Fraudulent => "Fraudulent (falsely claims regulated status)",
            EntityCategory::Unregulated => "Unregulated",
        }
    }

    /// Resolution tier when one name matches several entries (lower wins).
    ///
    /// Fraudulent > OEM > 121/129/135/145 > distributor > unregulated
    pub fn priority(&self) -> u8 {
        match self {
            EntityCategory::Fraudulent => 0,
            EntityCategory::Oem => 1,
            EntityCategory::Airline121
            | EntityCategory::Airline129
            | EntityCategory::Operator135
            | EntityCategory::RepairStation145 => 2,
            EntityCategory::PartsDistributor => 3,
            EntityCategory::Unregulated => 4,
        }
    }

    /// Can terminate a compliant chain
    pub fn is_regulated(&self) -> bool {
        matches!(
            self,
            EntityCategory::Oem
                | EntityCategory::Airline121
                | EntityCategory::Airline129
                | EntityCategory::Operator135
                | EntityCategory::RepairStation145
        )
    }

    pub fn is_distributor(&self) -> bool {
        *self == EntityCategory::PartsDistributor
    }

    pub fn is_fraudulent(&self) -> bool {
        *self == EntityCategory::Fraudulent
    }

    /// Parse either the enum spelling or the short code ("145", "OEM", ...)
    pub fn parse(raw: &str) -> Option<EntityCategory> {
        let trimmed = raw.trim();
        EntityCategory::ALL.iter().copied().find(|category| {
            category.as_str().eq_ignore_ascii_case(trimmed)
                || category.source_code().eq_ignore_ascii_case(trimmed)
        })
    }
}

impl fmt::Display for EntityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
