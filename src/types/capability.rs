use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A named kind of signal-gathering probe.
///
/// Variants are declared in id order; the derived `Ord` is the
/// deterministic "capability-id order" used for scheduling and output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Breach,
    Deliverability,
    DnsWhois,
    EmailRegistration,
    ExternalTool,
    Phone,
    Professional,
    Reputation,
    Search,
    Social,
}

impl Capability {
    /// Every known capability, in id order.
    pub const ALL: [Capability; 10] = [
        Capability::Breach,
        Capability::Deliverability,
        Capability::DnsWhois,
        Capability::EmailRegistration,
        Capability::ExternalTool,
        Capability::Phone,
        Capability::Professional,
        Capability::Reputation,
        Capability::Search,
        Capability::Social,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Capability::Breach => "breach",
            Capability::Deliverability => "deliverability",
            Capability::DnsWhois => "dns_whois",
            Capability::EmailRegistration => "email_registration",
            Capability::ExternalTool => "external_tool",
            Capability::Phone => "phone",
            Capability::Professional => "professional",
            Capability::Reputation => "reputation",
            Capability::Search => "search",
            Capability::Social => "social",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Capability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Capability::ALL
            .into_iter()
            .find(|c| c.id() == wanted)
            .ok_or_else(|| format!("unknown capability '{}'", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_is_sorted_by_id() {
        let ids: Vec<&str> = Capability::ALL.iter().map(|c| c.id()).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);

        let mut by_ord = Capability::ALL.to_vec();
        by_ord.sort();
        assert_eq!(by_ord, Capability::ALL.to_vec());
    }

    #[test]
    fn test_parse_accepts_hyphenated_ids() {
        assert_eq!("dns-whois".parse::<Capability>(), Ok(Capability::DnsWhois));
        assert_eq!(" Breach ".parse::<Capability>(), Ok(Capability::Breach));
        assert!("carrier".parse::<Capability>().is_err());
    }

    #[test]
    fn test_serde_uses_ids() {
        let json = serde_json::to_string(&Capability::ExternalTool).unwrap();
        assert_eq!(json, "\"external_tool\"");

        let json = serde_json::to_string(&Capability::EmailRegistration).unwrap();
        assert_eq!(json, "\"email_registration\"");
    }
}
