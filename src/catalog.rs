use serde::Serialize;

/// A commission-bearing training offering. `price == 0` means the package is
/// priced per engagement and contributes no attributable revenue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    pub id: &'static str,
    pub name: &'static str,
    pub full_name: &'static str,
    pub price: u64,
    pub currency: &'static str,
    pub meeting_only: bool,
    pub enroll_url: Option<&'static str>,
}

impl Package {
    pub fn is_custom_priced(&self) -> bool {
        self.price == 0
    }

    pub fn price_label(&self) -> String {
        if self.is_custom_priced() {
            "Custom Pricing".to_string()
        } else {
            format!("{} {}", self.currency, group_thousands(self.price))
        }
    }
}

static PACKAGES: [Package; 3] = [
    Package {
        id: "starter",
        name: "Starter",
        full_name: "Sales Certification + 2-Day On-Site Training",
        price: 1000,
        currency: "AED",
        meeting_only: false,
        enroll_url: Some(
            "https://sasa-worldwide.app.clientclub.net/courses/offers/bb29ead7-f9a0-42ad-b07f-481ee4a97cfb",
        ),
    },
    Package {
        id: "full-immersion",
        name: "Full Immersion",
        full_name: "Full On-Site Certification Program",
        price: 5000,
        currency: "AED",
        meeting_only: false,
        enroll_url: Some(
            "https://sasa-worldwide.app.clientclub.net/courses/offers/b3a7c0d9-d9ac-4632-96ed-5158286cba1e",
        ),
    },
    Package {
        id: "enterprise",
        name: "Enterprise",
        full_name: "Corporate Sales Training Program",
        price: 0,
        currency: "AED",
        meeting_only: true,
        enroll_url: None,
    },
];

/// Rows written by older form versions carry the display name instead of the
/// id, so both are accepted.
pub fn find_package(id_or_name: &str) -> Option<&'static Package> {
    let needle = id_or_name.trim();
    if needle.is_empty() {
        return None;
    }
    PACKAGES
        .iter()
        .find(|package| package.id == needle || package.name == needle)
}

/// Canonical id for a stored package reference; unknown references pass
/// through untouched.
pub fn canonical_package_id(raw: &str) -> String {
    find_package(raw)
        .map(|package| package.id.to_string())
        .unwrap_or_else(|| raw.trim().to_string())
}

pub fn package_price(raw: &str) -> u64 {
    find_package(raw).map(|package| package.price).unwrap_or(0)
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::{canonical_package_id, find_package, package_price};

    #[test]
    fn matches_by_id_or_display_name() {
        assert_eq!(find_package("starter").map(|p| p.id), Some("starter"));
        assert_eq!(find_package("Full Immersion").map(|p| p.id), Some("full-immersion"));
        assert!(find_package("platinum").is_none());
        assert!(find_package("").is_none());
    }

    #[test]
    fn unknown_packages_are_worth_nothing() {
        assert_eq!(package_price("starter"), 1000);
        assert_eq!(package_price("Enterprise"), 0);
        assert_eq!(package_price("mystery"), 0);
    }

    #[test]
    fn canonical_id_normalizes_legacy_names() {
        assert_eq!(canonical_package_id("Starter"), "starter");
        assert_eq!(canonical_package_id(" custom deal "), "custom deal");
    }

    #[test]
    fn price_label_groups_digits() {
        let immersion = find_package("full-immersion").expect("package");
        assert_eq!(immersion.price_label(), "AED 5,000");
        let enterprise = find_package("enterprise").expect("package");
        assert_eq!(enterprise.price_label(), "Custom Pricing");
    }
}
