//! Crisis and emergency contacts by country

use serde::Serialize;

/// A single crisis or emergency contact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EmergencyResource {
    pub name: &'static str,
    /// Phone number, or `None` for web-only services
    pub phone: Option<&'static str>,
    pub url: Option<&'static str>,
    pub description: &'static str,
}

const fn resource(
    name: &'static str,
    phone: Option<&'static str>,
    url: Option<&'static str>,
    description: &'static str,
) -> EmergencyResource {
    EmergencyResource {
        name,
        phone,
        url,
        description,
    }
}

/// Fallback when a country has no dedicated entry
pub const INTERNATIONAL: &[EmergencyResource] = &[resource(
    "Find A Helpline",
    None,
    Some("https://findahelpline.com"),
    "Directory of free, confidential crisis lines worldwide",
)];

const US: &[EmergencyResource] = &[
    resource("Emergency Services", Some("911"), None, "Police, fire and ambulance"),
    resource(
        "988 Suicide & Crisis Lifeline",
        Some("988"),
        Some("https://988lifeline.org"),
        "24/7 call or text support for anyone in distress",
    ),
    resource(
        "Crisis Text Line",
        Some("Text HOME to 741741"),
        Some("https://www.crisistextline.org"),
        "24/7 support by text message",
    ),
];

const CA: &[EmergencyResource] = &[
    resource("Emergency Services", Some("911"), None, "Police, fire and ambulance"),
    resource(
        "9-8-8 Suicide Crisis Helpline",
        Some("988"),
        Some("https://988.ca"),
        "24/7 call or text support across Canada",
    ),
];

const GB: &[EmergencyResource] = &[
    resource("Emergency Services", Some("999"), None, "Police, fire and ambulance"),
    resource(
        "Samaritans",
        Some("116 123"),
        Some("https://www.samaritans.org"),
        "24/7 listening service, free to call",
    ),
    resource("NHS 111", Some("111"), Some("https://111.nhs.uk"), "Urgent mental health help"),
];

const IE: &[EmergencyResource] = &[
    resource("Emergency Services", Some("112"), None, "Police, fire and ambulance (999 also works)"),
    resource(
        "Samaritans Ireland",
        Some("116 123"),
        Some("https://www.samaritans.org/ireland"),
        "24/7 listening service, free to call",
    ),
];

const AU: &[EmergencyResource] = &[
    resource("Emergency Services", Some("000"), None, "Police, fire and ambulance"),
    resource(
        "Lifeline",
        Some("13 11 14"),
        Some("https://www.lifeline.org.au"),
        "24/7 crisis support and suicide prevention",
    ),
];

const NZ: &[EmergencyResource] = &[
    resource("Emergency Services", Some("111"), None, "Police, fire and ambulance"),
    resource(
        "Need to Talk?",
        Some("1737"),
        Some("https://1737.org.nz"),
        "Free call or text any time to a trained counsellor",
    ),
];

const IN: &[EmergencyResource] = &[
    resource("Emergency Services", Some("112"), None, "National emergency number"),
    resource(
        "Tele-MANAS",
        Some("14416"),
        Some("https://telemanas.mohfw.gov.in"),
        "24/7 government mental health helpline",
    ),
];

/// Emergency resources for an ISO 3166-1 alpha-2 country code
///
/// Matching is case-insensitive (`"uk"` is accepted for Great Britain).
/// Unknown codes get the international directory.
#[must_use]
pub fn emergency_resources(country_code: &str) -> &'static [EmergencyResource] {
    match country_code.trim().to_ascii_uppercase().as_str() {
        "US" => US,
        "CA" => CA,
        "GB" | "UK" => GB,
        "IE" => IE,
        "AU" => AU,
        "NZ" => NZ,
        "IN" => IN,
        _ => INTERNATIONAL,
    }
}

/// Country codes with a dedicated entry
pub const SUPPORTED_COUNTRIES: &[&str] = &["US", "CA", "GB", "IE", "AU", "NZ", "IN"];
