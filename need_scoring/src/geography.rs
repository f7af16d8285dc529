//! Canonicalization of the free-text state and district labels.
//!
//! Every stage is an ordered list of rules: the first rule that matches decides the output,
//! and the text is kept unchanged when no rule matches. The state stage is followed by a
//! membership check against the closed set of administrative names.

use crate::config::{CanonicalLocation, Resolution};

const DNHDD: &str = "Dadra and Nagar Haveli and Daman and Diu";
const JAMMU_KASHMIR: &str = "Jammu and Kashmir";

/// A rewrite rule applied to a normalized label.
#[derive(Debug, Clone, Copy)]
pub enum RewriteRule {
    /// Matches when the text contains any of the substrings.
    Contains(&'static [&'static str], &'static str),
    /// Matches when the text equals one of the keys of the table.
    Table(&'static [(&'static str, &'static str)]),
    /// Matches the district only when the state is the given one.
    WithinState {
        state: &'static str,
        district: &'static str,
        target: &'static str,
    },
}

impl RewriteRule {
    fn apply(&self, text: &str, state: Option<&str>) -> Option<&'static str> {
        match self {
            RewriteRule::Contains(needles, target) => {
                if needles.iter().any(|n| text.contains(n)) {
                    Some(*target)
                } else {
                    None
                }
            }
            RewriteRule::Table(entries) => entries
                .iter()
                .find(|(from, _)| *from == text)
                .map(|(_, to)| *to),
            RewriteRule::WithinState {
                state: s,
                district,
                target,
            } => {
                if state == Some(*s) && text == *district {
                    Some(*target)
                } else {
                    None
                }
            }
        }
    }
}

const STATE_VARIANTS: &[(&str, &str)] = &[
    ("Orissa", "Odisha"),
    ("Pondicherry", "Puducherry"),
    ("West Bangal", "West Bengal"),
    ("Westbengal", "West Bengal"),
    ("West Bengli", "West Bengal"),
    ("Uttaranchal", "Uttarakhand"),
    ("Tamilnadu", "Tamil Nadu"),
    ("Chhatisgarh", "Chhattisgarh"),
    ("Nct Of Delhi", "Delhi"),
    ("Andaman And Nicobar", "Andaman And Nicobar Islands"),
];

/// Structural overrides come first, they catch every ordering and spelling of the two
/// multi-word union territories.
pub const STATE_RULES: &[RewriteRule] = &[
    RewriteRule::Contains(&["Dadra", "Daman"], DNHDD),
    RewriteRule::Contains(&["Jammu"], JAMMU_KASHMIR),
    RewriteRule::Table(STATE_VARIANTS),
];

const DISTRICT_VARIANTS: &[(&str, &str)] = &[
    ("Gurgaon", "Gurugram"),
    ("Banglore", "Bengaluru"),
    ("Bangalore", "Bengaluru"),
    ("Bangalore Rural", "Bengaluru Rural"),
    ("Bangalore Urban", "Bengaluru Urban"),
    ("Mysore", "Mysuru"),
    ("Belgaum", "Belagavi"),
    ("Faizabad", "Ayodhya"),
    ("Allahabad", "Prayagraj"),
    ("Osmanabad", "Dharashiv"),
    ("Shimoga", "Shivamogga"),
    ("Mangalore", "Mangaluru"),
    ("Bellary", "Ballari"),
    ("Gulbarga", "Kalaburagi"),
    ("Bijapur", "Vijayapura"),
    ("Chikmagalur", "Chikkamagaluru"),
    ("Tumkur", "Tumakuru"),
    ("Hospet", "Hosapete"),
    ("Hubli", "Hubballi"),
    ("Alappuzha", "Alleppey"),
    ("Palakkad", "Palghat"),
    ("Thrissur", "Trichur"),
    ("Kozhikode", "Calicut"),
    ("Kollam", "Quilon"),
    ("Panjim", "Panaji"),
    ("Cochin", "Kochi"),
    ("Trivandrum", "Thiruvananthapuram"),
    ("Gauhati", "Guwahati"),
    ("Benares", "Varanasi"),
    ("Banaras", "Varanasi"),
    ("Cawnpore", "Kanpur"),
    ("Pondicherry", "Puducherry"),
    ("Buldana", "Buldhana"),
    ("Beed", "Bid"),
    ("Mughalsarai", "Pt. Deen Dayal Upadhyaya Nagar"),
    ("Tirunelveli", "Nellai"),
    ("Vizag", "Visakhapatnam"),
    ("Waltair", "Visakhapatnam"),
    ("Vishakhapatnam", "Visakhapatnam"),
    ("Madras", "Chennai"),
    ("Bombay", "Mumbai"),
    ("Calcutta", "Kolkata"),
    ("Poona", "Pune"),
    ("Ahmadabad", "Ahmedabad"),
    ("Bulandshahr", "Bulandshahar"),
    ("Cuddapah", "YSR Kadapa"),
    ("Kadapa", "YSR Kadapa"),
    ("Ysr Kadapa", "YSR Kadapa"),
    ("Nellore", "SPSR Nellore"),
    ("Spsr Nellore", "SPSR Nellore"),
    ("Oudh", "Awadh"),
    ("Baroda", "Vadodara"),
    ("Dharabadi", "Dharwad"),
    ("Haidarabad", "Hyderabad"),
];

/// The state-scoped rule disambiguates from the district of the same name in Bihar.
pub const DISTRICT_RULES: &[RewriteRule] = &[
    RewriteRule::WithinState {
        state: "Maharashtra",
        district: "Aurangabad",
        target: "Chhatrapati Sambhajinagar",
    },
    RewriteRule::Table(DISTRICT_VARIANTS),
];

/// Districts historically filed under a predecessor state.
pub const STATE_REASSIGNMENTS: &[(&str, &str)] = &[
    ("Hyderabad", "Telangana"),
    ("Cyberabad", "Telangana"),
    ("Rangareddy", "Telangana"),
    ("Warangal", "Telangana"),
    ("Khammam", "Telangana"),
];

/// The closed set of canonical state and union territory names.
pub const VALID_STATES: &[&str] = &[
    "Andaman And Nicobar Islands",
    "Andhra Pradesh",
    "Arunachal Pradesh",
    "Assam",
    "Bihar",
    "Chandigarh",
    "Chhattisgarh",
    DNHDD,
    "Delhi",
    "Goa",
    "Gujarat",
    "Haryana",
    "Himachal Pradesh",
    JAMMU_KASHMIR,
    "Jharkhand",
    "Karnataka",
    "Kerala",
    "Ladakh",
    "Lakshadweep",
    "Madhya Pradesh",
    "Maharashtra",
    "Manipur",
    "Meghalaya",
    "Mizoram",
    "Nagaland",
    "Odisha",
    "Puducherry",
    "Punjab",
    "Rajasthan",
    "Sikkim",
    "Tamil Nadu",
    "Telangana",
    "Tripura",
    "Uttar Pradesh",
    "Uttarakhand",
    "West Bengal",
];

/// Upper-cases the first letter of every word and lower-cases the others.
/// A word is a run of alphabetic characters.
pub fn title_case(s: &str) -> String {
    let mut res = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                res.extend(c.to_lowercase());
            } else {
                res.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            res.push(c);
            prev_alpha = false;
        }
    }
    res
}

/// Collapses whitespace runs, title-cases and spells out the ampersand.
fn normalize_label(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<&str>>().join(" ");
    title_case(&collapsed).replace(" & ", " And ")
}

fn apply_rules(rules: &[RewriteRule], text: String, state: Option<&str>) -> String {
    rules
        .iter()
        .find_map(|r| r.apply(&text, state))
        .map(|s| s.to_string())
        .unwrap_or(text)
}

/// Resolves a raw state label. Returns `None` when the label is missing, purely numeric
/// or outside the closed set of administrative names.
pub fn canonicalize_state(raw_state: Option<&str>) -> Option<String> {
    let raw = raw_state?;
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let state = apply_rules(STATE_RULES, normalize_label(trimmed), None);
    if VALID_STATES.contains(&state.as_str()) {
        Some(state)
    } else {
        None
    }
}

/// Resolves a raw district label, given the canonical state of the record.
pub fn canonicalize_district(state: &str, raw_district: Option<&str>) -> Option<String> {
    let raw = raw_district?.trim();
    if raw.is_empty() {
        return None;
    }
    Some(apply_rules(DISTRICT_RULES, normalize_label(raw), Some(state)))
}

/// Forces the state of the districts that are known to be filed under the wrong state.
pub fn reassign_state(location: CanonicalLocation) -> CanonicalLocation {
    let forced = location.district.as_deref().and_then(|d| {
        STATE_REASSIGNMENTS
            .iter()
            .find(|(district, _)| *district == d)
            .map(|(_, state)| *state)
    });
    match forced {
        Some(state) => CanonicalLocation {
            state: state.to_string(),
            district: location.district,
        },
        None => location,
    }
}

/// Maps a raw (state, district) pair to its canonical location.
///
/// This is a pure function: the same input always gives the same output, and applying
/// it to a canonical location returns that location.
pub fn canonicalize(raw_state: Option<&str>, raw_district: Option<&str>) -> Resolution {
    let state = match canonicalize_state(raw_state) {
        Some(s) => s,
        None => return Resolution::Unknown,
    };
    let district = canonicalize_district(&state, raw_district);
    Resolution::Resolved(reassign_state(CanonicalLocation { state, district }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved(state: &str, district: Option<&str>) -> Resolution {
        Resolution::Resolved(CanonicalLocation {
            state: state.to_string(),
            district: district.map(|s| s.to_string()),
        })
    }

    #[test]
    fn title_case_words() {
        assert_eq!(title_case("andhra PRADESH"), "Andhra Pradesh");
        assert_eq!(title_case("o'neil-road 2nd"), "O'Neil-Road 2Nd");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn numeric_and_missing_states_are_unknown() {
        assert_eq!(canonicalize(Some("12345"), Some("Pune")), Resolution::Unknown);
        assert_eq!(canonicalize(None, Some("Pune")), Resolution::Unknown);
        assert_eq!(canonicalize(Some("   "), None), Resolution::Unknown);
        assert_eq!(canonicalize(Some("Atlantis"), None), Resolution::Unknown);
    }

    #[test]
    fn normalizes_formatting() {
        assert_eq!(
            canonicalize(Some("  tamil nadu "), Some(" madras")),
            resolved("Tamil Nadu", Some("Chennai"))
        );
        assert_eq!(
            canonicalize(Some("Andaman & Nicobar Islands"), None),
            resolved("Andaman And Nicobar Islands", None)
        );
        assert_eq!(canonicalize(Some("ORISSA"), None), resolved("Odisha", None));
        assert_eq!(
            canonicalize(Some("West  Bengal"), None),
            resolved("West Bengal", None)
        );
    }

    #[test]
    fn collapses_internal_whitespace() {
        assert_eq!(
            canonicalize(Some("Uttar  Pradesh"), None),
            resolved("Uttar Pradesh", None)
        );
        assert_eq!(
            canonicalize(Some("West \t  Bengal"), None),
            resolved("West Bengal", None)
        );
        assert_eq!(
            canonicalize(Some("karnataka"), Some("Bengaluru   Urban")),
            resolved("Karnataka", Some("Bengaluru Urban"))
        );
        assert_idempotent("Uttar  Pradesh", Some("Lucknow  "));
    }

    #[test]
    fn structural_overrides_take_priority() {
        assert_eq!(
            canonicalize(Some("jammu & kashmir"), None),
            resolved("Jammu and Kashmir", None)
        );
        assert_eq!(
            canonicalize(Some("JAMMU AND KASHMIR"), None),
            resolved("Jammu and Kashmir", None)
        );
        assert_eq!(
            canonicalize(Some("The Dadra And Nagar Haveli"), None),
            resolved(DNHDD, None)
        );
        assert_eq!(
            canonicalize(Some("Daman & Diu"), None),
            resolved(DNHDD, None)
        );
    }

    #[test]
    fn state_scoped_district_rule() {
        assert_eq!(
            canonicalize(Some("Maharashtra"), Some("aurangabad")),
            resolved("Maharashtra", Some("Chhatrapati Sambhajinagar"))
        );
        assert_eq!(
            canonicalize(Some("Bihar"), Some("Aurangabad")),
            resolved("Bihar", Some("Aurangabad"))
        );
    }

    #[test]
    fn reassigns_telangana_districts() {
        assert_eq!(
            canonicalize(Some("Andhra Pradesh"), Some("Hyderabad")),
            resolved("Telangana", Some("Hyderabad"))
        );
        assert_eq!(
            canonicalize(Some("Andhra Pradesh"), Some("Haidarabad")),
            resolved("Telangana", Some("Hyderabad"))
        );
        assert_eq!(
            canonicalize(Some("Karnataka"), Some("WARANGAL")),
            resolved("Telangana", Some("Warangal"))
        );
    }

    fn assert_idempotent(state: &str, district: Option<&str>) {
        if let Resolution::Resolved(loc) = canonicalize(Some(state), district) {
            let again = canonicalize(Some(&loc.state), loc.district.as_deref());
            assert_eq!(again, Resolution::Resolved(loc.clone()), "input {:?} {:?}", state, district);
        }
    }

    #[test]
    fn canonicalization_is_idempotent() {
        for state in VALID_STATES {
            assert_idempotent(state, None);
        }
        for (from, _) in STATE_VARIANTS {
            assert_idempotent(from, Some("Some District"));
        }
        for (from, _) in DISTRICT_VARIANTS {
            assert_idempotent("Karnataka", Some(*from));
            assert_idempotent("Maharashtra", Some(*from));
        }
        for (district, _) in STATE_REASSIGNMENTS {
            assert_idempotent("Andhra Pradesh", Some(*district));
        }
        assert_idempotent("maharashtra", Some("Aurangabad"));
        assert_idempotent("jammu", Some("srinagar"));
    }

    #[test]
    fn canonical_states_are_in_closed_set() {
        for (_, to) in STATE_VARIANTS {
            assert!(VALID_STATES.contains(to), "{}", to);
        }
        for (_, to) in STATE_REASSIGNMENTS {
            assert!(VALID_STATES.contains(to), "{}", to);
        }
    }
}
