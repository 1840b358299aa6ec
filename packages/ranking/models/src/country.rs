//! Country canonicalization.
//!
//! Ranking sites spell countries inconsistently ("USA", "United States of
//! America", "China (Mainland)", "Korea, South"). [`Country::from_name`]
//! resolves any known spelling to a canonical name and ISO 3166-1 alpha-2
//! code, or fails with [`UnknownCountry`].

use std::collections::BTreeMap;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

/// Canonical country names keyed by ISO 3166-1 alpha-2 code.
const COUNTRIES: &[(&str, &str)] = &[
    ("AD", "Andorra"),
    ("AE", "United Arab Emirates"),
    ("AF", "Afghanistan"),
    ("AG", "Antigua and Barbuda"),
    ("AL", "Albania"),
    ("AM", "Armenia"),
    ("AO", "Angola"),
    ("AR", "Argentina"),
    ("AT", "Austria"),
    ("AU", "Australia"),
    ("AZ", "Azerbaijan"),
    ("BA", "Bosnia and Herzegovina"),
    ("BB", "Barbados"),
    ("BD", "Bangladesh"),
    ("BE", "Belgium"),
    ("BF", "Burkina Faso"),
    ("BG", "Bulgaria"),
    ("BH", "Bahrain"),
    ("BI", "Burundi"),
    ("BJ", "Benin"),
    ("BN", "Brunei"),
    ("BO", "Bolivia"),
    ("BR", "Brazil"),
    ("BS", "Bahamas"),
    ("BT", "Bhutan"),
    ("BW", "Botswana"),
    ("BY", "Belarus"),
    ("BZ", "Belize"),
    ("CA", "Canada"),
    ("CD", "Democratic Republic of the Congo"),
    ("CF", "Central African Republic"),
    ("CG", "Republic of the Congo"),
    ("CH", "Switzerland"),
    ("CI", "Côte d'Ivoire"),
    ("CL", "Chile"),
    ("CM", "Cameroon"),
    ("CN", "China"),
    ("CO", "Colombia"),
    ("CR", "Costa Rica"),
    ("CU", "Cuba"),
    ("CV", "Cabo Verde"),
    ("CY", "Cyprus"),
    ("CZ", "Czechia"),
    ("DE", "Germany"),
    ("DJ", "Djibouti"),
    ("DK", "Denmark"),
    ("DM", "Dominica"),
    ("DO", "Dominican Republic"),
    ("DZ", "Algeria"),
    ("EC", "Ecuador"),
    ("EE", "Estonia"),
    ("EG", "Egypt"),
    ("ER", "Eritrea"),
    ("ES", "Spain"),
    ("ET", "Ethiopia"),
    ("FI", "Finland"),
    ("FJ", "Fiji"),
    ("FR", "France"),
    ("GA", "Gabon"),
    ("GB", "United Kingdom"),
    ("GD", "Grenada"),
    ("GE", "Georgia"),
    ("GH", "Ghana"),
    ("GM", "Gambia"),
    ("GN", "Guinea"),
    ("GQ", "Equatorial Guinea"),
    ("GR", "Greece"),
    ("GT", "Guatemala"),
    ("GW", "Guinea-Bissau"),
    ("GY", "Guyana"),
    ("HK", "Hong Kong"),
    ("HN", "Honduras"),
    ("HR", "Croatia"),
    ("HT", "Haiti"),
    ("HU", "Hungary"),
    ("ID", "Indonesia"),
    ("IE", "Ireland"),
    ("IL", "Israel"),
    ("IN", "India"),
    ("IQ", "Iraq"),
    ("IR", "Iran"),
    ("IS", "Iceland"),
    ("IT", "Italy"),
    ("JM", "Jamaica"),
    ("JO", "Jordan"),
    ("JP", "Japan"),
    ("KE", "Kenya"),
    ("KG", "Kyrgyzstan"),
    ("KH", "Cambodia"),
    ("KM", "Comoros"),
    ("KN", "Saint Kitts and Nevis"),
    ("KP", "North Korea"),
    ("KR", "South Korea"),
    ("KW", "Kuwait"),
    ("KZ", "Kazakhstan"),
    ("LA", "Laos"),
    ("LB", "Lebanon"),
    ("LC", "Saint Lucia"),
    ("LI", "Liechtenstein"),
    ("LK", "Sri Lanka"),
    ("LR", "Liberia"),
    ("LS", "Lesotho"),
    ("LT", "Lithuania"),
    ("LU", "Luxembourg"),
    ("LV", "Latvia"),
    ("LY", "Libya"),
    ("MA", "Morocco"),
    ("MC", "Monaco"),
    ("MD", "Moldova"),
    ("ME", "Montenegro"),
    ("MG", "Madagascar"),
    ("MK", "North Macedonia"),
    ("ML", "Mali"),
    ("MM", "Myanmar"),
    ("MN", "Mongolia"),
    ("MO", "Macao"),
    ("MR", "Mauritania"),
    ("MT", "Malta"),
    ("MU", "Mauritius"),
    ("MV", "Maldives"),
    ("MW", "Malawi"),
    ("MX", "Mexico"),
    ("MY", "Malaysia"),
    ("MZ", "Mozambique"),
    ("NA", "Namibia"),
    ("NE", "Niger"),
    ("NG", "Nigeria"),
    ("NI", "Nicaragua"),
    ("NL", "Netherlands"),
    ("NO", "Norway"),
    ("NP", "Nepal"),
    ("NZ", "New Zealand"),
    ("OM", "Oman"),
    ("PA", "Panama"),
    ("PE", "Peru"),
    ("PG", "Papua New Guinea"),
    ("PH", "Philippines"),
    ("PK", "Pakistan"),
    ("PL", "Poland"),
    ("PR", "Puerto Rico"),
    ("PS", "Palestine"),
    ("PT", "Portugal"),
    ("PY", "Paraguay"),
    ("QA", "Qatar"),
    ("RO", "Romania"),
    ("RS", "Serbia"),
    ("RU", "Russia"),
    ("RW", "Rwanda"),
    ("SA", "Saudi Arabia"),
    ("SC", "Seychelles"),
    ("SD", "Sudan"),
    ("SE", "Sweden"),
    ("SG", "Singapore"),
    ("SI", "Slovenia"),
    ("SK", "Slovakia"),
    ("SL", "Sierra Leone"),
    ("SN", "Senegal"),
    ("SO", "Somalia"),
    ("SR", "Suriname"),
    ("SS", "South Sudan"),
    ("SV", "El Salvador"),
    ("SY", "Syria"),
    ("SZ", "Eswatini"),
    ("TD", "Chad"),
    ("TG", "Togo"),
    ("TH", "Thailand"),
    ("TJ", "Tajikistan"),
    ("TL", "Timor-Leste"),
    ("TM", "Turkmenistan"),
    ("TN", "Tunisia"),
    ("TR", "Turkey"),
    ("TT", "Trinidad and Tobago"),
    ("TW", "Taiwan"),
    ("TZ", "Tanzania"),
    ("UA", "Ukraine"),
    ("UG", "Uganda"),
    ("US", "United States"),
    ("UY", "Uruguay"),
    ("UZ", "Uzbekistan"),
    ("VA", "Vatican City"),
    ("VE", "Venezuela"),
    ("VN", "Vietnam"),
    ("XK", "Kosovo"),
    ("YE", "Yemen"),
    ("ZA", "South Africa"),
    ("ZM", "Zambia"),
    ("ZW", "Zimbabwe"),
];

/// Alternative spellings seen on ranking sites, mapped to alpha-2 codes.
const ALIASES: &[(&str, &str)] = &[
    ("usa", "US"),
    ("u.s.", "US"),
    ("u.s.a.", "US"),
    ("united states of america", "US"),
    ("uk", "GB"),
    ("u.k.", "GB"),
    ("great britain", "GB"),
    ("england", "GB"),
    ("scotland", "GB"),
    ("wales", "GB"),
    ("northern ireland", "GB"),
    ("china (mainland)", "CN"),
    ("mainland china", "CN"),
    ("china-mainland", "CN"),
    ("people's republic of china", "CN"),
    ("hong kong sar", "HK"),
    ("hong kong sar, china", "HK"),
    ("hong kong, china", "HK"),
    ("china-hong kong", "HK"),
    ("macau", "MO"),
    ("macau sar", "MO"),
    ("macao sar", "MO"),
    ("macao sar, china", "MO"),
    ("china-macau", "MO"),
    ("china-taiwan", "TW"),
    ("taiwan, china", "TW"),
    ("chinese taipei", "TW"),
    ("republic of korea", "KR"),
    ("korea", "KR"),
    ("korea, south", "KR"),
    ("korea, republic of", "KR"),
    ("south korea", "KR"),
    ("korea, north", "KP"),
    ("russian federation", "RU"),
    ("czech republic", "CZ"),
    ("türkiye", "TR"),
    ("turkiye", "TR"),
    ("iran, islamic republic of", "IR"),
    ("iran (islamic republic of)", "IR"),
    ("viet nam", "VN"),
    ("syrian arab republic", "SY"),
    ("brunei darussalam", "BN"),
    ("lao people's democratic republic", "LA"),
    ("macedonia", "MK"),
    ("republic of north macedonia", "MK"),
    ("moldova, republic of", "MD"),
    ("tanzania, united republic of", "TZ"),
    ("venezuela, bolivarian republic of", "VE"),
    ("bolivia, plurinational state of", "BO"),
    ("palestinian territory, occupied", "PS"),
    ("state of palestine", "PS"),
    ("ivory coast", "CI"),
    ("cote d'ivoire", "CI"),
    ("côte d’ivoire", "CI"),
    ("cape verde", "CV"),
    ("swaziland", "SZ"),
    ("burma", "MM"),
    ("east timor", "TL"),
    ("holy see", "VA"),
    ("the netherlands", "NL"),
    ("holland", "NL"),
    ("dr congo", "CD"),
    ("congo, democratic republic of the", "CD"),
    ("congo", "CG"),
    ("the gambia", "GM"),
    ("the bahamas", "BS"),
    ("uae", "AE"),
];

/// Lookup index from lower-cased spelling to alpha-2 code.
static INDEX: LazyLock<BTreeMap<String, &'static str>> = LazyLock::new(|| {
    let mut index = BTreeMap::new();
    for (code, name) in COUNTRIES {
        index.insert(code.to_lowercase(), *code);
        index.insert(name.to_lowercase(), *code);
    }
    for (alias, code) in ALIASES {
        index.insert((*alias).to_owned(), *code);
    }
    index
});

/// A country name that could not be matched against the known list.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown country: '{0}'")]
pub struct UnknownCountry(pub String);

/// A canonicalized country.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Country {
    /// Canonical English short name.
    pub country: String,
    /// ISO 3166-1 alpha-2 code.
    pub country_code: String,
}

impl Country {
    /// Resolves a raw country name, alias, or alpha-2 code.
    ///
    /// Matching is case-insensitive and ignores surrounding and repeated
    /// whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownCountry`] if the name matches no known spelling.
    pub fn from_name(raw: &str) -> Result<Self, UnknownCountry> {
        let key = raw
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();

        let code = INDEX
            .get(&key)
            .ok_or_else(|| UnknownCountry(raw.to_owned()))?;

        Self::from_code(code).ok_or_else(|| UnknownCountry(raw.to_owned()))
    }

    /// Looks up a country by its upper-case alpha-2 code.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        COUNTRIES
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(c, name)| Self {
                country: (*name).to_owned(),
                country_code: (*c).to_owned(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_canonical_names() {
        let c = Country::from_name("Germany").unwrap();
        assert_eq!(c.country, "Germany");
        assert_eq!(c.country_code, "DE");
    }

    #[test]
    fn resolves_aliases_case_insensitively() {
        assert_eq!(Country::from_name("USA").unwrap().country, "United States");
        assert_eq!(
            Country::from_name("  china   (Mainland) ").unwrap().country_code,
            "CN"
        );
        assert_eq!(
            Country::from_name("Korea, South").unwrap().country,
            "South Korea"
        );
        assert_eq!(
            Country::from_name("Russian Federation").unwrap().country_code,
            "RU"
        );
    }

    #[test]
    fn resolves_alpha2_codes() {
        assert_eq!(Country::from_name("gb").unwrap().country, "United Kingdom");
    }

    #[test]
    fn rejects_unknown_names() {
        assert_eq!(
            Country::from_name("Testland"),
            Err(UnknownCountry("Testland".to_owned()))
        );
        assert!(Country::from_name("").is_err());
    }

    #[test]
    fn every_alias_points_at_a_known_code() {
        for (alias, code) in ALIASES {
            assert!(
                Country::from_code(code).is_some(),
                "alias '{alias}' maps to unknown code {code}"
            );
        }
    }
}
