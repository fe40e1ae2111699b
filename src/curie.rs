// src/curie.rs
use std::fmt::Write;

const UMLS_CONCEPT_BASE: &str = "https://uts.nlm.nih.gov/uts/umls/concept/";
const BIOREGISTRY_BASE: &str = "http://bioregistry.io/";

/// Maps a CURIE to a URL a person can open to learn about it.
///
/// URIs are returned unchanged, UMLS concepts link to the UMLS browser and
/// everything else is resolved through bioregistry.io.
pub fn url_for_curie(curie: &str) -> String {
    match curie.split_once(':') {
        Some((prefix, _)) if matches!(prefix.to_uppercase().as_str(), "HTTP" | "HTTPS" | "URN") => {
            curie.to_string()
        }
        Some((prefix, local_id)) if prefix.eq_ignore_ascii_case("UMLS") => {
            format!("{UMLS_CONCEPT_BASE}{local_id}")
        }
        _ => bioregistry_url(curie),
    }
}

fn bioregistry_url(curie: &str) -> String {
    format!("{BIOREGISTRY_BASE}{}", encode_component(curie))
}

/// Percent-encodes every byte outside `A-Z a-z 0-9 - _ . ! ~ * ' ( )`, the
/// same set browsers leave alone in a URI component.
fn encode_component(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'_'
            | b'.'
            | b'!'
            | b'~'
            | b'*'
            | b'\''
            | b'('
            | b')' => encoded.push(char::from(byte)),
            _ => {
                let _ = write!(encoded, "%{:02X}", byte);
            }
        }
    }
    encoded
}
