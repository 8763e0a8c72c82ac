//! `application/x-www-form-urlencoded` decoding.
//!
//! Decoding is best effort: invalid percent escapes are kept literally and
//! invalid UTF-8 is replaced, so this path never fails.

use std::collections::HashMap;

/// Decode into every value seen for each key, in order of appearance.
pub fn decode_multi(buffer: &[u8]) -> HashMap<String, Vec<String>> {
    let mut params: HashMap<String, Vec<String>> = HashMap::new();
    for (key, value) in url::form_urlencoded::parse(buffer) {
        params
            .entry(key.into_owned())
            .or_default()
            .push(value.into_owned());
    }
    params
}

/// Decode into a flat mapping where the first occurrence of a key wins.
pub fn decode(buffer: &[u8]) -> HashMap<String, String> {
    decode_multi(buffer)
        .into_iter()
        .filter_map(|(key, values)| values.into_iter().next().map(|first| (key, first)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_occurrence_wins() {
        let form = decode(b"a=1&b=2&a=3");
        assert_eq!(form.len(), 2);
        assert_eq!(form["a"], "1");
        assert_eq!(form["b"], "2");
    }

    #[test]
    fn multi_keeps_every_value() {
        let form = decode_multi(b"a=1&b=2&a=3");
        assert_eq!(form["a"], vec!["1", "3"]);
        assert_eq!(form["b"], vec!["2"]);
    }

    #[test]
    fn percent_and_plus_decoding() {
        let form = decode(b"name=Ann+Lee&city=S%C3%A3o%20Paulo&flag");
        assert_eq!(form["name"], "Ann Lee");
        assert_eq!(form["city"], "São Paulo");
        assert_eq!(form["flag"], "");
    }

    #[test]
    fn empty_input_is_empty_mapping() {
        assert!(decode(b"").is_empty());
        assert!(decode(b"&&").is_empty());
    }

    #[test]
    fn empty_key_is_kept() {
        let form = decode(b"=orphan&a=1");
        assert_eq!(form.len(), 2);
        assert_eq!(form[""], "orphan");
        assert_eq!(form["a"], "1");
    }

    #[test]
    fn malformed_escapes_are_tolerated() {
        let form = decode(b"q=100%&r=%zz");
        assert_eq!(form["q"], "100%");
        assert_eq!(form["r"], "%zz");
    }
}
