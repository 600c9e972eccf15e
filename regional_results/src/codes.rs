use crate::config::OverseasFilter;

/// Brings a department or region code to its canonical form: surrounding
/// whitespace removed and left-padded with zeros up to `width`.
///
/// Codes longer than `width` are left untouched (`971`, `2A` with width 1).
/// Applying it twice gives the same result as applying it once.
pub fn normalize_code(code: &str, width: usize) -> String {
    let trimmed = code.trim();
    let len = trimmed.chars().count();
    if len >= width {
        trimmed.to_string()
    } else {
        let mut res = "0".repeat(width - len);
        res.push_str(trimmed);
        res
    }
}

/// True if the (normalized) code designates an overseas territory or the
/// foreign-resident constituencies. These ballots are never attached to a region.
pub fn is_out_of_scope(code: &str, filter: &OverseasFilter) -> bool {
    match filter {
        OverseasFilter::NonDigit => code.chars().any(|c| !c.is_ascii_digit()),
        OverseasFilter::Marker(marker) => !marker.is_empty() && code.contains(marker.as_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_short_codes() {
        assert_eq!(normalize_code("1", 2), "01");
        assert_eq!(normalize_code(" 7 ", 2), "07");
        assert_eq!(normalize_code("", 2), "00");
    }

    #[test]
    fn keeps_long_codes() {
        assert_eq!(normalize_code("971", 2), "971");
        assert_eq!(normalize_code("2A", 2), "2A");
        assert_eq!(normalize_code("ZZ", 2), "ZZ");
    }

    #[test]
    fn normalization_is_idempotent() {
        for code in ["1", "01", " 3", "2A", "ZA", "971", "", "0"] {
            for width in 1..4 {
                let once = normalize_code(code, width);
                assert_eq!(normalize_code(&once, width), once, "code {:?}", code);
            }
        }
    }

    #[test]
    fn non_digit_filter() {
        let f = OverseasFilter::NonDigit;
        assert!(is_out_of_scope("ZA", &f));
        assert!(is_out_of_scope("2Z", &f));
        assert!(is_out_of_scope("2A", &f));
        assert!(!is_out_of_scope("01", &f));
        assert!(!is_out_of_scope("971", &f));
    }

    #[test]
    fn marker_filter() {
        let f = OverseasFilter::Marker("Z".to_string());
        assert!(is_out_of_scope("ZZ", &f));
        assert!(is_out_of_scope("2Z", &f));
        assert!(!is_out_of_scope("2A", &f));
        assert!(!is_out_of_scope("01", &f));
        // An empty marker never matches.
        assert!(!is_out_of_scope("ZZ", &OverseasFilter::Marker("".to_string())));
    }
}
