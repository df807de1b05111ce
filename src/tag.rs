//! Filename tag formatting and detection.
//!
//! A tag is the suffix `_Lat_{lat}_Lng_{lng}` with both coordinates at
//! exactly three decimals (~111m), inserted between a file's stem and its
//! extension. Formatting and detection round-trip: a name produced by
//! [`format_tag`] is always recognized by [`is_already_tagged`].

use crate::location::LocationFix;

/// Render the filename suffix for a fix. Pure; the only characters it can
/// emit are ASCII letters, digits, `_`, `-` and `.`, all filesystem-legal.
pub fn format_tag(fix: &LocationFix) -> String {
    format!(
        "_Lat_{}_Lng_{}",
        format_coord(fix.latitude),
        format_coord(fix.longitude)
    )
}

/// Three decimals, rounding half away from zero. Works on integer
/// milli-degrees so the printed value never double-rounds.
fn format_coord(value: f64) -> String {
    let milli = (value.abs() * 1000.0 + 0.5).floor() as i64;
    let sign = if value.is_sign_negative() && milli > 0 {
        "-"
    } else {
        ""
    };
    format!("{}{}.{:03}", sign, milli / 1000, milli % 1000)
}

/// True when the stem already ends with `_Lat_<number>_Lng_<number>`.
/// A tag buried mid-stem does not count; that file still gets tagged.
pub fn is_already_tagged(filename: &str) -> bool {
    let (stem, _) = split_name(filename);
    let Some(pos) = stem.rfind("_Lat_") else {
        return false;
    };
    let rest = &stem[pos + "_Lat_".len()..];
    let Some(rest) = strip_number(rest) else {
        return false;
    };
    let Some(rest) = rest.strip_prefix("_Lng_") else {
        return false;
    };
    matches!(strip_number(rest), Some(""))
}

/// Split into (stem, extension-with-dot). A leading dot is part of the
/// stem, so hidden files have no extension.
pub fn split_name(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => name.split_at(idx),
        _ => (name, ""),
    }
}

/// Strip a `-?digits(.digits)?` prefix, returning the remainder.
fn strip_number(s: &str) -> Option<&str> {
    let body = s.strip_prefix('-').unwrap_or(s);
    let int_len = body.bytes().take_while(u8::is_ascii_digit).count();
    if int_len == 0 {
        return None;
    }
    let rest = &body[int_len..];
    match rest.strip_prefix('.') {
        Some(frac) => {
            let frac_len = frac.bytes().take_while(u8::is_ascii_digit).count();
            if frac_len == 0 {
                return None;
            }
            Some(&frac[frac_len..])
        }
        None => Some(rest),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::{LocationFix, LocationSource};

    fn fix(lat: f64, lng: f64) -> LocationFix {
        LocationFix::new(lat, lng, None, LocationSource::Gps)
    }

    #[test]
    fn test_format_tag_example() {
        assert_eq!(
            format_tag(&fix(34.1234, -118.9876)),
            "_Lat_34.123_Lng_-118.988"
        );
    }

    #[test]
    fn test_format_tag_zero() {
        assert_eq!(format_tag(&fix(0.0, 0.0)), "_Lat_0.000_Lng_0.000");
    }

    #[test]
    fn test_rounding_half_away_from_zero() {
        // 0.0625 is exactly representable; bankers' rounding would print 0.062.
        assert_eq!(format_coord(0.0625), "0.063");
        assert_eq!(format_coord(-0.0625), "-0.063");
        assert_eq!(format_coord(2.0625), "2.063");
    }

    #[test]
    fn test_negative_epsilon_has_no_sign() {
        assert_eq!(format_coord(-0.0001), "0.000");
    }

    #[test]
    fn test_format_tag_deterministic_and_legal() {
        let f = fix(-89.99949, 179.99951);
        let a = format_tag(&f);
        let b = format_tag(&f);
        assert_eq!(a, b);
        assert_eq!(a, "_Lat_-89.999_Lng_180.000");
        assert!(a
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.'));
    }

    #[test]
    fn test_round_trip_detection() {
        for (lat, lng) in [
            (34.1234, -118.9876),
            (0.0, 0.0),
            (-89.9999, 179.9999),
            (51.5074, -0.1278),
        ] {
            let name = format!("photo{}{}", format_tag(&fix(lat, lng)), ".jpg");
            assert!(is_already_tagged(&name), "not detected: {}", name);
        }
    }

    #[test]
    fn test_detects_existing_tag() {
        assert!(is_already_tagged("doc_Lat_10.000_Lng_20.000.txt"));
        assert!(is_already_tagged("doc_Lat_-10.000_Lng_-20.000.txt"));
        assert!(is_already_tagged("no_extension_Lat_1.000_Lng_2.000"));
    }

    #[test]
    fn test_untagged_names() {
        assert!(!is_already_tagged("photo1.jpg"));
        assert!(!is_already_tagged("Latitude_notes.txt"));
        assert!(!is_already_tagged("doc_Lat__Lng_.txt"));
        assert!(!is_already_tagged("doc_Lat_abc_Lng_def.txt"));
    }

    #[test]
    fn test_tag_mid_stem_does_not_count() {
        // The tag must immediately precede the extension.
        assert!(!is_already_tagged("a_Lat_1.000_Lng_2.000_copy.jpg"));
    }

    #[test]
    fn test_repeated_lat_marker() {
        assert!(is_already_tagged("a_Lat_b_Lat_1.000_Lng_2.000.jpg"));
        assert!(!is_already_tagged("_Lat_1.000_Lng_2.000_Lat_x.jpg"));
    }

    #[test]
    fn test_split_name() {
        assert_eq!(split_name("photo1.jpg"), ("photo1", ".jpg"));
        assert_eq!(split_name("archive.tar.gz"), ("archive.tar", ".gz"));
        assert_eq!(split_name("README"), ("README", ""));
        assert_eq!(split_name(".bashrc"), (".bashrc", ""));
    }
}
