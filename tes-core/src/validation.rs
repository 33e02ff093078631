//! Query-parameter parsing and clamping helpers shared by the gauge,
//! threshold, and spline endpoints.

use crate::error::Error;

/// Parses `raw` as `f64`, clamping into `[min, max]`. Returns
/// `Error::validation` (not a panic) when `raw` does not parse: a bad query
/// parameter is an ordinary `400` response, not exceptional control flow.
pub fn parse_clamped_f64(field: &str, raw: &str, min: f64, max: f64) -> Result<f64, Error> {
    let parsed: f64 = raw.parse().map_err(|_| {
        Error::validation(field, raw, format!("a number in [{min}, {max}]"))
    })?;
    if parsed.is_nan() {
        return Err(Error::validation(field, raw, format!("a number in [{min}, {max}]")));
    }
    Ok(parsed.clamp(min, max))
}

/// Parses a comma-separated list of `f64` values, e.g. `?points=0.1,0.4,0.9`.
/// An empty `raw` yields an empty vec rather than an error: absent points is
/// a valid (if trivial) curve.
pub fn parse_csv_f64(field: &str, raw: &str) -> Result<Vec<f64>, Error> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    raw.split(',')
        .map(|piece| {
            piece.trim().parse::<f64>().map_err(|_| {
                Error::validation(field, piece.trim(), "a comma-separated list of numbers")
            })
        })
        .collect()
}

/// Decodes a percent-encoded route parameter, substituting U+FFFD for any
/// byte sequence that is not valid UTF-8 after decoding rather than
/// rejecting the request outright.
#[must_use]
pub fn decode_path_param(raw: &str) -> String {
    percent_encoding::percent_decode_str(raw)
        .decode_utf8_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_above_max() {
        assert_eq!(parse_clamped_f64("tension", "2.5", 0.0, 1.0).unwrap(), 1.0);
    }

    #[test]
    fn clamps_below_min() {
        assert_eq!(parse_clamped_f64("tension", "-2.5", 0.0, 1.0).unwrap(), 0.0);
    }

    #[test]
    fn rejects_unparsable_number() {
        assert!(parse_clamped_f64("tension", "nope", 0.0, 1.0).is_err());
    }

    #[test]
    fn csv_parses_points() {
        assert_eq!(
            parse_csv_f64("points", "0.1, 0.4 ,0.9").unwrap(),
            vec![0.1, 0.4, 0.9]
        );
    }

    #[test]
    fn csv_empty_input_is_empty_list() {
        assert_eq!(parse_csv_f64("points", "").unwrap(), Vec::<f64>::new());
    }

    #[test]
    fn path_param_decodes_percent_encoding() {
        assert_eq!(decode_path_param("worker%20one"), "worker one");
    }

    #[test]
    fn path_param_replaces_invalid_utf8_with_replacement_char() {
        assert_eq!(decode_path_param("%ff%fe"), "\u{FFFD}\u{FFFD}");
    }
}
