//! Decoding of the bracket-suffix naming grammar.
//!
//! `<basename>[<token>(:<token>)*]`: everything before the first `[` is the
//! basename; the bracket interior splits on `:` into tokens that are trimmed
//! and lower-cased, then classified against an ordered rule list. Tokens are
//! matched in a fixed priority order, kept stable so names authored for
//! earlier revisions of the tool keep decoding the same way:
//!
//! 1. all digits: diameter in millimeters
//! 2. `d<mm>`: diameter in millimeters (decimals allowed)
//! 3. `s<n>`: sweep steps
//! 4. `f` / `f<n>`: flip (bare `f` means true, otherwise nonzero)
//! 5. `p<n>`: polygon type
//! 6. `n<n>`: cross-section sides
//! 7. anything else: material name (last one wins)
//!
//! A consequence of rule order: a material literally named e.g. `flip` or
//! `s16` cannot be expressed; the reserved prefixes shadow it.
//!
//! Decoding is total. A token whose numeric remainder fails to parse leaves
//! the corresponding field at its prior value and decoding continues.

use tracing::debug;

use crate::model::ParameterSet;

/// Decode an entity name into a complete [`ParameterSet`]. Never fails.
pub fn decode(name: &str) -> ParameterSet {
    let mut params = ParameterSet::default();

    let Some(open) = name.find('[') else {
        params.basename = name.trim().to_string();
        return params;
    };

    params.basename = name[..open].trim().to_string();

    // Missing `]` tolerated: the rest of the string is the interior.
    let rest = &name[open + 1..];
    let interior = match rest.find(']') {
        Some(close) => &rest[..close],
        None => rest,
    };

    for raw in interior.split(':') {
        let token = raw.trim().to_lowercase();
        if token.is_empty() {
            continue;
        }
        classify(&token, &mut params);
    }

    params
}

fn classify(token: &str, params: &mut ParameterSet) {
    if token.bytes().all(|b| b.is_ascii_digit()) {
        apply_f64(token, token, &mut params.diameter, |mm| mm / 1000.0);
    } else if let Some(rest) = token.strip_prefix('d') {
        apply_f64(token, rest, &mut params.diameter, |mm| mm / 1000.0);
    } else if let Some(rest) = token.strip_prefix('s') {
        apply_int(token, rest, &mut params.steps);
    } else if let Some(rest) = token.strip_prefix('f') {
        if rest.is_empty() {
            params.flip = true;
        } else {
            match rest.parse::<i64>() {
                Ok(v) => params.flip = v != 0,
                Err(_) => debug!(token, "malformed flip token, keeping prior value"),
            }
        }
    } else if let Some(rest) = token.strip_prefix('p') {
        apply_int(token, rest, &mut params.polygon_type);
    } else if let Some(rest) = token.strip_prefix('n') {
        apply_int(token, rest, &mut params.sides);
    } else {
        params.material = token.to_string();
    }
}

fn apply_f64(token: &str, digits: &str, field: &mut f64, map: impl FnOnce(f64) -> f64) {
    match digits.parse::<f64>() {
        Ok(v) if v.is_finite() => *field = map(v),
        _ => debug!(token, "malformed numeric token, keeping prior value"),
    }
}

fn apply_int<T: std::str::FromStr>(token: &str, digits: &str, field: &mut T) {
    match digits.parse::<T>() {
        Ok(v) => *field = v,
        Err(_) => debug!(token, "malformed integer token, keeping prior value"),
    }
}

/// Re-emit a name carrying only the non-default fields of `params`.
///
/// Inverse of [`decode`] up to normalization: decoding the encoded form
/// yields the same `ParameterSet` again. Used for display and idempotence
/// checks; the host is never renamed by the core.
pub fn encode(params: &ParameterSet) -> String {
    let defaults = ParameterSet::default();
    let mut tokens: Vec<String> = Vec::new();

    if params.diameter != defaults.diameter {
        let mm = params.diameter * 1000.0;
        if mm.fract() == 0.0 && mm >= 0.0 {
            tokens.push(format!("{}", mm as u64));
        } else {
            tokens.push(format!("d{mm}"));
        }
    }
    if params.steps != defaults.steps {
        tokens.push(format!("s{}", params.steps));
    }
    if params.flip != defaults.flip {
        tokens.push("f".to_string());
    }
    if params.polygon_type != defaults.polygon_type {
        tokens.push(format!("p{}", params.polygon_type));
    }
    if params.sides != defaults.sides {
        tokens.push(format!("n{}", params.sides));
    }
    if params.material != defaults.material {
        tokens.push(params.material.clone());
    }

    if tokens.is_empty() {
        params.basename.clone()
    } else {
        format!("{}[{}]", params.basename, tokens.join(":"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DEFAULT_COMPENSATION, DEFAULT_POLYGON_TYPE, DEFAULT_SIDES};

    #[test]
    fn plain_name_is_all_defaults() {
        let p = decode("PlainCurve");
        assert_eq!(p.basename, "PlainCurve");
        assert_eq!(p, ParameterSet {
            basename: "PlainCurve".to_string(),
            ..ParameterSet::default()
        });
    }

    #[test]
    fn plain_name_is_trimmed() {
        assert_eq!(decode("  Wire 01  ").basename, "Wire 01");
    }

    #[test]
    fn full_token_list() {
        let p = decode("MyCable[12:s16:f:brass]");
        assert_eq!(p.basename, "MyCable");
        assert_eq!(p.diameter, 0.012);
        assert_eq!(p.steps, 16);
        assert!(p.flip);
        assert_eq!(p.material, "brass");
        assert_eq!(p.compensation, DEFAULT_COMPENSATION);
        assert_eq!(p.polygon_type, DEFAULT_POLYGON_TYPE);
        assert_eq!(p.sides, DEFAULT_SIDES);
    }

    #[test]
    fn prefixed_tokens() {
        let p = decode("c[d2.5:p0:n12:f0]");
        assert_eq!(p.diameter, 0.0025);
        assert_eq!(p.polygon_type, 0);
        assert_eq!(p.sides, 12);
        assert!(!p.flip);
    }

    #[test]
    fn tokens_are_case_insensitive_and_trimmed() {
        let p = decode("c[ D8 : S10 : Brass ]");
        assert_eq!(p.diameter, 0.008);
        assert_eq!(p.steps, 10);
        assert_eq!(p.material, "brass");
    }

    #[test]
    fn malformed_token_keeps_field_and_continues() {
        let p = decode("c[sxx:7:fzz]");
        assert_eq!(p.steps, ParameterSet::default().steps);
        assert!(!p.flip);
        assert_eq!(p.diameter, 0.007);
    }

    #[test]
    fn last_material_wins() {
        assert_eq!(decode("c[copper:brass]").material, "brass");
    }

    #[test]
    fn empty_tokens_are_skipped() {
        let p = decode("c[12::f]");
        assert_eq!(p.diameter, 0.012);
        assert!(p.flip);
        assert!(p.material.is_empty());
    }

    #[test]
    fn missing_close_bracket_is_tolerated() {
        let p = decode("c[12:brass");
        assert_eq!(p.diameter, 0.012);
        assert_eq!(p.material, "brass");
    }

    #[test]
    fn decode_is_total_on_junk() {
        for s in ["", "[", "]", "[[]]", "a[:::]", "x[\u{1F600}]", "[]name"] {
            let _ = decode(s);
        }
    }

    #[test]
    fn reserved_prefix_shadows_material() {
        // Inherited grammar ambiguity: "flip" parses as a flip token.
        let p = decode("c[flip]");
        assert!(p.material.is_empty());
    }

    #[test]
    fn encode_omits_defaults() {
        let p = ParameterSet {
            basename: "MyCable".to_string(),
            ..ParameterSet::default()
        };
        assert_eq!(encode(&p), "MyCable");
    }

    #[test]
    fn encode_decode_fixed_point() {
        for s in [
            "MyCable[12:s16:f:brass]",
            "c[d2.5:p0:n12]",
            "w[5]",
            "Plain",
            "c[s8:copper]",
        ] {
            let once = decode(s);
            let again = decode(&encode(&once));
            assert_eq!(again, once, "not a fixed point for {s:?}");
        }
    }

    #[test]
    fn encode_fractional_diameter_keeps_prefix() {
        let p = decode("c[d2.5]");
        assert_eq!(encode(&p), "c[d2.5]");
    }
}
