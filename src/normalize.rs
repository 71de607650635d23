//! Normalization of the upstream's inconsistent price and number fields.

use serde_json::Value;

/// Converts a raw price into whole currency units.
///
/// Best-effort heuristic: some sources report prices in minor units (cents)
/// with no flag saying so. Values above 1000 that are exact multiples of 100
/// are assumed to be cents and divided by 100; everything else passes
/// through. A cents value such as `1999` is therefore left untouched.
pub fn normalize_price(raw: f64) -> f64 {
    if !raw.is_finite() || raw < 0.0 {
        return 0.0;
    }
    if raw > 1000.0 && raw % 100.0 == 0.0 {
        raw / 100.0
    } else {
        raw
    }
}

/// Bounds a discount to the 0..=100 percent range.
pub fn clamp_discount(raw: i64) -> u8 {
    raw.clamp(0, 100) as u8
}

/// Derives a discount percentage from an original and a discounted price.
pub fn discount_from_prices(initial: f64, final_price: f64) -> u8 {
    if initial <= 0.0 || final_price <= 0.0 || final_price >= initial {
        return 0;
    }
    clamp_discount(((1.0 - final_price / initial) * 100.0).round() as i64)
}

/// Picks the discounted price, falling back to the original when the
/// discounted one is missing or zero. Both are normalized.
pub fn effective_price(final_price: Option<f64>, initial: Option<f64>) -> f64 {
    let final_price = final_price.map(normalize_price).unwrap_or_default();
    if final_price > 0.0 {
        return final_price;
    }
    initial.map(normalize_price).unwrap_or_default()
}

pub fn value_to_i64(v: &Value) -> Option<i64> {
    if let Some(i) = v.as_i64() {
        return Some(i);
    }
    if let Some(f) = v.as_f64() {
        return Some(f as i64);
    }
    if let Some(s) = v.as_str() {
        return s.trim().parse::<i64>().ok();
    }
    None
}

pub fn value_to_f64(v: &Value) -> Option<f64> {
    if let Some(f) = v.as_f64() {
        return Some(f);
    }
    if let Some(s) = v.as_str() {
        return s.trim().parse::<f64>().ok();
    }
    None
}

/// Reads a string field, tolerating numbers; blank strings count as absent.
pub fn value_to_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parses the loosely-typed app identifier into its canonical string form.
///
/// The upstream sends ids as JSON numbers or as numeric strings depending on
/// the endpoint.
pub fn parse_app_id(v: &Value) -> Option<String> {
    match v {
        Value::Number(n) => n.as_u64().map(|id| id.to_string()),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            match trimmed.parse::<u64>() {
                Ok(id) => Some(id.to_string()),
                Err(_) => Some(trimmed.to_string()),
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn normalize_price_divides_round_cents_above_threshold() {
        assert_eq!(normalize_price(10000.0), 100.0);
        assert_eq!(normalize_price(2000.0), 20.0);
        assert_eq!(normalize_price(1100.0), 11.0);
    }

    #[test]
    fn normalize_price_passes_everything_else_through() {
        assert_eq!(normalize_price(1999.0), 1999.0);
        assert_eq!(normalize_price(999.0), 999.0);
        assert_eq!(normalize_price(1000.0), 1000.0);
        assert_eq!(normalize_price(19.99), 19.99);
        assert_eq!(normalize_price(0.0), 0.0);
    }

    #[test]
    fn normalize_price_floors_invalid_input() {
        assert_eq!(normalize_price(-5.0), 0.0);
        assert_eq!(normalize_price(f64::NAN), 0.0);
        assert_eq!(normalize_price(f64::INFINITY), 0.0);
    }

    #[test]
    fn normalize_price_property_over_range() {
        for x in 0..50_000u32 {
            let raw = f64::from(x);
            let out = normalize_price(raw);
            if x > 1000 && x % 100 == 0 {
                assert_eq!(out, raw / 100.0, "x = {x}");
            } else {
                assert_eq!(out, raw, "x = {x}");
            }
        }
    }

    #[test]
    fn effective_price_falls_back_to_initial() {
        assert_eq!(effective_price(Some(0.0), Some(2000.0)), 20.0);
        assert_eq!(effective_price(None, Some(500.0)), 500.0);
        assert_eq!(effective_price(Some(1500.0), Some(3000.0)), 15.0);
        assert_eq!(effective_price(None, None), 0.0);
    }

    #[test]
    fn discount_is_derived_and_clamped() {
        assert_eq!(discount_from_prices(2000.0, 1000.0), 50);
        assert_eq!(discount_from_prices(0.0, 1000.0), 0);
        assert_eq!(discount_from_prices(1000.0, 1500.0), 0);
        assert_eq!(clamp_discount(150), 100);
        assert_eq!(clamp_discount(-3), 0);
    }

    #[test]
    fn app_id_accepts_numbers_and_strings() {
        assert_eq!(parse_app_id(&json!(730)), Some("730".to_string()));
        assert_eq!(parse_app_id(&json!(" 730 ")), Some("730".to_string()));
        assert_eq!(parse_app_id(&json!("0730")), Some("730".to_string()));
        assert_eq!(parse_app_id(&json!("")), None);
        assert_eq!(parse_app_id(&json!(null)), None);
        assert_eq!(parse_app_id(&json!(-1)), None);
        assert_eq!(parse_app_id(&json!(true)), None);
    }

    #[test]
    fn numeric_coercions_accept_strings() {
        assert_eq!(value_to_i64(&json!("42")), Some(42));
        assert_eq!(value_to_i64(&json!(42)), Some(42));
        assert_eq!(value_to_f64(&json!("19.5")), Some(19.5));
        assert_eq!(value_to_f64(&json!([])), None);
        assert_eq!(value_to_string(&json!("  ")), None);
        assert_eq!(value_to_string(&json!(7)), Some("7".to_string()));
    }
}
