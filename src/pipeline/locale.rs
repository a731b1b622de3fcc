//! Brazilian-locale normalisation.
//!
//! Two independent passes:
//!
//! 1. **Dates, on free text** ([`normalize_dates`]): `DD/MM/YYYY` becomes
//!    `YYYY-MM-DD` before the text reaches the model, so the model never has
//!    to guess whether `03/04/2024` is March or April.
//! 2. **Numbers, on the parsed record** ([`normalize_numbers`]): string
//!    leaves such as `"1.234,56"` become JSON numbers. Everything that does
//!    not parse stays exactly as the model wrote it.
//!
//! Purely numeric strings (account numbers, CPF digits) are converted too
//! and lose leading zeros. Downstream consumers rely on that.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Number, Value};

// ── Dates ─────────────────────────────────────────────────────────────────────

static RE_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{2})/(\d{2})/(\d{4})").unwrap());

/// Rewrite every calendar-valid `DD/MM/YYYY` in `text` to `YYYY-MM-DD`.
///
/// Matches are plain substrings, so dates glued to a label
/// (`VENCIMENTO15/08/2024`) are rewritten too. Invalid matches (`32/01/2024`, `29/02/2023`) are left in place. The
/// output contains no rewritable dates, so applying this twice is the same
/// as applying it once.
pub fn normalize_dates(text: &str) -> String {
    RE_DATE
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let day: u32 = caps[1].parse().unwrap_or(0);
            let month: u32 = caps[2].parse().unwrap_or(0);
            let year: i32 = caps[3].parse().unwrap_or(0);
            match NaiveDate::from_ymd_opt(year, month, day) {
                Some(date) => date.format("%Y-%m-%d").to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

// ── Numbers ───────────────────────────────────────────────────────────────────

static RE_DECIMAL_COMMA: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d,\d").unwrap());

/// Integers grouped with `.` thousands separators: `1.234`, `12.345.678`.
static RE_DOT_GROUPED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?\d{1,3}(\.\d{3})+$").unwrap());

/// Interpret `s` as a Brazilian-formatted number.
///
/// Returns `None` when the string is not numeric; that is the normal outcome
/// for names, addresses and most other fields.
pub fn parse_br_number(s: &str) -> Option<Number> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let canonical = if RE_DECIMAL_COMMA.is_match(s) {
        s.replace('.', "").replace(',', ".")
    } else if RE_DOT_GROUPED.is_match(s) {
        s.replace('.', "")
    } else {
        s.replace(',', "")
    };

    if !canonical.contains(['.', 'e', 'E']) {
        if let Ok(n) = canonical.parse::<i64>() {
            return Some(Number::from(n));
        }
    }

    canonical
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
}

/// Recursively replace numeric string leaves with JSON numbers.
///
/// Objects keep their keys and order, arrays keep their length, and
/// non-string leaves pass through untouched.
pub fn normalize_numbers(value: Value) -> Value {
    match value {
        Value::String(s) => match parse_br_number(&s) {
            Some(n) => Value::Number(n),
            None => Value::String(s),
        },
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_numbers).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, normalize_numbers(v)))
                .collect::<Map<String, Value>>(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rewrites_valid_date() {
        assert_eq!(normalize_dates("15/08/2024"), "2024-08-15");
        assert_eq!(
            normalize_dates("Vencimento: 05/09/2024 Emissão: 20/08/2024"),
            "Vencimento: 2024-09-05 Emissão: 2024-08-20"
        );
    }

    #[test]
    fn leaves_invalid_dates_in_place() {
        assert_eq!(normalize_dates("32/01/2024"), "32/01/2024");
        assert_eq!(normalize_dates("32/13/2024"), "32/13/2024");
        assert_eq!(normalize_dates("31/04/2024"), "31/04/2024");
    }

    #[test]
    fn honours_leap_years() {
        assert_eq!(normalize_dates("29/02/2024"), "2024-02-29");
        assert_eq!(normalize_dates("29/02/2023"), "29/02/2023");
        assert_eq!(normalize_dates("29/02/1900"), "29/02/1900");
        assert_eq!(normalize_dates("29/02/2000"), "2000-02-29");
    }

    #[test]
    fn date_rewrite_is_idempotent() {
        let text = "Leitura 01/07/2024 a 31/07/2024, inválida 30/02/2024, ref 08/2024";
        let once = normalize_dates(text);
        assert_eq!(normalize_dates(&once), once);
    }

    #[test]
    fn rewrites_dates_glued_to_labels() {
        assert_eq!(normalize_dates("VENCIMENTO15/08/2024"), "VENCIMENTO2024-08-15");
        assert_eq!(normalize_dates("15/08/2024TOTAL"), "2024-08-15TOTAL");
        assert_eq!(normalize_dates("ref_15/08/2024"), "ref_2024-08-15");
        assert_eq!(normalize_dates("Vencimento: 15/08/2024"), "Vencimento: 2024-08-15");
    }

    #[test]
    fn month_year_alone_is_not_a_date() {
        assert_eq!(normalize_dates("mes 08/2024"), "mes 08/2024");
    }

    #[test]
    fn number_examples() {
        assert_eq!(
            normalize_numbers(json!("1.234,56")).as_f64(),
            Some(1234.56)
        );
        assert_eq!(normalize_numbers(json!("1.234")), json!(1234));
        assert_eq!(
            normalize_numbers(json!("Rua das Flores, 123")),
            json!("Rua das Flores, 123")
        );
    }

    #[test]
    fn comma_between_digits_is_decimal() {
        assert_eq!(normalize_numbers(json!("12,5")).as_f64(), Some(12.5));
        assert_eq!(normalize_numbers(json!("1,234")).as_f64(), Some(1.234));
        assert_eq!(
            normalize_numbers(json!("12.345.678,90")).as_f64(),
            Some(12345678.9)
        );
    }

    #[test]
    fn stray_comma_is_dropped() {
        assert_eq!(normalize_numbers(json!("1500,")), json!(1500));
    }

    #[test]
    fn plain_decimal_point_kept() {
        assert_eq!(normalize_numbers(json!("3.5")).as_f64(), Some(3.5));
        assert_eq!(normalize_numbers(json!(" -0,75 ")).as_f64(), Some(-0.75));
    }

    #[test]
    fn digit_only_identifiers_become_numbers() {
        assert_eq!(normalize_numbers(json!("00123")), json!(123));
    }

    #[test]
    fn non_numeric_strings_unchanged() {
        for s in ["", "   ", "R$ 10,00", "kWh", "inf", "NaN", "2024-08-15"] {
            assert_eq!(normalize_numbers(json!(s)), json!(s), "input {s:?}");
        }
    }

    #[test]
    fn non_string_leaves_pass_through() {
        let v = json!([1, 2.5, true, null]);
        assert_eq!(normalize_numbers(v.clone()), v);
    }

    #[test]
    fn structure_is_preserved() {
        let input = json!({
            "nome_titular": "MARIA DA SILVA",
            "valor_total": "1.234,56",
            "itens_faturados": [
                { "descricao": "Consumo", "quantidade": "350", "valor": "289,10" },
                { "descricao": "Iluminação Pública", "quantidade": null, "valor": "25,00" }
            ],
            "tributos": { "icms": { "aliquota": "19,00" } }
        });
        let out = normalize_numbers(input.clone());

        let in_keys: Vec<&String> = input.as_object().unwrap().keys().collect();
        let out_keys: Vec<&String> = out.as_object().unwrap().keys().collect();
        assert_eq!(in_keys, out_keys);
        assert_eq!(out["itens_faturados"].as_array().unwrap().len(), 2);
        assert_eq!(out["nome_titular"], "MARIA DA SILVA");
        assert_eq!(out["valor_total"].as_f64(), Some(1234.56));
        assert_eq!(out["itens_faturados"][0]["quantidade"], json!(350));
        assert_eq!(out["itens_faturados"][1]["quantidade"], Value::Null);
        assert_eq!(out["tributos"]["icms"]["aliquota"].as_f64(), Some(19.0));
    }
}
