//! Response repair: coerce raw model output into JSON.
//!
//! Models are told to answer with a bare JSON object, but in practice they
//! wrap it in a ```` ```json ```` fence or leave a trailing comma behind.
//! This stage fixes exactly those two quirks and nothing else:
//!
//! 1. strip whitespace and every code-fence marker
//! 2. strict parse
//! 3. on failure, delete commas that directly precede `}` or `]`, parse again
//! 4. on failure, [`ExtractError::ResponseNotJson`] with the raw response
//!
//! Anything the two passes cannot fix is reported, not guessed at.

use crate::error::ExtractError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

static RE_TRAILING_COMMA: Lazy<Regex> = Lazy::new(|| Regex::new(r",\s*([}\]])").unwrap());

/// Parse a model response into a JSON value.
pub fn parse_response(raw: &str) -> Result<Value, ExtractError> {
    let stripped = strip_code_fences(raw);

    let first_err = match serde_json::from_str::<Value>(&stripped) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };
    debug!("Strict parse failed ({}); removing trailing commas", first_err);

    let repaired = remove_trailing_commas(&stripped);
    serde_json::from_str::<Value>(&repaired).map_err(|e| ExtractError::ResponseNotJson {
        raw: raw.to_string(),
        detail: e.to_string(),
    })
}

/// Remove every ```` ```json ```` / ```` ``` ```` marker and surrounding whitespace.
fn strip_code_fences(raw: &str) -> String {
    raw.trim()
        .replace("```json", "")
        .replace("```", "")
        .trim()
        .to_string()
}

fn remove_trailing_commas(input: &str) -> String {
    RE_TRAILING_COMMA.replace_all(input, "$1").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_json_parses() {
        assert_eq!(parse_response(r#"{"a": 1}"#).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn fenced_json_with_trailing_comma() {
        let raw = "```json\n{\"a\": 1,}\n```";
        assert_eq!(parse_response(raw).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn bare_fence_stripped() {
        let raw = "  ```\n[1, 2]\n```  ";
        assert_eq!(parse_response(raw).unwrap(), json!([1, 2]));
    }

    #[test]
    fn trailing_commas_across_newlines() {
        let raw = "{\n  \"itens\": [\n    {\"valor\": \"10,00\"},\n  ],\n  \"total\": 10,\n}";
        assert_eq!(
            parse_response(raw).unwrap(),
            json!({"itens": [{"valor": "10,00"}], "total": 10})
        );
    }

    #[test]
    fn garbage_is_response_not_json() {
        let err = parse_response("not json at all").unwrap_err();
        match err {
            ExtractError::ResponseNotJson { raw, .. } => assert_eq!(raw, "not json at all"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn empty_response_is_response_not_json() {
        assert!(matches!(
            parse_response("   "),
            Err(ExtractError::ResponseNotJson { .. })
        ));
    }

    #[test]
    fn no_other_repairs_attempted() {
        // Single quotes and unquoted keys are out of scope.
        assert!(parse_response("{'a': 1}").is_err());
        assert!(parse_response("{a: 1}").is_err());
        assert!(parse_response("Aqui está: {\"a\": 1}").is_err());
    }

    #[test]
    fn raw_preserved_verbatim_including_fences() {
        let raw = "```json\n{oops}\n```";
        let err = parse_response(raw).unwrap_err();
        assert_eq!(err.raw_response(), Some(raw));
    }
}
