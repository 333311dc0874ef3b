use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::{errors::Error, utils, Result};

fn slack_ts_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+(\.\d+)?$").expect("valid regex"))
}

/// Arguments of one tool call, with validating accessors.
///
/// Every accessor fails with [`Error::Validation`] naming the parameter.
#[derive(Clone, Debug, Default)]
pub struct ToolArgs {
    params: Map<String, Value>,
}

impl ToolArgs {
    pub fn new(params: Map<String, Value>) -> Self {
        Self { params }
    }

    /// Accepts an object or `null` (no arguments).
    pub fn from_value(v: Value) -> Result<Self> {
        match v {
            Value::Null => Ok(Self::default()),
            Value::Object(params) => Ok(Self { params }),
            _ => Err(Error::validation("arguments", "expected an object")),
        }
    }

    fn present(&self, key: &str) -> Option<&Value> {
        self.params.get(key).filter(|v| !v.is_null())
    }

    /// Required string, returned as given; must not be blank.
    pub fn text(&self, key: &str) -> Result<String> {
        let v = self
            .present(key)
            .ok_or_else(|| Error::validation(key, "is required"))?;
        let s = v
            .as_str()
            .ok_or_else(|| Error::validation(key, "expected string"))?;
        if s.trim().is_empty() {
            return Err(Error::validation(key, "must not be empty"));
        }
        Ok(s.to_string())
    }

    /// Required identifier (channel, user, file id); trimmed, mention-wrapping removed.
    pub fn id(&self, key: &str) -> Result<String> {
        let id = utils::normalize_id(&self.text(key)?);
        if id.chars().any(char::is_whitespace) {
            return Err(Error::validation(key, "must not contain whitespace"));
        }
        Ok(id)
    }

    /// Optional string; blank counts as absent.
    pub fn opt_text(&self, key: &str) -> Result<Option<String>> {
        match self.present(key) {
            None => Ok(None),
            Some(v) => {
                let s = v
                    .as_str()
                    .ok_or_else(|| Error::validation(key, "expected string"))?;
                Ok(Some(s.to_string()).filter(|s| !s.trim().is_empty()))
            }
        }
    }

    pub fn opt_id(&self, key: &str) -> Result<Option<String>> {
        match self.opt_text(key)? {
            None => Ok(None),
            Some(_) => self.id(key).map(Some),
        }
    }

    /// Required Slack message timestamp (`1700000000.000100`).
    pub fn ts(&self, key: &str) -> Result<String> {
        let ts = self.text(key)?.trim().to_string();
        if !slack_ts_re().is_match(&ts) {
            return Err(Error::validation(
                key,
                "expected a Slack timestamp like 1700000000.000100",
            ));
        }
        Ok(ts)
    }

    pub fn opt_ts(&self, key: &str) -> Result<Option<String>> {
        match self.opt_text(key)? {
            None => Ok(None),
            Some(_) => self.ts(key).map(Some),
        }
    }

    pub fn bool_or(&self, key: &str, default: bool) -> Result<bool> {
        match self.present(key) {
            None => Ok(default),
            Some(Value::Bool(b)) => Ok(*b),
            Some(Value::String(s)) => match s.trim().to_lowercase().as_str() {
                "true" | "yes" | "1" => Ok(true),
                "false" | "no" | "0" => Ok(false),
                _ => Err(Error::validation(key, "expected boolean")),
            },
            Some(_) => Err(Error::validation(key, "expected boolean")),
        }
    }

    fn int(&self, key: &str) -> Result<Option<i64>> {
        match self.present(key) {
            None => Ok(None),
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
                .map(Some)
                .ok_or_else(|| Error::validation(key, "expected integer")),
            Some(Value::String(s)) => s
                .trim()
                .parse::<i64>()
                .map(Some)
                .map_err(|_| Error::validation(key, "expected integer")),
            Some(_) => Err(Error::validation(key, "expected integer")),
        }
    }

    /// Integer within `[min, max]`, `default` when absent.
    pub fn int_in(&self, key: &str, default: i64, min: i64, max: i64) -> Result<i64> {
        let n = self.int(key)?.unwrap_or(default);
        if n < min || n > max {
            return Err(Error::validation(
                key,
                format!("must be between {min} and {max}"),
            ));
        }
        Ok(n)
    }

    pub fn required_int(&self, key: &str) -> Result<i64> {
        self.int(key)?
            .ok_or_else(|| Error::validation(key, "is required"))
    }

    /// Positive number, `default` when absent.
    pub fn positive_number_or(&self, key: &str, default: f64) -> Result<f64> {
        let n = match self.present(key) {
            None => default,
            Some(Value::Number(n)) => n
                .as_f64()
                .ok_or_else(|| Error::validation(key, "expected number"))?,
            Some(Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| Error::validation(key, "expected number"))?,
            Some(_) => return Err(Error::validation(key, "expected number")),
        };
        if !n.is_finite() || n <= 0.0 {
            return Err(Error::validation(key, "must be a positive number"));
        }
        Ok(n)
    }

    /// Required comma-separated id list.
    pub fn csv(&self, key: &str) -> Result<Vec<String>> {
        let items: Vec<String> = utils::parse_csv(&self.text(key)?)
            .into_iter()
            .map(|s| utils::normalize_id(&s))
            .collect();
        if items.is_empty() {
            return Err(Error::validation(key, "must list at least one id"));
        }
        Ok(items)
    }

    /// Optional array of objects (`blocks`, `attachments`).
    ///
    /// A JSON-encoded string is accepted too, since some clients stringify them.
    pub fn opt_object_array(&self, key: &str) -> Result<Option<Vec<Value>>> {
        let v = match self.present(key) {
            None => return Ok(None),
            Some(Value::String(s)) if s.trim().is_empty() => return Ok(None),
            Some(Value::String(s)) => serde_json::from_str::<Value>(s)
                .map_err(|_| Error::validation(key, "expected an array of objects"))?,
            Some(v) => v.clone(),
        };
        match v {
            Value::Array(items) if items.iter().all(|i| i.is_object()) => {
                Ok(Some(items).filter(|i| !i.is_empty()))
            }
            _ => Err(Error::validation(key, "expected an array of objects")),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn args(v: Value) -> ToolArgs {
        ToolArgs::from_value(v).unwrap()
    }

    fn param_of(err: Error) -> String {
        match err {
            Error::Validation { param, .. } => param,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_non_object_arguments() {
        assert!(ToolArgs::from_value(json!([1, 2])).is_err());
        assert!(ToolArgs::from_value(Value::Null).is_ok());
    }

    #[test]
    fn text_requires_non_blank_string() {
        let a = args(json!({"text": "  ", "n": 5, "ok": " hi "}));
        assert_eq!(param_of(a.text("text").unwrap_err()), "text");
        assert_eq!(param_of(a.text("missing").unwrap_err()), "missing");
        assert_eq!(param_of(a.text("n").unwrap_err()), "n");
        assert_eq!(a.text("ok").unwrap(), " hi ");
    }

    #[test]
    fn ids_are_normalized() {
        let a = args(json!({"user": " <@U123> ", "bad": "C1 C2"}));
        assert_eq!(a.id("user").unwrap(), "U123");
        assert_eq!(param_of(a.id("bad").unwrap_err()), "bad");
    }

    #[test]
    fn timestamps_are_checked() {
        let a = args(json!({"ts": "1700000000.000100", "bad": "yesterday"}));
        assert_eq!(a.ts("ts").unwrap(), "1700000000.000100");
        assert_eq!(param_of(a.ts("bad").unwrap_err()), "bad");
        assert_eq!(a.opt_ts("none").unwrap(), None);
    }

    #[test]
    fn integers_respect_ranges() {
        let a = args(json!({"limit": 50, "big": 5000, "s": "7", "frac": 1.5}));
        assert_eq!(a.int_in("limit", 10, 1, 1000).unwrap(), 50);
        assert_eq!(a.int_in("absent", 10, 1, 1000).unwrap(), 10);
        assert_eq!(a.int_in("s", 10, 1, 1000).unwrap(), 7);
        assert_eq!(param_of(a.int_in("big", 10, 1, 1000).unwrap_err()), "big");
        assert_eq!(param_of(a.int_in("frac", 10, 1, 1000).unwrap_err()), "frac");
    }

    #[test]
    fn booleans_accept_strings() {
        let a = args(json!({"a": true, "b": "false", "c": 3}));
        assert!(a.bool_or("a", false).unwrap());
        assert!(!a.bool_or("b", true).unwrap());
        assert!(a.bool_or("absent", true).unwrap());
        assert!(a.bool_or("c", true).is_err());
    }

    #[test]
    fn csv_lists() {
        let a = args(json!({"users": "U1, <@U2>,", "empty": " , "}));
        assert_eq!(a.csv("users").unwrap(), vec!["U1".to_string(), "U2".to_string()]);
        assert_eq!(param_of(a.csv("empty").unwrap_err()), "empty");
    }

    #[test]
    fn object_arrays_accept_json_strings() {
        let a = args(json!({
            "blocks": [{"type": "section"}],
            "encoded": "[{\"type\":\"divider\"}]",
            "bad": [1, 2]
        }));
        assert_eq!(a.opt_object_array("blocks").unwrap().unwrap().len(), 1);
        assert_eq!(a.opt_object_array("encoded").unwrap().unwrap().len(), 1);
        assert!(a.opt_object_array("bad").is_err());
        assert_eq!(a.opt_object_array("absent").unwrap(), None);
    }

    #[test]
    fn positive_numbers() {
        let a = args(json!({"mb": 2.5, "neg": -1}));
        assert_eq!(a.positive_number_or("mb", 10.0).unwrap(), 2.5);
        assert_eq!(a.positive_number_or("absent", 10.0).unwrap(), 10.0);
        assert!(a.positive_number_or("neg", 10.0).is_err());
    }
}
