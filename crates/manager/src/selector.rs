//! Session selection: `all`, an explicit list of identifiers/names, or a
//! label selector expression (spec §6 "Manager selection").
//!
//! Label selector grammar: comma-joined requirements, each one of
//! `key=value`, `key!=value`, `key`, `!key`, `key in (v1, v2)`, or
//! `key notin (v1, v2)`.

use std::collections::BTreeMap;

use crate::error::SelectorError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    All,
    Names(Vec<String>),
    Labels(Vec<LabelRequirement>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelRequirement {
    Equals(String, String),
    NotEquals(String, String),
    Exists(String),
    NotExists(String),
    In(String, Vec<String>),
    NotIn(String, Vec<String>),
}

impl Selector {
    pub fn names(names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Selector::Names(names.into_iter().map(Into::into).collect())
    }

    /// Parse a label selector expression into its requirements.
    pub fn parse_labels(expr: &str) -> Result<Self, SelectorError> {
        let requirements = split_top_level(expr)
            .into_iter()
            .map(|segment| parse_requirement(&segment))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Selector::Labels(requirements))
    }
}

impl LabelRequirement {
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        match self {
            LabelRequirement::Equals(key, value) => labels.get(key) == Some(value),
            LabelRequirement::NotEquals(key, value) => labels.get(key) != Some(value),
            LabelRequirement::Exists(key) => labels.contains_key(key),
            LabelRequirement::NotExists(key) => !labels.contains_key(key),
            LabelRequirement::In(key, values) => {
                labels.get(key).is_some_and(|actual| values.contains(actual))
            }
            LabelRequirement::NotIn(key, values) => {
                labels.get(key).map(|actual| !values.contains(actual)).unwrap_or(true)
            }
        }
    }
}

/// Split on commas that aren't nested inside a `(...)` value set.
fn split_top_level(expr: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for ch in expr.chars() {
        match ch {
            '(' => {
                depth += 1;
                current.push(ch);
            }
            ')' => {
                depth -= 1;
                current.push(ch);
            }
            ',' if depth == 0 => {
                parts.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    parts.push(current.trim().to_string());
    parts.into_iter().filter(|p| !p.is_empty()).collect()
}

fn parse_requirement(segment: &str) -> Result<LabelRequirement, SelectorError> {
    let trimmed = segment.trim();
    if trimmed.is_empty() {
        return Err(SelectorError::EmptyRequirement);
    }
    if let Some(key) = trimmed.strip_prefix('!') {
        let key = key.trim();
        if key.is_empty() {
            return Err(SelectorError::EmptyKey(trimmed.to_string()));
        }
        return Ok(LabelRequirement::NotExists(key.to_string()));
    }
    if let Some(req) = parse_set_requirement(trimmed, " notin (", true)? {
        return Ok(req);
    }
    if let Some(req) = parse_set_requirement(trimmed, " in (", false)? {
        return Ok(req);
    }
    if let Some((key, value)) = trimmed.split_once("!=") {
        let key = require_key(key, trimmed)?;
        return Ok(LabelRequirement::NotEquals(key, value.trim().to_string()));
    }
    if let Some((key, value)) = trimmed.split_once('=') {
        let key = require_key(key, trimmed)?;
        return Ok(LabelRequirement::Equals(key, value.trim().to_string()));
    }
    Ok(LabelRequirement::Exists(trimmed.to_string()))
}

fn parse_set_requirement(
    trimmed: &str,
    keyword: &str,
    negated: bool,
) -> Result<Option<LabelRequirement>, SelectorError> {
    let Some(idx) = trimmed.find(keyword) else {
        return Ok(None);
    };
    let key = require_key(&trimmed[..idx], trimmed)?;
    let after = &trimmed[idx + keyword.len()..];
    let Some(end) = after.find(')') else {
        return Err(SelectorError::UnterminatedParen(trimmed.to_string()));
    };
    let values: Vec<String> = after[..end]
        .split(',')
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect();
    if values.is_empty() {
        return Err(SelectorError::EmptyValueSet(trimmed.to_string()));
    }
    Ok(Some(if negated {
        LabelRequirement::NotIn(key, values)
    } else {
        LabelRequirement::In(key, values)
    }))
}

fn require_key(candidate: &str, whole: &str) -> Result<String, SelectorError> {
    let key = candidate.trim();
    if key.is_empty() {
        return Err(SelectorError::EmptyKey(whole.to_string()));
    }
    Ok(key.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn parses_equals_and_not_equals() {
        let selector = Selector::parse_labels("env=prod,tier!=edge").unwrap();
        assert_eq!(
            selector,
            Selector::Labels(vec![
                LabelRequirement::Equals("env".into(), "prod".into()),
                LabelRequirement::NotEquals("tier".into(), "edge".into()),
            ])
        );
    }

    #[test]
    fn parses_existence_and_negated_existence() {
        let selector = Selector::parse_labels("managed, !ephemeral").unwrap();
        assert_eq!(
            selector,
            Selector::Labels(vec![
                LabelRequirement::Exists("managed".into()),
                LabelRequirement::NotExists("ephemeral".into()),
            ])
        );
    }

    #[test]
    fn parses_in_and_notin_sets() {
        let selector = Selector::parse_labels("env in (prod, staging), tier notin (edge)").unwrap();
        assert_eq!(
            selector,
            Selector::Labels(vec![
                LabelRequirement::In("env".into(), vec!["prod".into(), "staging".into()]),
                LabelRequirement::NotIn("tier".into(), vec!["edge".into()]),
            ])
        );
    }

    #[test]
    fn rejects_unterminated_set() {
        assert!(matches!(
            Selector::parse_labels("env in (prod"),
            Err(SelectorError::UnterminatedParen(_))
        ));
    }

    #[test]
    fn rejects_empty_key() {
        assert!(matches!(
            Selector::parse_labels("=prod"),
            Err(SelectorError::EmptyKey(_))
        ));
    }

    #[test]
    fn equals_matches_exact_value_only() {
        let req = LabelRequirement::Equals("env".into(), "prod".into());
        assert!(req.matches(&labels(&[("env", "prod")])));
        assert!(!req.matches(&labels(&[("env", "staging")])));
        assert!(!req.matches(&labels(&[])));
    }

    #[test]
    fn not_exists_matches_absent_key() {
        let req = LabelRequirement::NotExists("ephemeral".into());
        assert!(req.matches(&labels(&[("env", "prod")])));
        assert!(!req.matches(&labels(&[("ephemeral", "true")])));
    }

    #[test]
    fn in_and_notin_match_membership() {
        let in_req = LabelRequirement::In("env".into(), vec!["prod".into(), "staging".into()]);
        assert!(in_req.matches(&labels(&[("env", "staging")])));
        assert!(!in_req.matches(&labels(&[("env", "dev")])));

        let notin_req = LabelRequirement::NotIn("env".into(), vec!["prod".into()]);
        assert!(notin_req.matches(&labels(&[("env", "dev")])));
        assert!(!notin_req.matches(&labels(&[("env", "prod")])));
        assert!(notin_req.matches(&labels(&[])));
    }
}
