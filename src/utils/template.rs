//! `{{name}}` placeholder rendering for URL templates.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{\s*(\w+)\s*\}\}").expect("placeholder pattern is valid"))
}

/// Names referenced by `{{name}}` placeholders, in order of first appearance.
pub fn placeholders(template: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for cap in placeholder_re().captures_iter(template) {
        let name = cap[1].to_string();
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

/// Render every placeholder or report the first one with no value.
pub fn render_strict(
    template: &str,
    variables: &BTreeMap<String, String>,
) -> std::result::Result<String, String> {
    for name in placeholders(template) {
        if !variables.contains_key(&name) {
            return Err(name);
        }
    }

    let rendered = placeholder_re().replace_all(template, |caps: &regex::Captures| {
        variables.get(&caps[1]).cloned().unwrap_or_default()
    });
    Ok(rendered.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn renders_known_placeholders() {
        let out = render_strict(
            "/api/workspace/{{workspace_id}}/folder",
            &vars(&[("workspace_id", "9f1c")]),
        );
        assert_eq!(out.unwrap(), "/api/workspace/9f1c/folder");
    }

    #[test]
    fn reports_missing_placeholder() {
        let out = render_strict("/api/workspace/{{workspace_id}}/usage", &vars(&[]));
        assert_eq!(out.unwrap_err(), "workspace_id");
    }

    #[test]
    fn template_without_placeholders_is_unchanged() {
        assert_eq!(render_strict("/api/user/profile", &vars(&[])).unwrap(), "/api/user/profile");
    }

    #[test]
    fn placeholders_are_deduplicated() {
        assert_eq!(placeholders("{{a}}/{{ b }}/{{a}}"), vec!["a", "b"]);
    }
}
