//! Parameter rendering: replaces `{{Name}}` tokens with script parameter values.

use crate::script::ScriptParameters;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParameterQuoting {
    /// Insert values verbatim; `None` renders as an empty string.
    #[default]
    Raw,
    /// Single-quote values (doubling embedded quotes); `None` renders as `NULL`.
    Sql,
}

/// Substitute every `{{Name}}` whose name is a parameter. Unknown tokens are left as-is.
pub fn render_parameters(
    content: &str,
    params: &ScriptParameters,
    quoting: ParameterQuoting,
) -> String {
    if params.is_empty() {
        return content.to_string();
    }

    let mut out = String::with_capacity(content.len());
    let mut rest = content;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };

        let name = after[..end].trim();
        match params.get(name) {
            Some(value) => out.push_str(&quote(value.as_deref(), quoting)),
            None => out.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after[end + 2..];
    }

    out.push_str(rest);
    out
}

fn quote(value: Option<&str>, quoting: ParameterQuoting) -> String {
    match (quoting, value) {
        (ParameterQuoting::Raw, v) => v.unwrap_or_default().to_string(),
        (ParameterQuoting::Sql, None) => "NULL".to_string(),
        (ParameterQuoting::Sql, Some(v)) => format!("'{}'", v.replace('\'', "''")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, Option<&str>)]) -> ScriptParameters {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.map(str::to_string)))
            .collect()
    }

    #[test]
    fn test_sql_quoting() {
        let p = params(&[("ScriptKey", Some("O'Brien")), ("ContentsHash", None)]);
        let sql = render_parameters(
            "insert into m values ({{ScriptKey}}, {{ ContentsHash }});",
            &p,
            ParameterQuoting::Sql,
        );
        assert_eq!(sql, "insert into m values ('O''Brien', NULL);");
    }

    #[test]
    fn test_raw_quoting() {
        let p = params(&[("Schema", Some("audit")), ("Empty", None)]);
        let out =
            render_parameters("create schema {{Schema}}{{Empty}};", &p, ParameterQuoting::Raw);
        assert_eq!(out, "create schema audit;");
    }

    #[test]
    fn test_unknown_and_unterminated_tokens_kept() {
        let p = params(&[("A", Some("1"))]);
        assert_eq!(
            render_parameters("{{B}} {{A}} {{A", &p, ParameterQuoting::Raw),
            "{{B}} 1 {{A"
        );
    }

    #[test]
    fn test_no_parameters_is_identity() {
        let content = "select '{{x}}';";
        assert_eq!(
            render_parameters(content, &ScriptParameters::new(), ParameterQuoting::Sql),
            content
        );
    }
}
