//! Pseudo-tag function-call grammar and Python-style call literals.

use std::collections::BTreeMap;

use serde_json::Value;
use tool_vocabulary::Signature;

const FUNCTION_OPEN: &str = "<function=";

/// Render `<function=NAME>` with one `<parameter=..>` line per argument.
///
/// String values are emitted raw, anything else as compact JSON.
pub fn function_call<'a>(name: &str, parameters: impl IntoIterator<Item = (&'a str, &'a Value)>) -> String {
    let mut out = format!("{FUNCTION_OPEN}{name}>\n");
    for (key, value) in parameters {
        out.push_str("<parameter=");
        out.push_str(key);
        out.push('>');
        match value {
            Value::String(text) => out.push_str(text),
            other => out.push_str(&other.to_string()),
        }
        out.push_str("</parameter>\n");
    }
    out.push_str("</function>");
    out
}

/// Python-style call such as `click(bid="12", button="left")`, arguments in
/// signature order followed by the remaining ones sorted.
pub fn python_call(name: &str, signature: &Signature, arguments: &BTreeMap<String, Value>) -> String {
    let rendered: Vec<String> = signature
        .order(arguments)
        .into_iter()
        .filter_map(|key| arguments.get(key).map(|value| format!("{key}={}", python_literal(value))))
        .collect();
    format!("{name}({})", rendered.join(", "))
}

pub fn python_literal(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(number) => number.to_string(),
        Value::String(_) => value.to_string(),
        Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(python_literal).collect();
            format!("[{}]", inner.join(", "))
        }
        Value::Object(map) => {
            let inner: Vec<String> = map
                .iter()
                .map(|(key, value)| format!("{}: {}", Value::String(key.clone()), python_literal(value)))
                .collect();
            format!("{{{}}}", inner.join(", "))
        }
    }
}

/// Name of the call in a rendered turn: the first line that opens a
/// `<function=NAME>` tag, so thought lines before it and parameter values
/// after it are never mistaken for the call.
pub fn called_function(turn_value: &str) -> Option<&str> {
    turn_value.lines().find_map(|line| {
        line.strip_prefix(FUNCTION_OPEN)?
            .strip_suffix('>')
            .filter(|name| !name.is_empty() && !name.contains('>'))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn function_call_layout() {
        let command = json!("ls -la");
        let timeout = json!(30);
        let rendered = function_call("execute_bash", [("command", &command), ("timeout", &timeout)]);
        assert_eq!(
            rendered,
            "<function=execute_bash>\n<parameter=command>ls -la</parameter>\n<parameter=timeout>30</parameter>\n</function>"
        );
        assert_eq!(called_function(&rendered), Some("execute_bash"));
    }

    #[test]
    fn python_literals() {
        assert_eq!(python_literal(&json!(null)), "None");
        assert_eq!(python_literal(&json!(false)), "False");
        assert_eq!(python_literal(&json!("say \"hi\"")), "\"say \\\"hi\\\"\"");
        assert_eq!(python_literal(&json!([1, true, "a"])), "[1, True, \"a\"]");
        assert_eq!(python_literal(&json!({"k": null})), "{\"k\": None}");
    }

    #[test]
    fn python_call_orders_by_signature() {
        let signature = Signature::new(&["bid", "value"], &[]);
        let mut arguments = BTreeMap::new();
        arguments.insert("value".to_string(), json!("hello"));
        arguments.insert("bid".to_string(), json!("7"));
        assert_eq!(
            python_call("fill", &signature, &arguments),
            "fill(bid=\"7\", value=\"hello\")"
        );
    }

    #[test]
    fn called_function_needs_a_tag() {
        assert_eq!(called_function("plain text"), None);
        assert_eq!(
            called_function("thinking\n<function=browser>\n</function>"),
            Some("browser")
        );
    }

    #[test]
    fn called_function_ignores_tags_inside_parameters() {
        let code = json!("echo '<function=finish>'\n<function=think>\ncat notes.txt");
        let rendered = function_call("execute_bash", [("command", &code)]);
        assert_eq!(called_function(&format!("Check the notes.\n{rendered}")), Some("execute_bash"));
    }
}
