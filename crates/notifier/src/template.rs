//! 占位符渲染
//!
//! 在JSON载荷的所有字符串上递归替换 `{{key}}` 与 `{key}` 占位符。
//! 未解析的占位符原样保留，由调用方记录告警，不作为投递失败处理。

use serde_json::Value;
use std::collections::HashMap;

/// 在单个字符串上替换占位符
pub fn render_str(template: &str, vars: &HashMap<String, String>) -> String {
    let mut out = template.to_string();
    for (key, value) in vars {
        out = out.replace(&format!("{{{{{key}}}}}"), value);
        out = out.replace(&format!("{{{key}}}"), value);
    }
    out
}

/// 在JSON值上递归替换占位符，非字符串节点保持不变
pub fn render_value(template: &Value, vars: &HashMap<String, String>) -> Value {
    match template {
        Value::String(s) => Value::String(render_str(s, vars)),
        Value::Array(items) => Value::Array(items.iter().map(|v| render_value(v, vars)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), render_value(v, vars)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// 收集渲染后仍残留的占位符名
pub fn unresolved_placeholders(value: &Value) -> Vec<String> {
    let mut found = Vec::new();
    collect_unresolved(value, &mut found);
    found.sort();
    found.dedup();
    found
}

/// 收集单个字符串中残留的占位符名
pub fn unresolved_in_str(s: &str) -> Vec<String> {
    let mut found = Vec::new();
    scan_str(s, &mut found);
    found.sort();
    found.dedup();
    found
}

fn collect_unresolved(value: &Value, found: &mut Vec<String>) {
    match value {
        Value::String(s) => scan_str(s, found),
        Value::Array(items) => items.iter().for_each(|v| collect_unresolved(v, found)),
        Value::Object(map) => map.values().for_each(|v| collect_unresolved(v, found)),
        _ => {}
    }
}

fn scan_str(s: &str, found: &mut Vec<String>) {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'{' {
            i += 1;
            continue;
        }
        let double = i + 1 < bytes.len() && bytes[i + 1] == b'{';
        let start = if double { i + 2 } else { i + 1 };
        let mut j = start;
        while j < bytes.len() && (bytes[j].is_ascii_alphanumeric() || bytes[j] == b'_') {
            j += 1;
        }
        let closed = if double {
            j + 1 < bytes.len() && bytes[j] == b'}' && bytes[j + 1] == b'}'
        } else {
            j < bytes.len() && bytes[j] == b'}'
        };
        if closed && j > start {
            found.push(s[start..j].to_string());
            i = j + if double { 2 } else { 1 };
        } else {
            i += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_both_placeholder_forms() {
        let vars = vars(&[("content", "下午开会"), ("user_id", "u-1")]);
        assert_eq!(render_str("{{content}}", &vars), "下午开会");
        assert_eq!(render_str("{content}", &vars), "下午开会");
        assert_eq!(
            render_str("给{user_id}发送: {{content}}", &vars),
            "给u-1发送: 下午开会"
        );
    }

    #[test]
    fn test_render_value_recurses_into_structures() {
        let vars = vars(&[("content", "喝水"), ("task_name", "提醒")]);
        let template = json!({
            "MsgItem": [{
                "TextContent": "{{content}}",
                "MsgType": 1,
                "Meta": {"title": "{task_name}"}
            }]
        });
        let rendered = render_value(&template, &vars);
        assert_eq!(rendered["MsgItem"][0]["TextContent"], "喝水");
        assert_eq!(rendered["MsgItem"][0]["MsgType"], 1);
        assert_eq!(rendered["MsgItem"][0]["Meta"]["title"], "提醒");
        assert!(unresolved_placeholders(&rendered).is_empty());
    }

    #[test]
    fn test_unresolved_placeholders_stay_verbatim() {
        let vars = vars(&[("content", "喝水")]);
        let template = json!({"text": "{{content}} by {{unknown_key}}"});
        let rendered = render_value(&template, &vars);
        assert_eq!(rendered["text"], "喝水 by {{unknown_key}}");
        assert_eq!(unresolved_placeholders(&rendered), vec!["unknown_key"]);
    }

    #[test]
    fn test_scan_ignores_non_placeholder_braces() {
        let rendered = json!({"text": "{ not a placeholder } {}"});
        assert!(unresolved_placeholders(&rendered).is_empty());
    }

    #[test]
    fn test_unresolved_in_plain_string() {
        let vars = vars(&[("task_name", "喝水提醒")]);
        let rendered = render_str("{{task_name}}: {subject_tag}", &vars);
        assert_eq!(rendered, "喝水提醒: {subject_tag}");
        assert_eq!(unresolved_in_str(&rendered), vec!["subject_tag"]);
        assert!(unresolved_in_str("喝水提醒").is_empty());
    }
}
