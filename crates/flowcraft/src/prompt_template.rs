use serde::Serialize;
use tera::{Context, Error as TeraError, Tera};

pub fn load_prompt<T: Serialize>(template: &str, context_data: &T) -> Result<String, TeraError> {
    let mut tera = Tera::default();
    tera.add_raw_template("inline_template", template)?;
    let context = Context::from_serialize(context_data)?;
    let rendered = tera.render("inline_template", &context)?;
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_load_prompt() {
        let template = "Draw {{ input }} as a {{ chart }}.";
        let mut context = HashMap::new();
        context.insert("input".to_string(), "a login flow".to_string());
        context.insert("chart".to_string(), "Flowchart".to_string());

        let result = load_prompt(template, &context).unwrap();
        assert_eq!(result, "Draw a login flow as a Flowchart.");
    }

    #[test]
    fn test_load_prompt_missing_variable() {
        let template = "Draw {{ input }} as a {{ chart }}.";
        let mut context = HashMap::new();
        context.insert("input".to_string(), "a login flow".to_string());
        // 'chart' is missing from context
        let result = load_prompt(template, &context);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_prompt_does_not_escape_json() {
        let template = "Existing: {{ elements }}";
        let context = json!({ "elements": r#"[{"type":"rectangle","id":"r1"}]"# });

        let result = load_prompt(template, &context).unwrap();
        assert_eq!(result, r#"Existing: [{"type":"rectangle","id":"r1"}]"#);
    }

    #[test]
    fn test_load_prompt_with_conditionals() {
        let template = "{% if auto %}Pick a kind.{% else %}Use {{ chart }}.{% endif %}";

        let auto = load_prompt(template, &json!({ "auto": true, "chart": "Auto" })).unwrap();
        assert_eq!(auto, "Pick a kind.");

        let fixed = load_prompt(template, &json!({ "auto": false, "chart": "Gantt Chart" })).unwrap();
        assert_eq!(fixed, "Use Gantt Chart.");
    }
}
