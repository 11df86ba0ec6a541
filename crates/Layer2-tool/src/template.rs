//! Command templating
//!
//! Placeholders are written `%{name}`. An argument that is exactly one
//! placeholder may expand to several arguments when bound to a list; a
//! placeholder embedded in surrounding text must be bound to a string.
//! Substitution is a single pass: text produced by a value is never scanned
//! again.

use crate::manifest::{ParamValue, Parameters};
use infrarun_foundation::TemplateError;
use regex::{Captures, Regex};
use std::sync::OnceLock;

static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();

fn placeholder() -> &'static Regex {
    PLACEHOLDER.get_or_init(|| Regex::new(r"%\{([a-zA-Z0-9_]+)\}").unwrap())
}

/// Resolve every argument of `template` against `values`
pub fn fill(template: &[String], values: &Parameters) -> Result<Vec<String>, TemplateError> {
    let mut out = Vec::with_capacity(template.len());
    for arg in template {
        fill_argument(arg, values, &mut out)?;
    }
    Ok(out)
}

/// Placeholder names referenced by `template`, in order of appearance
pub fn placeholders(template: &[String]) -> Vec<String> {
    let mut names = Vec::new();
    for arg in template {
        for caps in placeholder().captures_iter(arg) {
            let name = caps[1].to_string();
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    names
}

fn fill_argument(
    arg: &str,
    values: &Parameters,
    out: &mut Vec<String>,
) -> Result<(), TemplateError> {
    let re = placeholder();

    if let Some(caps) = re.captures(arg) {
        let isolated = caps
            .get(0)
            .map_or(false, |m| m.start() == 0 && m.end() == arg.len());

        if isolated {
            let name = &caps[1];
            match lookup(values, name)? {
                ParamValue::Text(text) => out.push(text.clone()),
                ParamValue::List(items) => out.extend(items.iter().cloned()),
                ParamValue::Unsupported(_) => {
                    return Err(TemplateError::UnsupportedType(name.to_string()))
                }
            }
            return Ok(());
        }
    }

    // Check every inline reference before substituting anything
    for caps in re.captures_iter(arg) {
        let name = &caps[1];
        match lookup(values, name)? {
            ParamValue::Text(_) => {}
            ParamValue::List(_) => {
                return Err(TemplateError::TypeMismatch {
                    argument: arg.to_string(),
                    placeholder: name.to_string(),
                })
            }
            ParamValue::Unsupported(_) => {
                return Err(TemplateError::UnsupportedType(name.to_string()))
            }
        }
    }

    let filled = re.replace_all(arg, |caps: &Captures| match values.get(&caps[1]) {
        Some(ParamValue::Text(text)) => text.clone(),
        _ => String::new(),
    });
    out.push(filled.into_owned());
    Ok(())
}

fn lookup<'a>(values: &'a Parameters, name: &str) -> Result<&'a ParamValue, TemplateError> {
    values
        .get(name)
        .ok_or_else(|| TemplateError::UndefinedPlaceholder(name.to_string()))
}
