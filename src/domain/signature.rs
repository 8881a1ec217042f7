//! Procedure signatures: parameter list parsing and identity resolution.

use crate::domain::{DomainError, ProcedureSelector};

/// Split a parameter list into its top-level entries.
///
/// Accepts the list with or without surrounding parentheses. Commas nested in
/// parentheses (`NUMBER(38, 0)`) do not split.
///
/// ```ignore
/// split_parameters("(message string, count int)") // ["message string", "count int"]
/// ```
pub fn split_parameters(input: &str) -> Result<Vec<String>, DomainError> {
    let invalid = |message: &str| DomainError::InvalidInputParameters {
        input: input.to_string(),
        message: message.to_string(),
    };

    let trimmed = input.trim();
    let inner = match (trimmed.strip_prefix('('), trimmed.ends_with(')')) {
        (Some(rest), true) => &rest[..rest.len() - 1],
        (Some(_), false) => return Err(invalid("missing closing parenthesis")),
        (None, _) => trimmed,
    };

    let mut params = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    for ch in inner.chars() {
        match ch {
            '(' => {
                depth += 1;
                current.push(ch);
            }
            ')' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| invalid("unbalanced parentheses"))?;
                current.push(ch);
            }
            ',' if depth == 0 => {
                params.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    if depth != 0 {
        return Err(invalid("unbalanced parentheses"));
    }
    params.push(current);

    let params: Vec<String> = params.into_iter().map(|p| p.trim().to_string()).collect();
    if params.len() == 1 && params[0].is_empty() {
        return Ok(Vec::new());
    }
    if params.iter().any(|p| p.is_empty()) {
        return Err(invalid("empty parameter"));
    }
    Ok(params)
}

/// Types of a parameter list, in order.
///
/// `(message string, count int)` yields `["string", "int"]`. An entry with a
/// single token is taken to be a bare type.
pub fn parameter_types(input: &str) -> Result<Vec<String>, DomainError> {
    Ok(split_parameters(input)?
        .into_iter()
        .map(|param| match param.split_once(char::is_whitespace) {
            Some((_, ty)) => ty.trim().to_string(),
            None => param,
        })
        .collect())
}

/// Resolve a selector into a `name(type, ...)` signature.
///
/// A non-empty signature wins; otherwise the name is combined with the types
/// of the input parameters.
pub fn resolve_signature(selector: &ProcedureSelector) -> Result<String, DomainError> {
    if !selector.signature.trim().is_empty() {
        return Ok(selector.signature.trim().to_string());
    }
    if selector.name.trim().is_empty() {
        return Err(DomainError::MissingIdentity);
    }
    let types = parameter_types(&selector.input_parameters)?;
    Ok(format!("{}({})", selector.name.trim(), types.join(", ")))
}
