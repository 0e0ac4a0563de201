//! Route template validation.

use std::collections::HashSet;

use thiserror::Error;

/// A route template rejected by [`validate_route_template`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("route template must start with '/': '{0}' (hint: change to '/{0}')")]
    MissingLeadingSlash(String),

    #[error("route template contains consecutive slashes: '{0}'")]
    ConsecutiveSlashes(String),

    #[error("route template has a trailing slash: '{0}'")]
    TrailingSlash(String),

    #[error("route template contains invalid character '{ch}': '{template}'")]
    InvalidCharacter { template: String, ch: char },

    #[error("route template has unbalanced or nested braces: '{0}'")]
    UnbalancedBraces(String),

    #[error("route template has an empty parameter at segment {segment}: '{template}'")]
    EmptyParameter { template: String, segment: usize },

    #[error("route parameter '{name}' contains invalid characters: '{template}'")]
    InvalidParameterName { template: String, name: String },

    #[error("route template repeats parameter '{{{name}}}': '{template}'")]
    DuplicateParameter { template: String, name: String },

    #[error("route template has adjacent parameters at segment {segment}: '{template}'")]
    AdjacentParameters { template: String, segment: usize },
}

/// Check that a route template is well formed.
///
/// Parameters are `{name}`, optionally with a catch-all marker (`{*rest}`),
/// an inline constraint (`{id:int}`) or an optional marker (`{page?}`).
/// A segment may hold several parameters as long as literal text separates
/// them (`{name}.{ext}`).
pub fn validate_route_template(template: &str) -> Result<(), TemplateError> {
    if !template.starts_with('/') {
        return Err(TemplateError::MissingLeadingSlash(template.to_string()));
    }
    if template.contains("//") {
        return Err(TemplateError::ConsecutiveSlashes(template.to_string()));
    }
    if template.len() > 1 && template.ends_with('/') {
        return Err(TemplateError::TrailingSlash(template.to_string()));
    }

    let invalid_chars = ['<', '>', '"', '`', ' ', '\t', '\n', '?', '#', '\\'];
    let mut depth = 0i32;
    for ch in template.chars() {
        match ch {
            '{' => depth += 1,
            '}' => depth -= 1,
            // `?` is only meaningful as an optional marker inside a parameter.
            '?' if depth == 1 => continue,
            c if invalid_chars.contains(&c) => {
                return Err(TemplateError::InvalidCharacter {
                    template: template.to_string(),
                    ch: c,
                });
            }
            _ => continue,
        }
        if !(0..=1).contains(&depth) {
            return Err(TemplateError::UnbalancedBraces(template.to_string()));
        }
    }
    if depth != 0 {
        return Err(TemplateError::UnbalancedBraces(template.to_string()));
    }

    let mut seen = HashSet::new();
    for (segment, part) in template.split('/').enumerate() {
        let mut rest = part;
        let mut literal_before = true;
        while let Some(start) = rest.find('{') {
            if start == 0 && !literal_before {
                return Err(TemplateError::AdjacentParameters {
                    template: template.to_string(),
                    segment,
                });
            }
            let after = &rest[start + 1..];
            let Some(end) = after.find('}') else {
                return Err(TemplateError::UnbalancedBraces(template.to_string()));
            };
            let name = parameter_name(&after[..end]);
            if name.is_empty() {
                return Err(TemplateError::EmptyParameter {
                    template: template.to_string(),
                    segment,
                });
            }
            if !name
                .chars()
                .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
            {
                return Err(TemplateError::InvalidParameterName {
                    template: template.to_string(),
                    name: name.to_string(),
                });
            }
            if !seen.insert(name.to_ascii_lowercase()) {
                return Err(TemplateError::DuplicateParameter {
                    template: template.to_string(),
                    name: name.to_string(),
                });
            }
            rest = &after[end + 1..];
            literal_before = false;
        }
    }

    Ok(())
}

/// Names of the `{..}` parameters in a template, in order of appearance.
pub fn template_parameters(template: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else {
            break;
        };
        let name = parameter_name(&after[..end]);
        if !name.is_empty() {
            names.push(name.to_string());
        }
        rest = &after[end + 1..];
    }
    names
}

fn parameter_name(raw: &str) -> &str {
    let raw = raw.trim_start_matches('*');
    let raw = raw.split([':', '=']).next().unwrap_or(raw);
    raw.trim_end_matches('?')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_common_templates() {
        for template in [
            "/",
            "/users",
            "/users/{id}",
            "/users/{user_id}/posts/{post-id}",
            "/files/{*path}",
            "/items/{id:int}",
            "/search/{page?}",
            "/files/{name}.{ext}",
            "/v{major}.{minor}/status",
        ] {
            assert_eq!(validate_route_template(template), Ok(()), "{template}");
        }
    }

    #[test]
    fn test_rejects_missing_slash() {
        assert_eq!(
            validate_route_template("users"),
            Err(TemplateError::MissingLeadingSlash("users".into()))
        );
    }

    #[test]
    fn test_rejects_trailing_and_double_slashes() {
        assert!(matches!(
            validate_route_template("/users/"),
            Err(TemplateError::TrailingSlash(_))
        ));
        assert!(matches!(
            validate_route_template("/users//posts"),
            Err(TemplateError::ConsecutiveSlashes(_))
        ));
    }

    #[test]
    fn test_rejects_query_and_angle_brackets() {
        assert!(matches!(
            validate_route_template("/users?id=1"),
            Err(TemplateError::InvalidCharacter { ch: '?', .. })
        ));
        assert!(matches!(
            validate_route_template("/users/<id>"),
            Err(TemplateError::InvalidCharacter { ch: '<', .. })
        ));
    }

    #[test]
    fn test_rejects_brace_problems() {
        assert!(matches!(
            validate_route_template("/users/{id"),
            Err(TemplateError::UnbalancedBraces(_))
        ));
        assert!(matches!(
            validate_route_template("/users/}id{"),
            Err(TemplateError::UnbalancedBraces(_))
        ));
        assert!(matches!(
            validate_route_template("/users/{{id}}"),
            Err(TemplateError::UnbalancedBraces(_))
        ));
        assert!(matches!(
            validate_route_template("/users/{}"),
            Err(TemplateError::EmptyParameter { segment: 2, .. })
        ));
    }

    #[test]
    fn test_rejects_duplicate_parameters() {
        assert!(matches!(
            validate_route_template("/a/{id}/b/{Id}"),
            Err(TemplateError::DuplicateParameter { .. })
        ));
    }

    #[test]
    fn test_template_parameters() {
        assert_eq!(
            template_parameters("/orgs/{org}/files/{*path}/{rev:int}/{page?}"),
            vec!["org", "path", "rev", "page"]
        );
        assert!(template_parameters("/health").is_empty());
    }

    #[test]
    fn test_checks_every_parameter_in_a_segment() {
        assert!(matches!(
            validate_route_template("/files/{name}.{}"),
            Err(TemplateError::EmptyParameter { segment: 2, .. })
        ));
        assert!(matches!(
            validate_route_template("/files/{name}.{Name}"),
            Err(TemplateError::DuplicateParameter { .. })
        ));
        assert!(matches!(
            validate_route_template("/files/{name}.{e x t}"),
            Err(TemplateError::InvalidCharacter { ch: ' ', .. })
        ));
        assert!(matches!(
            validate_route_template("/files/{name}.{ex$t}"),
            Err(TemplateError::InvalidParameterName { .. })
        ));
        assert!(matches!(
            validate_route_template("/files/{name}{ext}"),
            Err(TemplateError::AdjacentParameters { segment: 2, .. })
        ));
        assert_eq!(
            template_parameters("/files/{name}.{ext}"),
            vec!["name", "ext"]
        );
    }
}
