//! Deterministic names for synthesized types.

/// Build a type identifier from a route template.
///
/// Every `/` starts a new capitalized segment, `{..}` placeholders are
/// dropped and `suffix` is appended verbatim. Characters that cannot appear
/// in an identifier act as segment boundaries. A stray `}` lets the skip
/// depth go negative, after which characters are captured again.
///
/// ```
/// use routeforge_parse::to_name;
///
/// assert_eq!(
///     to_name("/validot/benchmark/ok/{id}", "Request", None),
///     "ValidotBenchmarkOkRequest"
/// );
/// assert_eq!(to_name("/users", "Response0", Some("get")), "GetUsersResponse0");
/// ```
pub fn to_name(template: &str, suffix: &str, prefix: Option<&str>) -> String {
    let mut body = String::with_capacity(template.len() + suffix.len());
    let mut depth: i32 = 0;
    let mut capitalize = true;

    for ch in template.chars() {
        match ch {
            '{' => depth += 1,
            '}' => depth -= 1,
            _ if depth > 0 => {}
            '/' => capitalize = true,
            c if c.is_ascii_alphanumeric() || c == '_' => {
                if capitalize {
                    body.push(c.to_ascii_uppercase());
                    capitalize = false;
                } else {
                    body.push(c);
                }
            }
            _ => capitalize = true,
        }
    }
    body.push_str(suffix);

    let mut name = String::with_capacity(body.len() + 8);
    if let Some(prefix) = prefix {
        let mut chars = prefix.chars();
        if let Some(first) = chars.next() {
            name.push(first.to_ascii_uppercase());
            name.extend(chars);
        }
    }
    name.push_str(&body);

    if name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert(0, 'N');
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders_are_dropped() {
        assert_eq!(
            to_name("/validot/benchmark/ok/{id}", "Request", None),
            "ValidotBenchmarkOkRequest"
        );
    }

    #[test]
    fn test_relative_template() {
        assert_eq!(
            to_name("duplicate/anonymous", "Request", None),
            "DuplicateAnonymousRequest"
        );
    }

    #[test]
    fn test_prefix_is_capitalized() {
        assert_eq!(
            to_name("/users/{id}", "Response0", Some("get")),
            "GetUsersResponse0"
        );
        assert_eq!(to_name("/users", "Response1", Some("Post")), "PostUsersResponse1");
    }

    #[test]
    fn test_invalid_characters_split_segments() {
        assert_eq!(to_name("/user-items.v2", "Body", None), "UserItemsV2Body");
    }

    #[test]
    fn test_leading_digit() {
        assert_eq!(to_name("/2fa/verify", "Request", None), "N2faVerifyRequest");
    }

    #[test]
    fn test_stray_closing_brace_resumes_capture() {
        assert_eq!(to_name("/a}b/c", "X", None), "AbCX");
        assert_eq!(to_name("/a}}{b}/c", "X", None), "AbCX");
    }

    #[test]
    fn test_deterministic_and_distinct() {
        let first = to_name("/orders/{id}/items", "Request", None);
        let second = to_name("/orders/{id}/items", "Request", None);
        assert_eq!(first, second);
        assert_ne!(first, to_name("/orders/items/{id}/lines", "Request", None));
    }
}
