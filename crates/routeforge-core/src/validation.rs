//! Request validation.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;

/// Error messages keyed by field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    errors: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of fields with errors.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.errors.get(field).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.errors
            .iter()
            .map(|(field, messages)| (field.as_str(), messages.as_slice()))
    }

    /// Rename fields to the names clients used to send them.
    ///
    /// `aliases` pairs a member name with its source name; unlisted fields
    /// keep their key. Messages of fields that collapse onto the same key
    /// are concatenated.
    pub fn remap(self, aliases: &[(&str, &str)]) -> Self {
        if aliases.is_empty() {
            return self;
        }
        let lookup: HashMap<&str, &str> = aliases.iter().copied().collect();
        let mut errors: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (field, messages) in self.errors {
            let key = lookup
                .get(field.as_str())
                .map_or(field, |alias| (*alias).to_string());
            errors.entry(key).or_default().extend(messages);
        }
        Self { errors }
    }

    /// Append every message of `other`.
    pub fn merge(&mut self, other: ValidationErrors) {
        for (field, messages) in other.errors {
            self.errors.entry(field).or_default().extend(messages);
        }
    }

    pub fn into_map(self) -> BTreeMap<String, Vec<String>> {
        self.errors
    }
}

/// Validates a value, collecting every failure.
pub trait Validator<T: ?Sized>: Send + Sync {
    fn validate(&self, value: &T) -> ValidationErrors;
}

impl<T: ?Sized, V: Validator<T> + ?Sized> Validator<T> for Box<V> {
    fn validate(&self, value: &T) -> ValidationErrors {
        (**self).validate(value)
    }
}

impl<T: ?Sized, V: Validator<T> + ?Sized> Validator<T> for std::sync::Arc<V> {
    fn validate(&self, value: &T) -> ValidationErrors {
        (**self).validate(value)
    }
}

/// An absent validator accepts everything.
impl<T: ?Sized, V: Validator<T>> Validator<T> for Option<V> {
    fn validate(&self, value: &T) -> ValidationErrors {
        self.as_ref()
            .map_or_else(ValidationErrors::new, |validator| validator.validate(value))
    }
}

/// Whether a required member holds a value.
pub trait Presence {
    fn is_present(&self) -> bool;
}

impl<T> Presence for Option<T> {
    fn is_present(&self) -> bool {
        self.is_some()
    }
}

impl Presence for String {
    fn is_present(&self) -> bool {
        !self.trim().is_empty()
    }
}

impl Presence for str {
    fn is_present(&self) -> bool {
        !self.trim().is_empty()
    }
}

impl<T> Presence for Vec<T> {
    fn is_present(&self) -> bool {
        !self.is_empty()
    }
}

impl<K, V, S> Presence for HashMap<K, V, S> {
    fn is_present(&self) -> bool {
        !self.is_empty()
    }
}

impl<K, V> Presence for BTreeMap<K, V> {
    fn is_present(&self) -> bool {
        !self.is_empty()
    }
}

impl<T, S> Presence for HashSet<T, S> {
    fn is_present(&self) -> bool {
        !self.is_empty()
    }
}

macro_rules! always_present {
    ($($ty:ty),*) => {
        $(impl Presence for $ty {
            fn is_present(&self) -> bool {
                true
            }
        })*
    };
}

always_present!(
    bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64
);

type Rule<T> = Box<dyn Fn(&T, &mut ValidationErrors) + Send + Sync>;

/// Collects rules for `T`; hooks receive `&mut RuleBuilder<Self>`.
pub struct RuleBuilder<T> {
    rules: Vec<Rule<T>>,
}

impl<T: 'static> RuleBuilder<T> {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Fail with a "required" message when `present` returns false.
    pub fn required<F>(&mut self, field: &'static str, present: F) -> &mut Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.rule(field, format!("'{field}' is required."), present)
    }

    /// Fail with `message` when `check` returns false.
    pub fn rule<F>(&mut self, field: &'static str, message: impl Into<String>, check: F) -> &mut Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let message = message.into();
        self.rules.push(Box::new(move |value: &T, errors: &mut ValidationErrors| {
            if !check(value) {
                errors.add(field, message.clone());
            }
        }));
        self
    }

    /// A rule that reports its own errors.
    pub fn custom<F>(&mut self, rule: F) -> &mut Self
    where
        F: Fn(&T, &mut ValidationErrors) + Send + Sync + 'static,
    {
        self.rules.push(Box::new(rule));
        self
    }

    /// Run a whole validator as one rule, keeping its messages.
    pub fn validator<V>(&mut self, validator: V) -> &mut Self
    where
        V: Validator<T> + 'static,
    {
        self.custom(move |value: &T, errors: &mut ValidationErrors| {
            errors.merge(validator.validate(value));
        })
    }

    pub fn build(self) -> RuleSet<T> {
        RuleSet { rules: self.rules }
    }
}

impl<T: 'static> Default for RuleBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// The validator built from a [`RuleBuilder`].
pub struct RuleSet<T> {
    rules: Vec<Rule<T>>,
}

impl<T> Validator<T> for RuleSet<T> {
    fn validate(&self, value: &T) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        for rule in &self.rules {
            rule(value, &mut errors);
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Signup {
        email: Option<String>,
        name: String,
        age: u32,
    }

    fn rules() -> RuleSet<Signup> {
        let mut rules = RuleBuilder::<Signup>::new();
        rules
            .required("email", |v: &Signup| v.email.is_present())
            .required("name", |v: &Signup| v.name.is_present())
            .rule("age", "must be an adult", |v: &Signup| v.age >= 18);
        rules.build()
    }

    #[test]
    fn test_rules_collect_every_failure() {
        let errors = rules().validate(&Signup {
            email: None,
            name: "  ".into(),
            age: 12,
        });
        assert_eq!(errors.len(), 3);
        assert_eq!(errors.get("age"), Some(&["must be an adult".to_string()][..]));

        let errors = rules().validate(&Signup {
            email: Some("a@b.c".into()),
            name: "Ada".into(),
            age: 30,
        });
        assert!(errors.is_empty());
    }

    struct AdultCheck;

    impl Validator<Signup> for AdultCheck {
        fn validate(&self, value: &Signup) -> ValidationErrors {
            let mut errors = ValidationErrors::new();
            if value.age < 18 {
                errors.add("age", "must be an adult");
            }
            errors
        }
    }

    #[test]
    fn test_required_rules_compose_with_a_validator() {
        let mut rules = RuleBuilder::<Signup>::new();
        rules
            .required("email", |v: &Signup| v.email.is_present())
            .validator(AdultCheck);
        let errors = rules.build().validate(&Signup {
            email: None,
            name: "Ada".into(),
            age: 12,
        });
        assert_eq!(errors.len(), 2);
        assert_eq!(errors.get("email"), Some(&["'email' is required.".to_string()][..]));
        assert_eq!(errors.get("age"), Some(&["must be an adult".to_string()][..]));

        let missing: Option<AdultCheck> = None;
        assert!(missing
            .validate(&Signup {
                email: None,
                name: String::new(),
                age: 1,
            })
            .is_empty());
    }

    #[test]
    fn test_remap_renames_aliased_fields() {
        let mut errors = ValidationErrors::new();
        errors.add("not_used", "bad");
        errors.add("name", "also bad");
        let errors = errors.remap(&[("not_used", "abc")]);

        assert_eq!(errors.get("abc"), Some(&["bad".to_string()][..]));
        assert!(errors.get("not_used").is_none());
        assert!(errors.get("name").is_some());
    }

    #[test]
    fn test_errors_serialize_as_map() {
        let mut errors = ValidationErrors::new();
        errors.add("q", "required");
        assert_eq!(
            serde_json::to_value(&errors).expect("serializes"),
            serde_json::json!({ "q": ["required"] })
        );
    }
}
