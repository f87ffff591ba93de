//! Parameter bindings built from `NAME=VALUE` arguments.

use std::collections::BTreeMap;
use std::fmt;

use log::warn;

/// Concrete values of symbolic parameters, looked up by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterBinding {
    values: BTreeMap<String, i64>,
}

impl ParameterBinding {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a binding from `NAME=VALUE` tokens.
    ///
    /// Tokens without `=`, with an empty name, or with a value that is not an
    /// integer are ignored with a warning. A repeated name overrides the
    /// earlier value, also with a warning.
    ///
    /// # Examples
    ///
    /// ```
    /// use flops_rs::binding::ParameterBinding;
    ///
    /// let binding = ParameterBinding::from_args(["N=10", "oops", "M=3"]);
    /// assert_eq!(binding.get("N"), Some(10));
    /// assert_eq!(binding.get("M"), Some(3));
    /// assert_eq!(binding.len(), 2);
    /// ```
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut binding = Self::new();
        for arg in args {
            let arg = arg.as_ref();
            match parse_assignment(arg) {
                Ok((name, value)) => {
                    if let Some(old) = binding.insert(name, value) {
                        warn!("Parameter {} given twice, using {} instead of {}", name, value, old);
                    }
                }
                Err(reason) => warn!("Ignoring invalid parameter argument {}: {}", arg, reason),
            }
        }
        binding
    }

    /// Binds `name` to `value`, returning the previous value.
    pub fn insert(&mut self, name: &str, value: i64) -> Option<i64> {
        self.values.insert(name.to_string(), value)
    }

    pub fn get(&self, name: &str) -> Option<i64> {
        self.values.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.values.iter().map(|(k, &v)| (k.as_str(), v))
    }
}

impl fmt::Display for ParameterBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs: Vec<String> = self.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        write!(f, "{{{}}}", pairs.join(", "))
    }
}

/// Splits `NAME=VALUE` at the first `=`.
fn parse_assignment(arg: &str) -> Result<(&str, i64), &'static str> {
    let (name, value) = arg.split_once('=').ok_or("missing '='")?;
    let name = name.trim();
    if name.is_empty() {
        return Err("empty name");
    }
    let value = value.trim().parse::<i64>().map_err(|_| "value is not an integer")?;
    Ok((name, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    #[test]
    fn test_from_args() {
        let binding = ParameterBinding::from_args(["N=10", "M=-3", " K = 7 "]);
        assert_eq!(binding.get("N"), Some(10));
        assert_eq!(binding.get("M"), Some(-3));
        assert_eq!(binding.get("K"), Some(7));
        assert_eq!(binding.get("L"), None);
        assert_eq!(binding.to_string(), "{K=7, M=-3, N=10}");
    }

    #[test]
    fn test_malformed_arguments_ignored() {
        let binding = ParameterBinding::from_args(["N", "=5", "M=abc", "K=1.5", "T=4"]);
        assert_eq!(binding.len(), 1);
        assert_eq!(binding.get("T"), Some(4));
    }

    #[test]
    fn test_duplicate_overrides() {
        let binding = ParameterBinding::from_args(["N=1", "N=2"]);
        assert_eq!(binding.get("N"), Some(2));
        assert_eq!(binding.len(), 1);
    }

    #[test]
    fn test_value_with_equals() {
        assert_eq!(parse_assignment("N=1=2"), Err("value is not an integer"));
        assert_eq!(parse_assignment("N=12"), Ok(("N", 12)));
        assert_eq!(parse_assignment("N12"), Err("missing '='"));
    }

    #[test]
    fn test_empty() {
        let binding = ParameterBinding::from_args(Vec::<String>::new());
        assert!(binding.is_empty());
        assert_eq!(binding.to_string(), "{}");
    }
}
