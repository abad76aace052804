use super::Value;
use indexmap::IndexMap;

/// Named parameter bindings for one statement.
///
/// Placeholder names are unique within the statement; `add` derives a name
/// from a hint and suffixes a counter on collision.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct NamedParams {
    values: IndexMap<String, Value>,
}

impl NamedParams {
    pub fn new() -> NamedParams {
        NamedParams::default()
    }

    /// Binds `value` under a fresh placeholder name and returns the name.
    pub fn add(&mut self, hint: &str, value: impl Into<Value>) -> String {
        let base: String = hint
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        let base = if base.is_empty() {
            "param".to_string()
        } else {
            base
        };

        let mut name = base.clone();
        let mut suffix = 1;

        while self.values.contains_key(&name) {
            name = format!("{base}{suffix}");
            suffix += 1;
        }

        self.values.insert(name.clone(), value.into());
        name
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Drops every binding added after the first `len`.
    pub fn truncate(&mut self, len: usize) {
        self.values.truncate(len);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Moves every binding of `other` into `self`.
    ///
    /// Both sets must come from the same statement tree, so names never
    /// clash.
    pub fn extend(&mut self, other: NamedParams) {
        self.values.extend(other.values);
    }
}

impl<'a> IntoIterator for &'a NamedParams {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_unique() {
        let mut params = NamedParams::new();

        assert_eq!(params.add("Forename", "John"), "Forename");
        assert_eq!(params.add("Forename", "Mary"), "Forename1");
        assert_eq!(params.add("Forename", "Jule"), "Forename2");
        assert_eq!(params.add("Users.Wage", 100), "Users_Wage");
        assert_eq!(params.len(), 4);
        assert_eq!(params.get("Forename1"), Some(&Value::from("Mary")));
    }
}
