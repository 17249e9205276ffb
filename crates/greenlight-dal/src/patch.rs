use serde::{Deserialize, Deserializer};

/// One field of a partial update.
///
/// A missing key deserializes to `Absent` (needs `#[serde(default)]` on the field),
/// an explicit JSON `null` to `Null` and anything else to `Value`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Patch<T> {
    #[default]
    Absent,
    Null,
    Value(T),
}

impl<T> Patch<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Patch::Absent)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Patch::Null)
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Patch::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Overwrites `target` if a value is present, `Absent` and `Null` leave it alone.
    pub fn apply_to(self, target: &mut T) {
        if let Patch::Value(v) = self {
            *target = v;
        }
    }
}

impl<T> From<T> for Patch<T> {
    fn from(value: T) -> Self {
        Patch::Value(value)
    }
}

impl<'de, T> Deserialize<'de> for Patch<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(|v| v.map_or(Patch::Null, Patch::Value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Sample {
        #[serde(default)]
        a: Patch<i32>,
        #[serde(default)]
        b: Patch<Vec<String>>,
    }

    #[test]
    fn test_three_states() {
        let s: Sample = serde_json::from_str(r#"{"a": null}"#).unwrap();
        assert!(s.a.is_null());
        assert!(s.b.is_absent());

        let s: Sample = serde_json::from_str(r#"{"a": 7, "b": []}"#).unwrap();
        assert_eq!(s.a, Patch::Value(7));
        assert_eq!(s.b.value(), Some(&vec![]));
    }

    #[test]
    fn test_apply_to() {
        let mut target = 1;
        Patch::Absent.apply_to(&mut target);
        Patch::Null.apply_to(&mut target);
        assert_eq!(target, 1);
        Patch::from(2).apply_to(&mut target);
        assert_eq!(target, 2);
    }
}
