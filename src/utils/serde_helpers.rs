use serde::{Deserialize, Deserializer};

/// Keeps an explicit `null` apart from a missing field.
///
/// Use together with `#[serde(default)]`: a missing field stays `None`,
/// `null` becomes `Some(None)` and a value becomes `Some(Some(value))`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "double_option")]
        cap: Option<Option<i32>>,
    }

    #[test]
    fn missing_field_is_left_alone() {
        let patch: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(patch.cap, None);
    }

    #[test]
    fn null_clears_the_field() {
        let patch: Patch = serde_json::from_str(r#"{"cap": null}"#).unwrap();
        assert_eq!(patch.cap, Some(None));
    }

    #[test]
    fn value_sets_the_field() {
        let patch: Patch = serde_json::from_str(r#"{"cap": 7}"#).unwrap();
        assert_eq!(patch.cap, Some(Some(7)));
    }
}
