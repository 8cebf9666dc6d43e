use crate::data::{OptionMap, OptionValue};

/// Merge `source` into `target`, key by key.
///
/// Plain mappings ([`OptionValue::Map`]) are merged recursively; every other
/// value, including [`OptionValue::Opaque`], overwrites the target entry.
/// Keys absent from `source` are left untouched. When a plain mapping is
/// merged over a non-mapping value, the target entry is reset to an empty
/// mapping first.
///
/// # Examples
///
/// ```
/// use http_fetch::{deep_merge, option_map, OptionValue};
///
/// let mut target = option_map([("a", OptionValue::from(option_map([("x", 1), ("y", 2)])))]);
/// deep_merge(&mut target, option_map([("a", OptionValue::from(option_map([("y", 3)])))]));
///
/// assert_eq!(target["a"].to_string(), "{x=1,y=3}");
/// ```
pub fn deep_merge(target: &mut OptionMap, source: OptionMap) {
    for (key, value) in source {
        match value {
            OptionValue::Map(nested) => {
                let slot = target.entry(key).or_insert_with(|| OptionValue::Map(OptionMap::new()));
                if !slot.is_plain() {
                    *slot = OptionValue::Map(OptionMap::new());
                }
                if let OptionValue::Map(existing) = slot {
                    deep_merge(existing, nested);
                }
            }
            other => {
                target.insert(key, other);
            }
        }
    }
}
