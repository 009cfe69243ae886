/// Builds a [`Value`](crate::Value) from JSON-like syntax.
///
/// `undefined`, `null`, `true` and `false` are keywords; arrays and objects nest; anything
/// else goes through [`to_value`](crate::to_value) and becomes `null` if it cannot be
/// converted.
///
/// ```rust
/// use serde_lossless::{value, Value};
///
/// let v = value!({"name": "Alice", "tags": [1, 2], "gone": undefined});
/// assert_eq!(v.get("name").unwrap().as_str(), Some("Alice"));
/// assert!(v.get("gone").unwrap().is_undefined());
/// ```
#[macro_export]
macro_rules! value {
    (undefined) => {
        $crate::Value::Undefined
    };

    (null) => {
        $crate::Value::Null
    };

    (true) => {
        $crate::Value::Bool(true)
    };

    (false) => {
        $crate::Value::Bool(false)
    };

    ([]) => {
        $crate::Value::array(vec![])
    };

    ([ $($elem:tt),* $(,)? ]) => {
        $crate::Value::array(vec![$($crate::value!($elem)),*])
    };

    ({}) => {
        $crate::Value::object($crate::ObjectMap::new())
    };

    ({ $($key:literal : $value:tt),* $(,)? }) => {{
        let mut object = $crate::ObjectMap::new();
        $(
            object.insert($key.to_string(), $crate::value!($value));
        )*
        $crate::Value::object(object)
    }};

    // Any other expression
    ($s:expr) => {{
        $crate::to_value(&$s).unwrap_or($crate::Value::Null)
    }};
}
