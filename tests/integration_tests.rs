use chrono::{TimeZone, Utc};
use num_bigint::BigInt;
use serde_json::{json, Value as JsonValue};
use serde_lossless::{
    deserialize, parse, serialize, stringify, value, Class, Codec, CustomTransformer, Error,
    ErrorValue, Number, ObjectMap, Options, RegExp, RegisterOptions, Result, Symbol, TypedArray,
    Value,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn object(fields: Vec<(&str, Value)>) -> Value {
    Value::object(fields.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
}

fn set_field(target: &Value, key: &str, value: Value) {
    match target {
        Value::Object(fields) => {
            fields.borrow_mut().insert(key.to_string(), value);
        }
        Value::Instance(instance) => {
            instance.borrow_mut().fields.insert(key.to_string(), value);
        }
        other => panic!("cannot set a field on {:?}", other),
    }
}

fn roundtrip_with(codec: &Codec, value: &Value) -> Value {
    let text = codec.stringify(value).unwrap();
    println!("payload: {}", text);
    codec.parse(&text).unwrap()
}

fn roundtrip(value: &Value) -> Value {
    roundtrip_with(&Codec::new(), value)
}

#[derive(Debug, PartialEq)]
struct Celsius(f64);

struct CelsiusTransformer;

impl CustomTransformer for CelsiusTransformer {
    fn is_applicable(&self, value: &Value) -> bool {
        matches!(value, Value::Opaque(o) if o.downcast_ref::<Celsius>().is_some())
    }

    fn serialize(&self, value: &Value) -> Result<JsonValue> {
        match value {
            Value::Opaque(o) => o
                .downcast_ref::<Celsius>()
                .map(|c| json!(c.0))
                .ok_or_else(|| Error::custom("not a temperature")),
            _ => Err(Error::custom("not a temperature")),
        }
    }

    fn deserialize(&self, json: JsonValue) -> Result<Value> {
        json.as_f64()
            .map(|degrees| Value::opaque(Celsius(degrees)))
            .ok_or_else(|| Error::custom("temperature must be a number"))
    }
}

/// Claims every date; built-in rules must win over it.
struct GreedyDateTransformer;

impl CustomTransformer for GreedyDateTransformer {
    fn is_applicable(&self, value: &Value) -> bool {
        matches!(value, Value::Date(_))
    }

    fn serialize(&self, _: &Value) -> Result<JsonValue> {
        Ok(json!("hijacked"))
    }

    fn deserialize(&self, _: JsonValue) -> Result<Value> {
        Ok(Value::Null)
    }
}

#[test]
fn test_plain_json_has_no_meta() {
    init_logging();
    let value = value!({"name": "Alice", "tags": ["a", "b"], "age": 30, "ok": true, "none": null});
    let payload = serialize(&value).unwrap();
    assert!(payload.meta.is_none());
    assert_eq!(
        payload.json,
        json!({"name": "Alice", "tags": ["a", "b"], "age": 30, "ok": true, "none": null})
    );
    assert_eq!(deserialize(payload).unwrap(), value);
}

#[test]
fn test_builtin_types_roundtrip() {
    init_logging();
    let date = Utc.with_ymd_and_hms(1999, 12, 31, 23, 59, 59).unwrap();
    let big: BigInt = "123456789012345678901234567890".parse().unwrap();

    let value = object(vec![
        ("undefined", Value::Undefined),
        ("nan", Value::from(f64::NAN)),
        ("inf", Value::from(f64::INFINITY)),
        ("neg_inf", Value::from(f64::NEG_INFINITY)),
        ("big", Value::BigInt(big)),
        ("date", Value::Date(date)),
        ("re", Value::RegExp(RegExp::new("^a+/b$", "gi"))),
        ("set", Value::set(vec![Value::from(1), Value::from("two")])),
        (
            "map",
            Value::map(vec![
                (Value::from("k"), Value::from(1)),
                (Value::from(2), Value::Undefined),
            ]),
        ),
        ("bytes", Value::TypedArray(TypedArray::Int8(vec![-1, 0, 127]))),
        (
            "floats",
            Value::TypedArray(TypedArray::Float64(vec![1.5, f64::NAN, f64::INFINITY])),
        ),
    ]);

    let back = roundtrip(&value);
    assert_eq!(back, value);
    assert!(back.get("undefined").unwrap().is_undefined());
    assert_eq!(back.get("date").unwrap().as_date(), Some(&date));
}

#[test]
fn test_builtin_plain_encodings() {
    let value = object(vec![
        ("d", Value::Date(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap())),
        ("m", Value::map(vec![(Value::from(1), Value::from(2))])),
        ("r", Value::RegExp(RegExp::new("x", "g"))),
        ("b", Value::BigInt(BigInt::from(10))),
    ]);
    let payload = serialize(&value).unwrap();
    assert_eq!(
        payload.json,
        json!({"d": "2020-01-01T00:00:00.000Z", "m": [[1, 2]], "r": "/x/g", "b": "10"})
    );
}

#[test]
fn test_root_level_transform() {
    let payload = serialize(&Value::from(f64::NAN)).unwrap();
    assert_eq!(
        serde_json::to_value(&payload).unwrap(),
        json!({"json": "NaN", "meta": {"values": ["number"]}})
    );
    assert_eq!(deserialize(payload).unwrap(), Value::Number(Number::NaN));
}

#[test]
fn test_shared_reference_identity() {
    init_logging();
    let shared = value!({"x": 1});
    let value = object(vec![("a", shared.clone()), ("b", shared)]);

    let payload = serialize(&value).unwrap();
    assert_eq!(payload.json, json!({"a": {"x": 1}, "b": null}));
    assert_eq!(
        payload.meta.as_ref().unwrap().referential_equalities,
        vec![vec!["a".to_string(), "b".to_string()]]
    );

    let back = deserialize(payload).unwrap();
    let (a, b) = (back.get("a").unwrap(), back.get("b").unwrap());
    assert!(a.ptr_eq(&b));

    set_field(&a, "y", Value::from(2));
    assert_eq!(b.get("y").unwrap(), Value::from(2));
}

#[test]
fn test_cycle_roundtrip() {
    let a = object(vec![("name", Value::from("a"))]);
    set_field(&a, "self", a.clone());
    let root = object(vec![("a", a)]);

    let back = roundtrip(&root);
    let a = back.get("a").unwrap();
    assert!(a.ptr_eq(&a.get("self").unwrap()));
    assert_eq!(a.get("name").unwrap().as_str(), Some("a"));
}

#[test]
fn test_mutual_references() {
    let left = value!({});
    let right = value!({});
    set_field(&left, "peer", right.clone());
    set_field(&right, "peer", left.clone());
    let root = Value::array(vec![left, right]);

    let back = roundtrip(&root);
    let (left, right) = (back.get(0).unwrap(), back.get(1).unwrap());
    assert!(left.get("peer").unwrap().ptr_eq(&right));
    assert!(right.get("peer").unwrap().ptr_eq(&left));
}

#[test]
fn test_shared_references_inside_collections() {
    let key = value!({"id": 1});
    let shared_set = Value::set(vec![Value::from(1)]);
    let root = object(vec![
        ("key", key.clone()),
        ("lookup", Value::map(vec![(key, Value::from("one"))])),
        ("first", shared_set.clone()),
        ("second", Value::array(vec![shared_set])),
    ]);

    let back = roundtrip(&root);
    let Value::Map(entries) = back.get("lookup").unwrap() else {
        panic!("expected a map");
    };
    assert!(entries.borrow()[0].0.ptr_eq(&back.get("key").unwrap()));

    let first = back.get("first").unwrap();
    assert!(matches!(first, Value::Set(_)));
    assert!(first.ptr_eq(&back.get("second").unwrap().get(0).unwrap()));
}

#[test]
fn test_error_values() {
    let error = Value::error(
        ErrorValue::new("boom")
            .with_name("TypeError")
            .with_stack("TypeError: boom\n    at main")
            .with_prop("code", Value::from(42)),
    );

    let back = roundtrip(&error);
    assert_eq!(
        back,
        Value::error(ErrorValue::new("boom").with_name("TypeError"))
    );

    let mut codec = Codec::new();
    codec.allow_error_props(["stack", "code"]);
    assert_eq!(roundtrip_with(&codec, &error), error);
}

#[test]
fn test_registered_class_roundtrip() {
    let user = Class::new("User");
    let mut codec = Codec::new();
    codec.register_class(&user, RegisterOptions::new()).unwrap();

    let fields: ObjectMap = vec![
        ("name".to_string(), Value::from("Ann")),
        ("joined".to_string(), Value::Date(Utc.with_ymd_and_hms(2021, 5, 6, 7, 8, 9).unwrap())),
    ]
    .into_iter()
    .collect();
    let value = Value::array(vec![Value::instance(&user, fields)]);

    let payload = codec.serialize(&value).unwrap();
    assert_eq!(
        serde_json::to_value(payload.meta.as_ref().unwrap()).unwrap(),
        json!({"values": {"0": [["class", "User"], {"joined": ["Date"]}]}})
    );
    assert_eq!(codec.deserialize(payload).unwrap(), value);
}

#[test]
fn test_class_instance_cycle() {
    let node = Class::new("Node");
    let mut codec = Codec::new();
    codec.register_class(&node, RegisterOptions::new()).unwrap();

    let head = Value::instance(&node, ObjectMap::new());
    set_field(&head, "next", head.clone());

    let back = roundtrip_with(&codec, &head);
    assert!(matches!(back, Value::Instance(ref i) if i.borrow().class == node));
    assert!(back.ptr_eq(&back.get("next").unwrap()));
}

#[test]
fn test_class_identifier_and_allowed_props() {
    let account = Class::new("Account");
    let mut codec = Codec::new();
    codec
        .register_class(
            &account,
            RegisterOptions::new()
                .with_identifier("acct")
                .with_allow_props(["id"]),
        )
        .unwrap();

    let fields: ObjectMap = vec![
        ("id".to_string(), Value::from(9)),
        ("secret".to_string(), Value::from("hunter2")),
    ]
    .into_iter()
    .collect();
    let text = codec.stringify(&Value::instance(&account, fields)).unwrap();
    assert_eq!(text, r#"{"json":{"id":9},"meta":{"values":[["class","acct"]]}}"#);

    let back = codec.parse(&text).unwrap();
    assert!(back.get("secret").is_none());
    assert_eq!(back.get("id").unwrap(), Value::from(9));
}

#[test]
fn test_unregistered_class_degrades_to_object() {
    let ghost = Class::new("Ghost");
    let value = Value::instance(&ghost, vec![("x".to_string(), Value::from(1))].into_iter().collect());
    let back = roundtrip(&value);
    assert!(back.is_object());
    assert_eq!(back, value!({"x": 1}));
}

#[test]
fn test_registered_symbols() {
    let red = Symbol::new("red");
    let anonymous = Symbol::anonymous();
    let mut codec = Codec::new();
    codec.register_symbol(&red, None).unwrap();
    codec.register_symbol(&anonymous, Some("anon")).unwrap();

    let value = Value::array(vec![Value::Symbol(red.clone()), Value::Symbol(anonymous.clone())]);
    let payload = codec.serialize(&value).unwrap();
    assert_eq!(payload.json, json!(["red", null]));

    let back = codec.deserialize(payload).unwrap();
    assert_eq!(back, value);
}

#[test]
fn test_unregistered_symbol_is_lossy() {
    let value = Value::array(vec![Value::Symbol(Symbol::new("lost"))]);
    let back = roundtrip(&value);
    assert_eq!(back, value!([null]));
}

#[test]
fn test_custom_transformer() {
    let mut codec = Codec::new();
    codec.register_custom("celsius", CelsiusTransformer).unwrap();

    let value = object(vec![("temp", Value::opaque(Celsius(21.5)))]);
    let payload = codec.serialize(&value).unwrap();
    assert_eq!(payload.json, json!({"temp": 21.5}));

    let back = codec.deserialize(payload).unwrap();
    match back.get("temp").unwrap() {
        Value::Opaque(o) => assert_eq!(o.downcast_ref::<Celsius>(), Some(&Celsius(21.5))),
        other => panic!("expected an opaque value, got {:?}", other),
    }
}

#[test]
fn test_builtin_rules_take_precedence_over_custom() {
    let mut codec = Codec::new();
    codec.register_custom("greedy", GreedyDateTransformer).unwrap();

    let date = Value::Date(Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap());
    let text = codec.stringify(&date).unwrap();
    assert_eq!(
        text,
        r#"{"json":"2000-01-01T00:00:00.000Z","meta":{"values":["Date"]}}"#
    );
    assert_eq!(codec.parse(&text).unwrap(), date);
}

#[test]
fn test_keys_needing_escapes() {
    let value = object(vec![
        ("a.b", Value::Undefined),
        ("", Value::Undefined),
        ("back\\slash", Value::from(f64::INFINITY)),
        ("a", object(vec![("", Value::Undefined), ("b", Value::Undefined)])),
    ]);
    let back = roundtrip(&value);
    assert_eq!(back, value);
}

#[test]
fn test_special_floats_under_empty_key() {
    let floats = || Value::TypedArray(TypedArray::Float64(vec![f64::NAN, f64::NEG_INFINITY, 2.5]));
    let value = object(vec![("", floats())]);

    let text = stringify(&value).unwrap();
    assert_eq!(
        text,
        concat!(
            r#"{"json":{"":["NaN","-Infinity",2.5]},"meta":{"values":{"\\":"#,
            r#"[["typed-array","Float64Array"],{"0":["number"],"1":["number"]}]}}}"#
        )
    );
    assert_eq!(parse(&text).unwrap(), value);

    let holder = Class::new("Holder");
    let mut codec = Codec::new();
    codec.register_class(&holder, RegisterOptions::new()).unwrap();
    let instance = Value::instance(&holder, vec![(String::new(), floats())].into_iter().collect());
    let nested = object(vec![("x", instance)]);
    assert_eq!(roundtrip_with(&codec, &nested), nested);
}

#[test]
fn test_depth_limit() {
    let mut value = value!(1);
    for _ in 0..10 {
        value = Value::array(vec![value]);
    }

    let shallow = Codec::with_options(Options::new().with_max_depth(5));
    assert!(matches!(
        shallow.serialize(&value),
        Err(Error::DepthLimitExceeded(5))
    ));
    assert!(Codec::new().serialize(&value).is_ok());
}

#[test]
fn test_roundtrip_at_max_depth() {
    init_logging();
    let max_depth = serde_lossless::options::DEFAULT_MAX_DEPTH;

    let mut arrays = value!(1);
    let mut maps = value!(true);
    for _ in 0..max_depth {
        arrays = Value::array(vec![arrays]);
        maps = Value::map(vec![(value!("k"), maps)]);
    }
    assert_eq!(parse(&stringify(&arrays).unwrap()).unwrap(), arrays);
    assert_eq!(parse(&stringify(&maps).unwrap()).unwrap(), maps);

    let mut buffer = Vec::new();
    serde_lossless::to_writer(&mut buffer, &maps).unwrap();
    assert_eq!(serde_lossless::from_reader(buffer.as_slice()).unwrap(), maps);

    let too_deep = Value::array(vec![arrays]);
    assert!(matches!(
        stringify(&too_deep),
        Err(Error::DepthLimitExceeded(depth)) if depth == max_depth
    ));
}

#[test]
fn test_roundtrip_at_raised_max_depth() {
    let codec = Codec::with_options(Options::new().with_max_depth(300));
    let mut value = value!(null);
    for _ in 0..300 {
        value = Value::array(vec![value]);
    }
    assert_eq!(roundtrip_with(&codec, &value), value);
    assert!(matches!(
        Codec::new().parse(&codec.stringify(&value).unwrap()),
        Err(Error::DepthLimitExceeded(128))
    ));
}

#[test]
fn test_dates_outside_four_digit_years() {
    let far = Utc.with_ymd_and_hms(10000, 1, 1, 0, 0, 0).unwrap();
    let ancient = Utc.with_ymd_and_hms(-5, 3, 4, 5, 6, 7).unwrap();
    let value = object(vec![("far", Value::Date(far)), ("ancient", Value::Date(ancient))]);

    let text = stringify(&value).unwrap();
    assert_eq!(
        text,
        concat!(
            r#"{"json":{"far":"+010000-01-01T00:00:00.000Z","ancient":"-000005-03-04T05:06:07.000Z"},"#,
            r#""meta":{"values":{"far":["Date"],"ancient":["Date"]}}}"#
        )
    );
    assert_eq!(parse(&text).unwrap(), value);
}

#[test]
fn test_unknown_tag_fails() {
    let err = parse(r#"{"json": 1, "meta": {"values": [null, {"x": ["no-such-tag"]}]}}"#).unwrap_err();
    assert!(matches!(err, Error::UnknownTransform(_)));
}

#[test]
fn test_unregistered_class_tag_fails() {
    let err = parse(r#"{"json": {}, "meta": {"values": [["class", "Ghost"]]}}"#).unwrap_err();
    assert!(matches!(err, Error::UnknownTransform(_)));
}

#[test]
fn test_missing_annotation_path_fails() {
    let err = parse(r#"{"json": {"a": 1}, "meta": {"values": {"b": ["undefined"]}}}"#).unwrap_err();
    assert!(matches!(err, Error::PathResolution { .. }));
}

#[test]
fn test_malformed_payloads() {
    assert!(matches!(parse(r#"{"meta": {}}"#), Err(Error::InvalidPayload(_))));
    assert!(matches!(parse("[1, 2]"), Err(Error::InvalidPayload(_))));
    assert!(matches!(parse("{"), Err(Error::Json(_))));
    assert!(matches!(
        parse(r#"{"json": 1, "meta": {"values": {"x": [null]}}}"#),
        Err(Error::InvalidPayload(_))
    ));
    assert!(matches!(
        parse(r#"{"json": "abc", "meta": {"values": ["Date"]}}"#),
        Err(Error::InvalidPayload(_))
    ));
}

#[test]
fn test_stringify_is_deterministic() {
    let value = object(vec![
        ("z", Value::Undefined),
        ("a", Value::set(vec![Value::Undefined])),
    ]);
    assert_eq!(stringify(&value).unwrap(), stringify(&value).unwrap());
}
