//! Round-tripping shared references, a cycle and a registered class.
//!
//! Run with: cargo run --example roundtrip

use chrono::{TimeZone, Utc};
use serde_lossless::{value, Class, Codec, ObjectMap, Options, RegisterOptions, Value};
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    let point = Class::new("Point");
    let mut codec = Codec::with_options(Options::pretty());
    codec.register_class(&point, RegisterOptions::new())?;

    let mut fields = ObjectMap::new();
    fields.insert("x".to_string(), Value::from(3));
    fields.insert("y".to_string(), Value::from(f64::NEG_INFINITY));
    let corner = Value::instance(&point, fields);

    let mut shape = ObjectMap::new();
    shape.insert("start".to_string(), corner.clone());
    shape.insert("end".to_string(), corner.clone());
    shape.insert("tags".to_string(), Value::set(vec![value!("open"), value!("draft")]));
    let created = Utc
        .with_ymd_and_hms(2024, 2, 29, 12, 0, 0)
        .single()
        .ok_or("invalid date")?;
    shape.insert("created".to_string(), Value::Date(created));
    let shape = Value::object(shape);

    // The shape refers to itself
    if let Value::Object(fields) = &shape {
        fields.borrow_mut().insert("self".to_string(), shape.clone());
    }

    let text = codec.stringify(&shape)?;
    println!("Payload:");
    println!("{}\n", text);

    let back = codec.parse(&text)?;
    let start = back.get("start").ok_or("missing `start`")?;
    let end = back.get("end").ok_or("missing `end`")?;
    let itself = back.get("self").ok_or("missing `self`")?;

    println!("Equal to the original:  {}", back == shape);
    println!("start and end shared:   {}", start.ptr_eq(&end));
    println!("self refers to itself:  {}", itself.ptr_eq(&back));
    if let Value::Instance(instance) = &start {
        println!("start is a:             {}", instance.borrow().class.name());
    }

    Ok(())
}
