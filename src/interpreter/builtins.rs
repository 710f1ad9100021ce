//! Built-in function implementations
//!
//! This module provides the functions and methods every program can use
//! without declaring them. They are implemented natively by the interpreter
//! and show up in the heap as [`Callable::Native`] function objects.
//!
//! # Supported Built-ins
//!
//! - Globals: `parseInt`, `parseFloat`, `isNaN`, `isFinite`, `Number`,
//!   `String`, `Boolean`, `Array.isArray`, `Object.keys`
//! - `console.log`, captured into the interpreter's [`MockTerminal`](crate::snapshot::MockTerminal)
//! - `JSON.parse` / `JSON.stringify`
//! - `Math` constants and functions (`Math.random` is a seeded xorshift so
//!   runs are reproducible)
//! - Array methods `push pop slice indexOf includes join concat`
//! - String methods `charAt indexOf includes slice toUpperCase toLowerCase split trim`
//! - Number methods `toFixed toString`
//!
//! # Implementation Notes
//!
//! - Strings are indexed by `char`, not by UTF-16 code unit
//! - Method lookups on arrays, strings and numbers resolve through
//!   [`Builtin::array_method`] and friends; the function object is allocated
//!   once per interpreter

use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::RuntimeError;
use crate::memory::heap::{Callable, HeapObject, ObjectId};
use crate::memory::value::{number_to_string, Value};
use crate::parser::ast::SourceLocation;

/// Functions of the `Math` object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MathFn {
    Abs,
    Floor,
    Ceil,
    Round,
    Trunc,
    Sign,
    Sqrt,
    Cbrt,
    Pow,
    Exp,
    Log,
    Log2,
    Log10,
    Sin,
    Cos,
    Tan,
    Atan,
    Atan2,
    Hypot,
    Min,
    Max,
    Random,
}

impl MathFn {
    const ALL: [MathFn; 22] = [
        MathFn::Abs,
        MathFn::Floor,
        MathFn::Ceil,
        MathFn::Round,
        MathFn::Trunc,
        MathFn::Sign,
        MathFn::Sqrt,
        MathFn::Cbrt,
        MathFn::Pow,
        MathFn::Exp,
        MathFn::Log,
        MathFn::Log2,
        MathFn::Log10,
        MathFn::Sin,
        MathFn::Cos,
        MathFn::Tan,
        MathFn::Atan,
        MathFn::Atan2,
        MathFn::Hypot,
        MathFn::Min,
        MathFn::Max,
        MathFn::Random,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MathFn::Abs => "abs",
            MathFn::Floor => "floor",
            MathFn::Ceil => "ceil",
            MathFn::Round => "round",
            MathFn::Trunc => "trunc",
            MathFn::Sign => "sign",
            MathFn::Sqrt => "sqrt",
            MathFn::Cbrt => "cbrt",
            MathFn::Pow => "pow",
            MathFn::Exp => "exp",
            MathFn::Log => "log",
            MathFn::Log2 => "log2",
            MathFn::Log10 => "log10",
            MathFn::Sin => "sin",
            MathFn::Cos => "cos",
            MathFn::Tan => "tan",
            MathFn::Atan => "atan",
            MathFn::Atan2 => "atan2",
            MathFn::Hypot => "hypot",
            MathFn::Min => "min",
            MathFn::Max => "max",
            MathFn::Random => "random",
        }
    }
}

/// Every natively implemented function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    ConsoleLog,
    JsonParse,
    JsonStringify,
    ParseInt,
    ParseFloat,
    IsNaN,
    IsFinite,
    Number,
    String,
    Boolean,
    ArrayIsArray,
    ObjectKeys,
    Math(MathFn),

    ArrayPush,
    ArrayPop,
    ArraySlice,
    ArrayIndexOf,
    ArrayIncludes,
    ArrayJoin,
    ArrayConcat,

    StringCharAt,
    StringIndexOf,
    StringIncludes,
    StringSlice,
    StringToUpperCase,
    StringToLowerCase,
    StringSplit,
    StringTrim,

    NumberToFixed,
    NumberToString,
}

impl Builtin {
    pub fn name(&self) -> &'static str {
        match self {
            Builtin::ConsoleLog => "log",
            Builtin::JsonParse => "parse",
            Builtin::JsonStringify => "stringify",
            Builtin::ParseInt => "parseInt",
            Builtin::ParseFloat => "parseFloat",
            Builtin::IsNaN => "isNaN",
            Builtin::IsFinite => "isFinite",
            Builtin::Number => "Number",
            Builtin::String => "String",
            Builtin::Boolean => "Boolean",
            Builtin::ArrayIsArray => "isArray",
            Builtin::ObjectKeys => "keys",
            Builtin::Math(f) => f.name(),
            Builtin::ArrayPush => "push",
            Builtin::ArrayPop => "pop",
            Builtin::ArraySlice | Builtin::StringSlice => "slice",
            Builtin::ArrayIndexOf | Builtin::StringIndexOf => "indexOf",
            Builtin::ArrayIncludes | Builtin::StringIncludes => "includes",
            Builtin::ArrayJoin => "join",
            Builtin::ArrayConcat => "concat",
            Builtin::StringCharAt => "charAt",
            Builtin::StringToUpperCase => "toUpperCase",
            Builtin::StringToLowerCase => "toLowerCase",
            Builtin::StringSplit => "split",
            Builtin::StringTrim => "trim",
            Builtin::NumberToFixed => "toFixed",
            Builtin::NumberToString => "toString",
        }
    }

    pub fn array_method(name: &str) -> Option<Builtin> {
        Some(match name {
            "push" => Builtin::ArrayPush,
            "pop" => Builtin::ArrayPop,
            "slice" => Builtin::ArraySlice,
            "indexOf" => Builtin::ArrayIndexOf,
            "includes" => Builtin::ArrayIncludes,
            "join" => Builtin::ArrayJoin,
            "concat" => Builtin::ArrayConcat,
            _ => return None,
        })
    }

    pub fn string_method(name: &str) -> Option<Builtin> {
        Some(match name {
            "charAt" => Builtin::StringCharAt,
            "indexOf" => Builtin::StringIndexOf,
            "includes" => Builtin::StringIncludes,
            "slice" => Builtin::StringSlice,
            "toUpperCase" => Builtin::StringToUpperCase,
            "toLowerCase" => Builtin::StringToLowerCase,
            "split" => Builtin::StringSplit,
            "trim" => Builtin::StringTrim,
            _ => return None,
        })
    }

    pub fn number_method(name: &str) -> Option<Builtin> {
        match name {
            "toFixed" => Some(Builtin::NumberToFixed),
            "toString" => Some(Builtin::NumberToString),
            _ => None,
        }
    }
}

/// Bind the standard globals into a fresh interpreter
pub(crate) fn install_globals(interp: &mut Interpreter) {
    interp.define_global("undefined", Value::Undefined);
    interp.define_global("NaN", Value::Number(f64::NAN));
    interp.define_global("Infinity", Value::Number(f64::INFINITY));

    for builtin in [
        Builtin::ParseInt,
        Builtin::ParseFloat,
        Builtin::IsNaN,
        Builtin::IsFinite,
        Builtin::Number,
        Builtin::String,
        Builtin::Boolean,
    ] {
        let function = native(interp, builtin);
        interp.define_global(builtin.name(), function);
    }

    let mut math = HeapObject::plain();
    for (name, value) in [
        ("PI", std::f64::consts::PI),
        ("E", std::f64::consts::E),
        ("LN2", std::f64::consts::LN_2),
        ("LN10", std::f64::consts::LN_10),
        ("LOG2E", std::f64::consts::LOG2_E),
        ("LOG10E", std::f64::consts::LOG10_E),
        ("SQRT2", std::f64::consts::SQRT_2),
        ("SQRT1_2", std::f64::consts::FRAC_1_SQRT_2),
    ] {
        math.set(name, Value::Number(value));
    }
    for f in MathFn::ALL {
        math.set(f.name(), native(interp, Builtin::Math(f)));
    }
    let math = interp.alloc(math);
    interp.define_global("Math", math);

    let namespaces: [(&str, &[Builtin]); 4] = [
        ("console", &[Builtin::ConsoleLog]),
        ("JSON", &[Builtin::JsonParse, Builtin::JsonStringify]),
        ("Array", &[Builtin::ArrayIsArray]),
        ("Object", &[Builtin::ObjectKeys]),
    ];
    for (namespace, members) in namespaces {
        let mut object = HeapObject::plain();
        for &member in members {
            object.set(member.name(), native(interp, member));
        }
        let object = interp.alloc(object);
        interp.define_global(namespace, object);
    }
}

fn native(interp: &mut Interpreter, builtin: Builtin) -> Value {
    interp.alloc(HeapObject::function(Callable::Native(builtin)))
}

fn arg(args: &[Value], i: usize) -> Value {
    args.get(i).cloned().unwrap_or_default()
}

/// Resolve a relative `slice`-style index against `len`
fn relative_index(value: &Value, len: usize, default: usize) -> usize {
    if value.is_undefined() {
        return default;
    }
    let n = value.to_number();
    if n.is_nan() {
        return 0;
    }
    let n = n.trunc();
    if n < 0.0 {
        (len as f64 + n).max(0.0) as usize
    } else {
        n.min(len as f64) as usize
    }
}

impl Interpreter {
    pub(crate) fn call_builtin(
        &mut self,
        builtin: Builtin,
        receiver: &Value,
        args: &[Value],
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        match builtin {
            Builtin::ConsoleLog => {
                let line = args
                    .iter()
                    .map(|v| match v {
                        Value::String(s) => s.clone(),
                        other => self.inspect(other),
                    })
                    .collect::<Vec<_>>()
                    .join(" ");
                self.terminal.println(line, location);
                Ok(Value::Undefined)
            }

            Builtin::JsonParse => {
                let text = self.to_display(&arg(args, 0));
                let json: serde_json::Value =
                    serde_json::from_str(&text).map_err(|err| RuntimeError::InvalidArgument {
                        function: "SyntaxError".to_string(),
                        message: format!("JSON.parse: {err}"),
                        location,
                    })?;
                Ok(self.from_native(&json))
            }

            Builtin::JsonStringify => self.json_stringify(&arg(args, 0), &arg(args, 2), location),

            Builtin::ParseInt => Ok(Value::Number(parse_int(
                &self.to_display(&arg(args, 0)),
                &arg(args, 1),
            ))),

            Builtin::ParseFloat => Ok(Value::Number(parse_float(
                &self.to_display(&arg(args, 0)),
            ))),

            Builtin::IsNaN => Ok(Value::Bool(self.to_number_value(&arg(args, 0)).is_nan())),

            Builtin::IsFinite => Ok(Value::Bool(
                self.to_number_value(&arg(args, 0)).is_finite(),
            )),

            Builtin::Number => Ok(Value::Number(match args.first() {
                Some(v) => self.to_number_value(v),
                None => 0.0,
            })),

            Builtin::String => Ok(Value::String(match args.first() {
                Some(v) => self.to_display(v),
                None => String::new(),
            })),

            Builtin::Boolean => Ok(Value::Bool(arg(args, 0).is_truthy())),

            Builtin::ArrayIsArray => Ok(Value::Bool(
                arg(args, 0)
                    .as_object()
                    .and_then(|id| self.heap.get(id))
                    .is_some_and(|o| o.as_array().is_some()),
            )),

            Builtin::ObjectKeys => self.object_keys(&arg(args, 0), location),

            Builtin::Math(f) => Ok(Value::Number(self.call_math(f, args))),

            Builtin::ArrayPush
            | Builtin::ArrayPop
            | Builtin::ArraySlice
            | Builtin::ArrayIndexOf
            | Builtin::ArrayIncludes
            | Builtin::ArrayJoin
            | Builtin::ArrayConcat => self.call_array_method(builtin, receiver, args, location),

            Builtin::StringCharAt
            | Builtin::StringIndexOf
            | Builtin::StringIncludes
            | Builtin::StringSlice
            | Builtin::StringToUpperCase
            | Builtin::StringToLowerCase
            | Builtin::StringSplit
            | Builtin::StringTrim => {
                let Value::String(text) = receiver else {
                    return Err(RuntimeError::type_error(
                        format!("String.prototype.{} called on a non-string", builtin.name()),
                        location,
                    ));
                };
                self.call_string_method(builtin, text, args)
            }

            Builtin::NumberToFixed | Builtin::NumberToString => {
                let Value::Number(n) = receiver else {
                    return Err(RuntimeError::type_error(
                        format!("Number.prototype.{} called on a non-number", builtin.name()),
                        location,
                    ));
                };
                number_method(builtin, *n, &arg(args, 0), location)
            }
        }
    }

    fn json_stringify(
        &mut self,
        value: &Value,
        indent: &Value,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        let json = self
            .to_json(value)
            .map_err(|err| RuntimeError::InvalidArgument {
                function: "TypeError".to_string(),
                message: format!("JSON.stringify: {err}"),
                location,
            })?;
        let Some(json) = json else {
            return Ok(Value::Undefined);
        };

        let indent = match indent {
            Value::Number(n) if *n >= 1.0 => " ".repeat((*n as usize).min(10)),
            Value::String(s) => s.chars().take(10).collect(),
            _ => String::new(),
        };
        let text = if indent.is_empty() {
            serde_json::to_string(&json)
        } else {
            let mut out = Vec::new();
            let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
            let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
            serde::Serialize::serialize(&json, &mut serializer)
                .map(|_| String::from_utf8_lossy(&out).into_owned())
        }
        .map_err(|err| RuntimeError::InvalidArgument {
            function: "TypeError".to_string(),
            message: format!("JSON.stringify: {err}"),
            location,
        })?;
        Ok(Value::String(text))
    }

    fn object_keys(
        &mut self,
        value: &Value,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        let keys: Vec<Value> = match value {
            Value::Undefined | Value::Null => {
                return Err(RuntimeError::type_error(
                    "Cannot convert undefined or null to object",
                    location,
                ))
            }
            Value::String(s) => (0..s.chars().count())
                .map(|i| Value::String(i.to_string()))
                .collect(),
            Value::Object(id) => match self.heap.get(*id) {
                Some(object) => {
                    let indices = object.as_array().map_or(0, Vec::len);
                    (0..indices)
                        .map(|i| Value::String(i.to_string()))
                        .chain(object.keys().iter().map(|k| Value::String(k.clone())))
                        .collect()
                }
                None => Vec::new(),
            },
            _ => Vec::new(),
        };
        Ok(self.alloc(HeapObject::array(keys)))
    }

    fn call_math(&mut self, f: MathFn, args: &[Value]) -> f64 {
        if f == MathFn::Random {
            return self.next_random();
        }
        let x = self.to_number_value(&arg(args, 0));
        let y = || self.to_number_value(&arg(args, 1));

        match f {
            MathFn::Abs => x.abs(),
            MathFn::Floor => x.floor(),
            MathFn::Ceil => x.ceil(),
            // Halves round towards +Infinity
            MathFn::Round => (x + 0.5).floor(),
            MathFn::Trunc => x.trunc(),
            MathFn::Sign => {
                if x.is_nan() || x == 0.0 {
                    x
                } else {
                    x.signum()
                }
            }
            MathFn::Sqrt => x.sqrt(),
            MathFn::Cbrt => x.cbrt(),
            MathFn::Pow => {
                let exponent = y();
                if exponent.is_nan() {
                    f64::NAN
                } else {
                    x.powf(exponent)
                }
            }
            MathFn::Exp => x.exp(),
            MathFn::Log => x.ln(),
            MathFn::Log2 => x.log2(),
            MathFn::Log10 => x.log10(),
            MathFn::Sin => x.sin(),
            MathFn::Cos => x.cos(),
            MathFn::Tan => x.tan(),
            MathFn::Atan => x.atan(),
            MathFn::Atan2 => x.atan2(y()),
            MathFn::Hypot => args
                .iter()
                .map(|v| self.to_number_value(v))
                .fold(0.0, |acc: f64, v| acc.hypot(v)),
            MathFn::Min | MathFn::Max => {
                let numbers: Vec<f64> = args.iter().map(|v| self.to_number_value(v)).collect();
                if numbers.iter().any(|n| n.is_nan()) {
                    return f64::NAN;
                }
                if f == MathFn::Min {
                    numbers.into_iter().fold(f64::INFINITY, f64::min)
                } else {
                    numbers.into_iter().fold(f64::NEG_INFINITY, f64::max)
                }
            }
            MathFn::Random => f64::NAN,
        }
    }

    /// xorshift64 mapped into `[0, 1)`
    fn next_random(&mut self) -> f64 {
        let mut x = self.rng_state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.rng_state = x;
        (x >> 11) as f64 / (1u64 << 53) as f64
    }

    fn receiver_array(
        &self,
        receiver: &Value,
        method: Builtin,
        location: SourceLocation,
    ) -> Result<ObjectId, RuntimeError> {
        receiver
            .as_object()
            .filter(|id| self.heap.get(*id).is_some_and(|o| o.as_array().is_some()))
            .ok_or_else(|| {
                RuntimeError::type_error(
                    format!("Array.prototype.{} called on a non-array", method.name()),
                    location,
                )
            })
    }

    fn call_array_method(
        &mut self,
        method: Builtin,
        receiver: &Value,
        args: &[Value],
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        let id = self.receiver_array(receiver, method, location)?;
        let elements = self
            .heap
            .get(id)
            .and_then(|o| o.as_array())
            .cloned()
            .unwrap_or_default();

        match method {
            Builtin::ArrayPush | Builtin::ArrayPop => {
                let Some(object) = self.heap.get_mut(id) else {
                    return Ok(Value::Undefined);
                };
                if object.frozen {
                    return Err(RuntimeError::ReadOnlyProperty {
                        property: "length".to_string(),
                        location,
                    });
                }
                let Some(items) = object.as_array_mut() else {
                    return Ok(Value::Undefined);
                };
                if method == Builtin::ArrayPush {
                    items.extend(args.iter().cloned());
                    Ok(Value::Number(items.len() as f64))
                } else {
                    Ok(items.pop().unwrap_or_default())
                }
            }

            Builtin::ArraySlice => {
                let len = elements.len();
                let start = relative_index(&arg(args, 0), len, 0);
                let end = relative_index(&arg(args, 1), len, len);
                let slice = if start < end {
                    elements[start..end].to_vec()
                } else {
                    Vec::new()
                };
                Ok(self.alloc(HeapObject::array(slice)))
            }

            Builtin::ArrayIndexOf => {
                let needle = arg(args, 0);
                let from = relative_index(&arg(args, 1), elements.len(), 0);
                let found = elements
                    .iter()
                    .enumerate()
                    .skip(from)
                    .find(|(_, v)| self.strict_equals(v, &needle))
                    .map_or(-1.0, |(i, _)| i as f64);
                Ok(Value::Number(found))
            }

            Builtin::ArrayIncludes => {
                let needle = arg(args, 0);
                // Unlike indexOf, includes finds NaN
                let found = elements.iter().any(|v| {
                    let both_nan = matches!(
                        (v, &needle),
                        (Value::Number(a), Value::Number(b)) if a.is_nan() && b.is_nan()
                    );
                    self.strict_equals(v, &needle) || both_nan
                });
                Ok(Value::Bool(found))
            }

            Builtin::ArrayJoin => {
                let separator = match arg(args, 0) {
                    Value::Undefined => ",".to_string(),
                    other => self.to_display(&other),
                };
                let joined = elements
                    .iter()
                    .map(|v| {
                        if v.is_nullish() {
                            String::new()
                        } else {
                            self.to_display(v)
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(&separator);
                Ok(Value::String(joined))
            }

            Builtin::ArrayConcat => {
                let mut result = elements;
                for value in args {
                    let spread = value
                        .as_object()
                        .and_then(|id| self.heap.get(id))
                        .and_then(|o| o.as_array())
                        .cloned();
                    match spread {
                        Some(items) => result.extend(items),
                        None => result.push(value.clone()),
                    }
                }
                Ok(self.alloc(HeapObject::array(result)))
            }

            _ => Ok(Value::Undefined),
        }
    }

    fn call_string_method(
        &mut self,
        method: Builtin,
        text: &str,
        args: &[Value],
    ) -> Result<Value, RuntimeError> {
        let chars: Vec<char> = text.chars().collect();

        Ok(match method {
            Builtin::StringCharAt => {
                let index = self.to_number_value(&arg(args, 0));
                let index = if index.is_nan() { 0.0 } else { index.trunc() };
                let c = if index >= 0.0 {
                    chars.get(index as usize).map(|c| c.to_string())
                } else {
                    None
                };
                Value::String(c.unwrap_or_default())
            }

            Builtin::StringIndexOf | Builtin::StringIncludes => {
                let needle: Vec<char> = self.to_display(&arg(args, 0)).chars().collect();
                let from = relative_index(&arg(args, 1), chars.len(), 0);
                let position = (from..=chars.len())
                    .find(|&i| chars[i..].starts_with(&needle));
                if method == Builtin::StringIncludes {
                    Value::Bool(position.is_some())
                } else {
                    Value::Number(position.map_or(-1.0, |i| i as f64))
                }
            }

            Builtin::StringSlice => {
                let start = relative_index(&arg(args, 0), chars.len(), 0);
                let end = relative_index(&arg(args, 1), chars.len(), chars.len());
                let slice: String = if start < end {
                    chars[start..end].iter().collect()
                } else {
                    String::new()
                };
                Value::String(slice)
            }

            Builtin::StringToUpperCase => Value::String(text.to_uppercase()),

            Builtin::StringToLowerCase => Value::String(text.to_lowercase()),

            Builtin::StringTrim => Value::String(text.trim().to_string()),

            Builtin::StringSplit => {
                let limit = match arg(args, 1) {
                    Value::Undefined => usize::MAX,
                    other => self.to_number_value(&other).max(0.0) as usize,
                };
                let parts: Vec<Value> = match arg(args, 0) {
                    Value::Undefined => vec![Value::String(text.to_string())],
                    separator => {
                        let separator = self.to_display(&separator);
                        if separator.is_empty() {
                            chars.iter().map(|c| Value::String(c.to_string())).collect()
                        } else {
                            text.split(separator.as_str())
                                .map(|s| Value::String(s.to_string()))
                                .collect()
                        }
                    }
                };
                self.alloc(HeapObject::array(parts.into_iter().take(limit).collect()))
            }

            _ => Value::Undefined,
        })
    }
}

fn number_method(
    method: Builtin,
    n: f64,
    argument: &Value,
    location: SourceLocation,
) -> Result<Value, RuntimeError> {
    let range_error = |message: &str| RuntimeError::InvalidArgument {
        function: "RangeError".to_string(),
        message: message.to_string(),
        location,
    };

    match method {
        Builtin::NumberToFixed => {
            let digits = match argument {
                Value::Undefined => 0.0,
                other => other.to_number().trunc(),
            };
            if !(0.0..=100.0).contains(&digits) {
                return Err(range_error("toFixed() digits argument must be between 0 and 100"));
            }
            if !n.is_finite() || n.abs() >= 1e21 {
                return Ok(Value::String(number_to_string(n)));
            }
            Ok(Value::String(format!("{:.*}", digits as usize, n)))
        }
        _ => {
            let radix = match argument {
                Value::Undefined => 10.0,
                other => other.to_number().trunc(),
            };
            if !(2.0..=36.0).contains(&radix) {
                return Err(range_error("toString() radix must be between 2 and 36"));
            }
            if radix == 10.0 || !n.is_finite() {
                return Ok(Value::String(number_to_string(n)));
            }
            Ok(Value::String(to_radix(n, radix as u32)))
        }
    }
}

/// Format a finite number in a radix other than 10
fn to_radix(n: f64, radix: u32) -> String {
    let negative = n < 0.0;
    let n = n.abs();
    let mut integer = n.trunc();
    let mut fraction = n - integer;

    let mut digits = Vec::new();
    loop {
        let digit = (integer % radix as f64) as u32;
        digits.push(std::char::from_digit(digit, radix).unwrap_or('0'));
        integer = (integer / radix as f64).trunc();
        if integer == 0.0 {
            break;
        }
    }
    if negative {
        digits.push('-');
    }
    let mut out: String = digits.into_iter().rev().collect();

    if fraction > 0.0 {
        out.push('.');
        for _ in 0..20 {
            fraction *= radix as f64;
            let digit = fraction.trunc() as u32;
            out.push(std::char::from_digit(digit, radix).unwrap_or('0'));
            fraction -= digit as f64;
            if fraction == 0.0 {
                break;
            }
        }
    }
    out
}

/// `parseInt`: longest digit prefix in the given radix
fn parse_int(text: &str, radix: &Value) -> f64 {
    let mut rest = text.trim_start();
    let mut sign = 1.0;
    if let Some(stripped) = rest.strip_prefix('-') {
        sign = -1.0;
        rest = stripped;
    } else if let Some(stripped) = rest.strip_prefix('+') {
        rest = stripped;
    }

    let mut radix = match radix {
        Value::Undefined => 0,
        other => {
            let r = other.to_number();
            if r.is_nan() {
                0
            } else {
                r.trunc() as i64
            }
        }
    };
    if radix != 0 && !(2..=36).contains(&radix) {
        return f64::NAN;
    }
    if radix == 0 || radix == 16 {
        if let Some(hex) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
            rest = hex;
            radix = 16;
        }
    }
    if radix == 0 {
        radix = 10;
    }

    let mut result: Option<f64> = None;
    for c in rest.chars() {
        let Some(digit) = c.to_digit(radix as u32) else {
            break;
        };
        result = Some(result.unwrap_or(0.0) * radix as f64 + digit as f64);
    }
    result.map_or(f64::NAN, |n| sign * n)
}

/// `parseFloat`: longest decimal literal prefix
fn parse_float(text: &str) -> f64 {
    let rest = text.trim_start();
    let unsigned = rest.trim_start_matches(['+', '-']);
    if unsigned.starts_with("Infinity") && rest.len() - unsigned.len() <= 1 {
        return if rest.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }

    let bytes = rest.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
    }
    if !rest[digits_start..end].bytes().any(|b| b.is_ascii_digit()) {
        return f64::NAN;
    }
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits {
            end = exp_end;
        }
    }
    rest[..end].parse::<f64>().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::scope::Scopes;

    fn eval(source: &str) -> Interpreter {
        let mut interp = Interpreter::from_source(source).unwrap();
        while !interp.step().unwrap().finished {}
        interp
    }

    fn global(interp: &Interpreter, name: &str) -> Value {
        interp.scopes().lookup(Scopes::GLOBAL, name).unwrap()
    }

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int("  42px", &Value::Undefined), 42.0);
        assert_eq!(parse_int("-0x1f", &Value::Undefined), -31.0);
        assert_eq!(parse_int("101", &Value::Number(2.0)), 5.0);
        assert!(parse_int("zz", &Value::Number(10.0)).is_nan());
        assert!(parse_int("1", &Value::Number(40.0)).is_nan());
    }

    #[test]
    fn test_parse_float() {
        assert_eq!(parse_float("3.5kg"), 3.5);
        assert_eq!(parse_float("  -1e3x"), -1000.0);
        assert_eq!(parse_float("2e"), 2.0);
        assert_eq!(parse_float("-Infinity"), f64::NEG_INFINITY);
        assert!(parse_float(".").is_nan());
    }

    #[test]
    fn test_number_formatting() {
        let loc = SourceLocation::new(1, 1, 0);
        assert_eq!(
            number_method(Builtin::NumberToFixed, 3.14159, &Value::Number(2.0), loc).unwrap(),
            Value::from("3.14")
        );
        assert_eq!(
            number_method(Builtin::NumberToString, 255.0, &Value::Number(16.0), loc).unwrap(),
            Value::from("ff")
        );
        assert_eq!(to_radix(-0.5, 2), "-0.1");
        assert!(number_method(Builtin::NumberToFixed, 1.0, &Value::Number(101.0), loc).is_err());
    }

    #[test]
    fn test_array_methods() {
        let interp = eval(
            "var a = [3, 1, 2];\n\
             var n = a.push(4);\n\
             var last = a.pop();\n\
             var s = a.slice(-2).join(\"-\");\n\
             var i = a.indexOf(2);\n\
             var c = a.concat([9], 8).length;",
        );
        assert_eq!(global(&interp, "n"), Value::Number(4.0));
        assert_eq!(global(&interp, "last"), Value::Number(4.0));
        assert_eq!(global(&interp, "s"), Value::from("1-2"));
        assert_eq!(global(&interp, "i"), Value::Number(2.0));
        assert_eq!(global(&interp, "c"), Value::Number(5.0));
    }

    #[test]
    fn test_string_methods() {
        let interp = eval(
            "var s = \"  Hello World \".trim();\n\
             var u = s.toUpperCase();\n\
             var w = s.split(\" \")[1];\n\
             var i = s.indexOf(\"o\");\n\
             var part = s.slice(0, 4);",
        );
        assert_eq!(global(&interp, "u"), Value::from("HELLO WORLD"));
        assert_eq!(global(&interp, "w"), Value::from("World"));
        assert_eq!(global(&interp, "i"), Value::Number(4.0));
        assert_eq!(global(&interp, "part"), Value::from("Hell"));
    }

    #[test]
    fn test_math_and_globals() {
        let interp = eval(
            "var a = Math.max(1, 5, 3);\n\
             var b = Math.round(-2.5);\n\
             var c = Math.min();\n\
             var d = isNaN(\"abc\");\n\
             var r = Math.random();",
        );
        assert_eq!(global(&interp, "a"), Value::Number(5.0));
        assert_eq!(global(&interp, "b"), Value::Number(-2.0));
        assert_eq!(global(&interp, "c"), Value::Number(f64::INFINITY));
        assert_eq!(global(&interp, "d"), Value::Bool(true));
        let r = global(&interp, "r").as_number().unwrap();
        assert!((0.0..1.0).contains(&r));
    }

    #[test]
    fn test_random_is_reproducible() {
        let a = eval("var r = Math.random();");
        let b = eval("var r = Math.random();");
        assert_eq!(global(&a, "r"), global(&b, "r"));
    }

    #[test]
    fn test_json_round_trip_through_script() {
        let interp = eval(
            "var o = JSON.parse(\"{\\\"b\\\": [1, 2], \\\"a\\\": null}\");\n\
             var keys = Object.keys(o).join(\",\");\n\
             var text = JSON.stringify(o);",
        );
        assert_eq!(global(&interp, "keys"), Value::from("b,a"));
        assert_eq!(global(&interp, "text"), Value::from("{\"b\":[1,2],\"a\":null}"));
    }

    #[test]
    fn test_console_log_is_captured() {
        let interp = eval("console.log(\"total:\", 3, [1, 2], { k: \"v\" });");
        assert_eq!(
            interp.terminal().get_output(),
            vec!["total: 3 [ 1, 2 ] { k: 'v' }".to_string()]
        );
    }
}
