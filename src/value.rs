//! A typed value tree, used by the variadic append/read convenience methods
//! (`spec.md` §4.4 `append_variadic`, §4.5's read side) in place of the
//! original's `type_string, args...` C varargs calling convention, which has
//! no idiomatic Rust equivalent. A `Value` carries its own D-Bus signature,
//! so walking one recursively drives `open_container`/`append_basic`/
//! `close_container` exactly as a hand-written call sequence would.

/// One D-Bus value, basic or container. `Array`'s element signature is
/// carried explicitly since an empty array gives no element to infer it
/// from.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Byte(u8),
    Boolean(bool),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Double(f64),
    String(String),
    ObjectPath(String),
    Signature(String),
    /// Index into the message's out-of-band fd list, not a raw descriptor.
    UnixFd(u32),
    Array(String, Vec<Value>),
    Variant(Box<Value>),
    Struct(Vec<Value>),
    DictEntry(Box<Value>, Box<Value>),
}

impl Value {
    pub(crate) fn is_basic(&self) -> bool {
        !matches!(
            self,
            Value::Array(..) | Value::Variant(_) | Value::Struct(_) | Value::DictEntry(..)
        )
    }

    /// The complete-type signature fragment this value occupies on the wire.
    pub fn signature(&self) -> String {
        match self {
            Value::Byte(_) => "y".to_string(),
            Value::Boolean(_) => "b".to_string(),
            Value::Int16(_) => "n".to_string(),
            Value::UInt16(_) => "q".to_string(),
            Value::Int32(_) => "i".to_string(),
            Value::UInt32(_) => "u".to_string(),
            Value::Int64(_) => "x".to_string(),
            Value::UInt64(_) => "t".to_string(),
            Value::Double(_) => "d".to_string(),
            Value::String(_) => "s".to_string(),
            Value::ObjectPath(_) => "o".to_string(),
            Value::Signature(_) => "g".to_string(),
            Value::UnixFd(_) => "h".to_string(),
            Value::Array(elem_sig, _) => format!("a{}", elem_sig),
            Value::Variant(_) => "v".to_string(),
            Value::Struct(items) => {
                let inner: String = items.iter().map(Value::signature).collect();
                format!("({})", inner)
            }
            Value::DictEntry(k, v) => format!("{{{}{}}}", k.signature(), v.signature()),
        }
    }
}
