use crate::objects::{Dictionary, Stream};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId {
    number: u32,
    generation: u16,
}

impl ObjectId {
    pub fn new(number: u32, generation: u16) -> Self {
        Self { number, generation }
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn generation(&self) -> u16 {
        self.generation
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} R", self.number, self.generation)
    }
}

/// A PDF value: the payload of an indirect object or anything nested in one.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    String(Vec<u8>),
    Name(String),
    Array(Vec<Object>),
    Dictionary(Dictionary),
    Stream(Stream),
    Reference(ObjectId),
}

impl Object {
    pub fn name(name: impl Into<String>) -> Self {
        Object::Name(name.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Object::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Object::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Object::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match self {
            Object::Real(f) => Some(*f),
            Object::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&[u8]> {
        match self {
            Object::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            Object::Name(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Object>> {
        match self {
            Object::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Dictionary view of this value; streams expose their stream dictionary.
    pub fn as_dict(&self) -> Option<&Dictionary> {
        match self {
            Object::Dictionary(dict) => Some(dict),
            Object::Stream(stream) => Some(stream.dictionary()),
            _ => None,
        }
    }

    pub fn as_dict_mut(&mut self) -> Option<&mut Dictionary> {
        match self {
            Object::Dictionary(dict) => Some(dict),
            Object::Stream(stream) => Some(stream.dictionary_mut()),
            _ => None,
        }
    }

    pub fn as_stream(&self) -> Option<&Stream> {
        match self {
            Object::Stream(stream) => Some(stream),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<ObjectId> {
        match self {
            Object::Reference(id) => Some(*id),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Null => "null",
            Object::Boolean(_) => "boolean",
            Object::Integer(_) => "integer",
            Object::Real(_) => "real",
            Object::String(_) => "string",
            Object::Name(_) => "name",
            Object::Array(_) => "array",
            Object::Dictionary(_) => "dictionary",
            Object::Stream(_) => "stream",
            Object::Reference(_) => "reference",
        }
    }

    /// Collects every reference embedded in this value, in document order.
    pub fn references(&self) -> Vec<ObjectId> {
        let mut refs = Vec::new();
        self.collect_references(&mut refs);
        refs
    }

    fn collect_references(&self, refs: &mut Vec<ObjectId>) {
        match self {
            Object::Reference(id) => refs.push(*id),
            Object::Array(items) => {
                for item in items {
                    item.collect_references(refs);
                }
            }
            Object::Dictionary(dict) => {
                for value in dict.values() {
                    value.collect_references(refs);
                }
            }
            Object::Stream(stream) => {
                for value in stream.dictionary().values() {
                    value.collect_references(refs);
                }
            }
            Object::Null
            | Object::Boolean(_)
            | Object::Integer(_)
            | Object::Real(_)
            | Object::String(_)
            | Object::Name(_) => {}
        }
    }

    /// Replaces every embedded reference with the value returned by `f`.
    pub fn rewrite_references<F>(&mut self, f: &mut F)
    where
        F: FnMut(ObjectId) -> Object,
    {
        match self {
            Object::Reference(id) => *self = f(*id),
            Object::Array(items) => {
                for item in items.iter_mut() {
                    item.rewrite_references(f);
                }
            }
            Object::Dictionary(dict) => {
                for value in dict.values_mut() {
                    value.rewrite_references(f);
                }
            }
            Object::Stream(stream) => {
                for value in stream.dictionary_mut().values_mut() {
                    value.rewrite_references(f);
                }
            }
            Object::Null
            | Object::Boolean(_)
            | Object::Integer(_)
            | Object::Real(_)
            | Object::String(_)
            | Object::Name(_) => {}
        }
    }
}

impl From<bool> for Object {
    fn from(b: bool) -> Self {
        Object::Boolean(b)
    }
}

impl From<i32> for Object {
    fn from(i: i32) -> Self {
        Object::Integer(i as i64)
    }
}

impl From<i64> for Object {
    fn from(i: i64) -> Self {
        Object::Integer(i)
    }
}

impl From<usize> for Object {
    fn from(i: usize) -> Self {
        Object::Integer(i as i64)
    }
}

impl From<f64> for Object {
    fn from(f: f64) -> Self {
        Object::Real(f)
    }
}

impl From<String> for Object {
    fn from(s: String) -> Self {
        Object::String(s.into_bytes())
    }
}

impl From<&str> for Object {
    fn from(s: &str) -> Self {
        Object::String(s.as_bytes().to_vec())
    }
}

impl From<Vec<Object>> for Object {
    fn from(v: Vec<Object>) -> Self {
        Object::Array(v)
    }
}

impl From<Dictionary> for Object {
    fn from(d: Dictionary) -> Self {
        Object::Dictionary(d)
    }
}

impl From<Stream> for Object {
    fn from(s: Stream) -> Self {
        Object::Stream(s)
    }
}

impl From<ObjectId> for Object {
    fn from(id: ObjectId) -> Self {
        Object::Reference(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_id_display() {
        assert_eq!(ObjectId::new(12, 0).to_string(), "12 0 R");
        assert_eq!(ObjectId::new(7, 3).to_string(), "7 3 R");
    }

    #[test]
    fn test_object_id_ordering() {
        let mut ids = vec![
            ObjectId::new(3, 0),
            ObjectId::new(1, 2),
            ObjectId::new(1, 0),
        ];
        ids.sort();
        assert_eq!(
            ids,
            vec![ObjectId::new(1, 0), ObjectId::new(1, 2), ObjectId::new(3, 0)]
        );
    }

    #[test]
    fn test_as_dict_sees_stream_dictionary() {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::name("XObject"));
        let obj = Object::Stream(Stream::with_dictionary(dict, b"data".to_vec()));

        let view = obj.as_dict().unwrap();
        assert_eq!(view.get_type(), Some("XObject"));
        assert!(obj.as_stream().is_some());
    }

    #[test]
    fn test_references_in_document_order() {
        let mut inner = Dictionary::new();
        inner.set("F1", ObjectId::new(5, 0));
        inner.set("F2", ObjectId::new(6, 0));

        let mut dict = Dictionary::new();
        dict.set("Font", inner);
        dict.set(
            "Kids",
            vec![Object::Reference(ObjectId::new(9, 0)), Object::Integer(1)],
        );

        let refs = Object::Dictionary(dict).references();
        assert_eq!(
            refs,
            vec![ObjectId::new(5, 0), ObjectId::new(6, 0), ObjectId::new(9, 0)]
        );
    }

    #[test]
    fn test_stream_dictionary_references_are_collected() {
        let mut dict = Dictionary::new();
        dict.set("Length", ObjectId::new(4, 0));
        let stream = Object::Stream(Stream::with_dictionary(dict, Vec::new()));
        // Stream::with_dictionary normalizes Length to a direct integer
        assert!(stream.references().is_empty());

        let mut dict = Dictionary::new();
        dict.set("SMask", ObjectId::new(8, 0));
        let stream = Object::Stream(Stream::with_dictionary(dict, Vec::new()));
        assert_eq!(stream.references(), vec![ObjectId::new(8, 0)]);
    }

    #[test]
    fn test_rewrite_references() {
        let mut obj = Object::Array(vec![
            Object::Reference(ObjectId::new(1, 0)),
            Object::Reference(ObjectId::new(2, 0)),
            Object::Name("Keep".to_string()),
        ]);

        obj.rewrite_references(&mut |id| {
            if id.number() == 1 {
                Object::Reference(ObjectId::new(10, 0))
            } else {
                Object::Null
            }
        });

        assert_eq!(
            obj,
            Object::Array(vec![
                Object::Reference(ObjectId::new(10, 0)),
                Object::Null,
                Object::Name("Keep".to_string()),
            ])
        );
    }

    #[test]
    fn test_conversions() {
        assert_eq!(Object::from(true), Object::Boolean(true));
        assert_eq!(Object::from(42), Object::Integer(42));
        assert_eq!(Object::from(3usize), Object::Integer(3));
        assert_eq!(Object::from("abc"), Object::String(b"abc".to_vec()));
        assert_eq!(
            Object::from(ObjectId::new(2, 0)),
            Object::Reference(ObjectId::new(2, 0))
        );
        assert_eq!(Object::from(1.5).as_real(), Some(1.5));
        assert_eq!(Object::Integer(2).as_real(), Some(2.0));
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Object::Null.type_name(), "null");
        assert_eq!(Object::name("X").type_name(), "name");
        assert_eq!(
            Object::Reference(ObjectId::new(1, 0)).type_name(),
            "reference"
        );
    }
}
