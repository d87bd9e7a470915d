use std::fmt;

use crate::ecs::{
    entity::Entity,
    error::{Error, Result},
};

/// The type tag of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Bool,
    Int,
    UInt,
    Int64,
    Float,
    Double,
    Float4,
    String,
    Entity,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::UInt => "uint",
            ValueKind::Int64 => "int64",
            ValueKind::Float => "float",
            ValueKind::Double => "double",
            ValueKind::Float4 => "float4",
            ValueKind::String => "string",
            ValueKind::Entity => "entity",
        };
        f.write_str(name)
    }
}

/// A dynamically typed attribute value, used when an attribute is read or written by FourCC or
/// by position rather than through the component's own fields.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i32),
    UInt(u32),
    Int64(i64),
    Float(f32),
    Double(f64),
    Float4([f32; 4]),
    String(String),
    Entity(Entity),
}

impl Value {
    /// Get the type tag of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::UInt(_) => ValueKind::UInt,
            Value::Int64(_) => ValueKind::Int64,
            Value::Float(_) => ValueKind::Float,
            Value::Double(_) => ValueKind::Double,
            Value::Float4(_) => ValueKind::Float4,
            Value::String(_) => ValueKind::String,
            Value::Entity(_) => ValueKind::Entity,
        }
    }
}

/// A Rust type that can be stored in a component attribute and converted to and from a
/// [`Value`].
pub trait Attribute: Sized {
    /// The value kind this type maps to.
    const KIND: ValueKind;

    /// Convert into a dynamic value.
    fn to_value(&self) -> Value;

    /// Convert from a dynamic value, failing with [`Error::AttributeType`] on a kind mismatch.
    fn from_value(value: Value) -> Result<Self>;
}

macro_rules! impl_attribute {
    ($ty:ty, $variant:ident) => {
        impl Attribute for $ty {
            const KIND: ValueKind = ValueKind::$variant;

            #[inline]
            fn to_value(&self) -> Value {
                Value::$variant(self.clone())
            }

            #[inline]
            fn from_value(value: Value) -> Result<Self> {
                match value {
                    Value::$variant(v) => Ok(v),
                    other => Err(Error::AttributeType {
                        expected: ValueKind::$variant,
                        found: other.kind(),
                    }),
                }
            }
        }
    };
}

impl_attribute!(bool, Bool);
impl_attribute!(i32, Int);
impl_attribute!(u32, UInt);
impl_attribute!(i64, Int64);
impl_attribute!(f32, Float);
impl_attribute!(f64, Double);
impl_attribute!([f32; 4], Float4);
impl_attribute!(String, String);
impl_attribute!(Entity, Entity);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_kind_matches_variant() {
        assert_eq!(Value::Float(1.0).kind(), ValueKind::Float);
        assert_eq!(Value::String("a".into()).kind(), ValueKind::String);
        assert_eq!(Value::Entity(Entity::new(1)).kind(), ValueKind::Entity);
        assert_eq!(ValueKind::Float4.to_string(), "float4");
    }

    #[test]
    fn attribute_conversion() {
        // Given
        let range = 25.0f32;

        // When
        let value = range.to_value();

        // Then
        assert_eq!(value, Value::Float(25.0));
        assert_eq!(f32::from_value(value), Ok(25.0));
        assert_eq!(<[f32; 4]>::KIND, ValueKind::Float4);
    }

    #[test]
    fn attribute_conversion_kind_mismatch() {
        // When
        let result = bool::from_value(Value::Int(1));

        // Then
        assert_eq!(
            result,
            Err(Error::AttributeType {
                expected: ValueKind::Bool,
                found: ValueKind::Int,
            })
        );
    }
}
