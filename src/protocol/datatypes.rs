//! Constructors and accessors for `Scalar` / `Any` values.

use crate::protocol::messages::{Any, AnyType, Array, Scalar, ScalarString, ScalarType};

impl Scalar {
    fn empty(ty: ScalarType) -> Self {
        Scalar {
            r#type: ty as i32,
            ..Default::default()
        }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Scalar {
            v_string: Some(ScalarString {
                value: value.into().into_bytes(),
                collation: None,
            }),
            ..Scalar::empty(ScalarType::VString)
        }
    }

    pub fn uint(value: u64) -> Self {
        Scalar {
            v_unsigned_int: Some(value),
            ..Scalar::empty(ScalarType::VUint)
        }
    }

    pub fn bool(value: bool) -> Self {
        Scalar {
            v_bool: Some(value),
            ..Scalar::empty(ScalarType::VBool)
        }
    }

    pub fn scalar_type(&self) -> Option<ScalarType> {
        ScalarType::try_from(self.r#type).ok()
    }

    /// Returns the string payload if this is a valid UTF-8 `V_STRING`.
    pub fn as_str(&self) -> Option<&str> {
        match self.scalar_type()? {
            ScalarType::VString => std::str::from_utf8(&self.v_string.as_ref()?.value).ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.scalar_type()? {
            ScalarType::VBool => self.v_bool,
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<u64> {
        match self.scalar_type()? {
            ScalarType::VUint => self.v_unsigned_int,
            _ => None,
        }
    }
}

impl Any {
    pub fn scalar(scalar: Scalar) -> Self {
        Any {
            r#type: AnyType::Scalar as i32,
            scalar: Some(scalar),
            array: None,
        }
    }

    pub fn array(values: Vec<Any>) -> Self {
        Any {
            r#type: AnyType::Array as i32,
            scalar: None,
            array: Some(Array { value: values }),
        }
    }

    pub fn any_type(&self) -> Option<AnyType> {
        AnyType::try_from(self.r#type).ok()
    }
}
