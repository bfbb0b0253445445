//! Signature keys
//!
//! Native methods are named by a deterministic string built from the
//! method's return type, name and parameter types:
//!
//! ```text
//! key    = ret "$" name "$" params
//! params = codes joined by "$", or "$" when there are none
//!
//! V Z B S C I J F D          primitive codes
//! L<name with . -> $>$        reference type
//! $<element code>             array type
//! ```
//!
//! Constructors are named `$init$`, so the zero-argument constructor key is
//! `V$$init$$$`. Keys are only ever built, never parsed.

use std::fmt;

/// Name of the instance initializer after mangling
pub const CONSTRUCTOR_NAME: &str = "$init$";

/// Key of the zero-argument instance initializer
pub const DEFAULT_CONSTRUCTOR_KEY: &str = "V$$init$$$";

/// A single type in a method signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeCode {
    /// `V`
    Void,
    /// `Z`
    Boolean,
    /// `B`
    Byte,
    /// `S`
    Short,
    /// `C`
    Char,
    /// `I`
    Int,
    /// `J`
    Long,
    /// `F`
    Float,
    /// `D`
    Double,
    /// Reference type by fully qualified dotted name
    Object(String),
    /// Array of the element type
    Array(Box<TypeCode>),
}

impl TypeCode {
    /// Reference type from a dotted name such as `java.lang.String`
    pub fn object(name: impl Into<String>) -> Self {
        TypeCode::Object(name.into())
    }

    /// Array of `element`
    pub fn array(element: TypeCode) -> Self {
        TypeCode::Array(Box::new(element))
    }

    /// Shorthand for `java.lang.String`
    pub fn string() -> Self {
        TypeCode::object("java.lang.String")
    }

    /// Append this type's code to `out`
    pub fn write_code(&self, out: &mut String) {
        match self {
            TypeCode::Void => out.push('V'),
            TypeCode::Boolean => out.push('Z'),
            TypeCode::Byte => out.push('B'),
            TypeCode::Short => out.push('S'),
            TypeCode::Char => out.push('C'),
            TypeCode::Int => out.push('I'),
            TypeCode::Long => out.push('J'),
            TypeCode::Float => out.push('F'),
            TypeCode::Double => out.push('D'),
            TypeCode::Object(name) => {
                out.push('L');
                out.extend(name.chars().map(|c| if c == '.' { '$' } else { c }));
                out.push('$');
            }
            TypeCode::Array(element) => {
                out.push('$');
                element.write_code(out);
            }
        }
    }

    /// This type's code as an owned string
    pub fn code(&self) -> String {
        let mut out = String::new();
        self.write_code(&mut out);
        out
    }
}

/// Mangle a method name for use in a key (`<init>` becomes `$init$`).
pub fn mangle_name(name: &str) -> String {
    match name {
        "<init>" => CONSTRUCTOR_NAME.to_string(),
        "<clinit>" => "$clinit$".to_string(),
        other => other.to_string(),
    }
}

/// A typed method signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    name: String,
    ret: TypeCode,
    params: Vec<TypeCode>,
}

impl Signature {
    /// Create a signature
    pub fn new(name: impl Into<String>, ret: TypeCode, params: Vec<TypeCode>) -> Self {
        Self {
            name: mangle_name(&name.into()),
            ret,
            params,
        }
    }

    /// Constructor signature with the given parameters
    pub fn constructor(params: Vec<TypeCode>) -> Self {
        Self::new("<init>", TypeCode::Void, params)
    }

    /// Mangled method name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return type
    pub fn return_type(&self) -> &TypeCode {
        &self.ret
    }

    /// Parameter types
    pub fn params(&self) -> &[TypeCode] {
        &self.params
    }

    /// Build the signature key
    pub fn key(&self) -> String {
        let mut out = String::with_capacity(16 + self.name.len());
        self.ret.write_code(&mut out);
        out.push('$');
        out.push_str(&self.name);
        out.push('$');
        if self.params.is_empty() {
            out.push('$');
        } else {
            for (i, param) in self.params.iter().enumerate() {
                if i > 0 {
                    out.push('$');
                }
                param.write_code(&mut out);
            }
        }
        out
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_params() {
        let sig = Signature::new("min", TypeCode::Int, vec![TypeCode::Int, TypeCode::Int]);
        assert_eq!(sig.key(), "I$min$I$I");
    }

    #[test]
    fn test_no_params() {
        let sig = Signature::new("length", TypeCode::Int, vec![]);
        assert_eq!(sig.key(), "I$length$$");
    }

    #[test]
    fn test_reference_return() {
        let sig = Signature::new("getClass", TypeCode::object("java.lang.Class"), vec![]);
        assert_eq!(sig.key(), "Ljava$lang$Class$$getClass$$");
    }

    #[test]
    fn test_array_types() {
        let sig = Signature::new("toCharArray", TypeCode::array(TypeCode::Char), vec![]);
        assert_eq!(sig.key(), "$C$toCharArray$$");

        let sig = Signature::new(
            "readBytes",
            TypeCode::Int,
            vec![TypeCode::array(TypeCode::Byte), TypeCode::Int, TypeCode::Int],
        );
        assert_eq!(sig.key(), "I$readBytes$$B$I$I");
    }

    #[test]
    fn test_mixed_params() {
        let sig = Signature::new(
            "parseInt",
            TypeCode::Int,
            vec![TypeCode::string(), TypeCode::Int],
        );
        assert_eq!(sig.key(), "I$parseInt$Ljava$lang$String$$I");
    }

    #[test]
    fn test_constructor_key() {
        assert_eq!(Signature::constructor(vec![]).key(), DEFAULT_CONSTRUCTOR_KEY);
        assert_eq!(
            Signature::constructor(vec![TypeCode::Int]).key(),
            "V$$init$$I"
        );
    }

    #[test]
    fn test_overloads_differ() {
        let a = Signature::new("isNaN", TypeCode::Boolean, vec![TypeCode::Double]);
        let b = Signature::new("isNaN", TypeCode::Boolean, vec![TypeCode::Float]);
        assert_ne!(a.key(), b.key());
        assert_eq!(a.to_string(), "Z$isNaN$D");
    }
}
