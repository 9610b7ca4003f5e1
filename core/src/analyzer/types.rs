//! Resolved variable types and struct layouts.
//!
//! A [`VarType`] is the canonical, checker-resolved form of a textual type
//! annotation. All types live in the compilation arena and are referenced by
//! the typed AST; the [`TypeManager`] hands out interned primitives so type
//! identity checks stay cheap.

use core::fmt;

use bumpalo::Bump;

/// A field inside a struct layout. Offsets are running sums of the preceding
/// field sizes; there is no alignment padding.
#[derive(Debug, PartialEq)]
pub struct StructField<'a> {
    pub name: &'a str,
    pub offset: usize,
    pub ty: &'a VarType<'a>,
}

#[derive(Debug, PartialEq)]
pub struct StructLayout<'a> {
    pub name: &'a str,
    pub fields: &'a [StructField<'a>],
    pub size: usize,
}

impl<'a> StructLayout<'a> {
    pub fn field(&self, name: &str) -> Option<&StructField<'a>> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, PartialEq)]
pub enum VarType<'a> {
    Void,
    Bool,
    Char { signed: bool },
    Short { signed: bool },
    Int { signed: bool },
    Long { signed: bool },
    Float,
    Double,
    Str,
    Array { element: &'a VarType<'a> },
    Struct { layout: &'a StructLayout<'a> },
}

impl<'a> VarType<'a> {
    pub fn is_integral(&self) -> bool {
        matches!(
            self,
            VarType::Bool
                | VarType::Char { .. }
                | VarType::Short { .. }
                | VarType::Int { .. }
                | VarType::Long { .. }
        )
    }

    pub fn is_floating(&self) -> bool {
        matches!(self, VarType::Float | VarType::Double)
    }

    pub fn is_signed(&self) -> bool {
        match self {
            VarType::Bool | VarType::Float | VarType::Double => true,
            VarType::Char { signed }
            | VarType::Short { signed }
            | VarType::Int { signed }
            | VarType::Long { signed } => *signed,
            _ => false,
        }
    }

    /// Two types are the same kind when they differ at most in signedness.
    pub fn same_kind(&self, other: &VarType<'a>) -> bool {
        core::mem::discriminant(self) == core::mem::discriminant(other)
    }

    /// Byte size on the VM stack. Strings and arrays are handles.
    pub fn size(&self) -> usize {
        match self {
            VarType::Void => 0,
            VarType::Bool | VarType::Char { .. } => 1,
            VarType::Short { .. } => 2,
            VarType::Int { .. } | VarType::Float => 4,
            VarType::Long { .. } | VarType::Double => 8,
            VarType::Str | VarType::Array { .. } => 8,
            VarType::Struct { layout } => layout.size,
        }
    }
}

impl<'a> fmt::Display for VarType<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = if self.is_integral() && !self.is_signed() {
            "u"
        } else {
            ""
        };

        match self {
            VarType::Void => write!(f, "void"),
            VarType::Bool => write!(f, "bool"),
            VarType::Char { .. } => write!(f, "{}char", prefix),
            VarType::Short { .. } => write!(f, "{}short", prefix),
            VarType::Int { .. } => write!(f, "{}int", prefix),
            VarType::Long { .. } => write!(f, "{}long", prefix),
            VarType::Float => write!(f, "float"),
            VarType::Double => write!(f, "double"),
            VarType::Str => write!(f, "string"),
            VarType::Array { element } => write!(f, "{}[]", element),
            VarType::Struct { layout } => write!(f, "{}", layout.name),
        }
    }
}

/// Arena-backed type factory with interned primitives.
pub struct TypeManager<'a> {
    arena: &'a Bump,
    void: &'a VarType<'a>,
    bool_: &'a VarType<'a>,
    char_: &'a VarType<'a>,
    uchar: &'a VarType<'a>,
    short: &'a VarType<'a>,
    ushort: &'a VarType<'a>,
    int: &'a VarType<'a>,
    uint: &'a VarType<'a>,
    long: &'a VarType<'a>,
    ulong: &'a VarType<'a>,
    float: &'a VarType<'a>,
    double: &'a VarType<'a>,
    string: &'a VarType<'a>,
}

impl<'a> TypeManager<'a> {
    pub fn new(arena: &'a Bump) -> &'a TypeManager<'a> {
        arena.alloc(TypeManager {
            arena,
            void: arena.alloc(VarType::Void),
            bool_: arena.alloc(VarType::Bool),
            char_: arena.alloc(VarType::Char { signed: true }),
            uchar: arena.alloc(VarType::Char { signed: false }),
            short: arena.alloc(VarType::Short { signed: true }),
            ushort: arena.alloc(VarType::Short { signed: false }),
            int: arena.alloc(VarType::Int { signed: true }),
            uint: arena.alloc(VarType::Int { signed: false }),
            long: arena.alloc(VarType::Long { signed: true }),
            ulong: arena.alloc(VarType::Long { signed: false }),
            float: arena.alloc(VarType::Float),
            double: arena.alloc(VarType::Double),
            string: arena.alloc(VarType::Str),
        })
    }

    pub fn void(&self) -> &'a VarType<'a> {
        self.void
    }
    pub fn bool(&self) -> &'a VarType<'a> {
        self.bool_
    }
    pub fn char(&self) -> &'a VarType<'a> {
        self.char_
    }
    pub fn uchar(&self) -> &'a VarType<'a> {
        self.uchar
    }
    pub fn short(&self) -> &'a VarType<'a> {
        self.short
    }
    pub fn ushort(&self) -> &'a VarType<'a> {
        self.ushort
    }
    pub fn int(&self) -> &'a VarType<'a> {
        self.int
    }
    pub fn uint(&self) -> &'a VarType<'a> {
        self.uint
    }
    pub fn long(&self) -> &'a VarType<'a> {
        self.long
    }
    pub fn ulong(&self) -> &'a VarType<'a> {
        self.ulong
    }
    pub fn float(&self) -> &'a VarType<'a> {
        self.float
    }
    pub fn double(&self) -> &'a VarType<'a> {
        self.double
    }
    pub fn string(&self) -> &'a VarType<'a> {
        self.string
    }

    /// Resolve a primitive type name, `None` for unknown names.
    pub fn primitive(&self, name: &str) -> Option<&'a VarType<'a>> {
        Some(match name {
            "void" => self.void,
            "bool" => self.bool_,
            "char" => self.char_,
            "uchar" => self.uchar,
            "short" => self.short,
            "ushort" => self.ushort,
            "int" => self.int,
            "uint" => self.uint,
            "long" => self.long,
            "ulong" => self.ulong,
            "float" => self.float,
            "double" => self.double,
            "string" => self.string,
            _ => return None,
        })
    }

    pub fn array(&self, element: &'a VarType<'a>) -> &'a VarType<'a> {
        debug_assert!(!matches!(element, VarType::Void), "array of void");
        self.arena.alloc(VarType::Array { element })
    }

    pub fn strukt(&self, layout: &'a StructLayout<'a>) -> &'a VarType<'a> {
        self.arena.alloc(VarType::Struct { layout })
    }
}
