//! Constant pool
//!
//! The pool is 1-indexed; `Long` and `Double` entries occupy two indices.
//! Entries are deduplicated so interning the same constant twice returns the
//! same index.

use crate::encoder::{
    decode_modified_utf8, encode_modified_utf8, BytecodeReader, BytecodeWriter, DecodeError,
};
use rustc_hash::FxHashMap;
use thiserror::Error;

/// Tag bytes of the supported constant kinds
pub mod tags {
    /// CONSTANT_Utf8
    pub const UTF8: u8 = 1;
    /// CONSTANT_Integer
    pub const INTEGER: u8 = 3;
    /// CONSTANT_Float
    pub const FLOAT: u8 = 4;
    /// CONSTANT_Long
    pub const LONG: u8 = 5;
    /// CONSTANT_Double
    pub const DOUBLE: u8 = 6;
    /// CONSTANT_Class
    pub const CLASS: u8 = 7;
    /// CONSTANT_String
    pub const STRING: u8 = 8;
    /// CONSTANT_Fieldref
    pub const FIELDREF: u8 = 9;
    /// CONSTANT_Methodref
    pub const METHODREF: u8 = 10;
    /// CONSTANT_InterfaceMethodref
    pub const INTERFACE_METHODREF: u8 = 11;
    /// CONSTANT_NameAndType
    pub const NAME_AND_TYPE: u8 = 12;
}

/// Constant pool errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConstantPoolError {
    /// More than 65535 pool slots would be needed
    #[error("Constant pool overflow: more than 65535 entries")]
    Overflow,

    /// A UTF-8 constant longer than 65535 encoded bytes
    #[error("String constant too long: {0} bytes")]
    StringTooLong(usize),

    /// Unknown tag while decoding
    #[error("Unknown constant pool tag {tag} at index {index}")]
    UnknownTag {
        /// Tag byte
        tag: u8,
        /// Pool index
        index: u16,
    },

    /// Decode error
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),
}

/// A single constant pool entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constant {
    /// Modified UTF-8 text
    Utf8(String),
    /// 32-bit int
    Integer(i32),
    /// 32-bit float, stored as raw bits so that entries hash and compare exactly
    Float(u32),
    /// 64-bit long
    Long(i64),
    /// 64-bit double, stored as raw bits
    Double(u64),
    /// Class by Utf8 name index
    Class(u16),
    /// String by Utf8 index
    String(u16),
    /// Field reference
    Fieldref {
        /// Class index
        class: u16,
        /// NameAndType index
        name_and_type: u16,
    },
    /// Class method reference
    Methodref {
        /// Class index
        class: u16,
        /// NameAndType index
        name_and_type: u16,
    },
    /// Interface method reference
    InterfaceMethodref {
        /// Class index
        class: u16,
        /// NameAndType index
        name_and_type: u16,
    },
    /// Name and descriptor pair
    NameAndType {
        /// Utf8 name index
        name: u16,
        /// Utf8 descriptor index
        descriptor: u16,
    },
}

impl Constant {
    /// Tag byte for this entry
    pub fn tag(&self) -> u8 {
        match self {
            Constant::Utf8(_) => tags::UTF8,
            Constant::Integer(_) => tags::INTEGER,
            Constant::Float(_) => tags::FLOAT,
            Constant::Long(_) => tags::LONG,
            Constant::Double(_) => tags::DOUBLE,
            Constant::Class(_) => tags::CLASS,
            Constant::String(_) => tags::STRING,
            Constant::Fieldref { .. } => tags::FIELDREF,
            Constant::Methodref { .. } => tags::METHODREF,
            Constant::InterfaceMethodref { .. } => tags::INTERFACE_METHODREF,
            Constant::NameAndType { .. } => tags::NAME_AND_TYPE,
        }
    }

    /// Number of pool indices this entry occupies
    pub fn width(&self) -> u16 {
        match self {
            Constant::Long(_) | Constant::Double(_) => 2,
            _ => 1,
        }
    }
}

/// A resolved field or method reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRef<'a> {
    /// Internal name of the owning class
    pub owner: &'a str,
    /// Member name
    pub name: &'a str,
    /// Member descriptor
    pub descriptor: &'a str,
}

/// Deduplicating constant pool
#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    /// Slot `i` holds the entry at pool index `i + 1`; the second half of a
    /// wide entry is `None`
    entries: Vec<Option<Constant>>,
    lookup: FxHashMap<Constant, u16>,
}

impl ConstantPool {
    /// Create an empty pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Value written as `constant_pool_count` (one past the last index)
    pub fn count(&self) -> u16 {
        // entries.len() never exceeds 65534
        self.entries.len() as u16 + 1
    }

    /// Whether the pool has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at `index`
    pub fn get(&self, index: u16) -> Option<&Constant> {
        if index == 0 {
            return None;
        }
        self.entries.get(index as usize - 1)?.as_ref()
    }

    /// Iterate `(index, entry)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (u16, &Constant)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.as_ref().map(|c| (i as u16 + 1, c)))
    }

    /// Index of an existing entry
    pub fn find(&self, constant: &Constant) -> Option<u16> {
        self.lookup.get(constant).copied()
    }

    /// Index of an existing Utf8 entry
    pub fn find_utf8(&self, value: &str) -> Option<u16> {
        self.find(&Constant::Utf8(value.to_string()))
    }

    /// Add an entry, reusing an identical one if present
    pub fn add(&mut self, constant: Constant) -> Result<u16, ConstantPoolError> {
        if let Some(&index) = self.lookup.get(&constant) {
            return Ok(index);
        }
        let index = self.push_raw(constant.clone())?;
        self.lookup.insert(constant, index);
        Ok(index)
    }

    fn push_raw(&mut self, constant: Constant) -> Result<u16, ConstantPoolError> {
        let width = constant.width() as usize;
        if self.entries.len() + width > u16::MAX as usize - 1 {
            return Err(ConstantPoolError::Overflow);
        }
        let index = self.entries.len() as u16 + 1;
        self.entries.push(Some(constant));
        if width == 2 {
            self.entries.push(None);
        }
        Ok(index)
    }

    // ===== Interning =====

    /// Intern a Utf8 entry
    pub fn utf8(&mut self, value: &str) -> Result<u16, ConstantPoolError> {
        let encoded = encode_modified_utf8(value).len();
        if encoded > u16::MAX as usize {
            return Err(ConstantPoolError::StringTooLong(encoded));
        }
        self.add(Constant::Utf8(value.to_string()))
    }

    /// Intern an Integer entry
    pub fn integer(&mut self, value: i32) -> Result<u16, ConstantPoolError> {
        self.add(Constant::Integer(value))
    }

    /// Intern a Float entry
    pub fn float(&mut self, value: f32) -> Result<u16, ConstantPoolError> {
        self.add(Constant::Float(value.to_bits()))
    }

    /// Intern a Long entry
    pub fn long(&mut self, value: i64) -> Result<u16, ConstantPoolError> {
        self.add(Constant::Long(value))
    }

    /// Intern a Double entry
    pub fn double(&mut self, value: f64) -> Result<u16, ConstantPoolError> {
        self.add(Constant::Double(value.to_bits()))
    }

    /// Intern a Class entry by internal name
    pub fn class(&mut self, name: &str) -> Result<u16, ConstantPoolError> {
        let name = self.utf8(name)?;
        self.add(Constant::Class(name))
    }

    /// Intern a String entry
    pub fn string(&mut self, value: &str) -> Result<u16, ConstantPoolError> {
        let utf8 = self.utf8(value)?;
        self.add(Constant::String(utf8))
    }

    /// Intern a NameAndType entry
    pub fn name_and_type(&mut self, name: &str, descriptor: &str) -> Result<u16, ConstantPoolError> {
        let name = self.utf8(name)?;
        let descriptor = self.utf8(descriptor)?;
        self.add(Constant::NameAndType { name, descriptor })
    }

    /// Intern a Fieldref entry
    pub fn field_ref(
        &mut self,
        owner: &str,
        name: &str,
        descriptor: &str,
    ) -> Result<u16, ConstantPoolError> {
        let class = self.class(owner)?;
        let name_and_type = self.name_and_type(name, descriptor)?;
        self.add(Constant::Fieldref { class, name_and_type })
    }

    /// Intern a Methodref entry
    pub fn method_ref(
        &mut self,
        owner: &str,
        name: &str,
        descriptor: &str,
    ) -> Result<u16, ConstantPoolError> {
        let class = self.class(owner)?;
        let name_and_type = self.name_and_type(name, descriptor)?;
        self.add(Constant::Methodref { class, name_and_type })
    }

    /// Intern an InterfaceMethodref entry
    pub fn interface_method_ref(
        &mut self,
        owner: &str,
        name: &str,
        descriptor: &str,
    ) -> Result<u16, ConstantPoolError> {
        let class = self.class(owner)?;
        let name_and_type = self.name_and_type(name, descriptor)?;
        self.add(Constant::InterfaceMethodref { class, name_and_type })
    }

    // ===== Resolution =====

    /// Text of a Utf8 entry
    pub fn get_utf8(&self, index: u16) -> Option<&str> {
        match self.get(index)? {
            Constant::Utf8(s) => Some(s),
            _ => None,
        }
    }

    /// Internal name of a Class entry
    pub fn class_name(&self, index: u16) -> Option<&str> {
        match self.get(index)? {
            Constant::Class(name) => self.get_utf8(*name),
            _ => None,
        }
    }

    /// Text of a String entry
    pub fn get_string(&self, index: u16) -> Option<&str> {
        match self.get(index)? {
            Constant::String(utf8) => self.get_utf8(*utf8),
            _ => None,
        }
    }

    /// Resolve a Fieldref, Methodref or InterfaceMethodref
    pub fn member_ref(&self, index: u16) -> Option<MemberRef<'_>> {
        let (class, nat) = match self.get(index)? {
            Constant::Fieldref { class, name_and_type }
            | Constant::Methodref { class, name_and_type }
            | Constant::InterfaceMethodref { class, name_and_type } => (*class, *name_and_type),
            _ => return None,
        };
        let (name, descriptor) = match self.get(nat)? {
            Constant::NameAndType { name, descriptor } => (*name, *descriptor),
            _ => return None,
        };
        Some(MemberRef {
            owner: self.class_name(class)?,
            name: self.get_utf8(name)?,
            descriptor: self.get_utf8(descriptor)?,
        })
    }

    // ===== Binary form =====

    /// Encode `constant_pool_count` followed by every entry
    pub fn encode(&self, writer: &mut BytecodeWriter) {
        writer.emit_u16(self.count());
        for (_, constant) in self.iter() {
            writer.emit_u8(constant.tag());
            match constant {
                Constant::Utf8(s) => {
                    let bytes = encode_modified_utf8(s);
                    writer.emit_u16(bytes.len() as u16);
                    writer.emit_bytes(&bytes);
                }
                Constant::Integer(v) => writer.emit_i32(*v),
                Constant::Float(bits) => writer.emit_u32(*bits),
                Constant::Long(v) => writer.emit_i64(*v),
                Constant::Double(bits) => writer.emit_bytes(&bits.to_be_bytes()),
                Constant::Class(i) | Constant::String(i) => writer.emit_u16(*i),
                Constant::Fieldref { class, name_and_type }
                | Constant::Methodref { class, name_and_type }
                | Constant::InterfaceMethodref { class, name_and_type } => {
                    writer.emit_u16(*class);
                    writer.emit_u16(*name_and_type);
                }
                Constant::NameAndType { name, descriptor } => {
                    writer.emit_u16(*name);
                    writer.emit_u16(*descriptor);
                }
            }
        }
    }

    /// Decode a pool starting at `constant_pool_count`
    pub fn decode(reader: &mut BytecodeReader<'_>) -> Result<Self, ConstantPoolError> {
        let count = reader.read_u16()?;
        let mut pool = ConstantPool::new();
        let mut index = 1u16;
        while index < count {
            let tag = reader.read_u8()?;
            let constant = match tag {
                tags::UTF8 => {
                    let len = reader.read_u16()? as usize;
                    let start = reader.position();
                    let bytes = reader.read_bytes(len)?;
                    Constant::Utf8(decode_modified_utf8(&bytes, start)?)
                }
                tags::INTEGER => Constant::Integer(reader.read_i32()?),
                tags::FLOAT => Constant::Float(reader.read_u32()?),
                tags::LONG => Constant::Long(reader.read_i64()?),
                tags::DOUBLE => Constant::Double(reader.read_i64()? as u64),
                tags::CLASS => Constant::Class(reader.read_u16()?),
                tags::STRING => Constant::String(reader.read_u16()?),
                tags::FIELDREF | tags::METHODREF | tags::INTERFACE_METHODREF => {
                    let class = reader.read_u16()?;
                    let name_and_type = reader.read_u16()?;
                    match tag {
                        tags::FIELDREF => Constant::Fieldref { class, name_and_type },
                        tags::METHODREF => Constant::Methodref { class, name_and_type },
                        _ => Constant::InterfaceMethodref { class, name_and_type },
                    }
                }
                tags::NAME_AND_TYPE => Constant::NameAndType {
                    name: reader.read_u16()?,
                    descriptor: reader.read_u16()?,
                },
                _ => return Err(ConstantPoolError::UnknownTag { tag, index }),
            };
            index += constant.width();
            // Decoded pools keep their layout even if the input had duplicates
            let added = pool.push_raw(constant.clone())?;
            pool.lookup.entry(constant).or_insert(added);
        }
        Ok(pool)
    }
}
