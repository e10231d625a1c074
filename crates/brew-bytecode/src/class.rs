//! Class file format

use crate::constants::{ConstantPool, ConstantPoolError};
use crate::encoder::{BytecodeReader, BytecodeWriter, DecodeError};
use thiserror::Error;

/// Magic number for class files
pub const MAGIC: u32 = 0xCAFE_BABE;

/// Default major version (Java 5, the last without mandatory stack map frames)
pub const DEFAULT_MAJOR_VERSION: u16 = 49;

/// Largest code array the format allows
pub const MAX_CODE_LENGTH: usize = 65535;

/// Access flags
pub mod access {
    /// Visible everywhere
    pub const ACC_PUBLIC: u16 = 0x0001;
    /// Visible only inside the class
    pub const ACC_PRIVATE: u16 = 0x0002;
    /// Visible to subclasses and the package
    pub const ACC_PROTECTED: u16 = 0x0004;
    /// Class-level member
    pub const ACC_STATIC: u16 = 0x0008;
    /// Not overridable or reassignable
    pub const ACC_FINAL: u16 = 0x0010;
    /// Modern `invokespecial` semantics (classes)
    pub const ACC_SUPER: u16 = 0x0020;
    /// Synchronized method
    pub const ACC_SYNCHRONIZED: u16 = 0x0020;
    /// Volatile field
    pub const ACC_VOLATILE: u16 = 0x0040;
    /// Transient field
    pub const ACC_TRANSIENT: u16 = 0x0080;
    /// Native method
    pub const ACC_NATIVE: u16 = 0x0100;
    /// Interface type
    pub const ACC_INTERFACE: u16 = 0x0200;
    /// Abstract class or method
    pub const ACC_ABSTRACT: u16 = 0x0400;
    /// Compiler-generated
    pub const ACC_SYNTHETIC: u16 = 0x1000;
}

/// Class file encoding/decoding errors
#[derive(Debug, Error)]
pub enum ClassFileError {
    /// Decode error
    #[error("Decode error: {0}")]
    DecodeError(#[from] DecodeError),

    /// Constant pool error
    #[error("Constant pool error: {0}")]
    ConstantPool(#[from] ConstantPoolError),

    /// Invalid magic number
    #[error("Invalid magic number: expected 0xCAFEBABE, got {0:#010x}")]
    InvalidMagic(u32),

    /// Pool index that does not name the expected kind of entry
    #[error("Bad constant pool reference {index} for {what}")]
    BadConstant {
        /// Index
        index: u16,
        /// What the reference was used for
        what: &'static str,
    },

    /// Code array too long
    #[error("Code of {method} is {length} bytes (limit 65535)")]
    CodeTooLarge {
        /// Method name
        method: String,
        /// Code length
        length: usize,
    },

    /// Trailing bytes after the class structure
    #[error("Unexpected {0} trailing bytes")]
    TrailingBytes(usize),
}

/// Raw attribute
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    /// Utf8 index of the attribute name
    pub name_index: u16,
    /// Attribute payload
    pub info: Vec<u8>,
}

impl Attribute {
    fn encode(&self, writer: &mut BytecodeWriter) {
        writer.emit_u16(self.name_index);
        writer.emit_u32(self.info.len() as u32);
        writer.emit_bytes(&self.info);
    }

    fn decode(reader: &mut BytecodeReader<'_>) -> Result<Self, DecodeError> {
        let name_index = reader.read_u16()?;
        let len = reader.read_u32()? as usize;
        let info = reader.read_bytes(len)?;
        Ok(Self { name_index, info })
    }
}

fn encode_attributes(attributes: &[Attribute], writer: &mut BytecodeWriter) {
    writer.emit_u16(attributes.len() as u16);
    for attr in attributes {
        attr.encode(writer);
    }
}

fn decode_attributes(reader: &mut BytecodeReader<'_>) -> Result<Vec<Attribute>, DecodeError> {
    let count = reader.read_u16()?;
    (0..count).map(|_| Attribute::decode(reader)).collect()
}

/// Exception table entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionHandler {
    /// Start of the protected range
    pub start_pc: u16,
    /// End of the protected range (exclusive)
    pub end_pc: u16,
    /// Handler offset
    pub handler_pc: u16,
    /// Class index of the caught type, 0 for any
    pub catch_type: u16,
}

/// `Code` attribute
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Code {
    /// Maximum operand stack depth in slots
    pub max_stack: u16,
    /// Number of local variable slots
    pub max_locals: u16,
    /// Bytecode
    pub code: Vec<u8>,
    /// Exception handlers
    pub exception_table: Vec<ExceptionHandler>,
    /// Nested attributes
    pub attributes: Vec<Attribute>,
}

impl Code {
    fn to_attribute_info(&self) -> Vec<u8> {
        let mut writer = BytecodeWriter::with_capacity(self.code.len() + 12);
        writer.emit_u16(self.max_stack);
        writer.emit_u16(self.max_locals);
        writer.emit_u32(self.code.len() as u32);
        writer.emit_bytes(&self.code);
        writer.emit_u16(self.exception_table.len() as u16);
        for handler in &self.exception_table {
            writer.emit_u16(handler.start_pc);
            writer.emit_u16(handler.end_pc);
            writer.emit_u16(handler.handler_pc);
            writer.emit_u16(handler.catch_type);
        }
        encode_attributes(&self.attributes, &mut writer);
        writer.into_bytes()
    }

    fn from_attribute_info(info: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = BytecodeReader::new(info);
        let max_stack = reader.read_u16()?;
        let max_locals = reader.read_u16()?;
        let len = reader.read_u32()? as usize;
        let code = reader.read_bytes(len)?;
        let handlers = reader.read_u16()?;
        let mut exception_table = Vec::with_capacity(handlers as usize);
        for _ in 0..handlers {
            exception_table.push(ExceptionHandler {
                start_pc: reader.read_u16()?,
                end_pc: reader.read_u16()?,
                handler_pc: reader.read_u16()?,
                catch_type: reader.read_u16()?,
            });
        }
        let attributes = decode_attributes(&mut reader)?;
        Ok(Self {
            max_stack,
            max_locals,
            code,
            exception_table,
            attributes,
        })
    }
}

/// Field definition
#[derive(Debug, Clone, PartialEq)]
pub struct FieldInfo {
    /// Access flags
    pub access_flags: u16,
    /// Utf8 index of the name
    pub name_index: u16,
    /// Utf8 index of the descriptor
    pub descriptor_index: u16,
    /// Attributes
    pub attributes: Vec<Attribute>,
}

/// Method definition
#[derive(Debug, Clone, PartialEq)]
pub struct MethodInfo {
    /// Access flags
    pub access_flags: u16,
    /// Utf8 index of the name
    pub name_index: u16,
    /// Utf8 index of the descriptor
    pub descriptor_index: u16,
    /// Parsed `Code` attribute, absent for abstract and native methods
    pub code: Option<Code>,
    /// Other attributes
    pub attributes: Vec<Attribute>,
}

/// A complete class file
#[derive(Debug, Clone)]
pub struct ClassFile {
    /// Minor version
    pub minor_version: u16,
    /// Major version
    pub major_version: u16,
    /// Constant pool
    pub constant_pool: ConstantPool,
    /// Class access flags
    pub access_flags: u16,
    /// Class index of this class
    pub this_class: u16,
    /// Class index of the superclass
    pub super_class: u16,
    /// Class indices of implemented interfaces
    pub interfaces: Vec<u16>,
    /// Fields
    pub fields: Vec<FieldInfo>,
    /// Methods
    pub methods: Vec<MethodInfo>,
    /// Class attributes
    pub attributes: Vec<Attribute>,
}

impl ClassFile {
    /// Create a class with an empty body
    pub fn new(
        name: &str,
        super_name: &str,
        access_flags: u16,
    ) -> Result<Self, ClassFileError> {
        let mut constant_pool = ConstantPool::new();
        let this_class = constant_pool.class(name)?;
        let super_class = constant_pool.class(super_name)?;
        Ok(Self {
            minor_version: 0,
            major_version: DEFAULT_MAJOR_VERSION,
            constant_pool,
            access_flags,
            this_class,
            super_class,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            attributes: Vec::new(),
        })
    }

    /// Add an implemented interface
    pub fn add_interface(&mut self, name: &str) -> Result<(), ClassFileError> {
        let index = self.constant_pool.class(name)?;
        if !self.interfaces.contains(&index) {
            self.interfaces.push(index);
        }
        Ok(())
    }

    /// Add a field
    pub fn add_field(
        &mut self,
        access_flags: u16,
        name: &str,
        descriptor: &str,
    ) -> Result<(), ClassFileError> {
        let name_index = self.constant_pool.utf8(name)?;
        let descriptor_index = self.constant_pool.utf8(descriptor)?;
        self.fields.push(FieldInfo {
            access_flags,
            name_index,
            descriptor_index,
            attributes: Vec::new(),
        });
        Ok(())
    }

    /// Add a method
    pub fn add_method(
        &mut self,
        access_flags: u16,
        name: &str,
        descriptor: &str,
        code: Option<Code>,
    ) -> Result<(), ClassFileError> {
        if let Some(code) = &code {
            if code.code.len() > MAX_CODE_LENGTH {
                return Err(ClassFileError::CodeTooLarge {
                    method: name.to_string(),
                    length: code.code.len(),
                });
            }
            self.constant_pool.utf8("Code")?;
        }
        let name_index = self.constant_pool.utf8(name)?;
        let descriptor_index = self.constant_pool.utf8(descriptor)?;
        self.methods.push(MethodInfo {
            access_flags,
            name_index,
            descriptor_index,
            code,
            attributes: Vec::new(),
        });
        Ok(())
    }

    // ===== Lookup =====

    /// Internal name of this class
    pub fn name(&self) -> Option<&str> {
        self.constant_pool.class_name(self.this_class)
    }

    /// Internal name of the superclass
    pub fn super_name(&self) -> Option<&str> {
        self.constant_pool.class_name(self.super_class)
    }

    /// Internal names of implemented interfaces
    pub fn interface_names(&self) -> Vec<&str> {
        self.interfaces
            .iter()
            .filter_map(|&i| self.constant_pool.class_name(i))
            .collect()
    }

    /// Name of a method
    pub fn method_name(&self, method: &MethodInfo) -> Option<&str> {
        self.constant_pool.get_utf8(method.name_index)
    }

    /// Descriptor of a method
    pub fn method_descriptor(&self, method: &MethodInfo) -> Option<&str> {
        self.constant_pool.get_utf8(method.descriptor_index)
    }

    /// Find a method by name and descriptor
    pub fn find_method(&self, name: &str, descriptor: &str) -> Option<&MethodInfo> {
        self.methods.iter().find(|m| {
            self.method_name(m) == Some(name) && self.method_descriptor(m) == Some(descriptor)
        })
    }

    /// Find methods by name (all overloads)
    pub fn methods_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a MethodInfo> {
        self.methods
            .iter()
            .filter(move |m| self.method_name(m) == Some(name))
    }

    /// Name and descriptor of a field
    pub fn field_signature(&self, field: &FieldInfo) -> Option<(&str, &str)> {
        Some((
            self.constant_pool.get_utf8(field.name_index)?,
            self.constant_pool.get_utf8(field.descriptor_index)?,
        ))
    }

    // ===== Binary form =====

    /// Encode to class file bytes
    pub fn encode(&self) -> Result<Vec<u8>, ClassFileError> {
        let code_name = if self.methods.iter().any(|m| m.code.is_some()) {
            Some(
                self.constant_pool
                    .find_utf8("Code")
                    .ok_or(ClassFileError::BadConstant {
                        index: 0,
                        what: "Code attribute name",
                    })?,
            )
        } else {
            None
        };

        let mut writer = BytecodeWriter::new();
        writer.emit_u32(MAGIC);
        writer.emit_u16(self.minor_version);
        writer.emit_u16(self.major_version);
        self.constant_pool.encode(&mut writer);
        writer.emit_u16(self.access_flags);
        writer.emit_u16(self.this_class);
        writer.emit_u16(self.super_class);

        writer.emit_u16(self.interfaces.len() as u16);
        for &interface in &self.interfaces {
            writer.emit_u16(interface);
        }

        writer.emit_u16(self.fields.len() as u16);
        for field in &self.fields {
            writer.emit_u16(field.access_flags);
            writer.emit_u16(field.name_index);
            writer.emit_u16(field.descriptor_index);
            encode_attributes(&field.attributes, &mut writer);
        }

        writer.emit_u16(self.methods.len() as u16);
        for method in &self.methods {
            writer.emit_u16(method.access_flags);
            writer.emit_u16(method.name_index);
            writer.emit_u16(method.descriptor_index);
            let extra = method.code.is_some() as u16;
            writer.emit_u16(method.attributes.len() as u16 + extra);
            if let (Some(code), Some(name_index)) = (&method.code, code_name) {
                Attribute {
                    name_index,
                    info: code.to_attribute_info(),
                }
                .encode(&mut writer);
            }
            for attr in &method.attributes {
                attr.encode(&mut writer);
            }
        }

        encode_attributes(&self.attributes, &mut writer);
        Ok(writer.into_bytes())
    }

    /// Decode class file bytes
    pub fn decode(data: &[u8]) -> Result<Self, ClassFileError> {
        let mut reader = BytecodeReader::new(data);

        let magic = reader.read_u32()?;
        if magic != MAGIC {
            return Err(ClassFileError::InvalidMagic(magic));
        }
        let minor_version = reader.read_u16()?;
        let major_version = reader.read_u16()?;
        let constant_pool = ConstantPool::decode(&mut reader)?;
        let access_flags = reader.read_u16()?;
        let this_class = reader.read_u16()?;
        let super_class = reader.read_u16()?;

        let interface_count = reader.read_u16()?;
        let mut interfaces = Vec::with_capacity(interface_count as usize);
        for _ in 0..interface_count {
            interfaces.push(reader.read_u16()?);
        }

        let field_count = reader.read_u16()?;
        let mut fields = Vec::with_capacity(field_count as usize);
        for _ in 0..field_count {
            fields.push(FieldInfo {
                access_flags: reader.read_u16()?,
                name_index: reader.read_u16()?,
                descriptor_index: reader.read_u16()?,
                attributes: decode_attributes(&mut reader)?,
            });
        }

        let method_count = reader.read_u16()?;
        let mut methods = Vec::with_capacity(method_count as usize);
        for _ in 0..method_count {
            let access_flags = reader.read_u16()?;
            let name_index = reader.read_u16()?;
            let descriptor_index = reader.read_u16()?;
            let mut code = None;
            let mut attributes = Vec::new();
            for attr in decode_attributes(&mut reader)? {
                if constant_pool.get_utf8(attr.name_index) == Some("Code") {
                    code = Some(Code::from_attribute_info(&attr.info)?);
                } else {
                    attributes.push(attr);
                }
            }
            methods.push(MethodInfo {
                access_flags,
                name_index,
                descriptor_index,
                code,
                attributes,
            });
        }

        let attributes = decode_attributes(&mut reader)?;
        if reader.has_more() {
            return Err(ClassFileError::TrailingBytes(reader.remaining()));
        }

        let class = Self {
            minor_version,
            major_version,
            constant_pool,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
        };
        if class.name().is_none() {
            return Err(ClassFileError::BadConstant {
                index: class.this_class,
                what: "this_class",
            });
        }
        Ok(class)
    }
}
