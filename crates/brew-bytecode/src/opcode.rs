//! JVM opcodes
//!
//! The complete Java SE instruction set (`0x00..=0xc9`). Every opcode is a
//! single byte; operands follow in big-endian order. `tableswitch`,
//! `lookupswitch` and `wide` have variable-length operands and are handled
//! specially by the reader and verifier.

macro_rules! define_opcodes {
    ($( $(#[$doc:meta])* $variant:ident = $byte:literal => $mnemonic:literal, )*) => {
        /// Bytecode opcode enumeration
        #[repr(u8)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Opcode {
            $( $(#[$doc])* $variant = $byte, )*
        }

        impl Opcode {
            /// Decode an opcode byte
            pub fn from_u8(byte: u8) -> Option<Self> {
                match byte {
                    $( $byte => Some(Opcode::$variant), )*
                    _ => None,
                }
            }

            /// Mnemonic as printed by `javap`
            pub fn name(self) -> &'static str {
                match self {
                    $( Opcode::$variant => $mnemonic, )*
                }
            }
        }
    };
}

define_opcodes! {
    // ===== Constants (0x00-0x14) =====
    /// Do nothing
    Nop = 0x00 => "nop",
    /// Push null
    AconstNull = 0x01 => "aconst_null",
    /// Push int -1
    IconstM1 = 0x02 => "iconst_m1",
    /// Push int 0
    Iconst0 = 0x03 => "iconst_0",
    /// Push int 1
    Iconst1 = 0x04 => "iconst_1",
    /// Push int 2
    Iconst2 = 0x05 => "iconst_2",
    /// Push int 3
    Iconst3 = 0x06 => "iconst_3",
    /// Push int 4
    Iconst4 = 0x07 => "iconst_4",
    /// Push int 5
    Iconst5 = 0x08 => "iconst_5",
    /// Push long 0
    Lconst0 = 0x09 => "lconst_0",
    /// Push long 1
    Lconst1 = 0x0a => "lconst_1",
    /// Push float 0.0
    Fconst0 = 0x0b => "fconst_0",
    /// Push float 1.0
    Fconst1 = 0x0c => "fconst_1",
    /// Push float 2.0
    Fconst2 = 0x0d => "fconst_2",
    /// Push double 0.0
    Dconst0 = 0x0e => "dconst_0",
    /// Push double 1.0
    Dconst1 = 0x0f => "dconst_1",
    /// Push sign-extended byte (operand: i8)
    Bipush = 0x10 => "bipush",
    /// Push sign-extended short (operand: i16)
    Sipush = 0x11 => "sipush",
    /// Push constant (operand: u8 pool index)
    Ldc = 0x12 => "ldc",
    /// Push constant (operand: u16 pool index)
    LdcW = 0x13 => "ldc_w",
    /// Push long or double constant (operand: u16 pool index)
    Ldc2W = 0x14 => "ldc2_w",

    // ===== Loads (0x15-0x35) =====
    /// Load int local (operand: u8 slot)
    Iload = 0x15 => "iload",
    /// Load long local (operand: u8 slot)
    Lload = 0x16 => "lload",
    /// Load float local (operand: u8 slot)
    Fload = 0x17 => "fload",
    /// Load double local (operand: u8 slot)
    Dload = 0x18 => "dload",
    /// Load reference local (operand: u8 slot)
    Aload = 0x19 => "aload",
    /// Load int from slot 0
    Iload0 = 0x1a => "iload_0",
    /// Load int from slot 1
    Iload1 = 0x1b => "iload_1",
    /// Load int from slot 2
    Iload2 = 0x1c => "iload_2",
    /// Load int from slot 3
    Iload3 = 0x1d => "iload_3",
    /// Load long from slot 0
    Lload0 = 0x1e => "lload_0",
    /// Load long from slot 1
    Lload1 = 0x1f => "lload_1",
    /// Load long from slot 2
    Lload2 = 0x20 => "lload_2",
    /// Load long from slot 3
    Lload3 = 0x21 => "lload_3",
    /// Load float from slot 0
    Fload0 = 0x22 => "fload_0",
    /// Load float from slot 1
    Fload1 = 0x23 => "fload_1",
    /// Load float from slot 2
    Fload2 = 0x24 => "fload_2",
    /// Load float from slot 3
    Fload3 = 0x25 => "fload_3",
    /// Load double from slot 0
    Dload0 = 0x26 => "dload_0",
    /// Load double from slot 1
    Dload1 = 0x27 => "dload_1",
    /// Load double from slot 2
    Dload2 = 0x28 => "dload_2",
    /// Load double from slot 3
    Dload3 = 0x29 => "dload_3",
    /// Load reference from slot 0
    Aload0 = 0x2a => "aload_0",
    /// Load reference from slot 1
    Aload1 = 0x2b => "aload_1",
    /// Load reference from slot 2
    Aload2 = 0x2c => "aload_2",
    /// Load reference from slot 3
    Aload3 = 0x2d => "aload_3",
    /// Load int array element
    Iaload = 0x2e => "iaload",
    /// Load long array element
    Laload = 0x2f => "laload",
    /// Load float array element
    Faload = 0x30 => "faload",
    /// Load double array element
    Daload = 0x31 => "daload",
    /// Load reference array element
    Aaload = 0x32 => "aaload",
    /// Load byte or boolean array element
    Baload = 0x33 => "baload",
    /// Load char array element
    Caload = 0x34 => "caload",
    /// Load short array element
    Saload = 0x35 => "saload",

    // ===== Stores (0x36-0x56) =====
    /// Store int local (operand: u8 slot)
    Istore = 0x36 => "istore",
    /// Store long local (operand: u8 slot)
    Lstore = 0x37 => "lstore",
    /// Store float local (operand: u8 slot)
    Fstore = 0x38 => "fstore",
    /// Store double local (operand: u8 slot)
    Dstore = 0x39 => "dstore",
    /// Store reference local (operand: u8 slot)
    Astore = 0x3a => "astore",
    /// Store int to slot 0
    Istore0 = 0x3b => "istore_0",
    /// Store int to slot 1
    Istore1 = 0x3c => "istore_1",
    /// Store int to slot 2
    Istore2 = 0x3d => "istore_2",
    /// Store int to slot 3
    Istore3 = 0x3e => "istore_3",
    /// Store long to slot 0
    Lstore0 = 0x3f => "lstore_0",
    /// Store long to slot 1
    Lstore1 = 0x40 => "lstore_1",
    /// Store long to slot 2
    Lstore2 = 0x41 => "lstore_2",
    /// Store long to slot 3
    Lstore3 = 0x42 => "lstore_3",
    /// Store float to slot 0
    Fstore0 = 0x43 => "fstore_0",
    /// Store float to slot 1
    Fstore1 = 0x44 => "fstore_1",
    /// Store float to slot 2
    Fstore2 = 0x45 => "fstore_2",
    /// Store float to slot 3
    Fstore3 = 0x46 => "fstore_3",
    /// Store double to slot 0
    Dstore0 = 0x47 => "dstore_0",
    /// Store double to slot 1
    Dstore1 = 0x48 => "dstore_1",
    /// Store double to slot 2
    Dstore2 = 0x49 => "dstore_2",
    /// Store double to slot 3
    Dstore3 = 0x4a => "dstore_3",
    /// Store reference to slot 0
    Astore0 = 0x4b => "astore_0",
    /// Store reference to slot 1
    Astore1 = 0x4c => "astore_1",
    /// Store reference to slot 2
    Astore2 = 0x4d => "astore_2",
    /// Store reference to slot 3
    Astore3 = 0x4e => "astore_3",
    /// Store into int array
    Iastore = 0x4f => "iastore",
    /// Store into long array
    Lastore = 0x50 => "lastore",
    /// Store into float array
    Fastore = 0x51 => "fastore",
    /// Store into double array
    Dastore = 0x52 => "dastore",
    /// Store into reference array
    Aastore = 0x53 => "aastore",
    /// Store into byte or boolean array
    Bastore = 0x54 => "bastore",
    /// Store into char array
    Castore = 0x55 => "castore",
    /// Store into short array
    Sastore = 0x56 => "sastore",

    // ===== Stack (0x57-0x5f) =====
    /// Pop one slot
    Pop = 0x57 => "pop",
    /// Pop two slots
    Pop2 = 0x58 => "pop2",
    /// Duplicate top slot
    Dup = 0x59 => "dup",
    /// Duplicate top slot below the second
    DupX1 = 0x5a => "dup_x1",
    /// Duplicate top slot below the third
    DupX2 = 0x5b => "dup_x2",
    /// Duplicate top two slots
    Dup2 = 0x5c => "dup2",
    /// Duplicate top two slots below the third
    Dup2X1 = 0x5d => "dup2_x1",
    /// Duplicate top two slots below the fourth
    Dup2X2 = 0x5e => "dup2_x2",
    /// Swap top two slots
    Swap = 0x5f => "swap",

    // ===== Arithmetic (0x60-0x84) =====
    /// int add
    Iadd = 0x60 => "iadd",
    /// long add
    Ladd = 0x61 => "ladd",
    /// float add
    Fadd = 0x62 => "fadd",
    /// double add
    Dadd = 0x63 => "dadd",
    /// int subtract
    Isub = 0x64 => "isub",
    /// long subtract
    Lsub = 0x65 => "lsub",
    /// float subtract
    Fsub = 0x66 => "fsub",
    /// double subtract
    Dsub = 0x67 => "dsub",
    /// int multiply
    Imul = 0x68 => "imul",
    /// long multiply
    Lmul = 0x69 => "lmul",
    /// float multiply
    Fmul = 0x6a => "fmul",
    /// double multiply
    Dmul = 0x6b => "dmul",
    /// int divide
    Idiv = 0x6c => "idiv",
    /// long divide
    Ldiv = 0x6d => "ldiv",
    /// float divide
    Fdiv = 0x6e => "fdiv",
    /// double divide
    Ddiv = 0x6f => "ddiv",
    /// int remainder
    Irem = 0x70 => "irem",
    /// long remainder
    Lrem = 0x71 => "lrem",
    /// float remainder
    Frem = 0x72 => "frem",
    /// double remainder
    Drem = 0x73 => "drem",
    /// int negate
    Ineg = 0x74 => "ineg",
    /// long negate
    Lneg = 0x75 => "lneg",
    /// float negate
    Fneg = 0x76 => "fneg",
    /// double negate
    Dneg = 0x77 => "dneg",
    /// int shift left
    Ishl = 0x78 => "ishl",
    /// long shift left
    Lshl = 0x79 => "lshl",
    /// int arithmetic shift right
    Ishr = 0x7a => "ishr",
    /// long arithmetic shift right
    Lshr = 0x7b => "lshr",
    /// int logical shift right
    Iushr = 0x7c => "iushr",
    /// long logical shift right
    Lushr = 0x7d => "lushr",
    /// int and
    Iand = 0x7e => "iand",
    /// long and
    Land = 0x7f => "land",
    /// int or
    Ior = 0x80 => "ior",
    /// long or
    Lor = 0x81 => "lor",
    /// int xor
    Ixor = 0x82 => "ixor",
    /// long xor
    Lxor = 0x83 => "lxor",
    /// Increment local (operands: u8 slot, i8 delta)
    Iinc = 0x84 => "iinc",

    // ===== Conversions (0x85-0x93) =====
    /// int to long
    I2l = 0x85 => "i2l",
    /// int to float
    I2f = 0x86 => "i2f",
    /// int to double
    I2d = 0x87 => "i2d",
    /// long to int
    L2i = 0x88 => "l2i",
    /// long to float
    L2f = 0x89 => "l2f",
    /// long to double
    L2d = 0x8a => "l2d",
    /// float to int
    F2i = 0x8b => "f2i",
    /// float to long
    F2l = 0x8c => "f2l",
    /// float to double
    F2d = 0x8d => "f2d",
    /// double to int
    D2i = 0x8e => "d2i",
    /// double to long
    D2l = 0x8f => "d2l",
    /// double to float
    D2f = 0x90 => "d2f",
    /// int to byte
    I2b = 0x91 => "i2b",
    /// int to char
    I2c = 0x92 => "i2c",
    /// int to short
    I2s = 0x93 => "i2s",

    // ===== Comparisons (0x94-0xa6) =====
    /// Compare longs, push -1/0/1
    Lcmp = 0x94 => "lcmp",
    /// Compare floats, NaN pushes -1
    Fcmpl = 0x95 => "fcmpl",
    /// Compare floats, NaN pushes 1
    Fcmpg = 0x96 => "fcmpg",
    /// Compare doubles, NaN pushes -1
    Dcmpl = 0x97 => "dcmpl",
    /// Compare doubles, NaN pushes 1
    Dcmpg = 0x98 => "dcmpg",
    /// Branch if int == 0 (operand: i16 offset)
    Ifeq = 0x99 => "ifeq",
    /// Branch if int != 0
    Ifne = 0x9a => "ifne",
    /// Branch if int < 0
    Iflt = 0x9b => "iflt",
    /// Branch if int >= 0
    Ifge = 0x9c => "ifge",
    /// Branch if int > 0
    Ifgt = 0x9d => "ifgt",
    /// Branch if int <= 0
    Ifle = 0x9e => "ifle",
    /// Branch if ints equal
    IfIcmpeq = 0x9f => "if_icmpeq",
    /// Branch if ints differ
    IfIcmpne = 0xa0 => "if_icmpne",
    /// Branch if int less than
    IfIcmplt = 0xa1 => "if_icmplt",
    /// Branch if int greater or equal
    IfIcmpge = 0xa2 => "if_icmpge",
    /// Branch if int greater than
    IfIcmpgt = 0xa3 => "if_icmpgt",
    /// Branch if int less or equal
    IfIcmple = 0xa4 => "if_icmple",
    /// Branch if references equal
    IfAcmpeq = 0xa5 => "if_acmpeq",
    /// Branch if references differ
    IfAcmpne = 0xa6 => "if_acmpne",

    // ===== Control (0xa7-0xb1) =====
    /// Unconditional branch (operand: i16 offset)
    Goto = 0xa7 => "goto",
    /// Jump to subroutine
    Jsr = 0xa8 => "jsr",
    /// Return from subroutine (operand: u8 slot)
    Ret = 0xa9 => "ret",
    /// Dense jump table
    Tableswitch = 0xaa => "tableswitch",
    /// Sparse key/target table
    Lookupswitch = 0xab => "lookupswitch",
    /// Return int
    Ireturn = 0xac => "ireturn",
    /// Return long
    Lreturn = 0xad => "lreturn",
    /// Return float
    Freturn = 0xae => "freturn",
    /// Return double
    Dreturn = 0xaf => "dreturn",
    /// Return reference
    Areturn = 0xb0 => "areturn",
    /// Return void
    Return = 0xb1 => "return",

    // ===== References (0xb2-0xc3) =====
    /// Read static field (operand: u16 Fieldref)
    Getstatic = 0xb2 => "getstatic",
    /// Write static field
    Putstatic = 0xb3 => "putstatic",
    /// Read instance field
    Getfield = 0xb4 => "getfield",
    /// Write instance field
    Putfield = 0xb5 => "putfield",
    /// Invoke instance method with virtual dispatch (operand: u16 Methodref)
    Invokevirtual = 0xb6 => "invokevirtual",
    /// Invoke constructor, private or super method
    Invokespecial = 0xb7 => "invokespecial",
    /// Invoke static method
    Invokestatic = 0xb8 => "invokestatic",
    /// Invoke interface method (operands: u16 index, u8 count, u8 zero)
    Invokeinterface = 0xb9 => "invokeinterface",
    /// Invoke dynamically computed call site
    Invokedynamic = 0xba => "invokedynamic",
    /// Allocate object (operand: u16 Class)
    New = 0xbb => "new",
    /// Allocate primitive array (operand: u8 type code)
    Newarray = 0xbc => "newarray",
    /// Allocate reference array (operand: u16 Class)
    Anewarray = 0xbd => "anewarray",
    /// Push array length
    Arraylength = 0xbe => "arraylength",
    /// Throw exception
    Athrow = 0xbf => "athrow",
    /// Checked reference cast (operand: u16 Class)
    Checkcast = 0xc0 => "checkcast",
    /// Type test (operand: u16 Class)
    Instanceof = 0xc1 => "instanceof",
    /// Enter monitor
    Monitorenter = 0xc2 => "monitorenter",
    /// Exit monitor
    Monitorexit = 0xc3 => "monitorexit",

    // ===== Extended (0xc4-0xc9) =====
    /// Widen the following local-variable instruction to u16 slots
    Wide = 0xc4 => "wide",
    /// Allocate multi-dimensional array (operands: u16 Class, u8 dims)
    Multianewarray = 0xc5 => "multianewarray",
    /// Branch if null
    Ifnull = 0xc6 => "ifnull",
    /// Branch if not null
    Ifnonnull = 0xc7 => "ifnonnull",
    /// Unconditional branch (operand: i32 offset)
    GotoW = 0xc8 => "goto_w",
    /// Jump to subroutine (operand: i32 offset)
    JsrW = 0xc9 => "jsr_w",
}

impl Opcode {
    /// Convert opcode to byte
    #[inline]
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Length of the fixed operands following the opcode byte.
    ///
    /// `None` for `tableswitch`, `lookupswitch` and `wide`, whose length
    /// depends on alignment or on the widened instruction.
    pub fn operand_len(self) -> Option<usize> {
        use Opcode::*;
        let len = match self {
            Bipush | Ldc | Iload | Lload | Fload | Dload | Aload | Istore | Lstore | Fstore
            | Dstore | Astore | Ret | Newarray => 1,
            Sipush | LdcW | Ldc2W | Iinc | Ifeq | Ifne | Iflt | Ifge | Ifgt | Ifle | IfIcmpeq
            | IfIcmpne | IfIcmplt | IfIcmpge | IfIcmpgt | IfIcmple | IfAcmpeq | IfAcmpne
            | Goto | Jsr | Getstatic | Putstatic | Getfield | Putfield | Invokevirtual
            | Invokespecial | Invokestatic | New | Anewarray | Checkcast | Instanceof
            | Ifnull | Ifnonnull => 2,
            Multianewarray => 3,
            Invokeinterface | Invokedynamic | GotoW | JsrW => 4,
            Tableswitch | Lookupswitch | Wide => return None,
            _ => 0,
        };
        Some(len)
    }

    /// Check if this opcode is a conditional branch
    pub fn is_conditional_jump(self) -> bool {
        matches!(self as u8, 0x99..=0xa6 | 0xc6 | 0xc7)
    }

    /// Check if this opcode is a branch with a relative offset operand
    pub fn is_jump(self) -> bool {
        self.is_conditional_jump()
            || matches!(
                self,
                Opcode::Goto | Opcode::GotoW | Opcode::Jsr | Opcode::JsrW
            )
    }

    /// Check if this opcode is a switch
    pub fn is_switch(self) -> bool {
        matches!(self, Opcode::Tableswitch | Opcode::Lookupswitch)
    }

    /// Check if this opcode is an invoke instruction
    pub fn is_invoke(self) -> bool {
        matches!(self as u8, 0xb6..=0xba)
    }

    /// Check if this opcode is a return instruction
    pub fn is_return(self) -> bool {
        matches!(self as u8, 0xac..=0xb1)
    }

    /// Check if this opcode ends a basic block with no fall-through
    pub fn is_terminator(self) -> bool {
        self.is_return()
            || self.is_switch()
            || matches!(
                self,
                Opcode::Goto | Opcode::GotoW | Opcode::Athrow | Opcode::Ret
            )
    }

    /// Stack effect in slots as `(pops, pushes)`.
    ///
    /// `None` for instructions whose effect depends on a descriptor
    /// (field access, invokes, `multianewarray`) or on a following
    /// instruction (`wide`).
    pub fn stack_effect(self) -> Option<(u8, u8)> {
        use Opcode::*;
        let effect = match self {
            Nop | Iinc | Goto | GotoW | Ret | Return => (0, 0),
            AconstNull | IconstM1 | Iconst0 | Iconst1 | Iconst2 | Iconst3 | Iconst4
            | Iconst5 | Fconst0 | Fconst1 | Fconst2 | Bipush | Sipush | Ldc | LdcW | Iload
            | Fload | Aload | Iload0 | Iload1 | Iload2 | Iload3 | Fload0 | Fload1 | Fload2
            | Fload3 | Aload0 | Aload1 | Aload2 | Aload3 | New | Jsr | JsrW => (0, 1),
            Lconst0 | Lconst1 | Dconst0 | Dconst1 | Ldc2W | Lload | Dload | Lload0 | Lload1
            | Lload2 | Lload3 | Dload0 | Dload1 | Dload2 | Dload3 => (0, 2),
            Iaload | Faload | Aaload | Baload | Caload | Saload => (2, 1),
            Laload | Daload => (2, 2),
            Istore | Fstore | Astore | Istore0 | Istore1 | Istore2 | Istore3 | Fstore0
            | Fstore1 | Fstore2 | Fstore3 | Astore0 | Astore1 | Astore2 | Astore3 | Pop
            | Ifeq | Ifne | Iflt | Ifge | Ifgt | Ifle | Ifnull | Ifnonnull | Tableswitch
            | Lookupswitch | Ireturn | Freturn | Areturn | Athrow | Monitorenter
            | Monitorexit => (1, 0),
            Lstore | Dstore | Lstore0 | Lstore1 | Lstore2 | Lstore3 | Dstore0 | Dstore1
            | Dstore2 | Dstore3 | Pop2 | Lreturn | Dreturn => (2, 0),
            Iastore | Fastore | Aastore | Bastore | Castore | Sastore => (3, 0),
            Lastore | Dastore => (4, 0),
            Dup => (1, 2),
            DupX1 => (2, 3),
            DupX2 => (3, 4),
            Dup2 => (2, 4),
            Dup2X1 => (3, 5),
            Dup2X2 => (4, 6),
            Swap => (2, 2),
            Iadd | Fadd | Isub | Fsub | Imul | Fmul | Idiv | Fdiv | Irem | Frem | Ishl
            | Ishr | Iushr | Iand | Ior | Ixor | Fcmpl | Fcmpg => (2, 1),
            Ladd | Dadd | Lsub | Dsub | Lmul | Dmul | Ldiv | Ddiv | Lrem | Drem | Land
            | Lor | Lxor => (4, 2),
            Lshl | Lshr | Lushr => (3, 2),
            Ineg | Fneg | I2f | F2i | I2b | I2c | I2s | Newarray | Anewarray | Arraylength
            | Checkcast | Instanceof => (1, 1),
            Lneg | Dneg | L2d | D2l => (2, 2),
            I2l | I2d | F2l | F2d => (1, 2),
            L2i | L2f | D2i | D2f => (2, 1),
            Lcmp | Dcmpl | Dcmpg => (4, 1),
            IfIcmpeq | IfIcmpne | IfIcmplt | IfIcmpge | IfIcmpgt | IfIcmple | IfAcmpeq
            | IfAcmpne => (2, 0),
            Getstatic | Putstatic | Getfield | Putfield | Invokevirtual | Invokespecial
            | Invokestatic | Invokeinterface | Invokedynamic | Multianewarray | Wide => {
                return None
            }
        };
        Some(effect)
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
