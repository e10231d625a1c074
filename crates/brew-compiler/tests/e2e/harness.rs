//! Test harness for end-to-end compilation and execution
//!
//! Compiled classes are decoded with `ClassFile::decode`, verified with
//! `verify_class` and run on `Jvm`, an interpreter for the subset of the
//! instruction set the compiler emits. Only the compiled class is loaded;
//! `java/lang/Object.<init>` is the one outside method it knows.

use brew_bytecode::{
    access, decode_instructions, verify_class, ClassFile, Code, Constant, Instruction, Opcode,
    Operand,
};
use brew_compiler::{
    ClassBuilder, ClassCompileError, CompilerOptions, Method, MethodDescriptor, Stmt, Type, Vars,
};
use std::collections::HashMap;

/// Name of the class most tests compile
pub const CLASS: &str = "demo/Test";

/// Step budget per top-level call
const FUEL: u64 = 10_000_000;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Compile with default options, then decode and verify the bytes
pub fn compile(builder: ClassBuilder) -> Result<ClassFile, ClassCompileError> {
    compile_with(builder, &CompilerOptions::default())
}

pub fn compile_with(
    builder: ClassBuilder,
    options: &CompilerOptions,
) -> Result<ClassFile, ClassCompileError> {
    init_logging();
    let bytes = builder.compile(options)?;
    assert_eq!(&bytes[..4], &[0xCA, 0xFE, 0xBA, 0xBE]);
    let class = ClassFile::decode(&bytes).expect("emitted class decodes");
    verify_class(&class).expect("emitted class verifies");
    Ok(class)
}

/// Public static method
pub fn static_method(name: &str, params: Vec<Type>, ret: Type) -> Method {
    Method::new(name, params, ret).with_access(access::ACC_PUBLIC | access::ACC_STATIC)
}

/// Public static method over declared variables; the leading ones are the
/// parameters
pub fn function(name: &str, params: &[(&str, Type)], locals: &[(&str, Type)], ret: Type) -> Method {
    let vars = Vars::new(
        params
            .iter()
            .chain(locals)
            .map(|(name, ty)| (name.to_string(), ty.clone())),
    )
    .expect("distinct variable names");
    static_method(name, params.iter().map(|(_, ty)| ty.clone()).collect(), ret).with_vars(vars)
}

/// Compile a class holding `method` and load it
pub fn load_method(method: Method) -> Jvm {
    let mut builder = ClassBuilder::new(CLASS);
    builder.method(method);
    load(builder)
}

pub fn load(builder: ClassBuilder) -> Jvm {
    match compile(builder) {
        Ok(class) => Jvm::new(class),
        Err(e) => panic!("compilation failed: {}", e),
    }
}

/// Compile `body` as `static <ret> f()`, run it and return the result
pub fn run_body(ret: Type, locals: &[(&str, Type)], body: Vec<Stmt>) -> Value {
    let mut method = function("f", &[], locals, ret.clone());
    method.extend_stmts(body);
    let descriptor = MethodDescriptor::new(Vec::new(), ret).descriptor().unwrap();
    let mut jvm = load_method(method);
    jvm.invoke_static("f", &descriptor, Vec::new())
        .expect("execution succeeds")
        .expect("a return value")
}

pub fn expect_i32(ret: Type, locals: &[(&str, Type)], body: Vec<Stmt>, expected: i32) {
    assert_eq!(run_body(ret, locals, body), Value::Int(expected));
}

// ============================================================================
// Interpreter
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Ref(Option<usize>),
    /// Upper half of a long or double local
    Top,
}

impl Value {
    fn width(self) -> usize {
        match self {
            Value::Long(_) | Value::Double(_) => 2,
            _ => 1,
        }
    }

    fn default_for(descriptor: &str) -> Value {
        match descriptor.as_bytes().first() {
            Some(b'J') => Value::Long(0),
            Some(b'F') => Value::Float(0.0),
            Some(b'D') => Value::Double(0.0),
            Some(b'L') | Some(b'[') => Value::Ref(None),
            _ => Value::Int(0),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum JvmError {
    NoSuchMethod(String),
    Unsupported(String),
    NullPointer,
    ArrayIndex(i32),
    NegativeArraySize(i32),
    DivideByZero,
    BadOperand(String),
    OutOfFuel,
}

pub type JvmResult<T> = Result<T, JvmError>;

#[derive(Debug, Clone)]
enum HeapObject {
    Array { type_code: u8, values: Vec<Value> },
    Str(String),
    Instance { fields: HashMap<String, Value> },
}

pub struct Jvm {
    class: ClassFile,
    name: String,
    heap: Vec<HeapObject>,
    statics: HashMap<String, Value>,
    fuel: u64,
}

impl Jvm {
    /// Load the class and run its static initializer
    pub fn new(class: ClassFile) -> Self {
        let name = class.name().expect("class name").to_string();
        let mut jvm = Self {
            class,
            name,
            heap: Vec::new(),
            statics: HashMap::new(),
            fuel: FUEL,
        };
        if jvm.class.find_method("<clinit>", "()V").is_some() {
            jvm.invoke_static("<clinit>", "()V", Vec::new())
                .expect("static initializer runs");
        }
        jvm
    }

    pub fn class(&self) -> &ClassFile {
        &self.class
    }

    pub fn invoke_static(
        &mut self,
        name: &str,
        descriptor: &str,
        args: Vec<Value>,
    ) -> JvmResult<Option<Value>> {
        self.fuel = FUEL;
        self.call(name, descriptor, args)
    }

    /// Call an instance method of the loaded class on `receiver`
    pub fn invoke_virtual(
        &mut self,
        receiver: Value,
        name: &str,
        descriptor: &str,
        args: Vec<Value>,
    ) -> JvmResult<Option<Value>> {
        let mut all = vec![receiver];
        all.extend(args);
        self.invoke_static(name, descriptor, all)
    }

    /// Allocate an instance of the loaded class without running a constructor
    pub fn new_instance(&mut self) -> Value {
        self.alloc(HeapObject::Instance {
            fields: HashMap::new(),
        })
    }

    pub fn get_static(&self, name: &str) -> Option<Value> {
        self.statics.get(&format!("{}.{}", self.name, name)).copied()
    }

    pub fn array(&self, value: Value) -> JvmResult<&[Value]> {
        match self.deref(value)? {
            HeapObject::Array { values, .. } => Ok(values),
            other => Err(JvmError::BadOperand(format!("{:?} is not an array", other))),
        }
    }

    pub fn string(&self, value: Value) -> JvmResult<&str> {
        match self.deref(value)? {
            HeapObject::Str(s) => Ok(s),
            other => Err(JvmError::BadOperand(format!("{:?} is not a string", other))),
        }
    }

    pub fn field(&self, object: Value, name: &str) -> JvmResult<Option<Value>> {
        match self.deref(object)? {
            HeapObject::Instance { fields } => Ok(fields.get(name).copied()),
            other => Err(JvmError::BadOperand(format!("{:?} is not an object", other))),
        }
    }

    fn alloc(&mut self, object: HeapObject) -> Value {
        self.heap.push(object);
        Value::Ref(Some(self.heap.len() - 1))
    }

    fn deref(&self, value: Value) -> JvmResult<&HeapObject> {
        match value {
            Value::Ref(Some(index)) => Ok(&self.heap[index]),
            Value::Ref(None) => Err(JvmError::NullPointer),
            other => Err(JvmError::BadOperand(format!("{:?} is not a reference", other))),
        }
    }

    fn deref_mut(&mut self, value: Value) -> JvmResult<&mut HeapObject> {
        match value {
            Value::Ref(Some(index)) => Ok(&mut self.heap[index]),
            Value::Ref(None) => Err(JvmError::NullPointer),
            other => Err(JvmError::BadOperand(format!("{:?} is not a reference", other))),
        }
    }

    fn call(&mut self, name: &str, descriptor: &str, args: Vec<Value>) -> JvmResult<Option<Value>> {
        let code = self
            .class
            .find_method(name, descriptor)
            .and_then(|m| m.code.clone())
            .ok_or_else(|| JvmError::NoSuchMethod(format!("{}{}", name, descriptor)))?;
        self.execute(&code, args)
    }

    fn member(&self, index: u16) -> JvmResult<(String, String, String)> {
        let member = self
            .class
            .constant_pool
            .member_ref(index)
            .ok_or_else(|| JvmError::BadOperand(format!("#{} is not a member", index)))?;
        Ok((
            member.owner.to_string(),
            member.name.to_string(),
            member.descriptor.to_string(),
        ))
    }

    fn execute(&mut self, code: &Code, args: Vec<Value>) -> JvmResult<Option<Value>> {
        let instructions = decode_instructions(&code.code)
            .map_err(|e| JvmError::BadOperand(e.to_string()))?;
        let index: HashMap<usize, usize> = instructions
            .iter()
            .enumerate()
            .map(|(i, instr)| (instr.offset, i))
            .collect();

        let mut locals = vec![Value::Top; code.max_locals as usize];
        let mut slot = 0;
        for arg in args {
            locals[slot] = arg;
            slot += arg.width();
        }

        let mut frame = Frame {
            stack: Vec::new(),
            locals,
        };
        let mut pc = 0;
        loop {
            self.fuel = self.fuel.checked_sub(1).ok_or(JvmError::OutOfFuel)?;
            let instr = &instructions[pc];
            match self.step(instr, &mut frame)? {
                Flow::Next => pc += 1,
                Flow::Jump(target) => {
                    pc = *index
                        .get(&target)
                        .ok_or_else(|| JvmError::BadOperand(format!("jump to {}", target)))?
                }
                Flow::Return(value) => return Ok(value),
            }
        }
    }

    fn step(&mut self, instr: &Instruction, frame: &mut Frame) -> JvmResult<Flow> {
        let byte = instr.opcode.to_u8();
        match byte {
            0x02..=0x08 => frame.push(Value::Int(i32::from(byte) - 3)),
            0x09..=0x0a => frame.push(Value::Long(i64::from(byte - 0x09))),
            0x0b..=0x0d => frame.push(Value::Float(f32::from(byte - 0x0b))),
            0x0e..=0x0f => frame.push(Value::Double(f64::from(byte - 0x0e))),
            0x15..=0x19 => {
                let slot = local(instr)?;
                frame.push(frame.locals[slot]);
            }
            0x1a..=0x2d => {
                let slot = usize::from((byte - 0x1a) % 4);
                frame.push(frame.locals[slot]);
            }
            0x36..=0x3a => {
                let slot = local(instr)?;
                let value = frame.pop()?;
                frame.store(slot, value);
            }
            0x3b..=0x4e => {
                let slot = usize::from((byte - 0x3b) % 4);
                let value = frame.pop()?;
                frame.store(slot, value);
            }
            _ => return self.step_other(instr, frame),
        }
        Ok(Flow::Next)
    }

    fn step_other(&mut self, instr: &Instruction, frame: &mut Frame) -> JvmResult<Flow> {
        use Opcode::*;
        match instr.opcode {
            Nop => {}
            AconstNull => frame.push(Value::Ref(None)),
            Bipush | Sipush => match instr.operand {
                Operand::Int(v) => frame.push(Value::Int(v)),
                _ => return Err(bad(instr)),
            },
            Ldc | LdcW | Ldc2W => {
                let Operand::Constant(index) = instr.operand else {
                    return Err(bad(instr));
                };
                let value = match self.class.constant_pool.get(index).cloned() {
                    Some(Constant::Integer(v)) => Value::Int(v),
                    Some(Constant::Float(bits)) => Value::Float(f32::from_bits(bits)),
                    Some(Constant::Long(v)) => Value::Long(v),
                    Some(Constant::Double(bits)) => Value::Double(f64::from_bits(bits)),
                    Some(Constant::String(utf8)) => {
                        let text = self
                            .class
                            .constant_pool
                            .get_utf8(utf8)
                            .unwrap_or_default()
                            .to_string();
                        self.alloc(HeapObject::Str(text))
                    }
                    _ => return Err(bad(instr)),
                };
                frame.push(value);
            }
            Iinc => {
                let Operand::Iinc { local, delta } = instr.operand else {
                    return Err(bad(instr));
                };
                let slot = usize::from(local);
                let Value::Int(v) = frame.locals[slot] else {
                    return Err(bad(instr));
                };
                frame.locals[slot] = Value::Int(v.wrapping_add(i32::from(delta)));
            }

            Pop => {
                frame.pop()?;
            }
            Pop2 => {
                if frame.pop()?.width() == 1 {
                    frame.pop()?;
                }
            }
            Dup => {
                let top = frame.peek()?;
                frame.push(top);
            }
            Swap => {
                let a = frame.pop()?;
                let b = frame.pop()?;
                frame.push(a);
                frame.push(b);
            }

            Iadd | Isub | Imul | Idiv | Irem | Iand | Ior | Ixor | Ishl | Ishr | Iushr => {
                let b = frame.pop_int()?;
                let a = frame.pop_int()?;
                frame.push(Value::Int(int_op(instr.opcode, a, b)?));
            }
            Ladd | Lsub | Lmul | Ldiv | Lrem | Land | Lor | Lxor => {
                let b = frame.pop_long()?;
                let a = frame.pop_long()?;
                frame.push(Value::Long(long_op(instr.opcode, a, b)?));
            }
            Lshl | Lshr | Lushr => {
                let b = frame.pop_int()? & 0x3f;
                let a = frame.pop_long()?;
                frame.push(Value::Long(match instr.opcode {
                    Lshl => a << b,
                    Lshr => a >> b,
                    _ => ((a as u64) >> b) as i64,
                }));
            }
            Fadd | Fsub | Fmul | Fdiv | Frem => {
                let b = frame.pop_float()?;
                let a = frame.pop_float()?;
                frame.push(Value::Float(match instr.opcode {
                    Fadd => a + b,
                    Fsub => a - b,
                    Fmul => a * b,
                    Fdiv => a / b,
                    _ => a % b,
                }));
            }
            Dadd | Dsub | Dmul | Ddiv | Drem => {
                let b = frame.pop_double()?;
                let a = frame.pop_double()?;
                frame.push(Value::Double(match instr.opcode {
                    Dadd => a + b,
                    Dsub => a - b,
                    Dmul => a * b,
                    Ddiv => a / b,
                    _ => a % b,
                }));
            }
            Ineg => {
                let v = frame.pop_int()?;
                frame.push(Value::Int(v.wrapping_neg()));
            }
            Lneg => {
                let v = frame.pop_long()?;
                frame.push(Value::Long(v.wrapping_neg()));
            }
            Fneg => {
                let v = frame.pop_float()?;
                frame.push(Value::Float(-v));
            }
            Dneg => {
                let v = frame.pop_double()?;
                frame.push(Value::Double(-v));
            }

            I2l | I2f | I2d | I2b | I2c | I2s => {
                let v = frame.pop_int()?;
                frame.push(match instr.opcode {
                    I2l => Value::Long(i64::from(v)),
                    I2f => Value::Float(v as f32),
                    I2d => Value::Double(f64::from(v)),
                    I2b => Value::Int(i32::from(v as i8)),
                    I2c => Value::Int(i32::from(v as u16)),
                    _ => Value::Int(i32::from(v as i16)),
                });
            }
            L2i | L2f | L2d => {
                let v = frame.pop_long()?;
                frame.push(match instr.opcode {
                    L2i => Value::Int(v as i32),
                    L2f => Value::Float(v as f32),
                    _ => Value::Double(v as f64),
                });
            }
            F2i | F2l | F2d => {
                let v = frame.pop_float()?;
                frame.push(match instr.opcode {
                    F2i => Value::Int(v as i32),
                    F2l => Value::Long(v as i64),
                    _ => Value::Double(f64::from(v)),
                });
            }
            D2i | D2l | D2f => {
                let v = frame.pop_double()?;
                frame.push(match instr.opcode {
                    D2i => Value::Int(v as i32),
                    D2l => Value::Long(v as i64),
                    _ => Value::Float(v as f32),
                });
            }

            Lcmp => {
                let b = frame.pop_long()?;
                let a = frame.pop_long()?;
                frame.push(Value::Int(a.cmp(&b) as i32));
            }
            Fcmpl | Fcmpg => {
                let b = f64::from(frame.pop_float()?);
                let a = f64::from(frame.pop_float()?);
                frame.push(Value::Int(float_compare(a, b, instr.opcode == Fcmpg)));
            }
            Dcmpl | Dcmpg => {
                let b = frame.pop_double()?;
                let a = frame.pop_double()?;
                frame.push(Value::Int(float_compare(a, b, instr.opcode == Dcmpg)));
            }

            Ifeq | Ifne | Iflt | Ifge | Ifgt | Ifle => {
                let v = frame.pop_int()?;
                let taken = match instr.opcode {
                    Ifeq => v == 0,
                    Ifne => v != 0,
                    Iflt => v < 0,
                    Ifge => v >= 0,
                    Ifgt => v > 0,
                    _ => v <= 0,
                };
                return branch(instr, taken);
            }
            IfIcmpeq | IfIcmpne | IfIcmplt | IfIcmpge | IfIcmpgt | IfIcmple => {
                let b = frame.pop_int()?;
                let a = frame.pop_int()?;
                let taken = match instr.opcode {
                    IfIcmpeq => a == b,
                    IfIcmpne => a != b,
                    IfIcmplt => a < b,
                    IfIcmpge => a >= b,
                    IfIcmpgt => a > b,
                    _ => a <= b,
                };
                return branch(instr, taken);
            }
            IfAcmpeq | IfAcmpne => {
                let b = frame.pop()?;
                let a = frame.pop()?;
                return branch(instr, (a == b) == (instr.opcode == IfAcmpeq));
            }
            Ifnull | Ifnonnull => {
                let v = frame.pop()?;
                return branch(instr, (v == Value::Ref(None)) == (instr.opcode == Ifnull));
            }
            Goto => return branch(instr, true),
            Tableswitch => {
                let key = frame.pop_int()?;
                let Operand::TableSwitch {
                    default,
                    low,
                    targets,
                } = &instr.operand
                else {
                    return Err(bad(instr));
                };
                let offset = i64::from(key) - i64::from(*low);
                let target = usize::try_from(offset)
                    .ok()
                    .and_then(|i| targets.get(i))
                    .unwrap_or(default);
                return Ok(Flow::Jump(*target));
            }
            Lookupswitch => {
                let key = frame.pop_int()?;
                let Operand::LookupSwitch { default, pairs } = &instr.operand else {
                    return Err(bad(instr));
                };
                let target = pairs
                    .iter()
                    .find(|(k, _)| *k == key)
                    .map_or(*default, |(_, t)| *t);
                return Ok(Flow::Jump(target));
            }

            Ireturn | Lreturn | Freturn | Dreturn | Areturn => {
                return Ok(Flow::Return(Some(frame.pop()?)))
            }
            Return => return Ok(Flow::Return(None)),

            Getstatic | Putstatic => {
                let (owner, name, descriptor) = self.member(constant(instr)?)?;
                let key = format!("{}.{}", owner, name);
                if instr.opcode == Getstatic {
                    let value = self
                        .statics
                        .get(&key)
                        .copied()
                        .unwrap_or_else(|| Value::default_for(&descriptor));
                    frame.push(value);
                } else {
                    let value = frame.pop()?;
                    self.statics.insert(key, value);
                }
            }
            Getfield => {
                let (_, name, descriptor) = self.member(constant(instr)?)?;
                let object = frame.pop()?;
                let value = self
                    .field(object, &name)?
                    .unwrap_or_else(|| Value::default_for(&descriptor));
                frame.push(value);
            }
            Putfield => {
                let (_, name, _) = self.member(constant(instr)?)?;
                let value = frame.pop()?;
                let object = frame.pop()?;
                match self.deref_mut(object)? {
                    HeapObject::Instance { fields } => {
                        fields.insert(name, value);
                    }
                    _ => return Err(bad(instr)),
                }
            }

            Invokestatic | Invokevirtual | Invokespecial => {
                let (owner, name, descriptor) = self.member(constant(instr)?)?;
                let params = MethodDescriptor::parse(&descriptor)
                    .map_err(|e| JvmError::BadOperand(e.to_string()))?
                    .params
                    .len();
                let receiver = usize::from(instr.opcode != Invokestatic);
                let args = frame.pop_n(params + receiver)?;

                if owner == "java/lang/Object" && name == "<init>" {
                    return Ok(Flow::Next);
                }
                if owner != self.name {
                    return Err(JvmError::Unsupported(format!("call to {}.{}", owner, name)));
                }
                if receiver == 1 && args[0] == Value::Ref(None) {
                    return Err(JvmError::NullPointer);
                }
                let result = self.call(&name, &descriptor, args)?;
                if let Some(value) = result {
                    frame.push(value);
                }
            }

            New => {
                let class = self
                    .class
                    .constant_pool
                    .class_name(constant(instr)?)
                    .unwrap_or_default()
                    .to_string();
                if class != self.name {
                    return Err(JvmError::Unsupported(format!("new {}", class)));
                }
                let object = self.new_instance();
                frame.push(object);
            }
            Newarray | Anewarray => {
                let len = frame.pop_int()?;
                if len < 0 {
                    return Err(JvmError::NegativeArraySize(len));
                }
                let type_code = match instr.operand {
                    Operand::ArrayType(code) => code,
                    _ => 0,
                };
                let fill = match type_code {
                    0 => Value::Ref(None),
                    6 => Value::Float(0.0),
                    7 => Value::Double(0.0),
                    11 => Value::Long(0),
                    _ => Value::Int(0),
                };
                let array = self.alloc(HeapObject::Array {
                    type_code,
                    values: vec![fill; len as usize],
                });
                frame.push(array);
            }
            Arraylength => {
                let array = frame.pop()?;
                let len = self.array(array)?.len();
                frame.push(Value::Int(len as i32));
            }
            Iaload | Laload | Faload | Daload | Aaload | Baload | Caload | Saload => {
                let index = frame.pop_int()?;
                let array = frame.pop()?;
                let values = self.array(array)?;
                let value = usize::try_from(index)
                    .ok()
                    .and_then(|i| values.get(i))
                    .copied()
                    .ok_or(JvmError::ArrayIndex(index))?;
                frame.push(value);
            }
            Iastore | Lastore | Fastore | Dastore | Aastore | Bastore | Castore | Sastore => {
                let value = frame.pop()?;
                let index = frame.pop_int()?;
                let array = frame.pop()?;
                let HeapObject::Array { type_code, values } = self.deref_mut(array)? else {
                    return Err(bad(instr));
                };
                let value = match (instr.opcode, value) {
                    // boolean arrays keep the low bit
                    (Bastore, Value::Int(v)) if *type_code == 4 => Value::Int(v & 1),
                    (Bastore, Value::Int(v)) => Value::Int(i32::from(v as i8)),
                    (Castore, Value::Int(v)) => Value::Int(i32::from(v as u16)),
                    (Sastore, Value::Int(v)) => Value::Int(i32::from(v as i16)),
                    (_, v) => v,
                };
                let slot = usize::try_from(index)
                    .ok()
                    .and_then(|i| values.get_mut(i))
                    .ok_or(JvmError::ArrayIndex(index))?;
                *slot = value;
            }
            Checkcast => {
                frame.peek()?;
            }

            other => return Err(JvmError::Unsupported(other.name().to_string())),
        }
        Ok(Flow::Next)
    }
}

enum Flow {
    Next,
    Jump(usize),
    Return(Option<Value>),
}

struct Frame {
    stack: Vec<Value>,
    locals: Vec<Value>,
}

impl Frame {
    fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    fn pop(&mut self) -> JvmResult<Value> {
        self.stack
            .pop()
            .ok_or_else(|| JvmError::BadOperand("stack underflow".into()))
    }

    fn peek(&self) -> JvmResult<Value> {
        self.stack
            .last()
            .copied()
            .ok_or_else(|| JvmError::BadOperand("stack underflow".into()))
    }

    fn pop_n(&mut self, n: usize) -> JvmResult<Vec<Value>> {
        if self.stack.len() < n {
            return Err(JvmError::BadOperand("stack underflow".into()));
        }
        Ok(self.stack.split_off(self.stack.len() - n))
    }

    fn store(&mut self, slot: usize, value: Value) {
        self.locals[slot] = value;
        if value.width() == 2 {
            self.locals[slot + 1] = Value::Top;
        }
    }

    fn pop_int(&mut self) -> JvmResult<i32> {
        match self.pop()? {
            Value::Int(v) => Ok(v),
            other => Err(JvmError::BadOperand(format!("expected int, got {:?}", other))),
        }
    }

    fn pop_long(&mut self) -> JvmResult<i64> {
        match self.pop()? {
            Value::Long(v) => Ok(v),
            other => Err(JvmError::BadOperand(format!("expected long, got {:?}", other))),
        }
    }

    fn pop_float(&mut self) -> JvmResult<f32> {
        match self.pop()? {
            Value::Float(v) => Ok(v),
            other => Err(JvmError::BadOperand(format!("expected float, got {:?}", other))),
        }
    }

    fn pop_double(&mut self) -> JvmResult<f64> {
        match self.pop()? {
            Value::Double(v) => Ok(v),
            other => Err(JvmError::BadOperand(format!("expected double, got {:?}", other))),
        }
    }
}

fn bad(instr: &Instruction) -> JvmError {
    JvmError::BadOperand(format!("{} at {}: {:?}", instr.opcode, instr.offset, instr.operand))
}

fn local(instr: &Instruction) -> JvmResult<usize> {
    match instr.operand {
        Operand::Local(slot) => Ok(usize::from(slot)),
        _ => Err(bad(instr)),
    }
}

fn constant(instr: &Instruction) -> JvmResult<u16> {
    match instr.operand {
        Operand::Constant(index) => Ok(index),
        _ => Err(bad(instr)),
    }
}

fn branch(instr: &Instruction, taken: bool) -> JvmResult<Flow> {
    match (taken, &instr.operand) {
        (false, _) => Ok(Flow::Next),
        (true, Operand::Branch(target)) => Ok(Flow::Jump(*target)),
        _ => Err(bad(instr)),
    }
}

fn int_op(opcode: Opcode, a: i32, b: i32) -> JvmResult<i32> {
    Ok(match opcode {
        Opcode::Iadd => a.wrapping_add(b),
        Opcode::Isub => a.wrapping_sub(b),
        Opcode::Imul => a.wrapping_mul(b),
        Opcode::Idiv | Opcode::Irem if b == 0 => return Err(JvmError::DivideByZero),
        Opcode::Idiv => a.wrapping_div(b),
        Opcode::Irem => a.wrapping_rem(b),
        Opcode::Iand => a & b,
        Opcode::Ior => a | b,
        Opcode::Ixor => a ^ b,
        Opcode::Ishl => a << (b & 0x1f),
        Opcode::Ishr => a >> (b & 0x1f),
        _ => ((a as u32) >> (b & 0x1f)) as i32,
    })
}

fn long_op(opcode: Opcode, a: i64, b: i64) -> JvmResult<i64> {
    Ok(match opcode {
        Opcode::Ladd => a.wrapping_add(b),
        Opcode::Lsub => a.wrapping_sub(b),
        Opcode::Lmul => a.wrapping_mul(b),
        Opcode::Ldiv | Opcode::Lrem if b == 0 => return Err(JvmError::DivideByZero),
        Opcode::Ldiv => a.wrapping_div(b),
        Opcode::Lrem => a.wrapping_rem(b),
        Opcode::Land => a & b,
        Opcode::Lor => a | b,
        _ => a ^ b,
    })
}

/// `*cmpg` pushes 1 for NaN, `*cmpl` pushes -1
fn float_compare(a: f64, b: f64, nan_greater: bool) -> i32 {
    match a.partial_cmp(&b) {
        Some(ordering) => ordering as i32,
        None if nan_greater => 1,
        None => -1,
    }
}
