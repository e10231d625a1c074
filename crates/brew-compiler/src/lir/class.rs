//! Class builder
//!
//! Collects the class header, fields, static initializer units and methods,
//! then drives the pipeline: resolve every method, drop dead private
//! methods, emit the class file.

use crate::dce::eliminate_dead_methods;
use crate::emit::emit_class;
use crate::error::{ClassCompileError, CompileResult};
use crate::hir::{Expr, Stmt};
use crate::lir::{ArrayLiteral, ArrayValues, InvokeKind, MemberRef, Method, Op, Owner};
use crate::options::CompilerOptions;
use brew_bytecode::access;
use brew_types::{MethodDescriptor, Type};
use log::debug;
use std::collections::BTreeMap;

/// Field declaration
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: Type,
    pub access: u16,
}

/// Everything about a class except its methods
#[derive(Debug, Clone)]
pub(crate) struct ClassHeader {
    pub name: String,
    pub super_name: String,
    pub interfaces: Vec<String>,
    pub access: u16,
    pub fields: Vec<Field>,
}

pub struct ClassBuilder {
    header: ClassHeader,
    static_inits: Vec<Method>,
    methods: BTreeMap<String, Vec<Method>>,
}

impl ClassBuilder {
    /// Public class extending `java/lang/Object`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            header: ClassHeader {
                name: name.into(),
                super_name: "java/lang/Object".to_string(),
                interfaces: Vec::new(),
                access: access::ACC_PUBLIC | access::ACC_SUPER,
                fields: Vec::new(),
            },
            static_inits: Vec::new(),
            methods: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.header.name
    }

    pub fn super_name(&self) -> &str {
        &self.header.super_name
    }

    pub fn extends(&mut self, super_name: impl Into<String>) -> &mut Self {
        self.header.super_name = super_name.into();
        self
    }

    pub fn implements(&mut self, interface: impl Into<String>) -> &mut Self {
        let interface = interface.into();
        if !self.header.interfaces.contains(&interface) {
            self.header.interfaces.push(interface);
        }
        self
    }

    pub fn interfaces(&self) -> &[String] {
        &self.header.interfaces
    }

    pub fn field(&mut self, name: impl Into<String>, ty: Type, access: u16) -> &mut Self {
        self.header.fields.push(Field {
            name: name.into(),
            ty,
            access,
        });
        self
    }

    pub fn static_field(&mut self, name: impl Into<String>, ty: Type, access: u16) -> &mut Self {
        self.field(name, ty, access | access::ACC_STATIC)
    }

    pub fn fields(&self) -> &[Field] {
        &self.header.fields
    }

    /// Start a new static initializer unit. Units run in creation order.
    pub fn static_init(&mut self) -> &mut Method {
        let unit = Method::new("<clinit>", Vec::new(), Type::VOID).with_access(access::ACC_STATIC);
        self.static_inits.push(unit);
        let last = self.static_inits.len() - 1;
        &mut self.static_inits[last]
    }

    /// Declare `public static final` array field `name` and fill it from a
    /// literal in a static initializer
    pub fn static_array_constant(
        &mut self,
        name: impl Into<String>,
        values: ArrayValues,
    ) -> CompileResult<&mut Self> {
        let name = name.into();
        let literal = ArrayLiteral::new(values)?;
        let ty = literal.ty();
        self.static_field(name.clone(), ty.clone(), access::ACC_PUBLIC | access::ACC_FINAL);
        self.static_init().push_stmt(Stmt::set_static(
            Owner::SelfClass,
            name,
            ty,
            Expr::ArrayLiteral(literal),
        ));
        Ok(self)
    }

    /// Add a method; overloads share a name
    pub fn method(&mut self, method: Method) -> &mut Method {
        let overloads = self.methods.entry(method.name().to_string()).or_default();
        overloads.push(method);
        let last = overloads.len() - 1;
        &mut overloads[last]
    }

    /// Public no-argument constructor that calls the super constructor
    pub fn default_constructor(&mut self) -> &mut Method {
        let super_init = Expr::call(
            InvokeKind::Special,
            Owner::class(self.header.super_name.clone()),
            "<init>",
            MethodDescriptor::new(Vec::new(), Type::VOID),
            vec![Expr::This],
        );
        let ctor = self.method(Method::new("<init>", Vec::new(), Type::VOID));
        ctor.push_stmt(Stmt::Expr(super_init));
        ctor
    }

    pub fn methods_named(&self, name: &str) -> &[Method] {
        self.methods.get(name).map_or(&[], Vec::as_slice)
    }

    /// Methods in name order, overloads in insertion order
    pub fn methods(&self) -> impl Iterator<Item = &Method> + '_ {
        self.methods.values().flatten()
    }

    pub fn static_inits(&self) -> &[Method] {
        &self.static_inits
    }

    /// Compile to class file bytes. No bytes are returned on any failure.
    pub fn compile(self, options: &CompilerOptions) -> Result<Vec<u8>, ClassCompileError> {
        let class = self.header.name.clone();
        self.compile_inner(options)
            .map_err(|source| ClassCompileError { class, source })
    }

    fn compile_inner(self, options: &CompilerOptions) -> CompileResult<Vec<u8>> {
        options.validate()?;
        let ClassBuilder {
            header,
            static_inits,
            methods,
        } = self;
        debug!("compiling class {}", header.name);

        let mut all: Vec<Method> = methods.into_values().flatten().collect();
        all.extend(static_initializer(static_inits)?);
        for method in &mut all {
            method.resolve(&header.name)?;
        }

        let kept = if options.eliminate_dead_methods {
            let before = all.len();
            let kept = eliminate_dead_methods(&header.name, all)?;
            debug!(
                "{}: kept {} of {} methods",
                header.name,
                kept.len(),
                before
            );
            kept
        } else {
            all
        };

        emit_class(&header, kept, options)
    }
}

/// Merge static initializer units into `<clinit>`.
///
/// A single unit becomes `<clinit>` itself. Several units become private
/// synthetic helpers called from a generated `<clinit>` in order, so each
/// keeps its own variable table.
fn static_initializer(mut units: Vec<Method>) -> CompileResult<Vec<Method>> {
    if units.len() <= 1 {
        return Ok(units);
    }

    let mut clinit =
        Method::new("<clinit>", Vec::new(), Type::VOID).with_access(access::ACC_STATIC);
    let entry = clinit.new_block();
    for (i, unit) in units.iter_mut().enumerate() {
        let helper = format!("clinit${}", i);
        unit.rename(helper.clone());
        unit.set_access(access::ACC_PRIVATE | access::ACC_STATIC | access::ACC_SYNTHETIC);
        clinit.block_mut(entry)?.push(Op::Invoke {
            kind: InvokeKind::Static,
            method: MemberRef::of_self(helper, "()V"),
        });
    }
    clinit.block_mut(entry)?.push(Op::ReturnVoid);
    units.push(clinit);
    Ok(units)
}
