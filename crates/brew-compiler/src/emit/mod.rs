//! Class file emission
//!
//! Turns a class header and its resolved methods into class file bytes.
//! With `verify_output` the bytes are decoded again and structurally
//! verified before they are returned.

mod code;
mod slots;
mod stack;

use crate::error::{CompileError, CompileResult};
use crate::lir::{ClassHeader, Method, MethodState};
use crate::options::CompilerOptions;
use brew_bytecode::{verify_class, ClassFile};
use code::CodeEmitter;
use log::debug;

pub(crate) fn emit_class(
    header: &ClassHeader,
    mut methods: Vec<Method>,
    options: &CompilerOptions,
) -> CompileResult<Vec<u8>> {
    let mut class = ClassFile::new(&header.name, &header.super_name, header.access)?;
    class.major_version = options.major_version;
    class.minor_version = options.minor_version;

    for interface in &header.interfaces {
        class.add_interface(interface)?;
    }
    for field in &header.fields {
        class.add_field(field.access, &field.name, &field.ty.descriptor()?)?;
    }

    for method in &mut methods {
        emit_method(&mut class, &header.name, method)?;
    }

    let bytes = class.encode()?;
    debug!(
        "emitted {}: {} bytes, {} methods, {} constants",
        header.name,
        bytes.len(),
        methods.len(),
        class.constant_pool.count()
    );

    if options.verify_output {
        let decoded = ClassFile::decode(&bytes)?;
        verify_class(&decoded)?;
    }
    Ok(bytes)
}

fn emit_method(class: &mut ClassFile, class_name: &str, method: &mut Method) -> CompileResult<()> {
    if method.state() != MethodState::Resolved {
        return Err(CompileError::internal(format!(
            "method {} is {:?}, expected Resolved",
            method.name(),
            method.state()
        )));
    }
    let descriptor = method.descriptor()?;

    let code = if method.has_code() {
        let code = CodeEmitter::new(&mut class.constant_pool, class_name, method)?.emit(method)?;
        debug!(
            "emitted {}.{}{}: {} bytes, max_stack {}, max_locals {}",
            class_name,
            method.name(),
            descriptor,
            code.code.len(),
            code.max_stack,
            code.max_locals
        );
        Some(code)
    } else {
        None
    };

    class.add_method(method.access(), method.name(), &descriptor, code)?;
    method.mark_emitted();
    Ok(())
}
