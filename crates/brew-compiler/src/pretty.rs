//! Pretty-printing for the block IR
//!
//! Human-readable listings and a Graphviz view of the control flow graph,
//! for debugging lowering output.

use crate::lir::{Block, BlockId, ClassBuilder, Method, Op};
use std::fmt::{self, Write};

/// Trait for pretty-printing IR constructs
pub trait PrettyPrint {
    fn pretty_print(&self) -> String;
}

impl PrettyPrint for ClassBuilder {
    fn pretty_print(&self) -> String {
        let mut output = String::new();
        writeln!(output, "; class {} extends {}", self.name(), self.super_name()).unwrap();
        for interface in self.interfaces() {
            writeln!(output, ";   implements {}", interface).unwrap();
        }
        for field in self.fields() {
            writeln!(output, ";   field {}: {} [{:#06x}]", field.name, field.ty, field.access).unwrap();
        }
        writeln!(output).unwrap();

        for method in self.static_inits().iter().chain(self.methods()) {
            output.push_str(&method.pretty_print());
            writeln!(output).unwrap();
        }
        output
    }
}

impl PrettyPrint for Method {
    fn pretty_print(&self) -> String {
        let mut output = String::new();
        let descriptor = self
            .descriptor()
            .unwrap_or_else(|_| format!("{}", self.signature()));
        writeln!(
            output,
            "method {}{} [{:#06x}] {:?} {{",
            self.name(),
            descriptor,
            self.access(),
            self.state()
        )
        .unwrap();

        if let Some(vars) = self.vars() {
            let vars: Vec<String> = vars
                .iter()
                .map(|(_, name, ty)| format!("{}: {}", name, ty))
                .collect();
            writeln!(output, "  ; vars: {}", vars.join(", ")).unwrap();
        }
        if !self.pending().is_empty() {
            writeln!(output, "  ; {} statements pending", self.pending().len()).unwrap();
        }

        for (id, block) in self.body().iter() {
            output.push_str(&block_listing(id, block, 2));
        }

        writeln!(output, "}}").unwrap();
        output
    }
}

impl PrettyPrint for Block {
    fn pretty_print(&self) -> String {
        let mut output = String::new();
        for op in self.ops() {
            writeln!(output, "{}", op).unwrap();
        }
        output
    }
}

fn block_listing(id: BlockId, block: &Block, indent: usize) -> String {
    let mut output = String::new();
    let prefix = " ".repeat(indent);

    if let Some(label) = block.label() {
        writeln!(output, "{}{}: ; {}", prefix, id, label).unwrap();
    } else {
        writeln!(output, "{}{}:", prefix, id).unwrap();
    }

    for op in block.ops() {
        writeln!(output, "{}  {}", prefix, op).unwrap();
    }

    output
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::PushInt(v) => write!(f, "push {}", v),
            Op::PushLong(v) => write!(f, "push {}L", v),
            Op::PushFloat(v) => write!(f, "push {}f", v),
            Op::PushDouble(v) => write!(f, "push {}d", v),
            Op::PushString(v) => write!(f, "push {:?}", v),
            Op::PushNull => write!(f, "push null"),
            Op::Load { var, ty } => write!(f, "load {}: {}", var, ty),
            Op::Store { var, ty } => write!(f, "store {}: {}", var, ty),
            Op::Increment { var, delta } => write!(f, "inc {} {:+}", var, delta),
            Op::GetField(field) => write!(f, "getfield {}", field),
            Op::PutField(field) => write!(f, "putfield {}", field),
            Op::GetStatic(field) => write!(f, "getstatic {}", field),
            Op::PutStatic(field) => write!(f, "putstatic {}", field),
            Op::Invoke { kind, method } => {
                write!(f, "invoke{} {}", format!("{:?}", kind).to_lowercase(), method)
            }
            Op::Jump { cond, target } => write!(f, "{} {}", cond.opcode(), target),
            Op::TableSwitch {
                low,
                targets,
                default,
            } => {
                write!(f, "tableswitch")?;
                for (i, target) in targets.iter().enumerate() {
                    write!(f, " {}=>{}", i64::from(*low) + i as i64, target)?;
                }
                write!(f, " default=>{}", default)
            }
            Op::LookupSwitch { pairs, default } => {
                write!(f, "lookupswitch")?;
                for (key, target) in pairs {
                    write!(f, " {}=>{}", key, target)?;
                }
                write!(f, " default=>{}", default)
            }
            Op::Return { ty } => write!(f, "return {}", ty),
            Op::ReturnVoid => write!(f, "return"),
            Op::Raw(opcode) => write!(f, "{}", opcode),
            Op::New(owner) => write!(f, "new {}", owner),
            Op::NewArray { element } => write!(f, "newarray {}", element),
            Op::ArrayLiteral(lit) => write!(f, "array {} x{}", lit.ty(), lit.len()),
            Op::CheckCast(owner) => write!(f, "checkcast {}", owner),
        }
    }
}

/// Graphviz rendering of a method's block graph.
///
/// Solid edges are jumps and switch arms, dashed edges fall through.
pub fn cfg_dot(method: &Method) -> String {
    let mut output = String::new();
    writeln!(output, "digraph \"{}\" {{", method.name()).unwrap();
    writeln!(output, "  node [shape=box, fontname=monospace];").unwrap();

    let body = method.body();
    let layout = body.layout();
    for (pos, (id, block)) in body.iter().enumerate() {
        let mut label = match block.label() {
            Some(name) => format!("{} ({})\\l", id, name),
            None => format!("{}\\l", id),
        };
        for op in block.ops() {
            label.push_str(&op.to_string().replace('"', "\\\""));
            label.push_str("\\l");
        }
        writeln!(output, "  {} [label=\"{}\"];", id, label).unwrap();

        for op in block.ops() {
            for target in op.targets() {
                writeln!(output, "  {} -> {};", id, target).unwrap();
            }
        }
        if !block.is_terminated() {
            if let Some(next) = layout.get(pos + 1) {
                writeln!(output, "  {} -> {} [style=dashed];", id, next).unwrap();
            }
        }
    }

    writeln!(output, "}}").unwrap();
    output
}
