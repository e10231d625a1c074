//! High IR statements and control constructs

use crate::hir::Expr;
use crate::lir::Owner;
use brew_types::Type;

/// High IR statement
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// Evaluate and discard
    Expr(Expr),
    Assign {
        name: String,
        value: Expr,
    },
    /// `name += delta` on an int variable
    Increment {
        name: String,
        delta: i16,
    },
    SetField {
        object: Expr,
        owner: Owner,
        name: String,
        ty: Type,
        value: Expr,
    },
    SetStatic {
        owner: Owner,
        name: String,
        ty: Type,
        value: Expr,
    },
    ArraySet {
        array: Expr,
        index: Expr,
        value: Expr,
    },
    If(Conditional),
    Loop(Loop),
    Switch(Switch),
    Return(Expr),
    ReturnVoid,
    /// Skip to the next iteration of the innermost loop
    Continue,
    /// Leave the innermost loop
    Break,
}

impl Stmt {
    pub fn assign(name: impl Into<String>, value: Expr) -> Self {
        Stmt::Assign {
            name: name.into(),
            value,
        }
    }

    pub fn increment(name: impl Into<String>, delta: i16) -> Self {
        Stmt::Increment {
            name: name.into(),
            delta,
        }
    }

    pub fn set_static(owner: Owner, name: impl Into<String>, ty: Type, value: Expr) -> Self {
        Stmt::SetStatic {
            owner,
            name: name.into(),
            ty,
            value,
        }
    }

    pub fn set_field(object: Expr, owner: Owner, name: impl Into<String>, ty: Type, value: Expr) -> Self {
        Stmt::SetField {
            object,
            owner,
            name: name.into(),
            ty,
            value,
        }
    }

    pub fn array_set(array: Expr, index: Expr, value: Expr) -> Self {
        Stmt::ArraySet { array, index, value }
    }
}

impl From<Conditional> for Stmt {
    fn from(cond: Conditional) -> Self {
        Stmt::If(cond)
    }
}

impl From<Loop> for Stmt {
    fn from(lp: Loop) -> Self {
        Stmt::Loop(lp)
    }
}

impl From<Switch> for Stmt {
    fn from(switch: Switch) -> Self {
        Stmt::Switch(switch)
    }
}

/// One guarded arm of a conditional chain
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub condition: Expr,
    pub body: Vec<Stmt>,
}

/// `if` / `else if` / `else` chain
#[derive(Debug, Clone, PartialEq)]
pub struct Conditional {
    pub branches: Vec<Branch>,
    pub otherwise: Option<Vec<Stmt>>,
}

impl Conditional {
    pub fn new(condition: Expr, body: Vec<Stmt>) -> Self {
        Self {
            branches: vec![Branch { condition, body }],
            otherwise: None,
        }
    }

    pub fn else_if(mut self, condition: Expr, body: Vec<Stmt>) -> Self {
        self.branches.push(Branch { condition, body });
        self
    }

    pub fn or_else(mut self, body: Vec<Stmt>) -> Self {
        self.otherwise = Some(body);
        self
    }
}

/// Pre-tested loop; no condition loops until a `Break` or `Return`
#[derive(Debug, Clone, PartialEq)]
pub struct Loop {
    pub condition: Option<Expr>,
    pub body: Vec<Stmt>,
}

impl Loop {
    pub fn new(condition: Option<Expr>, body: Vec<Stmt>) -> Self {
        Self { condition, body }
    }

    pub fn while_true(condition: Expr, body: Vec<Stmt>) -> Self {
        Self::new(Some(condition), body)
    }

    pub fn infinite(body: Vec<Stmt>) -> Self {
        Self::new(None, body)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CaseKey {
    Int(i32),
    String(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    pub key: CaseKey,
    pub body: Vec<Stmt>,
}

/// Multi-way branch on a scrutinee. Cases never fall through.
#[derive(Debug, Clone, PartialEq)]
pub struct Switch {
    pub scrutinee: Expr,
    pub cases: Vec<SwitchCase>,
    pub default: Option<Vec<Stmt>>,
}

impl Switch {
    pub fn new(scrutinee: Expr) -> Self {
        Self {
            scrutinee,
            cases: Vec::new(),
            default: None,
        }
    }

    pub fn case(mut self, key: i32, body: Vec<Stmt>) -> Self {
        self.cases.push(SwitchCase {
            key: CaseKey::Int(key),
            body,
        });
        self
    }

    pub fn string_case(mut self, key: impl Into<String>, body: Vec<Stmt>) -> Self {
        self.cases.push(SwitchCase {
            key: CaseKey::String(key.into()),
            body,
        });
        self
    }

    pub fn default(mut self, body: Vec<Stmt>) -> Self {
        self.default = Some(body);
        self
    }

    /// At least one case and a non-empty default
    pub fn is_complete(&self) -> bool {
        !self.cases.is_empty() && self.default.as_ref().map_or(false, |d| !d.is_empty())
    }

    pub fn has_string_keys(&self) -> bool {
        self.cases
            .iter()
            .any(|c| matches!(c.key, CaseKey::String(_)))
    }
}
