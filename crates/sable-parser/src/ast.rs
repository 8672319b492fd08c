use std::collections::BTreeMap;
use std::fmt;

/// Source position of a node (1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Pos {
    pub line: u32,
    pub column: u32,
}

impl Pos {
    pub fn new(line: u32, column: u32) -> Self {
        Pos { line, column }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A parsed source file.
#[derive(Debug, Clone, Default)]
pub struct File {
    pub path: String,
    pub stmts: Vec<Stmt>,
    /// Statements of `declare global { ... }` blocks.
    pub global: Vec<Stmt>,
    pub imports: Vec<Import>,
    /// File-level attribute comments (`// [name args]`).
    pub attributes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Import {
    /// `import * as alias`, or the last path segment.
    pub alias: Option<String>,
    /// `import { a, b }`
    pub names: Vec<String>,
    pub path: String,
    /// Filled in by the loader.
    pub abs_path: String,
    pub pos: Pos,
}

impl Import {
    /// The name the importing file uses to reach the module.
    pub fn local_name(&self) -> String {
        if let Some(alias) = &self.alias {
            return alias.clone();
        }
        let segment = self.path.rsplit('/').next().unwrap_or(&self.path);
        let segment = segment.strip_suffix(".ts").unwrap_or(segment);
        segment.replace(['-', '.'], "_")
    }
}

/// The main file plus everything it imports, keyed by absolute path.
#[derive(Debug, Clone, Default)]
pub struct ModuleGraph {
    pub main: File,
    pub modules: BTreeMap<String, File>,
    /// Merged `declare global` statements of every file.
    pub global: Vec<Stmt>,
}

impl ModuleGraph {
    /// A graph made of a single file.
    pub fn single(mut main: File) -> Self {
        let global = std::mem::take(&mut main.global);
        ModuleGraph {
            main,
            modules: BTreeMap::new(),
            global,
        }
    }

    pub fn module(&self, abs_path: &str) -> Option<&File> {
        if self.main.path == abs_path {
            return Some(&self.main);
        }
        self.modules.get(abs_path)
    }
}

pub type Block = Vec<Stmt>;

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Var(Vec<VarDecl>),
    Function(FuncDecl),
    Class(ClassDecl),
    Enum(EnumDecl),
    Assign {
        target: Expr,
        value: Expr,
        pos: Pos,
    },
    /// `x++` / `x--`
    Inc {
        target: Expr,
        op: IncOp,
        pos: Pos,
    },
    Expr(Expr),
    Return {
        value: Option<Expr>,
        pos: Pos,
    },
    Block(Block),
    If {
        branches: Vec<(Expr, Block)>,
        else_block: Option<Block>,
        pos: Pos,
    },
    Switch(SwitchStmt),
    For(ForStmt),
    While {
        label: Option<String>,
        cond: Expr,
        body: Block,
        pos: Pos,
    },
    Throw {
        value: Expr,
        pos: Pos,
    },
    Try(TryStmt),
    Break {
        label: Option<String>,
        pos: Pos,
    },
    Continue {
        label: Option<String>,
        pos: Pos,
    },
    Delete {
        object: Expr,
        property: Expr,
        pos: Pos,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncOp {
    Inc,
    Dec,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub name: String,
    pub value: Option<Expr>,
    pub is_const: bool,
    pub exported: bool,
    pub pos: Pos,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FuncDecl {
    /// Empty for anonymous functions.
    pub name: String,
    pub params: Vec<Param>,
    /// The last parameter collects the remaining arguments.
    pub variadic: bool,
    pub body: Block,
    pub exported: bool,
    pub private: bool,
    pub attributes: Vec<String>,
    pub pos: Pos,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassField {
    pub name: String,
    pub value: Option<Expr>,
    pub private: bool,
    pub pos: Pos,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub name: String,
    pub fields: Vec<ClassField>,
    /// Methods, the constructor included (named `constructor`).
    pub methods: Vec<FuncDecl>,
    pub exported: bool,
    pub pos: Pos,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnumInit {
    Int(i64),
    Str(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumMember {
    pub name: String,
    pub value: Option<EnumInit>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumDecl {
    pub name: String,
    pub members: Vec<EnumMember>,
    pub exported: bool,
    pub pos: Pos,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Case {
    pub value: Expr,
    pub stmts: Block,
    pub pos: Pos,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchStmt {
    pub label: Option<String>,
    pub value: Expr,
    pub cases: Vec<Case>,
    pub default: Option<Block>,
    pub pos: Pos,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForKind {
    Step {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        step: Option<Box<Stmt>>,
    },
    /// `for (let k in e)`: keys or indexes.
    In { name: String, expr: Expr },
    /// `for (let v of e)`: values.
    Of { name: String, expr: Expr },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForStmt {
    pub label: Option<String>,
    pub kind: ForKind,
    pub body: Block,
    pub pos: Pos,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TryStmt {
    pub body: Block,
    pub catch_ident: Option<String>,
    pub catch: Option<Block>,
    pub finally: Option<Block>,
    pub pos: Pos,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Str(String),
    Rune(char),
    Bool(bool),
    Null,
    Undefined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
    BitNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    BitOr,
    BitAnd,
    BitXor,
    Shl,
    Shr,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    And,
    Or,
    Nullish,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "**",
            BinaryOp::BitOr => "|",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::StrictEq => "===",
            BinaryOp::StrictNotEq => "!==",
            BinaryOp::Less => "<",
            BinaryOp::LessEq => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEq => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Nullish => "??",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MapKey {
    Str(String),
    Int(i64),
    /// `[expr]: value`
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Constant {
        value: Literal,
        pos: Pos,
    },
    Ident {
        name: String,
        pos: Pos,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        pos: Pos,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
        pos: Pos,
    },
    Ternary {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
        pos: Pos,
    },
    Array {
        items: Vec<Expr>,
        pos: Pos,
    },
    Map {
        entries: Vec<(MapKey, Expr)>,
        pos: Pos,
    },
    /// `a[i]` / `a?.[i]`. `first` marks the outermost link of an optional chain.
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
        optional: bool,
        first: bool,
        pos: Pos,
    },
    /// `a.b` / `a?.b`
    Selector {
        object: Box<Expr>,
        name: String,
        optional: bool,
        first: bool,
        pos: Pos,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        /// The last argument is spread.
        spread: bool,
        optional: bool,
        first: bool,
        pos: Pos,
    },
    New {
        class: Box<Expr>,
        args: Vec<Expr>,
        spread: bool,
        pos: Pos,
    },
    Function(Box<FuncDecl>),
}

impl Expr {
    pub fn pos(&self) -> Pos {
        match self {
            Expr::Constant { pos, .. }
            | Expr::Ident { pos, .. }
            | Expr::Unary { pos, .. }
            | Expr::Binary { pos, .. }
            | Expr::Ternary { pos, .. }
            | Expr::Array { pos, .. }
            | Expr::Map { pos, .. }
            | Expr::Index { pos, .. }
            | Expr::Selector { pos, .. }
            | Expr::Call { pos, .. }
            | Expr::New { pos, .. } => *pos,
            Expr::Function(f) => f.pos,
        }
    }

    /// True for links written with `?.`.
    pub fn is_optional(&self) -> bool {
        matches!(
            self,
            Expr::Index { optional: true, .. }
                | Expr::Selector { optional: true, .. }
                | Expr::Call { optional: true, .. }
        )
    }

    /// True when this node opens an optional chain.
    pub fn is_chain_start(&self) -> bool {
        matches!(
            self,
            Expr::Index { first: true, .. }
                | Expr::Selector { first: true, .. }
                | Expr::Call { first: true, .. }
        )
    }
}

impl Stmt {
    pub fn pos(&self) -> Pos {
        match self {
            Stmt::Var(decls) => decls.first().map(|d| d.pos).unwrap_or_default(),
            Stmt::Function(f) => f.pos,
            Stmt::Class(c) => c.pos,
            Stmt::Enum(e) => e.pos,
            Stmt::Expr(e) => e.pos(),
            Stmt::Block(b) => b.first().map(|s| s.pos()).unwrap_or_default(),
            Stmt::Switch(s) => s.pos,
            Stmt::For(f) => f.pos,
            Stmt::Try(t) => t.pos,
            Stmt::Assign { pos, .. }
            | Stmt::Inc { pos, .. }
            | Stmt::Return { pos, .. }
            | Stmt::If { pos, .. }
            | Stmt::While { pos, .. }
            | Stmt::Throw { pos, .. }
            | Stmt::Break { pos, .. }
            | Stmt::Continue { pos, .. }
            | Stmt::Delete { pos, .. } => *pos,
        }
    }
}
