// AST (Abstract Syntax Tree) definitions for the script interpreter

use serde::Serialize;

/// Unique identifier for AST nodes, used for tracking execution position
pub type NodeId = usize;

/// Source location information for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
    /// Character offset from the start of the source
    pub offset: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self {
            line,
            column,
            offset,
        }
    }
}

/// Half-open character range `[start, end)` into the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub const DUMMY: Span = Span { start: 0, end: 0 };

    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Check if this span contains a character offset.
    pub fn contains(self, offset: usize) -> bool {
        offset >= self.start && offset < self.end
    }

    pub fn is_empty(self) -> bool {
        self.start >= self.end
    }

    pub fn len(self) -> usize {
        self.end.saturating_sub(self.start)
    }
}

/// Declaration keyword of a variable declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Var,
    Let,
    Const,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    // Comparison
    Eq,
    Ne,
    StrictEq,
    StrictNe,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Short-circuit operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,    // -x
    Plus,   // +x
    Not,    // !x
    Typeof, // typeof x
}

/// Assignment operators; `Compound` carries the arithmetic applied before storing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Compound(BinOp),
}

/// One `name = init` pair of a variable declaration
#[derive(Debug, Clone)]
pub struct Declarator {
    pub name: String,
    pub init: Option<NodeId>,
    pub span: Span,
}

/// Function literal shared by declarations, expressions and arrows
#[derive(Debug, Clone)]
pub struct FunctionDef {
    pub name: Option<String>,
    pub params: Vec<String>,
    /// `BlockStatement` for regular bodies, any expression for concise arrows
    pub body: NodeId,
    pub is_arrow: bool,
    pub expression_body: bool,
}

/// Object literal property
#[derive(Debug, Clone)]
pub struct Property {
    pub key: String,
    pub value: NodeId,
}

/// Member access property
#[derive(Debug, Clone)]
pub enum MemberProperty {
    Named(String),
    Computed(NodeId),
}

/// Switch case; `test == None` is the `default` clause
#[derive(Debug, Clone)]
pub struct SwitchCase {
    pub test: Option<NodeId>,
    pub consequent: Vec<NodeId>,
}

/// Node payloads. Children are referenced by [`NodeId`] into the owning [`Ast`].
#[derive(Debug, Clone)]
pub enum NodeKind {
    Program {
        body: Vec<NodeId>,
    },

    // Statements
    ExpressionStatement {
        expression: NodeId,
    },
    VariableDeclaration {
        kind: DeclKind,
        declarations: Vec<Declarator>,
    },
    FunctionDeclaration(FunctionDef),
    Return {
        argument: Option<NodeId>,
    },
    If {
        test: NodeId,
        consequent: NodeId,
        alternate: Option<NodeId>,
    },
    Block {
        body: Vec<NodeId>,
    },
    While {
        test: NodeId,
        body: NodeId,
    },
    DoWhile {
        body: NodeId,
        test: NodeId,
    },
    For {
        init: Option<NodeId>,
        test: Option<NodeId>,
        update: Option<NodeId>,
        body: NodeId,
    },
    Switch {
        discriminant: NodeId,
        cases: Vec<SwitchCase>,
    },
    Break,
    Continue,
    Throw {
        argument: NodeId,
    },
    Empty,

    // Expressions
    Number(f64),
    Str(String),
    Bool(bool),
    Null,
    Identifier(String),
    Array {
        elements: Vec<NodeId>,
    },
    Object {
        properties: Vec<Property>,
    },
    Function(FunctionDef),
    Unary {
        op: UnOp,
        argument: NodeId,
    },
    Update {
        increment: bool,
        prefix: bool,
        argument: NodeId,
    },
    Binary {
        op: BinOp,
        left: NodeId,
        right: NodeId,
    },
    Logical {
        op: LogicalOp,
        left: NodeId,
        right: NodeId,
    },
    Conditional {
        test: NodeId,
        consequent: NodeId,
        alternate: NodeId,
    },
    Assign {
        op: AssignOp,
        target: NodeId,
        value: NodeId,
    },
    Member {
        object: NodeId,
        property: MemberProperty,
    },
    Call {
        callee: NodeId,
        arguments: Vec<NodeId>,
    },
}

impl NodeKind {
    /// ESTree-style type name, used for stepping heuristics and diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            NodeKind::Program { .. } => "Program",
            NodeKind::ExpressionStatement { .. } => "ExpressionStatement",
            NodeKind::VariableDeclaration { .. } => "VariableDeclaration",
            NodeKind::FunctionDeclaration(_) => "FunctionDeclaration",
            NodeKind::Return { .. } => "ReturnStatement",
            NodeKind::If { .. } => "IfStatement",
            NodeKind::Block { .. } => "BlockStatement",
            NodeKind::While { .. } => "WhileStatement",
            NodeKind::DoWhile { .. } => "DoWhileStatement",
            NodeKind::For { .. } => "ForStatement",
            NodeKind::Switch { .. } => "SwitchStatement",
            NodeKind::Break => "BreakStatement",
            NodeKind::Continue => "ContinueStatement",
            NodeKind::Throw { .. } => "ThrowStatement",
            NodeKind::Empty => "EmptyStatement",
            NodeKind::Number(_) | NodeKind::Str(_) | NodeKind::Bool(_) | NodeKind::Null => {
                "Literal"
            }
            NodeKind::Identifier(_) => "Identifier",
            NodeKind::Array { .. } => "ArrayExpression",
            NodeKind::Object { .. } => "ObjectExpression",
            NodeKind::Function(def) if def.is_arrow => "ArrowFunctionExpression",
            NodeKind::Function(_) => "FunctionExpression",
            NodeKind::Unary { .. } => "UnaryExpression",
            NodeKind::Update { .. } => "UpdateExpression",
            NodeKind::Binary { .. } => "BinaryExpression",
            NodeKind::Logical { .. } => "LogicalExpression",
            NodeKind::Conditional { .. } => "ConditionalExpression",
            NodeKind::Assign { .. } => "AssignmentExpression",
            NodeKind::Member { .. } => "MemberExpression",
            NodeKind::Call { .. } => "CallExpression",
        }
    }

    /// Statements whose completion ends a stepping unit
    pub fn is_leaf_statement(&self) -> bool {
        matches!(
            self,
            NodeKind::ExpressionStatement { .. }
                | NodeKind::VariableDeclaration { .. }
                | NodeKind::Empty
        )
    }

    /// Statement nodes; everything else is an expression
    pub fn is_statement(&self) -> bool {
        matches!(
            self,
            NodeKind::Program { .. }
                | NodeKind::ExpressionStatement { .. }
                | NodeKind::VariableDeclaration { .. }
                | NodeKind::FunctionDeclaration(_)
                | NodeKind::Return { .. }
                | NodeKind::If { .. }
                | NodeKind::Block { .. }
                | NodeKind::While { .. }
                | NodeKind::DoWhile { .. }
                | NodeKind::For { .. }
                | NodeKind::Switch { .. }
                | NodeKind::Break
                | NodeKind::Continue
                | NodeKind::Throw { .. }
                | NodeKind::Empty
        )
    }

    pub fn is_loop(&self) -> bool {
        matches!(
            self,
            NodeKind::While { .. } | NodeKind::DoWhile { .. } | NodeKind::For { .. }
        )
    }
}

/// A single AST node
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
    pub location: SourceLocation,
}

/// Arena owning every node of a parsed program
#[derive(Debug, Clone, Default)]
pub struct Ast {
    pub nodes: Vec<Node>,
    /// The `Program` node, always the last one pushed by the parser
    pub root: NodeId,
}

impl Ast {
    pub fn new() -> Self {
        Ast::default()
    }

    pub fn push(&mut self, kind: NodeKind, span: Span, location: SourceLocation) -> NodeId {
        self.nodes.push(Node {
            kind,
            span,
            location,
        });
        self.nodes.len() - 1
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id].kind
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.nodes[id].span
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
