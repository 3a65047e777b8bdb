use std::rc::Rc;

use crate::frontend::lexer::Ops;
use crate::frontend::location::SourceLocation;

// Closed set of node kinds matched exhaustively by the interpreter, every
// node owns its children and carries the range it was parsed from.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationKind {
    Const,
    Let,
    Var,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Program {
        body: Vec<Node>,
    },
    VariableDeclaration {
        kind: DeclarationKind,
        declarations: Vec<Node>,
    },
    VariableDeclarator {
        id: Box<Node>,
        init: Option<Box<Node>>,
    },
    BinaryExpression {
        operator: Ops,
        left: Box<Node>,
        right: Box<Node>,
    },
    Identifier {
        name: String,
    },
    NumericLiteral {
        value: f64,
    },
    StringLiteral {
        value: String,
    },
    ExpressionStatement {
        expression: Box<Node>,
    },
    CallExpression {
        callee: Box<Node>,
        arguments: Vec<Node>,
    },
    MemberExpression {
        object: Box<Node>,
        property: Box<Node>,
    },
    // The body is shared so function values can outlive the tree they came from
    FunctionDeclaration {
        id: Box<Node>,
        params: Vec<String>,
        body: Rc<Node>,
    },
    BlockStatement {
        body: Vec<Node>,
    },
    ReturnStatement {
        argument: Option<Box<Node>>,
    },
}

impl NodeKind {
    /// The discriminator text reported in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Program { .. } => "Program",
            NodeKind::VariableDeclaration { .. } => "VariableDeclaration",
            NodeKind::VariableDeclarator { .. } => "VariableDeclarator",
            NodeKind::BinaryExpression { .. } => "BinaryExpression",
            NodeKind::Identifier { .. } => "Identifier",
            NodeKind::NumericLiteral { .. } => "NumericLiteral",
            NodeKind::StringLiteral { .. } => "StringLiteral",
            NodeKind::ExpressionStatement { .. } => "ExpressionStatement",
            NodeKind::CallExpression { .. } => "CallExpression",
            NodeKind::MemberExpression { .. } => "MemberExpression",
            NodeKind::FunctionDeclaration { .. } => "FunctionDeclaration",
            NodeKind::BlockStatement { .. } => "BlockStatement",
            NodeKind::ReturnStatement { .. } => "ReturnStatement",
        }
    }
}

impl Node {
    pub fn new(kind: NodeKind, loc: SourceLocation) -> Self {
        Self { kind, loc }
    }

    pub fn identifier(name: impl Into<String>, loc: SourceLocation) -> Self {
        Self::new(NodeKind::Identifier { name: name.into() }, loc)
    }

    pub fn number(value: f64, loc: SourceLocation) -> Self {
        Self::new(NodeKind::NumericLiteral { value }, loc)
    }

    /// The text of an `Identifier` node, `None` for every other kind.
    pub fn as_identifier(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Identifier { name } => Some(name),
            _ => None,
        }
    }

    pub fn is_return(&self) -> bool {
        matches!(self.kind, NodeKind::ReturnStatement { .. })
    }
}
