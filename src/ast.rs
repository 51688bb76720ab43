//! Resolved syntax tree of method bodies.
//!
//! Nodes live in a flat arena owned by [`Tree`] and refer to each other by
//! [`NodeId`]. Names are already resolved by the front-end: every variable,
//! parameter and field occurrence carries the [`DeclId`] of its declaration,
//! and every call to a known method carries its [`MethodId`].
//!
//! Trees are built bottom-up with [`TreeBuilder`].

use std::fmt;

use crate::algebra::{ArithOp, CmpOp};
use crate::error::AnalysisError;
use crate::types::{Annotation, TypeRef};

/// Identity of a node in a [`Tree`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub fn new(index: u32) -> Self {
        NodeId(index)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Identity of a variable, parameter or field declaration.
///
/// Variable states are keyed by declaration identity, never by name, so
/// shadowing and same-named fields stay distinct.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DeclId(u32);

impl DeclId {
    pub fn new(index: u32) -> Self {
        DeclId(index)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for DeclId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "d{}", self.0)
    }
}

/// Identity of a method declaration.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct MethodId(u32);

impl MethodId {
    pub fn new(index: u32) -> Self {
        MethodId(index)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DeclKind {
    Local,
    Param,
    Field,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decl {
    pub name: String,
    pub ty: TypeRef,
    pub annotations: Vec<Annotation>,
    pub kind: DeclKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDecl {
    pub name: String,
    pub params: Vec<DeclId>,
    pub return_type: TypeRef,
    /// Contract on the returned value.
    pub return_contract: Vec<Annotation>,
    /// `None` for abstract and native methods.
    pub body: Option<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Int(i64),
    Char(u16),
    Bool(bool),
    Str(String),
    Null,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

impl UnaryOp {
    pub fn is_increment(self) -> bool {
        matches!(
            self,
            UnaryOp::PreInc | UnaryOp::PreDec | UnaryOp::PostInc | UnaryOp::PostDec
        )
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BinaryOp {
    Arith(ArithOp),
    Cmp(CmpOp),
    /// Short-circuit `&&`.
    And,
    /// Short-circuit `||`.
    Or,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Literal(Literal),
    /// Local variable, parameter or unqualified field.
    Name(DeclId),
    This,
    Unary {
        op: UnaryOp,
        operand: NodeId,
    },
    Binary {
        op: BinaryOp,
        lhs: NodeId,
        rhs: NodeId,
    },
    /// `target = value`, or `target op= value` for compound assignments.
    Assign {
        op: Option<ArithOp>,
        target: NodeId,
        value: NodeId,
    },
    Conditional {
        cond: NodeId,
        then_value: NodeId,
        else_value: NodeId,
    },
    /// `method` is `None` when the callee could not be resolved.
    Call {
        method: Option<MethodId>,
        receiver: Option<NodeId>,
        args: Vec<NodeId>,
    },
    Field {
        target: Option<NodeId>,
        field: DeclId,
    },
    Index {
        array: NodeId,
        index: NodeId,
    },
    /// `target.length` on arrays, `target.length()` on strings.
    Length(NodeId),
    NewArray {
        elem: TypeRef,
        length: NodeId,
    },
    NewObject {
        ty: TypeRef,
        args: Vec<NodeId>,
    },
    InstanceOf {
        operand: NodeId,
        ty: TypeRef,
    },
    Cast {
        ty: TypeRef,
        operand: NodeId,
    },
    /// Any other expression. Children are still evaluated.
    Unknown(Vec<NodeId>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchCase {
    pub labels: Vec<Literal>,
    pub is_default: bool,
    pub body: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    Block(Vec<NodeId>),
    LocalDecl {
        decl: DeclId,
        init: Option<NodeId>,
    },
    Expr(NodeId),
    If {
        cond: NodeId,
        then_branch: NodeId,
        else_branch: Option<NodeId>,
    },
    While {
        cond: NodeId,
        body: NodeId,
    },
    DoWhile {
        body: NodeId,
        cond: NodeId,
    },
    /// `init` holds statements (declarations or expression statements).
    For {
        init: Vec<NodeId>,
        cond: Option<NodeId>,
        update: Vec<NodeId>,
        body: NodeId,
    },
    Switch {
        selector: NodeId,
        cases: Vec<SwitchCase>,
    },
    Return(Option<NodeId>),
    Throw(NodeId),
    Break,
    Continue,
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Stmt(Stmt),
    Expr(Expr),
}

/// Arena of nodes, declarations and methods.
#[derive(Debug, Clone, Default)]
pub struct Tree {
    nodes: Vec<Node>,
    decls: Vec<Decl>,
    methods: Vec<MethodDecl>,
}

impl Tree {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, AnalysisError> {
        self.nodes.get(id.index()).ok_or(AnalysisError::UnknownNode(id))
    }

    pub fn stmt(&self, id: NodeId) -> Result<&Stmt, AnalysisError> {
        match self.node(id)? {
            Node::Stmt(stmt) => Ok(stmt),
            Node::Expr(_) => Err(AnalysisError::ExpectedStatement(id)),
        }
    }

    pub fn expr(&self, id: NodeId) -> Result<&Expr, AnalysisError> {
        match self.node(id)? {
            Node::Expr(expr) => Ok(expr),
            Node::Stmt(_) => Err(AnalysisError::ExpectedExpression(id)),
        }
    }

    pub fn decl(&self, id: DeclId) -> Result<&Decl, AnalysisError> {
        self.decls.get(id.index()).ok_or(AnalysisError::UnknownDecl(id))
    }

    pub fn method(&self, id: MethodId) -> Result<&MethodDecl, AnalysisError> {
        self.methods.get(id.index()).ok_or(AnalysisError::UnknownMethod(id))
    }

    /// All declarations of the given kind.
    pub fn decls_of_kind(&self, kind: DeclKind) -> impl Iterator<Item = (DeclId, &Decl)> + '_ {
        self.decls
            .iter()
            .enumerate()
            .filter(move |(_, d)| d.kind == kind)
            .map(|(i, d)| (DeclId(i as u32), d))
    }

    /// Declaration a simple variable access refers to.
    ///
    /// Only plain names and fields of `this` qualify: those are the accesses
    /// whose value the state tracks and narrows.
    pub fn variable_of(&self, id: NodeId) -> Option<DeclId> {
        match self.expr(id).ok()? {
            Expr::Name(decl) => Some(*decl),
            Expr::Field { target: None, field } => Some(*field),
            Expr::Field {
                target: Some(target),
                field,
            } if matches!(self.expr(*target), Ok(Expr::This)) => Some(*field),
            _ => None,
        }
    }

    /// Human-readable name of an expression, for messages.
    pub fn describe(&self, id: NodeId) -> String {
        match self.variable_of(id).and_then(|d| self.decl(d).ok()) {
            Some(decl) => format!("`{}`", decl.name),
            None => match self.expr(id) {
                Ok(Expr::Call { method: Some(m), .. }) => match self.method(*m) {
                    Ok(method) => format!("result of `{}`", method.name),
                    Err(_) => "expression".to_string(),
                },
                _ => "expression".to_string(),
            },
        }
    }

    /// Whether evaluating the expression can modify a variable.
    pub fn has_side_effects(&self, id: NodeId) -> bool {
        let Ok(expr) = self.expr(id) else {
            return true;
        };
        let any = |ids: &[NodeId]| ids.iter().any(|&c| self.has_side_effects(c));
        match expr {
            Expr::Literal(_) | Expr::Name(_) | Expr::This => false,
            Expr::Assign { .. } | Expr::Call { .. } => true,
            Expr::Unary { op, operand } => op.is_increment() || self.has_side_effects(*operand),
            Expr::Binary { lhs, rhs, .. } => any(&[*lhs, *rhs]),
            Expr::Conditional {
                cond,
                then_value,
                else_value,
            } => any(&[*cond, *then_value, *else_value]),
            Expr::Field { target, .. } => target.is_some_and(|t| self.has_side_effects(t)),
            Expr::Index { array, index } => any(&[*array, *index]),
            Expr::Length(target) => self.has_side_effects(*target),
            Expr::NewArray { length, .. } => self.has_side_effects(*length),
            Expr::NewObject { args, .. } => any(args.as_slice()),
            Expr::InstanceOf { operand, .. } | Expr::Cast { operand, .. } => self.has_side_effects(*operand),
            Expr::Unknown(children) => any(children.as_slice()),
        }
    }
}

/// Bottom-up builder for [`Tree`]s.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    tree: Tree,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(self) -> Tree {
        self.tree
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.tree.nodes.len() as u32);
        self.tree.nodes.push(node);
        id
    }

    pub fn decl(&mut self, name: &str, ty: TypeRef, annotations: Vec<Annotation>, kind: DeclKind) -> DeclId {
        let id = DeclId(self.tree.decls.len() as u32);
        self.tree.decls.push(Decl {
            name: name.to_string(),
            ty,
            annotations,
            kind,
        });
        id
    }

    pub fn local(&mut self, name: &str, ty: TypeRef) -> DeclId {
        self.decl(name, ty, Vec::new(), DeclKind::Local)
    }

    pub fn param(&mut self, name: &str, ty: TypeRef, annotations: Vec<Annotation>) -> DeclId {
        self.decl(name, ty, annotations, DeclKind::Param)
    }

    pub fn field(&mut self, name: &str, ty: TypeRef, annotations: Vec<Annotation>) -> DeclId {
        self.decl(name, ty, annotations, DeclKind::Field)
    }

    pub fn method(
        &mut self,
        name: &str,
        params: Vec<DeclId>,
        return_type: TypeRef,
        return_contract: Vec<Annotation>,
        body: Option<NodeId>,
    ) -> MethodId {
        let id = MethodId(self.tree.methods.len() as u32);
        self.tree.methods.push(MethodDecl {
            name: name.to_string(),
            params,
            return_type,
            return_contract,
            body,
        });
        id
    }

    /// Attaches a body to a method declared earlier (for recursion).
    pub fn set_body(&mut self, method: MethodId, body: NodeId) {
        if let Some(m) = self.tree.methods.get_mut(method.index()) {
            m.body = Some(body);
        }
    }

    // Expressions.

    pub fn expr(&mut self, expr: Expr) -> NodeId {
        self.push(Node::Expr(expr))
    }

    pub fn int(&mut self, value: i64) -> NodeId {
        self.expr(Expr::Literal(Literal::Int(value)))
    }

    pub fn char_lit(&mut self, value: char) -> NodeId {
        let mut buf = [0u16; 2];
        let code = value.encode_utf16(&mut buf)[0];
        self.expr(Expr::Literal(Literal::Char(code)))
    }

    pub fn bool_lit(&mut self, value: bool) -> NodeId {
        self.expr(Expr::Literal(Literal::Bool(value)))
    }

    pub fn str_lit(&mut self, value: &str) -> NodeId {
        self.expr(Expr::Literal(Literal::Str(value.to_string())))
    }

    pub fn null(&mut self) -> NodeId {
        self.expr(Expr::Literal(Literal::Null))
    }

    pub fn name(&mut self, decl: DeclId) -> NodeId {
        self.expr(Expr::Name(decl))
    }

    pub fn this(&mut self) -> NodeId {
        self.expr(Expr::This)
    }

    pub fn unary(&mut self, op: UnaryOp, operand: NodeId) -> NodeId {
        self.expr(Expr::Unary { op, operand })
    }

    pub fn not(&mut self, operand: NodeId) -> NodeId {
        self.unary(UnaryOp::Not, operand)
    }

    pub fn binary(&mut self, op: BinaryOp, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.expr(Expr::Binary { op, lhs, rhs })
    }

    pub fn arith(&mut self, op: ArithOp, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.binary(BinaryOp::Arith(op), lhs, rhs)
    }

    pub fn cmp(&mut self, op: CmpOp, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.binary(BinaryOp::Cmp(op), lhs, rhs)
    }

    pub fn and(&mut self, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.binary(BinaryOp::And, lhs, rhs)
    }

    pub fn or(&mut self, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.binary(BinaryOp::Or, lhs, rhs)
    }

    pub fn assign_to(&mut self, target: NodeId, value: NodeId) -> NodeId {
        self.expr(Expr::Assign {
            op: None,
            target,
            value,
        })
    }

    /// `decl = value`
    pub fn assign(&mut self, decl: DeclId, value: NodeId) -> NodeId {
        let target = self.name(decl);
        self.assign_to(target, value)
    }

    /// `decl op= value`
    pub fn compound(&mut self, op: ArithOp, decl: DeclId, value: NodeId) -> NodeId {
        let target = self.name(decl);
        self.expr(Expr::Assign {
            op: Some(op),
            target,
            value,
        })
    }

    pub fn conditional(&mut self, cond: NodeId, then_value: NodeId, else_value: NodeId) -> NodeId {
        self.expr(Expr::Conditional {
            cond,
            then_value,
            else_value,
        })
    }

    pub fn call(&mut self, method: Option<MethodId>, receiver: Option<NodeId>, args: Vec<NodeId>) -> NodeId {
        self.expr(Expr::Call { method, receiver, args })
    }

    pub fn field_access(&mut self, target: Option<NodeId>, field: DeclId) -> NodeId {
        self.expr(Expr::Field { target, field })
    }

    pub fn index(&mut self, array: NodeId, index: NodeId) -> NodeId {
        self.expr(Expr::Index { array, index })
    }

    pub fn length(&mut self, target: NodeId) -> NodeId {
        self.expr(Expr::Length(target))
    }

    pub fn new_array(&mut self, elem: TypeRef, length: NodeId) -> NodeId {
        self.expr(Expr::NewArray { elem, length })
    }

    pub fn new_object(&mut self, ty: TypeRef, args: Vec<NodeId>) -> NodeId {
        self.expr(Expr::NewObject { ty, args })
    }

    // Statements.

    pub fn stmt(&mut self, stmt: Stmt) -> NodeId {
        self.push(Node::Stmt(stmt))
    }

    pub fn block(&mut self, stmts: Vec<NodeId>) -> NodeId {
        self.stmt(Stmt::Block(stmts))
    }

    pub fn declare(&mut self, decl: DeclId, init: Option<NodeId>) -> NodeId {
        self.stmt(Stmt::LocalDecl { decl, init })
    }

    pub fn expr_stmt(&mut self, expr: NodeId) -> NodeId {
        self.stmt(Stmt::Expr(expr))
    }

    pub fn if_then(&mut self, cond: NodeId, then_branch: NodeId) -> NodeId {
        self.stmt(Stmt::If {
            cond,
            then_branch,
            else_branch: None,
        })
    }

    pub fn if_else(&mut self, cond: NodeId, then_branch: NodeId, else_branch: NodeId) -> NodeId {
        self.stmt(Stmt::If {
            cond,
            then_branch,
            else_branch: Some(else_branch),
        })
    }

    pub fn while_loop(&mut self, cond: NodeId, body: NodeId) -> NodeId {
        self.stmt(Stmt::While { cond, body })
    }

    pub fn do_while(&mut self, body: NodeId, cond: NodeId) -> NodeId {
        self.stmt(Stmt::DoWhile { body, cond })
    }

    pub fn for_loop(&mut self, init: Vec<NodeId>, cond: Option<NodeId>, update: Vec<NodeId>, body: NodeId) -> NodeId {
        self.stmt(Stmt::For {
            init,
            cond,
            update,
            body,
        })
    }

    pub fn switch(&mut self, selector: NodeId, cases: Vec<SwitchCase>) -> NodeId {
        self.stmt(Stmt::Switch { selector, cases })
    }

    pub fn ret(&mut self, value: Option<NodeId>) -> NodeId {
        self.stmt(Stmt::Return(value))
    }

    pub fn throw(&mut self, value: NodeId) -> NodeId {
        self.stmt(Stmt::Throw(value))
    }

    pub fn break_stmt(&mut self) -> NodeId {
        self.stmt(Stmt::Break)
    }

    pub fn continue_stmt(&mut self) -> NodeId {
        self.stmt(Stmt::Continue)
    }

    pub fn empty(&mut self) -> NodeId {
        self.stmt(Stmt::Empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    #[test]
    fn test_lookup_kinds() {
        let mut b = TreeBuilder::new();
        let x = b.local("x", TypeRef::int());
        let e = b.name(x);
        let s = b.expr_stmt(e);
        let tree = b.build();

        assert!(tree.expr(e).is_ok());
        assert_eq!(tree.stmt(e), Err(AnalysisError::ExpectedStatement(e)));
        assert_eq!(tree.expr(s), Err(AnalysisError::ExpectedExpression(s)));
        let missing = NodeId::new(99);
        assert_eq!(tree.node(missing), Err(AnalysisError::UnknownNode(missing)));
        assert_eq!(tree.decl(DeclId::new(7)), Err(AnalysisError::UnknownDecl(DeclId::new(7))));
        assert_eq!(tree.decl(x).map(|d| d.name.as_str()), Ok("x"));
    }

    #[test]
    fn test_variable_of() {
        let mut b = TreeBuilder::new();
        let f = b.field("count", TypeRef::int(), vec![]);
        let this = b.this();
        let qualified = b.field_access(Some(this), f);
        let bare = b.field_access(None, f);
        let other = b.new_object(TypeRef::object("Foo"), vec![]);
        let foreign = b.field_access(Some(other), f);
        let tree = b.build();

        assert_eq!(tree.variable_of(qualified), Some(f));
        assert_eq!(tree.variable_of(bare), Some(f));
        assert_eq!(tree.variable_of(foreign), None);
        assert_eq!(tree.describe(bare), "`count`");
    }

    #[test]
    fn test_side_effects() {
        let mut b = TreeBuilder::new();
        let x = b.local("x", TypeRef::int());
        let read = b.name(x);
        let one = b.int(1);
        let pure = b.cmp(CmpOp::Lt, read, one);
        let bump = b.unary(UnaryOp::PostInc, read);
        let impure = b.cmp(CmpOp::Lt, bump, one);
        let tree = b.build();

        assert!(!tree.has_side_effects(pure));
        assert!(tree.has_side_effects(impure));
    }
}
