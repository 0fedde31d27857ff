//! Recursive-descent grammar for Jay source files.
//!
//! Parsing fails fast: the first syntax error is reported with its line and
//! the parse returns `None`, matching the one-class-per-file contract where
//! later phases never see a partial tree.

use crate::diagnostics::Diagnostics;
use crate::parser::ast::{Ast, NodeId, NodeKind};
use crate::parser::lexer::{Token, TokenKind, lex, token_text};

struct Parser<'s> {
    source: &'s str,
    tokens: Vec<Token>,
    pos: usize,
    ast: Ast,
    diagnostics: &'s mut Diagnostics,
}

type Parse<T> = Option<T>;

impl<'s> Parser<'s> {
    fn new(source: &'s str, diagnostics: &'s mut Diagnostics) -> Self {
        Self {
            source,
            tokens: lex(source),
            pos: 0,
            ast: Ast::new(),
            diagnostics,
        }
    }

    fn peek(&self) -> Option<TokenKind> {
        self.tokens.get(self.pos).map(|t| t.kind)
    }

    fn peek_at(&self, offset: usize) -> Option<TokenKind> {
        self.tokens.get(self.pos + offset).map(|t| t.kind)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek() == Some(kind)
    }

    fn current_line(&self) -> u32 {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|t| t.line)
            .unwrap_or(1)
    }

    fn bump(&mut self) -> Token {
        let token = self.tokens[self.pos];
        self.pos += 1;
        token
    }

    fn text(&self, token: &Token) -> &'s str {
        token_text(self.source, token)
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn syntax_error<T>(&mut self, expected: &str) -> Parse<T> {
        let found = match self.tokens.get(self.pos).copied() {
            Some(token) => format!("{:?}", self.text(&token)),
            None => "end of file".to_string(),
        };
        let line = self.current_line();
        self.diagnostics
            .error(format!("Syntax error: expected {expected}, found {found}"), line);
        None
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> Parse<Token> {
        if self.at(kind) {
            Some(self.bump())
        } else {
            self.syntax_error(expected)
        }
    }

    // ---- Types ----------------------------------------------------------

    /// `type := ("var" | "auto") | Identifier ("[" "]")*`
    fn parse_type(&mut self) -> Parse<NodeId> {
        match self.peek() {
            Some(TokenKind::VarKw | TokenKind::AutoKw) => {
                let token = self.bump();
                Some(self.ast.leaf(NodeKind::Auto, token.line))
            }
            Some(TokenKind::Identifier) => {
                let token = self.bump();
                let name = self.ast.token_node(NodeKind::Identifier, self.text(&token), token.line);
                let mut ty = self.ast.node(NodeKind::Type, &[name], token.line);
                while self.at(TokenKind::LBracket) && self.peek_at(1) == Some(TokenKind::RBracket) {
                    self.bump();
                    self.bump();
                    ty = self.ast.node(NodeKind::TypeArray, &[ty], token.line);
                }
                Some(ty)
            }
            _ => self.syntax_error("a type"),
        }
    }

    fn parse_return_type(&mut self) -> Parse<NodeId> {
        if self.at(TokenKind::VoidKw) {
            let token = self.bump();
            Some(self.ast.leaf(NodeKind::Void, token.line))
        } else {
            self.parse_type()
        }
    }

    fn parse_identifier(&mut self) -> Parse<NodeId> {
        let token = self.expect(TokenKind::Identifier, "an identifier")?;
        Some(self.ast.token_node(NodeKind::Identifier, self.text(&token), token.line))
    }

    // ---- Expressions ----------------------------------------------------

    fn parse_expression(&mut self) -> Parse<NodeId> {
        self.parse_assignment()
    }

    fn assignment_op_kind(kind: TokenKind) -> Option<NodeKind> {
        match kind {
            TokenKind::Assign => Some(NodeKind::Assign),
            TokenKind::PlusAssign => Some(NodeKind::PlusAssign),
            TokenKind::MinusAssign => Some(NodeKind::MinusAssign),
            TokenKind::MultAssign => Some(NodeKind::MultAssign),
            TokenKind::DivAssign => Some(NodeKind::DivAssign),
            TokenKind::ModAssign => Some(NodeKind::ModAssign),
            TokenKind::AndAssign => Some(NodeKind::AndAssign),
            TokenKind::OrAssign => Some(NodeKind::OrAssign),
            TokenKind::XorAssign => Some(NodeKind::XorAssign),
            TokenKind::LeftShiftAssign => Some(NodeKind::LeftShiftAssign),
            TokenKind::RightShiftAssign => Some(NodeKind::RightShiftAssign),
            TokenKind::UnsignedRightShiftAssign => Some(NodeKind::UnsignedRightShiftAssign),
            _ => None,
        }
    }

    /// Right-associative assignment over the ternary level.
    fn parse_assignment(&mut self) -> Parse<NodeId> {
        let lhs = self.parse_ternary()?;
        let Some(op_kind) = self.peek().and_then(Self::assignment_op_kind) else {
            return Some(lhs);
        };
        let op_token = self.bump();
        let op = self.ast.leaf(op_kind, op_token.line);
        let rhs = self.parse_assignment()?;
        Some(
            self.ast
                .node(NodeKind::AssignmentExpression, &[lhs, op, rhs], op_token.line),
        )
    }

    fn parse_ternary(&mut self) -> Parse<NodeId> {
        let condition = self.parse_binary(0)?;
        if !self.at(TokenKind::Question) {
            return Some(condition);
        }
        let token = self.bump();
        let then_value = self.parse_expression()?;
        self.expect(TokenKind::Colon, "':'")?;
        let else_value = self.parse_ternary()?;
        Some(self.ast.node(
            NodeKind::Ternary,
            &[condition, then_value, else_value],
            token.line,
        ))
    }

    /// Binary operator tiers, loosest first.
    const BINARY_TIERS: &'static [&'static [(TokenKind, NodeKind)]] = &[
        &[(TokenKind::PipePipe, NodeKind::BooleanOr)],
        &[(TokenKind::AndAnd, NodeKind::BooleanAnd)],
        &[(TokenKind::Pipe, NodeKind::BitwiseOr)],
        &[(TokenKind::Caret, NodeKind::Xor)],
        &[(TokenKind::Ampersand, NodeKind::BitwiseAnd)],
        &[
            (TokenKind::EqualsEquals, NodeKind::Equals),
            (TokenKind::NotEquals, NodeKind::NotEquals),
        ],
        &[
            (TokenKind::Less, NodeKind::LessThan),
            (TokenKind::LessEquals, NodeKind::LessThanOrEqualTo),
            (TokenKind::Greater, NodeKind::GreaterThan),
            (TokenKind::GreaterEquals, NodeKind::GreaterThanOrEqualTo),
        ],
        &[
            (TokenKind::LeftShift, NodeKind::LeftShift),
            (TokenKind::RightShift, NodeKind::RightShift),
            (TokenKind::UnsignedRightShift, NodeKind::UnsignedRightShift),
        ],
        &[
            (TokenKind::Plus, NodeKind::Plus),
            (TokenKind::Minus, NodeKind::Minus),
        ],
        &[
            (TokenKind::Star, NodeKind::Mult),
            (TokenKind::Slash, NodeKind::Div),
            (TokenKind::Percent, NodeKind::Mod),
        ],
    ];

    fn parse_binary(&mut self, tier: usize) -> Parse<NodeId> {
        if tier == Self::BINARY_TIERS.len() {
            return self.parse_unary();
        }
        let mut lhs = self.parse_binary(tier + 1)?;
        loop {
            let Some(current) = self.peek() else {
                return Some(lhs);
            };
            let Some((_, node_kind)) = Self::BINARY_TIERS[tier]
                .iter()
                .find(|(token_kind, _)| *token_kind == current)
            else {
                return Some(lhs);
            };
            let token = self.bump();
            let rhs = self.parse_binary(tier + 1)?;
            lhs = self.ast.node(*node_kind, &[lhs, rhs], token.line);
        }
    }

    fn parse_unary(&mut self) -> Parse<NodeId> {
        let kind = match self.peek() {
            Some(TokenKind::Minus) => NodeKind::Negate,
            Some(TokenKind::Bang) => NodeKind::Not,
            Some(TokenKind::Tilde) => NodeKind::BitwiseInvert,
            Some(TokenKind::PlusPlus) => NodeKind::PreIncrement,
            Some(TokenKind::MinusMinus) => NodeKind::PreDecrement,
            _ => return self.parse_postfix(),
        };
        let token = self.bump();
        let operand = self.parse_unary()?;
        Some(self.ast.node(kind, &[operand], token.line))
    }

    fn parse_postfix(&mut self) -> Parse<NodeId> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek() {
                Some(TokenKind::LBracket) => {
                    let token = self.bump();
                    let index = self.parse_expression()?;
                    self.expect(TokenKind::RBracket, "']'")?;
                    expr = self.ast.node(NodeKind::ArrayGet, &[expr, index], token.line);
                }
                Some(TokenKind::Dot) => {
                    let token = self.bump();
                    self.expect(TokenKind::LengthKw, "'length'")?;
                    expr = self.ast.node(NodeKind::ArrayLength, &[expr], token.line);
                }
                Some(TokenKind::PlusPlus) => {
                    let token = self.bump();
                    expr = self.ast.node(NodeKind::PostIncrement, &[expr], token.line);
                }
                Some(TokenKind::MinusMinus) => {
                    let token = self.bump();
                    expr = self.ast.node(NodeKind::PostDecrement, &[expr], token.line);
                }
                _ => return Some(expr),
            }
        }
    }

    fn parse_primary(&mut self) -> Parse<NodeId> {
        match self.peek() {
            Some(TokenKind::TrueKw) => {
                let token = self.bump();
                Some(self.ast.leaf(NodeKind::True, token.line))
            }
            Some(TokenKind::FalseKw) => {
                let token = self.bump();
                Some(self.ast.leaf(NodeKind::False, token.line))
            }
            Some(TokenKind::IntLiteral) => {
                let token = self.bump();
                Some(self.ast.token_node(NodeKind::IntLiteral, self.text(&token), token.line))
            }
            Some(TokenKind::FloatLiteral) => {
                let token = self.bump();
                Some(
                    self.ast
                        .token_node(NodeKind::FloatLiteral, self.text(&token), token.line),
                )
            }
            Some(TokenKind::Identifier) => {
                let token = self.bump();
                let identifier =
                    self.ast
                        .token_node(NodeKind::Identifier, self.text(&token), token.line);
                if self.at(TokenKind::LParen) {
                    self.bump();
                    let args = if self.at(TokenKind::RParen) {
                        None
                    } else {
                        Some(self.parse_expression_list()?)
                    };
                    self.expect(TokenKind::RParen, "')'")?;
                    Some(self.ast.node_with_slots(
                        NodeKind::MethodCall,
                        [Some(identifier), args, None, None],
                        token.line,
                    ))
                } else {
                    Some(identifier)
                }
            }
            Some(TokenKind::LParen) => {
                self.bump();
                let expr = self.parse_expression()?;
                self.expect(TokenKind::RParen, "')'")?;
                Some(expr)
            }
            _ => {
                self.syntax_error("an expression")?;
                None
            }
        }
    }

    /// `expressionList := expression ("," expression)*`, left-recursive:
    /// a single expression is itself; more wrap in `ExpressionList` nodes.
    fn parse_expression_list(&mut self) -> Parse<NodeId> {
        let mut list = self.parse_expression()?;
        while self.at(TokenKind::Comma) {
            let token = self.bump();
            let next = self.parse_expression()?;
            list = self
                .ast
                .node(NodeKind::ExpressionList, &[list, next], token.line);
        }
        Some(list)
    }

    // ---- Statements -----------------------------------------------------

    /// Expressions allowed as statements: assignments, method calls, and
    /// increments/decrements.
    fn parse_statement_expression(&mut self) -> Parse<NodeId> {
        let line = self.current_line();
        let expr = self.parse_expression()?;
        match self.ast.kind(expr) {
            NodeKind::AssignmentExpression
            | NodeKind::MethodCall
            | NodeKind::PreIncrement
            | NodeKind::PreDecrement
            | NodeKind::PostIncrement
            | NodeKind::PostDecrement => Some(expr),
            _ => {
                self.diagnostics
                    .error("Syntax error: expression cannot be used as a statement", line);
                None
            }
        }
    }

    fn parse_block(&mut self) -> Parse<NodeId> {
        let open = self.expect(TokenKind::LBrace, "'{'")?;
        let list = self.parse_statement_list(TokenKind::RBrace)?;
        self.expect(TokenKind::RBrace, "'}'")?;
        Some(self.ast.node(NodeKind::Block, &[list], open.line))
    }

    /// Parses statements until `end`, building the left-recursive
    /// `StatementList` chain rooted in an `EmptyStatementList`.
    fn parse_statement_list(&mut self, end: TokenKind) -> Parse<NodeId> {
        let mut list = self.ast.leaf(NodeKind::EmptyStatementList, self.current_line());
        while !self.at(end) {
            if self.peek().is_none() {
                self.syntax_error("a statement")?;
            }
            let statement = self.parse_statement()?;
            let line = self.ast.line(statement);
            list = self
                .ast
                .node(NodeKind::StatementList, &[list, statement], line);
        }
        Some(list)
    }

    fn parse_statement(&mut self) -> Parse<NodeId> {
        match self.peek() {
            Some(TokenKind::LBrace) => self.parse_block(),
            Some(TokenKind::Semicolon) => {
                let token = self.bump();
                Some(self.ast.leaf(NodeKind::EmptyStatement, token.line))
            }
            Some(TokenKind::IfKw) => self.parse_if(),
            Some(TokenKind::WhileKw) => self.parse_while(),
            Some(TokenKind::DoKw) => self.parse_do_while(),
            Some(TokenKind::ForKw) => self.parse_for(),
            Some(TokenKind::SwitchKw) => self.parse_switch(),
            Some(TokenKind::BreakKw) => self.parse_jump(NodeKind::Break),
            Some(TokenKind::ContinueKw) => self.parse_jump(NodeKind::Continue),
            Some(TokenKind::ReturnKw) => self.parse_return(),
            Some(TokenKind::VarKw | TokenKind::AutoKw) => self.parse_var_declaration(),
            Some(TokenKind::Identifier) if self.starts_declaration() => {
                self.parse_var_declaration()
            }
            _ => {
                let expr = self.parse_statement_expression()?;
                self.expect(TokenKind::Semicolon, "';'")?;
                Some(expr)
            }
        }
    }

    /// Whether the upcoming tokens look like `Type name` rather than an
    /// expression: `Identifier Identifier` or `Identifier ([])+ Identifier`.
    fn starts_declaration(&self) -> bool {
        let mut offset = 1;
        while self.peek_at(offset) == Some(TokenKind::LBracket)
            && self.peek_at(offset + 1) == Some(TokenKind::RBracket)
        {
            offset += 2;
        }
        self.peek_at(offset) == Some(TokenKind::Identifier)
    }

    fn parse_if(&mut self) -> Parse<NodeId> {
        let token = self.bump();
        self.expect(TokenKind::LParen, "'('")?;
        let condition = self.parse_expression()?;
        self.expect(TokenKind::RParen, "')'")?;
        let then_statement = self.parse_statement()?;
        if self.eat(TokenKind::ElseKw) {
            let else_statement = self.parse_statement()?;
            Some(self.ast.node(
                NodeKind::IfElse,
                &[condition, then_statement, else_statement],
                token.line,
            ))
        } else {
            Some(
                self.ast
                    .node(NodeKind::If, &[condition, then_statement], token.line),
            )
        }
    }

    fn parse_while(&mut self) -> Parse<NodeId> {
        let token = self.bump();
        self.expect(TokenKind::LParen, "'('")?;
        let condition = self.parse_expression()?;
        self.expect(TokenKind::RParen, "')'")?;
        let body = self.parse_statement()?;
        Some(self.ast.node(NodeKind::While, &[condition, body], token.line))
    }

    fn parse_do_while(&mut self) -> Parse<NodeId> {
        let token = self.bump();
        let body = self.parse_statement()?;
        self.expect(TokenKind::WhileKw, "'while'")?;
        self.expect(TokenKind::LParen, "'('")?;
        let condition = self.parse_expression()?;
        self.expect(TokenKind::RParen, "')'")?;
        self.expect(TokenKind::Semicolon, "';'")?;
        Some(self.ast.node(NodeKind::DoWhile, &[body, condition], token.line))
    }

    /// Whether the tokens after `for (` form a for-in header.
    fn at_for_in_header(&self) -> bool {
        let mut offset = 0;
        match self.peek_at(offset) {
            Some(TokenKind::VarKw | TokenKind::AutoKw) => offset += 1,
            Some(TokenKind::Identifier) => {
                // Either `Type name in` or the bare `name in`.
                if self.peek_at(1) == Some(TokenKind::InKw) {
                    return true;
                }
                offset += 1;
                while self.peek_at(offset) == Some(TokenKind::LBracket)
                    && self.peek_at(offset + 1) == Some(TokenKind::RBracket)
                {
                    offset += 2;
                }
            }
            _ => return false,
        }
        self.peek_at(offset) == Some(TokenKind::Identifier)
            && self.peek_at(offset + 1) == Some(TokenKind::InKw)
    }

    fn parse_for(&mut self) -> Parse<NodeId> {
        let token = self.bump();
        self.expect(TokenKind::LParen, "'('")?;

        if self.at_for_in_header() {
            let ty = if self.at(TokenKind::Identifier) && self.peek_at(1) == Some(TokenKind::InKw) {
                self.ast.leaf(NodeKind::Auto, token.line)
            } else {
                self.parse_type()?
            };
            let variable = self.parse_identifier()?;
            self.expect(TokenKind::InKw, "'in'")?;
            let collection = self.parse_expression()?;
            self.expect(TokenKind::RParen, "')'")?;
            let body = self.parse_statement()?;
            return Some(self.ast.node(
                NodeKind::ForIn,
                &[ty, variable, collection, body],
                token.line,
            ));
        }

        // Initialization: a declaration, an expression statement, or empty.
        let init = if self.eat(TokenKind::Semicolon) {
            self.ast.leaf(NodeKind::EmptyStatementList, token.line)
        } else {
            let statement = if self.at(TokenKind::VarKw)
                || self.at(TokenKind::AutoKw)
                || (self.at(TokenKind::Identifier) && self.starts_declaration())
            {
                self.parse_var_declaration()?
            } else {
                let expr = self.parse_statement_expression()?;
                self.expect(TokenKind::Semicolon, "';'")?;
                expr
            };
            let empty = self.ast.leaf(NodeKind::EmptyStatementList, token.line);
            self.ast
                .node(NodeKind::StatementList, &[empty, statement], token.line)
        };

        // Condition: empty means `true`.
        let condition = if self.at(TokenKind::Semicolon) {
            self.ast.leaf(NodeKind::True, self.current_line())
        } else {
            self.parse_expression()?
        };
        self.expect(TokenKind::Semicolon, "';'")?;

        // Step: an expression statement or empty.
        let step = if self.at(TokenKind::RParen) {
            self.ast.leaf(NodeKind::EmptyStatementList, self.current_line())
        } else {
            let expr = self.parse_statement_expression()?;
            let line = self.ast.line(expr);
            let empty = self.ast.leaf(NodeKind::EmptyStatementList, line);
            self.ast.node(NodeKind::StatementList, &[empty, expr], line)
        };
        self.expect(TokenKind::RParen, "')'")?;
        let body = self.parse_statement()?;
        Some(
            self.ast
                .node(NodeKind::For, &[init, condition, step, body], token.line),
        )
    }

    fn parse_switch(&mut self) -> Parse<NodeId> {
        let token = self.bump();
        self.expect(TokenKind::LParen, "'('")?;
        let scrutinee = self.parse_expression()?;
        self.expect(TokenKind::RParen, "')'")?;
        self.expect(TokenKind::LBrace, "'{'")?;

        let mut cases = self.ast.leaf(NodeKind::EmptyCaseList, token.line);
        while !self.at(TokenKind::RBrace) {
            let label = match self.peek() {
                Some(TokenKind::CaseKw) => {
                    let case_token = self.bump();
                    let value_token = self.expect(TokenKind::IntLiteral, "an integer literal")?;
                    let value = self.ast.token_node(
                        NodeKind::IntLiteral,
                        self.text(&value_token),
                        value_token.line,
                    );
                    self.expect(TokenKind::Colon, "':'")?;
                    self.ast.node(NodeKind::CaseLabel, &[value], case_token.line)
                }
                Some(TokenKind::DefaultKw) => {
                    let default_token = self.bump();
                    self.expect(TokenKind::Colon, "':'")?;
                    self.ast.leaf(NodeKind::CaseLabelDefault, default_token.line)
                }
                _ => {
                    self.syntax_error("'case' or 'default'")?;
                    return None;
                }
            };

            let mut statements = self.ast.leaf(NodeKind::EmptyStatementList, self.current_line());
            while !matches!(
                self.peek(),
                Some(TokenKind::CaseKw | TokenKind::DefaultKw | TokenKind::RBrace) | None
            ) {
                let statement = self.parse_statement()?;
                let line = self.ast.line(statement);
                statements = self
                    .ast
                    .node(NodeKind::StatementList, &[statements, statement], line);
            }

            let line = self.ast.line(label);
            cases = self
                .ast
                .node(NodeKind::CaseList, &[cases, label, statements], line);
        }
        self.expect(TokenKind::RBrace, "'}'")?;
        Some(self.ast.node(NodeKind::Switch, &[scrutinee, cases], token.line))
    }

    fn parse_jump(&mut self, kind: NodeKind) -> Parse<NodeId> {
        let token = self.bump();
        let count = if self.at(TokenKind::IntLiteral) {
            let value = self.bump();
            Some(
                self.ast
                    .token_node(NodeKind::IntLiteral, self.text(&value), value.line),
            )
        } else {
            None
        };
        self.expect(TokenKind::Semicolon, "';'")?;
        Some(
            self.ast
                .node_with_slots(kind, [count, None, None, None], token.line),
        )
    }

    fn parse_return(&mut self) -> Parse<NodeId> {
        let token = self.bump();
        let value = if self.at(TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(TokenKind::Semicolon, "';'")?;
        Some(
            self.ast
                .node_with_slots(NodeKind::Return, [value, None, None, None], token.line),
        )
    }

    // ---- Declarations ---------------------------------------------------

    /// `varDeclaration := type varDeclarationItem ("," varDeclarationItem)* ";"`
    fn parse_var_declaration(&mut self) -> Parse<NodeId> {
        let ty = self.parse_type()?;
        let line = self.ast.line(ty);
        let mut list = self.parse_var_declaration_item()?;
        while self.at(TokenKind::Comma) {
            let comma = self.bump();
            let item = self.parse_var_declaration_item()?;
            list = self
                .ast
                .node(NodeKind::VarDeclarationList, &[list, item], comma.line);
        }
        self.expect(TokenKind::Semicolon, "';'")?;
        Some(self.ast.node(NodeKind::VarDeclaration, &[ty, list], line))
    }

    /// `varDeclarationItem := Identifier ("=" expression)?`
    fn parse_var_declaration_item(&mut self) -> Parse<NodeId> {
        let identifier = self.parse_identifier()?;
        if self.at(TokenKind::Assign) {
            let token = self.bump();
            let op = self.ast.leaf(NodeKind::Assign, token.line);
            let value = self.parse_expression()?;
            Some(self.ast.node(
                NodeKind::AssignmentExpression,
                &[identifier, op, value],
                token.line,
            ))
        } else {
            Some(identifier)
        }
    }

    /// `arg := type Identifier`; `argList` chains left-recursively with a
    /// bare `Arg` as its base case.
    fn parse_arg_list(&mut self) -> Parse<NodeId> {
        let mut list = self.parse_arg()?;
        while self.at(TokenKind::Comma) {
            let comma = self.bump();
            let arg = self.parse_arg()?;
            list = self.ast.node(NodeKind::ArgList, &[list, arg], comma.line);
        }
        Some(list)
    }

    fn parse_arg(&mut self) -> Parse<NodeId> {
        let ty = self.parse_type()?;
        if self.ast.kind(ty) == NodeKind::Auto {
            let line = self.ast.line(ty);
            self.diagnostics
                .error("Syntax error: method arguments must have explicit types", line);
            return None;
        }
        let identifier = self.parse_identifier()?;
        let line = self.ast.line(ty);
        Some(self.ast.node(NodeKind::Arg, &[ty, identifier], line))
    }

    /// `methodDefinition := returnType Identifier "(" argList? ")" block`
    fn parse_method_definition(&mut self) -> Parse<NodeId> {
        let return_type = self.parse_return_type()?;
        let identifier = self.parse_identifier()?;
        let line = self.ast.line(return_type);
        self.expect(TokenKind::LParen, "'('")?;
        let args = if self.at(TokenKind::RParen) {
            None
        } else {
            Some(self.parse_arg_list()?)
        };
        self.expect(TokenKind::RParen, "')'")?;
        self.expect(TokenKind::LBrace, "'{'")?;
        let body = self.parse_statement_list(TokenKind::RBrace)?;
        self.expect(TokenKind::RBrace, "'}'")?;
        Some(self.ast.node_with_slots(
            NodeKind::MethodDefinition,
            [Some(return_type), Some(identifier), args, Some(body)],
            line,
        ))
    }

    /// Whether the next class body item is a method (as opposed to a field
    /// declaration): `void`, or a type followed by a name and `(`.
    fn at_method_definition(&self) -> bool {
        if self.at(TokenKind::VoidKw) {
            return true;
        }
        let mut offset = 1;
        while self.peek_at(offset) == Some(TokenKind::LBracket)
            && self.peek_at(offset + 1) == Some(TokenKind::RBracket)
        {
            offset += 2;
        }
        self.peek_at(offset) == Some(TokenKind::Identifier)
            && self.peek_at(offset + 1) == Some(TokenKind::LParen)
    }

    fn parse_class_definition(&mut self) -> Parse<NodeId> {
        let token = self.expect(TokenKind::ClassKw, "'class'")?;
        let identifier = self.parse_identifier()?;
        self.expect(TokenKind::LBrace, "'{'")?;

        let mut items = self.ast.leaf(NodeKind::EmptyClassBodyItemList, token.line);
        while !self.at(TokenKind::RBrace) {
            if self.peek().is_none() {
                self.syntax_error("a class member")?;
            }
            let item = if self.at_method_definition() {
                self.parse_method_definition()?
            } else {
                self.parse_var_declaration()?
            };
            let line = self.ast.line(item);
            items = self
                .ast
                .node(NodeKind::ClassBodyItemList, &[items, item], line);
        }
        self.expect(TokenKind::RBrace, "'}'")?;
        Some(
            self.ast
                .node(NodeKind::ClassDefinition, &[identifier, items], token.line),
        )
    }

    fn parse_file(&mut self) -> Parse<NodeId> {
        let class = self.parse_class_definition()?;
        if self.pos < self.tokens.len() {
            self.syntax_error("end of file")?;
        }
        let line = self.ast.line(class);
        Some(self.ast.node(NodeKind::File, &[class], line))
    }
}

/// Parses one source file into its AST. Returns `None` after reporting a
/// syntax error.
pub fn parse_file(source: &str, diagnostics: &mut Diagnostics) -> Option<(Ast, NodeId)> {
    let mut parser = Parser::new(source, diagnostics);
    let root = parser.parse_file()?;
    Some((parser.ast, root))
}
