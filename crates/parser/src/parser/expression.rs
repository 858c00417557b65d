use matc_ast::{BinOp, NodeId, NodeKind, PostfixOp, TokenKind, UnOp};
use matc_errors::Result;
use matc_span::Symbol;

use super::context::ParserContext;

impl<'a> ParserContext<'a> {
    pub fn parse_expression(&mut self) -> Result<NodeId> {
        self.parse_short_or()
    }

    fn parse_short_or(&mut self) -> Result<NodeId> {
        let mut left = self.parse_short_and()?;
        while self.check(TokenKind::ShortOr) {
            let line = self.line();
            self.advance();
            let right = self.parse_short_and()?;
            left = self.alloc(NodeKind::Binary { op: BinOp::ShortCircuitOr, left, right }, line);
        }
        Ok(left)
    }

    fn parse_short_and(&mut self) -> Result<NodeId> {
        let mut left = self.parse_bitor()?;
        while self.check(TokenKind::ShortAnd) {
            let line = self.line();
            self.advance();
            let right = self.parse_bitor()?;
            left = self.alloc(NodeKind::Binary { op: BinOp::ShortCircuitAnd, left, right }, line);
        }
        Ok(left)
    }

    fn parse_bitor(&mut self) -> Result<NodeId> {
        let mut left = self.parse_bitand()?;
        while self.check(TokenKind::Or) {
            let line = self.line();
            self.advance();
            let right = self.parse_bitand()?;
            left = self.alloc(NodeKind::Binary { op: BinOp::BitwiseOr, left, right }, line);
        }
        Ok(left)
    }

    fn parse_bitand(&mut self) -> Result<NodeId> {
        let mut left = self.parse_comparison()?;
        while self.check(TokenKind::And) {
            let line = self.line();
            self.advance();
            let right = self.parse_comparison()?;
            left = self.alloc(NodeKind::Binary { op: BinOp::BitwiseAnd, left, right }, line);
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<NodeId> {
        let mut left = self.parse_range()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Less => BinOp::Less,
                TokenKind::LessEqual => BinOp::LessEqual,
                TokenKind::Greater => BinOp::Greater,
                TokenKind::GreaterEqual => BinOp::GreaterEqual,
                TokenKind::Equality => BinOp::Equal,
                TokenKind::NotEqual => BinOp::NotEqual,
                _ => break,
            };
            let line = self.line();
            self.advance();
            let right = self.parse_range()?;
            left = self.alloc(NodeKind::Binary { op, left, right }, line);
        }
        Ok(left)
    }

    /// `a:b` or `a:b:c`. Lower precedence than `+`/`-` but higher than the
    /// relational operators, matching the documented MATLAB precedence
    /// table (spec.md §4.2).
    fn parse_range(&mut self) -> Result<NodeId> {
        let start = self.parse_additive()?;
        if !self.check(TokenKind::Colon) {
            return Ok(start);
        }
        let line = self.line();
        self.advance();
        let second = self.parse_additive()?;
        if self.check(TokenKind::Colon) {
            self.advance();
            let third = self.parse_additive()?;
            Ok(self.alloc(NodeKind::Range { start, step: Some(second), stop: third }, line))
        } else {
            Ok(self.alloc(NodeKind::Range { start, step: None, stop: second }, line))
        }
    }

    fn parse_additive(&mut self) -> Result<NodeId> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Add => BinOp::Add,
                TokenKind::Subtract => BinOp::Subtract,
                _ => break,
            };
            let line = self.line();
            self.advance();
            let right = self.parse_multiplicative()?;
            left = self.alloc(NodeKind::Binary { op, left, right }, line);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<NodeId> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Multiply => BinOp::Multiply,
                TokenKind::Divide => BinOp::Divide,
                TokenKind::BackDivide => BinOp::LeftDivide,
                TokenKind::ElementwiseMul => BinOp::ElementwiseMultiply,
                TokenKind::ElementwiseDiv => BinOp::ElementwiseDivide,
                TokenKind::ElementwiseBackDiv => BinOp::ElementwiseLeftDivide,
                _ => break,
            };
            let line = self.line();
            self.advance();
            let right = self.parse_unary()?;
            left = self.alloc(NodeKind::Binary { op, left, right }, line);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<NodeId> {
        let op = match self.peek_kind() {
            TokenKind::Add => Some(UnOp::Plus),
            TokenKind::Subtract => Some(UnOp::Minus),
            TokenKind::Not => Some(UnOp::Not),
            _ => None,
        };
        match op {
            Some(op) => {
                let line = self.line();
                self.advance();
                let operand = self.parse_unary()?;
                Ok(self.alloc(NodeKind::Unary { op, operand }, line))
            }
            None => self.parse_power(),
        }
    }

    fn parse_power(&mut self) -> Result<NodeId> {
        let mut left = self.parse_postfix()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Power => BinOp::Power,
                TokenKind::ElementwisePower => BinOp::ElementwisePower,
                _ => break,
            };
            let line = self.line();
            self.advance();
            // A leading unary operator is permitted on the right operand
            // (`2^-2`), and chained powers (`2^3^2`) fall out by recursing
            // back through `parse_unary` when no prefix operator is seen.
            let right = self.parse_unary()?;
            left = self.alloc(NodeKind::Binary { op, left, right }, line);
        }
        Ok(left)
    }

    fn parse_postfix(&mut self) -> Result<NodeId> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek_kind() {
                TokenKind::Transpose => {
                    let line = self.line();
                    self.advance();
                    expr = self.alloc(NodeKind::Postfix { op: PostfixOp::Transpose, operand: expr }, line);
                }
                TokenKind::ComplexConjugate => {
                    let line = self.line();
                    self.advance();
                    expr = self.alloc(NodeKind::Postfix { op: PostfixOp::ComplexConjugate, operand: expr }, line);
                }
                TokenKind::LeftParen => {
                    expr = self.parse_call(expr)?;
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    /// Builds a generic, not-yet-classified call/matrix-access node; the
    /// name resolver later rewrites `classification` once it knows whether
    /// `callee` is bound to a function (spec.md §4.4).
    fn parse_call(&mut self, callee: NodeId) -> Result<NodeId> {
        let line = self.line();
        self.advance(); // (
        self.call_depth += 1;
        let mut head = None;
        let mut tail = None;
        if !self.check(TokenKind::RightParen) {
            loop {
                let arg = self.parse_expression()?;
                self.push_list(&mut head, &mut tail, arg);
                if self.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }
        }
        self.call_depth -= 1;
        self.expect(TokenKind::RightParen, "closing ')'")?;
        Ok(self.alloc(
            NodeKind::Call { callee, args: head, classification: Default::default() },
            line,
        ))
    }

    fn parse_primary(&mut self) -> Result<NodeId> {
        let line = self.line();
        match self.peek_kind() {
            TokenKind::Number => {
                let tok = self.advance();
                Ok(self.alloc(NodeKind::NumberLit { span: tok.span }, line))
            }
            TokenKind::String => {
                let tok = self.advance();
                Ok(self.alloc(NodeKind::StringLit { span: tok.span }, line))
            }
            TokenKind::CharArray => {
                let tok = self.advance();
                Ok(self.alloc(NodeKind::CharArrayLit { span: tok.span }, line))
            }
            TokenKind::Identifier => {
                let tok = self.advance();
                let name = Symbol::intern(self.text(tok));
                Ok(self.alloc(NodeKind::Identifier { name }, line))
            }
            TokenKind::End => {
                if self.call_depth == 0 {
                    return Err(self.unexpected("'end' is only valid inside a call or matrix-access index list"));
                }
                self.advance();
                Ok(self.alloc(NodeKind::EndIndex, line))
            }
            TokenKind::FunctionHandle => {
                self.advance();
                if self.check(TokenKind::LeftParen) {
                    return Err(self.not_yet_supported("anonymous function literals"));
                }
                let tok = self.expect(TokenKind::Identifier, "function name after '@'")?;
                let name = Symbol::intern(self.text(tok));
                Ok(self.alloc(NodeKind::FunctionHandle { name }, line))
            }
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(TokenKind::RightParen, "closing ')'")?;
                Ok(self.alloc(NodeKind::Grouping { inner }, line))
            }
            TokenKind::LeftBracket => self.parse_matrix_literal(),
            TokenKind::LeftBrace => self.parse_cell_literal(),
            _ => Err(self.unexpected("an expression")),
        }
    }

    fn skip_bracket_newlines(&mut self) {
        while matches!(self.peek_kind(), TokenKind::Newline) {
            self.advance();
        }
    }

    /// `[...]`, desugared at parse time into nested `MatrixHCat`/`MatrixVCat`
    /// pairs so that shape inference's per-operator rules (spec.md §4.5)
    /// apply directly without a separate row-list representation.
    ///
    /// Elements within a row are separated by a comma or by bare whitespace
    /// (spec.md §4.2); `parse_concat_row` tells the two apart using each
    /// token's `preceded_by_space` bit rather than retaining raw whitespace
    /// text.
    fn parse_matrix_literal(&mut self) -> Result<NodeId> {
        let line = self.line();
        self.advance(); // [
        self.skip_bracket_newlines();
        if self.eat(TokenKind::RightBracket).is_some() {
            return Ok(self.alloc(NodeKind::EmptyMatrix, line));
        }
        let mut rows = Vec::new();
        loop {
            let row = self.parse_concat_row(TokenKind::RightBracket, false)?;
            rows.push(row);
            if matches!(self.peek_kind(), TokenKind::Semicolon | TokenKind::Newline) {
                while matches!(self.peek_kind(), TokenKind::Semicolon | TokenKind::Newline) {
                    self.advance();
                }
                if self.check(TokenKind::RightBracket) {
                    break;
                }
                continue;
            }
            break;
        }
        self.expect(TokenKind::RightBracket, "closing ']'")?;
        Ok(Self::fold_binary(&mut self.ast, rows, |left, right, ast| {
            ast.alloc(NodeKind::MatrixVCat { top: left, bottom: right }, line)
        }))
    }

    fn parse_cell_literal(&mut self) -> Result<NodeId> {
        let line = self.line();
        self.advance(); // {
        self.skip_bracket_newlines();
        if self.eat(TokenKind::RightBrace).is_some() {
            return Ok(self.alloc(NodeKind::EmptyCell, line));
        }
        let mut rows = Vec::new();
        loop {
            let row = self.parse_concat_row(TokenKind::RightBrace, true)?;
            rows.push(row);
            if matches!(self.peek_kind(), TokenKind::Semicolon | TokenKind::Newline) {
                while matches!(self.peek_kind(), TokenKind::Semicolon | TokenKind::Newline) {
                    self.advance();
                }
                if self.check(TokenKind::RightBrace) {
                    break;
                }
                continue;
            }
            break;
        }
        self.expect(TokenKind::RightBrace, "closing '}'")?;
        Ok(Self::fold_binary(&mut self.ast, rows, |left, right, ast| {
            ast.alloc(NodeKind::CellVCat { top: left, bottom: right }, line)
        }))
    }

    fn parse_concat_row(&mut self, closer: TokenKind, is_cell: bool) -> Result<NodeId> {
        let line = self.line();
        let mut elems = Vec::new();
        loop {
            let mut elem = self.parse_expression()?;
            if is_cell {
                elem = self.alloc(NodeKind::CellWrap { inner: elem }, line);
            }
            elems.push(elem);
            if self.eat(TokenKind::Comma).is_some() {
                self.skip_bracket_newlines();
                continue;
            }
            // No comma: bare whitespace before a token that isn't a row
            // separator or the closing delimiter also starts a new column
            // (spec.md §4.2's "comma or whitespace").
            let next = self.peek();
            if next.preceded_by_space && !matches!(next.kind, TokenKind::Semicolon | TokenKind::Newline) && next.kind != closer {
                continue;
            }
            break;
        }
        Ok(Self::fold_binary(&mut self.ast, elems, |left, right, ast| {
            if is_cell {
                ast.alloc(NodeKind::CellHCat { left, right }, line)
            } else {
                ast.alloc(NodeKind::MatrixHCat { left, right }, line)
            }
        }))
    }

    /// Left-folds a non-empty list of operands into a chain built by
    /// `combine`, collapsing to the single element when there is only one.
    fn fold_binary(
        ast: &mut matc_ast::Ast,
        items: Vec<NodeId>,
        combine: impl Fn(NodeId, NodeId, &mut matc_ast::Ast) -> NodeId,
    ) -> NodeId {
        let mut iter = items.into_iter();
        let mut acc = iter.next().expect("fold_binary is never called with an empty list");
        for next in iter {
            acc = combine(acc, next, ast);
        }
        acc
    }
}
