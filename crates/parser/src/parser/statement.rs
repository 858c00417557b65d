use matc_ast::{NodeId, NodeKind, TokenKind};
use matc_errors::{Error, ParseError, Result};
use matc_span::Symbol;

use super::context::ParserContext;

impl<'a> ParserContext<'a> {
    pub fn parse_program(&mut self) -> Result<NodeId> {
        let first = self.parse_statement_list(&[TokenKind::Eof])?;
        Ok(self.alloc(NodeKind::Program { first_stmt: first }, 1))
    }

    fn parse_statement_list(&mut self, terminators: &[TokenKind]) -> Result<Option<NodeId>> {
        self.skip_separators();
        let mut head = None;
        let mut tail = None;
        while !terminators.contains(&self.peek_kind()) && !self.check(TokenKind::Eof) {
            let stmt = self.parse_statement()?;
            self.push_list(&mut head, &mut tail, stmt);
            self.skip_separators();
        }
        Ok(head)
    }

    fn parse_block(&mut self, terminators: &[TokenKind]) -> Result<NodeId> {
        let line = self.line();
        let first = self.parse_statement_list(terminators)?;
        Ok(self.alloc(NodeKind::Block { first_stmt: first }, line))
    }

    fn parse_statement(&mut self) -> Result<NodeId> {
        match self.peek_kind() {
            TokenKind::Function => self.parse_function_def(),
            TokenKind::If => self.parse_if_statement(),
            TokenKind::While => self.parse_while(),
            TokenKind::For => self.parse_for(false),
            TokenKind::Parfor => self.parse_for(true),
            TokenKind::Switch => self.parse_switch(),
            TokenKind::Try => self.parse_try(),
            TokenKind::Global => self.parse_global_or_persistent(false),
            TokenKind::Persistent => self.parse_global_or_persistent(true),
            TokenKind::Spmd => self.parse_spmd(),
            TokenKind::Classdef => {
                Err(Error::Parse(ParseError::ClassDefinitionNotSupported { line: self.line() }))
            }
            TokenKind::Break => self.parse_break(),
            TokenKind::Continue => self.parse_continue(),
            TokenKind::Return => self.parse_return(),
            TokenKind::OsCall => self.parse_os_call(),
            TokenKind::LeftBracket if self.looks_like_multi_assign() => self.parse_multi_assign(),
            _ => self.parse_assign_or_expr_statement(),
        }
    }

    fn parse_function_def(&mut self) -> Result<NodeId> {
        let line = self.line();
        self.advance(); // function

        let mut outputs_head = None;
        let mut outputs_tail = None;
        if self.check(TokenKind::LeftBracket) {
            self.advance();
            if !self.check(TokenKind::RightBracket) {
                loop {
                    let node = self.parse_output_name()?;
                    self.push_list(&mut outputs_head, &mut outputs_tail, node);
                    if self.eat(TokenKind::Comma).is_none() {
                        break;
                    }
                }
            }
            self.expect(TokenKind::RightBracket, "closing ']' in output parameter list")?;
            self.expect(TokenKind::Assign, "'=' after output parameter list")?;
        } else if self.check(TokenKind::Identifier) && self.raw_kind(self.pos + 1) == TokenKind::Assign {
            let tok = self.advance();
            let name = Symbol::intern(self.text(tok));
            let node = self.alloc(NodeKind::Param { name }, tok.line());
            outputs_head = Some(node);
            outputs_tail = Some(node);
            self.advance(); // =
        }

        let name_tok = self.expect(TokenKind::Identifier, "function name")?;
        let name = Symbol::intern(self.text(name_tok));

        let mut inputs_head = None;
        let mut inputs_tail = None;
        self.expect(TokenKind::LeftParen, "'(' before input parameter list")?;
        if !self.check(TokenKind::RightParen) {
            loop {
                let tok = self.expect(TokenKind::Identifier, "input parameter name")?;
                let pname = Symbol::intern(self.text(tok));
                let node = self.alloc(NodeKind::Param { name: pname }, tok.line());
                self.push_list(&mut inputs_head, &mut inputs_tail, node);
                if self.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }
        }
        self.expect(TokenKind::RightParen, "closing ')' after input parameter list")?;
        self.skip_separators();

        let was_inside = self.inside_function;
        self.inside_function = true;
        let body = self.parse_block(&[TokenKind::Function, TokenKind::End])?;
        self.inside_function = was_inside;

        let closed_explicitly = self.eat(TokenKind::End).is_some();
        self.note_function_closing(closed_explicitly, line)?;

        Ok(self.alloc(
            NodeKind::FunctionDef { name, outputs: outputs_head, inputs: inputs_head, body },
            line,
        ))
    }

    fn parse_output_name(&mut self) -> Result<NodeId> {
        if self.check(TokenKind::Not) {
            let line = self.line();
            self.advance();
            Ok(self.alloc(NodeKind::Ignore, line))
        } else {
            let tok = self.expect(TokenKind::Identifier, "output parameter name or '~'")?;
            let name = Symbol::intern(self.text(tok));
            Ok(self.alloc(NodeKind::Param { name }, tok.line()))
        }
    }

    /// A name in a multi-assignment's output-target list: either an
    /// existing/new variable binding or a `~` to discard that output.
    /// Unlike `parse_output_name`, this produces `Identifier` rather than
    /// `Param`, since a multi-assignment target is a reference, not a
    /// parameter declaration.
    fn parse_assign_target_name(&mut self) -> Result<NodeId> {
        if self.check(TokenKind::Not) {
            let line = self.line();
            self.advance();
            Ok(self.alloc(NodeKind::Ignore, line))
        } else {
            let tok = self.expect(TokenKind::Identifier, "identifier or '~' in multi-assignment target")?;
            let name = Symbol::intern(self.text(tok));
            Ok(self.alloc(NodeKind::Identifier { name }, tok.line()))
        }
    }

    fn parse_if_statement(&mut self) -> Result<NodeId> {
        let line = self.line();
        self.advance(); // if
        let node = self.parse_if_body(line)?;
        self.expect(TokenKind::End, "'end' closing 'if'")?;
        Ok(node)
    }

    fn parse_if_body(&mut self, line: u32) -> Result<NodeId> {
        let cond = self.parse_expression()?;
        self.skip_separators();
        let then_block = self.parse_block(&[TokenKind::ElseIf, TokenKind::Else, TokenKind::End])?;
        let else_block = match self.peek_kind() {
            TokenKind::ElseIf => {
                let elseif_line = self.line();
                self.advance();
                Some(self.parse_if_body(elseif_line)?)
            }
            TokenKind::Else => {
                self.advance();
                self.skip_separators();
                Some(self.parse_block(&[TokenKind::End])?)
            }
            _ => None,
        };
        Ok(self.alloc(NodeKind::If { cond, then_block, else_block }, line))
    }

    fn parse_while(&mut self) -> Result<NodeId> {
        let line = self.line();
        self.advance(); // while
        self.loop_depth += 1;
        let cond = self.parse_expression()?;
        self.skip_separators();
        let body = self.parse_block(&[TokenKind::End]);
        self.loop_depth -= 1;
        let body = body?;
        self.expect(TokenKind::End, "'end' closing 'while'")?;
        Ok(self.alloc(NodeKind::While { cond, body }, line))
    }

    fn parse_for(&mut self, is_parallel: bool) -> Result<NodeId> {
        let line = self.line();
        self.advance(); // for / parfor
        self.loop_depth += 1;
        if is_parallel {
            self.parfor_depth += 1;
        }
        let result = self.parse_for_body(is_parallel);
        self.loop_depth -= 1;
        if is_parallel {
            self.parfor_depth -= 1;
        }
        let (iterator, range, body) = result?;
        self.expect(TokenKind::End, "'end' closing loop")?;
        Ok(self.alloc(
            if is_parallel {
                NodeKind::ParFor { iterator, range, body }
            } else {
                NodeKind::For { iterator, range, body }
            },
            line,
        ))
    }

    fn parse_for_body(&mut self, is_parallel: bool) -> Result<(NodeId, NodeId, NodeId)> {
        let tok = self.expect(TokenKind::Identifier, "loop variable name")?;
        let name = Symbol::intern(self.text(tok));
        let iterator = self.alloc(NodeKind::Identifier { name }, tok.line());
        self.expect(TokenKind::Assign, "'=' after loop variable")?;
        let range = self.parse_expression()?;
        if is_parallel {
            if let NodeKind::Range { step: Some(_), .. } = self.ast.get(range).kind {
                return Err(self.not_yet_supported("a stepped range as a parfor loop range"));
            }
        }
        self.skip_separators();
        let body = self.parse_block(&[TokenKind::End])?;
        Ok((iterator, range, body))
    }

    fn parse_switch(&mut self) -> Result<NodeId> {
        let line = self.line();
        self.advance(); // switch
        let scrutinee = self.parse_expression()?;
        self.skip_separators();
        let mut head = None;
        let mut tail = None;
        while self.check(TokenKind::Case) {
            let case_line = self.line();
            self.advance();
            let pattern = self.parse_expression()?;
            self.skip_separators();
            let body = self.parse_block(&[TokenKind::Case, TokenKind::Otherwise, TokenKind::End])?;
            let case = self.alloc(NodeKind::SwitchCase { pattern, body }, case_line);
            self.push_list(&mut head, &mut tail, case);
        }
        let otherwise = if self.eat(TokenKind::Otherwise).is_some() {
            self.skip_separators();
            Some(self.parse_block(&[TokenKind::End])?)
        } else {
            None
        };
        self.expect(TokenKind::End, "'end' closing 'switch'")?;
        Ok(self.alloc(NodeKind::Switch { scrutinee, first_case: head, otherwise }, line))
    }

    fn parse_try(&mut self) -> Result<NodeId> {
        let line = self.line();
        self.advance(); // try
        self.skip_separators();
        let try_block = self.parse_block(&[TokenKind::Catch, TokenKind::End])?;
        let (catch_var, catch_block) = if self.eat(TokenKind::Catch).is_some() {
            let var = if self.check(TokenKind::Identifier)
                && !matches!(self.peek_kind(), TokenKind::Newline | TokenKind::Semicolon)
            {
                let tok = self.advance();
                let name = Symbol::intern(self.text(tok));
                Some(self.alloc(NodeKind::Identifier { name }, tok.line()))
            } else {
                None
            };
            self.skip_separators();
            (var, self.parse_block(&[TokenKind::End])?)
        } else {
            (None, self.alloc(NodeKind::Block { first_stmt: None }, line))
        };
        self.expect(TokenKind::End, "'end' closing 'try'")?;
        Ok(self.alloc(NodeKind::TryCatch { try_block, catch_var, catch_block }, line))
    }

    fn parse_global_or_persistent(&mut self, is_persistent: bool) -> Result<NodeId> {
        let line = self.line();
        self.advance();
        if is_persistent && !self.inside_function {
            return Err(Error::Parse(ParseError::PersistentOutsideFunction { line }));
        }
        let mut head = None;
        let mut tail = None;
        while self.check(TokenKind::Identifier) {
            let tok = self.advance();
            let name = Symbol::intern(self.text(tok));
            let node = self.alloc(NodeKind::Param { name }, tok.line());
            self.push_list(&mut head, &mut tail, node);
            self.eat(TokenKind::Comma);
        }
        self.eat(TokenKind::Semicolon);
        Ok(self.alloc(
            if is_persistent {
                NodeKind::PersistentDecl { names: head }
            } else {
                NodeKind::GlobalDecl { names: head }
            },
            line,
        ))
    }

    fn parse_spmd(&mut self) -> Result<NodeId> {
        let line = self.line();
        self.advance(); // spmd
        self.skip_separators();
        let body = self.parse_block(&[TokenKind::End])?;
        self.expect(TokenKind::End, "'end' closing 'spmd'")?;
        Ok(self.alloc(NodeKind::Parallel { body }, line))
    }

    fn parse_break(&mut self) -> Result<NodeId> {
        let line = self.line();
        self.advance();
        if self.loop_depth == 0 {
            return Err(Error::Parse(ParseError::BreakOutsideLoop { line }));
        }
        if self.parfor_depth > 0 {
            return Err(Error::Parse(ParseError::BreakInsideParallelFor { line }));
        }
        self.eat(TokenKind::Semicolon);
        Ok(self.alloc(NodeKind::Break, line))
    }

    fn parse_continue(&mut self) -> Result<NodeId> {
        let line = self.line();
        self.advance();
        if self.loop_depth == 0 {
            return Err(Error::Parse(ParseError::ContinueOutsideLoop { line }));
        }
        self.eat(TokenKind::Semicolon);
        Ok(self.alloc(NodeKind::Continue, line))
    }

    fn parse_return(&mut self) -> Result<NodeId> {
        let line = self.line();
        self.advance();
        if self.parfor_depth > 0 {
            return Err(Error::Parse(ParseError::ReturnInsideParallelFor { line }));
        }
        self.eat(TokenKind::Semicolon);
        Ok(self.alloc(NodeKind::Return, line))
    }

    fn parse_os_call(&mut self) -> Result<NodeId> {
        let tok = self.advance();
        Ok(self.alloc(NodeKind::OsCall { payload: tok.span }, tok.line()))
    }

    /// Looks ahead for `[` ... `]` `=`, the only shape that distinguishes a
    /// multi-output assignment target from an ordinary matrix-literal
    /// expression statement (spec.md §4.2).
    fn looks_like_multi_assign(&self) -> bool {
        if self.raw_kind(self.pos) != TokenKind::LeftBracket {
            return false;
        }
        let mut depth = 0i32;
        let mut idx = self.pos;
        loop {
            match self.raw_kind(idx) {
                TokenKind::LeftBracket => depth += 1,
                TokenKind::RightBracket => {
                    depth -= 1;
                    if depth == 0 {
                        idx += 1;
                        break;
                    }
                }
                TokenKind::Eof => return false,
                _ => {}
            }
            idx += 1;
        }
        self.raw_kind(idx) == TokenKind::Assign
    }

    fn parse_multi_assign(&mut self) -> Result<NodeId> {
        let line = self.line();
        self.advance(); // [
        let mut head = None;
        let mut tail = None;
        if !self.check(TokenKind::RightBracket) {
            loop {
                if !matches!(self.peek_kind(), TokenKind::Identifier | TokenKind::Not) {
                    return Err(Error::Parse(ParseError::IllFormedMultiAssignTarget { line: self.line() }));
                }
                let node = self.parse_assign_target_name()?;
                self.push_list(&mut head, &mut tail, node);
                if self.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }
        }
        self.expect(TokenKind::RightBracket, "closing ']' in assignment target list")?;
        self.expect(TokenKind::Assign, "'=' after multi-assignment target list")?;
        let call = self.parse_expression()?;
        let verbose = self.consume_verbosity();
        Ok(self.alloc(NodeKind::MultiAssign { outputs: head, call, verbose }, line))
    }

    fn parse_assign_or_expr_statement(&mut self) -> Result<NodeId> {
        let line = self.line();
        let target = self.parse_expression()?;
        if self.eat(TokenKind::Assign).is_some() {
            let value = self.parse_expression()?;
            let verbose = self.consume_verbosity();
            Ok(self.alloc(NodeKind::Assign { target, value, verbose }, line))
        } else {
            let verbose = self.consume_verbosity();
            // Refined once the resolver knows whether `target` is a call
            // to a function with no return value (spec.md §4.4).
            Ok(self.alloc(NodeKind::ExprStmt { expr: target, verbose, is_ans: true }, line))
        }
    }
}
