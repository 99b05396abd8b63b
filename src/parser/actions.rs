//! Action tag parsing
//!
//! One parsing function per action family, all methods on [`Parser`].
//! Segmented actions (if/foreach/for/switch/scope/save/def/section/var/
//! strip) recurse through [`Parser::parse_body`] with the set of tags
//! that may close them, which is what enforces correct nesting: an
//! `elif` outside an `if`, a case tag outside a `switch`, or a stray
//! end tag falls through to the dispatch below and is rejected with its
//! source line.
//!
//! Within a single tag, `;` separates clauses (`include PATH ; return
//! VAR ; with A=1`) and `,` separates items of a multi-assignment or
//! expression list.

use std::rc::Rc;

use crate::parser::ast::{Assign, CaseOp, Node, NodeList, SetWhere, StripMode, SwitchCase};
use crate::parser::lexer::TokenKind;
use crate::parser::parser::Parser;
use crate::render::errors::TemplateError;
use crate::scope::Compartment;

impl Parser {
    /// Dispatch on the action word of a `{% ... %}` tag.
    pub(crate) fn parse_action(
        &mut self,
        action: &str,
        line: usize,
        list: &mut NodeList,
    ) -> Result<(), TemplateError> {
        match action {
            "if" => self.parse_if(line, list),
            "foreach" => self.parse_foreach(line, list),
            "for" => self.parse_for(line, list),
            "switch" => self.parse_switch(line, list),
            "set" => self.parse_set(SetWhere::Local, line, list),
            "global" => self.parse_set(SetWhere::Global, line, list),
            "template" => self.parse_set(SetWhere::Template, line, list),
            "private" => self.parse_set(SetWhere::Private, line, list),
            "unset" => self.parse_unset(line, list),
            "save" => self.parse_save(line, list),
            "clear" => self.parse_clear(line, list),
            "scope" => self.parse_scope(line, list),
            "include" => self.parse_include(line, list),
            "expand" => self.parse_expand(line, list),
            "return" => self.parse_return(line, list),
            "def" => self.parse_def(line, list),
            "call" => self.parse_call(line, list),
            "section" => self.parse_section(line, list),
            "use" => self.parse_use(line, list),
            "var" => self.parse_var(line, list),
            "error" => self.parse_error(line, list),
            "import" => self.parse_import(line, list),
            "do" => self.parse_do(line, list),
            "hook" => self.parse_hook(false, line, list),
            "rhook" => self.parse_hook(true, line, list),
            "strip" => self.parse_strip(line, list),
            "autostrip" => self.parse_autostrip(StripMode::Strip, line, list),
            "autotrim" => self.parse_autostrip(StripMode::Trim, line, list),
            "no_autostrip" => self.parse_autostrip(StripMode::None, line, list),
            "break" => {
                self.finish_tag()?;
                list.push(Node::Break { line });
                Ok(())
            }
            "continue" => {
                self.finish_tag()?;
                list.push(Node::Continue { line });
                Ok(())
            }
            "elif" | "else" => Err(self.syntax_error(format!("mismatched {}", action), line)),
            "lt" | "le" | "gt" | "ge" | "ne" | "eq" | "bt" => Err(self.syntax_error(
                format!("{} can only occur in switch", action),
                line,
            )),
            _ if action.starts_with("end") => {
                Err(self.syntax_error(format!("mismatched end tag: {}", action), line))
            }
            _ => Err(self.syntax_error(format!("unknown action tag: {}", action), line)),
        }
    }

    fn parse_if(&mut self, line: usize, list: &mut NodeList) -> Result<(), TemplateError> {
        let mut condition = self.parse_expr()?;
        self.finish_tag()?;

        let mut branches = Vec::new();
        let mut else_body = None;

        loop {
            let (body, stop) = self.parse_body(&["elif", "else", "endif"])?;
            let stop = stop.ok_or_else(|| self.unclosed("if", line))?;
            branches.push((condition, body));

            match stop.action.as_str() {
                "elif" => {
                    condition = self.parse_expr()?;
                    self.finish_tag()?;
                }
                "else" => {
                    self.finish_tag()?;
                    let (body, stop) = self.parse_body(&["endif"])?;
                    stop.ok_or_else(|| self.unclosed("if", line))?;
                    self.finish_tag()?;
                    else_body = Some(body);
                    break;
                }
                _ => {
                    self.finish_tag()?;
                    break;
                }
            }
        }

        list.push(Node::If {
            branches,
            else_body,
            line,
        });
        Ok(())
    }

    fn parse_foreach(&mut self, line: usize, list: &mut NodeList) -> Result<(), TemplateError> {
        let var = self.parse_target()?;
        let index_var = if self.match_kind(&TokenKind::Comma) {
            Some(self.parse_target()?)
        } else {
            None
        };
        self.expect_kind(&TokenKind::In, "'in'")?;
        let iterable = self.parse_expr()?;
        self.finish_tag()?;

        let (body, else_body) = self.parse_loop_body("foreach", "endforeach", line)?;

        list.push(Node::ForEach {
            var,
            index_var,
            iterable,
            body,
            else_body,
            line,
        });
        Ok(())
    }

    fn parse_for(&mut self, line: usize, list: &mut NodeList) -> Result<(), TemplateError> {
        let init = self.parse_multi_assign()?;
        self.expect_kind(&TokenKind::Semicolon, "';'")?;
        let test = self.parse_expr()?;
        self.expect_kind(&TokenKind::Semicolon, "';'")?;
        let incr = self.parse_multi_assign()?;
        self.finish_tag()?;

        let (body, else_body) = self.parse_loop_body("for", "endfor", line)?;

        list.push(Node::ForCounter {
            init,
            test,
            incr,
            body,
            else_body,
            line,
        });
        Ok(())
    }

    /// Parse a loop body with an optional `else` branch.
    fn parse_loop_body(
        &mut self,
        action: &str,
        end_tag: &str,
        line: usize,
    ) -> Result<(NodeList, Option<NodeList>), TemplateError> {
        let (body, stop) = self.parse_body(&["else", end_tag])?;
        let stop = stop.ok_or_else(|| self.unclosed(action, line))?;

        if stop.action == "else" {
            self.finish_tag()?;
            let (else_body, stop) = self.parse_body(&[end_tag])?;
            stop.ok_or_else(|| self.unclosed(action, line))?;
            self.finish_tag()?;
            Ok((body, Some(else_body)))
        } else {
            self.finish_tag()?;
            Ok((body, None))
        }
    }

    fn parse_switch(&mut self, line: usize, list: &mut NodeList) -> Result<(), TemplateError> {
        let subject = self.parse_expr()?;
        self.finish_tag()?;

        const STOPS: &[&str] = &["lt", "le", "gt", "ge", "ne", "eq", "bt", "endswitch"];

        // Nodes before the first case form the default body
        let (default, stop) = self.parse_body(STOPS)?;
        let mut stop = stop.ok_or_else(|| self.unclosed("switch", line))?;
        let mut cases = Vec::new();

        while stop.action != "endswitch" {
            let op = CaseOp::from_word(&stop.action).ok_or_else(|| {
                self.syntax_error(format!("unexpected tag: {}", stop.action), stop.line)
            })?;
            let args = self.parse_multi_expr()?;
            if args.len() != op.arg_count() {
                return Err(self.syntax_error(
                    format!(
                        "switch clause {} takes {} argument{}",
                        stop.action,
                        op.arg_count(),
                        if op.arg_count() == 1 { "" } else { "s" }
                    ),
                    stop.line,
                ));
            }
            self.finish_tag()?;

            let (body, next) = self.parse_body(STOPS)?;
            cases.push(SwitchCase { op, args, body });
            stop = next.ok_or_else(|| self.unclosed("switch", line))?;
        }
        self.finish_tag()?;

        list.push(Node::Switch {
            subject,
            cases,
            default,
            line,
        });
        Ok(())
    }

    fn parse_set(
        &mut self,
        where_: SetWhere,
        line: usize,
        list: &mut NodeList,
    ) -> Result<(), TemplateError> {
        let assigns = self.parse_multi_assign()?;

        let else_assigns = if self.match_kind(&TokenKind::Semicolon) {
            let (word, word_line) = self.expect_word("'else'")?;
            if word != "else" {
                return Err(self.syntax_error(format!("expected 'else', found '{}'", word), word_line));
            }
            Some(self.parse_multi_assign()?)
        } else {
            None
        };
        self.finish_tag()?;

        list.push(Node::Set {
            where_,
            assigns,
            else_assigns,
            line,
        });
        Ok(())
    }

    fn parse_unset(&mut self, line: usize, list: &mut NodeList) -> Result<(), TemplateError> {
        let mut targets = vec![self.parse_target()?];
        while self.match_kind(&TokenKind::Comma) {
            targets.push(self.parse_target()?);
        }
        self.finish_tag()?;

        list.push(Node::Unset { targets, line });
        Ok(())
    }

    fn parse_save(&mut self, line: usize, list: &mut NodeList) -> Result<(), TemplateError> {
        let mut targets = vec![self.parse_target()?];
        while self.match_kind(&TokenKind::Comma) {
            targets.push(self.parse_target()?);
        }
        self.finish_tag()?;

        let (body, stop) = self.parse_body(&["endsave"])?;
        stop.ok_or_else(|| self.unclosed("save", line))?;
        self.finish_tag()?;

        list.push(Node::Save { targets, body, line });
        Ok(())
    }

    fn parse_clear(&mut self, line: usize, list: &mut NodeList) -> Result<(), TemplateError> {
        let compartment = if self.at_tag_end() {
            Compartment::Local
        } else {
            let (word, word_line) = self.expect_word("compartment name")?;
            Compartment::from_keyword(&word).ok_or_else(|| {
                self.syntax_error(
                    format!("expected local, global, private, return, or app, found '{}'", word),
                    word_line,
                )
            })?
        };
        self.finish_tag()?;

        list.push(Node::Clear { compartment, line });
        Ok(())
    }

    fn parse_scope(&mut self, line: usize, list: &mut NodeList) -> Result<(), TemplateError> {
        let assigns = if self.at_tag_end() {
            Vec::new()
        } else {
            self.parse_multi_assign()?
        };
        self.finish_tag()?;

        let (body, stop) = self.parse_body(&["endscope"])?;
        stop.ok_or_else(|| self.unclosed("scope", line))?;
        self.finish_tag()?;

        list.push(Node::Scope { assigns, body, line });
        Ok(())
    }

    fn parse_include(&mut self, line: usize, list: &mut NodeList) -> Result<(), TemplateError> {
        let mut path = None;
        let mut return_var = None;
        let mut assigns = Vec::new();

        loop {
            match self.peek_kind() {
                Some(TokenKind::Word(word)) if word == "return" => {
                    self.next_token("'return'")?;
                    return_var = Some(self.parse_target()?);
                }
                Some(TokenKind::Word(word)) if word == "with" => {
                    self.next_token("'with'")?;
                    assigns = self.parse_multi_assign()?;
                }
                _ => {
                    path = Some(self.parse_expr()?);
                }
            }
            if !self.match_kind(&TokenKind::Semicolon) {
                break;
            }
        }

        let path = path
            .ok_or_else(|| self.syntax_error("include expecting path expression", line))?;
        self.finish_tag()?;

        list.push(Node::Include {
            path,
            assigns,
            return_var,
            line,
        });
        Ok(())
    }

    fn parse_expand(&mut self, line: usize, list: &mut NodeList) -> Result<(), TemplateError> {
        let expr = self.parse_expr()?;
        let compartment = if self.match_kind(&TokenKind::Semicolon) {
            let (word, word_line) = self.expect_word("compartment name")?;
            Compartment::from_keyword(&word).ok_or_else(|| {
                self.syntax_error(format!("invalid compartment: {}", word), word_line)
            })?
        } else {
            Compartment::Local
        };
        self.finish_tag()?;

        list.push(Node::Expand {
            expr,
            compartment,
            line,
        });
        Ok(())
    }

    fn parse_return(&mut self, line: usize, list: &mut NodeList) -> Result<(), TemplateError> {
        let assigns = self.parse_multi_assign()?;
        self.finish_tag()?;

        list.push(Node::Return { assigns, line });
        Ok(())
    }

    fn parse_def(&mut self, line: usize, list: &mut NodeList) -> Result<(), TemplateError> {
        let target = self.parse_target()?;
        self.expect_kind(&TokenKind::OpenParen, "'('")?;

        let mut params = Vec::new();
        if self.peek_kind() != Some(&TokenKind::CloseParen) {
            params.push(self.parse_plain_name()?);
            while self.match_kind(&TokenKind::Comma) {
                params.push(self.parse_plain_name()?);
            }
        }
        self.expect_kind(&TokenKind::CloseParen, "')'")?;
        self.finish_tag()?;

        let (body, stop) = self.parse_body(&["enddef"])?;
        stop.ok_or_else(|| self.unclosed("def", line))?;
        self.finish_tag()?;

        list.push(Node::Def {
            target,
            params,
            body: Rc::new(body),
            line,
        });
        Ok(())
    }

    fn parse_call(&mut self, line: usize, list: &mut NodeList) -> Result<(), TemplateError> {
        let expr = self.parse_expr()?;
        self.finish_tag()?;

        list.push(Node::Call { expr, line });
        Ok(())
    }

    fn parse_section(&mut self, line: usize, list: &mut NodeList) -> Result<(), TemplateError> {
        let name = self.parse_expr()?;
        self.finish_tag()?;

        let (body, stop) = self.parse_body(&["endsection"])?;
        stop.ok_or_else(|| self.unclosed("section", line))?;
        self.finish_tag()?;

        list.push(Node::Section { name, body, line });
        Ok(())
    }

    fn parse_use(&mut self, line: usize, list: &mut NodeList) -> Result<(), TemplateError> {
        let name = self.parse_expr()?;
        self.finish_tag()?;

        list.push(Node::Use { name, line });
        Ok(())
    }

    fn parse_var(&mut self, line: usize, list: &mut NodeList) -> Result<(), TemplateError> {
        let target = self.parse_target()?;
        self.finish_tag()?;

        let (body, stop) = self.parse_body(&["endvar"])?;
        stop.ok_or_else(|| self.unclosed("var", line))?;
        self.finish_tag()?;

        list.push(Node::Var { target, body, line });
        Ok(())
    }

    fn parse_error(&mut self, line: usize, list: &mut NodeList) -> Result<(), TemplateError> {
        let expr = self.parse_expr()?;
        self.finish_tag()?;

        list.push(Node::Error { expr, line });
        Ok(())
    }

    fn parse_import(&mut self, line: usize, list: &mut NodeList) -> Result<(), TemplateError> {
        let assigns = self.parse_multi_assign()?;
        self.finish_tag()?;

        list.push(Node::Import { assigns, line });
        Ok(())
    }

    fn parse_do(&mut self, line: usize, list: &mut NodeList) -> Result<(), TemplateError> {
        let exprs = self.parse_multi_expr()?;
        self.finish_tag()?;

        list.push(Node::Do { exprs, line });
        Ok(())
    }

    fn parse_hook(
        &mut self,
        capture: bool,
        line: usize,
        list: &mut NodeList,
    ) -> Result<(), TemplateError> {
        let mut name = None;
        let mut assigns = Vec::new();

        loop {
            match self.peek_kind() {
                Some(TokenKind::Word(word)) if word == "with" => {
                    self.next_token("'with'")?;
                    assigns = self.parse_multi_assign()?;
                }
                _ => {
                    name = Some(self.parse_expr()?);
                }
            }
            if !self.match_kind(&TokenKind::Semicolon) {
                break;
            }
        }

        let name =
            name.ok_or_else(|| self.syntax_error("hook expecting name expression", line))?;
        self.finish_tag()?;

        list.push(Node::Hook {
            name,
            assigns,
            capture,
            line,
        });
        Ok(())
    }

    fn parse_strip(&mut self, line: usize, list: &mut NodeList) -> Result<(), TemplateError> {
        let mode = if self.at_tag_end() {
            None
        } else {
            let (word, word_line) = self.expect_word("on, off, or trim")?;
            match word.as_str() {
                "on" => Some(StripMode::Strip),
                "off" => Some(StripMode::None),
                "trim" => Some(StripMode::Trim),
                _ => {
                    return Err(self.syntax_error(
                        format!("expected on, off, or trim, found '{}'", word),
                        word_line,
                    ));
                }
            }
        };
        self.finish_tag()?;

        self.push_autostrip(mode);
        let (body, stop) = self.parse_body(&["endstrip"])?;
        stop.ok_or_else(|| self.unclosed("strip", line))?;
        self.finish_tag()?;
        self.pop_autostrip();

        list.push(Node::Strip { body, line });
        Ok(())
    }

    fn parse_autostrip(
        &mut self,
        mode: StripMode,
        line: usize,
        list: &mut NodeList,
    ) -> Result<(), TemplateError> {
        self.finish_tag()?;
        self.set_autostrip(mode);
        list.push(Node::Autostrip { mode, line });
        Ok(())
    }

    /// Parse a comma-separated assignment list: `a = 1, b = x + 1`.
    pub(crate) fn parse_multi_assign(&mut self) -> Result<Vec<Assign>, TemplateError> {
        let mut assigns = vec![self.parse_assign()?];
        while self.match_kind(&TokenKind::Comma) {
            assigns.push(self.parse_assign()?);
        }
        Ok(assigns)
    }

    fn parse_assign(&mut self) -> Result<Assign, TemplateError> {
        let target = self.parse_target()?;
        self.expect_kind(&TokenKind::Assign, "'='")?;
        let expr = self.parse_expr()?;
        Ok(Assign { target, expr })
    }
}
