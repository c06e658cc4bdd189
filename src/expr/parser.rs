use crate::error::{EngineError, EngineResult};

use super::ast::{BinaryOperator, Expr};
use super::lexer::{Lexer, Token};

pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    pub fn new(input: &str) -> EngineResult<Self> {
        let mut lexer = Lexer::new(input);
        let tokens = lexer.tokenize()?;

        Ok(Self {
            tokens,
            position: 0,
        })
    }

    fn current_token(&self) -> &Token {
        self.tokens.get(self.position).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }

    fn expect(&mut self, expected: Token) -> EngineResult<()> {
        if self.current_token() == &expected {
            self.advance();
            Ok(())
        } else {
            Err(EngineError::ParseError(format!(
                "Expected {:?}, got {:?}",
                expected,
                self.current_token()
            )))
        }
    }

    pub fn parse(&mut self) -> EngineResult<Expr> {
        let expr = self.parse_additive_expression()?;
        self.expect(Token::Eof)?;
        Ok(expr)
    }

    fn parse_additive_expression(&mut self) -> EngineResult<Expr> {
        let mut left = self.parse_multiplicative_expression()?;

        while matches!(self.current_token(), Token::Plus | Token::Minus) {
            let op = match self.current_token() {
                Token::Plus => BinaryOperator::Add,
                Token::Minus => BinaryOperator::Subtract,
                _ => unreachable!(),
            };
            self.advance();
            let right = self.parse_multiplicative_expression()?;
            left = Expr::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_multiplicative_expression(&mut self) -> EngineResult<Expr> {
        let mut left = self.parse_unary_expression()?;

        while matches!(self.current_token(), Token::Star | Token::Slash) {
            let op = match self.current_token() {
                Token::Star => BinaryOperator::Multiply,
                Token::Slash => BinaryOperator::Divide,
                _ => unreachable!(),
            };
            self.advance();
            let right = self.parse_unary_expression()?;
            left = Expr::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_unary_expression(&mut self) -> EngineResult<Expr> {
        if matches!(self.current_token(), Token::Minus) {
            self.advance();
            let operand = self.parse_unary_expression()?;
            return Ok(Expr::Negate(Box::new(operand)));
        }

        self.parse_primary_expression()
    }

    fn parse_primary_expression(&mut self) -> EngineResult<Expr> {
        match self.current_token() {
            Token::Identifier(name) => {
                let name = name.clone();
                self.advance();
                Ok(Expr::Field(name))
            }

            Token::Number(n) => {
                let num = *n;
                self.advance();
                Ok(Expr::Number(num))
            }

            Token::LeftParen => {
                self.advance();
                let expr = self.parse_additive_expression()?;
                self.expect(Token::RightParen)?;
                Ok(expr)
            }

            token => Err(EngineError::ParseError(format!(
                "Unexpected token in expression: {:?}",
                token
            ))),
        }
    }
}

pub fn parse(input: &str) -> EngineResult<Expr> {
    let mut parser = Parser::new(input)?;
    parser.parse()
}
