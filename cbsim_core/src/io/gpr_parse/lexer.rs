//! Lex a GPR string into a series of tokens for later parsing

use crate::io::gpr_parse::token::Token;
use thiserror::Error;

pub struct Lexer {
    source: Vec<char>,
    tokens: Vec<Token>,
    start: usize,
    current: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer {
            source: source.chars().collect(),
            tokens: Vec::new(),
            start: 0,
            current: 0,
        }
    }

    /// Convert the source into tokens, always terminated by [`Token::Eof`]
    pub fn lex(&mut self) -> Result<Vec<Token>, LexerError> {
        while !self.is_at_end() {
            self.start = self.current;
            self.scan_token()?;
        }

        self.tokens.push(Token::Eof);
        Ok(std::mem::take(&mut self.tokens))
    }

    fn scan_token(&mut self) -> Result<(), LexerError> {
        let c: char = self.advance();
        match c {
            // Single Character Tokens
            '(' => self.add_token(Token::LeftParen),
            ')' => self.add_token(Token::RightParen),
            // Symbolic operators, doubled forms (`&&`, `||`) are accepted too
            '&' => {
                self.skip_repeat('&');
                self.add_token(Token::And)
            }
            '|' => {
                self.skip_repeat('|');
                self.add_token(Token::Or)
            }
            '!' => self.add_token(Token::Not),
            // Identifiers and Operators
            c if Lexer::is_identifier_char(c) => self.read_identifier(),
            // Whitespace
            c if c.is_whitespace() => {}
            // Error Case
            other => {
                return Err(LexerError::InvalidCharacter {
                    character: other,
                    position: self.start,
                })
            }
        };
        Ok(())
    }

    fn advance(&mut self) -> char {
        let char_at_current = self.source[self.current];
        self.current += 1;
        char_at_current
    }

    fn skip_repeat(&mut self, c: char) {
        if self.peek() == c {
            self.advance();
        }
    }

    fn read_identifier(&mut self) {
        while Lexer::is_identifier_char(self.peek()) {
            self.advance();
        }

        let text: String = self.source[self.start..self.current].iter().collect();

        match text.to_ascii_lowercase().as_str() {
            "and" => self.add_token(Token::And),
            "or" => self.add_token(Token::Or),
            "not" => self.add_token(Token::Not),
            _ => self.add_token(Token::Identifier(text)),
        }
    }

    /// Gene ids may contain letters, digits, and `_ . - :`
    fn is_identifier_char(c: char) -> bool {
        c.is_alphanumeric() || matches!(c, '_' | '.' | '-' | ':')
    }

    fn peek(&self) -> char {
        if self.is_at_end() {
            return '\0';
        }
        self.source[self.current]
    }

    fn add_token(&mut self, token: Token) {
        self.tokens.push(token);
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }
}

/// Errors raised while lexing
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LexerError {
    #[error("Invalid character `{character}` at position {position}")]
    InvalidCharacter { character: char, position: usize },
}

#[cfg(test)]
mod tests {
    use crate::io::gpr_parse::lexer::{Lexer, LexerError};
    use crate::io::gpr_parse::token::Token;

    #[test]
    fn test_single_gene() {
        let mut lexer = Lexer::new("Rv0023");
        let tokens = lexer.lex().unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0], Token::Identifier(String::from("Rv0023")));
    }

    #[test]
    fn test_grouping() {
        let mut lexer = Lexer::new("(Rv0023 or Rv0123)");
        let tokens = lexer.lex().unwrap();
        let expected_tokens = vec![
            Token::LeftParen,
            Token::Identifier(String::from("Rv0023")),
            Token::Or,
            Token::Identifier(String::from("Rv0123")),
            Token::RightParen,
            Token::Eof,
        ];
        assert_eq!(tokens, expected_tokens);
    }

    #[test]
    fn test_symbolic_operators_and_odd_ids() {
        let mut lexer = Lexer::new("HGNC:10026.1 && !b0001-a || 123_x");
        let tokens = lexer.lex().unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Identifier(String::from("HGNC:10026.1")),
                Token::And,
                Token::Not,
                Token::Identifier(String::from("b0001-a")),
                Token::Or,
                Token::Identifier(String::from("123_x")),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_operator_case() {
        let mut lexer = Lexer::new("a AND b Or NOT c");
        let tokens = lexer.lex().unwrap();
        assert_eq!(tokens[1], Token::And);
        assert_eq!(tokens[3], Token::Or);
        assert_eq!(tokens[4], Token::Not);
    }

    #[test]
    fn test_invalid_character() {
        let mut lexer = Lexer::new("a and $b");
        assert_eq!(
            lexer.lex(),
            Err(LexerError::InvalidCharacter {
                character: '$',
                position: 6
            })
        );
    }
}
