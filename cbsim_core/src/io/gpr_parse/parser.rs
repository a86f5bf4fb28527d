use crate::io::gpr_parse::token::Token;
use crate::metabolic_model::gene::Gene;
use crate::metabolic_model::model::{Gpr, GprOperatorType};

use indexmap::IndexMap;
use thiserror::Error;
/*
GPR Grammar:
expression -> or ;
or -> and ( "OR" and )* ;
and -> unary ( "AND" unary )* ;
unary -> "NOT" unary | primary  ;
primary -> GENE | "(" expression ")" ;

AND binds tighter than OR, so Gene1 OR Gene2 AND Gene3 is Gene1 OR (Gene2 AND Gene3)
 */

/// GPR Parser
pub struct GPRParser<'gm> {
    /// Vector of tokens from the GPR string
    tokens: Vec<Token>,
    /// Current token being processed
    current: usize,
    /// Map containing the Genes
    pub(crate) gene_map: &'gm mut IndexMap<String, Gene>,
}

impl<'gm> GPRParser<'gm> {
    /// Create a new GPRParser
    ///
    /// `tokens` should end with [`Token::Eof`], as produced by the lexer
    pub fn new(mut tokens: Vec<Token>, gene_map: &'gm mut IndexMap<String, Gene>) -> Self {
        if tokens.last() != Some(&Token::Eof) {
            tokens.push(Token::Eof);
        }
        GPRParser {
            tokens,
            current: 0,
            gene_map,
        }
    }

    // region Parsing Functions

    /// Parse the token vector into a GPR AST
    pub fn parse(&mut self) -> Result<Gpr, ParseError> {
        let gpr = self.or()?;
        if !self.is_at_end() {
            // If entire expression has not been parsed, and error has occured
            return Err(ParseError::EarlyTermination);
        }
        Ok(gpr)
    }

    fn or(&mut self) -> Result<Gpr, ParseError> {
        let mut expr = self.and()?;
        while self.match_token(&[Token::Or]) {
            let right = self.and()?;
            expr = Gpr::new_binary_operation(expr, GprOperatorType::Or, right)
                .map_err(|_| ParseError::InvalidBinaryOperator)?;
        }
        Ok(expr)
    }

    fn and(&mut self) -> Result<Gpr, ParseError> {
        let mut expr = self.unary()?;
        while self.match_token(&[Token::And]) {
            let right = self.unary()?;
            expr = Gpr::new_binary_operation(expr, GprOperatorType::And, right)
                .map_err(|_| ParseError::InvalidBinaryOperator)?;
        }
        Ok(expr)
    }

    fn unary(&mut self) -> Result<Gpr, ParseError> {
        if self.match_token(&[Token::Not]) {
            let right = self.unary()?;
            return Gpr::new_unary_operation(GprOperatorType::Not, right)
                .map_err(|_| ParseError::InvalidUnaryOperator);
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Gpr, ParseError> {
        if let Some(identifier) = self.match_identifier() {
            self.insert_if_needed(&identifier);
            return Ok(Gpr::new_gene_node(&identifier));
        }

        if self.match_token(&[Token::LeftParen]) {
            let expr = self.or()?;
            self.consume(&Token::RightParen, "Expect ')' after expression.")?;
            return Ok(expr);
        }

        Err(ParseError::ExpectedExpression)
    }

    // endregion Parsing Functions

    // region parsing helper functions

    /// Check whether the token at the current position matches one of the provided `tokens`,
    /// if it does advance [`self.current`] and return true, otherwise return false
    fn match_token(&mut self, tokens: &[Token]) -> bool {
        if tokens.iter().any(|t| self.check(t)) {
            self.advance();
            return true;
        }
        false
    }

    /// Similar to [`match_token`], but for matching an identifier token. If the current
    /// token is an identifier return `Some(GeneId)`, where GeneId is the gene's string identifier,
    /// otherwise return None
    fn match_identifier(&mut self) -> Option<String> {
        if let Token::Identifier(id) = self.peek() {
            let id = id.clone();
            self.advance();
            return Some(id);
        }
        None
    }

    /// Check whether the current token matches the provided `token`
    fn check(&self, token: &Token) -> bool {
        if self.is_at_end() {
            return false;
        }
        self.peek() == token
    }

    /// Advance `self.current` one position unless at end of GPR Vec
    fn advance(&mut self) {
        if !self.is_at_end() {
            self.current += 1;
        }
    }

    /// Check whether the parser is at the end of the source Vec
    fn is_at_end(&self) -> bool {
        *self.peek() == Token::Eof
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    /// Check whether the current token matches an input token, if it matches advance to the
    /// next token, and if it doesn't return an error. Used mainly for matching parenthesis in
    /// source GPR vec.
    fn consume(&mut self, token: &Token, msg: &str) -> Result<(), ParseError> {
        if self.check(token) {
            self.advance();
            return Ok(());
        }

        Err(ParseError::MissingToken(msg.to_string()))
    }

    // endregion parsing helper functions

    // region Gene Map Functions

    /// Check if a gene_id exists as a key in gene_map, if it doesn't insert a new active gene
    fn insert_if_needed(&mut self, gene_id: &str) {
        if !self.gene_map.contains_key(gene_id) {
            self.gene_map
                .insert(gene_id.to_string(), Gene::new(gene_id));
        }
    }

    // endregion Gene Map Functions
}

/// Enum representing possible parse errors
#[derive(Debug, Error, PartialEq, Clone)]
pub enum ParseError {
    /// Token was expected to be a binary operator but was not
    #[error("Invalid binary operator encountered, expected only `and` and `or`")]
    InvalidBinaryOperator,
    /// Token was expected to be a unary operator but was not
    #[error("Invalid unary operator encountered, expected only `not`")]
    InvalidUnaryOperator,
    /// Missing expected token (e.g. a right parenthesis)
    #[error("Missing expected token: {0}")]
    MissingToken(String),
    /// No expression found when one was expected
    #[error("No expression found, check that the GPR string is not empty")]
    ExpectedExpression,
    /// Expression was not completed when parsing terminated
    #[error("Parsing terminated early, check for a `not` between two gene identifiers/grouped expressions")]
    EarlyTermination,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::gpr_parse::lexer::Lexer;
    use crate::metabolic_model::model::GprOperation;

    fn parse(source: &str) -> Result<Gpr, ParseError> {
        let token_vec: Vec<Token> = Lexer::new(source).lex().unwrap();
        let mut gene_map = IndexMap::new();
        let mut parser = GPRParser::new(token_vec, &mut gene_map);
        parser.parse()
    }

    #[test]
    fn single_gene_parse() {
        match parse("Rv1304").unwrap() {
            Gpr::Operation(_) => {
                panic!("Incorrect Parse Result (Should have been single gene)")
            }
            Gpr::GeneNode(gene) => assert_eq!(gene, "Rv1304"),
        }
    }

    #[test]
    fn and_parse() {
        match parse("Rv1304 and Rv0023").unwrap() {
            Gpr::Operation(GprOperation::And { left, right }) => {
                assert_eq!(*left, Gpr::new_gene_node("Rv1304"));
                assert_eq!(*right, Gpr::new_gene_node("Rv0023"));
            }
            _ => panic!("Incorrect Parse Result (Should have been an AND operation)"),
        }
    }

    #[test]
    fn or_parse() {
        match parse("Rv1304 or Rv0023").unwrap() {
            Gpr::Operation(GprOperation::Or { left, right }) => {
                assert_eq!(*left, Gpr::new_gene_node("Rv1304"));
                assert_eq!(*right, Gpr::new_gene_node("Rv0023"));
            }
            _ => panic!("Incorrect Parse Result (Should have been an OR operation)"),
        }
    }

    #[test]
    fn not_parse() {
        match parse("not Rv0023").unwrap() {
            Gpr::Operation(GprOperation::Not { val }) => {
                assert_eq!(*val, Gpr::new_gene_node("Rv0023"))
            }
            _ => panic!("Incorrect Operation Parsed"),
        }
    }

    #[test]
    fn grouping_parse() {
        let gpr = parse("(Rv3141 or Rv0023) and Rv0018").unwrap();
        assert_eq!(gpr.to_string_id(), "((Rv3141 or Rv0023) and Rv0018)");
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let gpr = parse("Rv0001 and Rv0002 or Rv0003").unwrap();
        assert_eq!(gpr.to_string_id(), "((Rv0001 and Rv0002) or Rv0003)");
        let gpr = parse("Rv0001 or Rv0002 and Rv0003").unwrap();
        assert_eq!(gpr.to_string_id(), "(Rv0001 or (Rv0002 and Rv0003))");
        let gpr = parse("Rv0001 or Rv0002 and not Rv0003 or Rv0004").unwrap();
        assert_eq!(
            gpr.to_string_id(),
            "((Rv0001 or (Rv0002 and (not Rv0003))) or Rv0004)"
        );
    }

    #[test]
    fn same_operator_is_left_associative() {
        let gpr = parse("Rv0001 and Rv0002 and Rv0003").unwrap();
        assert_eq!(gpr.to_string_id(), "((Rv0001 and Rv0002) and Rv0003)");
    }

    #[test]
    fn genes_are_inserted() {
        let token_vec = Lexer::new("g1 or (g2 and g1)").lex().unwrap();
        let mut gene_map = IndexMap::new();
        gene_map.insert("g2".to_string(), Gene::new("g2"));
        GPRParser::new(token_vec, &mut gene_map).parse().unwrap();
        let ids: Vec<&str> = gene_map.keys().map(|k| k.as_str()).collect();
        assert_eq!(ids, vec!["g2", "g1"]);
    }

    #[test]
    fn invalid_parse() {
        assert_eq!(
            parse("Rv0001 not Rv0023"),
            Err(ParseError::EarlyTermination)
        );
        assert_eq!(parse(""), Err(ParseError::ExpectedExpression));
        assert!(matches!(
            parse("(Rv0001 or Rv0002"),
            Err(ParseError::MissingToken(_))
        ));
    }
}
