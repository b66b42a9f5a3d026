//! SQL parsing using datafusion-sqlparser-rs
//!
//! Splits a DDL script into statements on top-level `;` tokens, then parses
//! each statement on its own. Statements the AST parser handles are
//! returned parsed; statements whose object name is all we need (triggers,
//! functions, types, policies, `COMMENT ON`) are returned as raw tokens so
//! dialect gaps in their bodies never hide the declaration. A statement
//! that fails to parse is recorded; the rest of the script is still read.

use schemalint_core::DialectConfig;
use sqlparser::ast::Statement;
use sqlparser::dialect::{
    BigQueryDialect, Dialect, GenericDialect, MySqlDialect, PostgreSqlDialect, SnowflakeDialect,
};
use sqlparser::parser::Parser;
use sqlparser::tokenizer::{Token, Tokenizer};
use std::path::{Path, PathBuf};

/// SQL parser with configurable dialect
pub struct SqlParser {
    dialect: Box<dyn Dialect>,
}

impl SqlParser {
    /// Create a new SQL parser with the PostgreSQL dialect
    pub fn new() -> Self {
        Self::postgres()
    }

    /// Create a SQL parser for generic ANSI SQL
    pub fn generic() -> Self {
        Self {
            dialect: Box::new(GenericDialect {}),
        }
    }

    /// Create a SQL parser for PostgreSQL
    pub fn postgres() -> Self {
        Self {
            dialect: Box::new(PostgreSqlDialect {}),
        }
    }

    /// Create a SQL parser for BigQuery
    pub fn bigquery() -> Self {
        Self {
            dialect: Box::new(BigQueryDialect {}),
        }
    }

    /// Create a SQL parser for Snowflake
    pub fn snowflake() -> Self {
        Self {
            dialect: Box::new(SnowflakeDialect {}),
        }
    }

    /// Create a SQL parser for MySQL
    pub fn mysql() -> Self {
        Self {
            dialect: Box::new(MySqlDialect {}),
        }
    }

    /// Create a parser from a dialect config
    pub fn from_dialect(dialect: &DialectConfig) -> Self {
        match dialect {
            DialectConfig::Postgres => Self::postgres(),
            DialectConfig::Ansi => Self::generic(),
            DialectConfig::BigQuery => Self::bigquery(),
            DialectConfig::Snowflake => Self::snowflake(),
            DialectConfig::MySql => Self::mysql(),
        }
    }

    /// Parse a SQL script into statements
    ///
    /// Only a tokenizer failure (e.g. an unterminated string) fails the
    /// whole script; statement-level parse errors are kept as
    /// [`StatementBody::Failed`].
    pub fn parse(&self, sql: &str, file_path: Option<&Path>) -> Result<ParsedSql, ExtractError> {
        let tokens = Tokenizer::new(&*self.dialect, sql)
            .tokenize()
            .map_err(|e| ExtractError::Tokenize {
                file: file_path.map(|p| p.display().to_string()),
                message: e.to_string(),
            })?;

        let statements = split_statements(tokens)
            .into_iter()
            .enumerate()
            .map(|(i, chunk)| self.parse_chunk(i + 1, chunk))
            .collect();

        Ok(ParsedSql {
            sql: sql.to_string(),
            statements,
            file_path: file_path.map(|p| p.to_path_buf()),
        })
    }

    fn parse_chunk(&self, index: usize, chunk: Chunk) -> SqlStatement {
        let significant: Vec<Token> = chunk
            .tokens
            .iter()
            .filter(|t| !matches!(t, Token::Whitespace(_)))
            .cloned()
            .collect();

        if is_header_statement(&significant) {
            return SqlStatement {
                index,
                line: chunk.line,
                body: StatementBody::Header(significant),
            };
        }

        let mut parser = Parser::new(&*self.dialect).with_tokens(chunk.tokens);
        let body = match parser.parse_statement() {
            Ok(statement) if parser.peek_token().token == Token::EOF => StatementBody::Parsed(statement),
            Ok(_) => StatementBody::Failed {
                message: format!("unexpected {} after end of statement", parser.peek_token().token),
                declares_object: declares_object(&significant),
            },
            Err(e) => StatementBody::Failed {
                message: e.to_string(),
                declares_object: declares_object(&significant),
            },
        };

        if let StatementBody::Failed { message, .. } = &body {
            tracing::debug!(statement = index, line = chunk.line, error = %message, "statement not parsed");
        }

        SqlStatement {
            index,
            line: chunk.line,
            body,
        }
    }

    /// Parse SQL from a file
    pub fn parse_file(&self, path: &Path) -> Result<ParsedSql, ExtractError> {
        let sql = std::fs::read_to_string(path).map_err(|e| ExtractError::Io {
            file: path.display().to_string(),
            message: e.to_string(),
        })?;

        self.parse(&sql, Some(path))
    }
}

impl Default for SqlParser {
    fn default() -> Self {
        Self::new()
    }
}

/// One statement of a script
#[derive(Debug, Clone)]
pub struct SqlStatement {
    /// 1-indexed position in the script
    pub index: usize,

    /// Line of the statement's first token (1-indexed)
    pub line: usize,

    pub body: StatementBody,
}

#[derive(Debug, Clone)]
pub enum StatementBody {
    /// Parsed into an AST
    Parsed(Statement),

    /// Declaration read from its tokens only (whitespace dropped)
    Header(Vec<Token>),

    /// Statement that could not be parsed
    Failed {
        message: String,

        /// Starts with `CREATE`, `ALTER` or `COMMENT`
        declares_object: bool,
    },
}

/// Successfully tokenized SQL script
#[derive(Debug, Clone)]
pub struct ParsedSql {
    /// Original SQL string
    pub sql: String,

    /// Statements in script order
    pub statements: Vec<SqlStatement>,

    /// Source file path (if parsed from file)
    pub file_path: Option<PathBuf>,
}

impl ParsedSql {
    /// Count the number of statements
    pub fn statement_count(&self) -> usize {
        self.statements.len()
    }

    /// Statements that failed to parse
    pub fn failures(&self) -> impl Iterator<Item = &SqlStatement> {
        self.statements
            .iter()
            .filter(|s| matches!(s.body, StatementBody::Failed { .. }))
    }

    /// File path for locations
    pub fn file_display(&self) -> Option<String> {
        self.file_path.as_ref().map(|p| p.display().to_string())
    }
}

/// Errors that prevent reading a script at all
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("Failed to read {file}: {message}")]
    Io { file: String, message: String },

    #[error("Failed to tokenize {}: {message}", .file.as_deref().unwrap_or("SQL input"))]
    Tokenize { file: Option<String>, message: String },
}

/// Tokens of one statement, whitespace included
struct Chunk {
    line: usize,
    tokens: Vec<Token>,
}

/// Split on top-level `;`
///
/// String literals, dollar-quoted bodies and comments are single tokens,
/// so semicolons inside them never split. Whitespace-only chunks are dropped.
fn split_statements(tokens: Vec<Token>) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut current: Vec<Token> = Vec::new();
    let mut start_line: Option<usize> = None;
    let mut line = 1usize;

    for token in tokens {
        let newlines = token.to_string().matches('\n').count();

        match token {
            Token::SemiColon => {
                if let Some(start) = start_line.take() {
                    chunks.push(Chunk { line: start, tokens: std::mem::take(&mut current) });
                } else {
                    current.clear();
                }
            }
            Token::EOF => {}
            Token::Whitespace(_) => current.push(token),
            token => {
                start_line.get_or_insert(line);
                current.push(token);
            }
        }

        line += newlines;
    }

    if let Some(start) = start_line {
        chunks.push(Chunk { line: start, tokens: current });
    }

    chunks
}

/// Unquoted keyword match
pub(crate) fn keyword_is(token: &Token, keyword: &str) -> bool {
    matches!(token, Token::Word(w) if w.quote_style.is_none() && w.value.eq_ignore_ascii_case(keyword))
}

fn declares_object(tokens: &[Token]) -> bool {
    tokens
        .first()
        .is_some_and(|t| ["CREATE", "ALTER", "COMMENT"].iter().any(|kw| keyword_is(t, kw)))
}

/// `COMMENT ON ...` or `CREATE [OR REPLACE] [CONSTRAINT] TRIGGER|FUNCTION|TYPE|POLICY`
fn is_header_statement(tokens: &[Token]) -> bool {
    let at = |i: usize, kw: &str| tokens.get(i).is_some_and(|t| keyword_is(t, kw));

    if at(0, "COMMENT") && at(1, "ON") {
        return true;
    }

    if !at(0, "CREATE") {
        return false;
    }

    let mut i = 1;
    if at(i, "OR") && at(i + 1, "REPLACE") {
        i += 2;
    }
    if at(i, "CONSTRAINT") {
        i += 1;
    }

    ["TRIGGER", "FUNCTION", "TYPE", "POLICY"]
        .iter()
        .any(|kw| at(i, kw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_script() {
        let parser = SqlParser::new();
        let sql = r#"
            CREATE TABLE tb_users (id BIGINT PRIMARY KEY, email TEXT NOT NULL);
            CREATE VIEW vw_users AS SELECT id, email FROM tb_users;
        "#;

        let parsed = parser.parse(sql, None).unwrap();
        assert_eq!(parsed.statement_count(), 2);
        assert!(parsed.statements.iter().all(|s| matches!(s.body, StatementBody::Parsed(_))));
        assert_eq!(parsed.failures().count(), 0);
    }

    #[test]
    fn header_statements_keep_tokens() {
        let parser = SqlParser::new();
        let sql = r#"
            CREATE OR REPLACE FUNCTION fn_touch() RETURNS trigger AS $$
            BEGIN
                NEW.updated_at := now();
                RETURN NEW;
            END;
            $$ LANGUAGE plpgsql;
            CREATE TRIGGER tr_users_touch BEFORE UPDATE ON tb_users
                FOR EACH ROW EXECUTE FUNCTION fn_touch();
            COMMENT ON TABLE tb_users IS 'Registered users';
        "#;

        let parsed = parser.parse(sql, None).unwrap();
        assert_eq!(parsed.statement_count(), 3);
        assert!(parsed.statements.iter().all(|s| matches!(s.body, StatementBody::Header(_))));
    }

    #[test]
    fn parse_failure_is_isolated() {
        let parser = SqlParser::new();
        let sql = "CREATE TABLE tb_a (id BIGINT);\nCREATE TABLE (id BIGINT);\nCREATE TABLE tb_b (id BIGINT);";

        let parsed = parser.parse(sql, None).unwrap();
        assert_eq!(parsed.statement_count(), 3);
        assert!(matches!(parsed.statements[0].body, StatementBody::Parsed(_)));
        assert!(matches!(
            parsed.statements[1].body,
            StatementBody::Failed { declares_object: true, .. }
        ));
        assert!(matches!(parsed.statements[2].body, StatementBody::Parsed(_)));

        let failed: Vec<_> = parsed.failures().map(|s| (s.index, s.line)).collect();
        assert_eq!(failed, vec![(2, 2)]);
    }

    #[test]
    fn failed_statement_outside_ddl() {
        let parser = SqlParser::new();
        let sql = "DO $$ BEGIN PERFORM 1; END $$;\nCREATE TABLE tb_a (id BIGINT);";

        let parsed = parser.parse(sql, None).unwrap();
        assert_eq!(parsed.statement_count(), 2);
        assert!(matches!(
            parsed.statements[0].body,
            StatementBody::Failed { declares_object: false, .. }
        ));
        assert!(matches!(parsed.statements[1].body, StatementBody::Parsed(_)));
    }

    #[test]
    fn tokenizer_failure_fails_the_script() {
        let parser = SqlParser::new();
        let err = parser.parse("COMMENT ON TABLE tb_users IS 'unterminated", None).unwrap_err();
        assert!(matches!(err, ExtractError::Tokenize { .. }));
    }

    #[test]
    fn different_dialects() {
        let sql = "CREATE TABLE tb_users (id INT)";

        for parser in [
            SqlParser::generic(),
            SqlParser::postgres(),
            SqlParser::bigquery(),
            SqlParser::snowflake(),
            SqlParser::mysql(),
        ] {
            let parsed = parser.parse(sql, None).unwrap();
            assert_eq!(parsed.failures().count(), 0);
        }
    }

    #[test]
    fn statement_lines_and_empty_statements() {
        let parser = SqlParser::new();
        let sql = "\n-- users\nCREATE TABLE tb_users (\n  id BIGINT\n);\n;;\n\nCREATE INDEX idx_users_id ON tb_users (id);\n";

        let parsed = parser.parse(sql, None).unwrap();
        let lines: Vec<_> = parsed.statements.iter().map(|s| (s.index, s.line)).collect();
        assert_eq!(lines, vec![(1, 3), (2, 8)]);
    }

    #[test]
    fn semicolons_inside_strings_do_not_split() {
        let parser = SqlParser::new();
        let sql = "COMMENT ON TABLE tb_users IS 'a; b'; CREATE TABLE tb_orders (id BIGINT);";

        let parsed = parser.parse(sql, None).unwrap();
        assert_eq!(parsed.statement_count(), 2);
    }

    #[test]
    fn header_detection() {
        let tokens = |sql: &str| -> Vec<Token> {
            Tokenizer::new(&PostgreSqlDialect {}, sql)
                .tokenize()
                .unwrap()
                .into_iter()
                .filter(|t| !matches!(t, Token::Whitespace(_)))
                .collect()
        };

        assert!(is_header_statement(&tokens("CREATE CONSTRAINT TRIGGER tr_x")));
        assert!(is_header_statement(&tokens("create type enum_status as enum ('a')")));
        assert!(is_header_statement(&tokens("CREATE POLICY pol_own ON tb_users")));
        assert!(!is_header_statement(&tokens("CREATE TABLE tb_users (id INT)")));
        assert!(!is_header_statement(&tokens("CREATE \"TYPE\" (id INT)")));
    }
}
