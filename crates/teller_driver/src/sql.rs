//! Minimal statement parser for the memory engine.
//!
//! The engine does not embed a SQL frontend. It recognizes exactly the
//! parameterized statement shapes the data-access layer issues - single-row
//! insert, and select/update/delete by key - and rejects everything else
//! with the backend's syntax-error code. Literals are not supported; all
//! values arrive as bound parameters.

use crate::error::{codes, DriverError, DriverResult};

/// A recognized statement shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Statement {
    /// `insert into <table>(<col>, ...) values(?, ...)`
    Insert {
        table: String,
        columns: Vec<String>,
    },
    /// `select * from <table> where <col> = ?`
    Select {
        table: String,
        key_column: String,
    },
    /// `update <table> set <col> = ? where <col> = ?`
    Update {
        table: String,
        set_column: String,
        key_column: String,
    },
    /// `delete from <table> where <col> = ?`
    Delete {
        table: String,
        key_column: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    LParen,
    RParen,
    Comma,
    Eq,
    Star,
    Param,
}

fn syntax(sql: &str, detail: &str) -> DriverError {
    DriverError::new(
        codes::SYNTAX_ERROR_2,
        format!("syntax error in statement \"{sql}\": {detail}"),
    )
}

fn tokenize(sql: &str) -> DriverResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = sql.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '=' => {
                chars.next();
                tokens.push(Token::Eq);
            }
            '*' => {
                chars.next();
                tokens.push(Token::Star);
            }
            '?' => {
                chars.next();
                tokens.push(Token::Param);
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        ident.push(c.to_ascii_lowercase());
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident));
            }
            other => {
                return Err(syntax(sql, &format!("unexpected character '{other}'")));
            }
        }
    }
    Ok(tokens)
}

/// Parses a statement, failing with the vendor syntax code on anything
/// outside the supported shapes.
pub(crate) fn parse(sql: &str) -> DriverResult<Statement> {
    let tokens = tokenize(sql)?;
    let mut cursor = Cursor {
        sql,
        tokens: &tokens,
        pos: 0,
    };
    let statement = match cursor.ident()?.as_str() {
        "insert" => cursor.insert(),
        "select" => cursor.select(),
        "update" => cursor.update(),
        "delete" => cursor.delete(),
        verb => Err(syntax(sql, &format!("unsupported statement \"{verb}\""))),
    }?;
    cursor.end()?;
    Ok(statement)
}

struct Cursor<'a> {
    sql: &'a str,
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Cursor<'a> {
    /// The returned token borrows the slice, not the cursor.
    fn next(&mut self) -> DriverResult<&'a Token> {
        let token = self
            .tokens
            .get(self.pos)
            .ok_or_else(|| syntax(self.sql, "unexpected end of statement"))?;
        self.pos += 1;
        Ok(token)
    }

    fn ident(&mut self) -> DriverResult<String> {
        match self.next()? {
            Token::Ident(name) => Ok(name.clone()),
            other => Err(syntax(self.sql, &format!("expected identifier, found {other:?}"))),
        }
    }

    fn keyword(&mut self, expected: &str) -> DriverResult<()> {
        let found = self.ident()?;
        if found == expected {
            Ok(())
        } else {
            Err(syntax(
                self.sql,
                &format!("expected \"{expected}\", found \"{found}\""),
            ))
        }
    }

    fn expect(&mut self, expected: &Token) -> DriverResult<()> {
        let found = self.next()?;
        if found == expected {
            Ok(())
        } else {
            Err(syntax(
                self.sql,
                &format!("expected {expected:?}, found {found:?}"),
            ))
        }
    }

    fn end(&mut self) -> DriverResult<()> {
        if self.pos == self.tokens.len() {
            Ok(())
        } else {
            Err(syntax(self.sql, "trailing tokens after statement"))
        }
    }

    fn insert(&mut self) -> DriverResult<Statement> {
        self.keyword("into")?;
        let table = self.ident()?;
        self.expect(&Token::LParen)?;
        let mut columns = vec![self.ident()?];
        while self.tokens.get(self.pos) == Some(&Token::Comma) {
            self.pos += 1;
            columns.push(self.ident()?);
        }
        self.expect(&Token::RParen)?;
        self.keyword("values")?;
        self.expect(&Token::LParen)?;
        let mut placeholders = 1;
        self.expect(&Token::Param)?;
        while self.tokens.get(self.pos) == Some(&Token::Comma) {
            self.pos += 1;
            self.expect(&Token::Param)?;
            placeholders += 1;
        }
        self.expect(&Token::RParen)?;
        if placeholders != columns.len() {
            return Err(syntax(
                self.sql,
                &format!(
                    "{} columns but {placeholders} placeholders",
                    columns.len()
                ),
            ));
        }
        Ok(Statement::Insert { table, columns })
    }

    fn select(&mut self) -> DriverResult<Statement> {
        self.expect(&Token::Star)?;
        self.keyword("from")?;
        let table = self.ident()?;
        self.keyword("where")?;
        let key_column = self.ident()?;
        self.expect(&Token::Eq)?;
        self.expect(&Token::Param)?;
        Ok(Statement::Select { table, key_column })
    }

    fn update(&mut self) -> DriverResult<Statement> {
        let table = self.ident()?;
        self.keyword("set")?;
        let set_column = self.ident()?;
        self.expect(&Token::Eq)?;
        self.expect(&Token::Param)?;
        self.keyword("where")?;
        let key_column = self.ident()?;
        self.expect(&Token::Eq)?;
        self.expect(&Token::Param)?;
        Ok(Statement::Update {
            table,
            set_column,
            key_column,
        })
    }

    fn delete(&mut self) -> DriverResult<Statement> {
        self.keyword("from")?;
        let table = self.ident()?;
        self.keyword("where")?;
        let key_column = self.ident()?;
        self.expect(&Token::Eq)?;
        self.expect(&Token::Param)?;
        Ok(Statement::Delete { table, key_column })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_insert() {
        let stmt = parse("insert into member(member_id, money) values(?, ?)").unwrap();
        assert_eq!(
            stmt,
            Statement::Insert {
                table: "member".to_owned(),
                columns: vec!["member_id".to_owned(), "money".to_owned()],
            }
        );
    }

    #[test]
    fn parses_select() {
        let stmt = parse("select * from member where member_id = ?").unwrap();
        assert_eq!(
            stmt,
            Statement::Select {
                table: "member".to_owned(),
                key_column: "member_id".to_owned(),
            }
        );
    }

    #[test]
    fn parses_update() {
        let stmt = parse("update member set money = ? where member_id = ?").unwrap();
        assert_eq!(
            stmt,
            Statement::Update {
                table: "member".to_owned(),
                set_column: "money".to_owned(),
                key_column: "member_id".to_owned(),
            }
        );
    }

    #[test]
    fn parses_delete() {
        let stmt = parse("delete from member where member_id = ?").unwrap();
        assert_eq!(
            stmt,
            Statement::Delete {
                table: "member".to_owned(),
                key_column: "member_id".to_owned(),
            }
        );
    }

    #[test]
    fn keywords_are_case_insensitive() {
        assert!(parse("SELECT * FROM member WHERE member_id = ?").is_ok());
        assert!(parse("Update member SET money=? WHERE member_id=?").is_ok());
    }

    #[test]
    fn tight_spacing_is_accepted() {
        assert!(parse("update member set money=? where member_id=?").is_ok());
        assert!(parse("insert into member(member_id,money) values(?,?)").is_ok());
    }

    #[test]
    fn unsupported_verb_is_syntax_error() {
        let err = parse("drop table member").unwrap_err();
        assert_eq!(err.code(), codes::SYNTAX_ERROR_2);
    }

    #[test]
    fn placeholder_count_mismatch_is_syntax_error() {
        let err = parse("insert into member(member_id, money) values(?)").unwrap_err();
        assert_eq!(err.code(), codes::SYNTAX_ERROR_2);
    }

    #[test]
    fn truncated_statement_is_syntax_error() {
        let err = parse("select * from member where").unwrap_err();
        assert_eq!(err.code(), codes::SYNTAX_ERROR_2);
    }

    #[test]
    fn trailing_tokens_are_rejected() {
        let err = parse("delete from member where member_id = ? extra").unwrap_err();
        assert_eq!(err.code(), codes::SYNTAX_ERROR_2);
    }

    proptest! {
        #[test]
        fn parse_never_panics(input in ".{0,200}") {
            let _ = parse(&input);
        }

        #[test]
        fn select_accepts_any_identifier_pair(
            table in "[a-z][a-z0-9_]{0,12}",
            column in "[a-z][a-z0-9_]{0,12}",
        ) {
            let sql = format!("select * from {table} where {column} = ?");
            prop_assert_eq!(
                parse(&sql).unwrap(),
                Statement::Select { table, key_column: column }
            );
        }
    }
}
