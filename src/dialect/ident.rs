//! Identifier quoting and validation
//!
//! User and database names are interpolated into DDL as quoted identifiers;
//! they cannot be bound as parameters. Quoting doubles the quote character, and
//! validation rejects names the server would truncate or that carry control
//! characters.

use crate::error::{Error, Result};

/// PostgreSQL identifier limit (NAMEDATALEN - 1), in bytes
pub const POSTGRES_MAX_IDENTIFIER_BYTES: usize = 63;

/// MySQL database name limit, in characters
pub const MYSQL_MAX_DATABASE_CHARS: usize = 64;

/// MySQL user name limit, in characters
pub const MYSQL_MAX_USER_CHARS: usize = 32;

/// Quote a PostgreSQL identifier: `app"x` becomes `"app""x"`
pub fn quote_postgres(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a MySQL identifier: ``app`x`` becomes ```app``x```
pub fn quote_mysql(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Validate a name against the common rules and a length limit
///
/// `max_len` is measured with `measure`, so callers choose bytes or chars.
pub fn validate(name: &str, kind: &str, max_len: usize, measure: fn(&str) -> usize) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_identifier(name, format!("{kind} name is empty")));
    }

    if name.contains('\0') {
        return Err(Error::invalid_identifier(
            name.replace('\0', "\\0"),
            format!("{kind} name contains a NUL byte"),
        ));
    }

    if name.chars().any(char::is_control) {
        return Err(Error::invalid_identifier(
            name.escape_debug().to_string(),
            format!("{kind} name contains control characters"),
        ));
    }

    if name.trim() != name {
        return Err(Error::invalid_identifier(
            name,
            format!("{kind} name has leading or trailing whitespace"),
        ));
    }

    let len = measure(name);
    if len > max_len {
        return Err(Error::invalid_identifier(
            name,
            format!("{kind} name is {len} long, the limit is {max_len}"),
        ));
    }

    Ok(())
}

/// Length in bytes
pub fn byte_len(name: &str) -> usize {
    name.len()
}

/// Length in characters
pub fn char_len(name: &str) -> usize {
    name.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("app", "\"app\"" ; "plain")]
    #[test_case("my app", "\"my app\"" ; "space")]
    #[test_case("we\"ird", "\"we\"\"ird\"" ; "embedded quote")]
    #[test_case("O'Brien", "\"O'Brien\"" ; "single quote untouched")]
    fn test_quote_postgres(name: &str, expected: &str) {
        assert_eq!(quote_postgres(name), expected);
    }

    #[test_case("app", "`app`" ; "plain")]
    #[test_case("we`ird", "`we``ird`" ; "embedded backtick")]
    #[test_case("a\"b", "`a\"b`" ; "double quote untouched")]
    fn test_quote_mysql(name: &str, expected: &str) {
        assert_eq!(quote_mysql(name), expected);
    }

    #[test]
    fn test_validate_accepts_reasonable_names() {
        assert!(validate("app_db", "database", 63, byte_len).is_ok());
        assert!(validate("we\"ird", "user", 63, byte_len).is_ok());
        assert!(validate("ünïcode", "user", 32, char_len).is_ok());
    }

    #[test]
    fn test_validate_rejects_control_characters() {
        assert!(validate("bad\0name", "user", 63, byte_len).is_err());
        assert!(validate("bad\nname", "user", 63, byte_len).is_err());
        assert!(validate("tab\tname", "database", 63, byte_len).is_err());
    }

    #[test]
    fn test_validate_rejects_padding_and_empty() {
        assert!(validate("", "user", 63, byte_len).is_err());
        assert!(validate(" app", "user", 63, byte_len).is_err());
        assert!(validate("app ", "user", 63, byte_len).is_err());
    }

    #[test]
    fn test_validate_length_units() {
        let sixty_four = "a".repeat(64);
        assert!(validate(&sixty_four, "database", 63, byte_len).is_err());
        assert!(validate(&sixty_four, "database", 64, char_len).is_ok());

        // 32 two-byte characters: 64 bytes, 32 chars
        let wide = "é".repeat(32);
        assert!(validate(&wide, "user", 63, byte_len).is_err());
        assert!(validate(&wide, "user", 32, char_len).is_ok());
    }
}
