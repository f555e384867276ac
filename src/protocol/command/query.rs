use crate::codec::CodecContext;
use crate::constant::CommandByte;
use crate::error::{Error, Result};
use crate::protocol::primitive::*;
use crate::protocol::r#trait::params::Params;

/// Write COM_QUERY command
pub fn write_query(out: &mut Vec<u8>, sql: &str) {
    write_int_1(out, CommandByte::Query as u8);
    out.extend_from_slice(sql.as_bytes());
}

/// Write COM_QUERY command with parameters substituted client-side
///
/// `parts` is the query split at its placeholders, so it holds one more part than there are
/// parameters. Each parameter is written as an SQL literal between two parts.
pub fn write_text_query<P: Params + ?Sized>(
    out: &mut Vec<u8>,
    parts: &[&str],
    params: &P,
    ctx: &CodecContext,
) -> Result<()> {
    if parts.len() != params.len() + 1 {
        return Err(Error::BadUsageError(format!(
            "query has {} placeholders but {} parameters were given",
            parts.len().saturating_sub(1),
            params.len()
        )));
    }
    write_int_1(out, CommandByte::Query as u8);
    for (idx, part) in parts.iter().enumerate() {
        out.extend_from_slice(part.as_bytes());
        if let Some(param) = params.param(idx) {
            param.encode_text(out, ctx)?;
        }
    }
    Ok(())
}

/// Split a query at its `?` placeholders, skipping those inside quotes and backticks.
pub fn split_placeholders(sql: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quote: Option<u8> = None;
    let mut escaped = false;
    let mut start = 0;
    for (idx, byte) in sql.bytes().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, byte) {
            (Some(_), b'\\') => escaped = true,
            (Some(q), b) if b == q => quote = None,
            (Some(_), _) => {}
            (None, b'\'' | b'"' | b'`') => quote = Some(byte),
            (None, b'?') => {
                parts.push(&sql[start..idx]);
                start = idx + 1;
            }
            (None, _) => {}
        }
    }
    parts.push(&sql[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Value;
    use crate::protocol::r#trait::param::Parameter;
    use pretty_assertions::assert_eq;

    #[test]
    fn plain_query() {
        let mut out = Vec::new();
        write_query(&mut out, "SELECT 1");
        assert_eq!(out, b"\x03SELECT 1");
    }

    #[test]
    fn substituted_query() {
        let parts = split_placeholders("INSERT INTO t VALUES (?, ?, '?')");
        assert_eq!(parts, ["INSERT INTO t VALUES (", ", ", ", '?')"]);

        let params = [Parameter::new("it's"), Parameter::new(Value::Null)];
        let mut out = Vec::new();
        write_text_query(&mut out, &parts, &params, &CodecContext::default()).unwrap();
        assert_eq!(out, b"\x03INSERT INTO t VALUES ('it\\'s', null, '?')");
    }

    #[test]
    fn placeholder_count_mismatch() {
        let params = [Parameter::new(1i32)];
        let mut out = Vec::new();
        assert!(matches!(
            write_text_query(&mut out, &["SELECT 1"], &params, &CodecContext::default()),
            Err(Error::BadUsageError(_))
        ));
        assert!(out.is_empty());
    }
}
