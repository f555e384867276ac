use crate::codec::CodecContext;
use crate::error::Result;
use crate::protocol::command::prepared::write_execute;
use crate::protocol::command::query::{write_query, write_text_query};
use crate::protocol::r#trait::params::Params;

/// The sub-commands of one batch
pub trait BatchCommands {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether results come back as binary rows
    fn is_binary(&self) -> bool;

    /// Append the payload of sub-command `index`.
    fn write_command(&self, index: usize, out: &mut Vec<u8>, ctx: &CodecContext) -> Result<()>;

    /// Rendering of sub-command `index` for logs
    fn describe(&self, index: usize, ctx: &CodecContext) -> String;
}

/// One prepared statement executed with each parameter set
///
/// Long-data parameters are encoded inline.
#[derive(Debug)]
pub struct ExecuteCommands<'a, P> {
    pub statement_id: u32,
    pub param_sets: &'a [P],
}

impl<P: Params> BatchCommands for ExecuteCommands<'_, P> {
    fn len(&self) -> usize {
        self.param_sets.len()
    }

    fn is_binary(&self) -> bool {
        true
    }

    fn write_command(&self, index: usize, out: &mut Vec<u8>, ctx: &CodecContext) -> Result<()> {
        match self.param_sets.get(index) {
            Some(params) => write_execute(out, self.statement_id, params, ctx, false),
            None => Ok(()),
        }
    }

    fn describe(&self, index: usize, ctx: &CodecContext) -> String {
        self.param_sets
            .get(index)
            .map(|params| params.debug_string(ctx))
            .unwrap_or_default()
    }
}

/// One query text with each parameter set substituted client side
#[derive(Debug)]
pub struct TextCommands<'a, P> {
    /// Query text split at `?` placeholders
    pub parts: &'a [&'a str],
    pub param_sets: &'a [P],
}

impl<P: Params> BatchCommands for TextCommands<'_, P> {
    fn len(&self) -> usize {
        self.param_sets.len()
    }

    fn is_binary(&self) -> bool {
        false
    }

    fn write_command(&self, index: usize, out: &mut Vec<u8>, ctx: &CodecContext) -> Result<()> {
        match self.param_sets.get(index) {
            Some(params) => write_text_query(out, self.parts, params, ctx),
            None => Ok(()),
        }
    }

    fn describe(&self, index: usize, ctx: &CodecContext) -> String {
        self.param_sets
            .get(index)
            .map(|params| params.debug_string(ctx))
            .unwrap_or_default()
    }
}

/// Distinct query texts
#[derive(Debug)]
pub struct QueryCommands<'a, S> {
    pub queries: &'a [S],
}

impl<S: AsRef<str>> BatchCommands for QueryCommands<'_, S> {
    fn len(&self) -> usize {
        self.queries.len()
    }

    fn is_binary(&self) -> bool {
        false
    }

    fn write_command(&self, index: usize, out: &mut Vec<u8>, _ctx: &CodecContext) -> Result<()> {
        if let Some(sql) = self.queries.get(index) {
            write_query(out, sql.as_ref());
        }
        Ok(())
    }

    fn describe(&self, index: usize, _ctx: &CodecContext) -> String {
        self.queries
            .get(index)
            .map(|sql| sql.as_ref().to_string())
            .unwrap_or_default()
    }
}
