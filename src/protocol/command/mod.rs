pub mod column_definition;
pub mod multi;
pub mod prepared;
pub mod query;
pub mod resultset;
pub mod utility;

#[cfg(test)]
mod column_definition_test;

pub use column_definition::ColumnDefinitionBytes;
pub use column_definition::ColumnDefinitionTail;

/// What a response state machine needs after consuming a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// The response continues in the next payload
    NeedPayload,
    /// The response has been read completely
    Finished,
}
