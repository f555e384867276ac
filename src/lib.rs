pub mod batch;
pub mod buffer;
pub mod cache;
pub mod codec;
pub mod col;
pub mod constant;
pub mod error;
mod opts;
pub mod protocol;
pub mod resultset;
pub mod row;
pub mod session;
pub mod transport;

pub use batch::{BatchResult, Outcome};
pub use buffer::BufferSet;
pub use cache::{PrepareCache, PrepareHandle};
pub use codec::{CodecContext, FromValue, Value};
pub use error::{Error, Result};
pub use opts::Opts;
pub use protocol::r#trait::param::{NonNullParameter, Param, Parameter, TimeZoneParameter};
pub use protocol::r#trait::params::Params;
pub use resultset::{QueryResult, ResultSet};
pub use row::{AnyRowDecoder, BinaryRowDecoder, RowDecoder, TextRowDecoder};
pub use session::{Session, SessionInfo};
pub use transport::{MemoryTransport, TcpTransport, Transport};

#[cfg(test)]
mod opts_test;
#[cfg(test)]
mod row_test;
