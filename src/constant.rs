/// MySQL command bytes
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandByte {
    Quit = 0x01,
    InitDb = 0x02,
    Query = 0x03,
    Ping = 0x0e,
    StmtPrepare = 0x16,
    StmtExecute = 0x17,
    StmtSendLongData = 0x18,
    StmtClose = 0x19,
    StmtReset = 0x1a,
    ResetConnection = 0x1f,
    /// MariaDB COM_MULTI: several commands in one packet
    Multi = 0xfe,
}

bitflags::bitflags! {
    /// Client/server capability flags.
    ///
    /// The lower 32 bits are the MySQL capabilities.
    /// MariaDB extended capabilities are sent in a separate field and live in the upper 32 bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CapabilityFlags: u64 {
        const CLIENT_LONG_PASSWORD = 0x00000001;
        const CLIENT_FOUND_ROWS = 0x00000002;
        const CLIENT_LONG_FLAG = 0x00000004;
        const CLIENT_CONNECT_WITH_DB = 0x00000008;
        const CLIENT_NO_SCHEMA = 0x00000010;
        const CLIENT_COMPRESS = 0x00000020;
        const CLIENT_ODBC = 0x00000040;
        const CLIENT_LOCAL_FILES = 0x00000080;
        const CLIENT_IGNORE_SPACE = 0x00000100;
        const CLIENT_PROTOCOL_41 = 0x00000200;
        const CLIENT_INTERACTIVE = 0x00000400;
        const CLIENT_SSL = 0x00000800;
        const CLIENT_IGNORE_SIGPIPE = 0x00001000;
        const CLIENT_TRANSACTIONS = 0x00002000;
        const CLIENT_RESERVED = 0x00004000;
        const CLIENT_SECURE_CONNECTION = 0x00008000;
        const CLIENT_MULTI_STATEMENTS = 0x00010000;
        const CLIENT_MULTI_RESULTS = 0x00020000;
        const CLIENT_PS_MULTI_RESULTS = 0x00040000;
        const CLIENT_PLUGIN_AUTH = 0x00080000;
        const CLIENT_CONNECT_ATTRS = 0x00100000;
        const CLIENT_PLUGIN_AUTH_LENENC_CLIENT_DATA = 0x00200000;
        const CLIENT_CAN_HANDLE_EXPIRED_PASSWORDS = 0x00400000;
        const CLIENT_SESSION_TRACK = 0x00800000;
        const CLIENT_DEPRECATE_EOF = 0x01000000;
        const CLIENT_OPTIONAL_RESULTSET_METADATA = 0x02000000;
        const CLIENT_ZSTD_COMPRESSION_ALGORITHM = 0x04000000;
        const CLIENT_QUERY_ATTRIBUTES = 0x08000000;
        const CLIENT_MULTI_FACTOR_AUTHENTICATION = 0x10000000;
        const CLIENT_CAPABILITY_EXTENSION = 0x20000000;
        const CLIENT_SSL_VERIFY_SERVER_CERT = 0x40000000;
        const CLIENT_REMEMBER_OPTIONS = 0x80000000;

        const MARIADB_CLIENT_PROGRESS = 1 << 32;
        const MARIADB_CLIENT_COM_MULTI = 1 << 33;
        const MARIADB_CLIENT_STMT_BULK_OPERATIONS = 1 << 34;
        const MARIADB_CLIENT_EXTENDED_TYPE_INFO = 1 << 35;
        const MARIADB_CLIENT_CACHE_METADATA = 1 << 36;
    }
}

bitflags::bitflags! {
    /// Server status flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ServerStatusFlags: u16 {
        const SERVER_STATUS_IN_TRANS = 0x0001;
        const SERVER_STATUS_AUTOCOMMIT = 0x0002;
        const SERVER_MORE_RESULTS_EXISTS = 0x0008;
        const SERVER_STATUS_NO_GOOD_INDEX_USED = 0x0010;
        const SERVER_STATUS_NO_INDEX_USED = 0x0020;
        const SERVER_STATUS_CURSOR_EXISTS = 0x0040;
        const SERVER_STATUS_LAST_ROW_SENT = 0x0080;
        const SERVER_STATUS_DB_DROPPED = 0x0100;
        const SERVER_STATUS_NO_BACKSLASH_ESCAPES = 0x0200;
        const SERVER_STATUS_METADATA_CHANGED = 0x0400;
        const SERVER_QUERY_WAS_SLOW = 0x0800;
        const SERVER_PS_OUT_PARAMS = 0x1000;
        const SERVER_STATUS_IN_TRANS_READONLY = 0x2000;
        const SERVER_SESSION_STATE_CHANGED = 0x4000;
    }
}

bitflags::bitflags! {
    /// Column definition flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ColumnFlags: u16 {
        const NOT_NULL_FLAG = 0x0001;
        const PRI_KEY_FLAG = 0x0002;
        const UNIQUE_KEY_FLAG = 0x0004;
        const MULTIPLE_KEY_FLAG = 0x0008;
        const BLOB_FLAG = 0x0010;
        const UNSIGNED_FLAG = 0x0020;
        const ZEROFILL_FLAG = 0x0040;
        const BINARY_FLAG = 0x0080;
        const ENUM_FLAG = 0x0100;
        const AUTO_INCREMENT_FLAG = 0x0200;
        const TIMESTAMP_FLAG = 0x0400;
        const SET_FLAG = 0x0800;
        const NO_DEFAULT_VALUE_FLAG = 0x1000;
        const ON_UPDATE_NOW_FLAG = 0x2000;
        const PART_KEY_FLAG = 0x4000;
        const NUM_FLAG = 0x8000;
    }
}

/// Charset number of binary (non-text) columns
pub const BINARY_CHARSET: u16 = 63;

/// Length-encoded prefix byte meaning SQL NULL
pub const NULL_LENGTH_MARKER: u8 = 0xFB;

/// MySQL column types
///
/// Servers may introduce new type codes; those decode to `MYSQL_TYPE_UNSUPPORTED`.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    MYSQL_TYPE_DECIMAL,
    MYSQL_TYPE_TINY,
    MYSQL_TYPE_SHORT,
    MYSQL_TYPE_LONG,
    MYSQL_TYPE_FLOAT,
    MYSQL_TYPE_DOUBLE,
    MYSQL_TYPE_NULL,
    MYSQL_TYPE_TIMESTAMP,
    MYSQL_TYPE_LONGLONG,
    MYSQL_TYPE_INT24,
    MYSQL_TYPE_DATE,
    MYSQL_TYPE_TIME,
    MYSQL_TYPE_DATETIME,
    MYSQL_TYPE_YEAR,
    MYSQL_TYPE_NEWDATE,
    MYSQL_TYPE_VARCHAR,
    MYSQL_TYPE_BIT,
    MYSQL_TYPE_JSON,
    MYSQL_TYPE_NEWDECIMAL,
    MYSQL_TYPE_ENUM,
    MYSQL_TYPE_SET,
    MYSQL_TYPE_TINY_BLOB,
    MYSQL_TYPE_MEDIUM_BLOB,
    MYSQL_TYPE_LONG_BLOB,
    MYSQL_TYPE_BLOB,
    MYSQL_TYPE_VAR_STRING,
    MYSQL_TYPE_STRING,
    MYSQL_TYPE_GEOMETRY,
    MYSQL_TYPE_UNSUPPORTED,
}

static COLUMN_TYPES: [ColumnType; 256] = build_column_type_table();

const fn build_column_type_table() -> [ColumnType; 256] {
    use ColumnType::*;
    let mut table = [MYSQL_TYPE_UNSUPPORTED; 256];
    let known = [
        MYSQL_TYPE_DECIMAL,
        MYSQL_TYPE_TINY,
        MYSQL_TYPE_SHORT,
        MYSQL_TYPE_LONG,
        MYSQL_TYPE_FLOAT,
        MYSQL_TYPE_DOUBLE,
        MYSQL_TYPE_NULL,
        MYSQL_TYPE_TIMESTAMP,
        MYSQL_TYPE_LONGLONG,
        MYSQL_TYPE_INT24,
        MYSQL_TYPE_DATE,
        MYSQL_TYPE_TIME,
        MYSQL_TYPE_DATETIME,
        MYSQL_TYPE_YEAR,
        MYSQL_TYPE_NEWDATE,
        MYSQL_TYPE_VARCHAR,
        MYSQL_TYPE_BIT,
        MYSQL_TYPE_JSON,
        MYSQL_TYPE_NEWDECIMAL,
        MYSQL_TYPE_ENUM,
        MYSQL_TYPE_SET,
        MYSQL_TYPE_TINY_BLOB,
        MYSQL_TYPE_MEDIUM_BLOB,
        MYSQL_TYPE_LONG_BLOB,
        MYSQL_TYPE_BLOB,
        MYSQL_TYPE_VAR_STRING,
        MYSQL_TYPE_STRING,
        MYSQL_TYPE_GEOMETRY,
    ];
    let mut i = 0;
    while i < known.len() {
        table[known[i].code() as usize] = known[i];
        i += 1;
    }
    table
}

impl ColumnType {
    /// Look up the column type of a wire type code.
    #[inline]
    pub fn from_code(code: u8) -> Self {
        COLUMN_TYPES[code as usize]
    }

    /// The wire type code. `MYSQL_TYPE_UNSUPPORTED` has no code of its own and reports 0xFF
    /// (GEOMETRY), which the server treats as opaque bytes.
    pub const fn code(self) -> u8 {
        match self {
            Self::MYSQL_TYPE_DECIMAL => 0x00,
            Self::MYSQL_TYPE_TINY => 0x01,
            Self::MYSQL_TYPE_SHORT => 0x02,
            Self::MYSQL_TYPE_LONG => 0x03,
            Self::MYSQL_TYPE_FLOAT => 0x04,
            Self::MYSQL_TYPE_DOUBLE => 0x05,
            Self::MYSQL_TYPE_NULL => 0x06,
            Self::MYSQL_TYPE_TIMESTAMP => 0x07,
            Self::MYSQL_TYPE_LONGLONG => 0x08,
            Self::MYSQL_TYPE_INT24 => 0x09,
            Self::MYSQL_TYPE_DATE => 0x0a,
            Self::MYSQL_TYPE_TIME => 0x0b,
            Self::MYSQL_TYPE_DATETIME => 0x0c,
            Self::MYSQL_TYPE_YEAR => 0x0d,
            Self::MYSQL_TYPE_NEWDATE => 0x0e,
            Self::MYSQL_TYPE_VARCHAR => 0x0f,
            Self::MYSQL_TYPE_BIT => 0x10,
            Self::MYSQL_TYPE_JSON => 0xf5,
            Self::MYSQL_TYPE_NEWDECIMAL => 0xf6,
            Self::MYSQL_TYPE_ENUM => 0xf7,
            Self::MYSQL_TYPE_SET => 0xf8,
            Self::MYSQL_TYPE_TINY_BLOB => 0xf9,
            Self::MYSQL_TYPE_MEDIUM_BLOB => 0xfa,
            Self::MYSQL_TYPE_LONG_BLOB => 0xfb,
            Self::MYSQL_TYPE_BLOB => 0xfc,
            Self::MYSQL_TYPE_VAR_STRING => 0xfd,
            Self::MYSQL_TYPE_STRING => 0xfe,
            Self::MYSQL_TYPE_GEOMETRY | Self::MYSQL_TYPE_UNSUPPORTED => 0xff,
        }
    }

    /// Byte width of a non-NULL value in a binary protocol row, or `None` when the value
    /// carries its own length prefix.
    pub const fn fixed_binary_width(self) -> Option<usize> {
        match self {
            Self::MYSQL_TYPE_LONGLONG | Self::MYSQL_TYPE_DOUBLE => Some(8),
            Self::MYSQL_TYPE_LONG | Self::MYSQL_TYPE_INT24 | Self::MYSQL_TYPE_FLOAT => Some(4),
            Self::MYSQL_TYPE_SHORT | Self::MYSQL_TYPE_YEAR => Some(2),
            Self::MYSQL_TYPE_TINY => Some(1),
            Self::MYSQL_TYPE_NULL => Some(0),
            _ => None,
        }
    }

    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            Self::MYSQL_TYPE_TINY
                | Self::MYSQL_TYPE_SHORT
                | Self::MYSQL_TYPE_LONG
                | Self::MYSQL_TYPE_INT24
                | Self::MYSQL_TYPE_LONGLONG
                | Self::MYSQL_TYPE_YEAR
        )
    }

    pub const fn is_decimal(self) -> bool {
        matches!(self, Self::MYSQL_TYPE_DECIMAL | Self::MYSQL_TYPE_NEWDECIMAL)
    }

    pub const fn is_float(self) -> bool {
        matches!(self, Self::MYSQL_TYPE_FLOAT | Self::MYSQL_TYPE_DOUBLE)
    }

    pub const fn is_numeric(self) -> bool {
        self.is_integer() || self.is_decimal() || self.is_float()
    }

    /// DATE, DATETIME and TIMESTAMP share the date-time binary layout.
    pub const fn is_date_like(self) -> bool {
        matches!(
            self,
            Self::MYSQL_TYPE_DATE
                | Self::MYSQL_TYPE_NEWDATE
                | Self::MYSQL_TYPE_DATETIME
                | Self::MYSQL_TYPE_TIMESTAMP
        )
    }

    pub const fn is_temporal(self) -> bool {
        self.is_date_like() || matches!(self, Self::MYSQL_TYPE_TIME)
    }

    /// Types whose text and binary encodings are both a length-encoded byte string.
    pub const fn is_string_like(self) -> bool {
        matches!(
            self,
            Self::MYSQL_TYPE_VARCHAR
                | Self::MYSQL_TYPE_VAR_STRING
                | Self::MYSQL_TYPE_STRING
                | Self::MYSQL_TYPE_ENUM
                | Self::MYSQL_TYPE_SET
                | Self::MYSQL_TYPE_JSON
                | Self::MYSQL_TYPE_TINY_BLOB
                | Self::MYSQL_TYPE_MEDIUM_BLOB
                | Self::MYSQL_TYPE_LONG_BLOB
                | Self::MYSQL_TYPE_BLOB
                | Self::MYSQL_TYPE_GEOMETRY
        )
    }

    pub const fn is_blob(self) -> bool {
        matches!(
            self,
            Self::MYSQL_TYPE_TINY_BLOB
                | Self::MYSQL_TYPE_MEDIUM_BLOB
                | Self::MYSQL_TYPE_LONG_BLOB
                | Self::MYSQL_TYPE_BLOB
                | Self::MYSQL_TYPE_GEOMETRY
        )
    }

    /// SQL name used in error messages
    pub const fn sql_name(self) -> &'static str {
        match self {
            Self::MYSQL_TYPE_DECIMAL | Self::MYSQL_TYPE_NEWDECIMAL => "DECIMAL",
            Self::MYSQL_TYPE_TINY => "TINYINT",
            Self::MYSQL_TYPE_SHORT => "SMALLINT",
            Self::MYSQL_TYPE_LONG => "INT",
            Self::MYSQL_TYPE_FLOAT => "FLOAT",
            Self::MYSQL_TYPE_DOUBLE => "DOUBLE",
            Self::MYSQL_TYPE_NULL => "NULL",
            Self::MYSQL_TYPE_TIMESTAMP => "TIMESTAMP",
            Self::MYSQL_TYPE_LONGLONG => "BIGINT",
            Self::MYSQL_TYPE_INT24 => "MEDIUMINT",
            Self::MYSQL_TYPE_DATE | Self::MYSQL_TYPE_NEWDATE => "DATE",
            Self::MYSQL_TYPE_TIME => "TIME",
            Self::MYSQL_TYPE_DATETIME => "DATETIME",
            Self::MYSQL_TYPE_YEAR => "YEAR",
            Self::MYSQL_TYPE_VARCHAR | Self::MYSQL_TYPE_VAR_STRING => "VARCHAR",
            Self::MYSQL_TYPE_BIT => "BIT",
            Self::MYSQL_TYPE_JSON => "JSON",
            Self::MYSQL_TYPE_ENUM => "ENUM",
            Self::MYSQL_TYPE_SET => "SET",
            Self::MYSQL_TYPE_TINY_BLOB => "TINYBLOB",
            Self::MYSQL_TYPE_MEDIUM_BLOB => "MEDIUMBLOB",
            Self::MYSQL_TYPE_LONG_BLOB => "LONGBLOB",
            Self::MYSQL_TYPE_BLOB => "BLOB",
            Self::MYSQL_TYPE_STRING => "CHAR",
            Self::MYSQL_TYPE_GEOMETRY => "GEOMETRY",
            Self::MYSQL_TYPE_UNSUPPORTED => "UNSUPPORTED",
        }
    }
}
