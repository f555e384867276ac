use crate::constant::{BINARY_CHARSET, ColumnFlags, ColumnType};

/// utf8mb4_general_ci
pub const UTF8MB4_CHARSET: u16 = 45;

/// Column descriptor parsed from a result-set header
///
/// Immutable once built. Row decoders and codecs borrow it for the lifetime of a result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    pub catalog: String,
    pub schema: String,
    pub table: String,
    pub org_table: String,
    pub name: String,
    pub org_name: String,
    pub charset: u16,
    pub column_length: u32,
    pub column_type: ColumnType,
    pub flags: ColumnFlags,
    pub decimals: u8,
}

impl ColumnDefinition {
    /// Build a synthetic descriptor for a column the server never described,
    /// such as generated keys.
    pub fn create(name: &str, column_type: ColumnType) -> Self {
        let (column_length, charset) = match column_type {
            ColumnType::MYSQL_TYPE_TINY => (4, BINARY_CHARSET),
            ColumnType::MYSQL_TYPE_SHORT | ColumnType::MYSQL_TYPE_YEAR => (6, BINARY_CHARSET),
            ColumnType::MYSQL_TYPE_INT24 => (9, BINARY_CHARSET),
            ColumnType::MYSQL_TYPE_LONG => (11, BINARY_CHARSET),
            ColumnType::MYSQL_TYPE_LONGLONG => (20, BINARY_CHARSET),
            ColumnType::MYSQL_TYPE_FLOAT => (12, BINARY_CHARSET),
            ColumnType::MYSQL_TYPE_DOUBLE => (22, BINARY_CHARSET),
            ColumnType::MYSQL_TYPE_DECIMAL | ColumnType::MYSQL_TYPE_NEWDECIMAL => {
                (65, BINARY_CHARSET)
            }
            ColumnType::MYSQL_TYPE_DATE | ColumnType::MYSQL_TYPE_NEWDATE => (10, BINARY_CHARSET),
            ColumnType::MYSQL_TYPE_TIME => (10, BINARY_CHARSET),
            ColumnType::MYSQL_TYPE_DATETIME | ColumnType::MYSQL_TYPE_TIMESTAMP => {
                (19, BINARY_CHARSET)
            }
            ColumnType::MYSQL_TYPE_BIT => (1, BINARY_CHARSET),
            ColumnType::MYSQL_TYPE_TINY_BLOB => (255, UTF8MB4_CHARSET),
            ColumnType::MYSQL_TYPE_BLOB => (65_535, UTF8MB4_CHARSET),
            ColumnType::MYSQL_TYPE_MEDIUM_BLOB => (16_777_215, UTF8MB4_CHARSET),
            ColumnType::MYSQL_TYPE_LONG_BLOB | ColumnType::MYSQL_TYPE_JSON => {
                (u32::MAX, UTF8MB4_CHARSET)
            }
            ColumnType::MYSQL_TYPE_GEOMETRY => (u32::MAX, BINARY_CHARSET),
            _ => (192, UTF8MB4_CHARSET),
        };
        let mut flags = ColumnFlags::empty();
        if column_type.is_numeric() || column_type.is_temporal() {
            flags |= ColumnFlags::NUM_FLAG;
        }
        if column_type.is_blob() {
            flags |= ColumnFlags::BLOB_FLAG;
        }
        if charset == BINARY_CHARSET && !column_type.is_numeric() {
            flags |= ColumnFlags::BINARY_FLAG;
        }
        Self {
            catalog: "def".to_string(),
            schema: String::new(),
            table: String::new(),
            org_table: String::new(),
            name: name.to_string(),
            org_name: name.to_string(),
            charset,
            column_length,
            column_type,
            flags,
            decimals: 0,
        }
    }

    pub fn with_flags(mut self, flags: ColumnFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn is_unsigned(&self) -> bool {
        self.flags.contains(ColumnFlags::UNSIGNED_FLAG)
    }

    pub fn is_signed(&self) -> bool {
        self.column_type.is_numeric() && !self.is_unsigned()
    }

    pub fn is_nullable(&self) -> bool {
        !self.flags.contains(ColumnFlags::NOT_NULL_FLAG)
    }

    pub fn is_auto_increment(&self) -> bool {
        self.flags.contains(ColumnFlags::AUTO_INCREMENT_FLAG)
    }

    pub fn is_primary_key(&self) -> bool {
        self.flags.contains(ColumnFlags::PRI_KEY_FLAG)
    }

    /// Binary collation: the bytes are not text in any character set.
    pub fn is_binary(&self) -> bool {
        self.charset == BINARY_CHARSET
    }

    /// BIT(1) and TINYINT(1) are read as booleans.
    pub fn is_boolean_like(&self) -> bool {
        match self.column_type {
            ColumnType::MYSQL_TYPE_BIT => self.column_length == 1,
            ColumnType::MYSQL_TYPE_TINY => self.column_length == 1,
            _ => false,
        }
    }

    /// Maximum number of characters needed to display a value of this column.
    pub fn display_size(&self) -> u32 {
        match self.column_type {
            ColumnType::MYSQL_TYPE_VARCHAR
            | ColumnType::MYSQL_TYPE_VAR_STRING
            | ColumnType::MYSQL_TYPE_STRING
            | ColumnType::MYSQL_TYPE_ENUM
            | ColumnType::MYSQL_TYPE_SET
            | ColumnType::MYSQL_TYPE_TINY_BLOB
            | ColumnType::MYSQL_TYPE_BLOB
            | ColumnType::MYSQL_TYPE_MEDIUM_BLOB
            | ColumnType::MYSQL_TYPE_LONG_BLOB
            | ColumnType::MYSQL_TYPE_JSON => {
                // Server reports byte length; convert to characters for multi-byte charsets.
                match max_char_bytes(self.charset) {
                    0 | 1 => self.column_length,
                    n => self.column_length / n,
                }
            }
            _ => self.column_length,
        }
    }
}

fn max_char_bytes(charset: u16) -> u32 {
    match charset {
        BINARY_CHARSET => 1,
        33 | 83 | 192..=215 => 3,
        45 | 46 | 224..=247 | 255..=323 => 4,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_numeric_column() {
        let col = ColumnDefinition::create("id", ColumnType::MYSQL_TYPE_LONGLONG);
        assert_eq!(col.name, "id");
        assert_eq!(col.column_length, 20);
        assert!(col.is_binary());
        assert!(col.is_signed());
        assert!(col.is_nullable());
        assert!(!col.flags.contains(ColumnFlags::BINARY_FLAG));

        let col = col.with_flags(ColumnFlags::UNSIGNED_FLAG | ColumnFlags::NOT_NULL_FLAG);
        assert!(col.is_unsigned());
        assert!(!col.is_signed());
        assert!(!col.is_nullable());
    }

    #[test]
    fn create_text_column() {
        let col = ColumnDefinition::create("name", ColumnType::MYSQL_TYPE_VAR_STRING);
        assert_eq!(col.charset, UTF8MB4_CHARSET);
        assert!(!col.is_binary());
        assert_eq!(col.display_size(), 48);
    }

    #[test]
    fn boolean_like() {
        let mut col = ColumnDefinition::create("flag", ColumnType::MYSQL_TYPE_TINY);
        assert!(!col.is_boolean_like());
        col.column_length = 1;
        assert!(col.is_boolean_like());
    }
}
