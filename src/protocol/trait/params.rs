use crate::codec::CodecContext;
use crate::error::Result;
use crate::protocol::r#trait::param::Param;
use crate::protocol::value::param_null_bitmap_len;

/// The parameter list of one statement execution
///
/// Produces the NULL bitmap, type block and value block of COM_STMT_EXECUTE.
pub trait Params {
    /// Number of parameters
    fn len(&self) -> usize;

    /// Check if there are no parameters
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn param(&self, index: usize) -> Option<&dyn Param>;

    /// Write NULL bitmap
    ///
    /// The NULL bitmap is (num_params + 7) / 8 bytes long.
    /// Bit is set to 1 if the parameter is NULL.
    fn write_null_bitmap(&self, out: &mut Vec<u8>) {
        let start = out.len();
        out.resize(start + param_null_bitmap_len(self.len()), 0);
        for idx in 0..self.len() {
            if self.param(idx).is_some_and(|p| p.is_null()) {
                out[start + (idx >> 3)] |= 1 << (idx & 7);
            }
        }
    }

    /// Write parameter types
    ///
    /// Each parameter type is 2 bytes:
    /// - 1 byte: MySQL type (MYSQL_TYPE_*)
    /// - 1 byte: unsigned flag (0x80 if unsigned, 0x00 otherwise)
    fn write_types(&self, out: &mut Vec<u8>) {
        for idx in 0..self.len() {
            let Some(param) = self.param(idx) else {
                continue;
            };
            out.push(param.binary_type().code());
            out.push(if param.is_unsigned() { 0x80 } else { 0x00 });
        }
    }

    /// Write parameter values (binary encoded)
    ///
    /// NULL parameters are skipped (they're already in the NULL bitmap).
    /// With `streamed_long_data`, parameters sent through COM_STMT_SEND_LONG_DATA are skipped too.
    fn write_values(
        &self,
        out: &mut Vec<u8>,
        ctx: &CodecContext,
        streamed_long_data: bool,
    ) -> Result<()> {
        for idx in 0..self.len() {
            let Some(param) = self.param(idx) else {
                continue;
            };
            if param.is_null() || (streamed_long_data && param.can_encode_long_data()) {
                continue;
            }
            param.encode_binary(out, ctx)?;
        }
        Ok(())
    }

    /// Whether any parameter is streamed with COM_STMT_SEND_LONG_DATA
    fn has_long_data(&self) -> bool {
        (0..self.len()).any(|idx| self.param(idx).is_some_and(|p| p.can_encode_long_data()))
    }

    /// Comma separated [`Param::debug_string`] of every parameter
    fn debug_string(&self, ctx: &CodecContext) -> String {
        (0..self.len())
            .filter_map(|idx| self.param(idx))
            .map(|p| p.debug_string(ctx))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Empty parameters (no parameters)
impl Params for () {
    fn len(&self) -> usize {
        0
    }

    fn param(&self, _index: usize) -> Option<&dyn Param> {
        None
    }
}

impl<P: Param> Params for [P] {
    fn len(&self) -> usize {
        <[P]>::len(self)
    }

    fn param(&self, index: usize) -> Option<&dyn Param> {
        self.get(index).map(|p| p as &dyn Param)
    }
}

impl<P: Param, const N: usize> Params for [P; N] {
    fn len(&self) -> usize {
        N
    }

    fn param(&self, index: usize) -> Option<&dyn Param> {
        self.get(index).map(|p| p as &dyn Param)
    }
}

impl<P: Param> Params for Vec<P> {
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn param(&self, index: usize) -> Option<&dyn Param> {
        self.get(index).map(|p| p as &dyn Param)
    }
}

impl<T: Params + ?Sized> Params for &T {
    fn len(&self) -> usize {
        (**self).len()
    }

    fn param(&self, index: usize) -> Option<&dyn Param> {
        (**self).param(index)
    }
}
