//! Typed column access for tiberius rows.
//!
//! `Row::get` panics on a type mismatch; these helpers go through `try_get`
//! and turn NULLs in required columns into conversion errors.

use tiberius::Row;
use tiberius::error::Error;

/// Extension trait for extracting typed values from result rows.
pub(crate) trait RowExt {
    fn opt_text(&self, idx: usize) -> tiberius::Result<Option<String>>;
    fn text(&self, idx: usize) -> tiberius::Result<String>;
    fn int(&self, idx: usize) -> tiberius::Result<i32>;
    fn flag(&self, idx: usize) -> tiberius::Result<bool>;
}

fn null_in(idx: usize) -> Error {
    Error::Conversion(format!("unexpected NULL in column {}", idx).into())
}

impl RowExt for Row {
    fn opt_text(&self, idx: usize) -> tiberius::Result<Option<String>> {
        Ok(self.try_get::<&str, _>(idx)?.map(str::to_string))
    }

    fn text(&self, idx: usize) -> tiberius::Result<String> {
        self.opt_text(idx)?.ok_or_else(|| null_in(idx))
    }

    fn int(&self, idx: usize) -> tiberius::Result<i32> {
        self.try_get::<i32, _>(idx)?.ok_or_else(|| null_in(idx))
    }

    fn flag(&self, idx: usize) -> tiberius::Result<bool> {
        self.try_get::<bool, _>(idx)?.ok_or_else(|| null_in(idx))
    }
}
