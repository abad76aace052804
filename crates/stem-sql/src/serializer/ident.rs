use super::{Formatter, ToSql};

use crate::stmt::ColumnRef;

/// A back-tick quoted identifier. Back-ticks inside the name are doubled.
pub(super) struct Ident<S>(pub(super) S);

impl<S: AsRef<str>> ToSql for Ident<S> {
    fn to_sql(self, f: &mut Formatter<'_>) {
        f.dst.push('`');
        for c in self.0.as_ref().chars() {
            if c == '`' {
                f.dst.push('`');
            }
            f.dst.push(c);
        }
        f.dst.push('`');
    }
}

/// A named placeholder, `:name`
pub(super) struct Placeholder<S>(pub(super) S);

impl<S: AsRef<str>> ToSql for Placeholder<S> {
    fn to_sql(self, f: &mut Formatter<'_>) {
        f.dst.push(':');
        f.dst.push_str(self.0.as_ref());
    }
}

impl ToSql for &ColumnRef {
    fn to_sql(self, f: &mut Formatter<'_>) {
        if let Some(table) = &self.table {
            fmt!(f, Ident(table) ".");
        }
        fmt!(f, Ident(&self.column));
    }
}
