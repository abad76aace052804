use stem_core::schema::{Column, ColumnType};

#[derive(Debug, Clone)]
pub struct ColumnDef {
    /// Name of the column
    pub name: String,

    /// Column type
    pub ty: ColumnType,

    /// True if the column is the table's primary key
    pub primary_key: bool,
}

impl ColumnDef {
    pub(crate) fn from_schema(column: &Column, primary_key: bool) -> ColumnDef {
        ColumnDef {
            name: column.name.clone(),
            ty: column.ty,
            primary_key,
        }
    }

    pub fn is_auto_increment(&self) -> bool {
        self.ty.is_auto_increment()
    }
}
