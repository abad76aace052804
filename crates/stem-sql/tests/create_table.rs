use pretty_assertions::assert_eq;
use stem_core::schema::{Column, ColumnType, ModelSchema};
use stem_sql::{Serializer, Statement};

fn contact() -> ModelSchema {
    ModelSchema::new("Contact", "tblContact")
        .auto_increment("ContactID")
        .column(Column::new("Forename", ColumnType::String))
        .column(Column::new("CompanyID", ColumnType::Integer))
        .column(Column::new("Active", ColumnType::Boolean))
}

#[test]
fn create_table_sqlite() {
    let stmt = Statement::create_table(&contact());

    assert_eq!(
        Serializer::sqlite().serialize(&stmt),
        "CREATE TABLE `tblContact` (`ContactID` INTEGER PRIMARY KEY AUTOINCREMENT, `Forename` TEXT, `CompanyID` INTEGER, `Active` INTEGER);"
    );
}

#[test]
fn create_table_mysql() {
    let stmt = Statement::create_table(&contact());

    assert_eq!(
        Serializer::mysql().serialize(&stmt),
        "CREATE TABLE `tblContact` (`ContactID` INT NOT NULL AUTO_INCREMENT, `Forename` VARCHAR(255), `CompanyID` INT, `Active` TINYINT(1), PRIMARY KEY (`ContactID`));"
    );
}

#[test]
fn create_table_with_uuid_key() {
    let token = ModelSchema::new("Token", "tblToken")
        .unique_identifier(Column::new("TokenID", ColumnType::Uuid))
        .column(Column::new("IssuedAt", ColumnType::DateTime));

    assert_eq!(
        Serializer::sqlite().serialize(&Statement::create_table(&token)),
        "CREATE TABLE `tblToken` (`TokenID` TEXT, `IssuedAt` TEXT, PRIMARY KEY (`TokenID`));"
    );
}

#[test]
fn drop_table() {
    assert_eq!(
        Serializer::sqlite().serialize(&Statement::drop_table_if_exists("tblContact")),
        "DROP TABLE IF EXISTS `tblContact`;"
    );
    assert_eq!(
        Serializer::mysql().serialize(&Statement::drop_table("tblContact")),
        "DROP TABLE `tblContact`;"
    );
}
