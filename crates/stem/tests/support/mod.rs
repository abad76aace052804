#![allow(dead_code)]

use stem::{
    schema::{Column, ColumnType, ModelSchema},
    Db, Model, Schema, Value,
};

pub fn schema() -> Schema {
    Schema::builder()
        .model(
            ModelSchema::new("Company", "tblCompany")
                .auto_increment("CompanyID")
                .column(Column::new("CompanyName", ColumnType::String)),
        )
        .model(
            ModelSchema::new("Contact", "tblContact")
                .auto_increment("ContactID")
                .column(Column::new("Forename", ColumnType::String))
                .column(Column::new("Surname", ColumnType::String))
                .column(Column::new("CompanyID", ColumnType::Integer))
                .column(Column::new("DateOfBirth", ColumnType::Date))
                .column(Column::new("Active", ColumnType::Boolean).default_value(true)),
        )
        .model(
            ModelSchema::new("User", "tblUser")
                .auto_increment("UserID")
                .column(Column::new("Username", ColumnType::String))
                .column(Column::new("Wage", ColumnType::Integer))
                .column(Column::new("CompanyID", ColumnType::Integer)),
        )
        .model(
            ModelSchema::new("Tag", "tblTag")
                .auto_increment("TagID")
                .column(Column::new("TagName", ColumnType::String)),
        )
        .model(
            ModelSchema::new("ContactTag", "tblContactTag")
                .auto_increment("ContactTagID")
                .column(Column::new("ContactID", ColumnType::Integer))
                .column(Column::new("TagID", ColumnType::Integer)),
        )
        .one_to_many(
            "Contacts",
            ("Company", "CompanyID"),
            ("Contact", "CompanyID"),
            "Company",
        )
        .one_to_many(
            "Users",
            ("Company", "CompanyID"),
            ("User", "CompanyID"),
            "Company",
        )
        .many_to_many(
            "Tags",
            ("Contact", "ContactID"),
            ("ContactTag", "ContactID", "TagID"),
            ("Tag", "TagID"),
            "Contacts",
        )
        .build()
        .unwrap()
}

pub fn sqlite() -> Db {
    let db = Db::builder()
        .schema(schema())
        .connect("sqlite::memory:")
        .unwrap();
    db.push_schema().unwrap();
    db
}

pub fn offline() -> Db {
    Db::builder().schema(schema()).offline().unwrap()
}

/// An SQLite handle and an offline handle over the same schema.
pub fn both() -> [Db; 2] {
    [sqlite(), offline()]
}

pub fn insert<V: Into<Value>>(db: &Db, model: &str, values: impl IntoIterator<Item = (&'static str, V)>) -> Model {
    let mut model = db.create(model).unwrap();
    for (column, value) in values {
        model.set(column, value).unwrap();
    }
    db.save(&mut model).unwrap();
    model
}

/// Companies C1, C2 and C3 and four contacts.
pub fn seed_contacts(db: &Db) {
    for name in ["C1", "C2", "C3"] {
        insert(db, "Company", [("CompanyName", name)]);
    }

    for (forename, surname, company) in [
        ("John", "Doe", 1),
        ("Mary", "Smith", 2),
        ("Jule", "Jones", 3),
        ("John", "Smith", 1),
    ] {
        insert(
            db,
            "Contact",
            [
                ("Forename", Value::from(forename)),
                ("Surname", Value::from(surname)),
                ("CompanyID", Value::from(company)),
            ],
        );
    }
}

/// Two companies, with users earning 100 and 200, and 300 and 400.
pub fn seed_wages(db: &Db) {
    for name in ["C1", "C2"] {
        insert(db, "Company", [("CompanyName", name)]);
    }

    for (username, wage, company) in [
        ("ann", 100, 1),
        ("bob", 200, 1),
        ("cat", 300, 2),
        ("dan", 400, 2),
    ] {
        insert(
            db,
            "User",
            [
                ("Username", Value::from(username)),
                ("Wage", Value::from(wage)),
                ("CompanyID", Value::from(company)),
            ],
        );
    }
}

pub fn column(models: &[Model], name: &str) -> Vec<Value> {
    models.iter().map(|model| model.get(name).clone()).collect()
}

pub fn forenames(models: &[Model]) -> Vec<Value> {
    column(models, "Forename")
}
