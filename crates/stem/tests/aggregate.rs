mod support;

use pretty_assertions::assert_eq;
use stem::{Aggregate, Filter, Repository, Value};
use support::{both, column, offline, seed_contacts, seed_wages, sqlite};

#[test]
fn sum_over_relationship_is_pushed_down() {
    let db = sqlite();
    seed_wages(&db);

    let mut companies = db.collection("Company").unwrap();
    companies.add_aggregate_column(Aggregate::sum("Users.Wage"));

    let models = companies.models().unwrap();
    assert_eq!(
        column(&models, "SumOfUsersWage"),
        vec![Value::I64(300), Value::I64(700)]
    );

    let sql = db
        .repository("Company")
        .unwrap()
        .previous_statement()
        .unwrap();
    assert!(sql.contains("SUM(`Users`.`Wage`) AS `SumOfUsersWage`"), "{sql}");
}

#[test]
fn sum_over_relationship_by_iteration() {
    let db = offline();
    seed_wages(&db);

    let mut companies = db.collection("Company").unwrap();
    companies.add_aggregate_column(Aggregate::sum("Users.Wage"));

    let models = companies.models().unwrap();
    assert_eq!(
        column(&models, "SumOfUsersWage"),
        vec![Value::I64(300), Value::I64(700)]
    );
}

#[test]
fn push_down_and_iteration_agree() {
    let [sqlite, offline] = both();
    let mut results = vec![];

    for db in [sqlite, offline] {
        seed_wages(&db);

        let mut companies = db.collection("Company").unwrap();
        companies
            .add_aggregate_column(Aggregate::average("Users.Wage"))
            .add_aggregate_column(Aggregate::count("Users.Wage"))
            .add_aggregate_column(Aggregate::max("Users.Wage"))
            .replace_sort("AverageOfUsersWage", false);

        let models = companies.models().unwrap();
        results.push((
            column(&models, "CompanyName"),
            column(&models, "AverageOfUsersWage"),
            column(&models, "CountOfUsersWage"),
            column(&models, "MaxOfUsersWage"),
        ));
    }

    assert_eq!(results[0], results[1]);
    assert_eq!(
        results[0],
        (
            vec![Value::from("C2"), Value::from("C1")],
            vec![Value::F64(350.0), Value::F64(150.0)],
            vec![Value::I64(2), Value::I64(2)],
            vec![Value::I64(400), Value::I64(200)],
        )
    );
}

#[test]
fn collection_aggregates() {
    for db in both() {
        seed_wages(&db);

        let mut users = db.collection("User").unwrap();
        users.filter(Filter::greater_than("Wage", 100));

        let values = users
            .calculate_aggregates(&[
                Aggregate::sum("Wage"),
                Aggregate::min("Wage"),
                Aggregate::count("UserID"),
            ])
            .unwrap();

        assert_eq!(values, vec![Value::I64(900), Value::I64(200), Value::I64(3)]);
    }
}

#[test]
fn aggregates_over_untranslated_filters_iterate() {
    let db = sqlite();
    seed_wages(&db);

    let mut users = db.collection("User").unwrap();
    users.filter(Filter::predicate(|user| user.get("Username") != &Value::from("dan")));

    let values = users.calculate_aggregates(&[Aggregate::sum("Wage")]).unwrap();
    assert_eq!(values, vec![Value::I64(600)]);
}

#[test]
fn aggregates_of_an_empty_collection() {
    for db in both() {
        seed_contacts(&db);

        let mut contacts = db.collection("Contact").unwrap();
        contacts.filter(Filter::equals("Forename", "Nobody"));

        let values = contacts
            .calculate_aggregates(&[Aggregate::sum("CompanyID"), Aggregate::count("ContactID")])
            .unwrap();
        assert_eq!(values, vec![Value::Null, Value::I64(0)]);
    }
}
