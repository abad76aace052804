mod support;

use pretty_assertions::assert_eq;
use stem::{Filter, Model, Repository, Value};
use support::{both, column, forenames, insert, offline, seed_contacts, seed_wages, sqlite};

#[test]
fn filter_by_forename() {
    for db in both() {
        seed_contacts(&db);

        let mut contacts = db.collection("Contact").unwrap();
        contacts.filter(Filter::equals("Forename", "John"));

        assert_eq!(contacts.count().unwrap(), 2);
        assert_eq!(contacts.len().unwrap(), 2);
        assert_eq!(
            contacts.unique_identifiers().unwrap(),
            vec![Value::I64(1), Value::I64(4)]
        );
    }
}

#[test]
fn intersect_with_companies() {
    for db in both() {
        seed_contacts(&db);

        let mut companies = db.collection("Company").unwrap();
        companies.filter(Filter::equals("CompanyID", 2));

        let mut contacts = db.collection("Contact").unwrap();
        contacts.intersect_with(companies, "CompanyID", "CompanyID");

        let models = contacts.models().unwrap();
        assert_eq!(forenames(&models), vec![Value::from("Mary")]);
    }
}

#[test]
fn intersection_compiles_into_one_statement() {
    let db = sqlite();
    seed_contacts(&db);

    let mut companies = db.collection("Company").unwrap();
    companies.filter(Filter::equals("CompanyName", "C1"));

    let mut contacts = db.collection("Contact").unwrap();
    contacts.intersect_with_pulling(companies, "CompanyID", "CompanyID", ["CompanyName"]);

    let models = contacts.models().unwrap();
    assert_eq!(
        forenames(&models),
        vec![Value::from("John"), Value::from("John")]
    );
    assert_eq!(models[0].get("CompanyName"), &Value::from("C1"));

    let sql = db
        .repository("Contact")
        .unwrap()
        .previous_statement()
        .unwrap();
    assert!(sql.contains("INNER JOIN (SELECT"), "{sql}");
}

#[test]
fn pulled_up_columns_leave_own_columns_alone() {
    for db in both() {
        seed_contacts(&db);

        let mut smiths = db.collection("Contact").unwrap();
        smiths.filter(Filter::equals("Surname", "Smith"));

        let mut contacts = db.collection("Contact").unwrap();
        contacts.intersect_with_pulling(smiths, "CompanyID", "CompanyID", ["Surname"]);

        let models = contacts.models().unwrap();
        assert_eq!(
            column(&models, "ContactID"),
            vec![Value::I64(1), Value::I64(2), Value::I64(4)]
        );
        assert_eq!(models[0].get("Surname"), &Value::from("Doe"));
        assert_eq!(models[0].extras().get("Surname"), Some(&Value::from("Smith")));

        let doe = db.find("Contact", 1).unwrap();
        assert_eq!(doe.get("Surname"), &Value::from("Doe"));
    }
}

#[test]
fn pulled_up_columns_in_memory() {
    let db = offline();
    seed_contacts(&db);

    let mut companies = db.collection("Company").unwrap();
    companies.filter(Filter::one_of("CompanyID", [2, 3]));

    let mut contacts = db.collection("Contact").unwrap();
    contacts.intersect_with_pulling(companies, "CompanyID", "CompanyID", ["CompanyName"]);
    contacts.replace_sort("CompanyName", false);

    let models = contacts.models().unwrap();
    assert_eq!(
        forenames(&models),
        vec![Value::from("Jule"), Value::from("Mary")]
    );
    assert_eq!(models[1].get("CompanyName"), &Value::from("C2"));
}

#[test]
fn partial_translation_is_completed_in_memory() {
    let db = sqlite();
    seed_contacts(&db);

    let mut contacts = db.collection("Contact").unwrap();
    contacts.filter(Filter::and([
        Filter::equals("Forename", "John"),
        Filter::contains_case_sensitive("Surname", "Do"),
    ]));

    let models = contacts.models().unwrap();
    assert_eq!(column(&models, "Surname"), vec![Value::from("Doe")]);

    let Some(Filter::And(group)) = contacts.root_filter() else {
        panic!("expected an And filter");
    };
    assert!(group.filters[0].was_filtered_by_repository());
    assert!(!group.filters[1].was_filtered_by_repository());
    assert!(!contacts.root_filter().unwrap().was_filtered_by_repository());
}

#[test]
fn failed_or_resets_every_leaf() {
    let db = sqlite();
    seed_contacts(&db);

    let mut contacts = db.collection("Contact").unwrap();
    contacts.filter(Filter::or([
        Filter::equals("Forename", "Mary"),
        Filter::predicate(|model| model.get("Surname") == &Value::from("Jones")),
    ]));

    let models = contacts.models().unwrap();
    assert_eq!(
        forenames(&models),
        vec![Value::from("Mary"), Value::from("Jule")]
    );

    let Some(Filter::Or(group)) = contacts.root_filter() else {
        panic!("expected an Or filter");
    };
    assert!(!group.filters[0].was_filtered_by_repository());
    assert!(!group.filters[1].was_filtered_by_repository());
}

#[test]
fn negation_matches_missing_values() {
    for db in both() {
        seed_contacts(&db);
        insert(&db, "Contact", [("Forename", "Anon")]);

        let mut contacts = db.collection("Contact").unwrap();
        contacts.filter(Filter::not(Filter::contains("Surname", "smith")));

        let models = contacts.models().unwrap();
        assert_eq!(
            forenames(&models),
            vec![Value::from("John"), Value::from("Jule"), Value::from("Anon")]
        );
    }
}

#[test]
fn filter_through_one_to_one_relationship() {
    for db in both() {
        seed_contacts(&db);

        let mut contacts = db.collection("Contact").unwrap();
        contacts.filter(Filter::equals("Company.CompanyName", "C2"));

        assert_eq!(forenames(&contacts.models().unwrap()), vec![Value::from("Mary")]);
    }
}

#[test]
fn filter_through_one_to_many_relationship() {
    for db in both() {
        seed_contacts(&db);

        let mut companies = db.collection("Company").unwrap();
        companies.filter(Filter::starts_with("Contacts.Forename", "jo"));

        let names = column(&companies.models().unwrap(), "CompanyName");
        assert_eq!(names, vec![Value::from("C1")]);
    }
}

#[test]
fn to_many_leaves_match_related_models_independently() {
    for db in both() {
        seed_wages(&db);

        let mut companies = db.collection("Company").unwrap();
        companies.filter(Filter::and([
            Filter::greater_than("Users.Wage", 150),
            Filter::less_than("Users.Wage", 150),
        ]));

        assert_eq!(companies.unique_identifiers().unwrap(), vec![Value::I64(1)]);
    }
}

#[test]
fn non_ascii_needles_fold_case() {
    for db in both() {
        seed_contacts(&db);
        insert(&db, "Contact", [("Forename", "j\u{f6}rg")]);

        let mut contacts = db.collection("Contact").unwrap();
        contacts.filter(Filter::contains("Forename", "J\u{d6}"));

        assert_eq!(contacts.count().unwrap(), 1);
        assert_eq!(contacts.unique_identifiers().unwrap(), vec![Value::I64(5)]);
    }
}

#[test]
fn composite_filters_agree_across_backends() {
    let cases = [
        (
            "Company",
            Filter::and([
                Filter::equals("Contacts.Surname", "Doe"),
                Filter::equals("Contacts.Surname", "Smith"),
            ]),
            vec![1],
        ),
        (
            "Company",
            Filter::and([
                Filter::greater_than("Users.Wage", 150),
                Filter::equals("Contacts.Forename", "Mary"),
            ]),
            vec![2],
        ),
        (
            "Company",
            Filter::and([
                Filter::or([
                    Filter::equals("Contacts.Forename", "Jule"),
                    Filter::equals("Contacts.Forename", "Mary"),
                ]),
                Filter::equals("Contacts.Surname", "Smith"),
            ]),
            vec![2],
        ),
        (
            "Company",
            Filter::or([
                Filter::greater_than("Users.Wage", 250),
                Filter::starts_with("Contacts.Forename", "ju"),
            ]),
            vec![2, 3],
        ),
        (
            "Company",
            Filter::not(Filter::equals("Users.Wage", 100)),
            vec![2, 3],
        ),
        (
            "Contact",
            Filter::not(Filter::equals("Company.CompanyName", "C1")),
            vec![2, 3, 5, 6],
        ),
        (
            "Contact",
            Filter::not(Filter::contains("Company.CompanyName", "2")),
            vec![1, 3, 4, 5, 6],
        ),
        (
            "Contact",
            Filter::or([
                Filter::equals("Company.CompanyName", "C3"),
                Filter::equals("Surname", "Smith"),
            ]),
            vec![2, 3, 4, 5],
        ),
        ("Contact", Filter::contains("Forename", "J\u{d6}"), vec![5]),
        ("Contact", Filter::ends_with("Surname", "\u{dc}LLER"), vec![5]),
        ("Contact", Filter::starts_with("Forename", "j"), vec![1, 3, 4, 5]),
        ("Contact", Filter::ends_with("Surname", "LLER"), vec![5]),
    ];

    for (model, filter, expected) in cases {
        let mut results = vec![];

        for db in both() {
            seed_contacts(&db);
            insert(
                &db,
                "Contact",
                [
                    ("Forename", Value::from("J\u{f6}rg")),
                    ("Surname", Value::from("M\u{fc}ller")),
                    ("CompanyID", Value::from(3)),
                ],
            );
            insert(&db, "Contact", [("Forename", "Anon")]);

            for (username, wage, company) in [("ann", 100, 1), ("bob", 200, 1), ("cat", 300, 2)] {
                insert(
                    &db,
                    "User",
                    [
                        ("Username", Value::from(username)),
                        ("Wage", Value::from(wage)),
                        ("CompanyID", Value::from(company)),
                    ],
                );
            }

            let mut collection = db.collection(model).unwrap();
            collection.filter(filter.clone());
            results.push(collection.unique_identifiers().unwrap());
        }

        let expected: Vec<Value> = expected.into_iter().map(Value::I64).collect();
        assert_eq!(results[0], expected, "{model}: {filter:?}");
        assert_eq!(results[1], expected, "{model}: {filter:?}");
    }
}

#[test]
fn range_with_count() {
    for db in both() {
        seed_contacts(&db);

        let mut contacts = db.collection("Contact").unwrap();
        contacts.replace_sort("Forename", true).set_range(1, 2);

        let models = contacts.models().unwrap();
        assert_eq!(
            forenames(&models),
            vec![Value::from("John"), Value::from("Jule")]
        );
        assert_eq!(contacts.len().unwrap(), 2);
        assert_eq!(contacts.count().unwrap(), 4);
    }
}

#[test]
fn range_uses_limit() {
    let db = sqlite();
    seed_contacts(&db);

    let mut contacts = db.collection("Contact").unwrap();
    contacts.set_range(0, 3);

    assert_eq!(contacts.len().unwrap(), 3);
    assert_eq!(contacts.count().unwrap(), 4);

    let sql = db
        .repository("Contact")
        .unwrap()
        .previous_statement()
        .unwrap();
    assert!(sql.contains("LIMIT"), "{sql}");
}

#[test]
fn sort_by_related_column() {
    for db in both() {
        seed_contacts(&db);

        let mut contacts = db.collection("Contact").unwrap();
        contacts.replace_sort("Company.CompanyName", false);

        assert_eq!(
            forenames(&contacts.models().unwrap()),
            vec![
                Value::from("Jule"),
                Value::from("Mary"),
                Value::from("John"),
                Value::from("John"),
            ]
        );
    }
}

#[test]
fn sort_not_valid() {
    for db in both() {
        seed_contacts(&db);

        let mut contacts = db.collection("Contact").unwrap();
        contacts.replace_sort("Nickname", true);

        let err = contacts.models().unwrap_err();
        assert!(err.is_sort_not_valid(), "{err}");
    }
}

#[test]
fn count_rejects_invalid_sorts() {
    for db in both() {
        seed_contacts(&db);

        let mut contacts = db.collection("Contact").unwrap();
        contacts.replace_sort("Nope", true);

        let err = contacts.count().unwrap_err();
        assert!(err.is_sort_not_valid(), "{err}");
    }
}

#[test]
fn reconfiguring_discards_materialized_ids() {
    for db in both() {
        seed_contacts(&db);

        let mut contacts = db.collection("Contact").unwrap();
        assert_eq!(contacts.len().unwrap(), 4);
        assert!(contacts.is_materialized());

        contacts.filter(Filter::equals("Forename", "Mary"));
        assert!(!contacts.is_materialized());
        assert_eq!(contacts.len().unwrap(), 1);
    }
}

#[test]
fn cursor() {
    for db in both() {
        seed_contacts(&db);

        let mut contacts = db.collection("Contact").unwrap();
        contacts
            .filter(Filter::equals("Surname", "Smith"))
            .replace_sort("Forename", true);

        let mut cursor = contacts.cursor().unwrap();
        let first = cursor.next().unwrap().unwrap();
        assert_eq!(first.get("Forename"), &Value::from("John"));

        let rest: Vec<Model> = cursor.collect().unwrap();
        assert_eq!(forenames(&rest), vec![Value::from("Mary")]);
    }
}

#[test]
fn cursor_applies_untranslated_filters() {
    let db = sqlite();
    seed_contacts(&db);

    let mut contacts = db.collection("Contact").unwrap();
    contacts.filter(Filter::contains_case_sensitive("Surname", "S"));

    let models: Vec<Model> = contacts.cursor().unwrap().collect().unwrap();
    assert_eq!(
        forenames(&models),
        vec![Value::from("Mary"), Value::from("John")]
    );
}

#[test]
fn many_to_many_navigation() {
    for db in both() {
        seed_contacts(&db);
        for name in ["vip", "lead"] {
            insert(&db, "Tag", [("TagName", name)]);
        }
        for (contact, tag) in [(1, 1), (2, 2), (4, 1)] {
            insert(&db, "ContactTag", [("ContactID", contact), ("TagID", tag)]);
        }

        let vip = db.find("Tag", 1).unwrap();
        let contacts = db.related(&vip, "Contacts").unwrap().models().unwrap();
        assert_eq!(
            column(&contacts, "ContactID"),
            vec![Value::I64(1), Value::I64(4)]
        );

        let mary = db.find("Contact", 2).unwrap();
        let tags = db.related(&mary, "Tags").unwrap().models().unwrap();
        assert_eq!(column(&tags, "TagName"), vec![Value::from("lead")]);
    }
}

#[test]
fn auto_hydration_fills_the_related_cache() {
    let db = sqlite();
    seed_contacts(&db);
    db.clear_caches();

    let mut contacts = db.collection("Contact").unwrap();
    contacts.auto_hydrate("Company");
    assert_eq!(contacts.len().unwrap(), 4);

    let companies = db.repository("Company").unwrap();
    assert_eq!(companies.cache().len(), 3);
}
