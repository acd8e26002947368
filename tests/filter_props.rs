use std::collections::BTreeSet;

use proptest::prelude::*;

use salary_panda::data::filter::{apply, Predicate};
use salary_panda::data::loader::parse_csv;
use salary_panda::data::model::Value;

const LEVELS: [&str; 3] = ["EN", "MI", "SE"];
const TITLES: [&str; 3] = ["Data Scientist", "Data Engineer", "Data Analyst"];

fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

fn csv_for(rows: &[(usize, usize, u32)]) -> String {
    let mut csv = String::from("experience_level,job_title,salary_in_usd\n");
    for &(level, title, salary) in rows {
        csv.push_str(&format!("{},{},{}\n", LEVELS[level], TITLES[title], salary));
    }
    csv
}

proptest! {
    #[test]
    fn view_is_rows_satisfying_every_applicable_predicate(
        rows in prop::collection::vec((0..3usize, 0..3usize, 1000..200_000u32), 1..40),
        levels in prop::option::of(prop::collection::btree_set(0..3usize, 0..=3)),
        title in prop::option::of(0..3usize),
        absent in any::<bool>(),
    ) {
        let ds = parse_csv(csv_for(&rows).as_bytes()).unwrap();

        let mut predicates = Vec::new();
        if let Some(levels) = &levels {
            predicates.push(Predicate::In {
                column: "experience_level".into(),
                values: levels.iter().map(|&i| text(LEVELS[i])).collect::<BTreeSet<_>>(),
            });
        }
        if let Some(t) = title {
            predicates.push(Predicate::Equals {
                column: "job_title".into(),
                value: text(TITLES[t]),
            });
        }
        if absent {
            predicates.push(Predicate::Equals {
                column: "company_size".into(),
                value: text("L"),
            });
        }

        let expected: Vec<usize> = rows
            .iter()
            .enumerate()
            .filter(|(_, (level, t, _))| {
                levels.as_ref().map_or(true, |set| set.contains(level))
                    && title.map_or(true, |want| want == *t)
            })
            .map(|(i, _)| i)
            .collect();

        let view = apply(&ds, &predicates);
        prop_assert_eq!(view.rows(), expected.as_slice());
    }

    #[test]
    fn no_predicates_keep_every_row(
        rows in prop::collection::vec((0..3usize, 0..3usize, 1000..200_000u32), 0..40),
    ) {
        let ds = parse_csv(csv_for(&rows).as_bytes()).unwrap();
        let view = apply(&ds, &[]);
        prop_assert_eq!(view.len(), rows.len());
    }
}
