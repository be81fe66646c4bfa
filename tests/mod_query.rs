use bson::{Bson, doc};
use chrono::TimeZone;
use quarry::{Cond, Engine, EngineError, Order, Query, RecordView};

fn date(y: i32, m: u32, d: u32) -> bson::DateTime {
    bson::DateTime::from_chrono(chrono::Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap())
}

fn posts_engine() -> Engine {
    let engine = Engine::new();
    engine.define("posts", |c| {
        c.records([
            doc! {"id": 1, "title": "Post 1", "published_at": date(2024, 1, 1), "featured": true, "tags": ["ruby", "web"], "views": 100},
            doc! {"id": 2, "title": "Post 2", "published_at": date(2024, 2, 1), "featured": false, "tags": ["tools"], "views": 200},
            doc! {"id": 3, "title": "Post 3", "published_at": date(2023, 12, 1), "featured": true, "tags": ["ruby"], "views": 150},
            doc! {"id": 4, "title": Bson::Null, "published_at": Bson::Null, "featured": Bson::Null, "tags": [], "views": Bson::Null},
        ])
        .scope("featured", |q, _args| Ok(q.filter(Cond::new().eq("featured", true))))
        .scope("recent", |q, args| {
            let n = args.first().and_then(Bson::as_i64).unwrap_or(2);
            Ok(q.order("published_at", Order::Desc).limit(n as usize))
        })
        .scope("tagged", |q, args| {
            let tag = args.first().and_then(Bson::as_str).unwrap_or_default().to_string();
            Ok(q.filter(Cond::new().contains("tags", tag)))
        });
    });
    engine
}

fn ids(views: &[RecordView]) -> Vec<i32> {
    views.iter().map(|v| v.get("id").and_then(Bson::as_i32).unwrap()).collect()
}

fn sorted_ids(query: &Query) -> Vec<i32> {
    let mut out = ids(query.all());
    out.sort_unstable();
    out
}

#[test]
fn all_first_last_count() {
    let query = posts_engine().query("posts").unwrap();
    assert_eq!(query.all().len(), 4);
    assert_eq!(query.count(), 4);
    assert_eq!(query.first().unwrap().get("id"), Some(&Bson::Int32(1)));
    assert_eq!(query.last().unwrap().get("id"), Some(&Bson::Int32(4)));
}

#[test]
fn find_by_returns_first_match() {
    let query = posts_engine().query("posts").unwrap();
    let post = query.find_by(Cond::new().eq("id", 2)).unwrap();
    assert_eq!(post.get("title").and_then(Bson::as_str), Some("Post 2"));
    assert!(query.find_by(Cond::new().eq("id", 99)).is_none());
}

#[test]
fn filter_equality() {
    let query = posts_engine().query("posts").unwrap();
    assert_eq!(sorted_ids(&query.filter(Cond::new().eq("featured", true))), vec![1, 3]);
}

#[test]
fn filter_operators() {
    let query = posts_engine().query("posts").unwrap();

    assert_eq!(query.filter(Cond::new().contains("title", "Post")).count(), 3);
    assert_eq!(sorted_ids(&query.filter(Cond::new().gt("published_at", date(2024, 1, 1)))), vec![2]);
    assert_eq!(sorted_ids(&query.filter(Cond::new().lt("published_at", date(2024, 1, 1)))), vec![3]);
    assert_eq!(
        sorted_ids(&query.filter(Cond::new().gte("published_at", date(2024, 1, 1)))),
        vec![1, 2]
    );
    assert_eq!(
        sorted_ids(&query.filter(Cond::new().lte("published_at", date(2024, 1, 1)))),
        vec![1, 3]
    );
    assert_eq!(
        sorted_ids(&query.filter(Cond::new().between("published_at", date(2024, 1, 1), date(2024, 2, 1)))),
        vec![1, 2]
    );
    assert_eq!(sorted_ids(&query.filter(Cond::new().from("published_at", date(2024, 1, 1)))), vec![1, 2]);
    assert_eq!(sorted_ids(&query.filter(Cond::new().to("published_at", date(2024, 1, 1)))), vec![1, 3]);
    assert_eq!(sorted_ids(&query.filter(Cond::new().is_in("id", [1, 3]))), vec![1, 3]);
    assert_eq!(sorted_ids(&query.filter(Cond::new().not_in("id", [1, 3]))), vec![2, 4]);
    assert_eq!(sorted_ids(&query.filter(Cond::new().empty("tags", true))), vec![4]);
    assert_eq!(sorted_ids(&query.filter(Cond::new().empty("tags", false))), vec![1, 2, 3]);
    assert_eq!(query.filter(Cond::new().exists("title", true)).count(), 3);
    assert_eq!(sorted_ids(&query.filter(Cond::new().exists("title", false))), vec![4]);
    assert_eq!(query.filter(Cond::new().starts_with("title", "Post")).count(), 3);
    assert_eq!(sorted_ids(&query.filter(Cond::new().ends_with("title", "1"))), vec![1]);
}

#[test]
fn filter_array_spec() {
    let query = posts_engine().query("posts").unwrap();

    // Scalar field vs array spec: membership.
    assert_eq!(sorted_ids(&query.filter(Cond::new().eq("id", vec![Bson::Int32(1), Bson::Int32(3)]))), vec![1, 3]);
    // Array field vs array spec: exact equality.
    assert_eq!(
        sorted_ids(&query.filter(Cond::new().eq("tags", vec![Bson::from("ruby"), Bson::from("web")]))),
        vec![1]
    );
    assert_eq!(sorted_ids(&query.filter(Cond::new().eq("tags", vec![Bson::from("tools")]))), vec![2]);
}

#[test]
fn filter_null_and_negation() {
    let query = posts_engine().query("posts").unwrap();

    assert_eq!(sorted_ids(&query.filter(Cond::new().eq("featured", false))), vec![2]);
    assert_eq!(sorted_ids(&query.filter(Cond::new().eq("featured", Bson::Null))), vec![4]);
    // A null field satisfies an inequality.
    assert_eq!(sorted_ids(&query.filter(Cond::new().ne("featured", true))), vec![2, 4]);
}

#[test]
fn order_ascending_and_descending() {
    let query = posts_engine().query("posts").unwrap();

    // Nulls always sort last, in both directions.
    assert_eq!(ids(query.order("published_at", Order::Asc).all()), vec![3, 1, 2, 4]);
    assert_eq!(ids(query.order("published_at", Order::Desc).all()), vec![2, 1, 3, 4]);
}

#[test]
fn order_with_mixed_value_types() {
    let engine = Engine::new();
    engine.define("mixed", |c| {
        c.records([
            doc! {"id": 1, "value": "string"},
            doc! {"id": 2, "value": 42},
            doc! {"id": 3, "value": Bson::Null},
            doc! {"id": 4, "value": date(2024, 1, 1)},
        ]);
    });
    let query = engine.query("mixed").unwrap();

    // Numbers before strings before dates; null last either way.
    assert_eq!(ids(query.order("value", Order::Asc).all()), vec![2, 1, 4, 3]);
    assert_eq!(ids(query.order("value", Order::Desc).all()), vec![4, 1, 2, 3]);
}

#[test]
fn limit_and_offset() {
    let query = posts_engine().query("posts").unwrap();
    let by_id = query.order("id", Order::Asc);

    assert_eq!(ids(by_id.limit(2).all()), vec![1, 2]);
    assert_eq!(ids(by_id.offset(2).limit(1).all()), vec![3]);
    assert_eq!(ids(by_id.offset(1).limit(2).all()), vec![2, 3]);
    assert!(by_id.offset(10).all().is_empty());
    assert!(by_id.limit(0).all().is_empty());
    // Negative offset behaves as zero.
    assert_eq!(ids(by_id.offset(-5).limit(3).all()), vec![1, 2, 3]);
}

#[test]
fn chained_filters_narrow_conjunctively() {
    let query = posts_engine().query("posts").unwrap();

    let top = query
        .filter(Cond::new().eq("featured", true))
        .order("published_at", Order::Desc)
        .limit(1);
    assert_eq!(ids(top.all()), vec![1]);

    let narrowed = query.filter(Cond::new().gt("views", 120)).filter(Cond::new().eq("featured", true));
    assert_eq!(ids(narrowed.all()), vec![3]);
}

#[test]
fn builders_never_alter_the_receiver() {
    let query = posts_engine().query("posts").unwrap();
    let before = ids(query.all());

    let _narrowed = query.filter(Cond::new().eq("featured", true));
    let _limited = query.limit(1).offset(2).order("views", Order::Desc);

    assert_eq!(ids(query.all()), before);
    assert_eq!(query.count(), 4);
}

#[test]
fn or_filter_unions_with_the_and_chain() {
    let query = posts_engine().query("posts").unwrap();
    let results = query
        .filter(Cond::new().eq("featured", true))
        .or_filter(Cond::new().gt("views", 150));
    assert_eq!(sorted_ids(&results), vec![1, 2, 3]);
}

#[test]
fn or_filter_with_inequality() {
    let query = posts_engine().query("posts").unwrap();
    let results = query
        .filter(Cond::new().eq("featured", true))
        .or_filter(Cond::new().ne("title", "Post 2"));
    assert_eq!(sorted_ids(&results), vec![1, 3, 4]);
}

#[test]
fn filter_group_scopes_nested_or_to_the_group() {
    let query = posts_engine().query("posts").unwrap();
    let results = query.filter(Cond::new().eq("featured", true)).filter_group(|g| {
        g.filter(Cond::new().lt("views", 120)).or_filter(Cond::new().contains("tags", "ruby"))
    });
    assert_eq!(sorted_ids(&results), vec![1, 3]);
}

#[test]
fn or_filter_group_matches_against_the_full_dataset() {
    let query = posts_engine().query("posts").unwrap();
    let results = query
        .filter_group(|g| {
            g.filter(Cond::new().eq("id", 1)).filter(Cond::new().eq("featured", false))
        })
        .or_filter_group(|g| g.filter(Cond::new().gte("views", 200)));
    assert_eq!(sorted_ids(&results), vec![2]);
}

#[test]
fn nested_groups_compose() {
    let query = posts_engine().query("posts").unwrap();
    let results = query
        .filter_group(|g| {
            g.filter(Cond::new().eq("featured", true)).filter(Cond::new().lte("views", 150))
        })
        .or_filter_group(|g| {
            g.filter(Cond::new().contains("tags", "web")).filter(Cond::new().lt("views", 150))
        });
    assert_eq!(sorted_ids(&results), vec![1, 3]);
}

#[test]
fn scopes_run_and_chain() {
    let query = posts_engine().query("posts").unwrap();

    assert_eq!(sorted_ids(&query.scope("featured").unwrap()), vec![1, 3]);
    assert_eq!(ids(query.scope("recent").unwrap().all()), vec![2, 1]);
    assert_eq!(ids(query.scope_with("recent", &[Bson::Int64(3)]).unwrap().all()), vec![2, 1, 3]);
    assert_eq!(sorted_ids(&query.scope_with("tagged", &["ruby".into()]).unwrap()), vec![1, 3]);

    let chained = query
        .scope("featured")
        .unwrap()
        .scope_with("tagged", &["ruby".into()])
        .unwrap();
    assert_eq!(sorted_ids(&chained), vec![1, 3]);
}

#[test]
fn scope_failure_carries_scope_and_collection() {
    let engine = Engine::new();
    engine.define("error_model", |c| {
        c.records([]).scope("bad", |q, _args| q.scope("does_not_exist"));
    });
    let query = engine.query("error_model").unwrap();

    let err = query.scope("bad").unwrap_err();
    match err {
        EngineError::Scope { collection, scope, .. } => {
            assert_eq!(collection, "error_model");
            assert_eq!(scope, "bad");
        }
        other => panic!("expected scope error, got {other:?}"),
    }
    assert!(query.scope("missing").is_err());
}

#[test]
fn iteration_over_results() {
    let query = posts_engine().query("posts").unwrap();

    let titles: Vec<&str> = query
        .iter()
        .filter_map(|p| p.get("title").and_then(Bson::as_str))
        .collect();
    assert_eq!(titles, vec!["Post 1", "Post 2", "Post 3"]);

    assert!(query.iter().any(|p| p.get("featured") == Some(&Bson::Boolean(true))));
    assert_eq!((&query).into_iter().count(), 4);
}

#[test]
fn empty_collection_is_empty_everywhere() {
    let engine = Engine::new();
    engine.define("empty", |c| {
        c.records([]);
    });
    let query = engine.query("empty").unwrap();

    assert_eq!(query.count(), 0);
    assert!(query.is_empty());
    assert!(query.first().is_none());
    assert!(query.last().is_none());
    assert!(query.filter(Cond::new().eq("id", 1)).all().is_empty());
    assert!(query.order("id", Order::Asc).all().is_empty());
    assert!(query.limit(5).all().is_empty());
    assert!(query.offset(2).all().is_empty());
}

#[test]
fn duplicate_records_all_match() {
    let engine = Engine::new();
    engine.define("duplicates", |c| {
        c.records([
            doc! {"id": 1, "name": "John"},
            doc! {"id": 2, "name": "John"},
            doc! {"id": 3, "name": "John"},
        ]);
    });
    let query = engine.query("duplicates").unwrap();
    assert_eq!(sorted_ids(&query.filter(Cond::new().eq("name", "John"))), vec![1, 2, 3]);
}

#[test]
fn all_null_values_read_as_absent_and_empty() {
    let engine = Engine::new();
    engine.define("nils", |c| {
        c.records([
            doc! {"id": 1, "value": Bson::Null},
            doc! {"id": 2, "value": Bson::Null},
            doc! {"id": 3, "value": Bson::Null},
        ]);
    });
    let query = engine.query("nils").unwrap();
    assert_eq!(query.filter(Cond::new().exists("value", false)).count(), 3);
    assert_eq!(query.filter(Cond::new().empty("value", true)).count(), 3);
}

#[test]
fn parameterized_scope_edge_cases() {
    let engine = Engine::new();
    engine.define("scored", |c| {
        c.records([
            doc! {"id": 1, "score": 85},
            doc! {"id": 2, "score": 92},
            doc! {"id": 3, "score": 78},
            doc! {"id": 4, "score": 95},
        ])
        .scope("by_score", |q, args| {
            let min = args.first().cloned().unwrap_or(Bson::Int32(0));
            Ok(q.filter(Cond::new().gte("score", min)))
        })
        .scope("top_n", |q, args| {
            let n = args.first().and_then(Bson::as_i64).unwrap_or(1);
            Ok(q.order("score", Order::Desc).limit(n as usize))
        })
        .scope("score_range", |q, args| {
            let min = args.first().cloned().unwrap_or(Bson::Null);
            let max = args.get(1).cloned().unwrap_or(Bson::Null);
            Ok(q.filter(Cond::new().between("score", min, max)))
        });
    });
    let query = engine.query("scored").unwrap();

    assert!(query.scope_with("by_score", &[Bson::Int32(100)]).unwrap().is_empty());
    assert_eq!(query.scope_with("by_score", &[Bson::Int32(0)]).unwrap().count(), 4);
    assert!(query.scope_with("top_n", &[Bson::Int64(0)]).unwrap().is_empty());
    assert_eq!(
        sorted_ids(&query.scope_with("score_range", &[Bson::Int32(90), Bson::Int32(100)]).unwrap()),
        vec![2, 4]
    );
}

#[test]
fn large_offsets_and_limits() {
    let engine = Engine::new();
    engine.define("numbers", |c| {
        c.records((1..=100).map(|n| doc! {"id": n, "value": n * 2}));
    });
    let query = engine.query("numbers").unwrap();

    assert!(query.offset(200).all().is_empty());
    assert_eq!(query.offset(95).limit(10).count(), 5);
    assert!(query.limit(0).all().is_empty());
    assert_eq!(query.offset(-5).limit(3).count(), 3);
}

#[test]
fn mixed_width_numbers_match_in_conditions() {
    let engine = Engine::new();
    engine.define("widths", |c| {
        c.records([
            doc! {"id": 1, "value": Bson::Int64(10)},
            doc! {"id": 2, "value": 10.0},
            doc! {"id": 3, "value": 11},
        ]);
    });
    let query = engine.query("widths").unwrap();

    assert_eq!(sorted_ids(&query.filter(Cond::new().eq("value", 10))), vec![1, 2]);
    assert_eq!(sorted_ids(&query.filter(Cond::new().gt("value", 10.5))), vec![3]);
}
