use std::sync::Arc;

use serde_json::json;

use crate::{
    config::Config,
    error::QueryError,
    executor::{Row, Statement, StatementExecutor},
    expr::{Expr, Value},
    fixtures::{catalog, member, seeded_store, session, team},
    mapper::{field, Constructor, EntityRecord, Field, FieldOrder, NamedFields, Tuple},
    predicate::BooleanBuilder,
    query::{DeleteBuilder, InsertBuilder, QueryBuilder, QueryPlan, SelectItem, UpdateBuilder},
    session::Session,
    store::MemoryStore,
};

fn usernames(records: &[EntityRecord]) -> Vec<Option<String>> {
    records.iter().map(|r| r.get_as::<Option<String>>("username").unwrap()).collect()
}

fn names(list: &[&str]) -> Vec<Option<String>> {
    list.iter().map(|s| Some(s.to_string())).collect()
}

fn all_members_by_id() -> QueryPlan {
    let m = member("m");
    QueryBuilder::new().select_from(&m.path).order_by([m.id.asc()]).build().unwrap()
}

fn ages(session: &Session) -> Vec<i64> {
    let m = member("m");
    let plan = QueryBuilder::new().select([&m.age]).from(&m.path).order_by([m.age.asc()]).build().unwrap();
    session.fetch(&plan).unwrap()
}

#[test]
fn find_member_by_username() {
    let s = session(&seeded_store());
    let m = member("m");
    let plan = QueryBuilder::new()
        .select_from(&m.path)
        .filter(m.username.eq("member1").unwrap())
        .build()
        .unwrap();
    let found: EntityRecord = s.fetch_one(&plan).unwrap().unwrap();
    assert_eq!(found.get("username"), Some(&Value::from("member1")));
    assert_eq!(found.get_as::<i64>("age").unwrap(), 10);
}

#[test]
fn search_with_chained_and_comma_separated_conditions() {
    let s = session(&seeded_store());
    let m = member("m");
    let chained = QueryBuilder::new()
        .select_from(&m.path)
        .filter(m.username.ends_with("1").unwrap().and(m.age.eq(10).unwrap()))
        .build()
        .unwrap();
    let comma = QueryBuilder::new()
        .select_from(&m.path)
        .filter_all([Some(m.username.ends_with("1").unwrap()), None, Some(m.age.eq(10).unwrap())])
        .build()
        .unwrap();
    let a: Vec<EntityRecord> = s.fetch(&chained).unwrap();
    let b: Vec<EntityRecord> = s.fetch(&comma).unwrap();
    assert_eq!(usernames(&a), names(&["member1"]));
    assert_eq!(a, b);
    assert_eq!(s.statement(&chained).unwrap().bound.sql, s.statement(&comma).unwrap().bound.sql);
}

#[test]
fn fetch_variants() {
    let s = session(&seeded_store());
    let plan = all_members_by_id();

    let all: Vec<EntityRecord> = s.fetch(&plan).unwrap();
    assert_eq!(all.len(), 4);

    assert_eq!(
        s.fetch_one::<EntityRecord>(&plan).unwrap_err(),
        QueryError::NonUniqueResult { count: 2 }
    );

    let first: EntityRecord = s.fetch_first(&plan).unwrap().unwrap();
    assert_eq!(first.id(), &Value::Int(1));

    let m = member("m");
    let none = QueryBuilder::new().select_from(&m.path).filter(m.age.gt(100).unwrap()).build().unwrap();
    assert_eq!(s.fetch_one::<EntityRecord>(&none).unwrap(), None);
    assert_eq!(s.fetch_first::<EntityRecord>(&none).unwrap(), None);

    assert_eq!(s.fetch_count(&plan).unwrap(), 4);
    assert_eq!(s.fetch_count(&none).unwrap(), 0);
}

#[test]
fn sort_with_nulls_last() {
    let store = seeded_store();
    for username in [None, Some("member5"), None, Some("member6"), None] {
        store.insert_json("member", json!({ "username": username, "age": 100 })).unwrap();
    }
    let s = session(&store);
    let m = member("m");
    let plan = QueryBuilder::new()
        .select_from(&m.path)
        .filter(m.age.eq(100).unwrap())
        .order_by([m.age.desc(), m.username.asc().nulls_last()])
        .build()
        .unwrap();
    let result: Vec<EntityRecord> = s.fetch(&plan).unwrap();
    assert_eq!(
        usernames(&result),
        vec![Some("member5".into()), Some("member6".into()), None, None, None]
    );

    let first = QueryBuilder::new()
        .select_from(&m.path)
        .filter(m.age.eq(100).unwrap())
        .order_by([m.username.desc().nulls_first()])
        .build()
        .unwrap();
    let result: Vec<EntityRecord> = s.fetch(&first).unwrap();
    assert_eq!(
        usernames(&result),
        vec![None, None, None, Some("member6".into()), Some("member5".into())]
    );
}

#[test]
fn explicit_null_ordering_is_emulated_on_mysql() {
    let store = seeded_store();
    for username in [None, Some("member5"), None] {
        store.insert_json("member", json!({ "username": username, "age": 100 })).unwrap();
    }
    let s = Session::new(store, &Config::mysql());
    let m = member("m");
    let plan = QueryBuilder::new()
        .select([&m.username])
        .from(&m.path)
        .filter(m.age.eq(100).unwrap())
        .order_by([m.username.asc().nulls_last()])
        .build()
        .unwrap();
    assert_eq!(
        s.statement(&plan).unwrap().bound.sql,
        "SELECT m.username FROM member m WHERE m.age = ? ORDER BY m.username IS NULL ASC, m.username ASC"
    );
    assert_eq!(s.fetch::<Option<String>>(&plan).unwrap(), vec![Some("member5".into()), None, None]);
}

#[test]
fn paging_reports_the_unpaged_total() {
    let s = session(&seeded_store());
    let m = member("m");
    let plan = QueryBuilder::new()
        .select_from(&m.path)
        .order_by([m.username.desc()])
        .offset(1)
        .limit(2)
        .build()
        .unwrap();
    let page = s.fetch_paged::<EntityRecord>(&plan).unwrap();
    assert_eq!(page.total, 4);
    assert_eq!(page.offset, 1);
    assert_eq!(page.limit, Some(2));
    assert_eq!(usernames(&page.results), names(&["member3", "member2"]));

    let empty = QueryBuilder::new()
        .select_from(&m.path)
        .filter(m.username.eq("nobody").unwrap())
        .build()
        .unwrap();
    let page = s.fetch_paged::<EntityRecord>(&empty).unwrap();
    assert_eq!(page.total, 0);
    assert!(page.is_empty());
}

#[test]
fn paging_a_distinct_entity_query() {
    let s = session(&seeded_store());
    let (m, t) = (member("m"), team("t"));
    // every member appears once per team in the cross product
    let plan = QueryBuilder::new()
        .select_distinct([&m.path])
        .from(&m.path)
        .from(&t.path)
        .order_by([m.id.asc()])
        .limit(3)
        .build()
        .unwrap();
    assert_eq!(s.fetch_count(&plan).unwrap(), 4);
    let page = s.fetch_paged::<EntityRecord>(&plan).unwrap();
    assert_eq!(page.total, 4);
    assert_eq!(usernames(&page.results), names(&["member1", "member2", "member3"]));
}

#[test]
fn paging_a_distinct_nullable_column_counts_the_null_row() {
    let store = seeded_store();
    store.insert_json("member", json!({ "username": "a", "age": 1 })).unwrap();
    store.insert_json("member", json!({ "username": "b", "age": 2 })).unwrap();
    let s = session(&store);
    let m = member("m");
    let plan = QueryBuilder::new()
        .select_distinct([&m.team_id])
        .from(&m.path)
        .order_by([m.team_id.asc().nulls_last()])
        .build()
        .unwrap();
    let all: Vec<Option<i64>> = s.fetch(&plan).unwrap();
    let page = s.fetch_paged::<Option<i64>>(&plan).unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.results, all);
    assert_eq!(page.results, vec![Some(1), Some(2), None]);

    let only_nulls = QueryBuilder::new()
        .select_distinct([&m.team_id])
        .from(&m.path)
        .filter(m.team_id.is_null())
        .build()
        .unwrap();
    let page = s.fetch_paged::<Option<i64>>(&only_nulls).unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.results, vec![None]);
}

#[test]
fn counting_a_grouped_query_is_unsupported() {
    let s = session(&seeded_store());
    let m = member("m");
    let grouped = QueryBuilder::new()
        .select([SelectItem::from(&m.team_id), m.age.avg().unwrap().into()])
        .from(&m.path)
        .group_by([&m.team_id])
        .build()
        .unwrap();
    assert_eq!(s.fetch::<(Option<i64>, f64)>(&grouped).unwrap().len(), 2);
    assert!(matches!(s.fetch_count(&grouped), Err(QueryError::UnsupportedConstruct(_))));
    assert!(matches!(
        s.fetch_paged::<(Option<i64>, f64)>(&grouped),
        Err(QueryError::UnsupportedConstruct(_))
    ));
}

#[test]
fn aggregation() {
    let s = session(&seeded_store());
    let m = member("m");
    let (sum, avg, max, min) = (m.age.sum().unwrap(), m.age.avg().unwrap(), m.age.max().unwrap(), m.age.min().unwrap());
    let plan = QueryBuilder::new()
        .select([Expr::count_all(), sum.clone(), avg.clone(), max.clone(), min.clone()])
        .from(&m.path)
        .build()
        .unwrap();
    let result: Vec<Tuple> = s.fetch(&plan).unwrap();
    let tuple = &result[0];
    assert_eq!(tuple.value(0), Some(&Value::Int(4)));
    assert_eq!(tuple.by_expr(&sum), Some(&Value::Int(100)));
    assert_eq!(tuple.by_expr(&avg), Some(&Value::float(25.0)));
    assert_eq!(tuple.by_expr(&max), Some(&Value::Int(40)));
    assert_eq!(tuple.by_expr(&min), Some(&Value::Int(10)));
}

#[test]
fn group_by_team_name_with_average_age() {
    let s = session(&seeded_store());
    let (m, t) = (member("m"), team("t"));
    let plan = QueryBuilder::new()
        .select([SelectItem::from(&t.name), m.age.avg().unwrap().into()])
        .from(&m.path)
        .join(&m.team, &t.path)
        .group_by([&t.name])
        .build()
        .unwrap();
    let result: Vec<(String, f64)> = s.fetch(&plan).unwrap();
    assert_eq!(result, vec![("teamA".to_string(), 15.0), ("teamB".to_string(), 35.0)]);
}

#[test]
fn join_over_a_relation() {
    let s = session(&seeded_store());
    let (m, t) = (member("m"), team("t"));
    let plan = QueryBuilder::new()
        .select_from(&m.path)
        .join(&m.team, &t.path)
        .filter(t.name.eq("teamA").unwrap())
        .order_by([m.id.asc()])
        .build()
        .unwrap();
    let result: Vec<EntityRecord> = s.fetch(&plan).unwrap();
    assert_eq!(usernames(&result), names(&["member1", "member2"]));
}

#[test]
fn theta_join() {
    let store = seeded_store();
    for name in ["teamA", "teamB", "teamC"] {
        store.insert_json("member", json!({ "username": name, "age": 0 })).unwrap();
    }
    let s = session(&store);
    let (m, t) = (member("m"), team("t"));
    let plan = QueryBuilder::new()
        .select_from(&m.path)
        .from(&t.path)
        .filter(m.username.eq(&t.name).unwrap())
        .build()
        .unwrap();
    let result: Vec<EntityRecord> = s.fetch(&plan).unwrap();
    assert_eq!(usernames(&result), names(&["teamA", "teamB"]));
}

#[test]
fn join_on_filters_the_joined_side() {
    let s = session(&seeded_store());
    let (m, t) = (member("m"), team("t"));
    let plan = QueryBuilder::new()
        .select([&m.path, &t.path])
        .from(&m.path)
        .left_join(&m.team, &t.path)
        .on(t.name.eq("teamA").unwrap())
        .order_by([m.id.asc()])
        .build()
        .unwrap();
    let result: Vec<(EntityRecord, Option<EntityRecord>)> = s.fetch(&plan).unwrap();
    assert_eq!(result.len(), 4);
    let teams: Vec<Option<Value>> = result
        .iter()
        .map(|(_, t)| t.as_ref().and_then(|t| t.get("name").cloned()))
        .collect();
    assert_eq!(teams, vec![Some("teamA".into()), Some("teamA".into()), None, None]);
}

#[test]
fn left_join_without_relation_keeps_unmatched_rows() {
    let store = MemoryStore::new(catalog()).into_shared();
    store.load_from_json("member", json!([
        { "username": "x", "age": 1 },
        { "username": "y", "age": 2 }
    ])).unwrap();
    store.load_from_json("team", json!([{ "name": "x" }])).unwrap();
    let s = session(&store);
    let (m, t) = (member("m"), team("t"));
    let plan = QueryBuilder::new()
        .select([&m.path, &t.path])
        .from(&m.path)
        .left_join_entity(&t.path)
        .on(m.username.eq(&t.name).unwrap())
        .order_by([m.username.asc()])
        .build()
        .unwrap();
    let result: Vec<(EntityRecord, Option<EntityRecord>)> = s.fetch(&plan).unwrap();
    assert_eq!(result.len(), 2);
    assert_eq!(result[0].1.as_ref().and_then(|t| t.get("name")), Some(&Value::from("x")));
    assert_eq!(result[1].0.get("username"), Some(&Value::from("y")));
    assert!(result[1].1.is_none());
}

#[test]
fn fetch_join_loads_the_association() {
    let store = seeded_store();
    let (m, t) = (member("m"), team("t"));

    let plain = QueryBuilder::new()
        .select_from(&m.path)
        .filter(m.username.eq("member1").unwrap())
        .build()
        .unwrap();
    let found: EntityRecord = session(&store).fetch_one(&plain).unwrap().unwrap();
    assert!(!found.is_loaded("team"));

    let fetched = QueryBuilder::new()
        .select_from(&m.path)
        .join(&m.team, &t.path)
        .fetch_join()
        .filter(m.username.eq("member1").unwrap())
        .build()
        .unwrap();
    let found: EntityRecord = session(&store).fetch_one(&fetched).unwrap().unwrap();
    assert!(found.is_loaded("team"));
    assert_eq!(found.association("team").and_then(|t| t.get("name")), Some(&Value::from("teamA")));
}

#[test]
fn cached_record_picks_up_a_later_fetch_join() {
    let store = seeded_store();
    let s = session(&store);
    let (m, t) = (member("m"), team("t"));
    let _: Vec<EntityRecord> = s.fetch(&all_members_by_id()).unwrap();
    let fetched = QueryBuilder::new()
        .select_from(&m.path)
        .join(&m.team, &t.path)
        .fetch_join()
        .build()
        .unwrap();
    let result: Vec<EntityRecord> = s.fetch(&fetched).unwrap();
    assert!(result.iter().all(|r| r.is_loaded("team")));
    assert_eq!(s.context().len(), 6);
}

#[test]
fn subquery_eq_max_and_goe_avg() {
    let s = session(&seeded_store());
    let (m, sub) = (member("m"), member("s"));

    let max = QueryBuilder::new().select([sub.age.max().unwrap()]).from(&sub.path).build().unwrap();
    let plan = QueryBuilder::new()
        .select([&m.age])
        .from(&m.path)
        .filter(m.age.eq(Expr::subquery(max).unwrap()).unwrap())
        .build()
        .unwrap();
    assert_eq!(s.fetch::<i64>(&plan).unwrap(), vec![40]);

    let avg = QueryBuilder::new().select([sub.age.avg().unwrap()]).from(&sub.path).build().unwrap();
    let plan = QueryBuilder::new()
        .select([&m.age])
        .from(&m.path)
        .filter(m.age.goe(Expr::subquery(avg).unwrap()).unwrap())
        .order_by([m.age.asc()])
        .build()
        .unwrap();
    assert_eq!(s.fetch::<i64>(&plan).unwrap(), vec![30, 40]);
}

#[test]
fn subquery_in_and_correlated() {
    let s = session(&seeded_store());
    let (m, sub) = (member("m"), member("s"));

    let older = QueryBuilder::new().select([&sub.age]).from(&sub.path).filter(sub.age.gt(10).unwrap()).build().unwrap();
    let plan = QueryBuilder::new()
        .select([&m.age])
        .from(&m.path)
        .filter(m.age.in_subquery(older).unwrap())
        .order_by([m.age.asc()])
        .build()
        .unwrap();
    assert_eq!(s.fetch::<i64>(&plan).unwrap(), vec![20, 30, 40]);

    // members older than someone else in their team
    let younger_teammate = QueryBuilder::new()
        .select([&sub.id])
        .from(&sub.path)
        .filter(sub.team_id.eq(&m.team_id).unwrap().and(sub.age.lt(&m.age).unwrap()))
        .build()
        .unwrap();
    let plan = QueryBuilder::new()
        .select([&m.username])
        .from(&m.path)
        .filter(Expr::subquery(younger_teammate).unwrap().is_not_null())
        .order_by([m.id.asc()])
        .build()
        .unwrap();
    assert_eq!(s.fetch::<String>(&plan).unwrap(), vec!["member2", "member4"]);
}

#[test]
fn subquery_in_select_clause() {
    let s = session(&seeded_store());
    let (m, sub) = (member("m"), member("s"));
    let avg = QueryBuilder::new().select([sub.age.avg().unwrap()]).from(&sub.path).build().unwrap();
    let plan = QueryBuilder::new()
        .select([SelectItem::from(&m.username), Expr::subquery(avg).unwrap().into()])
        .from(&m.path)
        .build()
        .unwrap();
    let result: Vec<(String, f64)> = s.fetch(&plan).unwrap();
    assert_eq!(result.len(), 4);
    assert!(result.iter().all(|(_, avg)| *avg == 25.0));
}

#[test]
fn simple_and_searched_case() {
    let s = session(&seeded_store());
    let m = member("m");
    let simple = m.age.when(10).unwrap().then("ten").unwrap()
        .when(20).unwrap().then("twenty").unwrap()
        .otherwise("other").unwrap();
    let plan = QueryBuilder::new().select([simple]).from(&m.path).order_by([m.age.asc()]).build().unwrap();
    assert_eq!(s.fetch::<String>(&plan).unwrap(), vec!["ten", "twenty", "other", "other"]);

    let searched = Expr::case()
        .when(m.age.between(0, 20).unwrap()).then("0~20").unwrap()
        .when(m.age.between(21, 30).unwrap()).then("21~30").unwrap()
        .otherwise("other").unwrap();
    let plan = QueryBuilder::new().select([searched]).from(&m.path).order_by([m.age.asc()]).build().unwrap();
    assert_eq!(s.fetch::<String>(&plan).unwrap(), vec!["0~20", "0~20", "21~30", "other"]);
}

#[test]
fn constant_is_added_by_the_mapper() {
    let s = session(&seeded_store());
    let m = member("m");
    let plan = QueryBuilder::new()
        .select([SelectItem::from(&m.username), Expr::constant("A").into()])
        .from(&m.path)
        .order_by([m.id.asc()])
        .build()
        .unwrap();
    let statement = s.statement(&plan).unwrap();
    assert!(!statement.bound.sql.contains("'A'"));
    assert!(statement.bound.params.is_empty());
    let result: Vec<(String, String)> = s.fetch(&plan).unwrap();
    assert_eq!(result[0], ("member1".to_string(), "A".to_string()));
}

#[test]
fn concat_with_string_value() {
    let s = session(&seeded_store());
    let m = member("m");
    let label = m.username.concat("_").unwrap().concat(m.age.string_value()).unwrap();
    let plan = QueryBuilder::new()
        .select([label])
        .from(&m.path)
        .filter(m.username.eq("member1").unwrap())
        .build()
        .unwrap();
    assert_eq!(s.fetch_one::<String>(&plan).unwrap(), Some("member1_10".to_string()));
}

#[test]
fn simple_and_tuple_projection() {
    let s = session(&seeded_store());
    let m = member("m");
    let plan = QueryBuilder::new().select([&m.username]).from(&m.path).order_by([m.id.asc()]).build().unwrap();
    assert_eq!(s.fetch::<String>(&plan).unwrap(), vec!["member1", "member2", "member3", "member4"]);

    let plan = QueryBuilder::new().select([&m.username, &m.age]).from(&m.path).order_by([m.id.asc()]).build().unwrap();
    let typed: Vec<(String, i64)> = s.fetch(&plan).unwrap();
    assert_eq!(typed[3], ("member4".to_string(), 40));

    let tuples: Vec<Tuple> = s.fetch(&plan).unwrap();
    for (tuple, (name, age)) in tuples.iter().zip(&typed) {
        assert_eq!(tuple.by_expr(&m.username), Some(&Value::from(name.as_str())));
        assert_eq!(tuple.by_expr(&m.age), Some(&Value::Int(*age)));
        assert_eq!(tuple.value(1), tuple.by_expr(&m.age));
    }

    assert!(matches!(s.fetch::<(String, String)>(&plan), Err(QueryError::ProjectionMismatch(_))));
}

#[derive(Debug, Default, PartialEq)]
struct MemberDto {
    username: String,
    age: i64,
}

impl MemberDto {
    fn new(username: String, age: i64) -> Self {
        Self { username, age }
    }
}

fn member_fields() -> Vec<Field<MemberDto>> {
    vec![
        field("username", |d: &mut MemberDto, v: String| d.username = v),
        field("age", |d: &mut MemberDto, v: i64| d.age = v),
    ]
}

#[test]
fn dto_by_fields_setters_and_constructor() {
    let s = session(&seeded_store());
    let m = member("m");
    let plan = QueryBuilder::new().select([&m.username, &m.age]).from(&m.path).order_by([m.id.asc()]).build().unwrap();
    let expected = MemberDto::new("member1".into(), 10);

    let by_fields = FieldOrder::bind(&plan, member_fields()).unwrap();
    assert_eq!(s.fetch_into(&plan, &by_fields).unwrap()[0], expected);

    let by_name = NamedFields::bind(&plan, member_fields()).unwrap();
    assert_eq!(s.fetch_into(&plan, &by_name).unwrap()[0], expected);

    let by_ctor = Constructor::bind(&plan, MemberDto::new).unwrap();
    let all = s.fetch_into(&plan, &by_ctor).unwrap();
    assert_eq!(all.len(), 4);
    assert_eq!(all[0], expected);
}

#[derive(Debug, Default, PartialEq)]
struct UserDto {
    name: String,
    age: i64,
}

#[test]
fn aliased_subquery_field() {
    let s = session(&seeded_store());
    let (m, sub) = (member("m"), member("s"));
    let max = QueryBuilder::new().select([sub.age.max().unwrap()]).from(&sub.path).build().unwrap();
    let plan = QueryBuilder::new()
        .select([m.username.alias("name"), Expr::subquery(max).unwrap().alias("age")])
        .from(&m.path)
        .order_by([m.id.asc()])
        .build()
        .unwrap();
    let projection = NamedFields::bind(&plan, vec![
        field("name", |d: &mut UserDto, v: String| d.name = v),
        field("age", |d: &mut UserDto, v: i64| d.age = v),
    ]).unwrap();
    let result = s.fetch_into(&plan, &projection).unwrap();
    assert_eq!(result[0], UserDto { name: "member1".into(), age: 40 });
    assert!(result.iter().all(|u| u.age == 40));
}

#[test]
fn projection_bound_to_another_shape_is_rejected() {
    let s = session(&seeded_store());
    let m = member("m");
    let plan = QueryBuilder::new().select([&m.username, &m.age]).from(&m.path).build().unwrap();
    let other = QueryBuilder::new().select([&m.username, &m.team_id]).from(&m.path).build().unwrap();
    let projection = Constructor::bind(&plan, MemberDto::new).unwrap();
    assert!(matches!(s.fetch_into(&other, &projection), Err(QueryError::ProjectionMismatch(_))));
}

fn search_with_builder(s: &Session, username: Option<&str>, age: Option<i64>) -> Vec<EntityRecord> {
    let m = member("m");
    let mut builder = BooleanBuilder::new();
    if let Some(username) = username {
        builder.and(m.username.eq(username).unwrap());
    }
    if let Some(age) = age {
        builder.and(m.age.eq(age).unwrap());
    }
    let mut query = QueryBuilder::new().select_from(&m.path);
    if let Some(p) = builder.into_predicate() {
        query = query.filter(p);
    }
    s.fetch(&query.build().unwrap()).unwrap()
}

fn search_with_options(s: &Session, username: Option<&str>, age: Option<i64>) -> Vec<EntityRecord> {
    let m = member("m");
    let plan = QueryBuilder::new()
        .select_from(&m.path)
        .filter_all([
            username.map(|u| m.username.eq(u).unwrap()),
            age.map(|a| m.age.eq(a).unwrap()),
        ])
        .build()
        .unwrap();
    s.fetch(&plan).unwrap()
}

#[test]
fn dynamic_queries() {
    let s = session(&seeded_store());
    assert_eq!(usernames(&search_with_builder(&s, Some("member1"), Some(10))), names(&["member1"]));
    assert_eq!(usernames(&search_with_builder(&s, Some("member1"), None)), names(&["member1"]));
    assert_eq!(search_with_builder(&s, None, None).len(), 4);
    assert!(search_with_builder(&s, Some("member1"), Some(20)).is_empty());

    assert_eq!(usernames(&search_with_options(&s, Some("member1"), Some(10))), names(&["member1"]));
    assert_eq!(usernames(&search_with_options(&s, None, Some(30))), names(&["member3"]));
    assert_eq!(search_with_options(&s, None, None).len(), 4);
}

#[test]
fn bulk_update_leaves_cached_entities_stale_until_clear() {
    let s = session(&seeded_store());
    let m = member("m");
    let before: Vec<EntityRecord> = s.fetch(&all_members_by_id()).unwrap();
    assert_eq!(before.len(), 4);

    let update = UpdateBuilder::new(&m.path)
        .set(&m.username, "비회원")
        .unwrap()
        .filter(m.age.lt(28).unwrap())
        .build()
        .unwrap();
    assert_eq!(s.execute(&update).unwrap(), 2);

    let stale: Vec<EntityRecord> = s.fetch(&all_members_by_id()).unwrap();
    assert_eq!(usernames(&stale), names(&["member1", "member2", "member3", "member4"]));

    s.clear();
    let fresh: Vec<EntityRecord> = s.fetch(&all_members_by_id()).unwrap();
    assert_eq!(usernames(&fresh), names(&["비회원", "비회원", "member3", "member4"]));
}

#[test]
fn bulk_add_and_delete() {
    let s = session(&seeded_store());
    let m = member("m");
    let add = UpdateBuilder::new(&m.path).set_expr(&m.age, m.age.add(1).unwrap()).unwrap().build().unwrap();
    assert_eq!(s.execute(add).unwrap(), 4);
    assert_eq!(ages(&s), vec![11, 21, 31, 41]);

    let delete = DeleteBuilder::new(&m.path).filter(m.age.gt(18).unwrap()).build();
    assert_eq!(s.execute(&delete).unwrap(), 3);
    assert_eq!(ages(&s), vec![11]);
}

#[test]
fn insert_returns_the_generated_id() {
    let s = session(&seeded_store());
    let m = member("m");
    let insert = InsertBuilder::new(&m.path)
        .value(&m.username, "member5").unwrap()
        .value(&m.age, 50).unwrap()
        .build()
        .unwrap();
    assert_eq!(s.insert(&insert).unwrap(), Value::Int(5));
    assert_eq!(s.fetch_count(&all_members_by_id()).unwrap(), 5);
}

#[test]
fn sql_functions() {
    let s = session(&seeded_store());
    let m = member("m");
    let plan = QueryBuilder::new()
        .select([m.username.replace("member", "M").unwrap()])
        .from(&m.path)
        .order_by([m.id.asc()])
        .build()
        .unwrap();
    assert_eq!(s.fetch::<String>(&plan).unwrap(), vec!["M1", "M2", "M3", "M4"]);

    let plan = QueryBuilder::new()
        .select([&m.username])
        .from(&m.path)
        .filter(m.username.eq(m.username.lower().unwrap()).unwrap())
        .build()
        .unwrap();
    assert_eq!(s.fetch::<String>(&plan).unwrap().len(), 4);
}

#[test]
fn statement_uses_the_configured_dialect() {
    let store = seeded_store();
    let s = Session::new(store, &Config::postgres());
    let m = member("m");
    let plan = QueryBuilder::new()
        .select([&m.username])
        .from(&m.path)
        .filter(m.age.gt(10).unwrap().and(m.age.lt(40).unwrap()))
        .build()
        .unwrap();
    let statement = s.statement(&plan).unwrap();
    assert_eq!(
        statement.bound.sql,
        "SELECT m.username FROM member m WHERE (m.age > $1) AND (m.age < $2)"
    );
    assert_eq!(statement.bound.params, vec![Value::Int(10), Value::Int(40)]);
    assert_eq!(s.fetch::<String>(&plan).unwrap(), vec!["member2", "member3"]);
}

struct Refusing;

impl StatementExecutor for Refusing {
    fn query(&self, _: &Statement) -> Result<Vec<Row>, QueryError> {
        QueryError::Storage("refused".into()).err()
    }

    fn execute(&self, _: &Statement) -> Result<u64, QueryError> {
        QueryError::Storage("refused".into()).err()
    }

    fn insert(&self, _: &Statement) -> Result<Value, QueryError> {
        QueryError::Storage("refused".into()).err()
    }
}

#[test]
fn limit_zero_and_shape_errors_never_reach_the_executor() {
    let s = Session::new(Arc::new(Refusing), &Config::default());
    let m = member("m");
    let zero = QueryBuilder::new().select_from(&m.path).limit(0).build().unwrap();
    assert!(s.fetch::<EntityRecord>(&zero).unwrap().is_empty());

    let names_plan = QueryBuilder::new().select([&m.username]).from(&m.path).build().unwrap();
    assert!(matches!(s.fetch::<i64>(&names_plan), Err(QueryError::ProjectionMismatch(_))));
    assert!(matches!(s.fetch::<String>(&names_plan), Err(QueryError::Storage(_))));
}
