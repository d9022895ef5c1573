use tracing::debug;

use crate::{
    compiler::{BoundStatement, SqlWriter},
    config::{Config, Dialect},
    error::QueryError,
    query::{DeletePlan, InsertPlan, QueryPlan, UpdatePlan},
};

/// Turns plans into SQL for one dialect. Holds no state between calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SqlCompiler {
    dialect: Dialect,
}

impl SqlCompiler {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.dialect)
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn run(
        &self,
        kind: &'static str,
        write: impl FnOnce(&mut SqlWriter) -> Result<(), QueryError>,
    ) -> Result<BoundStatement, QueryError> {
        let mut writer = SqlWriter::new(self.dialect);
        write(&mut writer)?;
        let bound = writer.finish();
        debug!(kind, sql = %bound.sql, params = bound.params.len(), "compiled statement");
        Ok(bound)
    }

    pub fn compile(&self, plan: &QueryPlan) -> Result<BoundStatement, QueryError> {
        self.run("select", |w| w.select(plan))
    }

    /// `SELECT count(*)` over the same sources, joins and filter.
    pub fn compile_count(&self, plan: &QueryPlan) -> Result<BoundStatement, QueryError> {
        self.run("count", |w| w.count(plan))
    }

    pub fn compile_update(&self, plan: &UpdatePlan) -> Result<BoundStatement, QueryError> {
        self.run("update", |w| w.update(plan))
    }

    pub fn compile_delete(&self, plan: &DeletePlan) -> Result<BoundStatement, QueryError> {
        self.run("delete", |w| w.delete(plan))
    }

    pub fn compile_insert(&self, plan: &InsertPlan) -> Result<BoundStatement, QueryError> {
        self.run("insert", |w| w.insert(plan))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        expr::{Expr, Value},
        fixtures::{member, team},
        predicate::compose_all,
        query::{DeleteBuilder, InsertBuilder, JoinClause, JoinKind, JoinTarget, QueryBuilder, SelectItem, UpdateBuilder},
    };

    fn ansi() -> SqlCompiler { SqlCompiler::new(Dialect::Ansi) }
    fn pg() -> SqlCompiler { SqlCompiler::new(Dialect::Postgres) }
    fn mysql() -> SqlCompiler { SqlCompiler::new(Dialect::MySql) }

    #[test]
    fn entity_projection_lists_columns_in_declared_order() {
        let m = member("m");
        let plan = QueryBuilder::new().select_from(&m.path).filter(m.username.eq("member1").unwrap()).build().unwrap();
        let bound = ansi().compile(&plan).unwrap();
        assert_eq!(bound.sql, "SELECT m.id, m.username, m.age, m.team_id FROM member m WHERE m.username = ?");
        assert_eq!(bound.params, vec![Value::from("member1")]);
    }

    #[test]
    fn composed_filters_parenthesize_each_conjunct() {
        let m = member("m");
        let p = m.username.eq("member1").unwrap();
        let q = m.age.eq(10).unwrap();

        let both = QueryBuilder::new().select([&m.username]).from(&m.path)
            .filter_all([Some(p.clone()), Some(q.clone())]).build().unwrap();
        assert_eq!(
            ansi().compile(&both).unwrap().sql,
            "SELECT m.username FROM member m WHERE (m.username = ?) AND (m.age = ?)"
        );

        let with_absent = QueryBuilder::new().select([&m.username]).from(&m.path)
            .filter_all([None, Some(q.clone())]).build().unwrap();
        let only = QueryBuilder::new().select([&m.username]).from(&m.path)
            .filter_all([Some(q.clone())]).build().unwrap();
        assert_eq!(ansi().compile(&with_absent).unwrap(), ansi().compile(&only).unwrap());
        assert_eq!(compose_all([None, Some(q.clone())]), Some(q));
    }

    #[test]
    fn subquery_parameters_land_at_their_placeholder() {
        let (m, m2) = (member("m"), member("m2"));
        let sub = QueryBuilder::new()
            .select([m2.age.max().unwrap()])
            .from(&m2.path)
            .filter(m2.age.gt(15).unwrap())
            .build()
            .unwrap();
        let plan = QueryBuilder::new()
            .select([&m.username])
            .from(&m.path)
            .filter(m.username.ne("x").unwrap())
            .filter(m.age.eq(Expr::subquery(sub).unwrap()).unwrap())
            .filter(m.age.lt(99).unwrap())
            .build()
            .unwrap();
        let bound = pg().compile(&plan).unwrap();
        assert_eq!(
            bound.sql,
            "SELECT m.username FROM member m WHERE (m.username <> $1) AND \
             (m.age = (SELECT max(m2.age) FROM member m2 WHERE m2.age > $2)) AND (m.age < $3)"
        );
        assert_eq!(bound.params, vec![Value::from("x"), Value::Int(15), Value::Int(99)]);
    }

    #[test]
    fn select_list_subquery_binds_before_where() {
        let (m, m2) = (member("m"), member("m2"));
        let sub = QueryBuilder::new().select([m2.age.avg().unwrap()]).from(&m2.path)
            .filter(m2.age.gt(1).unwrap()).build().unwrap();
        let plan = QueryBuilder::new()
            .select([SelectItem::from(&m.username), Expr::subquery(sub).unwrap().alias("avg_age")])
            .from(&m.path)
            .filter(m.age.gt(2).unwrap())
            .build()
            .unwrap();
        let bound = pg().compile(&plan).unwrap();
        assert_eq!(
            bound.sql,
            "SELECT m.username, (SELECT avg(m2.age) FROM member m2 WHERE m2.age > $1) AS avg_age \
             FROM member m WHERE m.age > $2"
        );
        assert_eq!(bound.params, vec![Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn order_paging_and_null_ordering() {
        let m = member("m");
        let plan = QueryBuilder::new()
            .select_from(&m.path)
            .order_by([m.age.desc(), m.username.asc().nulls_last()])
            .offset(1)
            .limit(2)
            .build()
            .unwrap();
        assert!(ansi().compile(&plan).unwrap().sql.ends_with(
            "ORDER BY m.age DESC, m.username ASC NULLS LAST LIMIT 2 OFFSET 1"
        ));
        assert!(mysql().compile(&plan).unwrap().sql.ends_with(
            "ORDER BY m.age DESC, m.username IS NULL ASC, m.username ASC LIMIT 2 OFFSET 1"
        ));

        let first = QueryBuilder::new().select_from(&m.path).order_by([m.username.desc().nulls_first()]).build().unwrap();
        assert!(pg().compile(&first).unwrap().sql.ends_with("ORDER BY m.username DESC NULLS FIRST"));
        assert!(mysql().compile(&first).unwrap().sql.ends_with(
            "ORDER BY m.username IS NULL DESC, m.username DESC"
        ));
    }

    #[test]
    fn mysql_offset_without_limit_gets_a_limit() {
        let m = member("m");
        let plan = QueryBuilder::new().select_from(&m.path).offset(3).build().unwrap();
        assert!(mysql().compile(&plan).unwrap().sql.ends_with("LIMIT 18446744073709551615 OFFSET 3"));
        assert!(ansi().compile(&plan).unwrap().sql.ends_with("FROM member m OFFSET 3"));
    }

    #[test]
    fn joins_render_in_declaration_order() {
        let (m, t) = (member("m"), team("t"));
        let plan = QueryBuilder::new()
            .select_from(&m.path)
            .join(&m.team, &t.path)
            .on(t.name.eq("teamA").unwrap())
            .build()
            .unwrap();
        assert_eq!(
            ansi().compile(&plan).unwrap().sql,
            "SELECT m.id, m.username, m.age, m.team_id FROM member m \
             INNER JOIN team t ON (m.team_id = t.id) AND (t.name = ?)"
        );

        let theta = QueryBuilder::new().select_from(&m.path).from(&t.path)
            .filter(m.username.eq(&t.name).unwrap()).build().unwrap();
        assert_eq!(
            ansi().compile(&theta).unwrap().sql,
            "SELECT m.id, m.username, m.age, m.team_id FROM member m, team t WHERE m.username = t.name"
        );

        let cross = QueryBuilder::new().select([&m.username]).from(&m.path).join_entity(&t.path).build().unwrap();
        assert_eq!(ansi().compile(&cross).unwrap().sql, "SELECT m.username FROM member m CROSS JOIN team t");

        let left = QueryBuilder::new().select([&m.username]).from(&m.path)
            .left_join_entity(&t.path).on(m.username.eq(&t.name).unwrap()).build().unwrap();
        assert_eq!(
            ansi().compile(&left).unwrap().sql,
            "SELECT m.username FROM member m LEFT JOIN team t ON m.username = t.name"
        );
    }

    #[test]
    fn fetch_join_appends_target_columns() {
        let (m, t) = (member("m"), team("t"));
        let plan = QueryBuilder::new().select_from(&m.path).join(&m.team, &t.path).fetch_join().build().unwrap();
        assert!(ansi().compile(&plan).unwrap().sql.starts_with(
            "SELECT m.id, m.username, m.age, m.team_id, t.id, t.name FROM member m INNER JOIN team t"
        ));
    }

    #[test]
    fn aggregates_group_by_and_having() {
        let (m, t) = (member("m"), team("t"));
        let plan = QueryBuilder::new()
            .select([SelectItem::from(&t.name), m.age.avg().unwrap().into()])
            .from(&m.path)
            .join(&m.team, &t.path)
            .group_by([&t.name])
            .having(m.age.avg().unwrap().gt(10).unwrap())
            .build()
            .unwrap();
        assert_eq!(
            ansi().compile(&plan).unwrap().sql,
            "SELECT t.name, avg(m.age) FROM member m INNER JOIN team t ON m.team_id = t.id \
             GROUP BY t.name HAVING avg(m.age) > ?"
        );
        let counts = QueryBuilder::new()
            .select([m.path.count(), m.age.count_distinct(), m.age.sum().unwrap(), m.age.min().unwrap()])
            .from(&m.path).build().unwrap();
        assert_eq!(
            ansi().compile(&counts).unwrap().sql,
            "SELECT count(m.id), count(DISTINCT m.age), sum(m.age), min(m.age) FROM member m"
        );
    }

    #[test]
    fn aggregate_in_where_and_nested_aggregates_are_unsupported() {
        let m = member("m");
        let in_where = QueryBuilder::new().select([&m.username]).from(&m.path)
            .filter(m.age.max().unwrap().gt(1).unwrap()).build().unwrap();
        assert!(matches!(ansi().compile(&in_where), Err(QueryError::UnsupportedConstruct(_))));

        let nested = QueryBuilder::new().select([m.age.max().unwrap().sum().unwrap()]).from(&m.path).build().unwrap();
        assert!(matches!(ansi().compile(&nested), Err(QueryError::UnsupportedConstruct(_))));
    }

    #[test]
    fn subquery_join_target_is_rejected_by_the_compiler() {
        let (m, m2) = (member("m"), member("m2"));
        let sub = QueryBuilder::new().select([&m2.age]).from(&m2.path).build().unwrap();
        let mut plan = QueryBuilder::new().select_from(&m.path).build().unwrap();
        plan.joins.push(JoinClause {
            kind: JoinKind::Inner,
            target: JoinTarget::SubQuery { plan: Arc::new(sub), alias: "s".into() },
            on: None,
            relation: None,
            fetch: false,
        });
        assert!(matches!(ansi().compile(&plan), Err(QueryError::UnsupportedConstruct(_))));
    }

    #[test]
    fn text_functions_per_dialect() {
        let m = member("m");
        let label = m.username.concat("_").unwrap().concat(m.age.string_value()).unwrap();
        let plan = QueryBuilder::new().select([&label]).from(&m.path).build().unwrap();
        assert_eq!(
            ansi().compile(&plan).unwrap().sql,
            "SELECT ((m.username || ?) || CAST(m.age AS VARCHAR)) FROM member m"
        );
        assert_eq!(
            mysql().compile(&plan).unwrap().sql,
            "SELECT CONCAT(CONCAT(m.username, ?), CAST(m.age AS CHAR)) FROM member m"
        );

        let replaced = m.username.replace("member", "M").unwrap();
        let plan = QueryBuilder::new().select([&replaced]).from(&m.path)
            .filter(m.username.eq(m.username.lower().unwrap()).unwrap()).build().unwrap();
        assert_eq!(
            ansi().compile(&plan).unwrap().sql,
            "SELECT replace(m.username, ?, ?) FROM member m WHERE m.username = lower(m.username)"
        );
    }

    #[test]
    fn like_uses_escape_clause() {
        let m = member("m");
        let plan = QueryBuilder::new().select([&m.username]).from(&m.path)
            .filter(m.username.starts_with("mem_").unwrap()).build().unwrap();
        let bound = ansi().compile(&plan).unwrap();
        assert_eq!(bound.sql, "SELECT m.username FROM member m WHERE m.username LIKE ? ESCAPE '!'");
        assert_eq!(bound.params, vec![Value::from("mem!_%")]);
    }

    #[test]
    fn case_and_constants() {
        let m = member("m");
        let rank = Expr::case()
            .when(m.age.between(0, 20).unwrap()).then("0~20").unwrap()
            .otherwise("etc").unwrap();
        let plan = QueryBuilder::new()
            .select([SelectItem::from(&m.username), Expr::constant("A").into(), rank.into()])
            .from(&m.path)
            .build()
            .unwrap();
        let bound = pg().compile(&plan).unwrap();
        assert_eq!(
            bound.sql,
            "SELECT m.username, CASE WHEN (m.age >= $1) AND (m.age <= $2) THEN $3 ELSE $4 END FROM member m"
        );
        assert_eq!(bound.params.len(), 4);

        let only_constant = QueryBuilder::new().select([Expr::constant("A")]).from(&m.path).build().unwrap();
        assert!(matches!(ansi().compile(&only_constant), Err(QueryError::UnsupportedConstruct(_))));
    }

    #[test]
    fn count_drops_paging_and_rejects_groups() {
        let m = member("m");
        let plan = QueryBuilder::new().select_from(&m.path).filter(m.age.gt(10).unwrap())
            .order_by([m.age.desc()]).offset(1).limit(2).build().unwrap();
        assert_eq!(ansi().compile_count(&plan).unwrap().sql, "SELECT count(*) FROM member m WHERE m.age > ?");

        let distinct = QueryBuilder::new().select_distinct([&m.team_id]).from(&m.path)
            .filter(m.age.gt(10).unwrap()).order_by([m.team_id.asc()]).limit(1).build().unwrap();
        let bound = pg().compile_count(&distinct).unwrap();
        assert_eq!(
            bound.sql,
            "SELECT count(*) FROM (SELECT DISTINCT m.team_id FROM member m WHERE m.age > $1) distinct_rows"
        );
        assert_eq!(bound.params, vec![Value::Int(10)]);

        let pairs = QueryBuilder::new().select_distinct([&m.username, &m.age]).from(&m.path).build().unwrap();
        assert_eq!(
            ansi().compile_count(&pairs).unwrap().sql,
            "SELECT count(*) FROM (SELECT DISTINCT m.username, m.age FROM member m) distinct_rows"
        );

        let grouped = QueryBuilder::new().select([&m.team_id]).from(&m.path).group_by([&m.team_id]).build().unwrap();
        assert!(matches!(ansi().compile_count(&grouped), Err(QueryError::UnsupportedConstruct(_))));
    }

    #[test]
    fn mutations_bind_set_before_where() {
        let m = member("m");
        let update = UpdateBuilder::new(&m.path)
            .set(&m.username, "비회원").unwrap()
            .set_expr(&m.age, m.age.add(1).unwrap()).unwrap()
            .filter(m.age.lt(28).unwrap())
            .build()
            .unwrap();
        let bound = pg().compile_update(&update).unwrap();
        assert_eq!(bound.sql, "UPDATE member m SET username = $1, age = (m.age + $2) WHERE m.age < $3");
        assert_eq!(bound.params, vec![Value::from("비회원"), Value::Int(1), Value::Int(28)]);

        let delete = DeleteBuilder::new(&m.path).filter(m.age.gt(18).unwrap()).build();
        assert_eq!(ansi().compile_delete(&delete).unwrap().sql, "DELETE FROM member m WHERE m.age > ?");

        let insert = InsertBuilder::new(&m.path)
            .value(&m.username, "member5").unwrap()
            .value(&m.age, 50).unwrap()
            .build()
            .unwrap();
        let bound = pg().compile_insert(&insert).unwrap();
        assert_eq!(bound.sql, "INSERT INTO member (username, age) VALUES ($1, $2)");
        assert_eq!(bound.params.len(), 2);
    }

    #[test]
    fn placeholder_count_matches_params() {
        let m = member("m");
        let plan = QueryBuilder::new().select([&m.username]).from(&m.path)
            .filter(m.age.in_list([10, 20, 30]).unwrap())
            .filter(m.username.not_like("x%").unwrap())
            .build()
            .unwrap();
        let bound = ansi().compile(&plan).unwrap();
        assert_eq!(bound.sql.matches('?').count(), bound.params.len());
        assert!(bound.sql.contains("m.age IN (?, ?, ?)"));
        assert!(bound.sql.contains("m.username NOT LIKE ? ESCAPE '!'"));
    }
}
