use std::sync::Arc;

use serde_json::json;

use crate::{
    config::Config,
    executor::StatementExecutor,
    expr::Expr,
    metadata::{Catalog, Entity, EntityPath, RelationPath, ValueType},
    session::Session,
    store::MemoryStore,
};

pub fn member_entity() -> Arc<Entity> {
    Entity::builder("Member")
        .nullable_column("username", ValueType::Text)
        .column("age", ValueType::Int)
        .nullable_column("team_id", ValueType::Int)
        .relation("team", "team_id", "Team")
        .build()
        .unwrap()
}

pub fn team_entity() -> Arc<Entity> {
    Entity::builder("Team").column("name", ValueType::Text).build().unwrap()
}

pub fn catalog() -> Arc<Catalog> {
    let catalog = Catalog::new().with(member_entity()).with(team_entity());
    catalog.validate().unwrap();
    catalog.into_shared()
}

/// Typed paths of `Member` under one alias.
pub struct QMember {
    pub path: EntityPath,
    pub id: Expr,
    pub username: Expr,
    pub age: Expr,
    pub team_id: Expr,
    pub team: RelationPath,
}

pub fn member(alias: &str) -> QMember {
    let path = EntityPath::new(member_entity(), alias);
    QMember {
        id: path.id(),
        username: path.column("username").unwrap(),
        age: path.column("age").unwrap(),
        team_id: path.column("team_id").unwrap(),
        team: path.relation("team").unwrap(),
        path,
    }
}

pub struct QTeam {
    pub path: EntityPath,
    pub id: Expr,
    pub name: Expr,
}

pub fn team(alias: &str) -> QTeam {
    let path = EntityPath::new(team_entity(), alias);
    QTeam {
        id: path.id(),
        name: path.column("name").unwrap(),
        path,
    }
}

/// teamA: member1 (10), member2 (20). teamB: member3 (30), member4 (40).
pub fn seeded_store() -> Arc<MemoryStore> {
    let store = MemoryStore::new(catalog());
    store
        .load_from_json("team", json!([
            { "id": 1, "name": "teamA" },
            { "id": 2, "name": "teamB" }
        ]))
        .unwrap();
    store
        .load_from_json("member", json!([
            { "id": 1, "username": "member1", "age": 10, "team_id": 1 },
            { "id": 2, "username": "member2", "age": 20, "team_id": 1 },
            { "id": 3, "username": "member3", "age": 30, "team_id": 2 },
            { "id": 4, "username": "member4", "age": 40, "team_id": 2 }
        ]))
        .unwrap();
    store.into_shared()
}

pub fn session(store: &Arc<MemoryStore>) -> Session {
    Session::new(Arc::clone(store) as Arc<dyn StatementExecutor>, &Config::default())
}
