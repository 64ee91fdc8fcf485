//! Shared fixtures of the integration tests.
#![allow(dead_code)]

use nosql_advisor::model::{FieldType, Model, ModelBuilder};
use nosql_advisor::workload::{
    DeleteBuilder, InsertBuilder, QueryBuilder, Statement, UpdateBuilder, Workload,
};

pub const STATEMENTS: usize = 6;

/// Regions have users, users write posts.
pub fn blog_model(users: f64, posts: f64) -> anyhow::Result<Model> {
    let model = ModelBuilder::new()
        .entity("regions", 10.0)
        .id("id")
        .field("name", FieldType::String)
        .with_size(20)
        .entity("users", users)
        .id("id")
        .field("name", FieldType::String)
        .field("city", FieldType::String)
        .with_cardinality(50.0)
        .foreign_key("region_id", "regions")
        .entity("posts", posts)
        .id("id")
        .field("title", FieldType::String)
        .with_size(40)
        .field("created", FieldType::Date)
        .foreign_key("author_id", "users")
        .build()?;
    Ok(model)
}

pub fn blog_statements(model: &Model) -> anyhow::Result<Vec<Statement>> {
    Ok(vec![
        QueryBuilder::new("user_posts", "posts")
            .select("posts.title")
            .eq("users.id")
            .order_by("posts.created")
            .limit(10)
            .build(model)?
            .into(),
        QueryBuilder::new("region_of_user", "regions")
            .select("regions.name")
            .eq("users.id")
            .build(model)?
            .into(),
        QueryBuilder::new("users_in_city", "users")
            .select("users.name")
            .eq("users.city")
            .build(model)?
            .into(),
        UpdateBuilder::new("rename_user", "users")
            .set("name")
            .eq("id")
            .build(model)?
            .into(),
        InsertBuilder::new("new_post", "posts").build(model)?.into(),
        DeleteBuilder::new("drop_post", "posts").eq("id").build(model)?.into(),
    ])
}

/// The blog workload with one weight per statement, in [`blog_statements`] order.
pub fn blog_workload(users: f64, posts: f64, weights: &[f64]) -> anyhow::Result<Workload> {
    let model = blog_model(users, posts)?;
    let statements = blog_statements(&model)?;
    let mut workload = Workload::new(model);
    for (i, statement) in statements.into_iter().enumerate() {
        workload.add_statement(statement, weights.get(i).copied().unwrap_or(1.0))?;
    }
    Ok(workload)
}

pub fn default_blog_workload() -> anyhow::Result<Workload> {
    blog_workload(1000.0, 10000.0, &[10.0, 5.0, 2.0, 1.0, 3.0, 1.0])
}
