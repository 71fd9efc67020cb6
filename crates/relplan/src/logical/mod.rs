pub mod bind_context;
pub mod memo;
pub mod operator;
pub mod resolve;
pub mod subquery_rewrite;
pub mod table_ref;
