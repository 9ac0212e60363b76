//! Content module - post models and the queries that produce them

mod post;
mod store;

pub use post::{
    Banner, BodyBlock, ContentSection, DetailData, PostDetail, PostSummary, SummaryData,
};
pub use store::{PostPage, PostStore};
