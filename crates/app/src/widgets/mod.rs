//! Reusable widgets for the chat view.

pub mod recommendation_card;

pub use recommendation_card::{render_recommendations, RecommendationCard};
