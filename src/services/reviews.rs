use serde::Deserialize;
use tracing::info;
use validator::Validate;

use crate::error::{BookingError, BookingResult};
use crate::models::{Movie, NewReview, Review};
use crate::store::BookingStore;

#[derive(Debug, Deserialize, Validate)]
pub struct ReviewForm {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i32,
    #[validate(length(min = 1, max = 2000, message = "Review text must be 1 to 2000 characters"))]
    pub content: String,
}

fn first_message(errors: &validator::ValidationErrors) -> String {
    errors
        .field_errors()
        .values()
        .flat_map(|errs| errs.iter())
        .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| "Invalid review".to_string())
}

/// Stores the review and refreshes the movie's average rating.
pub async fn add_review(
    store: &dyn BookingStore,
    user_id: i64,
    movie_id: i64,
    form: ReviewForm,
) -> BookingResult<(Review, Movie)> {
    let form = ReviewForm { content: form.content.trim().to_string(), ..form };
    form.validate().map_err(|e| BookingError::validation(first_message(&e)))?;

    let (review, movie) = store
        .add_review(NewReview { user_id, movie_id, rating: form.rating, content: form.content })
        .await?;

    info!("review {} on movie {}: rating now {}", review.id, movie.id, movie.rating);
    Ok((review, movie))
}
