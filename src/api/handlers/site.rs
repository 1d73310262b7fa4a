use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::response::{ApiError, AppJson, JSend};
use crate::carousel::{Carousel, Slide};
use crate::catalog::models::{MediaSlot, RecordKind};
use crate::validation::{validate_contact, ContactForm};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct CarouselResponse {
    pub slides: Vec<Slide>,
    pub auto_advance: bool,
    pub interval_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub valid: bool,
}

/// Slides for the landing-page carousel, built from carousel item images.
pub async fn carousel(
    State(state): State<Arc<AppState>>,
) -> Result<Json<JSend<CarouselResponse>>, ApiError> {
    let slides: Vec<Slide> = state
        .db
        .list_for_kind(RecordKind::CarouselItem)?
        .into_iter()
        .filter(|a| a.slot == MediaSlot::Image)
        .map(|a| Slide::new(a.public_url, &a.mime_type))
        .collect();

    let carousel = Carousel::new(slides.clone());
    Ok(JSend::success(CarouselResponse {
        auto_advance: carousel.auto_advances(),
        interval_ms: Carousel::DEFAULT_INTERVAL.as_millis() as u64,
        slides,
    }))
}

pub async fn validate_contact_form(
    AppJson(form): AppJson<ContactForm>,
) -> Result<Json<JSend<ContactResponse>>, ApiError> {
    validate_contact(&form)?;

    Ok(JSend::success(ContactResponse { valid: true }))
}
