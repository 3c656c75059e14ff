//! Guide and web page handlers
//!
//! Author: hephaex@gmail.com

use axum::{response::Html, response::IntoResponse, Json};
use dra_core::guide;
use serde::Serialize;
use utoipa::ToSchema;

const INDEX_HTML: &str = include_str!("../../static/index.html");

/// Guide for setting up a bot
#[derive(Serialize, ToSchema)]
pub struct GuideResponse {
    pub title: String,
    pub intro: String,
    /// Steps to create a Telegram bot
    pub create_bot: Vec<String>,
    /// Steps to add the bot to a channel as administrator
    pub add_to_channel: Vec<String>,
}

/// Bot setup guide
#[utoipa::path(
    get,
    path = "/api/v1/guide",
    tag = "guide",
    responses(
        (status = 200, description = "Guide text", body = GuideResponse)
    )
)]
pub async fn guide_handler() -> impl IntoResponse {
    let guide = guide::guide();
    Json(GuideResponse {
        title: guide.title.to_string(),
        intro: guide.intro.to_string(),
        create_bot: guide.create_bot.iter().map(|s| s.to_string()).collect(),
        add_to_channel: guide.add_to_channel.iter().map(|s| s.to_string()).collect(),
    })
}

/// Web page: credential form, result table, clear button and guide
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}
