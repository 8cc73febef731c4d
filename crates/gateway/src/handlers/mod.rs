//! API handlers module

pub mod admin;
pub mod auth;
pub mod health;
pub mod student;
pub mod teacher;

use serde::Serialize;

/// Plain confirmation body for mutating endpoints
#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
