//! Gemini REST adapter for both generative services.

mod client;
mod wire;

pub use client::{GeminiClient, API_KEY_ENV, FALLBACK_API_KEY_ENV};
