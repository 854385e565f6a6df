//! Deed Verify API Library
//!
//! Identity verification for property registration: OCR checks that a claimed
//! name and government ID appear on a deed and an ID card, then a face
//! embedding comparison checks the ID photo against a live selfie.
//!
//! # Modules
//!
//! - `api`: API definitions.
//! - `core`: Core verification logic.
//! - `integrations`: External OCR and face-embedding collaborators.
//! - `circuit_breaker`: Circuit breaker for the face-embedding service.
//! - `config`: Configuration management.
//! - `document_verifier`: Name and ID checks over OCR output.
//! - `errors`: Error handling types.
//! - `face`: Face-embedding client and embedding distance.
//! - `face_verifier`: ID photo vs. live photo comparison.
//! - `handlers`: HTTP request handlers.
//! - `matcher`: Fuzzy name matching and exact ID lookup.
//! - `models`: Verification outcomes and response bodies.
//! - `ocr`: OCR engine client.
//! - `orchestrator`: The short-circuiting verification workflow.
//! - `router`: Route table and middleware.
//! - `uploads`: Per-request staging and role classification of uploads.

pub mod api;
pub mod core;
pub mod integrations;

pub mod circuit_breaker;
pub mod config;
pub mod document_verifier;
pub mod errors;
pub mod face;
pub mod face_verifier;
pub mod handlers;
pub mod matcher;
pub mod models;
pub mod ocr;
pub mod orchestrator;
pub mod router;
pub mod uploads;
