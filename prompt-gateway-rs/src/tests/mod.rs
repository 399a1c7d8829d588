//! Tests that need a stub upstream or the full router
//!
//! Pure helpers are tested next to their code.
