//! External service integrations.

pub mod ocr {
    pub use crate::ocr::*;
}

pub mod face {
    pub use crate::face::*;
}
