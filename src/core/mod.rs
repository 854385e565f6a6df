// Domain-layer modules and shared errors/models
pub mod matcher {
    pub use crate::matcher::*;
}

pub mod document_verifier {
    pub use crate::document_verifier::*;
}

pub mod face_verifier {
    pub use crate::face_verifier::*;
}

pub mod orchestrator {
    pub use crate::orchestrator::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod errors {
    pub use crate::errors::*;
}
