use serde::{Deserialize, Serialize};

/// Verdict text attached to a completed workflow.
pub const FINAL_VERDICT: &str = "Owner Identity Verified. Ready for blockchain registration.";

/// Per-document result of the name and ID checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentCheckResult {
    pub name_found: bool,
    pub id_found: bool,
    /// Best partial-ratio score of the claimed name, 0-100.
    pub name_match_score: u8,
}

impl DocumentCheckResult {
    /// A document is verified when both the name and the ID were found on it.
    pub fn is_verified(&self) -> bool {
        self.name_found && self.id_found
    }
}

/// Combined result of checking the deed and the government ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentVerificationOutcome {
    pub deed_verification: DocumentCheckResult,
    pub id_verification: DocumentCheckResult,
    pub is_overall_verified: bool,
    pub reason: String,
}

impl DocumentVerificationOutcome {
    /// Aggregates two per-document results into an overall verdict and reason.
    pub fn from_checks(deed: DocumentCheckResult, id: DocumentCheckResult) -> Self {
        let deed_verified = deed.is_verified();
        let id_verified = id.is_verified();

        let reason = if deed_verified && id_verified {
            "SUCCESS: User's name and government ID were found in both the deed and ID documents."
                .to_string()
        } else {
            let mut failures = Vec::new();
            if !deed_verified {
                failures.push("Deed verification failed.");
            }
            if !id_verified {
                failures.push("ID document verification failed.");
            }
            format!("FAILURE: {}", failures.join(" "))
        };

        Self {
            deed_verification: deed,
            id_verification: id,
            is_overall_verified: deed_verified && id_verified,
            reason,
        }
    }
}

/// Result of comparing the ID photo against the live selfie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceVerificationOutcome {
    pub face_match_found: bool,
    /// Embedding distance rounded to two decimals. Lower is more similar.
    pub face_distance: f64,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationDetails {
    pub document_verification: DocumentVerificationOutcome,
    pub face_verification: FaceVerificationOutcome,
}

/// Body of a successful `/verify_identity` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalVerdict {
    pub agent_workflow_status: String,
    pub verification_details: VerificationDetails,
    pub final_verdict: String,
}

impl FinalVerdict {
    pub fn completed(
        document_verification: DocumentVerificationOutcome,
        face_verification: FaceVerificationOutcome,
    ) -> Self {
        Self {
            agent_workflow_status: "Completed".to_string(),
            verification_details: VerificationDetails {
                document_verification,
                face_verification,
            },
            final_verdict: FINAL_VERDICT.to_string(),
        }
    }
}

/// 422 body when the document check did not pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentFailureBody {
    pub document_verification: DocumentVerificationOutcome,
}

/// 422 body when the face check did not pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceFailureBody {
    pub face_verification: FaceVerificationOutcome,
}
