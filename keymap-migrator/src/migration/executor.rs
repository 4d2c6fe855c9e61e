use crate::document::Document;
use crate::migration::error::{MigrationError, MigrationResult};
use crate::migration::registry::{MigrationChain, MigrationRegistry};
use crate::migration::step::{MigrationStep, StepContext, StepTransform, VersionedStep};

/// Applies every step of `chain` to one document.
///
/// The input is consumed; on failure nothing is returned, so a caller holding the stored
/// original keeps it untouched. An expanding step must produce exactly one document here:
/// splitting is only meaningful for table rows, where the executor can assign new ids.
///
/// # Errors
/// `DocumentTransformFailure` naming the failing step's `version_before` and field.
pub fn run(
    family: &str,
    chain: &MigrationChain<'_, MigrationStep>,
    document: Document,
    context: &StepContext<'_>,
) -> MigrationResult<Document> {
    chain.steps().try_fold(document, |document, step| {
        apply_step(family, step, document, context)
    })
}

/// Resolves the chain from `initial` to `target` and runs it.
///
/// # Errors
/// Chain resolution errors, then whatever [`run`] reports.
pub fn migrate(
    registry: &MigrationRegistry<MigrationStep>,
    initial: u32,
    target: u32,
    document: Document,
    context: &StepContext<'_>,
) -> MigrationResult<Document> {
    let chain = registry.resolve(initial, target)?;
    run(registry.family(), &chain, document, context)
}

fn apply_step(
    family: &str,
    step: &MigrationStep,
    document: Document,
    context: &StepContext<'_>,
) -> MigrationResult<Document> {
    let failure = |field: &str, message: String| MigrationError::DocumentTransformFailure {
        family: family.to_string(),
        version_before: step.version_before(),
        field: field.to_string(),
        message,
    };

    match step.transform() {
        StepTransform::Document(transform) => {
            transform(document, context).map_err(|e| failure(e.field(), e.to_string()))
        }
        StepTransform::Expand(transform) => {
            let mut documents =
                transform(document, context).map_err(|e| failure(e.field(), e.to_string()))?;
            if documents.len() != 1 {
                return Err(failure(
                    "",
                    format!(
                        "step `{}` split the document into {} records",
                        step.name(),
                        documents.len()
                    ),
                ));
            }
            documents
                .pop()
                .ok_or_else(|| failure("", "no document produced".to_string()))
        }
    }
}
